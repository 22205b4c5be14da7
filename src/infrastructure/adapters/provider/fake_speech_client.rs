//! Fake Speech Client - 用于测试的合成客户端
//!
//! 不访问网络。默认对任意请求返回确定性的伪音频字节；
//! 可预先排入限流/失败脚本来模拟供应商行为。

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{
    ProviderError, SpeechProviderPort, SynthesisOutcome, SynthesisRequest, SynthesizedAudio,
};

/// 预排脚本的单次调用结果
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// 限流，可附带服务端建议的等待时长
    Throttled { retry_after: Option<Duration> },
    /// 瞬态服务错误（5xx 等价物）
    ServiceError,
    /// 凭据缺失（致命）
    MissingCredentials,
}

/// Fake Speech Client
pub struct FakeSpeechClient {
    script: Mutex<VecDeque<ScriptedOutcome>>,
    calls: AtomicU32,
}

impl FakeSpeechClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// 排入一个脚本结果；脚本耗尽后恢复默认成功行为
    pub fn script(&self, outcome: ScriptedOutcome) {
        self.script.lock().unwrap().push_back(outcome);
    }

    /// 累计合成调用次数
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// 确定性伪音频：内容由文本和音色唯一决定
    fn fake_audio(request: &SynthesisRequest) -> Vec<u8> {
        format!(
            "audio/{}/{}b:{}",
            request.voice_name,
            request.text.len(),
            request.text
        )
        .into_bytes()
    }
}

impl Default for FakeSpeechClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechProviderPort for FakeSpeechClient {
    async fn synthesize(
        &self,
        request: SynthesisRequest,
    ) -> Result<SynthesisOutcome, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let scripted = self.script.lock().unwrap().pop_front();
        match scripted {
            Some(ScriptedOutcome::Throttled { retry_after }) => {
                Ok(SynthesisOutcome::Throttled { retry_after })
            }
            Some(ScriptedOutcome::ServiceError) => Err(ProviderError::ServiceError(
                "scripted service error".to_string(),
            )),
            Some(ScriptedOutcome::MissingCredentials) => Err(ProviderError::MissingCredentials(
                "scripted missing credentials".to_string(),
            )),
            None => Ok(SynthesisOutcome::Audio(SynthesizedAudio {
                audio: Self::fake_audio(&request),
                duration_ms: Some(1000),
            })),
        }
    }
}
