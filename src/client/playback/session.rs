//! Playback Session - 客户端播放会话
//!
//! 瞬态状态：随播放请求创建，随 stop/导航销毁，从不持久化

use uuid::Uuid;

/// 播放会话
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    pub content_id: Uuid,
    pub voice_name: String,
    /// 当前分块索引
    pub chunk_index: u32,
    /// 分块内播放进度 0.0..=1.0
    pub chunk_fraction: f32,
    pub total_chunks: u32,
    /// 播放速率
    pub rate: f32,
}

impl PlaybackSession {
    pub fn new(content_id: Uuid, voice_name: impl Into<String>, total_chunks: u32, rate: f32) -> Self {
        Self {
            content_id,
            voice_name: voice_name.into(),
            chunk_index: 0,
            chunk_fraction: 0.0,
            total_chunks,
            rate,
        }
    }

    /// 聚合进度百分比
    ///
    /// overall = (已完成分块数 + 分块内进度) / 总分块数 * 100
    pub fn overall_progress(&self) -> f32 {
        if self.total_chunks == 0 {
            return 0.0;
        }
        let completed = self.chunk_index.min(self.total_chunks) as f32;
        let fraction = self.chunk_fraction.clamp(0.0, 1.0);
        ((completed + fraction) / self.total_chunks as f32) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_math() {
        let mut session = PlaybackSession::new(Uuid::new_v4(), "amber", 4, 1.0);
        assert_eq!(session.overall_progress(), 0.0);

        session.chunk_index = 1;
        session.chunk_fraction = 0.5;
        assert!((session.overall_progress() - 37.5).abs() < f32::EPSILON);

        session.chunk_index = 4;
        session.chunk_fraction = 0.0;
        assert_eq!(session.overall_progress(), 100.0);
    }

    #[test]
    fn test_progress_with_zero_chunks() {
        let session = PlaybackSession::new(Uuid::new_v4(), "amber", 0, 1.0);
        assert_eq!(session.overall_progress(), 0.0);
    }

    #[test]
    fn test_fraction_is_clamped() {
        let mut session = PlaybackSession::new(Uuid::new_v4(), "amber", 2, 1.0);
        session.chunk_fraction = 1.7;
        assert!(session.overall_progress() <= 50.0);
    }
}
