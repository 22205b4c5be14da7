//! Speech Provider 适配器

mod fake_speech_client;
mod http_speech_client;

pub use fake_speech_client::{FakeSpeechClient, ScriptedOutcome};
pub use http_speech_client::{HttpSpeechClient, HttpSpeechClientConfig};
