//! Fallback Speech 适配器

mod fake_fallback;

pub use fake_fallback::{FakeFallbackConfig, FakeFallbackSpeech};
