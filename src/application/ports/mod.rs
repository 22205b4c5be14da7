//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_sink;
mod chunk_source;
mod chunk_store;
mod fallback_speech;
mod process_next;
mod repositories;
mod speech_provider;

pub use audio_sink::{AudioControl, AudioSinkPort, LoadedChunk, SinkError};
pub use chunk_source::{ChunkSourcePort, SourceChunk, SourceError};
pub use chunk_store::{ChunkRecord, ChunkStorePort, InsertOutcome, NewChunk, StoreError};
pub use fallback_speech::{
    FallbackControl, FallbackError, FallbackEvent, FallbackPlayback, FallbackSpeechPort,
};
pub use process_next::{ProcessNextPort, ProcessOutcome, SchedulerError};
pub use repositories::{
    ContentRecord, ContentRepositoryPort, RepositoryError, VoiceCatalogPort, VoiceProfile,
};
pub use speech_provider::{
    ProviderError, SpeechProviderPort, SynthesisOutcome, SynthesisRequest, SynthesizedAudio,
};
