//! HTTP Handlers

mod chunk;
mod content;
mod generation;
mod ping;
mod voice;

pub use chunk::{get_chunk_audio, list_chunks};
pub use content::{get_content, list_contents, put_content};
pub use generation::{generate, process_next};
pub use ping::ping;
pub use voice::{list_voices, put_voice};
