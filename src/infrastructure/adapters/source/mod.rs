//! Chunk Source 适配器

mod http_chunk_source;
mod local_chunk_source;

pub use http_chunk_source::{HttpChunkSource, HttpChunkSourceConfig};
pub use local_chunk_source::LocalChunkSource;
