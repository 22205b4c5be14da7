//! 应用层
//!
//! Ports: 出站端口定义
//! Generation: 分块生成服务（生成器、派发器、预生成调度器）

pub mod error;
pub mod generation;
pub mod ports;

pub use error::GenerationError;
pub use generation::{
    ChunkGenerator, DispatchOutcome, GenerationDispatcher, GenerationReport, GenerationTracker,
    GeneratorConfig, PregenScheduler, SchedulerConfig,
};
