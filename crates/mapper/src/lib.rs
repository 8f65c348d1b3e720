//! # Mapper
//!
//! 建图进程侧的握手服务。
//!
//! 负责：
//! - 接收 tracker 发来的 `HandshakeMessage`
//! - 分类为 `MapperRequest` 并交给 `MappingBackend`
//! - 每个非终止消息处理完后回复一个 ack；收到 `end` 后停止且不回复

pub mod backends;
pub mod error;
pub mod metrics;
pub mod service;

pub use backends::{JournalBackend, LogBackend, RecordingBackend, RequestLog};
pub use contracts::{MapperRequest, MappingBackend};
pub use error::MapperError;
pub use metrics::{MapperMetrics, MetricsSnapshot};
pub use service::{MapperHandle, MapperReport, MapperService};
