//! MappingBackend implementations

mod journal;
mod log;
mod recording;

pub use journal::JournalBackend;
pub use log::LogBackend;
pub use recording::{RecordingBackend, RequestLog};
