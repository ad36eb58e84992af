//! Observability: structured ping logging and environment metadata

pub mod metadata;
pub mod ping_log;

pub use metadata::Metadata;
pub use ping_log::{PingLog, PingLogRecord};
