//! Structured ping log: one JSON-formatted record per classified ping
//!
//! Records capture the state *before* the ping touched it, so `warm = false`
//! on a record means this ping hit a cold environment.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::classifier::ClassifiedPing;
use crate::state::StateSnapshot;

/// A single ping log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingLogRecord {
    /// Always "warmer"
    pub action: String,
    /// Function that received the ping
    pub function: Option<String>,
    /// Process identity
    pub identity: String,
    /// Correlation id of the round
    pub correlation_id: String,
    /// Invocation index within the round
    pub count: u32,
    /// Invocation total of the round
    pub concurrency: u32,
    /// Whether the environment was already warm
    pub warm: bool,
    /// Previous access, epoch milliseconds
    pub last_accessed: Option<i64>,
    /// Seconds since the previous access
    pub last_accessed_seconds: Option<f64>,
}

impl PingLogRecord {
    /// Build a record from a classified ping and the pre-touch state
    pub fn new(ping: &ClassifiedPing, before: &StateSnapshot, function: Option<&str>) -> Self {
        Self {
            action: "warmer".to_string(),
            function: function.map(str::to_string),
            identity: before.identity.clone(),
            correlation_id: ping.correlation_id.clone(),
            count: ping.invocation_index,
            concurrency: ping.invocation_total,
            warm: before.warm,
            last_accessed: before.last_access.map(|t| t.timestamp_millis()),
            last_accessed_seconds: before.seconds_since_last_access,
        }
    }
}

/// Ping log: tracks and emits structured records
pub struct PingLog {
    total_records: Arc<AtomicU64>,
    last_record: Mutex<Option<PingLogRecord>>,
}

impl PingLog {
    /// Create a new ping log
    pub fn new() -> Self {
        Self {
            total_records: Arc::new(AtomicU64::new(0)),
            last_record: Mutex::new(None),
        }
    }

    /// Record and emit a log entry
    pub fn record(&self, record: &PingLogRecord) {
        self.total_records.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            target: "warmer",
            identity = record.identity.as_str(),
            correlation_id = record.correlation_id.as_str(),
            count = record.count,
            concurrency = record.concurrency,
            warm = record.warm,
            function = record.function.as_deref().unwrap_or("-"),
            "{}",
            serde_json::to_string(record).unwrap_or_default()
        );
        *self.last_record.lock().unwrap_or_else(|e| e.into_inner()) = Some(record.clone());
    }

    /// Most recently emitted record
    pub fn last_record(&self) -> Option<PingLogRecord> {
        self.last_record
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Total number of emitted records
    pub fn total_records(&self) -> u64 {
        self.total_records.load(Ordering::Relaxed)
    }
}

impl Default for PingLog {
    fn default() -> Self {
        Self::new()
    }
}
