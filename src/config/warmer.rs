//! Warmer options: ping field names, logging, correlation, and sibling delay

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default event key that marks a warming ping
pub const DEFAULT_FLAG: &str = "warmer";
/// Default event key carrying the requested concurrency
pub const DEFAULT_CONCURRENCY_FIELD: &str = "concurrency";
/// Default event key that suppresses fan-out
pub const DEFAULT_TEST_FIELD: &str = "test";
/// Default pause for sibling invocations, in milliseconds
pub const DEFAULT_DELAY_MS: u64 = 75;

/// Caller-supplied warmer options. Every field is optional; unset fields
/// take their defaults in [`WarmerOptions::resolve`].
///
/// # HCL Example
///
/// ```hcl
/// warmer {
///   flag        = "warmer"
///   concurrency = "concurrency"
///   log         = false
///   delay       = 100
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmerOptions {
    /// Event key that signals a warming ping
    pub flag: Option<String>,

    /// Event key carrying the requested concurrency
    pub concurrency: Option<String>,

    /// Event key that, when truthy, suppresses fan-out
    pub test: Option<String>,

    /// Emit one log record per classified ping
    pub log: Option<bool>,

    /// Correlation id used when the event does not carry one
    pub correlation_id: Option<String>,

    /// Milliseconds a sibling invocation waits before returning
    pub delay: Option<u64>,
}

impl WarmerOptions {
    /// Set the ping field name
    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flag = Some(flag.into());
        self
    }

    /// Set the concurrency field name
    pub fn concurrency_field(mut self, field: impl Into<String>) -> Self {
        self.concurrency = Some(field.into());
        self
    }

    /// Set the test field name
    pub fn test_field(mut self, field: impl Into<String>) -> Self {
        self.test = Some(field.into());
        self
    }

    /// Enable or disable the ping log record
    pub fn log(mut self, enabled: bool) -> Self {
        self.log = Some(enabled);
        self
    }

    /// Set the default correlation id
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the sibling delay in milliseconds
    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(ms);
        self
    }

    /// Layer `self` over `base`: fields set here win, unset fields fall back to `base`.
    pub fn merged_over(&self, base: &WarmerOptions) -> WarmerOptions {
        WarmerOptions {
            flag: self.flag.clone().or_else(|| base.flag.clone()),
            concurrency: self.concurrency.clone().or_else(|| base.concurrency.clone()),
            test: self.test.clone().or_else(|| base.test.clone()),
            log: self.log.or(base.log),
            correlation_id: self
                .correlation_id
                .clone()
                .or_else(|| base.correlation_id.clone()),
            delay: self.delay.or(base.delay),
        }
    }

    /// Apply defaults. `identity` becomes the correlation id when none is set.
    pub fn resolve(&self, identity: &str) -> WarmerConfig {
        WarmerConfig {
            flag: self.flag.clone().unwrap_or_else(|| DEFAULT_FLAG.to_string()),
            concurrency_field: self
                .concurrency
                .clone()
                .unwrap_or_else(|| DEFAULT_CONCURRENCY_FIELD.to_string()),
            test_field: self
                .test
                .clone()
                .unwrap_or_else(|| DEFAULT_TEST_FIELD.to_string()),
            log: self.log.unwrap_or(true),
            correlation_id: self
                .correlation_id
                .clone()
                .unwrap_or_else(|| identity.to_string()),
            delay: Duration::from_millis(self.delay.unwrap_or(DEFAULT_DELAY_MS)),
        }
    }
}

/// Fully resolved warmer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmerConfig {
    pub flag: String,
    pub concurrency_field: String,
    pub test_field: String,
    pub log: bool,
    pub correlation_id: String,
    pub delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let config = WarmerOptions::default().resolve("1700000000000-0042");
        assert_eq!(config.flag, "warmer");
        assert_eq!(config.concurrency_field, "concurrency");
        assert_eq!(config.test_field, "test");
        assert!(config.log);
        assert_eq!(config.correlation_id, "1700000000000-0042");
        assert_eq!(config.delay, Duration::from_millis(75));
    }

    #[test]
    fn test_resolve_partial_override() {
        let config = WarmerOptions::default()
            .flag("ping")
            .delay_ms(10)
            .resolve("id");
        assert_eq!(config.flag, "ping");
        assert_eq!(config.concurrency_field, "concurrency");
        assert_eq!(config.delay, Duration::from_millis(10));
        assert_eq!(config.correlation_id, "id");
    }

    #[test]
    fn test_resolve_full_override() {
        let config = WarmerOptions::default()
            .flag("f")
            .concurrency_field("c")
            .test_field("t")
            .log(false)
            .correlation_id("corr")
            .delay_ms(0)
            .resolve("id");
        assert_eq!(config.flag, "f");
        assert_eq!(config.concurrency_field, "c");
        assert_eq!(config.test_field, "t");
        assert!(!config.log);
        assert_eq!(config.correlation_id, "corr");
        assert_eq!(config.delay, Duration::ZERO);
    }

    #[test]
    fn test_merged_over_prefers_self() {
        let base = WarmerOptions::default().flag("base").log(false).delay_ms(5);
        let call = WarmerOptions::default().flag("call");
        let merged = call.merged_over(&base);
        assert_eq!(merged.flag.as_deref(), Some("call"));
        assert_eq!(merged.log, Some(false));
        assert_eq!(merged.delay, Some(5));
        assert!(merged.concurrency.is_none());
    }

    #[test]
    fn test_options_deserialize_partial() {
        let opts: WarmerOptions = serde_json::from_str(r#"{"delay": 250}"#).unwrap();
        assert_eq!(opts.delay, Some(250));
        assert!(opts.flag.is_none());
    }
}
