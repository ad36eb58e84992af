//! Warmer: ping handler and metadata entry points
//!
//! A `Warmer` is built once per execution environment and shared by every
//! invocation the environment serves. Each call to [`Warmer::handle_ping`]
//! touches the process state, classifies the event, and, for a ping, runs
//! the fan-out coordinator.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::classifier::classify;
use crate::config::WarmerOptions;
use crate::error::Result;
use crate::fanout::{FanOutCoordinator, FanOutOutcome};
use crate::invoker::Invoker;
use crate::observability::metadata::{self, Metadata};
use crate::observability::{PingLog, PingLogRecord};
use crate::state::ProcessState;

/// Environment variable naming the running function
pub const FUNCTION_NAME_ENV: &str = "AWS_LAMBDA_FUNCTION_NAME";

/// Keeps the current execution environment warm
pub struct Warmer {
    state: ProcessState,
    coordinator: FanOutCoordinator,
    function_name: Option<String>,
    defaults: WarmerOptions,
    ping_log: PingLog,
}

impl Warmer {
    /// Create a warmer with fresh process state and no target function
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self {
            state: ProcessState::new(),
            coordinator: FanOutCoordinator::new(invoker),
            function_name: None,
            defaults: WarmerOptions::default(),
            ping_log: PingLog::new(),
        }
    }

    /// Create a warmer whose fan-out target is read from `AWS_LAMBDA_FUNCTION_NAME`
    pub fn from_env(invoker: Arc<dyn Invoker>) -> Self {
        let warmer = Self::new(invoker);
        match std::env::var(FUNCTION_NAME_ENV) {
            Ok(name) if !name.is_empty() => warmer.with_function_name(name),
            _ => warmer,
        }
    }

    /// Set the function that siblings are sent to
    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Replace the process state (e.g., one built on a test clock)
    pub fn with_state(mut self, state: ProcessState) -> Self {
        self.state = state;
        self
    }

    /// Options applied under every call's own options
    pub fn with_defaults(mut self, defaults: WarmerOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Process identity
    pub fn identity(&self) -> &str {
        self.state.identity()
    }

    /// Target function name, if known
    pub fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }

    /// Process state
    pub fn state(&self) -> &ProcessState {
        &self.state
    }

    /// Ping log counters
    pub fn ping_log(&self) -> &PingLog {
        &self.ping_log
    }

    /// Handle an incoming event.
    ///
    /// Returns `Ok(true)` when the event was a warming ping and any fan-out
    /// or delay has finished, `Ok(false)` for every other event. Invocation
    /// failures during fan-out are returned as errors.
    #[instrument(skip_all, fields(identity = %self.state.identity()))]
    pub async fn handle_ping(&self, event: &Value, options: &WarmerOptions) -> Result<bool> {
        let config = options
            .merged_over(&self.defaults)
            .resolve(self.state.identity());

        let before = self.state.snapshot();
        let classified = classify(event, &config);
        self.state.touch();

        let ping = match classified {
            Some(ping) => ping,
            None => {
                debug!("Event is not a warming ping");
                return Ok(false);
            }
        };

        if config.log {
            self.ping_log
                .record(&PingLogRecord::new(&ping, &before, self.function_name()));
        }

        let outcome = self
            .coordinator
            .run(&ping, &config, event, self.function_name())
            .await?;

        match outcome {
            FanOutOutcome::Dispatched { count } => info!(
                correlation_id = %ping.correlation_id,
                siblings = count,
                "Warming round complete"
            ),
            FanOutOutcome::Delayed(delay) => debug!(
                invocation_index = ping.invocation_index,
                delay_ms = delay.as_millis() as u64,
                "Sibling invocation released"
            ),
            FanOutOutcome::Immediate => debug!("Warming ping handled"),
        }

        Ok(true)
    }

    /// Current environment metadata. Never modifies state.
    pub fn metadata(&self) -> Metadata {
        metadata::report(&self.state, self.function_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WarmerError;
    use crate::invoker::{InvocationType, MockInvoker};
    use crate::state::tests::ManualClock;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    fn warmer(mock: &MockInvoker) -> (Warmer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10_000));
        let state = ProcessState::with_identity("10000-0001", clock.clone());
        let warmer = Warmer::new(Arc::new(mock.clone()))
            .with_state(state)
            .with_function_name("F");
        (warmer, clock)
    }

    #[tokio::test]
    async fn test_non_ping_returns_false_and_warms() {
        let mock = MockInvoker::new();
        let (warmer, _) = warmer(&mock);
        assert!(!warmer.metadata().warm);

        let handled = warmer
            .handle_ping(&json!({"concurrency": 4}), &WarmerOptions::default())
            .await
            .unwrap();
        assert!(!handled);

        let meta = warmer.metadata();
        assert!(meta.warm);
        assert_eq!(meta.last_access.unwrap().timestamp_millis(), 10_000);
        assert!(mock.requests().is_empty());
        assert_eq!(warmer.ping_log().total_records(), 0);
    }

    #[tokio::test]
    async fn test_plain_ping() {
        let mock = MockInvoker::new();
        let (warmer, _) = warmer(&mock);
        let handled = warmer
            .handle_ping(&json!({"warmer": true}), &WarmerOptions::default())
            .await
            .unwrap();
        assert!(handled);
        assert!(mock.requests().is_empty());
        assert_eq!(warmer.ping_log().total_records(), 1);
    }

    #[tokio::test]
    async fn test_fan_out_three() {
        let mock = MockInvoker::new();
        let (warmer, _) = warmer(&mock);
        let handled = warmer
            .handle_ping(&json!({"warmer": true, "concurrency": 3}), &WarmerOptions::default())
            .await
            .unwrap();
        assert!(handled);

        let requests = mock.requests();
        assert_eq!(requests.len(), 2);
        let sync: Vec<_> = requests
            .iter()
            .filter(|r| r.invocation_type == InvocationType::RequestResponse)
            .collect();
        assert_eq!(sync.len(), 1);
        let payload: Value = serde_json::from_slice(&sync[0].payload).unwrap();
        assert_eq!(payload["__WARMER_INVOCATION__"], 3);
        assert_eq!(payload["__WARMER_CONCURRENCY__"], 3);
        assert_eq!(payload["__WARMER_CORRELATIONID__"], "10000-0001");
    }

    #[tokio::test]
    async fn test_fan_out_forwards_event_correlation_id() {
        let mock = MockInvoker::new();
        let (warmer, _) = warmer(&mock);
        let event = json!({"warmer": true, "concurrency": 2, "__WARMER_CORRELATIONID__": "nightly"});
        warmer.handle_ping(&event, &WarmerOptions::default()).await.unwrap();
        assert_eq!(mock.payloads()[0]["__WARMER_CORRELATIONID__"], "nightly");
    }

    #[tokio::test]
    async fn test_test_field_suppresses_fan_out() {
        let mock = MockInvoker::new();
        let (warmer, _) = warmer(&mock);
        let handled = warmer
            .handle_ping(
                &json!({"warmer": true, "concurrency": 5, "test": true}),
                &WarmerOptions::default(),
            )
            .await
            .unwrap();
        assert!(handled);
        assert!(mock.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sibling_delays() {
        let mock = MockInvoker::new();
        let (warmer, _) = warmer(&mock);
        let start = Instant::now();
        let handled = warmer
            .handle_ping(
                &json!({"warmer": true, "__WARMER_INVOCATION__": 2}),
                &WarmerOptions::default().delay_ms(200),
            )
            .await
            .unwrap();
        assert!(handled);
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let mock = MockInvoker::new();
        mock.fail_on(3);
        let (warmer, _) = warmer(&mock);
        let result = warmer
            .handle_ping(&json!({"warmer": true, "concurrency": 3}), &WarmerOptions::default())
            .await;
        assert!(matches!(result, Err(WarmerError::Invoke { index: 3, .. })));
        assert!(warmer.metadata().warm);
    }

    #[tokio::test]
    async fn test_custom_flag_and_defaults_layering() {
        let mock = MockInvoker::new();
        let (warmer, _) = warmer(&mock);
        let warmer = warmer.with_defaults(WarmerOptions::default().flag("keepalive").log(false));

        let handled = warmer
            .handle_ping(&json!({"warmer": true}), &WarmerOptions::default())
            .await
            .unwrap();
        assert!(!handled);

        let handled = warmer
            .handle_ping(&json!({"keepalive": true, "concurrency": 2}), &WarmerOptions::default())
            .await
            .unwrap();
        assert!(handled);
        assert_eq!(mock.payloads()[0]["keepalive"], true);
        assert_eq!(warmer.ping_log().total_records(), 0);
    }

    #[tokio::test]
    async fn test_ping_log_records_state_before_touch() {
        let mock = MockInvoker::new();
        let (warmer, clock) = warmer(&mock);

        warmer
            .handle_ping(&json!({"warmer": true}), &WarmerOptions::default())
            .await
            .unwrap();
        let first = warmer.ping_log().last_record().unwrap();
        assert_eq!(first.identity, "10000-0001");
        assert_eq!(first.correlation_id, "10000-0001");
        assert_eq!(first.function.as_deref(), Some("F"));
        assert_eq!((first.count, first.concurrency), (1, 1));
        assert!(!first.warm);
        assert!(first.last_accessed.is_none());
        assert!(first.last_accessed_seconds.is_none());

        clock.advance_ms(2_500);
        let event = json!({
            "warmer": true,
            "__WARMER_INVOCATION__": 3,
            "__WARMER_CONCURRENCY__": 4,
            "__WARMER_CORRELATIONID__": "round-7",
        });
        warmer
            .handle_ping(&event, &WarmerOptions::default().delay_ms(1))
            .await
            .unwrap();
        let second = warmer.ping_log().last_record().unwrap();
        assert_eq!(second.correlation_id, "round-7");
        assert_eq!((second.count, second.concurrency), (3, 4));
        assert!(second.warm);
        assert_eq!(second.last_accessed, Some(10_000));
        assert_eq!(second.last_accessed_seconds, Some(2.5));
        assert_eq!(warmer.ping_log().total_records(), 2);
    }

    #[tokio::test]
    async fn test_metadata_tracks_elapsed_time() {
        let mock = MockInvoker::new();
        let (warmer, clock) = warmer(&mock);
        warmer
            .handle_ping(&json!({"warmer": true}), &WarmerOptions::default())
            .await
            .unwrap();
        clock.advance_ms(4_560);
        let first = warmer.metadata();
        let second = warmer.metadata();
        assert_eq!(first, second);
        assert_eq!(first.seconds_since_last_access, Some(4.6));
        assert_eq!(first.function_name.as_deref(), Some("F"));
        assert_eq!(first.identity, "10000-0001");
    }

    #[tokio::test]
    async fn test_fan_out_without_function_name_fails() {
        let mock = MockInvoker::new();
        let warmer = Warmer::new(Arc::new(mock.clone()));
        let result = warmer
            .handle_ping(&json!({"warmer": true, "concurrency": 2}), &WarmerOptions::default())
            .await;
        assert!(matches!(result, Err(WarmerError::Config(_))));
    }

    #[test]
    fn test_warmer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Warmer>();
    }
}
