//! Per-process warm state: identity, warm flag, and last access time
//!
//! One `ProcessState` lives for the lifetime of an execution environment.
//! It starts cold and turns warm on the first observed event; it never goes
//! back to cold; staleness is judged from `seconds_since_last_access`.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Time source, injectable for deterministic tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Warm status of the execution environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmState {
    /// No event observed yet
    #[default]
    Cold,
    /// At least one event observed
    Warm,
}

impl std::fmt::Display for WarmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cold => write!(f, "cold"),
            Self::Warm => write!(f, "warm"),
        }
    }
}

/// Point-in-time copy of the process state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub identity: String,
    pub warm: bool,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_access: Option<DateTime<Utc>>,
    /// Seconds since `last_access`, rounded to one decimal
    pub seconds_since_last_access: Option<f64>,
}

#[derive(Debug, Default)]
struct Inner {
    warm: WarmState,
    last_access: Option<DateTime<Utc>>,
}

/// Process-scoped warm state
pub struct ProcessState {
    identity: String,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl ProcessState {
    /// Create state with a fresh identity from the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create state with a fresh identity from the given clock
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let suffix = rand::thread_rng().gen_range(0..1000);
        let identity = generate_identity(clock.now(), suffix);
        Self::with_identity(identity, clock)
    }

    /// Create state with a fixed identity
    pub fn with_identity(identity: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            identity: identity.into(),
            clock,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Process identity, fixed for the life of the state
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current warm status
    pub fn warm_state(&self) -> WarmState {
        self.lock().warm
    }

    /// Mark the environment warm and refresh the last access time
    pub fn touch(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.warm = WarmState::Warm;
        inner.last_access = Some(now);
    }

    /// Read the current state without modifying it
    pub fn snapshot(&self) -> StateSnapshot {
        let now = self.clock.now();
        let inner = self.lock();
        StateSnapshot {
            identity: self.identity.clone(),
            warm: inner.warm == WarmState::Warm,
            last_access: inner.last_access,
            seconds_since_last_access: inner
                .last_access
                .map(|at| seconds_between(at, now)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner holds plain values, so a poisoned lock is still consistent
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a process identity: `<epoch millis>-<suffix zero-padded to 4 digits>`
pub fn generate_identity(now: DateTime<Utc>, suffix: u32) -> String {
    format!("{}-{:04}", now.timestamp_millis(), suffix % 10_000)
}

fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let millis = (later - earlier).num_milliseconds() as f64;
    (millis / 100.0).round() / 10.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Clock that only moves when told to
    pub(crate) struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub(crate) fn new(millis: i64) -> Self {
            Self {
                now: Mutex::new(Utc.timestamp_millis_opt(millis).unwrap()),
            }
        }

        pub(crate) fn advance_ms(&self, ms: i64) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::milliseconds(ms);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[test]
    fn test_generate_identity_format() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(generate_identity(now, 7), "1700000000123-0007");
        assert_eq!(generate_identity(now, 999), "1700000000123-0999");
    }

    #[test]
    fn test_identity_from_clock() {
        let clock = Arc::new(ManualClock::new(1_000));
        let state = ProcessState::with_clock(clock);
        assert!(state.identity().starts_with("1000-"));
        assert_eq!(state.identity().len(), "1000-".len() + 4);
    }

    #[test]
    fn test_initial_state_is_cold() {
        let state = ProcessState::with_identity("id", Arc::new(ManualClock::new(0)));
        let snap = state.snapshot();
        assert_eq!(state.warm_state(), WarmState::Cold);
        assert!(!snap.warm);
        assert!(snap.last_access.is_none());
        assert!(snap.seconds_since_last_access.is_none());
    }

    #[test]
    fn test_touch_marks_warm() {
        let clock = Arc::new(ManualClock::new(5_000));
        let state = ProcessState::with_identity("id", clock.clone());
        state.touch();
        let snap = state.snapshot();
        assert!(snap.warm);
        assert_eq!(snap.last_access.unwrap().timestamp_millis(), 5_000);
        assert_eq!(snap.seconds_since_last_access, Some(0.0));
    }

    #[test]
    fn test_touch_refreshes_last_access() {
        let clock = Arc::new(ManualClock::new(0));
        let state = ProcessState::with_identity("id", clock.clone());
        state.touch();
        clock.advance_ms(2_000);
        state.touch();
        assert_eq!(
            state.snapshot().last_access.unwrap().timestamp_millis(),
            2_000
        );
        assert_eq!(state.warm_state(), WarmState::Warm);
    }

    #[test]
    fn test_seconds_since_rounded_to_one_decimal() {
        let clock = Arc::new(ManualClock::new(0));
        let state = ProcessState::with_identity("id", clock.clone());
        state.touch();
        clock.advance_ms(1_249);
        assert_eq!(state.snapshot().seconds_since_last_access, Some(1.2));
        clock.advance_ms(2);
        assert_eq!(state.snapshot().seconds_since_last_access, Some(1.3));
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let clock = Arc::new(ManualClock::new(0));
        let state = ProcessState::with_identity("id", clock.clone());
        let first = state.snapshot();
        clock.advance_ms(500);
        let second = state.snapshot();
        assert_eq!(first, second);
        assert_eq!(state.warm_state(), WarmState::Cold);
    }

    #[test]
    fn test_warm_state_display() {
        assert_eq!(WarmState::Cold.to_string(), "cold");
        assert_eq!(WarmState::Warm.to_string(), "warm");
    }

    #[test]
    fn test_snapshot_serializes_millis() {
        let clock = Arc::new(ManualClock::new(42_000));
        let state = ProcessState::with_identity("id", clock);
        state.touch();
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(json["last_access"], 42_000);
        assert_eq!(json["warm"], true);
    }

    #[test]
    fn test_state_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ProcessState>();
    }
}
