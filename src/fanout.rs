//! Fan-out coordinator: turns a classified ping into sibling invocations
//!
//! For a ping with concurrency `N`, siblings `2..N` are invoked. Siblings
//! `2..N-1` go out as `Event` invocations; sibling `N` is a
//! `RequestResponse` invocation, so the round is not reported complete
//! until the far end of the chain has been reached. Every invocation runs
//! as a detached task and reports back over a channel; all of them settle
//! before the coordinator returns. Dropping the coordinator's future stops
//! the wait, never an invocation already sent.
//!
//! ```text
//!  ping(N=4) ──► coordinator ─┬─► #2  Event            ─┐
//!                             ├─► #3  Event             ├─► join all ─► Ok / first failure
//!                             └─► #4  RequestResponse  ─┘
//! ```

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::classifier::{
    is_truthy, ClassifiedPing, CONCURRENCY_FIELD, CORRELATION_FIELD, INVOCATION_FIELD,
};
use crate::config::WarmerConfig;
use crate::delay;
use crate::error::{Result, WarmerError};
use crate::invoker::{InvocationType, InvokeRequest, Invoker};

/// Payload sent to one sibling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingPayload {
    /// Position of the sibling in the round (2..=concurrency)
    pub index: u32,
    /// Round size
    pub total: u32,
    /// Correlation id of the round
    pub correlation_id: String,
}

impl SiblingPayload {
    /// The sibling that closes the chain is invoked synchronously
    pub fn invocation_type(&self) -> InvocationType {
        if self.index == self.total {
            InvocationType::RequestResponse
        } else {
            InvocationType::Event
        }
    }

    /// Render as the event the sibling will receive
    pub fn to_event(&self, flag: &str) -> Value {
        let mut event = Map::new();
        event.insert(flag.to_string(), Value::Bool(true));
        event.insert(INVOCATION_FIELD.to_string(), Value::from(self.index));
        event.insert(CONCURRENCY_FIELD.to_string(), Value::from(self.total));
        event.insert(
            CORRELATION_FIELD.to_string(),
            Value::String(self.correlation_id.clone()),
        );
        Value::Object(event)
    }
}

/// The siblings of one round, produced on demand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingPlan {
    total: u32,
    correlation_id: String,
}

impl SiblingPlan {
    /// Plan siblings `2..=total` of a round
    pub fn new(total: u32, correlation_id: impl Into<String>) -> Self {
        Self {
            total,
            correlation_id: correlation_id.into(),
        }
    }

    /// Number of siblings to invoke
    pub fn len(&self) -> u32 {
        self.total.saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Siblings in index order
    pub fn siblings(&self) -> impl Iterator<Item = SiblingPayload> + '_ {
        (2..=self.total).map(move |index| SiblingPayload {
            index,
            total: self.total,
            correlation_id: self.correlation_id.clone(),
        })
    }
}

/// What to do with a classified ping
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutDecision {
    /// Invoke these siblings
    FanOut(SiblingPlan),
    /// This is a sibling; pause, then return
    Delay(Duration),
    /// Nothing further to do
    Done,
}

/// What the coordinator did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOutOutcome {
    /// Siblings were invoked and all settled successfully
    Dispatched { count: u32 },
    /// The invocation paused for the sibling delay
    Delayed(Duration),
    /// Returned without further work
    Immediate,
}

/// Decide how to handle a classified ping.
///
/// Fan-out needs concurrency above 1 and a falsy test field. Otherwise a
/// sibling (index above 1) takes the delay; anything else is done.
pub fn decide(ping: &ClassifiedPing, config: &WarmerConfig, event: &Value) -> FanOutDecision {
    if ping.concurrency > 1 && !is_truthy(event.get(&config.test_field)) {
        FanOutDecision::FanOut(SiblingPlan::new(
            ping.concurrency,
            ping.correlation_id.clone(),
        ))
    } else if ping.invocation_index > 1 {
        FanOutDecision::Delay(config.delay)
    } else {
        FanOutDecision::Done
    }
}

/// Dispatches sibling invocations through an injected invoker
pub struct FanOutCoordinator {
    invoker: Arc<dyn Invoker>,
}

impl FanOutCoordinator {
    /// Create a coordinator around an invoker
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self { invoker }
    }

    /// Invoker in use
    pub fn invoker(&self) -> &Arc<dyn Invoker> {
        &self.invoker
    }

    /// Carry out the decision for a classified ping
    #[instrument(skip_all, fields(correlation_id = %ping.correlation_id, concurrency = ping.concurrency))]
    pub async fn run(
        &self,
        ping: &ClassifiedPing,
        config: &WarmerConfig,
        event: &Value,
        function_name: Option<&str>,
    ) -> Result<FanOutOutcome> {
        match decide(ping, config, event) {
            FanOutDecision::FanOut(plan) => {
                let function_name = function_name.ok_or_else(|| {
                    WarmerError::Config(
                        "fan-out requested but the target function name is unknown".to_string(),
                    )
                })?;
                self.dispatch(function_name, &config.flag, &plan).await?;
                Ok(FanOutOutcome::Dispatched { count: plan.len() })
            }
            FanOutDecision::Delay(duration) => {
                delay::suspend(duration).await;
                Ok(FanOutOutcome::Delayed(duration))
            }
            FanOutDecision::Done => Ok(FanOutOutcome::Immediate),
        }
    }

    /// Invoke every sibling and wait for all of them to settle.
    ///
    /// Failures are not retried. When several invocations fail, the
    /// synchronous one's error is returned, otherwise the lowest index.
    async fn dispatch(&self, function_name: &str, flag: &str, plan: &SiblingPlan) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        for sibling in plan.siblings() {
            let request = InvokeRequest {
                function_name: function_name.to_string(),
                invocation_type: sibling.invocation_type(),
                index: sibling.index,
                payload: Bytes::from(serde_json::to_vec(&sibling.to_event(flag))?),
            };
            debug!(
                function = function_name,
                index = request.index,
                invocation_type = %request.invocation_type,
                invoker = self.invoker.name(),
                "Dispatching sibling invocation"
            );

            let invoker = Arc::clone(&self.invoker);
            let tx = tx.clone();
            let index = request.index;
            let sync = request.invocation_type.is_sync();
            // The outer task outlives a dropped caller; the inner one isolates a panicking invoker
            tokio::spawn(async move {
                let settled = tokio::spawn(async move { invoker.invoke(request).await }).await;
                let _ = tx.send((index, sync, settled));
            });
        }
        drop(tx);

        let mut first_failure: Option<((bool, u32), WarmerError)> = None;
        while let Some((index, sync, settled)) = rx.recv().await {
            let error = match settled {
                Ok(Ok(outcome)) => {
                    debug!(index, status = outcome.status_code, "Sibling invocation settled");
                    continue;
                }
                Ok(Err(e @ WarmerError::Invoke { .. })) => e,
                Ok(Err(e)) => WarmerError::Invoke {
                    function: function_name.to_string(),
                    index,
                    message: e.to_string(),
                },
                Err(e) => WarmerError::Invoke {
                    function: function_name.to_string(),
                    index,
                    message: format!("invocation task failed: {}", e),
                },
            };
            warn!(function = function_name, index, error = %error, "Sibling invocation failed");

            // Sync failures sort first, then lower indices
            let rank = (!sync, index);
            if first_failure.as_ref().map_or(true, |(best, _)| rank < *best) {
                first_failure = Some((rank, error));
            }
        }

        match first_failure {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }
}
