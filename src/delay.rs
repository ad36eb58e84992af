//! Sibling delay: holds a spawned invocation open so its environment
//! finishes initializing before it goes back to the pool

use std::time::Duration;
use tracing::trace;

/// Pause the current task for `duration`. Not cancellable.
pub async fn suspend(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    trace!(delay_ms = duration.as_millis() as u64, "Suspending sibling invocation");
    tokio::time::sleep(duration).await;
}
