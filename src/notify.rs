//! Low-balance notifications.
//!
//! The ledger reports threshold crossings to a [`BalanceWatcher`] after the
//! write has committed. Dispatch is fire-and-forget on a spawned task, so a
//! slow or failing watcher can never roll back or fail a ledger write.

use crate::entities::BalanceType;
use std::sync::Arc;

/// Receiver for balance events. Implementations must not assume they run
/// before, or transactionally with, the ledger write that triggered them.
pub trait BalanceWatcher: Send + Sync + 'static {
    /// A balance dropped below the configured threshold.
    fn low_balance(&self, user_id: i64, balance_type: BalanceType, amount: i64);
}

/// Default watcher: logs a warning.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingWatcher;

impl BalanceWatcher for TracingWatcher {
    fn low_balance(&self, user_id: i64, balance_type: BalanceType, amount: i64) {
        tracing::warn!(user_id, ?balance_type, amount, "balance below threshold");
    }
}

/// Threshold plus watcher, passed into ledger writes that should report
/// crossings.
#[derive(Clone)]
pub struct BalanceAlert {
    /// Balances at or above this amount are considered healthy
    pub threshold: i64,
    /// Where crossings are reported
    pub watcher: Arc<dyn BalanceWatcher>,
}

impl BalanceAlert {
    /// Builds an alert with the default tracing watcher.
    #[must_use]
    pub fn tracing(threshold: i64) -> Self {
        Self {
            threshold,
            watcher: Arc::new(TracingWatcher),
        }
    }

    /// Fires the watcher when a write took the balance from healthy to
    /// below-threshold. Called after commit; runs detached.
    pub fn notify_if_crossed(
        &self,
        user_id: i64,
        balance_type: BalanceType,
        previous: i64,
        new: i64,
    ) {
        if previous >= self.threshold && new < self.threshold {
            let watcher = Arc::clone(&self.watcher);
            tokio::spawn(async move {
                watcher.low_balance(user_id, balance_type, new);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recording {
        events: Mutex<Vec<(i64, BalanceType, i64)>>,
    }

    impl BalanceWatcher for Arc<Recording> {
        fn low_balance(&self, user_id: i64, balance_type: BalanceType, amount: i64) {
            self.events
                .lock()
                .unwrap()
                .push((user_id, balance_type, amount));
        }
    }

    #[tokio::test]
    async fn test_alert_fires_only_on_downward_crossing() {
        let recording = Arc::new(Recording::default());
        let alert = BalanceAlert {
            threshold: 0,
            watcher: Arc::new(Arc::clone(&recording)),
        };

        // crossing: 10 -> -5
        alert.notify_if_crossed(1, BalanceType::Lunch, 10, -5);
        // already below: -5 -> -10
        alert.notify_if_crossed(1, BalanceType::Lunch, -5, -10);
        // recovering: -10 -> 20
        alert.notify_if_crossed(1, BalanceType::Lunch, -10, 20);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let events = recording.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], (1, BalanceType::Lunch, -5));
    }
}
