//! The three register operations: read, CAS write, wait-for-change.
//!
//! Every operation on a name runs under that name's [`WaitEntry`] lock, so
//! all activity on a single register collapses into one serial order while
//! distinct registers stay fully independent. The compare and the write of a
//! CAS are therefore atomic with respect to every other operation on the
//! name: no reader or poller ever observes a value between an old and a new
//! state, and at most one writer wins a contended value.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::RegisterError;
use crate::registry::WaitRegistry;
use crate::store::RegisterStore;

/// Result of a compare-and-swap attempt. A mismatch is a normal outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub struct CasOutcome {
    /// Whether the swap was applied.
    pub success: bool,
    /// The register's value after the attempt: the new value on success,
    /// the actual current value on mismatch.
    pub current_state: Value,
}

/// Composes the store and the wait registry under per-name locking.
#[derive(Debug)]
pub struct Coordinator {
    store: RegisterStore,
    registry: WaitRegistry,
    poll_timeout: Option<Duration>,
}

impl Coordinator {
    /// Create a coordinator.
    ///
    /// `poll_timeout` bounds [`Self::wait_for_change`]; `None` preserves the
    /// indefinite block of the original protocol. An expired poll resolves
    /// with the current (unchanged) value rather than an error.
    pub fn new(
        store: RegisterStore,
        registry: WaitRegistry,
        poll_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            registry,
            poll_timeout,
        }
    }

    /// Current value of `name`, with absent folded to `null`.
    ///
    /// Takes the register's lock so the read serializes with any in-flight
    /// CAS and never observes a half-installed value.
    pub async fn read(&self, name: &str) -> Result<Value, RegisterError> {
        let entry = self.registry.entry_for(name);
        let _guard = entry.lock().await;
        Ok(self.store.read(name).await?.unwrap_or(Value::Null))
    }

    /// Swap `name` to `new` if its current value deep-equals `old`.
    ///
    /// Comparison is structural: arrays element-wise and order-sensitive,
    /// objects by key set, scalars by value. An absent register compares
    /// equal to `null`. This is the only mutating path; on success every
    /// poller suspended on `name` is woken.
    pub async fn compare_and_swap(
        &self,
        name: &str,
        old: &Value,
        new: Value,
    ) -> Result<CasOutcome, RegisterError> {
        let entry = self.registry.entry_for(name);
        let _guard = entry.lock().await;
        let current = self.store.read(name).await?.unwrap_or(Value::Null);
        if current == *old {
            self.store.write(name, &new).await?;
            self.registry.notify_all(name);
            debug!(register = name, "cas applied");
            Ok(CasOutcome {
                success: true,
                current_state: new,
            })
        } else {
            debug!(register = name, "cas mismatch");
            Ok(CasOutcome {
                success: false,
                current_state: current,
            })
        }
    }

    /// Block until the value of `name` differs from `expected`, then return
    /// the current value.
    ///
    /// Returns immediately if the live value already differs. While
    /// suspended the register's lock is released and re-acquired before the
    /// predicate is re-tested, so spurious wakeups are harmless. The waiter
    /// registers itself before releasing the lock, closing the window in
    /// which a notification could fire unseen. If the caller disappears the
    /// guard drops on cancellation and the lock is released.
    ///
    /// With a configured poll timeout, expiry resolves to the current
    /// (unchanged) value — an ordinary response, not a failure.
    pub async fn wait_for_change(
        &self,
        name: &str,
        expected: &Value,
    ) -> Result<Value, RegisterError> {
        let entry = self.registry.entry_for(name);
        let deadline = self.poll_timeout.map(|t| tokio::time::Instant::now() + t);

        let mut guard = entry.lock().await;
        loop {
            let current = self.store.read(name).await?.unwrap_or(Value::Null);
            if current != *expected {
                debug!(register = name, "poll observed change");
                return Ok(current);
            }

            let changed = entry.changed();
            tokio::pin!(changed);
            // Register interest while still holding the lock: a CAS can only
            // commit (and notify) after the guard drops, by which point this
            // waiter is already enrolled.
            changed.as_mut().enable();
            drop(guard);

            match deadline {
                None => changed.await,
                Some(at) => {
                    if tokio::time::timeout_at(at, changed).await.is_err() {
                        let _guard = entry.lock().await;
                        let current =
                            self.store.read(name).await?.unwrap_or(Value::Null);
                        debug!(register = name, "poll timed out");
                        return Ok(current);
                    }
                }
            }

            guard = entry.lock().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn coordinator(poll_timeout: Option<Duration>) -> (TempDir, Arc<Coordinator>) {
        let dir = TempDir::new().expect("tempdir");
        let coordinator = Coordinator::new(
            RegisterStore::new(dir.path()),
            WaitRegistry::new(),
            poll_timeout,
        );
        (dir, Arc::new(coordinator))
    }

    #[tokio::test]
    async fn absent_reads_as_null() {
        let (_dir, c) = coordinator(None);
        assert_eq!(c.read("foo").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn cas_from_absent_then_read_back() {
        let (_dir, c) = coordinator(None);
        let outcome = c
            .compare_and_swap("foo", &Value::Null, json!({"x": 1}))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.current_state, json!({"x": 1}));
        assert_eq!(c.read("foo").await.unwrap(), json!({"x": 1}));
    }

    #[tokio::test]
    async fn cas_mismatch_reports_actual_and_leaves_register_unchanged() {
        let (_dir, c) = coordinator(None);
        c.compare_and_swap("foo", &Value::Null, json!({"x": 1}))
            .await
            .unwrap();

        let outcome = c
            .compare_and_swap("foo", &json!("wrong"), json!({"x": 2}))
            .await
            .unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.current_state, json!({"x": 1}));
        assert_eq!(c.read("foo").await.unwrap(), json!({"x": 1}));
    }

    #[tokio::test]
    async fn cas_comparison_is_structural() {
        let (_dir, c) = coordinator(None);
        c.compare_and_swap("foo", &Value::Null, json!({"a": 1, "b": [1, 2]}))
            .await
            .unwrap();

        // Object key order is irrelevant.
        let outcome = c
            .compare_and_swap("foo", &json!({"b": [1, 2], "a": 1}), json!("next"))
            .await
            .unwrap();
        assert!(outcome.success);

        // Array order is not.
        let outcome = c
            .compare_and_swap("bar", &Value::Null, json!([1, 2]))
            .await
            .unwrap();
        assert!(outcome.success);
        let outcome = c
            .compare_and_swap("bar", &json!([2, 1]), json!("never"))
            .await
            .unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn contended_cas_has_exactly_one_winner() {
        let (_dir, c) = coordinator(None);
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let c = Arc::clone(&c);
                tokio::spawn(async move {
                    c.compare_and_swap("foo", &Value::Null, json!({"winner": i}))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let outcomes = futures::future::try_join_all(tasks).await.unwrap();

        let winners: Vec<_> = outcomes.iter().filter(|o| o.success).collect();
        assert_eq!(winners.len(), 1);
        let winning_value = winners[0].current_state.clone();

        // Losers observed the committed value, and the register holds it.
        for outcome in outcomes.iter().filter(|o| !o.success) {
            assert_eq!(outcome.current_state, winning_value);
        }
        assert_eq!(c.read("foo").await.unwrap(), winning_value);
    }

    #[tokio::test]
    async fn poll_returns_immediately_when_value_already_differs() {
        let (_dir, c) = coordinator(None);
        c.compare_and_swap("foo", &Value::Null, json!(1)).await.unwrap();

        let current = tokio::time::timeout(
            Duration::from_millis(100),
            c.wait_for_change("foo", &json!(0)),
        )
        .await
        .expect("poll must not block on a stale expectation")
        .unwrap();
        assert_eq!(current, json!(1));
    }

    #[tokio::test]
    async fn poll_wakes_on_cas_and_sees_the_committed_value() {
        let (_dir, c) = coordinator(None);
        c.compare_and_swap("foo", &Value::Null, json!({"x": 1}))
            .await
            .unwrap();

        let poller = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.wait_for_change("foo", &json!({"x": 1})).await })
        };

        // Give the poller time to suspend; if it has not yet, the CAS simply
        // commits first and the poller returns on its initial check.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let outcome = c
            .compare_and_swap("foo", &json!({"x": 1}), json!({"x": 2}))
            .await
            .unwrap();
        assert!(outcome.success);

        let current = tokio::time::timeout(Duration::from_secs(5), poller)
            .await
            .expect("poller was never woken")
            .unwrap()
            .unwrap();
        assert_eq!(current, json!({"x": 2}));
    }

    #[tokio::test]
    async fn poll_ignores_cas_that_does_not_change_the_value() {
        let (_dir, c) = coordinator(Some(Duration::from_millis(200)));
        c.compare_and_swap("foo", &Value::Null, json!(1)).await.unwrap();

        let poller = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.wait_for_change("foo", &json!(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Rewrites the same value: pollers wake, re-check, and keep waiting
        // until the timeout resolves them with the unchanged value.
        let outcome = c.compare_and_swap("foo", &json!(1), json!(1)).await.unwrap();
        assert!(outcome.success);

        let current = tokio::time::timeout(Duration::from_secs(5), poller)
            .await
            .expect("bounded poll did not resolve")
            .unwrap()
            .unwrap();
        assert_eq!(current, json!(1));
    }

    #[tokio::test]
    async fn bounded_poll_expiry_is_an_unchanged_result() {
        let (_dir, c) = coordinator(Some(Duration::from_millis(100)));
        c.compare_and_swap("foo", &Value::Null, json!("v")).await.unwrap();

        let current = c.wait_for_change("foo", &json!("v")).await.unwrap();
        assert_eq!(current, json!("v"));
    }

    #[tokio::test]
    async fn operations_on_distinct_names_are_independent() {
        let (_dir, c) = coordinator(None);
        c.compare_and_swap("foo", &Value::Null, json!(1)).await.unwrap();

        let poller = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.wait_for_change("foo", &json!(1)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        // A suspended poll on "foo" must not block work on "bar".
        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            c.compare_and_swap("bar", &Value::Null, json!(2)),
        )
        .await
        .expect("operation on an unrelated name was blocked")
        .unwrap();
        assert!(outcome.success);

        c.compare_and_swap("foo", &json!(1), json!(9)).await.unwrap();
        poller.await.unwrap().unwrap();
    }
}
