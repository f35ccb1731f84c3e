//! Request coalescing.
//!
//! A [`Coalescer`] collapses concurrent calls that share an operation key into
//! a single unit of work. The first caller for a key starts the work on its
//! own task; every caller for that key, the first included, waits for the
//! published result and receives a clone of it. Once the result is published
//! the entry is removed, so the next call for that key starts fresh.
//!
//! The work is detached from the caller that started it: dropping any caller
//! leaves the work running for the others. Followers only observe
//! [`StoreError::Abandoned`] when the work itself panics. There is no
//! cancellation channel, so a unit of work that never completes blocks every
//! caller for its key until their own timeouts give up.

use crate::error::{Result, StoreError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

type Slot<T> = watch::Receiver<Option<Result<T>>>;
type Calls<T> = Arc<Mutex<HashMap<String, Slot<T>>>>;

pub struct Coalescer<T> {
    calls: Calls<T>,
}

/// Owns a unit of work's in-flight entry and its result channel.
///
/// Dropping it removes the entry first, then publishes the outcome. If the
/// work unwound without an outcome the channel simply closes.
struct InflightGuard<T> {
    calls: Calls<T>,
    key: String,
    tx: watch::Sender<Option<Result<T>>>,
    outcome: Option<Result<T>>,
}

impl<T> Drop for InflightGuard<T> {
    fn drop(&mut self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
        if let Some(outcome) = self.outcome.take() {
            self.tx.send_replace(Some(outcome));
        }
    }
}

impl<T> Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join the call already in flight for it.
    pub async fn execute<F, Fut>(&self, key: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut slot = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            match calls.get(key) {
                Some(slot) => {
                    tracing::debug!("joined in-flight call for {}", key);
                    slot.clone()
                }
                None => {
                    let (tx, rx) = watch::channel(None);
                    calls.insert(key.to_string(), rx.clone());

                    let mut guard = InflightGuard {
                        calls: self.calls.clone(),
                        key: key.to_string(),
                        tx,
                        outcome: None,
                    };
                    let work = work();
                    tokio::spawn(async move {
                        guard.outcome = Some(work.await);
                    });
                    rx
                }
            }
        };

        match slot.wait_for(Option::is_some).await {
            Ok(published) => published
                .as_ref()
                .cloned()
                .unwrap_or(Err(StoreError::Abandoned)),
            Err(_) => Err(StoreError::Abandoned),
        }
    }

    /// Number of keys with a unit of work currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<T> Default for Coalescer<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
