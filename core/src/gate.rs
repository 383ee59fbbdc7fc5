//! Fixed-capacity admission control for outbound requests.
//!
//! Backed by a [`tokio::sync::Semaphore`]. A slot is held as a [`GatePermit`]
//! and returned to the pool when the permit is dropped, so every exit path of
//! a fetch releases exactly once.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};

/// Default gate capacity when the configured value is not positive.
pub const DEFAULT_MAX_CONNECTIONS: usize = 5;

#[derive(Debug)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held gate slot. Dropping it releases the slot.
#[derive(Debug)]
pub struct GatePermit {
    permit: OwnedSemaphorePermit,
}

impl GatePermit {
    /// Return the slot now rather than at end of scope.
    pub fn release(self) {
        drop(self.permit);
    }
}

impl ConcurrencyGate {
    /// A capacity of zero is raised to one so acquire can make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot or for `cancel` to fire.
    ///
    /// Cancellation wins if both are ready, and never consumes a slot.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<GatePermit> {
        if self.semaphore.available_permits() == 0 {
            debug!(capacity = self.capacity, "gate full, waiting for a slot");
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => Ok(GatePermit { permit }),
                // the semaphore is never closed while the gate is alive
                Err(_) => Err(Error::Cancelled),
            },
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_up_to_capacity() {
        let gate = ConcurrencyGate::new(2);
        let token = CancellationToken::new();

        let p1 = gate.acquire(&token).await.unwrap();
        let _p2 = gate.acquire(&token).await.unwrap();
        assert_eq!(gate.available(), 0);
        assert_eq!(gate.in_use(), 2);

        p1.release();
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn zero_capacity_is_raised_to_one() {
        let gate = ConcurrencyGate::new(0);
        assert_eq!(gate.capacity(), 1);
    }

    #[tokio::test]
    async fn cancelled_token_does_not_consume_slot() {
        let gate = ConcurrencyGate::new(1);
        let token = CancellationToken::new();
        token.cancel();

        let err = gate.acquire(&token).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn cancel_while_waiting() {
        let gate = Arc::new(ConcurrencyGate::new(1));
        let token = CancellationToken::new();
        let held = gate.acquire(&token).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let token = token.clone();
            tokio::spawn(async move { gate.acquire(&token).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        let result = tokio::time::timeout(Duration::from_millis(100), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));

        drop(held);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn waiter_proceeds_after_release() {
        let gate = Arc::new(ConcurrencyGate::new(1));
        let token = CancellationToken::new();
        let held = gate.acquire(&token).await.unwrap();

        let waiter = {
            let gate = gate.clone();
            let token = token.clone();
            tokio::spawn(async move { gate.acquire(&token).await.is_ok() })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(held);

        let result = tokio::time::timeout(Duration::from_millis(100), waiter).await;
        assert!(result.unwrap().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn burst_never_exceeds_capacity() {
        for capacity in 1..=4 {
            let gate = Arc::new(ConcurrencyGate::new(capacity));
            let current = Arc::new(AtomicUsize::new(0));
            let peak = Arc::new(AtomicUsize::new(0));
            let token = CancellationToken::new();

            let mut tasks = tokio::task::JoinSet::new();
            for _ in 0..capacity + 3 {
                let gate = gate.clone();
                let current = current.clone();
                let peak = peak.clone();
                let token = token.clone();
                tasks.spawn(async move {
                    let _permit = gate.acquire(&token).await.unwrap();
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                });
            }
            while let Some(joined) = tasks.join_next().await {
                joined.unwrap();
            }

            assert!(peak.load(Ordering::SeqCst) <= capacity, "capacity {capacity}");
            assert_eq!(gate.available(), capacity);
        }
    }
}
