use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct InflightSnapshot {
    pub max: usize,
    pub available: usize,
    pub in_use: usize,
}

/// System-wide bound on concurrent upstream calls.
///
/// A slot is an [`OwnedSemaphorePermit`]; dropping it releases the slot on
/// every exit path, including errors, cancellation and panics.
pub struct Admission {
    max: usize,
    slots: Arc<Semaphore>,
}

impl Admission {
    pub fn new(max: usize) -> Self {
        let max = max.max(1);
        Self {
            max,
            slots: Arc::new(Semaphore::new(max)),
        }
    }

    /// Wait for a free slot until `deadline`, or until `cancel` fires.
    pub async fn acquire(
        &self,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<OwnedSemaphorePermit> {
        let started = Instant::now();
        let slots = Arc::clone(&self.slots);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout_at(deadline, slots.acquire_owned()) => match res {
                Ok(Ok(permit)) => Ok(permit),
                // The semaphore is never closed; treat it like saturation if it ever is.
                Ok(Err(_)) | Err(_) => {
                    let waited = started.elapsed();
                    debug!(
                        waited_ms = waited.as_millis() as u64,
                        max = self.max,
                        "no admission slot before deadline"
                    );
                    Err(Error::Saturated { waited })
                }
            },
        }
    }

    /// Take a slot only if one is free right now.
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.slots).try_acquire_owned().ok()
    }

    pub fn snapshot(&self) -> InflightSnapshot {
        let available = self.slots.available_permits();
        InflightSnapshot {
            max: self.max,
            available,
            in_use: self.max.saturating_sub(available),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[tokio::test]
    async fn capacity_bounds_holders() {
        let adm = Admission::new(2);
        let cancel = CancellationToken::new();
        let a = adm.acquire(far_deadline(), &cancel).await.unwrap();
        let _b = adm.acquire(far_deadline(), &cancel).await.unwrap();
        assert_eq!(adm.snapshot().in_use, 2);
        assert!(adm.try_acquire().is_none());

        drop(a);
        assert_eq!(adm.snapshot().available, 1);
        assert!(adm.try_acquire().is_some());
    }

    #[tokio::test]
    async fn extra_caller_blocks_until_release() {
        let adm = Arc::new(Admission::new(1));
        let cancel = CancellationToken::new();
        let held = adm.acquire(far_deadline(), &cancel).await.unwrap();

        let waiter = {
            let adm = Arc::clone(&adm);
            let cancel = cancel.clone();
            tokio::spawn(async move { adm.acquire(far_deadline(), &cancel).await.is_ok() })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());

        drop(held);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn deadline_yields_saturated() {
        let adm = Admission::new(1);
        let cancel = CancellationToken::new();
        let _held = adm.acquire(far_deadline(), &cancel).await.unwrap();

        let deadline = Instant::now() + Duration::from_millis(20);
        let err = adm.acquire(deadline, &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Saturated { .. }));
    }

    #[tokio::test]
    async fn cancellation_wins_over_waiting() {
        let adm = Admission::new(1);
        let cancel = CancellationToken::new();
        let _held = adm.acquire(far_deadline(), &cancel).await.unwrap();

        cancel.cancel();
        let err = adm.acquire(far_deadline(), &cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(adm.snapshot().in_use, 1);
    }

    #[tokio::test]
    async fn zero_capacity_is_raised_to_one() {
        let adm = Admission::new(0);
        assert_eq!(adm.snapshot().max, 1);
    }
}
