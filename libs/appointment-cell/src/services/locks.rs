use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// One async mutex per practitioner.
///
/// Every mutation of a practitioner's appointments runs while holding the
/// guard, so the fetch, conflict check and save of one request cannot
/// interleave with another request for the same practitioner. Only covers a
/// single process.
#[derive(Default)]
pub struct SchedulingLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SchedulingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, practitioner_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(practitioner_id).or_default().clone()
        };

        debug!("Waiting for scheduling lock of practitioner {}", practitioner_id);
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_practitioner_is_serialised() {
        let locks = Arc::new(SchedulingLocks::new());
        let practitioner = Uuid::new_v4();

        let guard = locks.acquire(practitioner).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(practitioner).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_practitioners_do_not_block() {
        let locks = SchedulingLocks::new();
        let _first = locks.acquire(Uuid::new_v4()).await;
        let second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;
        assert!(second.is_ok());
    }
}
