//! Per-candidate mutual exclusion.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use hai_domain::CandidateId;

type LockMap = Mutex<HashMap<CandidateId, Arc<AsyncMutex<()>>>>;

fn lock_map(map: &LockMap) -> MutexGuard<'_, HashMap<CandidateId, Arc<AsyncMutex<()>>>> {
    match map.lock() {
        Ok(locks) => locks,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Hands out one async mutex per candidate id.
///
/// Operations on different candidates never contend; operations on the same
/// candidate run one at a time for as long as the guard is held. An entry
/// lives only while some task holds or waits on it.
#[derive(Debug, Default)]
pub struct CandidateLocks {
    locks: Arc<LockMap>,
}

/// Exclusive access to one candidate, released on drop.
pub struct CandidateGuard {
    id: CandidateId,
    guard: OwnedMutexGuard<()>,
    locks: Arc<LockMap>,
}

impl Drop for CandidateGuard {
    fn drop(&mut self) {
        let mut locks = lock_map(&self.locks);
        // Owners are the map and this guard only: no task is waiting.
        if Arc::strong_count(OwnedMutexGuard::mutex(&self.guard)) == 2 {
            locks.remove(&self.id);
        }
    }
}

impl CandidateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: &CandidateId) -> CandidateGuard {
        let lock = Arc::clone(lock_map(&self.locks).entry(id.clone()).or_default());
        CandidateGuard {
            id: id.clone(),
            guard: lock.lock_owned().await,
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of candidates currently held or awaited.
    pub fn len(&self) -> usize {
        lock_map(&self.locks).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_candidate_serializes() {
        let locks = CandidateLocks::new();
        let id = CandidateId::from("c-1");
        let guard = locks.acquire(&id).await;

        let pending = tokio::time::timeout(std::time::Duration::from_millis(20), locks.acquire(&id)).await;
        assert!(pending.is_err());
        drop(guard);
        let _again = locks.acquire(&id).await;
    }

    #[tokio::test]
    async fn test_different_candidates_do_not_contend() {
        let locks = CandidateLocks::new();
        let _a = locks.acquire(&CandidateId::from("a")).await;
        let _b = locks.acquire(&CandidateId::from("b")).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_entries_are_released_with_their_guards() {
        let locks = CandidateLocks::new();
        for n in 0..16 {
            let _guard = locks.acquire(&CandidateId::from(format!("c-{n}").as_str())).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_survives_while_a_task_waits() {
        let locks = Arc::new(CandidateLocks::new());
        let id = CandidateId::from("c-1");
        let guard = locks.acquire(&id).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(&id).await;
                locks.len()
            })
        };
        while Arc::strong_count(OwnedMutexGuard::mutex(&guard.guard)) < 3 {
            tokio::task::yield_now().await;
        }
        drop(guard);

        assert_eq!(waiter.await.expect("waiter task"), 1);
        assert!(locks.is_empty());
    }
}
