//! Per-player operation locks.
//!
//! Serializes engine operations on the same player inside this process so
//! bursts from one player queue up instead of burning the retry budget on
//! version conflicts. The version check in the store still guards against
//! writers elsewhere.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::economy::player::PlayerId;

/// Lock table keyed by player id.
///
/// Entries are created on demand and dropped with the last guard, so the
/// table only holds players with an operation in flight.
#[derive(Default)]
pub struct PlayerLocks {
    // Sync mutex: the table is touched from `Drop`, which cannot await
    table: Mutex<HashMap<PlayerId, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one engine operation.
pub struct PlayerGuard<'a> {
    locks: &'a PlayerLocks,
    player_id: PlayerId,
    guard: Option<OwnedMutexGuard<()>>,
}

type LockFuture = Pin<Box<dyn Future<Output = OwnedMutexGuard<()>> + Send>>;

/// A pending `acquire`. Dropping it before it resolves still releases the
/// table entry it created.
struct Waiter<'a> {
    locks: &'a PlayerLocks,
    player_id: PlayerId,
    wait: Option<LockFuture>,
}

impl PlayerLocks {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `player_id`.
    pub async fn acquire(&self, player_id: PlayerId) -> PlayerGuard<'_> {
        let lock = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.entry(player_id).or_default().clone()
        };

        let guard = Waiter {
            locks: self,
            player_id,
            wait: Some(Box::pin(lock.lock_owned())),
        }
        .await;
        PlayerGuard {
            locks: self,
            player_id,
            guard: Some(guard),
        }
    }

    /// Drop the entry for `player_id` once only the table holds it.
    fn release(&self, player_id: &PlayerId) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table's own handle left: nobody holds or waits on it
        if table
            .get(player_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(player_id);
        }
    }

    /// Players with a live lock entry.
    pub fn active(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for PlayerGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(&self.player_id);
    }
}

impl Future for Waiter<'_> {
    type Output = OwnedMutexGuard<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.wait.as_mut() {
            Some(wait) => wait.as_mut().poll(cx),
            None => Poll::Pending,
        }
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        // The pending lock future holds a handle too
        drop(self.wait.take());
        self.locks.release(&self.player_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = PlayerLocks::new();
        {
            let _guard = locks.acquire(PlayerId::new([1; 16])).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_different_players_do_not_block() {
        let locks = PlayerLocks::new();
        let _a = locks.acquire(PlayerId::new([1; 16])).await;
        let acquired =
            tokio::time::timeout(Duration::from_millis(100), locks.acquire(PlayerId::new([2; 16])))
                .await;
        assert!(acquired.is_ok());
    }

    #[tokio::test]
    async fn test_abandoned_waiter_releases_entry() {
        let locks = PlayerLocks::new();
        let player = PlayerId::new([3; 16]);
        let holder = locks.acquire(player).await;

        let mut waiter = Box::pin(locks.acquire(player));
        assert!(futures_util::poll!(waiter.as_mut()).is_pending());

        // Holder leaves while the waiter is still queued
        drop(holder);
        assert_eq!(locks.active(), 1);

        // Waiter gives up without ever being polled again
        drop(waiter);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_timed_out_acquire_releases_entry() {
        let locks = PlayerLocks::new();
        let player = PlayerId::new([4; 16]);
        let holder = locks.acquire(player).await;

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), locks.acquire(player)).await;
        assert!(timed_out.is_err());
        assert_eq!(locks.active(), 1);

        drop(holder);
        assert_eq!(locks.active(), 0);

        // Table still works after the abandoned wait
        let _again = locks.acquire(player).await;
        assert_eq!(locks.active(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_player_is_exclusive() {
        let locks = Arc::new(PlayerLocks::new());
        let inside = Arc::new(AtomicU32::new(0));
        let max_inside = Arc::new(AtomicU32::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let locks = locks.clone();
                let inside = inside.clone();
                let max_inside = max_inside.clone();
                tokio::spawn(async move {
                    let _guard = locks.acquire(PlayerId::new([7; 16])).await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in futures_util::future::join_all(tasks).await {
            task.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }
}
