// SPDX-FileCopyrightText: 2026 Atenea Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyed async locks serializing transitions on one room or agent.
//!
//! Entries are created on first use and removed when the last holder or
//! waiter releases them, so the map only grows with concurrent activity.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<Mutex<()>>>;

/// A set of named mutexes.
#[derive(Clone, Default)]
pub struct RoomLocks {
    inner: Arc<LockMap>,
}

impl RoomLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive ownership of `key`.
    pub async fn lock(&self, key: &str) -> RoomGuard {
        let mutex = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        RoomGuard {
            key: key.to_string(),
            guard: Some(guard),
            map: Arc::clone(&self.inner),
        }
    }

    /// Keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.inner.len()
    }

    /// Waits until no key is held, up to `timeout`. Returns `false` on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let poll = async {
            while self.active() > 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }
}

/// Ownership of one key. Releasing the last reference drops the entry.
pub struct RoomGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    map: Arc<LockMap>,
}

impl RoomGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.map
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = RoomLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock("whatsapp:c1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = RoomLocks::new();
        let _a = locks.lock("whatsapp:c1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("telegram:c1")).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn wait_idle_reports_held_keys() {
        let locks = RoomLocks::new();
        let guard = locks.lock("sms:c9").await;
        assert!(!locks.wait_idle(Duration::from_millis(50)).await);
        drop(guard);
        assert!(locks.wait_idle(Duration::from_millis(50)).await);
    }
}
