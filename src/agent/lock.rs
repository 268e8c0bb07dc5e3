//! Send-lock serializing primary chat API turns

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Single mutual-exclusion handle shared by user turns and summary relays.
///
/// Clones share the same lock. Summary relays additionally mark themselves
/// with [`SendLock::begin_relay`] so user turns can tell a relay apart from
/// another user turn queued on the lock.
#[derive(Debug, Clone, Default)]
pub struct SendLock {
    inner: Arc<Mutex<()>>,
    relays: Arc<AtomicUsize>,
}

/// Guard held while a primary chat turn is in flight
pub type SendGuard = OwnedMutexGuard<()>;

/// Marks a summary relay as in progress until dropped
#[derive(Debug)]
pub struct RelayGuard {
    relays: Arc<AtomicUsize>,
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        self.relays.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SendLock {
    /// Create a new, unheld lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the lock. Waiters are served in acquisition order.
    pub async fn acquire(&self) -> SendGuard {
        self.inner.clone().lock_owned().await
    }

    /// Whether some task currently holds the lock
    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }

    /// Mark a summary relay as started, whether or not it holds the lock yet
    pub fn begin_relay(&self) -> RelayGuard {
        self.relays.fetch_add(1, Ordering::SeqCst);
        RelayGuard {
            relays: self.relays.clone(),
        }
    }

    /// Whether a summary relay is queued on or holding the lock
    pub fn relay_in_progress(&self) -> bool {
        self.relays.load(Ordering::SeqCst) > 0
    }
}
