//! Per-key listener registry.
//!
//! Each dispatch key maps to the callbacks registered for it, in
//! registration order. Dispatch snapshots the callbacks and releases the
//! lock before calling them, so a callback may register or remove listeners
//! (or send on any connection) without deadlocking.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::error;

use crate::identifiers::ListenerId;

// ============================================================================
// Types
// ============================================================================

/// Callback invoked with each decoded message for its key.
pub type Listener<M> = Arc<dyn Fn(&M) + Send + Sync>;

/// Registered callbacks for one key.
type Entries<M> = Vec<(ListenerId, Listener<M>)>;

// ============================================================================
// ListenerRegistry
// ============================================================================

/// Mapping from dispatch key to registered callbacks.
pub struct ListenerRegistry<K, M> {
    entries: Mutex<FxHashMap<K, Entries<M>>>,
}

impl<K, M> Default for ListenerRegistry<K, M> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<K, M> ListenerRegistry<K, M>
where
    K: Eq + Hash + Debug,
{
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` under `key`.
    pub fn add(&self, key: K, listener: Listener<M>) -> ListenerId {
        let id = ListenerId::next();
        self.entries
            .lock()
            .entry(key)
            .or_default()
            .push((id, listener));
        id
    }

    /// Removes one listener. Unknown keys or IDs are ignored.
    ///
    /// Returns `true` if a listener was removed.
    pub fn remove(&self, key: &K, id: ListenerId) -> bool {
        let mut entries = self.entries.lock();
        let Some(listeners) = entries.get_mut(key) else {
            return false;
        };

        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() != before;

        if listeners.is_empty() {
            entries.remove(key);
        }
        removed
    }

    /// Returns the number of listeners registered under `key`.
    #[must_use]
    pub fn count(&self, key: &K) -> usize {
        self.entries.lock().get(key).map_or(0, Vec::len)
    }

    /// Invokes every listener under `key` once, in registration order.
    ///
    /// Returns the number of listeners invoked. A panicking listener is
    /// logged and does not prevent the others from running.
    pub fn dispatch(&self, key: &K, message: &M) -> usize {
        let listeners: Vec<Listener<M>> = match self.entries.lock().get(key) {
            Some(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };

        for listener in &listeners {
            if !invoke_guarded(|| listener(message)) {
                error!(?key, "Listener panicked");
            }
        }

        listeners.len()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Runs a callback, containing any panic.
///
/// Returns `false` if the callback panicked.
pub(crate) fn invoke_guarded(f: impl FnOnce()) -> bool {
    catch_unwind(AssertUnwindSafe(f)).is_ok()
}

// ============================================================================
// Tests
// ============================================================================
