//! Pending event table.
//!
//! Maps the token of an event handed off to the viewhost (or to the host, for
//! legacy extension commands) to the engine action waiting on it.
//!
//! # Invariants
//!
//! - A token appears at most once.
//! - An entry leaves the table only by [`PendingEvents::resolve`], by the
//!   engine terminating its action, or by [`PendingEvents::clear`].
//! - Resolving a token that is not present is a no-op.
//!
//! Terminate callbacks hold only a weak reference to the table, so dropping
//! the table never requires deregistering them. Callbacks may run inside any
//! engine call; they only record the token, and the manager sends the
//! matching `eventTerminate` messages when it next flushes.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use parking_lot::Mutex;

use crate::engine::{ActionRef, Resolution};

struct Entry {
    action: ActionRef,
    viewhost: bool,
}

#[derive(Default)]
struct Table {
    entries: HashMap<u32, Entry>,
    /// Viewhost-visible tokens terminated by the engine, not yet reported
    terminated: Vec<u32>,
}

/// Token to action table, shared with terminate callbacks.
#[derive(Clone, Default)]
pub struct PendingEvents {
    table: Arc<Mutex<Table>>,
}

impl PendingEvents {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` under `token`.
    ///
    /// `viewhost` marks events the viewhost knows about; only those produce
    /// a termination notice. Returns false if `token` is already present.
    pub fn insert(&self, token: u32, action: ActionRef, viewhost: bool) -> bool {
        {
            let mut table = self.table.lock();
            if table.entries.contains_key(&token) {
                tracing::warn!(token, "event token already pending");
                return false;
            }
            table.entries.insert(token, Entry { action: Arc::clone(&action), viewhost });
        }

        let table = Arc::downgrade(&self.table);
        action.add_terminate_callback(Box::new(move || on_terminate(&table, token)));
        true
    }

    /// Resolve and remove the entry for `token`.
    ///
    /// Returns false when `token` is not pending.
    pub fn resolve(&self, token: u32, resolution: Resolution) -> bool {
        let entry = self.table.lock().entries.remove(&token);
        match entry {
            Some(entry) => {
                entry.action.resolve(resolution);
                true
            },
            None => false,
        }
    }

    /// Whether `token` is pending.
    pub fn contains(&self, token: u32) -> bool {
        self.table.lock().entries.contains_key(&token)
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.table.lock().entries.len()
    }

    /// No entries pending.
    pub fn is_empty(&self) -> bool {
        self.table.lock().entries.is_empty()
    }

    /// Discard every entry without resolving it.
    ///
    /// Termination notices not yet taken are discarded too; the viewhost
    /// that saw those events is being reset.
    pub fn clear(&self) {
        let mut table = self.table.lock();
        table.entries.clear();
        table.terminated.clear();
    }

    /// Take the viewhost-visible tokens terminated since the last call.
    pub fn take_terminated(&self) -> Vec<u32> {
        std::mem::take(&mut self.table.lock().terminated)
    }
}

fn on_terminate(table: &Weak<Mutex<Table>>, token: u32) {
    let Some(table) = table.upgrade() else {
        return;
    };
    let mut table = table.lock();
    match table.entries.remove(&token) {
        Some(entry) => {
            if entry.viewhost {
                table.terminated.push(token);
            }
        },
        None => tracing::warn!(token, "event was not pending"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Action, ResolveCallback, TerminateCallback};

    #[derive(Default)]
    struct ProbeAction {
        resolved: Mutex<Option<Resolution>>,
        on_terminate: Mutex<Vec<TerminateCallback>>,
    }

    impl ProbeAction {
        fn terminate(&self) {
            let callbacks = std::mem::take(&mut *self.on_terminate.lock());
            for callback in callbacks {
                callback();
            }
        }
    }

    impl Action for ProbeAction {
        fn is_pending(&self) -> bool {
            self.resolved.lock().is_none()
        }

        fn is_resolved(&self) -> bool {
            self.resolved.lock().is_some()
        }

        fn is_terminated(&self) -> bool {
            false
        }

        fn resolve(&self, resolution: Resolution) {
            *self.resolved.lock() = Some(resolution);
        }

        fn then(&self, _callback: ResolveCallback) {}

        fn add_terminate_callback(&self, callback: TerminateCallback) {
            self.on_terminate.lock().push(callback);
        }
    }

    #[test]
    fn resolve_removes_entry_once() {
        let pending = PendingEvents::new();
        let action = Arc::new(ProbeAction::default());
        assert!(pending.insert(4, action.clone(), true));

        assert!(pending.resolve(4, Resolution::Argument(1)));
        assert!(!pending.resolve(4, Resolution::Plain));
        assert!(pending.is_empty());
        assert_eq!(*action.resolved.lock(), Some(Resolution::Argument(1)));
    }

    #[test]
    fn duplicate_token_rejected() {
        let pending = PendingEvents::new();
        assert!(pending.insert(1, Arc::new(ProbeAction::default()), true));
        assert!(!pending.insert(1, Arc::new(ProbeAction::default()), true));
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn termination_reports_only_viewhost_events() {
        let pending = PendingEvents::new();
        let shown = Arc::new(ProbeAction::default());
        let hidden = Arc::new(ProbeAction::default());
        pending.insert(1, shown.clone(), true);
        pending.insert(2, hidden.clone(), false);

        shown.terminate();
        hidden.terminate();

        assert!(pending.is_empty());
        assert_eq!(pending.take_terminated(), vec![1]);
        assert!(pending.take_terminated().is_empty());
    }

    #[test]
    fn termination_after_drop_is_ignored() {
        let action = Arc::new(ProbeAction::default());
        {
            let pending = PendingEvents::new();
            pending.insert(9, action.clone(), true);
        }
        action.terminate();
        assert!(action.is_pending());
    }

    #[test]
    fn clear_discards_without_resolving() {
        let pending = PendingEvents::new();
        let action = Arc::new(ProbeAction::default());
        pending.insert(3, action.clone(), true);
        pending.clear();

        assert!(!pending.contains(3));
        assert!(action.is_pending());
        action.terminate();
        assert!(pending.take_terminated().is_empty());
    }
}
