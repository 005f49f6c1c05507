//! Scripted engine action.

use std::sync::Arc;

use parking_lot::Mutex;
use viewbridge_core::engine::{Action, ResolveCallback, Resolution, TerminateCallback};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Status {
    Pending,
    Resolved(Resolution),
    Terminated,
}

struct ActionState {
    status: Status,
    on_resolve: Vec<ResolveCallback>,
    on_terminate: Vec<TerminateCallback>,
}

/// Action that the test terminates by hand.
///
/// Callbacks run after the action's lock is released, so a callback may call
/// back into the action.
pub struct SimAction {
    state: Mutex<ActionState>,
}

impl SimAction {
    /// Pending action.
    pub fn pending() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ActionState {
                status: Status::Pending,
                on_resolve: Vec::new(),
                on_terminate: Vec::new(),
            }),
        })
    }

    /// Action that is already resolved.
    pub fn resolved() -> Arc<Self> {
        let action = Self::pending();
        action.resolve(Resolution::Plain);
        action
    }

    /// Terminate the action as the engine would. No effect unless pending.
    pub fn terminate(&self) {
        let callbacks = {
            let mut state = self.state.lock();
            if state.status != Status::Pending {
                return;
            }
            state.status = Status::Terminated;
            state.on_resolve.clear();
            std::mem::take(&mut state.on_terminate)
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Value the action was resolved with.
    pub fn resolution(&self) -> Option<Resolution> {
        match self.state.lock().status {
            Status::Resolved(resolution) => Some(resolution),
            Status::Pending | Status::Terminated => None,
        }
    }
}

impl Action for SimAction {
    fn is_pending(&self) -> bool {
        self.state.lock().status == Status::Pending
    }

    fn is_resolved(&self) -> bool {
        matches!(self.state.lock().status, Status::Resolved(_))
    }

    fn is_terminated(&self) -> bool {
        self.state.lock().status == Status::Terminated
    }

    fn resolve(&self, resolution: Resolution) {
        let callbacks = {
            let mut state = self.state.lock();
            if state.status != Status::Pending {
                return;
            }
            state.status = Status::Resolved(resolution);
            state.on_terminate.clear();
            std::mem::take(&mut state.on_resolve)
        };
        for callback in callbacks {
            callback();
        }
    }

    fn then(&self, callback: ResolveCallback) {
        let mut state = self.state.lock();
        match state.status {
            Status::Pending => state.on_resolve.push(callback),
            Status::Resolved(_) => {
                drop(state);
                callback();
            },
            Status::Terminated => {},
        }
    }

    fn add_terminate_callback(&self, callback: TerminateCallback) {
        let mut state = self.state.lock();
        match state.status {
            Status::Pending => state.on_terminate.push(callback),
            Status::Terminated => {
                drop(state);
                callback();
            },
            Status::Resolved(_) => {},
        }
    }
}
