//! Engine-side asynchronous action handles.

use std::sync::Arc;

use viewbridge_proto::payloads::Rect;

/// Value an action is resolved with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Acknowledge without a value
    Plain,
    /// Integer argument
    Argument(i64),
    /// Rectangle in core units
    Rect(Rect),
}

/// Callback fired once when an action resolves.
pub type ResolveCallback = Box<dyn FnOnce() + Send>;

/// Callback fired once when the engine terminates an action.
pub type TerminateCallback = Box<dyn FnOnce() + Send>;

/// Engine asynchronous operation.
///
/// An action is pending until it is resolved by the bridge or terminated by
/// the engine. Exactly one of the two happens, once.
pub trait Action: Send + Sync {
    /// Not yet resolved or terminated.
    fn is_pending(&self) -> bool;

    /// Resolved.
    fn is_resolved(&self) -> bool;

    /// Terminated by the engine.
    fn is_terminated(&self) -> bool;

    /// Resolve the action. No effect unless pending.
    fn resolve(&self, resolution: Resolution);

    /// Run `callback` when the action resolves.
    fn then(&self, callback: ResolveCallback);

    /// Run `callback` when the engine terminates the action.
    ///
    /// The engine may invoke it from inside any engine call, including while
    /// the bridge is processing a frame.
    fn add_terminate_callback(&self, callback: TerminateCallback);
}

/// Shared action handle.
pub type ActionRef = Arc<dyn Action>;
