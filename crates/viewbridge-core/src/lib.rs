//! Viewbridge core
//!
//! Orchestration between an opaque document engine and a remote viewhost.
//! The engine owns the component tree, layout and command execution; the
//! viewhost draws what it is told and reports user input. This crate owns
//! everything in between: the message protocol, the per-frame drain of engine
//! state into outbound messages, and the concurrency around document build.
//!
//! # Components
//!
//! - [`ConnectionManager`]: session owner, inbound dispatch, frame update,
//!   document lifecycle
//! - [`engine`]: traits the document engine implements
//! - [`Host`]: capabilities the embedding application provides (transport,
//!   downloads, lifecycle callbacks)
//! - [`PendingEvents`]: outbound event token to engine action table
//! - [`ReplyCorrelator`]: blocking send reply matching
//! - [`PackageLoader`]: bounded-concurrency import fetching
//! - [`ExtensionRegistry`]: legacy and mediated extension registration
//!
//! # Threading
//!
//! All session state is mutated from one serialized context. Only the
//! download workers and the extension load callback run on foreign threads,
//! and they communicate through the guarded types in [`packages`] and
//! [`extensions`]. The reply side of a blocking send is the one exception
//! that must be reachable from the transport thread, so [`ReplyCorrelator`]
//! is shared behind an `Arc`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod correlator;
pub mod dirty;
pub mod engine;
pub mod env;
pub mod error;
pub mod extensions;
pub mod host;
pub mod manager;
pub mod packages;
pub mod pending;
pub mod scaling;
pub mod session;

pub use config::{BridgeConfig, RootConfig, SupportedExtension};
pub use correlator::{ReplyCorrelator, ReplyWaiter};
pub use env::Environment;
pub use error::{BridgeError, PackageError};
pub use extensions::{ExtensionOutcome, ExtensionRegistry};
pub use host::{CommandOutcome, ExtensionEvent, Host, RenderingEvent};
pub use manager::ConnectionManager;
pub use packages::PackageLoader;
pub use pending::PendingEvents;
pub use scaling::ScaledMetrics;
pub use session::DocumentState;
