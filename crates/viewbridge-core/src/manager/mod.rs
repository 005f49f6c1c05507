//! Connection manager.
//!
//! Owns the session and every subsystem around it. Inbound viewhost messages
//! enter through [`ConnectionManager::handle_message`], the host drives the
//! frame loop through [`ConnectionManager::on_update_tick`], and the
//! host-facing operations in `host_ops` cover everything else.
//!
//! # Document lifecycle
//!
//! ```text
//! ┌───────┐  build   ┌──────────┐   inflated   ┌────────┐  reInflate  ┌─────────────┐
//! │ Empty │─────────>│ Building │─────────────>│ Active │────────────>│ Reinflating │
//! └───────┘          └──────────┘              └────────┘<────────────└─────────────┘
//!     ^                   │ failed                 │
//!     │                   ↓                        │ reset
//!     └───────────────────┴────────────────────────┘
//! ```
//!
//! # Invariants
//!
//! - Sequence numbers come from one counter that starts at 0, is incremented
//!   before each use and is never reset, so `seqno` is strictly increasing
//!   across builds and resets.
//! - No handler error escapes: every `Err` is logged at the dispatch boundary
//!   and, when it has a viewhost string, sent as an `error` message.
//! - Every method runs on the serialized context that owns the manager; only
//!   the [`ReplyCorrelator`] is shared with the transport.

mod build;
mod frame;
mod handlers;
mod host_ops;

use std::sync::Arc;

use viewbridge_proto::{InboundMessage, Outbound};

use crate::{
    config::BridgeConfig,
    correlator::ReplyCorrelator,
    engine::Engine,
    env::Environment,
    error::{BridgeError, PackageError},
    extensions::ExtensionRegistry,
    host::Host,
    packages::PackageLoader,
    pending::PendingEvents,
    session::Session,
};

/// Bridge between one document engine and one viewhost.
pub struct ConnectionManager<E: Environment, H: Host> {
    env: E,
    host: Arc<H>,
    engine: Box<dyn Engine>,
    extensions: ExtensionRegistry,
    config: BridgeConfig,
    loader: PackageLoader<H>,
    pending: PendingEvents,
    correlator: Arc<ReplyCorrelator>,
    /// Last sequence number handed out
    seqno: u32,
    session: Session,
    /// Document time origin, set at build
    start: Option<E::Instant>,
}

impl<E: Environment, H: Host> ConnectionManager<E, H> {
    /// Create a manager with no content.
    pub fn new(
        env: E,
        host: Arc<H>,
        engine: Box<dyn Engine>,
        extensions: ExtensionRegistry,
        config: BridgeConfig,
    ) -> Result<Self, PackageError> {
        let loader = PackageLoader::new(Arc::clone(&host), &config)?;
        Ok(Self {
            env,
            host,
            engine,
            extensions,
            config,
            loader,
            pending: PendingEvents::new(),
            correlator: Arc::new(ReplyCorrelator::new()),
            seqno: 0,
            session: Session::default(),
            start: None,
        })
    }

    /// Presentation token of the current session; empty when reset.
    pub fn token(&self) -> &str {
        &self.session.token
    }

    /// Reply correlator, for transports that intercept replies before
    /// queuing messages for the manager.
    pub fn correlator(&self) -> Arc<ReplyCorrelator> {
        Arc::clone(&self.correlator)
    }

    /// Pending event table.
    pub fn pending_events(&self) -> &PendingEvents {
        &self.pending
    }

    /// A document is inflated.
    pub fn has_document(&self) -> bool {
        self.session.root.is_some()
    }

    /// Last sequence number sent.
    pub fn last_seqno(&self) -> u32 {
        self.seqno
    }

    /// Handle a raw inbound message, intercepting an awaited reply first.
    pub fn handle_message(&mut self, raw: &str) {
        if self.correlator.should_dispatch(raw) {
            self.dispatch(raw);
        }
    }

    /// Decode and dispatch a raw inbound message that was already checked
    /// against the correlator.
    pub fn dispatch(&mut self, raw: &str) {
        let message = match InboundMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, "dropping inbound message");
                return;
            },
        };

        let kind = message.kind();
        tracing::debug!(kind, "dispatching");
        let result = self.handle(message);
        self.report(kind, result);
        self.flush_terminations();
    }

    fn next_seqno(&mut self) -> u32 {
        self.seqno = self.seqno.wrapping_add(1);
        self.seqno
    }

    /// Send a message to the viewhost. Returns the sequence number used.
    pub(crate) fn send(&mut self, message: Outbound) -> u32 {
        let seqno = self.next_seqno();
        let kind = message.kind;
        match message.sequenced(seqno).encode() {
            Ok(encoded) => self.host.send_message(&self.session.token, encoded),
            Err(e) => tracing::error!(%kind, seqno, error = %e, "failed to encode message"),
        }
        seqno
    }

    /// Send an `error` message.
    pub(crate) fn send_error(&mut self, message: &str) {
        self.send(Outbound::error(message));
    }

    /// Send and wait for the viewhost to answer with the same sequence
    /// number.
    pub(crate) fn blocking_send(&mut self, message: Outbound) -> Result<String, BridgeError> {
        let correlator = Arc::clone(&self.correlator);
        let _exclusive = correlator.exclusive();
        let waiter = correlator.expect(self.seqno.wrapping_add(1));
        let seqno = self.send(message);
        debug_assert_eq!(seqno, waiter.seqno());

        waiter.wait(self.config.blocking_send_timeout()).ok_or_else(|| {
            tracing::warn!(seqno, "did not receive response");
            BridgeError::NoReply { seqno }
        })
    }

    /// Log a failed operation and tell the viewhost when it should know.
    pub(crate) fn report(&mut self, operation: &str, result: Result<(), BridgeError>) {
        let Err(err) = result else {
            return;
        };
        match err.viewhost_message() {
            Some(message) => {
                tracing::error!(operation, error = %err, "operation failed");
                self.send_error(&message);
            },
            None if err.is_transient() => tracing::warn!(operation, error = %err, "operation skipped"),
            None => tracing::error!(operation, error = %err, "operation failed"),
        }
    }

    /// Send `eventTerminate` for viewhost events the engine terminated.
    pub(crate) fn flush_terminations(&mut self) {
        for token in self.pending.take_terminated() {
            tracing::debug!(token, "event terminated");
            self.send(Outbound::event_terminate(token));
        }
    }

    /// Viewhost units per core unit of the current document.
    pub(crate) fn scale_factor(&self) -> f64 {
        self.session.scaled.map_or(1.0, |scaled| scaled.scale_factor)
    }
}
