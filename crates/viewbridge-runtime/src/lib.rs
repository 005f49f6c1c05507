//! Viewbridge runtime.
//!
//! Runs a [`ConnectionManager`] on a tokio task so that every session
//! mutation happens in one serialized context. The embedding application
//! talks to the task through a cloneable [`RuntimeHandle`].
//!
//! # Architecture
//!
//! ```text
//!  transport ──deliver──> RuntimeHandle ──(reply?)──> ReplyCorrelator
//!                               │                           │
//!                               │ Command                   │ wakes blocking send
//!                               ↓                           ↓
//!  host ops ──────────> mpsc channel ──> manager task <── update interval
//! ```
//!
//! Replies to a blocking send are intercepted on the caller's side of the
//! channel. The manager task is parked inside that send, so a reply queued
//! behind it would never be seen.
//!
//! # Components
//!
//! - [`Runtime`]: spawns the manager task
//! - [`RuntimeHandle`]: queues inbound messages and host operations
//! - [`Command`]: one unit of queued work
//! - [`SystemEnv`]: production environment (system clocks)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod command;
mod error;
mod system_env;

use std::{sync::Arc, time::Duration};

pub use command::Command;
pub use error::RuntimeError;
use serde_json::{Map, Value};
pub use system_env::SystemEnv;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use viewbridge_core::{
    ConnectionManager, DocumentState, Environment, Host, ReplyCorrelator, engine::Content,
};

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Interval between update ticks
    pub tick_interval: Duration,
    /// Commands that may be queued before senders wait
    pub command_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { tick_interval: Duration::from_millis(16), command_buffer: 256 }
    }
}

/// Spawns the task that owns a connection manager.
pub struct Runtime;

impl Runtime {
    /// Move `manager` onto a new task and start its update interval.
    ///
    /// The manager blocks while building (downloads, extension loading,
    /// blocking sends), so the task runs that work under
    /// [`tokio::task::block_in_place`]. This requires the multi-threaded
    /// runtime.
    pub fn spawn<E: Environment, H: Host>(
        manager: ConnectionManager<E, H>,
        config: RuntimeConfig,
    ) -> (RuntimeHandle, JoinHandle<()>) {
        let (commands, receiver) = mpsc::channel(config.command_buffer.max(1));
        let handle = RuntimeHandle { commands, correlator: manager.correlator() };
        let task = tokio::spawn(run(manager, receiver, config.tick_interval));
        (handle, task)
    }
}

async fn run<E: Environment, H: Host>(
    mut manager: ConnectionManager<E, H>,
    mut commands: mpsc::Receiver<Command>,
    tick_interval: Duration,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::info!(tick_ms = tick_interval.as_millis() as u64, "viewbridge runtime started");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::debug!("all runtime handles dropped");
                    break;
                };
                if matches!(command, Command::Shutdown) {
                    break;
                }
                tracing::trace!(command = command.name(), "running command");
                tokio::task::block_in_place(|| command.apply(&mut manager));
            },
            _ = ticker.tick() => {
                tokio::task::block_in_place(|| manager.on_update_tick());
            },
        }
    }

    manager.reset();
    tracing::info!(last_seqno = manager.last_seqno(), "viewbridge runtime stopped");
}

/// Cloneable handle to a running manager task.
#[derive(Clone)]
pub struct RuntimeHandle {
    commands: mpsc::Sender<Command>,
    correlator: Arc<ReplyCorrelator>,
}

impl RuntimeHandle {
    /// Hand a raw viewhost message to the manager.
    ///
    /// A reply to an outstanding blocking send is consumed here and never
    /// queued. Everything else is queued for dispatch.
    pub async fn deliver(&self, raw: String) -> Result<(), RuntimeError> {
        if !self.correlator.should_dispatch(&raw) {
            return Ok(());
        }
        self.submit(Command::Inbound(raw)).await
    }

    /// Queue a command.
    pub async fn submit(&self, command: Command) -> Result<(), RuntimeError> {
        self.commands.send(command).await.map_err(|_| RuntimeError::Closed)
    }

    /// Install content for the presentation `token`.
    pub async fn set_content(&self, content: Box<dyn Content>, token: impl Into<String>) -> Result<(), RuntimeError> {
        self.submit(Command::SetContent { content, token: token.into() }).await
    }

    /// Replace the supported viewport candidates.
    pub async fn set_supported_viewports(&self, raw: impl Into<String>) -> Result<(), RuntimeError> {
        self.submit(Command::SetSupportedViewports(raw.into())).await
    }

    /// Run host-initiated commands.
    pub async fn execute_commands(
        &self,
        commands: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        self.submit(Command::ExecuteCommands { commands: commands.into(), token: token.into() }).await
    }

    /// Cancel running commands.
    pub async fn interrupt_command_sequence(&self) -> Result<(), RuntimeError> {
        self.submit(Command::InterruptCommandSequence).await
    }

    /// Forward a data source update.
    pub async fn data_source_update(
        &self,
        source_type: impl Into<String>,
        payload: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<(), RuntimeError> {
        self.submit(Command::DataSourceUpdate {
            source_type: source_type.into(),
            payload: payload.into(),
            token: token.into(),
        })
        .await
    }

    /// Ask for a visual context report.
    pub async fn provide_state(&self, request: u32) -> Result<(), RuntimeError> {
        self.submit(Command::ProvideState(request)).await
    }

    /// Settle a pending extension event.
    pub async fn on_extension_event_result(&self, token: u32, succeeded: bool) -> Result<(), RuntimeError> {
        self.submit(Command::ExtensionEventResult { token, succeeded }).await
    }

    /// Send an extension event to the viewhost.
    pub async fn send_extension_event(
        &self,
        uri: impl Into<String>,
        name: impl Into<String>,
        params: Value,
    ) -> Result<(), RuntimeError> {
        self.submit(Command::SendExtensionEvent { uri: uri.into(), name: name.into(), params }).await
    }

    /// Run a document extension event handler.
    pub async fn invoke_extension_event_handler(
        &self,
        uri: impl Into<String>,
        name: impl Into<String>,
        data: Map<String, Value>,
        fast_mode: bool,
    ) -> Result<(), RuntimeError> {
        self.submit(Command::InvokeExtensionEventHandler {
            uri: uri.into(),
            name: name.into(),
            data,
            fast_mode,
        })
        .await
    }

    /// Detach the active document. `None` when nothing is inflated.
    pub async fn active_document_state(&self) -> Result<Option<DocumentState>, RuntimeError> {
        let (reply, answer) = oneshot::channel();
        self.submit(Command::ActiveDocumentState(reply)).await?;
        answer.await.map_err(|_| RuntimeError::NoAnswer("active_document_state"))
    }

    /// Resume `state` on the next build.
    pub async fn restore_document_state(&self, state: DocumentState) -> Result<(), RuntimeError> {
        self.submit(Command::RestoreDocumentState(state)).await
    }

    /// Drop the session.
    pub async fn reset(&self) -> Result<(), RuntimeError> {
        self.submit(Command::Reset).await
    }

    /// Wait until every command queued before this call has run.
    pub async fn flush(&self) -> Result<(), RuntimeError> {
        let (reply, answer) = oneshot::channel();
        self.submit(Command::Flush(reply)).await?;
        answer.await.map_err(|_| RuntimeError::NoAnswer("flush"))
    }

    /// Stop the manager task after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.submit(Command::Shutdown).await
    }

    /// The manager task has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}
