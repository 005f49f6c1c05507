//! Extension collaborators.
//!
//! Two registration protocols exist. Legacy extensions are configured
//! synchronously from document settings. Mediated extensions go through an
//! [`ExtensionMediator`], which grants, initializes and loads them and
//! reports completion through a callback that may fire on any thread.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{Content, EngineEvent};

/// Grant decision for one requested extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionGrant {
    /// Allow the document to use the extension
    Granted,
    /// Refuse the extension
    Denied,
}

/// Completion callback for [`ExtensionMediator::load_extensions`].
///
/// Called at most once with `true` on success. May be called from a foreign
/// thread, and may be called after the bridge stopped waiting.
pub type LoadCallback = Box<dyn FnOnce(bool) + Send>;

/// Flags keyed by extension uri.
pub type ExtensionFlags = BTreeMap<String, Value>;

/// Mediated extension loader.
pub trait ExtensionMediator: Send + Sync {
    /// Whether the mediator can provide the extension at `uri`.
    fn has_extension(&self, uri: &str) -> bool;

    /// Initialize the document's requested extensions, asking `grant` for a
    /// decision on each.
    fn initialize_extensions(
        &self,
        flags: &ExtensionFlags,
        content: &dyn Content,
        grant: &dyn Fn(&str) -> ExtensionGrant,
    );

    /// Load granted extensions and report through `on_loaded`.
    fn load_extensions(&self, flags: &ExtensionFlags, content: &dyn Content, on_loaded: LoadCallback);

    /// Execute an extension command raised by the engine.
    fn invoke_command(&self, event: &EngineEvent) -> bool;
}

/// Legacy extension configured from document settings.
pub trait LegacyExtension: Send + Sync {
    /// Extension uri.
    fn uri(&self) -> &str;

    /// Apply the settings the document declared for this extension.
    fn apply_settings(&self, settings: &Value);
}
