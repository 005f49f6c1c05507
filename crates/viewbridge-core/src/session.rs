//! Per-presentation session state.

use viewbridge_proto::{ViewportSpec, payloads::config::ConfigurationChange};

use crate::{
    config::{RootConfig, SupportedExtension},
    engine::{Content, RootContext},
    scaling::ScaledMetrics,
};

/// Snapshot of an inflated document, taken so a later build can resume it.
///
/// Consumed by the next build whether or not that build succeeds.
pub struct DocumentState {
    pub(crate) token: String,
    pub(crate) root: Box<dyn RootContext>,
    pub(crate) content: Box<dyn Content>,
    pub(crate) scaled: ScaledMetrics,
    pub(crate) root_config: RootConfig,
    pub(crate) configuration_change: ConfigurationChange,
}

impl DocumentState {
    /// Presentation token the document belongs to.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Configuration changes applied while the document was active.
    pub fn configuration_change(&self) -> &ConfigurationChange {
        &self.configuration_change
    }
}

impl std::fmt::Debug for DocumentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentState")
            .field("token", &self.token)
            .field("scaled", &self.scaled)
            .field("configuration_change", &self.configuration_change)
            .finish_non_exhaustive()
    }
}

/// The live document and everything the bridge tracks about it.
#[derive(Default)]
pub(crate) struct Session {
    pub token: String,
    pub content: Option<Box<dyn Content>>,
    pub root: Option<Box<dyn RootContext>>,
    pub root_config: Option<RootConfig>,
    pub scaled: Option<ScaledMetrics>,
    /// Candidates declared by the host; survives builds
    pub viewport_specs: Vec<ViewportSpec>,
    pub supported_extensions: Vec<SupportedExtension>,
    pub screen_locked: bool,
    /// Changes applied since content was set, replayed on restore
    pub configuration_change: ConfigurationChange,
    pub restore: Option<DocumentState>,
}

impl Session {
    /// Tear down the document. Viewport candidates are host configuration
    /// and stay. The screen-lock flag stays so the next build releases a
    /// lock the old document still held.
    pub fn reset(&mut self) {
        self.token.clear();
        self.root = None;
        self.content = None;
        self.supported_extensions.clear();
    }
}
