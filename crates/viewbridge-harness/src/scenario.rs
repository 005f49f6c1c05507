//! Ready-made manager wiring for scenario tests.

use std::{sync::Arc, time::Duration};

use serde_json::{Value, json};
use viewbridge_core::{BridgeConfig, ConnectionManager, ExtensionRegistry, PackageError};

use crate::{RecordingHost, RootHandle, SimDocument, SimEngine, SimEnv};

/// Presentation token used by [`Scenario`].
pub const SCENARIO_TOKEN: &str = "presentation-1";

/// Manager wired to a simulated engine, host and clock.
///
/// The host acknowledges `reHierarchy` so blocking sends complete at once.
pub struct Scenario {
    /// Virtual clock shared with the manager
    pub env: SimEnv,
    /// Recording host shared with the manager
    pub host: Arc<RecordingHost>,
    /// Engine handle shared with the manager
    pub engine: SimEngine,
    /// Manager under test
    pub manager: ConnectionManager<SimEnv, RecordingHost>,
}

impl Scenario {
    /// Scenario with default configuration and legacy extensions.
    pub fn new(engine: SimEngine) -> Result<Self, PackageError> {
        Self::with_config(engine, ExtensionRegistry::new(), BridgeConfig::default())
    }

    /// Scenario with explicit extensions and configuration.
    pub fn with_config(
        engine: SimEngine,
        extensions: ExtensionRegistry,
        config: BridgeConfig,
    ) -> Result<Self, PackageError> {
        let env = SimEnv::new();
        let host = Arc::new(RecordingHost::new());
        let manager = ConnectionManager::new(
            env.clone(),
            Arc::clone(&host),
            Box::new(engine.clone()),
            extensions,
            config,
        )?;
        host.auto_reply(manager.correlator(), &["reHierarchy"]);
        Ok(Self { env, host, engine, manager })
    }

    /// Install `document` under [`SCENARIO_TOKEN`].
    pub fn load(&mut self, document: SimDocument) {
        self.manager.set_content(Box::new(document), SCENARIO_TOKEN);
    }

    /// Deliver a raw inbound message.
    pub fn deliver(&mut self, raw: &str) {
        self.manager.handle_message(raw);
    }

    /// Deliver `{type, payload}`.
    pub fn send(&mut self, kind: &str, payload: Value) {
        self.deliver(&json!({ "type": kind, "payload": payload }).to_string());
    }

    /// Deliver a `build` for a rectangular hub viewport at 160 dpi.
    pub fn build(&mut self, width: i32, height: i32) {
        self.send("build", build_payload(width, height));
    }

    /// Advance the clock and run one update tick.
    pub fn tick(&mut self, by: Duration) {
        self.env.advance(by);
        self.manager.on_update_tick();
    }

    /// Handle to the inflated document.
    pub fn root(&self) -> Option<RootHandle> {
        self.engine.root()
    }
}

/// `build` payload for a rectangular hub viewport at 160 dpi.
pub fn build_payload(width: i32, height: i32) -> Value {
    json!({
        "width": width,
        "height": height,
        "dpi": 160,
        "shape": "RECTANGLE",
        "mode": "HUB",
    })
}
