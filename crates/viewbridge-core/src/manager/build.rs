//! Document build and reinflate.

use serde_json::json;
use viewbridge_proto::{Outbound, OutboundKind, payloads::build::BuildRequest};

use super::ConnectionManager;
use crate::{
    config::{RootConfig, parse_supported_extensions},
    dirty,
    engine::{Background, Metrics},
    env::Environment,
    error::BridgeError,
    extensions::ExtensionOutcome,
    host::{APL_COMMAND_EXECUTION, APL_SCREEN_LOCK, Host, RenderingEvent},
    scaling::ScaledMetrics,
};

/// Background sent when the document declares none.
const TRANSPARENT: &str = "#00000000";

impl<E: Environment, H: Host> ConnectionManager<E, H> {
    /// `build`: inflate the current content, or resume a restored document.
    ///
    /// Package and inflation failures end with a failed render completion;
    /// the other failures leave the host waiting for a later build.
    pub(crate) fn handle_build(&mut self, request: &BuildRequest) -> Result<(), BridgeError> {
        match self.build(request) {
            Err(err @ (BridgeError::ContentPrepare(_) | BridgeError::InflationFailed)) => {
                let message = err.viewhost_message().unwrap_or_default();
                let inflation_failed = err == BridgeError::InflationFailed;
                self.report("build", Err(err));
                let token = self.session.token.clone();
                self.host.on_render_document_complete(&token, false, &message);
                if inflation_failed {
                    self.check_and_send_data_source_errors();
                }
                Ok(())
            },
            other => other,
        }
    }

    fn build(&mut self, request: &BuildRequest) -> Result<(), BridgeError> {
        let restore = self.session.restore.take();
        if let Some(state) = &restore {
            self.session.token.clone_from(&state.token);
        }
        let token = self.session.token.clone();
        self.host.on_rendering_event(&token, RenderingEvent::InflateBegin);

        let restoring = restore.is_some();
        if let Some(state) = restore {
            tracing::info!(token = %state.token, "restoring document state");
            self.session.root = Some(state.root);
            self.session.content = Some(state.content);
            self.session.scaled = Some(state.scaled);
            self.session.root_config = Some(state.root_config);
            self.frame_update();
            if let Some(root) = self.session.root.as_mut() {
                root.configuration_change(&state.configuration_change);
            }
        }

        let Some(content) = self.session.content.as_deref_mut() else {
            return Err(BridgeError::NoContent);
        };
        let document_version = content.document_version();

        if !restoring {
            self.session.root = None;
            let metrics = Metrics {
                width: f64::from(request.width),
                height: f64::from(request.height),
                dpi: f64::from(request.dpi),
                shape: request.shape,
                mode: request.mode,
            };
            let root_config = RootConfig::from_build(
                request,
                self.env.wall_clock_millis(),
                self.host.timezone_offset_ms(),
            );
            let scaled = ScaledMetrics::choose(metrics, &self.session.viewport_specs);

            content.refresh(&scaled.metrics, &root_config);
            self.loader.load(content).map_err(BridgeError::ContentPrepare)?;
            self.session.scaled = Some(scaled);
            self.session.root_config = Some(root_config);
        }

        self.session.supported_extensions = parse_supported_extensions(&request.supported_extensions);
        self.register_extensions()?;

        self.send(Outbound::rendering_options(&document_version));
        self.pending.clear();
        self.host.on_activity_ended(&token, APL_COMMAND_EXECUTION);
        if self.session.screen_locked {
            self.host.on_activity_ended(&token, APL_SCREEN_LOCK);
            self.session.screen_locked = false;
        }
        self.start = Some(self.env.now());

        if !restoring {
            let viewhost = self.session.scaled.map(|scaled| Metrics {
                width: scaled.viewhost_width,
                height: scaled.viewhost_height,
                ..scaled.metrics
            });
            if let Some(viewhost) = viewhost {
                self.inflate_with_candidates(viewhost);
            }
        }

        let (Some(content), Some(root_config), Some(scaled)) = (
            self.session.content.as_deref(),
            self.session.root_config.as_ref(),
            self.session.scaled,
        ) else {
            return Err(BridgeError::NoContent);
        };
        let background = content.background(&scaled.metrics, root_config);
        let supports_resizing = content.supports_resizing();
        let idle_timeout = content.idle_timeout(root_config);

        self.send(Outbound::supports_resizing(supports_resizing));
        self.host.on_rendering_event(&token, RenderingEvent::InflateEnd);

        if self.session.root.is_none() {
            return Err(BridgeError::InflationFailed);
        }

        self.send(scaled.scaling_message());
        self.send(background_message(&background));
        self.send_hierarchy(OutboundKind::Hierarchy, false)?;
        self.host.on_set_document_idle_timeout(&token, idle_timeout);
        self.host.on_render_document_complete(&token, true, "");
        tracing::info!(%token, "document built");
        Ok(())
    }

    /// Inflate, dropping the chosen viewport candidate after each refusal
    /// until the engine accepts or no candidate is left.
    fn inflate_with_candidates(&mut self, viewhost: Metrics) {
        let mut candidates = self.session.viewport_specs.clone();
        let mut attempts = 0_u32;
        loop {
            let scaled = ScaledMetrics::choose(viewhost, &candidates);
            self.session.scaled = Some(scaled);
            self.send(scaled.scaling_message());
            self.start = Some(self.env.now());

            let (Some(content), Some(root_config)) =
                (self.session.content.as_deref_mut(), self.session.root_config.as_ref())
            else {
                return;
            };
            attempts += 1;
            if let Some(root) = self.engine.inflate(&scaled.metrics, content, root_config) {
                tracing::debug!(attempts, "document inflated");
                self.session.root = Some(root);
                return;
            }
            if !candidates.is_empty() {
                tracing::warn!(attempts, "unable to inflate document with current chosen scaling");
            }

            let position = scaled.chosen.and_then(|chosen| candidates.iter().position(|spec| *spec == chosen));
            let Some(position) = position else {
                // The chosen spec is not a candidate; nothing left to drop.
                return;
            };
            candidates.remove(position);
            if candidates.is_empty() {
                return;
            }
        }
    }

    /// `reInflate`: reload outstanding packages, re-register extensions and
    /// rebuild the layout.
    pub(crate) fn handle_reinflate(&mut self) -> Result<(), BridgeError> {
        if self.session.root.is_none() {
            return Err(BridgeError::MissingSession { operation: "reInflate" });
        }
        let Some(content) = self.session.content.as_deref_mut() else {
            return Err(BridgeError::NoContent);
        };

        if content.is_waiting() {
            self.loader.load(content).map_err(BridgeError::ContentReload)?;
        }
        self.register_extensions()?;

        if let (Some(root), Some(content)) =
            (self.session.root.as_mut(), self.session.content.as_deref_mut())
        {
            root.reinflate(content);
        }
        self.send_hierarchy(OutboundKind::Hierarchy, false)
    }

    /// Register the document's extensions for the current build.
    ///
    /// A timed-out load only fails registration when configured to.
    fn register_extensions(&mut self) -> Result<(), BridgeError> {
        let (Some(content), Some(root_config)) =
            (self.session.content.as_deref(), self.session.root_config.as_mut())
        else {
            return Err(BridgeError::NoContent);
        };
        let outcome = self.extensions.register(
            &self.session.supported_extensions,
            content,
            root_config,
            self.config.extension_load_timeout(),
        );

        if let Some(message) = outcome.viewhost_message() {
            self.send_error(message);
        }
        match outcome {
            ExtensionOutcome::Loaded => Ok(()),
            ExtensionOutcome::TimedOut if !self.config.abort_on_extension_timeout => Ok(()),
            ExtensionOutcome::TimedOut | ExtensionOutcome::Failed => {
                Err(BridgeError::ExtensionsNotLoaded)
            },
        }
    }

    /// Send the full component hierarchy.
    pub(crate) fn send_hierarchy(
        &mut self,
        kind: OutboundKind,
        blocking: bool,
    ) -> Result<(), BridgeError> {
        let Some(top) = self.session.root.as_ref().and_then(|root| root.top_component()) else {
            return Err(BridgeError::MissingSession { operation: "sendHierarchy" });
        };
        let message = Outbound::new(kind, dirty::hierarchy_payload(&top));
        if blocking {
            self.blocking_send(message).map(|_| ())
        } else {
            self.send(message);
            Ok(())
        }
    }
}

fn background_message(background: &Background) -> Outbound {
    let background = match background {
        Background::Color(color) => json!({ "color": color }),
        Background::Gradient(gradient) => json!({ "gradient": gradient }),
        Background::None => json!({ "color": TRANSPARENT }),
    };
    Outbound::new(OutboundKind::Background, json!({ "background": background }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_background_is_transparent() {
        let message = background_message(&Background::None);
        assert_eq!(message.payload["background"]["color"], TRANSPARENT);

        let message = background_message(&Background::Gradient(json!({"type": "linear"})));
        assert_eq!(message.payload["background"]["gradient"]["type"], "linear");
    }
}
