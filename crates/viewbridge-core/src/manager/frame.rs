//! Frame update and engine event projection.

use std::time::Duration;

use serde_json::{Value, json};
use viewbridge_proto::{Outbound, OutboundKind};

use super::ConnectionManager;
use crate::{
    dirty,
    engine::{EngineEvent, EventKind},
    env::Environment,
    host::{APL_SCREEN_LOCK, ExtensionEvent, Host},
};

impl<E: Environment, H: Host> ConnectionManager<E, H> {
    /// Clock tick: advance the document and send whatever changed, then
    /// report data source errors.
    pub fn on_update_tick(&mut self) {
        if self.session.root.is_some() {
            self.frame_update();
            self.check_and_send_data_source_errors();
        }
    }

    /// Advance engine time, drain its events, send the dirty diff and
    /// reconcile the screen lock. Events are drained before the dirty set is
    /// read, so the diff includes their effects.
    pub fn frame_update(&mut self) {
        let now = self.env.now();
        let elapsed = self.start.map_or(Duration::ZERO, |start| now - start);
        let utc = self.env.wall_clock_millis();
        let adjustment = self.host.timezone_offset_ms();

        let Some(root) = self.session.root.as_mut() else {
            tracing::error!("frame update: root context is missing");
            return;
        };
        root.update_time(elapsed.as_millis() as u64, utc);
        root.set_local_time_adjustment(adjustment);
        root.tick_players();
        root.clear_pending();

        self.drain_events();
        self.send_dirty();
        self.reconcile_screen_lock();
        self.flush_terminations();
    }

    /// Report errors accumulated by data source providers.
    pub fn check_and_send_data_source_errors(&mut self) {
        let Some(root) = self.session.root.as_mut() else {
            return;
        };
        let errors = root.take_data_source_errors();
        if errors.is_empty() {
            return;
        }

        tracing::warn!(count = errors.len(), "data source errors");
        let token = self.session.token.clone();
        let payload = json!({ "presentationToken": token, "errors": errors });
        self.host.on_runtime_error(&token, &payload);
    }

    fn drain_events(&mut self) {
        loop {
            let Some(root) = self.session.root.as_mut() else {
                return;
            };
            if !root.has_event() {
                return;
            }
            let Some(event) = root.pop_event() else {
                return;
            };
            self.process_event(event);
        }
    }

    pub(crate) fn process_event(&mut self, event: EngineEvent) {
        let token = self.session.token.clone();
        match &event.kind {
            EventKind::Finish => self.host.on_finish(&token),
            EventKind::SendEvent { source, arguments, components } => {
                let payload = json!({
                    "presentationToken": token,
                    "source": source,
                    "arguments": arguments,
                    "components": components,
                });
                self.host.on_send_event(&token, &payload);
            },
            EventKind::DataSourceFetchRequest { source_type, request } => {
                let mut payload = request.clone();
                payload.insert("presentationToken".to_string(), Value::String(token.clone()));
                self.host.on_data_source_fetch_request(&token, source_type, &Value::Object(payload));
            },
            EventKind::Extension { uri, name, source, params } => {
                if let Some(mediator) = self.extensions.mediator() {
                    if !mediator.invoke_command(&event) {
                        tracing::warn!(%uri, %name, "extension command not handled");
                    }
                    return;
                }

                let extension_token = self.next_seqno();
                let expects_result = match &event.action {
                    Some(action) => self.pending.insert(extension_token, action.clone(), false),
                    None => false,
                };
                self.host.on_extension_event(&token, ExtensionEvent {
                    uri: uri.clone(),
                    name: name.clone(),
                    source: source.clone(),
                    params: params.clone(),
                    token: extension_token,
                    expects_result,
                });
            },
            EventKind::Viewhost(serialized) => {
                let seqno = self.send(Outbound::new(OutboundKind::Event, serialized.clone()));
                if let Some(action) = &event.action {
                    self.pending.insert(seqno, action.clone(), true);
                }
            },
        }
    }

    fn send_dirty(&mut self) {
        let Some(root) = self.session.root.as_mut() else {
            return;
        };
        if !root.is_dirty() {
            return;
        }
        let payload = dirty::serialize_dirty(&root.dirty());
        root.clear_dirty();
        self.send(Outbound::new(OutboundKind::Dirty, payload));
    }

    fn reconcile_screen_lock(&mut self) {
        let Some(root) = self.session.root.as_ref() else {
            return;
        };
        let locked = root.screen_lock();
        if locked == self.session.screen_locked {
            return;
        }

        self.session.screen_locked = locked;
        let token = self.session.token.clone();
        if locked {
            self.host.on_activity_started(&token, APL_SCREEN_LOCK);
        } else {
            self.host.on_activity_ended(&token, APL_SCREEN_LOCK);
        }
        self.send(Outbound::screen_lock(locked));
    }
}
