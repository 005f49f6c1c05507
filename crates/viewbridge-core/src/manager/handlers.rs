//! Inbound message handlers.
//!
//! Each handler maps one [`InboundMessage`] variant onto the engine. Handlers
//! that need a document fail with [`BridgeError::MissingSession`] when none
//! is inflated.

use serde_json::{Map, Value, json};
use viewbridge_proto::{
    InboundMessage, Outbound, OutboundKind,
    payloads::{
        QueryRequest, Rect,
        component::{ComponentTarget, ComponentUpdate, GraphicUpdate, ScrollToRect},
        config::ConfigurationChange,
        event::EventResponse,
        input::{CharacterValidRequest, KeyboardRequest, PointerEventRequest, SetFocus},
        media::MediaUpdate,
    },
};

use super::ConnectionManager;
use crate::{
    engine::{
        ComponentRef, DisplayState, Keyboard, Metrics, PointerEvent, PointerEventType, Resolution,
        RootContext,
    },
    env::Environment,
    error::BridgeError,
    host::Host,
    scaling::ScaledMetrics,
};

/// Which context a query reply carries.
#[derive(Clone, Copy)]
enum ContextQuery {
    Visual,
    DataSource,
}

impl<E: Environment, H: Host> ConnectionManager<E, H> {
    pub(crate) fn handle(&mut self, message: InboundMessage) -> Result<(), BridgeError> {
        match message {
            InboundMessage::Build(request) => self.handle_build(&request),
            InboundMessage::ConfigurationChange(change) => self.handle_configuration_change(change),
            InboundMessage::UpdateDisplayState(code) => {
                let state = DisplayState::from_code(code).ok_or(BridgeError::InvalidDisplayState(code))?;
                self.root_mut("updateDisplayState")?.update_display_state(state);
                Ok(())
            },
            InboundMessage::Update(update) => self.handle_update(&update),
            InboundMessage::UpdateMedia(update) => self.handle_update_media(&update),
            InboundMessage::UpdateGraphic(update) => self.handle_update_graphic(&update),
            InboundMessage::Response(response) => self.handle_event_response(&response),
            InboundMessage::EnsureLayout(target) => self.handle_ensure_layout(target),
            InboundMessage::ScrollToRectInComponent(scroll) => self.handle_scroll_to_rect(&scroll),
            InboundMessage::HandleKeyboard(request) => self.handle_keyboard(&request),
            InboundMessage::GetFocusableAreas(query) => self.handle_focusable_areas(query),
            InboundMessage::GetFocused(query) => {
                let focused = self.root_mut("getFocused")?.focused();
                self.reply(OutboundKind::GetFocused, query, json!(focused));
                Ok(())
            },
            InboundMessage::GetVisualContext(query) => {
                self.handle_context_query(query, ContextQuery::Visual)
            },
            InboundMessage::GetDataSourceContext(query) => {
                self.handle_context_query(query, ContextQuery::DataSource)
            },
            InboundMessage::SetFocus(focus) => self.handle_set_focus(&focus),
            InboundMessage::UpdateCursorPosition(position) => {
                let factor = self.scale_factor();
                let event = PointerEvent {
                    event_type: PointerEventType::Move,
                    pointer_type: 0,
                    pointer_id: 0,
                    x: position.x / factor,
                    y: position.y / factor,
                };
                self.root_mut("updateCursorPosition")?.handle_pointer_event(event);
                Ok(())
            },
            InboundMessage::HandlePointerEvent(request) => self.handle_pointer_event(&request),
            InboundMessage::IsCharacterValid(request) => self.handle_is_character_valid(request),
            InboundMessage::ReInflate => self.handle_reinflate(),
            InboundMessage::ReHierarchy => self.send_hierarchy(OutboundKind::ReHierarchy, true),
            InboundMessage::Extension(message) => {
                let (data, skipped) = message.string_data();
                for key in skipped {
                    tracing::warn!(uri = %message.uri, %key, "could not parse extension message data");
                }
                self.call_extension_handler(&message.uri, &message.name, &data, message.fast_mode)
            },
            InboundMessage::MediaLoaded(loaded) => {
                self.root_mut("mediaLoaded")?.media_loaded(&loaded.source);
                Ok(())
            },
            InboundMessage::MediaLoadFailed(failed) => {
                self.root_mut("mediaLoadFailed")?.media_load_failed(
                    &failed.source,
                    failed.error_code,
                    &failed.error,
                );
                Ok(())
            },
            InboundMessage::Player(callback) => {
                if !self.root_mut("playerCallback")?.player_callback(&callback) {
                    tracing::warn!(player_id = %callback.player_id, "no player with this id");
                }
                Ok(())
            },
        }
    }

    fn root_mut(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut (dyn RootContext + 'static), BridgeError> {
        match self.session.root.as_deref_mut() {
            Some(root) => Ok(root),
            None => Err(BridgeError::MissingSession { operation }),
        }
    }

    fn find_component(&mut self, operation: &'static str, id: &str) -> Result<ComponentRef, BridgeError> {
        self.root_mut(operation)?
            .find_component_by_id(id)
            .ok_or_else(|| BridgeError::UnknownComponent { id: id.to_string() })
    }

    fn reply(&mut self, kind: OutboundKind, query: QueryRequest, result: Value) {
        self.send(Outbound::new(kind, json!({ "messageId": query.message_id, "result": result })));
    }

    fn to_core_rect(&self, rect: Rect) -> Rect {
        rect.scaled(1.0 / self.scale_factor())
    }

    fn handle_configuration_change(&mut self, mut change: ConfigurationChange) -> Result<(), BridgeError> {
        let (Some(_), Some(scaled)) = (self.session.root.as_ref(), self.session.scaled) else {
            return Err(BridgeError::MissingSession { operation: "configurationChange" });
        };

        if let Some((width, height)) = change.size {
            let viewhost = Metrics { width: f64::from(width), height: f64::from(height), ..scaled.metrics };
            let rescaled = ScaledMetrics::choose(viewhost, &self.session.viewport_specs);
            change.size = Some(rescaled.core_pixel_size(rescaled.viewhost_width, rescaled.viewhost_height));
            self.session.scaled = Some(rescaled);
            self.send(rescaled.scaling_message());
        }

        self.session.configuration_change.merge(&change);
        self.root_mut("configurationChange")?.configuration_change(&change);
        Ok(())
    }

    fn handle_update(&mut self, update: &ComponentUpdate) -> Result<(), BridgeError> {
        let component = self.find_component("update", &update.id)?;
        component.update(update.update_type, &update.value);
        Ok(())
    }

    fn handle_update_media(&mut self, update: &MediaUpdate) -> Result<(), BridgeError> {
        let component = self.find_component("updateMedia", &update.id)?;
        let (Some(state), Some(from_event)) = (&update.state, update.from_event) else {
            return Err(BridgeError::MediaState);
        };
        component.update_media_state(state, from_event);
        Ok(())
    }

    fn handle_update_graphic(&mut self, update: &GraphicUpdate) -> Result<(), BridgeError> {
        let component = self.find_component("updateGraphic", &update.id)?;
        if !component.update_graphic(&update.avg) {
            tracing::warn!(id = %update.id, "graphic source rejected");
        }
        Ok(())
    }

    /// Resolve a pending event: rectangle first, then argument, then plain.
    fn handle_event_response(&mut self, response: &EventResponse) -> Result<(), BridgeError> {
        self.root_mut("response")?;
        let token = response
            .event
            .and_then(|event| u32::try_from(event).ok())
            .ok_or(BridgeError::InvalidEventResponse)?;

        let resolution = match (response.rect, response.argument) {
            (Some(rect), _) => Resolution::Rect(self.to_core_rect(rect)),
            (None, Some(argument)) => Resolution::Argument(argument),
            (None, None) => Resolution::Plain,
        };
        if !self.pending.resolve(token, resolution) {
            tracing::debug!(token, "response for an event that is not pending");
        }
        Ok(())
    }

    fn handle_ensure_layout(&mut self, target: ComponentTarget) -> Result<(), BridgeError> {
        let component = self.find_component("ensureLayout", &target.id)?;
        component.ensure_layout();
        self.send(Outbound::new(OutboundKind::EnsureLayout, Value::String(target.id)));
        Ok(())
    }

    fn handle_scroll_to_rect(&mut self, scroll: &ScrollToRect) -> Result<(), BridgeError> {
        let component = self.find_component("scrollToRectInComponent", &scroll.id)?;
        let rect = self.to_core_rect(scroll.rect());
        self.root_mut("scrollToRectInComponent")?.scroll_to_rect_in_component(&component, rect, scroll.align);
        Ok(())
    }

    fn handle_keyboard(&mut self, request: &KeyboardRequest) -> Result<(), BridgeError> {
        let consumed = self
            .root_mut("handleKeyboard")?
            .handle_keyboard(request.key_type, &Keyboard::from(request));
        self.send(Outbound::new(
            OutboundKind::HandleKeyboard,
            json!({ "messageId": request.message_id, "result": consumed }),
        ));
        Ok(())
    }

    fn handle_focusable_areas(&mut self, query: QueryRequest) -> Result<(), BridgeError> {
        let areas: Map<String, Value> = self
            .root_mut("getFocusableAreas")?
            .focusable_areas()
            .into_iter()
            .map(|(id, rect)| {
                let area = json!({
                    "top": rect.y,
                    "left": rect.x,
                    "width": rect.width,
                    "height": rect.height,
                });
                (id, area)
            })
            .collect();
        self.send(Outbound::new(
            OutboundKind::GetFocusableAreas,
            json!({ "messageId": query.message_id, "areas": areas }),
        ));
        Ok(())
    }

    fn handle_context_query(&mut self, query: QueryRequest, context: ContextQuery) -> Result<(), BridgeError> {
        let (operation, kind) = match context {
            ContextQuery::Visual => ("getVisualContext", OutboundKind::GetVisualContext),
            ContextQuery::DataSource => ("getDataSourceContext", OutboundKind::GetDataSourceContext),
        };
        let root = self.root_mut(operation)?;
        let result = match context {
            ContextQuery::Visual => root.serialize_visual_context(),
            ContextQuery::DataSource => root.serialize_data_source_context(),
        };
        self.reply(kind, query, result);
        Ok(())
    }

    fn handle_set_focus(&mut self, focus: &SetFocus) -> Result<(), BridgeError> {
        let origin = Rect {
            x: focus.origin.left,
            y: focus.origin.top,
            width: focus.origin.width,
            height: focus.origin.height,
        };
        self.root_mut("setFocus")?.set_focus(focus.direction, origin, &focus.target_id);
        Ok(())
    }

    fn handle_pointer_event(&mut self, request: &PointerEventRequest) -> Result<(), BridgeError> {
        let event_type = PointerEventType::from_code(request.pointer_event_type).ok_or_else(|| {
            BridgeError::Malformed {
                kind: "handlePointerEvent".to_string(),
                reason: format!("unknown pointer event type {}", request.pointer_event_type),
            }
        })?;
        let factor = self.scale_factor();
        let event = PointerEvent {
            event_type,
            pointer_type: request.pointer_type,
            pointer_id: request.pointer_id,
            x: request.x / factor,
            y: request.y / factor,
        };
        self.root_mut("handlePointerEvent")?.handle_pointer_event(event);
        Ok(())
    }

    fn handle_is_character_valid(&mut self, request: CharacterValidRequest) -> Result<(), BridgeError> {
        self.root_mut("isCharacterValid")?;
        let message_id = request.message_id.ok_or(BridgeError::MissingField("messageId"))?;
        let character = request.character.ok_or(BridgeError::MissingField("character"))?;
        let component_id = request.component_id.ok_or(BridgeError::MissingField("componentId"))?;

        let component = self.find_component("isCharacterValid", &component_id)?;
        let valid = character.chars().next().is_some_and(|c| component.is_character_valid(c));
        self.send(Outbound::new(
            OutboundKind::IsCharacterValid,
            json!({ "messageId": message_id, "valid": valid, "componentId": component_id }),
        ));
        Ok(())
    }

    /// Invoke a document-side extension event handler.
    pub(crate) fn call_extension_handler(
        &mut self,
        uri: &str,
        name: &str,
        data: &Map<String, Value>,
        fast_mode: bool,
    ) -> Result<(), BridgeError> {
        let root = self.root_mut("invokeExtensionEventHandler")?;
        if root.invoke_extension_event_handler(uri, name, data, fast_mode).is_none() {
            tracing::warn!(%uri, %name, "no handler found");
        }
        Ok(())
    }
}
