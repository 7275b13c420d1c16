//! Component Instance
//!
//! Runtime state of one embedded custom component.
//!
//! ```text
//!                 COMPONENT_READY (version ok)
//! AwaitingReady ───────────────────────────────▶ Ready ◀─┐ COMPONENT_READY
//!      │                                           └─────┘ (resend last render)
//!      │ COMPONENT_READY (version mismatch)
//!      ▼
//!   Failed (terminal, error card replaces the frame)
//! ```
//!
//! Renders are buffered while awaiting readiness and sent immediately once
//! ready. Value and height messages are only honored in `Ready`.

use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use super::error::ChannelError;
use super::messages::{DataType, GuestId, GuestMessage, RenderPayload, ScalarValue, CURRENT_API_VERSION};
use crate::sync::{BackMsgSink, WidgetStateManager};
use crate::widgets::Source;

/// Readiness handshake state
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelState {
    /// Waiting for `COMPONENT_READY`; holds the latest render
    AwaitingReady { pending: RenderPayload },
    /// Handshake done; remembers the last render sent
    Ready { last: RenderPayload },
    /// Protocol violation; the instance never becomes ready
    Failed { message: String },
}

impl ChannelState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ChannelState::Ready { .. })
    }
}

/// The frame element hosting the guest document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameElement {
    pub src: String,
    /// Height attribute in pixels, written outside the render cycle
    pub height: Option<f64>,
}

/// What the host shows in place of the component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum InstanceView {
    Frame(FrameElement),
    Error { message: String },
}

/// One mounted custom component
#[derive(Debug, Clone)]
pub struct ComponentInstance {
    guest: GuestId,
    widget_id: String,
    component_name: String,
    state: ChannelState,
    frame: FrameElement,
    render_count: u64,
}

impl ComponentInstance {
    pub fn new(
        guest: GuestId,
        widget_id: impl Into<String>,
        component_name: impl Into<String>,
        src: impl Into<String>,
    ) -> Self {
        Self {
            guest,
            widget_id: widget_id.into(),
            component_name: component_name.into(),
            state: ChannelState::AwaitingReady {
                pending: RenderPayload::default(),
            },
            frame: FrameElement {
                src: src.into(),
                height: None,
            },
            render_count: 0,
        }
    }

    /// Apply a render pass
    ///
    /// Returns the payload to post when the guest is ready, `None` when it was
    /// buffered or the instance has failed.
    pub fn render(&mut self, payload: RenderPayload) -> Option<RenderPayload> {
        self.render_count += 1;
        match &mut self.state {
            ChannelState::AwaitingReady { pending } => {
                *pending = payload;
                None
            }
            ChannelState::Ready { last } => {
                *last = payload.clone();
                Some(payload)
            }
            ChannelState::Failed { .. } => None,
        }
    }

    /// Apply an inbound guest message
    ///
    /// Returns a payload to post back to the guest, if any.
    pub fn handle_message<S: BackMsgSink>(
        &mut self,
        message: GuestMessage,
        widgets: &mut WidgetStateManager<S>,
    ) -> Result<Option<RenderPayload>, ChannelError> {
        match message {
            GuestMessage::ComponentReady { api_version } => self.handle_ready(api_version),
            _ if !self.state.is_ready() => Err(ChannelError::NotReady(message.type_name())),
            GuestMessage::SetWidgetValue { value } => {
                self.set_widget_value(value, widgets);
                Ok(None)
            }
            GuestMessage::SetComponentValue { data_type, value } => {
                self.set_component_value(data_type, value, widgets)?;
                Ok(None)
            }
            GuestMessage::SetFrameHeight { height } => {
                // Written straight onto the frame; no render pass.
                self.frame.height = Some(height);
                Ok(None)
            }
        }
    }

    fn handle_ready(&mut self, api_version: u32) -> Result<Option<RenderPayload>, ChannelError> {
        match &self.state {
            ChannelState::Failed { .. } => Err(ChannelError::NotReady("streamlit:componentReady")),
            _ if api_version != CURRENT_API_VERSION => {
                let error = ChannelError::ApiVersionMismatch {
                    expected: CURRENT_API_VERSION,
                    actual: api_version,
                };
                self.state = ChannelState::Failed {
                    message: error.to_string(),
                };
                Err(error)
            }
            ChannelState::AwaitingReady { pending } => {
                let payload = pending.clone();
                self.state = ChannelState::Ready {
                    last: payload.clone(),
                };
                Ok(Some(payload))
            }
            ChannelState::Ready { last } => {
                tracing::info!(
                    guest = %self.guest,
                    component = %self.component_name,
                    "Component ready again, resending last render"
                );
                Ok(Some(last.clone()))
            }
        }
    }

    fn set_widget_value<S: BackMsgSink>(&self, value: ScalarValue, widgets: &mut WidgetStateManager<S>) {
        let id = self.widget_id.clone();
        match value {
            ScalarValue::Bool(b) => widgets.set_bool_value(id, b, Source::ui()),
            ScalarValue::Number(n) => widgets.set_double_value(id, n, Source::ui()),
            ScalarValue::String(s) => widgets.set_string_value(id, s, Source::ui()),
        };
    }

    fn set_component_value<S: BackMsgSink>(
        &self,
        data_type: DataType,
        value: Value,
        widgets: &mut WidgetStateManager<S>,
    ) -> Result<(), ChannelError> {
        let id = self.widget_id.clone();
        match data_type {
            DataType::Json => {
                let text = serde_json::to_string(&value)
                    .map_err(|e| ChannelError::UnsupportedValue(e.to_string()))?;
                widgets.set_json_value(id, text, Source::ui());
            }
            DataType::Dataframe => {
                widgets.set_arrow_value(id, decode_bytes(&value)?, Source::ui());
            }
            DataType::Bytes => {
                widgets.set_bytes_value(id, decode_bytes(&value)?, Source::ui());
            }
        }
        Ok(())
    }

    pub fn guest(&self) -> GuestId {
        self.guest
    }

    pub fn widget_id(&self) -> &str {
        &self.widget_id
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub fn frame(&self) -> &FrameElement {
        &self.frame
    }

    /// Number of render passes applied to this instance
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    pub fn view(&self) -> InstanceView {
        match &self.state {
            ChannelState::Failed { message } => InstanceView::Error {
                message: message.clone(),
            },
            _ => InstanceView::Frame(self.frame.clone()),
        }
    }
}

/// Bytes arrive either base64-encoded or as an array of octets
fn decode_bytes(value: &Value) -> Result<Vec<u8>, ChannelError> {
    match value {
        Value::String(encoded) => base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| ChannelError::UnsupportedValue(format!("invalid base64: {}", e))),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| ChannelError::UnsupportedValue(format!("byte {}", item)))
            })
            .collect(),
        other => Err(ChannelError::UnsupportedValue(format!("bytes from {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{BackMsg, ChannelSink};
    use serde_json::{json, Map};
    use tokio::sync::mpsc;

    fn manager() -> (
        WidgetStateManager<ChannelSink>,
        mpsc::UnboundedReceiver<BackMsg>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (WidgetStateManager::new(ChannelSink::new(tx)), rx)
    }

    fn instance() -> ComponentInstance {
        ComponentInstance::new(GuestId(1), "cc-1", "my_component", "http://localhost:3001")
    }

    fn payload(foo: i64) -> RenderPayload {
        let mut args = Map::new();
        args.insert("foo".to_string(), json!(foo));
        RenderPayload {
            args,
            dfs: vec![],
            disabled: false,
        }
    }

    fn ready() -> GuestMessage {
        GuestMessage::ComponentReady {
            api_version: CURRENT_API_VERSION,
        }
    }

    #[test]
    fn test_ready_without_buffered_render_sends_empty_payload() {
        let (mut widgets, _rx) = manager();
        let mut inst = instance();

        let sent = inst.handle_message(ready(), &mut widgets).unwrap();

        let sent = sent.unwrap();
        assert!(sent.args.is_empty());
        assert!(sent.dfs.is_empty());
        assert!(!sent.disabled);
        assert!(inst.state().is_ready());
    }

    #[test]
    fn test_render_is_buffered_until_ready() {
        let (mut widgets, _rx) = manager();
        let mut inst = instance();

        assert_eq!(inst.render(payload(1)), None);
        assert_eq!(inst.render(payload(2)), None);

        let sent = inst.handle_message(ready(), &mut widgets).unwrap();
        assert_eq!(sent, Some(payload(2)));

        assert_eq!(inst.render(payload(3)), Some(payload(3)));
    }

    #[test]
    fn test_repeated_ready_resends_latest_payload() {
        let (mut widgets, _rx) = manager();
        let mut inst = instance();

        inst.render(payload(1));
        let first = inst.handle_message(ready(), &mut widgets).unwrap();
        assert_eq!(first, Some(payload(1)));

        assert_eq!(inst.render(payload(2)), Some(payload(2)));

        let second = inst.handle_message(ready(), &mut widgets).unwrap();
        assert_eq!(second, Some(payload(2)));

        let third = inst.handle_message(ready(), &mut widgets).unwrap();
        assert_eq!(third, Some(payload(2)));
    }

    #[test]
    fn test_set_widget_value_before_ready_is_dropped() {
        let (mut widgets, mut rx) = manager();
        let mut inst = instance();

        let result = inst.handle_message(
            GuestMessage::SetWidgetValue {
                value: ScalarValue::Bool(true),
            },
            &mut widgets,
        );

        assert!(matches!(result, Err(ChannelError::NotReady("streamlit:setWidgetValue"))));
        assert!(widgets.store().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_set_widget_value_when_ready_flushes() {
        let (mut widgets, mut rx) = manager();
        let mut inst = instance();
        inst.handle_message(ready(), &mut widgets).unwrap();

        inst.handle_message(
            GuestMessage::SetWidgetValue {
                value: ScalarValue::Number(4.0),
            },
            &mut widgets,
        )
        .unwrap();

        assert_eq!(widgets.store().get_double_value("cc-1"), Some(4.0));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_set_component_value_json_and_bytes() {
        let (mut widgets, _rx) = manager();
        let mut inst = instance();
        inst.handle_message(ready(), &mut widgets).unwrap();

        inst.handle_message(
            GuestMessage::SetComponentValue {
                data_type: DataType::Json,
                value: json!({"rows": [1, 2]}),
            },
            &mut widgets,
        )
        .unwrap();
        assert_eq!(widgets.store().get_json_value("cc-1"), Some(r#"{"rows":[1,2]}"#));

        inst.handle_message(
            GuestMessage::SetComponentValue {
                data_type: DataType::Bytes,
                value: json!([104, 105]),
            },
            &mut widgets,
        )
        .unwrap();
        assert_eq!(widgets.store().get_bytes_value("cc-1"), Some(&b"hi"[..]));

        inst.handle_message(
            GuestMessage::SetComponentValue {
                data_type: DataType::Dataframe,
                value: json!("AAE="),
            },
            &mut widgets,
        )
        .unwrap();
        assert_eq!(widgets.store().get_arrow_value("cc-1"), Some(&[0u8, 1][..]));
    }

    #[test]
    fn test_api_version_mismatch_is_terminal() {
        let (mut widgets, _rx) = manager();
        let mut inst = instance();

        let result = inst.handle_message(
            GuestMessage::ComponentReady {
                api_version: CURRENT_API_VERSION + 1,
            },
            &mut widgets,
        );
        assert!(matches!(result, Err(ChannelError::ApiVersionMismatch { .. })));
        assert!(matches!(inst.view(), InstanceView::Error { .. }));

        let result = inst.handle_message(
            GuestMessage::SetWidgetValue {
                value: ScalarValue::Bool(true),
            },
            &mut widgets,
        );
        assert!(result.is_err());
        assert!(widgets.store().is_empty());

        let result = inst.handle_message(ready(), &mut widgets);
        assert!(result.is_err());
        assert!(!inst.state().is_ready());
    }

    #[test]
    fn test_frame_height_bypasses_render() {
        let (mut widgets, _rx) = manager();
        let mut inst = instance();

        let early = inst.handle_message(GuestMessage::SetFrameHeight { height: 300.0 }, &mut widgets);
        assert!(early.is_err());
        assert_eq!(inst.frame().height, None);

        inst.render(payload(1));
        inst.handle_message(ready(), &mut widgets).unwrap();
        let renders = inst.render_count();

        inst.handle_message(GuestMessage::SetFrameHeight { height: 300.0 }, &mut widgets)
            .unwrap();

        assert_eq!(inst.frame().height, Some(300.0));
        assert_eq!(inst.render_count(), renders);
    }

    #[test]
    fn test_decode_bytes_rejects_garbage() {
        assert!(decode_bytes(&json!("!!not base64!!")).is_err());
        assert!(decode_bytes(&json!([256])).is_err());
        assert!(decode_bytes(&json!({"a": 1})).is_err());
    }
}
