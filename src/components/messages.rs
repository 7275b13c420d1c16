//! Cross-Frame Message Types
//!
//! Every message crossing the frame boundary is a single JSON object carrying
//! `isStreamlitMessage: true`, a `type` tag, and its payload merged at the top
//! level. Objects without the flag belong to someone else sharing the channel
//! and are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::error::ChannelError;
use crate::widgets::base64_bytes;

/// Discriminator field marking a protocol message
pub const PROTOCOL_FLAG: &str = "isStreamlitMessage";

/// Protocol version the host speaks
pub const CURRENT_API_VERSION: u32 = 1;

/// Target origin for every outgoing message
pub const ANY_ORIGIN: &str = "*";

const COMPONENT_READY: &str = "streamlit:componentReady";
const SET_WIDGET_VALUE: &str = "streamlit:setWidgetValue";
const SET_COMPONENT_VALUE: &str = "streamlit:setComponentValue";
const SET_FRAME_HEIGHT: &str = "streamlit:setFrameHeight";

/// Stable identity of an embedded guest document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(pub u64);

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guest-{}", self.0)
    }
}

/// Scalar carried by `SET_WIDGET_VALUE`
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Number(f64),
    String(String),
}

/// How a `SET_COMPONENT_VALUE` payload should be stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Any JSON value, stored as serialized text
    Json,
    /// Arrow IPC bytes
    Dataframe,
    /// Opaque bytes
    Bytes,
}

/// Messages sent from a guest to the host
#[derive(Debug, Clone, PartialEq)]
pub enum GuestMessage {
    /// The guest finished loading and can receive renders
    ComponentReady { api_version: u32 },
    /// Scalar widget value
    SetWidgetValue { value: ScalarValue },
    /// Typed widget value
    SetComponentValue { data_type: DataType, value: Value },
    /// Requested frame height in pixels
    SetFrameHeight { height: f64 },
}

impl GuestMessage {
    /// Decode an inbound frame event
    ///
    /// Returns `Ok(None)` for traffic that is not part of the protocol.
    pub fn from_event(data: &Value) -> Result<Option<Self>, ChannelError> {
        let Some(object) = data.as_object() else {
            return Ok(None);
        };
        if object.get(PROTOCOL_FLAG).and_then(Value::as_bool) != Some(true) {
            return Ok(None);
        }

        let message_type = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ChannelError::MissingField("type"))?;

        let message = match message_type {
            COMPONENT_READY => {
                let api_version = object
                    .get("apiVersion")
                    .ok_or(ChannelError::MissingField("apiVersion"))?;
                let api_version = api_version
                    .as_u64()
                    .and_then(|v| u32::try_from(v).ok())
                    .ok_or_else(|| {
                        ChannelError::UnsupportedValue(format!("apiVersion {}", api_version))
                    })?;
                GuestMessage::ComponentReady { api_version }
            }
            SET_WIDGET_VALUE => {
                let value = required(object, "value")?;
                let value = match value {
                    Value::Bool(b) => ScalarValue::Bool(*b),
                    Value::Number(n) => ScalarValue::Number(n.as_f64().unwrap_or(f64::NAN)),
                    Value::String(s) => ScalarValue::String(s.clone()),
                    other => {
                        return Err(ChannelError::UnsupportedValue(format!(
                            "setWidgetValue cannot carry {}",
                            json_kind(other)
                        )));
                    }
                };
                GuestMessage::SetWidgetValue { value }
            }
            SET_COMPONENT_VALUE => {
                let value = required(object, "value")?.clone();
                let data_type = required(object, "dataType")?;
                let data_type: DataType = serde_json::from_value(data_type.clone())
                    .map_err(|_| ChannelError::UnsupportedValue(format!("dataType {}", data_type)))?;
                GuestMessage::SetComponentValue { data_type, value }
            }
            SET_FRAME_HEIGHT => {
                let height = required(object, "height")?;
                let height = height
                    .as_f64()
                    .filter(|h| h.is_finite() && *h >= 0.0)
                    .ok_or_else(|| ChannelError::UnsupportedValue(format!("height {}", height)))?;
                GuestMessage::SetFrameHeight { height }
            }
            other => return Err(ChannelError::UnknownMessageType(other.to_string())),
        };

        Ok(Some(message))
    }

    /// Wire tag of this message
    pub fn type_name(&self) -> &'static str {
        match self {
            GuestMessage::ComponentReady { .. } => COMPONENT_READY,
            GuestMessage::SetWidgetValue { .. } => SET_WIDGET_VALUE,
            GuestMessage::SetComponentValue { .. } => SET_COMPONENT_VALUE,
            GuestMessage::SetFrameHeight { .. } => SET_FRAME_HEIGHT,
        }
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ChannelError> {
    object.get(field).ok_or(ChannelError::MissingField(field))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A dataframe argument, sent to the guest as Arrow IPC bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgsDataframe {
    pub key: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Everything a guest needs to draw itself
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderPayload {
    /// JSON-serializable named arguments
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Dataframe arguments
    #[serde(default)]
    pub dfs: Vec<ArgsDataframe>,
    /// Whether the guest should disable interaction
    #[serde(default)]
    pub disabled: bool,
}

/// Messages sent from the host to a guest
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    #[serde(rename = "streamlit:render")]
    Render(RenderPayload),
}

/// A host message with the protocol flag attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostEnvelope {
    #[serde(rename = "isStreamlitMessage")]
    pub is_streamlit_message: bool,
    #[serde(flatten)]
    pub message: HostMessage,
}

impl HostEnvelope {
    pub fn new(message: HostMessage) -> Self {
        Self {
            is_streamlit_message: true,
            message,
        }
    }
}

/// An outbound message addressed to one guest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameMessage {
    pub guest: GuestId,
    pub target_origin: String,
    pub message: HostEnvelope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ignores_non_protocol_traffic() {
        assert_eq!(GuestMessage::from_event(&json!("hello")).unwrap(), None);
        assert_eq!(
            GuestMessage::from_event(&json!({"type": "streamlit:componentReady"})).unwrap(),
            None
        );
        assert_eq!(
            GuestMessage::from_event(&json!({"isStreamlitMessage": "yes", "type": "x"})).unwrap(),
            None
        );
    }

    #[test]
    fn test_parse_component_ready() {
        let msg = GuestMessage::from_event(&json!({
            "isStreamlitMessage": true,
            "type": "streamlit:componentReady",
            "apiVersion": 1
        }))
        .unwrap();
        assert_eq!(msg, Some(GuestMessage::ComponentReady { api_version: 1 }));
    }

    #[test]
    fn test_parse_set_widget_value_scalars() {
        let parse = |value: Value| {
            GuestMessage::from_event(&json!({
                "isStreamlitMessage": true,
                "type": "streamlit:setWidgetValue",
                "value": value
            }))
        };

        assert_eq!(
            parse(json!(true)).unwrap(),
            Some(GuestMessage::SetWidgetValue { value: ScalarValue::Bool(true) })
        );
        assert_eq!(
            parse(json!(2.5)).unwrap(),
            Some(GuestMessage::SetWidgetValue { value: ScalarValue::Number(2.5) })
        );
        assert_eq!(
            parse(json!("abc")).unwrap(),
            Some(GuestMessage::SetWidgetValue {
                value: ScalarValue::String("abc".to_string())
            })
        );
        assert!(matches!(
            parse(json!([1, 2])),
            Err(ChannelError::UnsupportedValue(_))
        ));
    }

    #[test]
    fn test_missing_value_is_reported() {
        let result = GuestMessage::from_event(&json!({
            "isStreamlitMessage": true,
            "type": "streamlit:setComponentValue",
            "dataType": "json"
        }));
        assert!(matches!(result, Err(ChannelError::MissingField("value"))));
    }

    #[test]
    fn test_parse_set_component_value() {
        let msg = GuestMessage::from_event(&json!({
            "isStreamlitMessage": true,
            "type": "streamlit:setComponentValue",
            "dataType": "json",
            "value": {"selected": [1, 2]}
        }))
        .unwrap();
        assert_eq!(
            msg,
            Some(GuestMessage::SetComponentValue {
                data_type: DataType::Json,
                value: json!({"selected": [1, 2]}),
            })
        );
    }

    #[test]
    fn test_unknown_type_and_bad_data_type() {
        let unknown = GuestMessage::from_event(&json!({
            "isStreamlitMessage": true,
            "type": "streamlit:teleport"
        }));
        assert!(matches!(unknown, Err(ChannelError::UnknownMessageType(t)) if t == "streamlit:teleport"));

        let bad = GuestMessage::from_event(&json!({
            "isStreamlitMessage": true,
            "type": "streamlit:setComponentValue",
            "dataType": "xml",
            "value": "<a/>"
        }));
        assert!(matches!(bad, Err(ChannelError::UnsupportedValue(_))));
    }

    #[test]
    fn test_negative_height_rejected() {
        let result = GuestMessage::from_event(&json!({
            "isStreamlitMessage": true,
            "type": "streamlit:setFrameHeight",
            "height": -4
        }));
        assert!(matches!(result, Err(ChannelError::UnsupportedValue(_))));
    }

    #[test]
    fn test_render_envelope_is_flat() {
        let mut args = Map::new();
        args.insert("foo".to_string(), json!(1));
        let envelope = HostEnvelope::new(HostMessage::Render(RenderPayload {
            args,
            dfs: vec![],
            disabled: false,
        }));

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "isStreamlitMessage": true,
                "type": "streamlit:render",
                "args": {"foo": 1},
                "dfs": [],
                "disabled": false
            })
        );
    }

    #[test]
    fn test_guest_id_display() {
        assert_eq!(GuestId(7).to_string(), "guest-7");
    }
}
