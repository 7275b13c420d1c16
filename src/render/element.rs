//! Element descriptors
//!
//! The closed set of leaf kinds the dispatcher knows how to render. Leaves
//! arrive as JSON objects with a `type` tag; [`Element::decode`] maps the tag
//! onto a variant with one explicit fallback for unknown tags.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{RenderError, RenderResult};
use crate::components::ArgsDataframe;
use crate::widgets::{base64_bytes, WidgetValue};

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Error,
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub format: AlertKind,
    pub body: String,
}

/// Plain text, markdown source, or JSON source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

/// Arrow IPC table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Area,
    Bar,
    VegaLite,
    Plotly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub chart: ChartKind,
    #[serde(default)]
    pub figure: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkbox {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slider {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub step: Option<f64>,
    /// One value for a single thumb, two for a range
    pub default: Vec<f64>,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextInput {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub default: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    Int,
    #[default]
    Float,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberInput {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub format: NumberFormat,
    #[serde(default)]
    pub default: f64,
    #[serde(default)]
    pub disabled: bool,
}

/// Single choice among options (selectbox, radio)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub default: i64,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiChoice {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub default: Vec<i64>,
    #[serde(default)]
    pub disabled: bool,
}

/// A third-party component hosted in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstanceElement {
    /// Widget id; also the instance identity across renders
    pub id: String,
    pub component_name: String,
    /// Explicit asset URL; wins over the registry lookup
    #[serde(default)]
    pub url: Option<String>,
    /// Named arguments as serialized JSON text
    #[serde(default = "empty_json_object")]
    pub json_args: String,
    #[serde(default)]
    pub special_args: Vec<ArgsDataframe>,
    #[serde(default)]
    pub disabled: bool,
}

fn empty_json_object() -> String {
    "{}".to_string()
}

/// Every leaf kind the dispatcher renders
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Alert(Alert),
    Text(TextBody),
    Markdown(TextBody),
    Json(TextBody),
    Table(TableData),
    DataFrame(TableData),
    Chart(Chart),
    Button(Button),
    Checkbox(Checkbox),
    Slider(Slider),
    TextInput(TextInput),
    NumberInput(NumberInput),
    Selectbox(Choice),
    Radio(Choice),
    Multiselect(MultiChoice),
    ComponentInstance(ComponentInstanceElement),
    Empty,
}

impl Element {
    /// Decode a tagged leaf
    pub fn decode(raw: &Value) -> RenderResult<Self> {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or(RenderError::MissingType)?;

        let element = match kind {
            "alert" => Element::Alert(body(kind, raw)?),
            "text" => Element::Text(body(kind, raw)?),
            "markdown" => Element::Markdown(body(kind, raw)?),
            "json" => Element::Json(body(kind, raw)?),
            "table" => Element::Table(body(kind, raw)?),
            "dataframe" => Element::DataFrame(body(kind, raw)?),
            "chart" => Element::Chart(body(kind, raw)?),
            "button" => Element::Button(body(kind, raw)?),
            "checkbox" => Element::Checkbox(body(kind, raw)?),
            "slider" => Element::Slider(body(kind, raw)?),
            "text_input" => Element::TextInput(body(kind, raw)?),
            "number_input" => Element::NumberInput(body(kind, raw)?),
            "selectbox" => Element::Selectbox(body(kind, raw)?),
            "radio" => Element::Radio(body(kind, raw)?),
            "multiselect" => Element::Multiselect(body(kind, raw)?),
            "component_instance" => Element::ComponentInstance(body(kind, raw)?),
            "empty" => Element::Empty,
            unknown => return Err(RenderError::UnknownElementType(unknown.to_string())),
        };
        Ok(element)
    }

    /// Tag used for usage counters
    pub fn type_name(&self) -> &'static str {
        match self {
            Element::Alert(_) => "alert",
            Element::Text(_) => "text",
            Element::Markdown(_) => "markdown",
            Element::Json(_) => "json",
            Element::Table(_) => "table",
            Element::DataFrame(_) => "dataframe",
            Element::Chart(chart) => match chart.chart {
                ChartKind::Line => "line_chart",
                ChartKind::Area => "area_chart",
                ChartKind::Bar => "bar_chart",
                ChartKind::VegaLite => "vega_lite_chart",
                ChartKind::Plotly => "plotly_chart",
            },
            Element::Button(_) => "button",
            Element::Checkbox(_) => "checkbox",
            Element::Slider(_) => "slider",
            Element::TextInput(_) => "text_input",
            Element::NumberInput(_) => "number_input",
            Element::Selectbox(_) => "selectbox",
            Element::Radio(_) => "radio",
            Element::Multiselect(_) => "multiselect",
            Element::ComponentInstance(_) => "component_instance",
            Element::Empty => "empty",
        }
    }

    /// Widget id for elements that hold state
    pub fn widget_id(&self) -> Option<&str> {
        match self {
            Element::Button(w) => Some(&w.id),
            Element::Checkbox(w) => Some(&w.id),
            Element::Slider(w) => Some(&w.id),
            Element::TextInput(w) => Some(&w.id),
            Element::NumberInput(w) => Some(&w.id),
            Element::Selectbox(w) | Element::Radio(w) => Some(&w.id),
            Element::Multiselect(w) => Some(&w.id),
            Element::ComponentInstance(c) => Some(&c.id),
            Element::Alert(_)
            | Element::Text(_)
            | Element::Markdown(_)
            | Element::Json(_)
            | Element::Table(_)
            | Element::DataFrame(_)
            | Element::Chart(_)
            | Element::Empty => None,
        }
    }

    /// Value written to the store when the widget first mounts
    ///
    /// Buttons and components have no default: they only produce values on
    /// interaction.
    pub fn default_value(&self) -> Option<WidgetValue> {
        match self {
            Element::Checkbox(w) => Some(WidgetValue::Bool(w.default)),
            Element::Slider(w) => Some(WidgetValue::DoubleArray(w.default.clone())),
            Element::TextInput(w) => Some(WidgetValue::String(w.default.clone())),
            Element::NumberInput(w) => Some(match w.format {
                NumberFormat::Int => WidgetValue::Int(w.default as i64),
                NumberFormat::Float => WidgetValue::Double(w.default),
            }),
            Element::Selectbox(w) | Element::Radio(w) => Some(WidgetValue::Int(w.default)),
            Element::Multiselect(w) => Some(WidgetValue::IntArray(w.default.clone())),
            _ => None,
        }
    }
}

fn body<T: DeserializeOwned>(kind: &str, raw: &Value) -> RenderResult<T> {
    T::deserialize(raw).map_err(|e| RenderError::InvalidElement {
        kind: kind.to_string(),
        message: e.to_string(),
    })
}
