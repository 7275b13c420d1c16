//! Render Dispatcher
//!
//! Turns the backend's render deltas into a mounted element tree.
//!
//! ## Architecture
//!
//! - **Tree**: wire types for `ForwardMsg` and render instructions
//! - **Element**: the closed set of leaf kinds and their decoding
//! - **Staleness**: run lifecycle and per-element freshness
//! - **Layout**: column width distribution for horizontal blocks
//! - **Dispatcher**: applies deltas, prunes finished runs, lays out snapshots
//!
//! A leaf that fails to decode is replaced by an [`ErrorCard`]; its siblings
//! and later deltas are unaffected.

mod dispatcher;
mod element;
mod error;
mod layout;
mod staleness;
mod tree;

pub use dispatcher::{RenderContext, RenderDispatcher, RenderedNode, RenderedView};
pub use element::{
    Alert, AlertKind, Button, Chart, ChartKind, Checkbox, Choice, ComponentInstanceElement,
    Element, MultiChoice, NumberFormat, NumberInput, Slider, TableData, TextBody, TextInput,
};
pub use error::{parse_json_text, ErrorCard, RenderError, RenderResult};
pub use layout::{distribute_widths, ColumnPolicy};
pub use staleness::{staleness, RunState, Staleness};
pub use tree::{
    Block, BlockLayout, ForwardMsg, Node, NodeKind, NodeMetadata, RenderInstruction,
    ScriptFinishedStatus,
};
