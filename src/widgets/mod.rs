//! Widget State
//!
//! Holds the current value of every mounted widget.
//!
//! - [`WidgetValue`]: tagged union over the supported value types
//! - [`WidgetStateStore`]: id → value map with typed accessors and `clean`
//! - [`Source`]: whether a change came from the user or from initialization

mod store;
mod value;

pub(crate) use value::base64_bytes;

pub use store::WidgetStateStore;
pub use value::{Source, ValueKind, WidgetState, WidgetValue};
