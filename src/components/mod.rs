//! Custom Components
//!
//! Typed messaging with third-party components embedded in sandboxed frames.
//!
//! ## Architecture
//!
//! - **Messages**: envelope parsing and the host/guest message enums
//! - **Instance**: per-component readiness state machine
//! - **Registry**: arena of instances keyed by [`GuestId`], component
//!   declarations, and inbound routing
//!
//! ## Protocol
//!
//! ```text
//! host                                   guest
//!  │  (render buffered)                    │
//!  │ ◀──────── streamlit:componentReady ── │  {apiVersion: 1}
//!  │ ── streamlit:render ────────────────▶ │  {args, dfs, disabled}
//!  │ ◀──────── streamlit:setComponentValue │  {dataType, value}
//!  │ ◀──────── streamlit:setFrameHeight ── │  {height}
//! ```

mod error;
mod instance;
mod messages;
mod registry;

pub use error::ChannelError;
pub use instance::{ChannelState, ComponentInstance, FrameElement, InstanceView};
pub use messages::{
    ArgsDataframe, DataType, FrameMessage, GuestId, GuestMessage, HostEnvelope, HostMessage,
    RenderPayload, ScalarValue, ANY_ORIGIN, CURRENT_API_VERSION, PROTOCOL_FLAG,
};
pub use registry::{ComponentRegistry, ComponentSource, RegistryConfig};
