//! # widget-relay
//!
//! State synchronization and custom-component messaging core for a reactive
//! data-app front-end. The backend streams render deltas; the core mounts
//! them, keeps every widget's value, sends user changes back upstream, and
//! talks to sandboxed third-party components across a frame boundary.
//!
//! ## Modules
//!
//! - [`widgets`]: widget values and the insertion-ordered state store
//! - [`sync`]: flush policy and the outbound `BackMsg` sink
//! - [`components`]: cross-frame protocol, readiness handshake, registry
//! - [`render`]: render deltas, staleness, layout, error cards
//! - [`session`]: per-session identity and usage counters
//! - [`app`]: the event loop wiring everything together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tokio::sync::mpsc;
//! use widget_relay::{App, AppEvent, Config};
//! use widget_relay::render::ForwardMsg;
//! use widget_relay::sync::ChannelSink;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (back_tx, _back_rx) = mpsc::unbounded_channel();
//!     let (frame_tx, _frame_rx) = mpsc::unbounded_channel();
//!     let (event_tx, event_rx) = mpsc::unbounded_channel();
//!
//!     let app = App::new(&Config::default(), ChannelSink::new(back_tx), frame_tx);
//!     let session = tokio::spawn(app.run(event_rx, std::future::pending()));
//!
//!     event_tx
//!         .send(AppEvent::Forward(ForwardMsg::ScriptStarted { run_id: "r1".into() }))
//!         .unwrap();
//!     drop(event_tx);
//!
//!     let summary = session.await.unwrap();
//!     println!("{} script runs", summary.usage.script_runs);
//! }
//! ```

pub mod app;
pub mod components;
pub mod config;
pub mod render;
pub mod session;
pub mod sync;
pub mod widgets;

// Re-export top-level types for convenience
pub use app::{App, AppEvent};

pub use components::{
    ChannelError, ComponentRegistry, ComponentSource, FrameMessage, GuestId, RegistryConfig,
};

pub use config::{generate_default_config, Config, ConfigError, ConfigSource, LoggingConfig};

pub use render::{ForwardMsg, RenderDispatcher, RenderError, RenderInstruction, RenderResult};

pub use session::{SessionContext, SessionSummary, UsageMetrics};

pub use sync::{BackMsg, BackMsgSink, ChannelSink, SyncError, WidgetStateManager, WidgetStates};

pub use widgets::{Source, WidgetState, WidgetStateStore, WidgetValue};
