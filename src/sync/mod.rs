//! State Synchronization
//!
//! Decides when accumulated widget state is handed to the backend connection.
//!
//! ## Architecture
//!
//! - **StateSynchronizer**: serializes the store and calls the sink
//! - **WidgetStateManager**: store + synchronizer behind typed setters; a
//!   user-originated change flushes before the setter returns
//! - **BackMsgSink**: the transport collaborator (a tokio channel in the
//!   binary, anything else in embedders)
//!
//! There is no retry and no change detection. A failed send is logged and
//! dropped; the next user change flushes the full state again.

mod manager;
mod synchronizer;

pub use manager::{SyncAction, WidgetStateManager};
pub use synchronizer::StateSynchronizer;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::widgets::WidgetState;

/// Ordered widget states, as sent upstream
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WidgetStates {
    pub widgets: Vec<WidgetState>,
}

/// Messages sent from the front-end to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackMsg {
    /// Ask the backend to rerun with the given widget states
    RerunScript { widget_states: WidgetStates },
}

/// Transport collaborator for outbound widget state
pub trait BackMsgSink {
    fn send_rerun_back_msg(&self, states: WidgetStates) -> Result<(), SyncError>;
}

/// Sink that forwards back messages into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<BackMsg>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<BackMsg>) -> Self {
        Self { sender }
    }
}

impl BackMsgSink for ChannelSink {
    fn send_rerun_back_msg(&self, states: WidgetStates) -> Result<(), SyncError> {
        self.sender
            .send(BackMsg::RerunScript {
                widget_states: states,
            })
            .map_err(|_| SyncError::ChannelClosed)
    }
}

/// Errors raised while handing state to the transport
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Backend channel closed")]
    ChannelClosed,
}
