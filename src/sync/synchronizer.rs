//! State Synchronizer
//!
//! Serializes the whole store and passes it to the sink.

use super::{BackMsgSink, SyncError, WidgetStates};
use crate::widgets::WidgetStateStore;

/// Flushes widget state to the backend connection
pub struct StateSynchronizer<S> {
    sink: S,
    flush_count: u64,
}

impl<S: BackMsgSink> StateSynchronizer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            flush_count: 0,
        }
    }

    /// Send every stored entry, in insertion order
    ///
    /// Calling this twice without a mutation in between sends the same
    /// payload twice.
    pub fn flush(&mut self, store: &WidgetStateStore) -> Result<(), SyncError> {
        let states = WidgetStates {
            widgets: store.snapshot(),
        };
        self.flush_count += 1;

        tracing::debug!(
            widgets = states.widgets.len(),
            flush = self.flush_count,
            "Flushing widget states"
        );

        self.sink.send_rerun_back_msg(states)
    }

    /// Number of flushes attempted so far
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
