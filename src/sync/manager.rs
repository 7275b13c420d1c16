//! Widget State Manager
//!
//! The mutation API used by widgets and custom components. Every setter
//! writes the store, then flushes synchronously when the change came from the
//! user.

use std::collections::HashSet;

use super::{BackMsgSink, StateSynchronizer};
use crate::widgets::{Source, WidgetStateStore, WidgetValue};

/// What a setter did after writing the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Value kept locally, nothing sent
    Held,
    /// A flush was attempted
    Flushed,
}

/// Widget state store plus the policy deciding when to flush it
pub struct WidgetStateManager<S> {
    store: WidgetStateStore,
    synchronizer: StateSynchronizer<S>,
}

impl<S: BackMsgSink> WidgetStateManager<S> {
    pub fn new(sink: S) -> Self {
        Self {
            store: WidgetStateStore::new(),
            synchronizer: StateSynchronizer::new(sink),
        }
    }

    /// Write a value and flush if `source.from_ui`
    pub fn set_value(
        &mut self,
        id: impl Into<String>,
        value: WidgetValue,
        source: Source,
    ) -> SyncAction {
        self.store.set_value(id, value);
        self.maybe_flush(source)
    }

    pub fn set_bool_value(&mut self, id: impl Into<String>, value: bool, source: Source) -> SyncAction {
        self.set_value(id, WidgetValue::Bool(value), source)
    }

    pub fn set_int_value(&mut self, id: impl Into<String>, value: i64, source: Source) -> SyncAction {
        self.set_value(id, WidgetValue::Int(value), source)
    }

    pub fn set_double_value(&mut self, id: impl Into<String>, value: f64, source: Source) -> SyncAction {
        self.set_value(id, WidgetValue::Double(value), source)
    }

    pub fn set_string_value(
        &mut self,
        id: impl Into<String>,
        value: impl Into<String>,
        source: Source,
    ) -> SyncAction {
        self.set_value(id, WidgetValue::String(value.into()), source)
    }

    pub fn set_string_array_value(
        &mut self,
        id: impl Into<String>,
        value: Vec<String>,
        source: Source,
    ) -> SyncAction {
        self.set_value(id, WidgetValue::StringArray(value), source)
    }

    pub fn set_int_array_value(
        &mut self,
        id: impl Into<String>,
        value: Vec<i64>,
        source: Source,
    ) -> SyncAction {
        self.set_value(id, WidgetValue::IntArray(value), source)
    }

    pub fn set_double_array_value(
        &mut self,
        id: impl Into<String>,
        value: Vec<f64>,
        source: Source,
    ) -> SyncAction {
        self.set_value(id, WidgetValue::DoubleArray(value), source)
    }

    pub fn set_bytes_value(&mut self, id: impl Into<String>, value: Vec<u8>, source: Source) -> SyncAction {
        self.set_value(id, WidgetValue::Bytes(value), source)
    }

    /// Store already-serialized JSON text
    pub fn set_json_value(
        &mut self,
        id: impl Into<String>,
        value: impl Into<String>,
        source: Source,
    ) -> SyncAction {
        self.set_value(id, WidgetValue::Json(value.into()), source)
    }

    pub fn set_arrow_value(&mut self, id: impl Into<String>, value: Vec<u8>, source: Source) -> SyncAction {
        self.set_value(id, WidgetValue::Arrow(value), source)
    }

    /// Fire a one-shot trigger
    ///
    /// The trigger is stored, flushed when user-originated, then removed so
    /// the next flush does not replay it.
    pub fn set_trigger_value(&mut self, id: impl Into<String>, source: Source) -> SyncAction {
        let id = id.into();
        self.store.set_value(id.clone(), WidgetValue::Trigger(true));
        let action = self.maybe_flush(source);
        self.store.remove(&id);
        action
    }

    /// Send the current state upstream regardless of source
    pub fn flush(&mut self) -> SyncAction {
        if let Err(e) = self.synchronizer.flush(&self.store) {
            tracing::warn!(error = %e, "Widget state flush failed, not retrying");
        }
        SyncAction::Flushed
    }

    /// Forget widgets that left the tree
    pub fn clean(&mut self, active_ids: &HashSet<String>) {
        self.store.clean(active_ids);
    }

    pub fn store(&self) -> &WidgetStateStore {
        &self.store
    }

    pub fn flush_count(&self) -> u64 {
        self.synchronizer.flush_count()
    }

    fn maybe_flush(&mut self, source: Source) -> SyncAction {
        if source.from_ui {
            self.flush()
        } else {
            SyncAction::Held
        }
    }
}
