//! Widget State Store
//!
//! Authoritative current value per widget id. Entries keep the order in which
//! each id was first set; overwriting a value keeps its position.

use indexmap::IndexMap;
use std::collections::HashSet;

use super::value::{ValueKind, WidgetState, WidgetValue};

/// Current value of every widget, keyed by widget id
#[derive(Debug, Clone, Default)]
pub struct WidgetStateStore {
    states: IndexMap<String, WidgetValue>,
}

impl WidgetStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing whatever variant was there before
    pub fn set_value(&mut self, id: impl Into<String>, value: WidgetValue) {
        let id = id.into();
        tracing::trace!(widget_id = %id, kind = %value.kind(), "Widget value set");
        self.states.insert(id, value);
    }

    /// Raw access to the stored value, whatever its variant
    pub fn get_value(&self, id: &str) -> Option<&WidgetValue> {
        self.states.get(id)
    }

    /// Variant tag of the stored value
    pub fn kind_of(&self, id: &str) -> Option<ValueKind> {
        self.states.get(id).map(WidgetValue::kind)
    }

    pub fn get_bool_value(&self, id: &str) -> Option<bool> {
        match self.states.get(id)? {
            WidgetValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_int_value(&self, id: &str) -> Option<i64> {
        match self.states.get(id)? {
            WidgetValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_double_value(&self, id: &str) -> Option<f64> {
        match self.states.get(id)? {
            WidgetValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string_value(&self, id: &str) -> Option<&str> {
        match self.states.get(id)? {
            WidgetValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_string_array_value(&self, id: &str) -> Option<&[String]> {
        match self.states.get(id)? {
            WidgetValue::StringArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_int_array_value(&self, id: &str) -> Option<&[i64]> {
        match self.states.get(id)? {
            WidgetValue::IntArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_double_array_value(&self, id: &str) -> Option<&[f64]> {
        match self.states.get(id)? {
            WidgetValue::DoubleArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_bytes_value(&self, id: &str) -> Option<&[u8]> {
        match self.states.get(id)? {
            WidgetValue::Bytes(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_json_value(&self, id: &str) -> Option<&str> {
        match self.states.get(id)? {
            WidgetValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_arrow_value(&self, id: &str) -> Option<&[u8]> {
        match self.states.get(id)? {
            WidgetValue::Arrow(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_trigger_value(&self, id: &str) -> Option<bool> {
        match self.states.get(id)? {
            WidgetValue::Trigger(v) => Some(*v),
            _ => None,
        }
    }

    /// Remove a single entry
    pub fn remove(&mut self, id: &str) -> Option<WidgetValue> {
        self.states.shift_remove(id)
    }

    /// Drop every entry whose id is not in `active_ids`
    ///
    /// Called once per completed render cycle to forget widgets that are no
    /// longer part of the tree.
    pub fn clean(&mut self, active_ids: &HashSet<String>) {
        let before = self.states.len();
        self.states.retain(|id, _| active_ids.contains(id));

        let removed = before - self.states.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.states.len(), "Cleaned widget states");
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Every entry in insertion order, ready to be sent upstream
    pub fn snapshot(&self) -> Vec<WidgetState> {
        self.states
            .iter()
            .map(|(id, value)| WidgetState::new(id.clone(), value.clone()))
            .collect()
    }
}
