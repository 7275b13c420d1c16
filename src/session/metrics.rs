//! Usage counters

use serde::Serialize;
use std::collections::BTreeMap;

/// Counts gathered while rendering
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageMetrics {
    /// Element type → mounts
    pub elements: BTreeMap<String, u64>,
    /// Custom component name → renders
    pub components: BTreeMap<String, u64>,
    pub deltas_applied: u64,
    pub render_errors: u64,
    pub script_runs: u64,
}

impl UsageMetrics {
    pub fn record_element(&mut self, element_type: &str) {
        *self.elements.entry(element_type.to_string()).or_insert(0) += 1;
    }

    pub fn record_component(&mut self, component_name: &str) {
        *self.components.entry(component_name.to_string()).or_insert(0) += 1;
    }

    pub fn total_elements(&self) -> u64 {
        self.elements.values().sum()
    }
}
