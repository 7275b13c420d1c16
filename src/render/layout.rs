//! Column width distribution for horizontal blocks

/// Width policy for columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPolicy {
    /// Container widths below this get the minimum column floor
    pub breakpoint: u32,
    pub min_column_width: u32,
}

impl Default for ColumnPolicy {
    fn default() -> Self {
        Self {
            breakpoint: 640,
            min_column_width: 128,
        }
    }
}

/// Split `available` pixels among columns by weight
///
/// Each column gets `w / W` of the width, truncated; the last column takes
/// what is left so the widths sum to `available`. Below the breakpoint no
/// column is narrower than the floor, which may push the sum past
/// `available` (columns wrap).
///
/// Non-finite or negative weights count as zero. If every weight is zero the
/// columns share equally.
pub fn distribute_widths(weights: &[f64], available: u32, policy: &ColumnPolicy) -> Vec<u32> {
    if weights.is_empty() {
        return Vec::new();
    }

    let weights: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    let total: f64 = weights.iter().sum();
    let (weights, total) = if total > 0.0 {
        (weights, total)
    } else {
        (vec![1.0; weights.len()], weights.len() as f64)
    };

    let floor = if available < policy.breakpoint {
        policy.min_column_width.min(available)
    } else {
        0
    };

    let last = weights.len() - 1;
    let mut widths = Vec::with_capacity(weights.len());
    let mut used: u32 = 0;
    for weight in &weights[..last] {
        let share = (f64::from(available) * weight / total) as u32;
        let width = share.max(floor);
        used = used.saturating_add(width);
        widths.push(width);
    }
    widths.push(available.saturating_sub(used).max(floor));
    widths
}
