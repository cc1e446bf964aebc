//! Missing-value fill policy for price columns.
//!
//! Forward fill carries the last known value into later gaps. Backward fill then
//! covers leading gaps with the first known value. A column with no values at
//! all stays empty.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillPolicy {
    /// Backward-fill leading gaps after the forward pass.
    pub backward: bool,
}

impl Default for FillPolicy {
    fn default() -> Self {
        Self { backward: true }
    }
}

/// What one column looked like before and after filling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub forward_filled: usize,
    pub backward_filled: usize,
    pub still_missing: usize,
}

impl FillReport {
    pub fn filled(&self) -> usize {
        self.forward_filled + self.backward_filled
    }
}

impl FillPolicy {
    pub fn forward_only() -> Self {
        Self { backward: false }
    }

    pub fn apply(&self, values: &mut [Option<f64>]) -> FillReport {
        let forward_filled = forward_fill(values);
        let backward_filled = if self.backward {
            backward_fill(values)
        } else {
            0
        };
        FillReport {
            forward_filled,
            backward_filled,
            still_missing: missing_count(values),
        }
    }
}

/// Returns the number of slots filled.
pub fn forward_fill(values: &mut [Option<f64>]) -> usize {
    let mut last = None;
    let mut filled = 0;
    for v in values.iter_mut() {
        match v {
            Some(x) => last = Some(*x),
            None => {
                if last.is_some() {
                    *v = last;
                    filled += 1;
                }
            }
        }
    }
    filled
}

/// Returns the number of slots filled.
pub fn backward_fill(values: &mut [Option<f64>]) -> usize {
    let mut next = None;
    let mut filled = 0;
    for v in values.iter_mut().rev() {
        match v {
            Some(x) => next = Some(*x),
            None => {
                if next.is_some() {
                    *v = next;
                    filled += 1;
                }
            }
        }
    }
    filled
}

pub fn missing_count(values: &[Option<f64>]) -> usize {
    values.iter().filter(|v| v.is_none()).count()
}
