//! Descriptive statistics that skip missing values.
//!
//! `NaN` marks a missing measurement. Infinities are skipped as well, so a
//! range is always finite.

/// Range and centre of a pooled sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Number of finite values the statistics were computed from.
    pub count: usize,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

impl Summary {
    /// Compute min, median and max over the finite values.
    ///
    /// Returns `None` when every value is missing (or there are none).
    pub fn compute<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut present: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        if present.is_empty() {
            return None;
        }
        present.sort_by(f64::total_cmp);

        let count = present.len();
        Some(Summary {
            count,
            min: present[0],
            median: median_of_sorted(&present),
            max: present[count - 1],
        })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Median of an already sorted, non-empty slice.
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
