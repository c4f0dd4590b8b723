//! Pellet size distribution over fixed size bins.

use pellet_core::coercion::safe_number;
use pellet_core::formatting::bin_label;
use pellet_core::models::SizeBins;
use serde_json::Value;

use crate::chart::{ChartData, Series};

/// Name of the single series emitted by the size distribution chart.
pub const PELLETS_SERIES: &str = "Pellets";

/// Counts per bin, parallel to their `"{lo}-{hi}"` labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Number of values that landed in a bin.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn into_chart(self) -> ChartData {
        ChartData {
            categories: self.labels,
            series: vec![Series::from_values(
                PELLETS_SERIES,
                self.counts.into_iter().map(|c| c as f64),
            )],
            colors: Vec::new(),
        }
    }
}

/// Index of the bin holding `value`, if any.
///
/// Boundaries belong to the bin they open (`value == bounds[i]` → bin `i`).
/// Values at or above the top boundary go to the last bin; values below the
/// first boundary have no bin.
pub fn bin_index(bins: &SizeBins, value: f64) -> Option<usize> {
    let bounds = bins.bounds();
    bounds
        .windows(2)
        .position(|w| value >= w[0] && value < w[1])
        .or_else(|| (value >= bounds[bounds.len() - 1]).then(|| bins.len() - 1))
}

/// Histogram `values` over `bins`.
///
/// Non-numeric, non-finite, zero and negative entries are invalid
/// measurements and are dropped before binning. Returns `None` when nothing
/// valid remains, which callers render as an empty state rather than a flat
/// chart.
pub fn build_histogram(values: &[Value], bins: &SizeBins) -> Option<Histogram> {
    let valid: Vec<f64> = values
        .iter()
        .filter_map(safe_number)
        .filter(|v| *v > 0.0)
        .collect();

    if valid.is_empty() {
        tracing::debug!(input = values.len(), "no valid sizes for histogram");
        return None;
    }

    let mut counts = vec![0u64; bins.len()];
    for value in valid {
        if let Some(i) = bin_index(bins, value) {
            counts[i] += 1;
        }
    }

    let labels = bins
        .bounds()
        .windows(2)
        .map(|w| bin_label(w[0], w[1]))
        .collect();

    Some(Histogram { labels, counts })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
