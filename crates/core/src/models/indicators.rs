use serde::{Deserialize, Serialize};

/// A computed metric, or `None` when its required window exceeds the
/// available history. `Some(0.0)` always means a real computed zero.
pub type Metric = Option<f64>;

/// Technical metrics for one series.
///
/// Serialized with `null` for unavailable metrics so consumers can dash
/// them out instead of showing a fabricated number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub sma50: Metric,
    pub sma200: Metric,
    /// RSI(14) at the last close.
    pub rsi14: Metric,
    /// Percent distance of the last close from the trailing 52-week high (≤ 0).
    pub dist_from_high_pct: Metric,
    /// Return over ~6 months minus the benchmark's, in percentage points.
    pub rel_vs_benchmark_6m: Metric,
    /// Return over ~12 months minus the benchmark's, in percentage points.
    pub rel_vs_benchmark_12m: Metric,
}

impl IndicatorSet {
    /// All metrics unavailable (quote-only rows).
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Number of metrics that were actually computed.
    pub fn available_count(&self) -> usize {
        [
            self.sma50,
            self.sma200,
            self.rsi14,
            self.dist_from_high_pct,
            self.rel_vs_benchmark_6m,
            self.rel_vs_benchmark_12m,
        ]
        .iter()
        .filter(|m| m.is_some())
        .count()
    }
}
