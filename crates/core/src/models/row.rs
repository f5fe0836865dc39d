use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::chart::ChartPayload;
use super::indicators::IndicatorSet;

/// One watchlist line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRow {
    /// Symbol as requested (uppercased).
    pub symbol: String,

    /// Display name; falls back to the symbol when no provider supplied one.
    pub name: String,

    pub last: f64,

    /// Day-over-day change in percent.
    pub change_pct: f64,

    #[serde(flatten)]
    pub indicators: IndicatorSet,

    /// Aggregated news sentiment in [-1, 1]; `None` when no news feed answered.
    pub news_sent: Option<f64>,

    /// Aggregated social sentiment in [-1, 1]; `None` when no social feed answered.
    pub reddit_sent: Option<f64>,

    /// True only when a full price series (not just a quote) was resolved.
    pub live: bool,

    /// Provider that produced the price data.
    pub source: String,

    /// Symbol variant the provider answered for (may differ from `symbol`).
    pub resolved_symbol: String,
}

impl StockRow {
    /// `Some(true)` when the last price is above its 50-day average.
    pub fn above_sma50(&self) -> Option<bool> {
        self.indicators.sma50.map(|sma| self.last > sma)
    }

    /// `Some(true)` when the last price is above its 200-day average.
    pub fn above_sma200(&self) -> Option<bool> {
        self.indicators.sma200.map(|sma| self.last > sma)
    }

    pub fn has_sentiment(&self) -> bool {
        self.news_sent.is_some() || self.reddit_sent.is_some()
    }
}

/// Result of a watchlist build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistReport {
    /// Rows in input order; symbols that failed completely are omitted.
    pub rows: Vec<StockRow>,

    /// Rows backed by a fully resolved series.
    pub live_count: usize,

    /// Number of symbols requested.
    pub total_count: usize,

    /// Benchmark the relative-performance metrics were computed against.
    pub benchmark: Option<String>,

    pub as_of: NaiveDate,
}

impl WatchlistReport {
    /// Rows shown with quote-only data.
    pub fn degraded_count(&self) -> usize {
        self.rows.len().saturating_sub(self.live_count)
    }

    /// Symbols dropped because not even a quote could be found.
    pub fn omitted_count(&self) -> usize {
        self.total_count.saturating_sub(self.rows.len())
    }

    /// True when some requested symbol is degraded or missing.
    pub fn is_partial(&self) -> bool {
        self.live_count < self.total_count
    }
}

/// Single-symbol detail view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StockDetail {
    pub row: Option<StockRow>,
    pub chart: Option<ChartPayload>,
}

/// Which credentials and feeds are configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub alphavantage_key_present: bool,
    pub finnhub_key_present: bool,
    pub providers: Vec<String>,
    pub text_sources: Vec<String>,
}
