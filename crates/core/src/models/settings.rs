use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::CoreError;

/// API key name for Alpha Vantage in `Settings::api_keys`.
pub const ALPHAVANTAGE_KEY: &str = "alphavantage";
/// API key name for Finnhub in `Settings::api_keys`.
pub const FINNHUB_KEY: &str = "finnhub";

/// Upper bound for any lookback setting (about a century of calendar days).
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

/// Runtime configuration for the engine.
///
/// Every field has a default, so a partial JSON file only needs to name what
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// API keys per provider. Keys: "alphavantage", "finnhub".
    pub api_keys: HashMap<String, String>,

    /// Display name of the benchmark used for relative performance and the chart overlay.
    pub benchmark_symbol: String,

    /// Symbols tried in order when resolving the benchmark series.
    pub benchmark_candidates: Vec<String>,

    /// Display name of the regional index overlay on the detail chart.
    pub regional_overlay_name: String,

    /// Symbols tried in order when resolving the regional overlay.
    pub regional_overlay_candidates: Vec<String>,

    /// Exchange suffix the symbol search is restricted to (e.g. ".ST").
    /// Empty disables the suffix filter.
    pub preferred_suffix: String,

    /// Calendar days of history requested for watchlist rows (enough for SMA200).
    pub watchlist_lookback_days: u32,

    /// Calendar days of history requested for the detail view (1Y/5Y/MAX charts).
    pub detail_lookback_days: u32,

    /// Fewer points than this and a provider's answer counts as a miss.
    pub min_viable_points: usize,

    /// Days of news / social text scored for sentiment.
    pub sentiment_window_days: u32,

    /// Maximum number of news texts scored per symbol.
    pub news_text_cap: usize,

    /// Symbols processed concurrently during a watchlist build.
    pub max_concurrency: usize,

    /// Maximum merged symbol-search results.
    pub search_result_limit: usize,

    /// Per-request timeout for provider HTTP calls.
    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_keys: HashMap::new(),
            benchmark_symbol: "SPY".to_string(),
            benchmark_candidates: vec!["SPY".to_string(), "^GSPC".to_string()],
            regional_overlay_name: "OMXS30".to_string(),
            regional_overlay_candidates: vec![
                "^OMXS30".to_string(),
                "OMXS30".to_string(),
                "OMXS30.ST".to_string(),
                "XACT-OMXS30.ST".to_string(),
            ],
            preferred_suffix: ".ST".to_string(),
            watchlist_lookback_days: 420,
            detail_lookback_days: 3650,
            min_viable_points: 20,
            sentiment_window_days: 30,
            news_text_cap: 80,
            max_concurrency: 8,
            search_result_limit: 12,
            http_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Defaults overlaid with environment variables:
    /// `ALPHAVANTAGE_API_KEY`, `FINNHUB_API_KEY`, `TICKER_LENS_BENCHMARK`,
    /// `TICKER_LENS_SUFFIX`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env(|name| std::env::var(name).ok());
        settings
    }

    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("invalid settings JSON: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Overlay values from a variable lookup (the process environment in production).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("ALPHAVANTAGE_API_KEY") {
            self.api_keys.insert(ALPHAVANTAGE_KEY.to_string(), key.trim().to_string());
        }
        if let Some(key) = non_empty("FINNHUB_API_KEY") {
            self.api_keys.insert(FINNHUB_KEY.to_string(), key.trim().to_string());
        }
        if let Some(bench) = non_empty("TICKER_LENS_BENCHMARK") {
            let bench = bench.trim().to_uppercase();
            self.benchmark_candidates.retain(|c| c != &bench);
            self.benchmark_candidates.insert(0, bench.clone());
            self.benchmark_symbol = bench;
        }
        if let Some(suffix) = lookup("TICKER_LENS_SUFFIX") {
            self.preferred_suffix = suffix.trim().to_uppercase();
        }
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.watchlist_lookback_days == 0 || self.detail_lookback_days == 0 {
            return Err(CoreError::Config("lookback days must be positive".into()));
        }
        if self.watchlist_lookback_days > MAX_LOOKBACK_DAYS
            || self.detail_lookback_days > MAX_LOOKBACK_DAYS
            || self.sentiment_window_days > MAX_LOOKBACK_DAYS
        {
            return Err(CoreError::Config(format!(
                "lookback days must not exceed {MAX_LOOKBACK_DAYS}"
            )));
        }
        // a change percentage needs two closes
        if self.min_viable_points < 2 {
            return Err(CoreError::Config("min_viable_points must be at least 2".into()));
        }
        if self.max_concurrency == 0 {
            return Err(CoreError::Config("max_concurrency must be at least 1".into()));
        }
        if self.benchmark_candidates.is_empty() {
            return Err(CoreError::Config(
                "at least one benchmark candidate is required".into(),
            ));
        }
        if !self.preferred_suffix.is_empty() && !self.preferred_suffix.starts_with('.') {
            return Err(CoreError::Config(format!(
                "preferred_suffix '{}' must start with '.'",
                self.preferred_suffix
            )));
        }
        Ok(())
    }

    pub fn has_key(&self, provider: &str) -> bool {
        self.api_keys
            .get(provider)
            .is_some_and(|k| !k.trim().is_empty())
    }
}
