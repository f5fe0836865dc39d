use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::price::{Quote, Series, SeriesWindow, SymbolMatch};
use crate::models::sentiment::TextChannel;

/// What a market-data provider is good at. The resolver uses this to put
/// capable providers first for venue-suffixed tickers or volume requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Reports per-bar volume.
    pub volume: bool,
    /// Understands exchange-suffixed tickers such as `VOLV-B.ST`.
    pub venue_suffixes: bool,
    /// Implements `search_symbol`.
    pub search: bool,
}

/// Trait abstraction for market-data providers.
///
/// Each API (Alpha Vantage, Finnhub, Yahoo Finance) implements this trait.
/// Implementations own their payload schemas: anything they return has
/// already been validated, so the core never sees ambiguous shapes.
/// Timeouts, retries and caching belong to the implementation.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs, errors and row tags).
    fn name(&self) -> &str;

    fn capabilities(&self) -> ProviderCapabilities;

    /// Daily closes for `symbol` inside `window`, ascending.
    async fn fetch_series(&self, symbol: &str, window: SeriesWindow) -> Result<Series, CoreError>;

    /// Latest price and day-over-day change.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError>;

    /// Symbols matching a free-text query, best first.
    async fn search_symbol(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let _ = query;
        Err(CoreError::Unsupported {
            provider: self.name().to_string(),
            operation: "symbol search".into(),
        })
    }
}

/// What a text source is asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    pub symbol: String,
    /// Company name, when known, to widen social searches.
    pub name_hint: Option<String>,
    pub window_days: u32,
}

impl TextQuery {
    pub fn new(symbol: impl Into<String>, window_days: u32) -> Self {
        Self {
            symbol: symbol.into(),
            name_hint: None,
            window_days,
        }
    }

    pub fn with_name_hint(mut self, name: impl Into<String>) -> Self {
        self.name_hint = Some(name.into());
        self
    }
}

/// A feed of news or social text for sentiment scoring.
#[async_trait]
pub trait TextSource: Send + Sync {
    fn name(&self) -> &str;

    fn channel(&self) -> TextChannel;

    /// Raw text units (headlines, summaries, post titles) for the query window.
    async fn fetch_text_corpus(&self, query: &TextQuery) -> Result<Vec<String>, CoreError>;

    /// A score in [-1, 1] the source computed upstream. `Ok(None)` means the
    /// source has no score for the query and the raw corpus should be used.
    async fn fetch_precomputed_score(&self, _query: &TextQuery) -> Result<Option<f64>, CoreError> {
        Ok(None)
    }
}
