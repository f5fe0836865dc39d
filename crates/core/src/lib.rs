pub mod errors;
pub mod models;
pub mod providers;
pub mod services;

use std::sync::Arc;

use models::{
    chart::ChartRange,
    indicators::IndicatorSet,
    price::SymbolMatch,
    row::{Diagnostics, StockDetail, WatchlistReport},
    sentiment::Lexicon,
    settings::{Settings, ALPHAVANTAGE_KEY, FINNHUB_KEY},
};
use providers::registry::ProviderRegistry;
use services::{
    indicator_service, row_service::RowService, search_service::SearchService,
    sentiment_service::SentimentScorer,
};

use errors::CoreError;

/// Main entry point for the Ticker Lens core library.
/// Holds the provider registry, settings and sentiment lexicon.
#[must_use]
pub struct TickerLens {
    registry: Arc<ProviderRegistry>,
    settings: Arc<Settings>,
    scorer: SentimentScorer,
    rows: RowService,
}

impl std::fmt::Debug for TickerLens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickerLens")
            .field("providers", &self.registry.provider_names())
            .field("text_sources", &self.registry.text_source_names())
            .field("benchmark", &self.settings.benchmark_symbol)
            .field("lexicon_terms", &self.scorer.lexicon().len())
            .finish()
    }
}

impl TickerLens {
    /// Build with the default providers for `settings`.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        let registry = ProviderRegistry::new_with_defaults(&settings);
        Self::with_registry(registry, settings)
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self, CoreError> {
        Self::new(Settings::from_env())
    }

    /// Build around an explicit registry (custom or mock providers).
    pub fn with_registry(registry: ProviderRegistry, settings: Settings) -> Result<Self, CoreError> {
        Self::with_lexicon(registry, settings, Lexicon::builtin())
    }

    /// Like [`TickerLens::with_registry`], with a custom sentiment lexicon.
    pub fn with_lexicon(
        registry: ProviderRegistry,
        settings: Settings,
        lexicon: Arc<Lexicon>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        if registry.is_empty() {
            tracing::warn!("no market-data providers registered; every row will be omitted");
        }
        let registry = Arc::new(registry);
        let settings = Arc::new(settings);
        let scorer = SentimentScorer::new(lexicon);
        let rows = RowService::new(Arc::clone(&registry), Arc::clone(&settings), scorer.clone());
        Ok(Self {
            registry,
            settings,
            scorer,
            rows,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    // --- Pure computation ---

    /// Indicator set for ascending closes against a benchmark's closes.
    pub fn compute_indicators(&self, closes: &[f64], benchmark_closes: &[f64]) -> IndicatorSet {
        indicator_service::compute_indicators(closes, benchmark_closes)
    }

    /// Trimmed-mean sentiment of `texts` in [-1, 1]; 0 for no texts.
    pub fn score_sentiment<S: AsRef<str>>(&self, texts: &[S]) -> f64 {
        self.scorer.aggregate(texts)
    }

    // --- Orchestration ---

    /// One row per symbol that yielded at least a quote, with live/total counts.
    pub async fn build_watchlist_rows(&self, symbols: &[String]) -> WatchlistReport {
        self.rows.build_watchlist_rows(symbols).await
    }

    /// Row plus full-history chart for one symbol.
    pub async fn build_detail(&self, symbol: &str) -> StockDetail {
        self.rows.build_detail(symbol).await
    }

    /// Row plus chart limited to `range`.
    pub async fn build_detail_range(&self, symbol: &str, range: ChartRange) -> StockDetail {
        self.rows.build_detail_range(symbol, range).await
    }

    // --- Lookup ---

    /// Merged symbol search across all search-capable providers.
    pub async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        SearchService::new(&self.registry)
            .search(query, self.settings.search_result_limit)
            .await
    }

    /// Configured credentials and registered feeds.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            alphavantage_key_present: self.settings.has_key(ALPHAVANTAGE_KEY),
            finnhub_key_present: self.settings.has_key(FINNHUB_KEY),
            providers: self.registry.provider_names(),
            text_sources: self.registry.text_source_names(),
        }
    }
}
