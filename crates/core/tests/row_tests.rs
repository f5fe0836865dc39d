// ═══════════════════════════════════════════════════════════════════
// Row Tests - watchlist degradation ladder, detail view, facade
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::Duration;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use ticker_lens_core::errors::CoreError;
use ticker_lens_core::models::chart::ChartRange;
use ticker_lens_core::models::price::{PricePoint, Quote, Series, SeriesWindow, SymbolMatch};
use ticker_lens_core::models::sentiment::TextChannel;
use ticker_lens_core::models::settings::Settings;
use ticker_lens_core::providers::registry::ProviderRegistry;
use ticker_lens_core::providers::traits::{MarketDataProvider, ProviderCapabilities, TextQuery, TextSource};
use ticker_lens_core::TickerLens;

// ═══════════════════════════════════════════════════════════════════
// Test Helpers - Mock Market and Text Feeds
// ═══════════════════════════════════════════════════════════════════

/// Scripted series (symbol → point count) and quotes (symbol → price).
/// Panics on any symbol listed in `panics`.
#[derive(Default)]
struct MockMarket {
    name: String,
    series: HashMap<String, usize>,
    quotes: HashMap<String, f64>,
    hits: Vec<SymbolMatch>,
    panics: HashSet<String>,
}

impl MockMarket {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn series(mut self, symbol: &str, points: usize) -> Self {
        self.series.insert(symbol.to_string(), points);
        self
    }

    fn quote(mut self, symbol: &str, last: f64) -> Self {
        self.quotes.insert(symbol.to_string(), last);
        self
    }

    fn search(mut self, hits: Vec<SymbolMatch>) -> Self {
        self.hits = hits;
        self
    }

    fn panics_on(mut self, symbol: &str) -> Self {
        self.panics.insert(symbol.to_string());
        self
    }
}

#[async_trait]
impl MarketDataProvider for MockMarket {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            volume: true,
            venue_suffixes: true,
            search: !self.hits.is_empty(),
        }
    }

    async fn fetch_series(&self, symbol: &str, window: SeriesWindow) -> Result<Series, CoreError> {
        if self.panics.contains(symbol) {
            panic!("provider blew up on {symbol}");
        }
        let n = *self.series.get(symbol).ok_or_else(|| CoreError::NoData {
            provider: self.name.clone(),
            symbol: symbol.to_string(),
        })?;
        let points = (0..n)
            .map(|i| {
                PricePoint::with_volume(
                    window.end - Duration::days((n - 1 - i) as i64),
                    100.0 + i as f64,
                    1_000.0,
                )
            })
            .collect();
        Ok(Series::new(symbol, &self.name, points))
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        match self.quotes.get(symbol) {
            Some(&last) => Ok(Quote {
                symbol: symbol.to_string(),
                last,
                change_pct: -1.5,
                provider: self.name.clone(),
            }),
            None => Err(CoreError::ProviderUnavailable {
                provider: self.name.clone(),
                message: "quote endpoint down".into(),
            }),
        }
    }

    async fn search_symbol(&self, _query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        Ok(self.hits.clone())
    }
}

/// Serves the same corpus for every symbol, or fails.
struct MockFeed {
    name: &'static str,
    channel: TextChannel,
    texts: Option<Vec<&'static str>>,
}

#[async_trait]
impl TextSource for MockFeed {
    fn name(&self) -> &str {
        self.name
    }

    fn channel(&self) -> TextChannel {
        self.channel
    }

    async fn fetch_text_corpus(&self, _query: &TextQuery) -> Result<Vec<String>, CoreError> {
        match &self.texts {
            Some(texts) => Ok(texts.iter().map(|t| t.to_string()).collect()),
            None => Err(CoreError::Network("feed timed out".into())),
        }
    }
}

/// Social source with an upstream score and no text of its own.
/// Records the name hint of every query it sees.
struct ScoredFeed {
    score: Option<f64>,
    hints: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScoredFeed {
    fn new(score: Option<f64>) -> Self {
        Self {
            score,
            hints: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl TextSource for ScoredFeed {
    fn name(&self) -> &str {
        "Scored"
    }

    fn channel(&self) -> TextChannel {
        TextChannel::Social
    }

    async fn fetch_text_corpus(&self, _query: &TextQuery) -> Result<Vec<String>, CoreError> {
        Ok(Vec::new())
    }

    async fn fetch_precomputed_score(&self, query: &TextQuery) -> Result<Option<f64>, CoreError> {
        self.hints.lock().unwrap().push(query.name_hint.clone());
        Ok(self.score)
    }
}

fn lens(registry: ProviderRegistry) -> TickerLens {
    TickerLens::with_registry(registry, Settings::default()).unwrap()
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// SPY benchmark, two healthy symbols, one quote-only symbol.
fn market() -> MockMarket {
    MockMarket::new("Primary")
        .series("SPY", 300)
        .series("AAPL", 300)
        .series("MSFT", 300)
        .series("^OMXS30", 300)
        .quote("QONLY", 42.0)
}

// ═══════════════════════════════════════════════════════════════════
// build_watchlist_rows
// ═══════════════════════════════════════════════════════════════════

mod watchlist {
    use super::*;

    #[tokio::test]
    async fn failing_symbol_does_not_affect_siblings() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        let lens = lens(registry);

        let report = lens
            .build_watchlist_rows(&symbols(&["AAPL", "BAD", "QONLY", "MSFT"]))
            .await;

        assert_eq!(report.total_count, 4);
        assert_eq!(report.live_count, 2);
        assert_eq!(report.degraded_count(), 1);
        assert_eq!(report.omitted_count(), 1);
        assert!(report.is_partial());

        let order: Vec<&str> = report.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["AAPL", "QONLY", "MSFT"]);

        for row in [&report.rows[0], &report.rows[2]] {
            assert!(row.live);
            assert_eq!(row.source, "Primary");
            assert!(row.indicators.sma200.is_some());
            assert!(row.indicators.rel_vs_benchmark_6m.is_some());
            assert_eq!(row.last, 399.0);
        }
    }

    #[tokio::test]
    async fn quote_only_row_has_no_indicators() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        let report = lens(registry).build_watchlist_rows(&symbols(&["QONLY"])).await;

        let row = &report.rows[0];
        assert!(!row.live);
        assert_eq!(row.last, 42.0);
        assert_eq!(row.change_pct, -1.5);
        assert_eq!(row.indicators.available_count(), 0);
        assert_eq!(row.above_sma50(), None);
    }

    #[tokio::test]
    async fn all_providers_failing_omits_every_symbol() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockMarket::new("Primary")));
        registry.register(Box::new(MockMarket::new("Secondary")));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL", "MSFT"])).await;

        assert!(report.rows.is_empty());
        assert_eq!(report.total_count, 2);
        assert_eq!(report.live_count, 0);
        assert_eq!(report.benchmark, None);
    }

    #[tokio::test]
    async fn missing_benchmark_keeps_row_live() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockMarket::new("Primary").series("AAPL", 300)));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL"])).await;

        let row = &report.rows[0];
        assert!(row.live);
        assert!(row.indicators.sma50.is_some());
        assert!(row.indicators.rel_vs_benchmark_6m.is_none());
        assert_eq!(report.benchmark, None);
    }

    #[tokio::test]
    async fn benchmark_is_never_a_search_hit() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(
            MockMarket::new("Primary")
                .series("AAPL", 300)
                .series("SPYR.ST", 300)
                .search(vec![SymbolMatch::new("SPYR.ST", "Spyr AB")]),
        ));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL"])).await;

        assert_eq!(report.benchmark, None);
        assert!(report.rows[0].indicators.rel_vs_benchmark_6m.is_none());
    }

    #[tokio::test]
    async fn secondary_provider_fills_in() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockMarket::new("Primary").series("SPY", 300).series("AAPL", 5)));
        registry.register(Box::new(MockMarket::new("Secondary").series("AAPL", 300)));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL"])).await;

        assert_eq!(report.rows[0].source, "Secondary");
        assert_eq!(report.benchmark.as_deref(), Some("SPY"));
    }

    #[tokio::test]
    async fn search_match_is_reported_as_resolved_symbol() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(
            MockMarket::new("Primary")
                .series("SPY", 300)
                .series("VOLV-B.ST", 300)
                .search(vec![SymbolMatch::new("VOLV-B.ST", "Volvo B")]),
        ));
        let report = lens(registry).build_watchlist_rows(&symbols(&["volv"])).await;

        let row = &report.rows[0];
        assert_eq!(row.symbol, "VOLV");
        assert_eq!(row.resolved_symbol, "VOLV-B.ST");
        assert_eq!(row.name, "Volvo B");
        assert!(row.live);
    }

    #[tokio::test]
    async fn panicking_provider_only_drops_its_symbol() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market().panics_on("BOOM")));
        let report = lens(registry)
            .build_watchlist_rows(&symbols(&["AAPL", "BOOM", "MSFT"]))
            .await;

        assert_eq!(report.total_count, 3);
        assert_eq!(report.live_count, 2);
        let order: Vec<&str> = report.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["AAPL", "MSFT"]);
    }

    #[tokio::test]
    async fn blank_symbols_are_omitted() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        let report = lens(registry).build_watchlist_rows(&symbols(&["  ", "AAPL"])).await;
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.total_count, 2);
    }

    #[tokio::test]
    async fn empty_input_gives_empty_report() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        let report = lens(registry).build_watchlist_rows(&[]).await;
        assert!(report.rows.is_empty());
        assert_eq!(report.total_count, 0);
        assert!(!report.is_partial());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Sentiment wiring
// ═══════════════════════════════════════════════════════════════════

mod sentiment {
    use super::*;

    #[tokio::test]
    async fn news_and_social_are_scored_separately() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        registry.register_text_source(Box::new(MockFeed {
            name: "News",
            channel: TextChannel::News,
            texts: Some(vec!["record profit growth", "shares surge on strong results"]),
        }));
        registry.register_text_source(Box::new(MockFeed {
            name: "Forum",
            channel: TextChannel::Social,
            texts: Some(vec!["fraud probe lawsuit"]),
        }));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL"])).await;

        let row = &report.rows[0];
        assert!(row.news_sent.unwrap() > 0.0);
        assert!(row.reddit_sent.unwrap() < 0.0);
    }

    #[tokio::test]
    async fn failed_feed_is_unavailable_not_neutral() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        registry.register_text_source(Box::new(MockFeed {
            name: "News",
            channel: TextChannel::News,
            texts: None,
        }));
        registry.register_text_source(Box::new(MockFeed {
            name: "Forum",
            channel: TextChannel::Social,
            texts: Some(vec![]),
        }));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL"])).await;

        let row = &report.rows[0];
        assert_eq!(row.news_sent, None);
        assert_eq!(row.reddit_sent, Some(0.0));
        assert!(row.live);
    }

    #[tokio::test]
    async fn social_falls_back_to_next_source() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        registry.register_text_source(Box::new(MockFeed {
            name: "Forum A",
            channel: TextChannel::Social,
            texts: None,
        }));
        registry.register_text_source(Box::new(MockFeed {
            name: "Forum B",
            channel: TextChannel::Social,
            texts: Some(vec!["stock will surge and beat estimates"]),
        }));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL"])).await;
        assert!(report.rows[0].reddit_sent.unwrap() > 0.0);
        assert_eq!(report.rows[0].news_sent, None);
    }

    #[tokio::test]
    async fn upstream_social_score_wins_over_text() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        registry.register_text_source(Box::new(ScoredFeed::new(Some(0.42))));
        registry.register_text_source(Box::new(MockFeed {
            name: "Forum",
            channel: TextChannel::Social,
            texts: Some(vec!["fraud probe lawsuit"]),
        }));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL"])).await;
        assert_eq!(report.rows[0].reddit_sent, Some(0.42));
    }

    #[tokio::test]
    async fn missing_upstream_score_falls_back_to_text() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        registry.register_text_source(Box::new(ScoredFeed::new(None)));
        registry.register_text_source(Box::new(MockFeed {
            name: "Forum",
            channel: TextChannel::Social,
            texts: Some(vec!["fraud probe lawsuit"]),
        }));
        let report = lens(registry).build_watchlist_rows(&symbols(&["AAPL"])).await;
        assert!(report.rows[0].reddit_sent.unwrap() < 0.0);
    }

    #[tokio::test]
    async fn search_match_name_widens_social_query() {
        let feed = ScoredFeed::new(None);
        let hints = Arc::clone(&feed.hints);
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(
            MockMarket::new("Primary")
                .series("SPY", 300)
                .series("AAPL", 300)
                .series("VOLV-B.ST", 300)
                .search(vec![SymbolMatch::new("VOLV-B.ST", "Volvo B")]),
        ));
        registry.register_text_source(Box::new(feed));

        lens(registry).build_watchlist_rows(&symbols(&["VOLV", "AAPL"])).await;

        let mut seen = hints.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, vec![None, Some("Volvo B".to_string())]);
    }

    #[tokio::test]
    async fn quote_only_row_keeps_sentiment() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        registry.register_text_source(Box::new(MockFeed {
            name: "News",
            channel: TextChannel::News,
            texts: Some(vec!["profit warning"]),
        }));
        let report = lens(registry).build_watchlist_rows(&symbols(&["QONLY"])).await;

        let row = &report.rows[0];
        assert!(!row.live);
        assert!(row.news_sent.is_some());
        assert!(row.has_sentiment());
    }
}

// ═══════════════════════════════════════════════════════════════════
// build_detail
// ═══════════════════════════════════════════════════════════════════

mod detail {
    use super::*;

    #[tokio::test]
    async fn chart_includes_benchmark_and_regional_overlay() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        let detail = lens(registry).build_detail("AAPL").await;

        let row = detail.row.unwrap();
        assert!(row.live);
        let chart = detail.chart.unwrap();
        assert_eq!(chart.points.len(), 300);
        assert_eq!(chart.points[0].stock, 100.0);
        assert_eq!(chart.overlays_included, vec!["SPY".to_string(), "OMXS30".to_string()]);
        assert_eq!(chart.points[0].volume, Some(1_000.0));
    }

    #[tokio::test]
    async fn failed_overlay_does_not_block_chart() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockMarket::new("Primary").series("SPY", 300).series("AAPL", 300)));
        let detail = lens(registry).build_detail("AAPL").await;

        let chart = detail.chart.unwrap();
        assert_eq!(chart.overlays_included, vec!["SPY".to_string()]);
        assert!(detail.row.is_some());
    }

    #[tokio::test]
    async fn range_limits_chart() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        let detail = lens(registry).build_detail_range("AAPL", ChartRange::OneMonth).await;

        let chart = detail.chart.unwrap();
        assert_eq!(chart.points.len(), 32);
        assert_eq!(chart.points[0].stock, 100.0);
        // indicators still use the full history
        assert!(detail.row.unwrap().indicators.sma200.is_some());
    }

    #[tokio::test]
    async fn quote_only_detail_has_no_chart() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        let detail = lens(registry).build_detail("QONLY").await;

        assert!(!detail.row.unwrap().live);
        assert!(detail.chart.is_none());
    }

    #[tokio::test]
    async fn unknown_symbol_gives_empty_detail() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(market()));
        let detail = lens(registry).build_detail("NOPE").await;
        assert!(detail.row.is_none());
        assert!(detail.chart.is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// TickerLens facade
// ═══════════════════════════════════════════════════════════════════

mod facade {
    use super::*;

    #[tokio::test]
    async fn search_merges_and_dedupes() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockMarket::new("A").search(vec![
            SymbolMatch::new("VOLV-B.ST", "Volvo B"),
            SymbolMatch::new("VOLV-A.ST", "Volvo A"),
        ])));
        registry.register(Box::new(MockMarket::new("B").search(vec![
            SymbolMatch::new("volv-b.st", "AB Volvo ser. B"),
            SymbolMatch::new("VLVLY", "Volvo ADR"),
        ])));
        registry.register(Box::new(MockMarket::new("C")));

        let hits = lens(registry).search_symbols("volvo").await.unwrap();
        let found: Vec<&str> = hits.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(found, vec!["VOLV-B.ST", "VOLV-A.ST", "VLVLY"]);
        assert_eq!(hits[0].name, "Volvo B");
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let many: Vec<SymbolMatch> = (0..30).map(|i| SymbolMatch::new(format!("S{i}"), "")).collect();
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockMarket::new("A").search(many)));
        let hits = lens(registry).search_symbols("s").await.unwrap();
        assert_eq!(hits.len(), Settings::default().search_result_limit);
    }

    #[tokio::test]
    async fn blank_search_is_rejected() {
        let lens = lens(ProviderRegistry::new());
        assert!(matches!(
            lens.search_symbols("   ").await,
            Err(CoreError::ValidationError(_))
        ));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = Settings {
            max_concurrency: 0,
            ..Settings::default()
        };
        assert!(TickerLens::with_registry(ProviderRegistry::new(), settings).is_err());
    }

    #[test]
    fn diagnostics_list_registered_feeds() {
        let mut registry = ProviderRegistry::new();
        registry.register(Box::new(MockMarket::new("Primary")));
        registry.register_text_source(Box::new(MockFeed {
            name: "News",
            channel: TextChannel::News,
            texts: None,
        }));
        let mut settings = Settings::default();
        settings.api_keys.insert("finnhub".into(), "abc".into());

        let diag = TickerLens::with_registry(registry, settings).unwrap().diagnostics();
        assert!(!diag.alphavantage_key_present);
        assert!(diag.finnhub_key_present);
        assert_eq!(diag.providers, vec!["Primary".to_string()]);
        assert_eq!(diag.text_sources, vec!["News (News)".to_string()]);
    }

    #[test]
    fn pure_entry_points() {
        let lens = lens(ProviderRegistry::new());
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64).collect();
        let set = lens.compute_indicators(&closes, &[]);
        assert!(set.sma50.is_some());
        assert!(set.sma200.is_none());

        assert_eq!(lens.score_sentiment::<&str>(&[]), 0.0);
        assert!(lens.score_sentiment(&["record profit growth"]) > 0.0);
    }
}
