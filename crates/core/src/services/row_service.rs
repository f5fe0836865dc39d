use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::models::chart::{ChartRange, Overlay};
use crate::models::indicators::IndicatorSet;
use crate::models::price::{Quote, Series};
use crate::models::row::{StockDetail, StockRow, WatchlistReport};
use crate::models::sentiment::TextChannel;
use crate::models::settings::Settings;
use crate::providers::registry::ProviderRegistry;
use crate::providers::traits::TextQuery;

use super::chart_service;
use super::indicator_service;
use super::quote_service::QuoteService;
use super::resolver_service::{Resolution, ResolveRequest, SeriesResolver};
use super::sentiment_service::SentimentScorer;

/// Aggregated news and social sentiment for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SentimentPair {
    news: Option<f64>,
    social: Option<f64>,
}

/// Builds watchlist rows and detail views.
///
/// Per-symbol work never fails the batch. Each symbol settles on the most
/// complete rung it can reach: full series, then quote only, then omitted.
/// Cloning is cheap; clones share the registry, settings and lexicon.
#[derive(Clone)]
pub struct RowService {
    registry: Arc<ProviderRegistry>,
    settings: Arc<Settings>,
    scorer: SentimentScorer,
}

impl RowService {
    pub fn new(registry: Arc<ProviderRegistry>, settings: Arc<Settings>, scorer: SentimentScorer) -> Self {
        Self {
            registry,
            settings,
            scorer,
        }
    }

    /// Rows for `symbols`, in input order.
    ///
    /// The benchmark is resolved once up front. Symbols are then processed
    /// concurrently, at most `max_concurrency` at a time. A symbol whose task
    /// panics is omitted like one with no data at all.
    pub async fn build_watchlist_rows(&self, symbols: &[String]) -> WatchlistReport {
        let as_of = chrono::Utc::now().date_naive();
        let lookback = self.settings.watchlist_lookback_days;

        let benchmark = self
            .resolve_first(&self.settings.benchmark_candidates, lookback)
            .await;
        let benchmark_symbol = benchmark.as_ref().map(|s| s.symbol.clone());
        let benchmark_closes: Arc<Vec<f64>> = Arc::new(benchmark.map(|s| s.closes()).unwrap_or_default());

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));
        let handles = symbols.iter().map(|symbol| {
            let service = self.clone();
            let benchmark_closes = Arc::clone(&benchmark_closes);
            let semaphore = Arc::clone(&semaphore);
            let symbol = symbol.trim().to_uppercase();
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                if symbol.is_empty() {
                    return None;
                }
                service.build_row(&symbol, &benchmark_closes).await
            })
        });

        let settled = futures::future::join_all(handles).await;
        let rows: Vec<StockRow> = settled
            .into_iter()
            .zip(symbols)
            .filter_map(|(result, symbol)| match result {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(symbol = %symbol, error = %e, "row task aborted");
                    None
                }
            })
            .collect();

        let live_count = rows.iter().filter(|r| r.live).count();
        tracing::info!(
            live = live_count,
            degraded = rows.len() - live_count,
            total = symbols.len(),
            "watchlist built"
        );

        WatchlistReport {
            rows,
            live_count,
            total_count: symbols.len(),
            benchmark: benchmark_symbol,
            as_of,
        }
    }

    /// Detail view with the full chart.
    pub async fn build_detail(&self, symbol: &str) -> StockDetail {
        self.build_detail_range(symbol, ChartRange::Max).await
    }

    /// Detail view whose chart is limited to `range`.
    ///
    /// Primary series, benchmark, regional overlay and news sentiment are
    /// fetched concurrently. Social sentiment follows resolution so a search
    /// match's company name can widen the query. Overlays are best-effort: a
    /// failed one is just left out of the chart.
    pub async fn build_detail_range(&self, symbol: &str, range: ChartRange) -> StockDetail {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return StockDetail::default();
        }
        let lookback = self.settings.detail_lookback_days;
        let resolver = self.resolver();
        let request = ResolveRequest::new(&symbol, self.settings.min_viable_points, lookback).with_volume();

        let news_query = self.text_query(&symbol, None);
        let (resolution, benchmark, regional, news) = tokio::join!(
            resolver.resolve_with(&request),
            self.resolve_first(&self.settings.benchmark_candidates, lookback),
            self.resolve_first(&self.settings.regional_overlay_candidates, lookback),
            self.channel_sentiment(TextChannel::News, &news_query),
        );
        let name_hint = resolution.as_ref().ok().and_then(Resolution::matched_name);
        let sentiment = SentimentPair {
            news,
            social: self.social_sentiment(&symbol, name_hint).await,
        };

        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(failure) => {
                tracing::warn!(symbol = %symbol, error = %failure, "detail degraded to quote");
                let row = self
                    .fetch_quote(&symbol)
                    .await
                    .map(|quote| quote_row(&symbol, quote, sentiment));
                return StockDetail { row, chart: None };
            }
        };

        let benchmark_closes = benchmark.as_ref().map(Series::closes).unwrap_or_default();
        let row = live_row(&symbol, &resolution, &benchmark_closes, sentiment);

        let mut overlays = Vec::new();
        if let Some(series) = benchmark {
            overlays.push(Overlay::new(self.settings.benchmark_symbol.clone(), series));
        }
        if let Some(series) = regional {
            overlays.push(Overlay::new(self.settings.regional_overlay_name.clone(), series));
        }
        let chart = chart_service::merge_range(&resolution.series, &overlays, range);

        StockDetail {
            row: Some(row),
            chart: (!chart.is_empty()).then_some(chart),
        }
    }

    async fn build_row(&self, symbol: &str, benchmark_closes: &[f64]) -> Option<StockRow> {
        let resolver = self.resolver();
        let request = ResolveRequest::new(
            symbol,
            self.settings.min_viable_points,
            self.settings.watchlist_lookback_days,
        );

        let news_query = self.text_query(symbol, None);
        let (resolution, news) = tokio::join!(
            resolver.resolve_with(&request),
            self.channel_sentiment(TextChannel::News, &news_query),
        );
        let name_hint = resolution.as_ref().ok().and_then(Resolution::matched_name);
        let sentiment = SentimentPair {
            news,
            social: self.social_sentiment(symbol, name_hint).await,
        };
        match resolution {
            Ok(resolution) => Some(live_row(symbol, &resolution, benchmark_closes, sentiment)),
            Err(failure) => {
                tracing::warn!(symbol, error = %failure, "row degraded to quote");
                let row = self
                    .fetch_quote(symbol)
                    .await
                    .map(|quote| quote_row(symbol, quote, sentiment));
                if row.is_none() {
                    tracing::warn!(symbol, "symbol omitted: no series and no quote");
                }
                row
            }
        }
    }

    fn resolver(&self) -> SeriesResolver<'_> {
        SeriesResolver::new(&self.registry, self.settings.preferred_suffix.clone())
    }

    async fn fetch_quote(&self, symbol: &str) -> Option<Quote> {
        match QuoteService::new(&self.registry).fetch_quote(symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::debug!(symbol, error = %e, "quote fallback failed");
                None
            }
        }
    }

    /// First candidate that resolves to a viable series. Candidates are tried
    /// as given, never through symbol search.
    async fn resolve_first(&self, candidates: &[String], lookback_days: u32) -> Option<Series> {
        let resolver = self.resolver();
        for candidate in candidates {
            let request = ResolveRequest::new(candidate, self.settings.min_viable_points, lookback_days).direct_only();
            match resolver.resolve_with(&request).await {
                Ok(resolution) => return Some(resolution.series),
                Err(failure) => tracing::debug!(candidate = %candidate, error = %failure, "overlay candidate failed"),
            }
        }
        tracing::warn!(candidates = ?candidates, "no overlay candidate resolved");
        None
    }

    fn text_query(&self, symbol: &str, name_hint: Option<&str>) -> TextQuery {
        let query = TextQuery::new(symbol, self.settings.sentiment_window_days);
        match name_hint {
            Some(name) => query.with_name_hint(name),
            None => query,
        }
    }

    /// Social sentiment, with the company name from a search match widening
    /// text searches.
    async fn social_sentiment(&self, symbol: &str, name_hint: Option<&str>) -> Option<f64> {
        self.channel_sentiment(TextChannel::Social, &self.text_query(symbol, name_hint))
            .await
    }

    /// Sentiment from the channel's sources, in registration order. A
    /// source's upstream score wins over its text; otherwise the first
    /// non-empty corpus is scored.
    ///
    /// `None` when no source answered; `Some(0.0)` when sources answered
    /// but had nothing to say.
    async fn channel_sentiment(&self, channel: TextChannel, query: &TextQuery) -> Option<f64> {
        let mut answered = false;
        for source in self.registry.text_sources_for(channel) {
            match source.fetch_precomputed_score(query).await {
                Ok(Some(score)) if score.is_finite() => {
                    tracing::debug!(source = %source.name(), symbol = %query.symbol, score, "upstream score");
                    return Some(score.clamp(-1.0, 1.0));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(source = %source.name(), symbol = %query.symbol, error = %e, "upstream score failed");
                    continue;
                }
            }
            match source.fetch_text_corpus(query).await {
                Ok(texts) if !texts.is_empty() => {
                    tracing::debug!(source = %source.name(), symbol = %query.symbol, texts = texts.len(), "corpus fetched");
                    return Some(self.scorer.aggregate(&texts));
                }
                Ok(_) => answered = true,
                Err(e) => {
                    tracing::debug!(source = %source.name(), symbol = %query.symbol, error = %e, "text source failed");
                }
            }
        }
        answered.then_some(0.0)
    }
}

fn live_row(symbol: &str, resolution: &Resolution, benchmark_closes: &[f64], sentiment: SentimentPair) -> StockRow {
    let series = &resolution.series;
    let closes = series.closes();
    let last = closes.last().copied().unwrap_or(0.0);

    StockRow {
        symbol: symbol.to_string(),
        name: resolution.matched_name().unwrap_or(symbol).to_string(),
        last,
        change_pct: series.last_change_pct().unwrap_or(0.0),
        indicators: indicator_service::compute_indicators(&closes, benchmark_closes),
        news_sent: sentiment.news,
        reddit_sent: sentiment.social,
        live: true,
        source: series.provider.clone(),
        resolved_symbol: series.symbol.clone(),
    }
}

fn quote_row(symbol: &str, quote: Quote, sentiment: SentimentPair) -> StockRow {
    StockRow {
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        last: quote.last,
        change_pct: quote.change_pct,
        indicators: IndicatorSet::unavailable(),
        news_sent: sentiment.news,
        reddit_sent: sentiment.social,
        live: false,
        source: quote.provider,
        resolved_symbol: quote.symbol,
    }
}
