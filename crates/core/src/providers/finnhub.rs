use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote, Series, SeriesWindow, SymbolMatch};
use crate::models::sentiment::TextChannel;
use super::traits::{MarketDataProvider, ProviderCapabilities, TextQuery, TextSource};

const BASE_URL: &str = "https://finnhub.io/api/v1";
const NAME: &str = "Finnhub";

/// Finnhub API provider: the secondary series source and the news feed.
///
/// - **Requires**: API key (settings key "finnhub").
/// - **Coverage**: global equities including exchange-suffixed tickers,
///   daily candles with volume.
/// - **Endpoints**: `/stock/candle`, `/quote`, `/search`, `/company-news`.
///
/// Reddit social scores from `/stock/social-sentiment` are served by
/// [`FinnhubSocialSentiment`].
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
    news_text_cap: usize,
}

impl FinnhubProvider {
    pub fn new(api_key: String, timeout: Duration, news_text_cap: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            news_text_cap,
        }
    }

    async fn get_body(&self, path: &str, params: &[(&str, String)]) -> Result<String, CoreError> {
        let resp = self
            .client
            .get(format!("{BASE_URL}{path}"))
            .query(params)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(CoreError::unavailable(NAME, "rate limit exceeded"));
        }
        if !status.is_success() {
            return Err(CoreError::unavailable(NAME, format!("HTTP {status}")));
        }
        Ok(resp.text().await?)
    }
}

// ── Finnhub API response types ──────────────────────────────────────

#[derive(Deserialize)]
struct CandleResponse {
    #[serde(default)]
    s: String,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    t: Vec<i64>,
    #[serde(default)]
    v: Vec<f64>,
}

#[derive(Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    c: f64,
    dp: Option<f64>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct SocialSentimentResponse {
    #[serde(default)]
    reddit: Vec<SocialEntry>,
}

#[derive(Deserialize)]
struct SocialEntry {
    score: Option<f64>,
}

#[derive(Deserialize)]
struct NewsItem {
    headline: Option<String>,
    summary: Option<String>,
}

// ── Payload parsing ─────────────────────────────────────────────────

fn timestamp_to_naive_date(ts: i64) -> Option<chrono::NaiveDate> {
    chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
}

/// Parse a `/stock/candle` body. Arrays of unequal length are truncated to
/// the shortest of `c` and `t`; a short `v` leaves later bars without volume.
pub fn parse_candles(symbol: &str, body: &str, window: SeriesWindow) -> Result<Series, CoreError> {
    let resp: CandleResponse = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("candles for {symbol}: {e}")))?;
    if resp.s != "ok" {
        return Err(CoreError::no_data(NAME, symbol));
    }

    let points: Vec<PricePoint> = resp
        .c
        .iter()
        .zip(resp.t.iter())
        .enumerate()
        .filter_map(|(i, (&close, &ts))| {
            let date = timestamp_to_naive_date(ts)?;
            if !window.contains(date) {
                return None;
            }
            Some(PricePoint {
                date,
                close,
                volume: resp.v.get(i).copied(),
            })
        })
        .collect();

    let series = Series::new(symbol.to_uppercase(), NAME, points);
    if series.is_empty() {
        return Err(CoreError::no_data(NAME, symbol));
    }
    Ok(series)
}

/// Parse a `/quote` body. Finnhub answers unknown symbols with `c: 0`.
pub fn parse_quote(symbol: &str, body: &str) -> Result<Quote, CoreError> {
    let resp: QuoteResponse = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("quote for {symbol}: {e}")))?;
    if !resp.c.is_finite() || resp.c <= 0.0 {
        return Err(CoreError::no_data(NAME, symbol));
    }
    Ok(Quote {
        symbol: symbol.to_uppercase(),
        last: resp.c,
        change_pct: resp.dp.filter(|d| d.is_finite()).unwrap_or(0.0),
        provider: NAME.to_string(),
    })
}

/// Parse a `/search` body.
pub fn parse_search(body: &str) -> Result<Vec<SymbolMatch>, CoreError> {
    let resp: SearchResponse = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("symbol search: {e}")))?;
    Ok(resp
        .result
        .into_iter()
        .filter(|r| !r.symbol.trim().is_empty())
        .map(|r| SymbolMatch::new(r.symbol.trim(), r.description.trim()))
        .collect())
}

/// Parse a `/company-news` body into headline and summary texts, capped at `cap`.
pub fn parse_company_news(body: &str, cap: usize) -> Result<Vec<String>, CoreError> {
    let items: Vec<NewsItem> = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("company news: {e}")))?;
    Ok(items
        .into_iter()
        .flat_map(|item| [item.headline, item.summary])
        .flatten()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .take(cap)
        .collect())
}

/// Parse a `/stock/social-sentiment` body into one score: the mean of the
/// reddit entries' `score`, rounded to 2 decimals and clamped to [-1, 1].
/// Entries without a score count as 0. No entries means no score.
pub fn parse_social_sentiment(body: &str) -> Result<Option<f64>, CoreError> {
    let resp: SocialSentimentResponse = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("social sentiment: {e}")))?;
    let scores: Vec<f64> = resp
        .reddit
        .iter()
        .map(|entry| entry.score.unwrap_or(0.0))
        .filter(|score| score.is_finite())
        .collect();
    if scores.is_empty() {
        return Ok(None);
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    Ok(Some(((mean * 100.0).round() / 100.0).clamp(-1.0, 1.0)))
}

fn date_range(window_days: u32) -> [(&'static str, String); 2] {
    let window = SeriesWindow::ending_today(window_days);
    [
        ("from", window.start().format("%Y-%m-%d").to_string()),
        ("to", window.end.format("%Y-%m-%d").to_string()),
    ]
}

#[async_trait]
impl MarketDataProvider for FinnhubProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            volume: true,
            venue_suffixes: true,
            search: true,
        }
    }

    async fn fetch_series(&self, symbol: &str, window: SeriesWindow) -> Result<Series, CoreError> {
        let upper = symbol.trim().to_uppercase();
        let to = window
            .end
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let from = window
            .start()
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or_default();
        let body = self
            .get_body(
                "/stock/candle",
                &[
                    ("symbol", upper.clone()),
                    ("resolution", "D".to_string()),
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                ],
            )
            .await?;
        parse_candles(&upper, &body, window)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let upper = symbol.trim().to_uppercase();
        let body = self.get_body("/quote", &[("symbol", upper.clone())]).await?;
        parse_quote(&upper, &body)
    }

    async fn search_symbol(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let body = self
            .get_body("/search", &[("q", query.trim().to_string())])
            .await?;
        parse_search(&body)
    }
}

#[async_trait]
impl TextSource for FinnhubProvider {
    fn name(&self) -> &str {
        "Finnhub News"
    }

    fn channel(&self) -> TextChannel {
        TextChannel::News
    }

    async fn fetch_text_corpus(&self, query: &TextQuery) -> Result<Vec<String>, CoreError> {
        let [from, to] = date_range(query.window_days);
        let body = self
            .get_body(
                "/company-news",
                &[("symbol", query.symbol.to_uppercase()), from, to],
            )
            .await?;
        parse_company_news(&body, self.news_text_cap)
    }
}

/// Finnhub's upstream reddit scores, tried before raw social text.
pub struct FinnhubSocialSentiment {
    inner: FinnhubProvider,
}

impl FinnhubSocialSentiment {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            inner: FinnhubProvider::new(api_key, timeout, 0),
        }
    }
}

#[async_trait]
impl TextSource for FinnhubSocialSentiment {
    fn name(&self) -> &str {
        "Finnhub Social"
    }

    fn channel(&self) -> TextChannel {
        TextChannel::Social
    }

    /// Scores only; no raw text.
    async fn fetch_text_corpus(&self, _query: &TextQuery) -> Result<Vec<String>, CoreError> {
        Ok(Vec::new())
    }

    async fn fetch_precomputed_score(&self, query: &TextQuery) -> Result<Option<f64>, CoreError> {
        let [from, to] = date_range(query.window_days);
        let body = self
            .inner
            .get_body(
                "/stock/social-sentiment",
                &[("symbol", query.symbol.to_uppercase()), from, to],
            )
            .await?;
        parse_social_sentiment(&body)
    }
}
