use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote, Series, SeriesWindow, SymbolMatch};
use super::traits::{MarketDataProvider, ProviderCapabilities};

const BASE_URL: &str = "https://www.alphavantage.co/query";
const NAME: &str = "Alpha Vantage";

/// `compact` output covers roughly the last 100 trading days.
const COMPACT_LOOKBACK_DAYS: u32 = 100;

/// Alpha Vantage API provider: the primary series source.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (settings key "alphavantage").
/// - **Endpoints**: `TIME_SERIES_DAILY`, `GLOBAL_QUOTE`, `SYMBOL_SEARCH`.
///
/// Rate-limit and bad-key responses come back as HTTP 200 with a `Note`,
/// `Information` or `Error Message` field; those map to `ProviderUnavailable`.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }

    async fn get_body(&self, params: &[(&str, &str)]) -> Result<String, CoreError> {
        let resp = self
            .client
            .get(BASE_URL)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::unavailable(NAME, format!("HTTP {status}")));
        }
        Ok(resp.text().await?)
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize, Default)]
struct Envelope {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: Option<String>,
}

#[derive(Deserialize)]
struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

#[derive(Deserialize)]
struct SymbolSearchResponse {
    #[serde(rename = "bestMatches", default)]
    best_matches: Vec<SearchMatch>,
}

#[derive(Deserialize)]
struct SearchMatch {
    #[serde(rename = "1. symbol", default)]
    symbol: String,
    #[serde(rename = "2. name", default)]
    name: String,
    #[serde(rename = "4. region")]
    region: Option<String>,
    #[serde(rename = "8. currency")]
    currency: Option<String>,
}

// ── Payload parsing ─────────────────────────────────────────────────

/// Reject the "200 OK but actually an error" payloads.
fn check_envelope(body: &str) -> Result<(), CoreError> {
    let env: Envelope = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("not a JSON object: {e}")))?;
    match env.note.or(env.information).or(env.error_message) {
        Some(message) => Err(CoreError::unavailable(NAME, message)),
        None => Ok(()),
    }
}

/// Parse a `TIME_SERIES_DAILY` body into a series restricted to `window`.
pub fn parse_daily_series(
    symbol: &str,
    body: &str,
    window: SeriesWindow,
) -> Result<Series, CoreError> {
    check_envelope(body)?;
    let resp: TimeSeriesResponse = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("time series for {symbol}: {e}")))?;
    let raw = resp.time_series.ok_or_else(|| CoreError::no_data(NAME, symbol))?;

    let points: Vec<PricePoint> = raw
        .iter()
        .filter_map(|(date_str, data)| {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
            if !window.contains(date) {
                return None;
            }
            let close: f64 = data.close.trim().parse().ok()?;
            let volume = data.volume.as_deref().and_then(|v| v.trim().parse::<f64>().ok());
            Some(PricePoint { date, close, volume })
        })
        .collect();

    let series = Series::new(symbol.to_uppercase(), NAME, points);
    if series.is_empty() {
        return Err(CoreError::no_data(NAME, symbol));
    }
    Ok(series)
}

/// Parse a `GLOBAL_QUOTE` body. A zero or missing price means no data.
pub fn parse_global_quote(symbol: &str, body: &str) -> Result<Quote, CoreError> {
    check_envelope(body)?;
    let resp: GlobalQuoteResponse = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("quote for {symbol}: {e}")))?;
    let quote = resp.global_quote.ok_or_else(|| CoreError::no_data(NAME, symbol))?;

    let last: f64 = quote
        .price
        .as_deref()
        .and_then(|p| p.trim().parse().ok())
        .filter(|p: &f64| p.is_finite() && *p > 0.0)
        .ok_or_else(|| CoreError::no_data(NAME, symbol))?;
    let change_pct = quote
        .change_percent
        .as_deref()
        .map(|s| s.trim().trim_end_matches('%'))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|c| c.is_finite())
        .unwrap_or(0.0);

    Ok(Quote {
        symbol: symbol.to_uppercase(),
        last,
        change_pct,
        provider: NAME.to_string(),
    })
}

/// Parse a `SYMBOL_SEARCH` body. Matches without a symbol are dropped.
pub fn parse_symbol_search(body: &str) -> Result<Vec<SymbolMatch>, CoreError> {
    check_envelope(body)?;
    let resp: SymbolSearchResponse = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("symbol search: {e}")))?;
    Ok(resp
        .best_matches
        .into_iter()
        .filter(|m| !m.symbol.trim().is_empty())
        .map(|m| SymbolMatch {
            symbol: m.symbol.trim().to_uppercase(),
            name: m.name.trim().to_string(),
            region: m.region,
            currency: m.currency,
        })
        .collect())
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            volume: true,
            venue_suffixes: false,
            search: true,
        }
    }

    async fn fetch_series(&self, symbol: &str, window: SeriesWindow) -> Result<Series, CoreError> {
        let size = if window.lookback_days <= COMPACT_LOOKBACK_DAYS {
            "compact"
        } else {
            "full"
        };
        let upper = symbol.to_uppercase();
        let body = self
            .get_body(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", upper.as_str()),
                ("outputsize", size),
            ])
            .await?;
        parse_daily_series(&upper, &body, window)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let upper = symbol.to_uppercase();
        let body = self
            .get_body(&[("function", "GLOBAL_QUOTE"), ("symbol", upper.as_str())])
            .await?;
        parse_global_quote(&upper, &body)
    }

    async fn search_symbol(&self, query: &str) -> Result<Vec<SymbolMatch>, CoreError> {
        let body = self
            .get_body(&[("function", "SYMBOL_SEARCH"), ("keywords", query.trim())])
            .await?;
        parse_symbol_search(&body)
    }
}
