use async_trait::async_trait;
use chrono::NaiveDate;
use time::OffsetDateTime;

use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote, Series, SeriesWindow};
use super::traits::{MarketDataProvider, ProviderCapabilities};

const NAME: &str = "Yahoo Finance";

/// Calendar days fetched to derive a quote from the last two daily bars.
const QUOTE_LOOKBACK_DAYS: u32 = 10;

/// Yahoo Finance provider: keyless last-resort series and quote source.
///
/// - **Free**: No API key required.
/// - **No strict rate limits** (unofficial public API).
/// - **Coverage**: Global equities, ETFs, indices (`^GSPC`, `^OMXS30`).
/// - **Data**: daily closes with volume.
///
/// Uses the `yahoo_finance_api` crate which wraps Yahoo Finance's public
/// endpoints. Symbol search is not offered through this adapter.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| CoreError::unavailable(NAME, format!("Failed to create connector: {e}")))?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let ts = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| CoreError::ValidationError(format!("Invalid date {date}")))?
            .and_utc()
            .timestamp();
        OffsetDateTime::from_unix_timestamp(ts)
            .map_err(|e| CoreError::ValidationError(format!("Invalid date {date}: {e}")))
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    async fn history(&self, symbol: &str, window: SeriesWindow) -> Result<Series, CoreError> {
        let start = Self::to_offset_datetime(window.start())?;
        // exclusive end, so add a day to include `window.end`
        let end = Self::to_offset_datetime(window.end + chrono::Duration::days(1))?;

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| {
                CoreError::unavailable(NAME, format!("Failed to fetch history for {symbol}: {e}"))
            })?;

        let quotes = resp
            .quotes()
            .map_err(|e| CoreError::parse(NAME, format!("Failed to parse quotes for {symbol}: {e}")))?;

        let points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp as i64)?;
                if !window.contains(date) {
                    return None;
                }
                Some(PricePoint {
                    date,
                    close: q.close,
                    volume: Some(q.volume as f64),
                })
            })
            .collect();

        let series = Series::new(symbol.to_uppercase(), NAME, points);
        if series.is_empty() {
            return Err(CoreError::no_data(NAME, symbol));
        }
        Ok(series)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            volume: true,
            venue_suffixes: true,
            search: false,
        }
    }

    async fn fetch_series(&self, symbol: &str, window: SeriesWindow) -> Result<Series, CoreError> {
        self.history(symbol.trim(), window).await
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let series = self
            .history(symbol.trim(), SeriesWindow::ending_today(QUOTE_LOOKBACK_DAYS))
            .await?;
        let last = series
            .last()
            .map(|p| p.close)
            .ok_or_else(|| CoreError::no_data(NAME, symbol))?;
        Ok(Quote {
            symbol: symbol.trim().to_uppercase(),
            last,
            change_pct: series.last_change_pct().unwrap_or(0.0),
            provider: NAME.to_string(),
        })
    }
}
