use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day of a symbol's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    /// Per-bar volume, when the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            volume: None,
        }
    }

    pub fn with_volume(date: NaiveDate, close: f64, volume: f64) -> Self {
        Self {
            date,
            close,
            volume: Some(volume),
        }
    }
}

/// A symbol's daily price history as produced by one provider.
///
/// **Invariant**: `points` is strictly ascending by date with no duplicate
/// dates and only finite, positive closes. `Series::new` enforces this, so a
/// `Series` handed to the analytics layer never needs re-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// The symbol variant that actually produced the data (may differ from
    /// the one requested, e.g. after a suffix search).
    pub symbol: String,

    /// Name of the provider that produced the data.
    pub provider: String,

    points: Vec<PricePoint>,
}

impl Series {
    /// Build a series from raw provider points: drops unusable closes,
    /// sorts by date and keeps the last point reported for any duplicate date.
    pub fn new(
        symbol: impl Into<String>,
        provider: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> Self {
        points.retain(|p| p.close.is_finite() && p.close > 0.0);
        for p in &mut points {
            if p.volume.is_some_and(|v| !v.is_finite() || v < 0.0) {
                p.volume = None;
            }
        }
        // Stable sort keeps provider order among equal dates; the last one wins.
        points.sort_by_key(|p| p.date);
        let mut deduped: Vec<PricePoint> = Vec::with_capacity(points.len());
        for p in points {
            match deduped.last_mut() {
                Some(last) if last.date == p.date => *last = p,
                _ => deduped.push(p),
            }
        }
        Self {
            symbol: symbol.into(),
            provider: provider.into(),
            points: deduped,
        }
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Closing prices in ascending date order.
    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// True when at least one point carries a volume figure.
    pub fn has_volume(&self) -> bool {
        self.points.iter().any(|p| p.volume.is_some())
    }

    /// Day-over-day percentage change of the last close, if there are two points.
    pub fn last_change_pct(&self) -> Option<f64> {
        let n = self.points.len();
        if n < 2 {
            return None;
        }
        let prev = self.points[n - 2].close;
        let last = self.points[n - 1].close;
        Some((last - prev) / prev * 100.0)
    }

    /// Points with `date >= from`, found by binary search.
    pub fn since(&self, from: NaiveDate) -> &[PricePoint] {
        let start = self
            .points
            .binary_search_by_key(&from, |p| p.date)
            .unwrap_or_else(|pos| pos);
        &self.points[start..]
    }

    /// Close on an exact date, if the series has that date.
    pub fn close_on(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|idx| self.points[idx].close)
    }
}

/// Lightweight latest-price snapshot used when no full series resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub last: f64,
    /// Day-over-day change in percent (e.g. `-1.25` for -1.25%).
    pub change_pct: f64,
    pub provider: String,
}

/// One hit from a provider's symbol search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl SymbolMatch {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            name: name.into(),
            region: None,
            currency: None,
        }
    }

    /// Whether the symbol carries the given venue suffix (e.g. ".ST"), case-insensitive.
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.symbol.to_uppercase().ends_with(&suffix.to_uppercase())
    }
}

/// How much history a series request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesWindow {
    /// Calendar days back from `end`.
    pub lookback_days: u32,
    /// Last calendar day to include.
    pub end: NaiveDate,
}

impl SeriesWindow {
    pub fn new(lookback_days: u32, end: NaiveDate) -> Self {
        Self { lookback_days, end }
    }

    /// Window ending today (UTC).
    pub fn ending_today(lookback_days: u32) -> Self {
        Self::new(lookback_days, chrono::Utc::now().date_naive())
    }

    /// First calendar day inside the window. Saturates at the earliest
    /// representable date.
    pub fn start(&self) -> NaiveDate {
        self.end
            .checked_sub_signed(chrono::Duration::days(i64::from(self.lookback_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start() && date <= self.end
    }
}

/// Strip a venue suffix such as ".ST" or "-B" from a ticker: `ERIC-B.ST` → `ERIC`.
pub fn symbol_stem(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    let without_venue = match upper.rfind('.') {
        Some(idx) if idx > 0 && upper[idx + 1..].chars().all(|c| c.is_ascii_alphabetic()) => {
            &upper[..idx]
        }
        _ => upper.as_str(),
    };
    match without_venue.rfind('-') {
        Some(idx)
            if idx > 0
                && !without_venue[idx + 1..].is_empty()
                && without_venue[idx + 1..].chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            without_venue[..idx].to_string()
        }
        _ => without_venue.to_string(),
    }
}

/// Whether a ticker is venue-suffixed (e.g. `VOLV-B.ST`, `SHOP.TO`).
pub fn is_venue_suffixed(symbol: &str) -> bool {
    let trimmed = symbol.trim();
    match trimmed.rfind('.') {
        Some(idx) => {
            idx > 0
                && idx + 1 < trimmed.len()
                && trimmed[idx + 1..].chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}
