use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::errors::CoreError;
use crate::models::price::{symbol_stem, Series, SeriesWindow, SymbolMatch};
use crate::providers::registry::ProviderRegistry;
use crate::providers::traits::MarketDataProvider;

/// Parameters of one series resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub symbol: String,
    /// A provider answer with fewer points counts as a miss.
    pub min_viable_points: usize,
    pub max_lookback_days: u32,
    /// Put providers that report per-bar volume first.
    pub require_volume: bool,
    /// Retry through a suffix-restricted symbol search when direct attempts miss.
    pub search_fallback: bool,
    /// Last calendar day of the requested window.
    pub end: NaiveDate,
}

impl ResolveRequest {
    pub fn new(symbol: impl Into<String>, min_viable_points: usize, max_lookback_days: u32) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            min_viable_points,
            max_lookback_days,
            require_volume: false,
            search_fallback: true,
            end: chrono::Utc::now().date_naive(),
        }
    }

    pub fn with_volume(mut self) -> Self {
        self.require_volume = true;
        self
    }

    /// Only try the symbol as given. For well-known index and benchmark
    /// symbols, where a search hit would be a different instrument.
    pub fn direct_only(mut self) -> Self {
        self.search_fallback = false;
        self
    }

    pub fn ending(mut self, end: NaiveDate) -> Self {
        self.end = end;
        self
    }

    fn window(&self) -> SeriesWindow {
        SeriesWindow::new(self.max_lookback_days, self.end)
    }
}

/// How a successful resolution got its data.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedVia {
    /// The symbol as given, from one of the providers.
    Direct,
    /// A suffix-restricted symbol search found this match first.
    Search(SymbolMatch),
}

/// A successful resolution. `series.provider` and `series.symbol` name the
/// provider and symbol variant that produced the data.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub series: Series,
    pub via: ResolvedVia,
    /// Attempts made, including the successful one.
    pub attempts: usize,
}

impl Resolution {
    /// Display name from the search match, when resolution went through search.
    pub fn matched_name(&self) -> Option<&str> {
        match &self.via {
            ResolvedVia::Search(m) if !m.name.is_empty() => Some(m.name.as_str()),
            _ => None,
        }
    }
}

/// One failed attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub provider: String,
    pub symbol: String,
    pub reason: String,
}

/// Every strategy was exhausted. Distinct from an empty-but-successful series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no provider could resolve {symbol} ({} attempts)", .attempts.len())]
pub struct ResolutionFailure {
    pub symbol: String,
    pub attempts: Vec<AttemptFailure>,
}

impl From<ResolutionFailure> for CoreError {
    fn from(f: ResolutionFailure) -> Self {
        CoreError::ResolutionFailed {
            symbol: f.symbol,
            attempts: f.attempts.len(),
        }
    }
}

/// One provider call to try.
struct Attempt<'a> {
    provider: &'a dyn MarketDataProvider,
    symbol: String,
}

/// Resolves a symbol to a price series across providers, in order:
///
/// 1. every provider for the symbol as given (primary first);
/// 2. if all miss, a symbol search restricted to the preferred exchange
///    suffix, then the best match against the secondary provider(s) and
///    finally the primary.
///
/// Attempts share no state; a failed one leaves nothing behind for the next.
pub struct SeriesResolver<'a> {
    registry: &'a ProviderRegistry,
    preferred_suffix: String,
}

impl<'a> SeriesResolver<'a> {
    pub fn new(registry: &'a ProviderRegistry, preferred_suffix: impl Into<String>) -> Self {
        Self {
            registry,
            preferred_suffix: preferred_suffix.into().trim().to_uppercase(),
        }
    }

    /// Resolve with a window ending today.
    pub async fn resolve(
        &self,
        symbol: &str,
        min_viable_points: usize,
        max_lookback_days: u32,
    ) -> Result<Resolution, ResolutionFailure> {
        self.resolve_with(&ResolveRequest::new(symbol, min_viable_points, max_lookback_days))
            .await
    }

    pub async fn resolve_with(&self, req: &ResolveRequest) -> Result<Resolution, ResolutionFailure> {
        let mut failures = Vec::new();

        let direct: Vec<Attempt<'a>> = self
            .registry
            .series_order(&req.symbol, req.require_volume)
            .into_iter()
            .map(|provider| Attempt {
                provider,
                symbol: req.symbol.clone(),
            })
            .collect();

        if let Some(series) = self.first_success(direct, req, &mut failures).await {
            return Ok(Resolution {
                series,
                via: ResolvedVia::Direct,
                attempts: failures.len() + 1,
            });
        }

        let matched = if req.search_fallback {
            self.search_best_match(&req.symbol).await
        } else {
            None
        };
        if let Some(matched) = matched {
            tracing::debug!(symbol = %req.symbol, matched = %matched.symbol, "retrying with search match");
            let retry: Vec<Attempt<'a>> = self
                .registry
                .fallback_order(&matched.symbol, req.require_volume)
                .into_iter()
                .map(|provider| Attempt {
                    provider,
                    symbol: matched.symbol.clone(),
                })
                .collect();

            if let Some(series) = self.first_success(retry, req, &mut failures).await {
                return Ok(Resolution {
                    series,
                    via: ResolvedVia::Search(matched),
                    attempts: failures.len() + 1,
                });
            }
        }

        tracing::warn!(symbol = %req.symbol, attempts = failures.len(), "series resolution exhausted");
        Err(ResolutionFailure {
            symbol: req.symbol.clone(),
            attempts: failures,
        })
    }

    /// Run attempts in order, stopping at the first viable series.
    async fn first_success(
        &self,
        attempts: Vec<Attempt<'a>>,
        req: &ResolveRequest,
        failures: &mut Vec<AttemptFailure>,
    ) -> Option<Series> {
        for attempt in attempts {
            let provider = attempt.provider.name().to_string();
            match self.try_attempt(&attempt, req).await {
                Ok(series) => {
                    tracing::info!(
                        symbol = %req.symbol,
                        variant = %series.symbol,
                        provider = %series.provider,
                        points = series.len(),
                        "series resolved"
                    );
                    return Some(series);
                }
                Err(e) => {
                    if e.is_fallback_trigger() {
                        tracing::debug!(provider = %provider, symbol = %attempt.symbol, error = %e, "attempt missed");
                    } else {
                        tracing::warn!(provider = %provider, symbol = %attempt.symbol, error = %e, "attempt failed unexpectedly");
                    }
                    failures.push(AttemptFailure {
                        provider,
                        symbol: attempt.symbol,
                        reason: e.to_string(),
                    });
                }
            }
        }
        None
    }

    async fn try_attempt(&self, attempt: &Attempt<'a>, req: &ResolveRequest) -> Result<Series, CoreError> {
        let series = attempt
            .provider
            .fetch_series(&attempt.symbol, req.window())
            .await?;
        let required = req.min_viable_points.max(1);
        if series.len() < required {
            return Err(CoreError::InsufficientHistory {
                symbol: attempt.symbol.clone(),
                required,
                available: series.len(),
            });
        }
        Ok(series)
    }

    /// First search-capable provider with an acceptable match wins.
    async fn search_best_match(&self, symbol: &str) -> Option<SymbolMatch> {
        for provider in self.registry.searchable() {
            match provider.search_symbol(symbol).await {
                Ok(matches) => {
                    if let Some(best) = pick_best_match(symbol, &matches, &self.preferred_suffix) {
                        return Some(best);
                    }
                }
                Err(e) => {
                    tracing::debug!(provider = %provider.name(), query = %symbol, error = %e, "symbol search failed");
                }
            }
        }
        None
    }
}

/// Choose the search hit to retry with.
///
/// Only hits with `preferred_suffix` qualify (any hit when it is empty), and
/// never the symbol that was already tried. Preference: the requested symbol
/// plus the suffix, then a hit sharing its stem, then the first hit.
pub fn pick_best_match(symbol: &str, matches: &[SymbolMatch], preferred_suffix: &str) -> Option<SymbolMatch> {
    let requested = symbol.trim().to_uppercase();
    let suffix = preferred_suffix.trim().to_uppercase();
    let candidates: Vec<&SymbolMatch> = matches
        .iter()
        .filter(|m| m.symbol != requested)
        .filter(|m| suffix.is_empty() || m.has_suffix(&suffix))
        .collect();

    let exact = format!("{requested}{suffix}");
    let stem = symbol_stem(&requested);
    candidates
        .iter()
        .find(|m| !suffix.is_empty() && m.symbol == exact)
        .or_else(|| candidates.iter().find(|m| symbol_stem(&m.symbol) == stem))
        .or_else(|| candidates.first())
        .map(|m| (*m).clone())
}
