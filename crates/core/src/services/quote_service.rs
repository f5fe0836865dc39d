use crate::errors::CoreError;
use crate::models::price::Quote;
use crate::providers::registry::ProviderRegistry;

/// Fetches lightweight quotes with automatic provider fallback.
///
/// Used for the quote-only rung of the degradation ladder, when no full
/// series could be resolved.
pub struct QuoteService<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> QuoteService<'a> {
    pub fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Latest quote from the first provider that returns a usable one.
    ///
    /// Tries providers in priority order. Quotes with a non-finite or
    /// non-positive price are rejected and the next provider is tried.
    pub async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let providers = self.registry.series_order(symbol, false);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(format!("quote for {symbol}")));
        }

        let mut last_error = None;
        for provider in &providers {
            match provider.fetch_quote(symbol).await {
                Ok(mut quote) => {
                    if !quote.last.is_finite() || quote.last <= 0.0 {
                        last_error = Some(CoreError::unavailable(
                            provider.name(),
                            format!("Invalid price returned for {symbol}: {}", quote.last),
                        ));
                        continue;
                    }
                    if !quote.change_pct.is_finite() {
                        quote.change_pct = 0.0;
                    }
                    return Ok(quote);
                }
                Err(e) => {
                    tracing::debug!(provider = %provider.name(), symbol, error = %e, "quote attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(format!("quote for {symbol}"))))
    }
}
