use std::time::Duration;

use crate::models::price::is_venue_suffixed;
use crate::models::sentiment::TextChannel;
use crate::models::settings::{Settings, ALPHAVANTAGE_KEY, FINNHUB_KEY};

use super::alphavantage::AlphaVantageProvider;
use super::finnhub::{FinnhubProvider, FinnhubSocialSentiment};
use super::reddit::RedditProvider;
use super::traits::{MarketDataProvider, TextSource};
use super::yahoo_finance::YahooFinanceProvider;

/// Registry of all available market-data providers and text sources.
///
/// Registration order is priority order: the first registered provider is
/// the primary, the second the secondary, and so on. New providers can be
/// added without modifying the resolver.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn MarketDataProvider>>,
    text_sources: Vec<Box<dyn TextSource>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            text_sources: Vec::new(),
        }
    }

    /// Create a registry with all default providers whose credentials are present.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::new();
        let timeout = Duration::from_secs(settings.http_timeout_secs.max(1));

        // Alpha Vantage: primary, requires API key
        if let Some(key) = settings.api_keys.get(ALPHAVANTAGE_KEY).filter(|k| !k.is_empty()) {
            registry.register(Box::new(AlphaVantageProvider::new(key.clone(), timeout)));
        }

        // Finnhub: secondary (volume, venue suffixes), the news feed and
        // upstream social scores ahead of Reddit text
        if let Some(key) = settings.api_keys.get(FINNHUB_KEY).filter(|k| !k.is_empty()) {
            registry.register(Box::new(FinnhubProvider::new(
                key.clone(),
                timeout,
                settings.news_text_cap,
            )));
            registry.register_text_source(Box::new(FinnhubProvider::new(
                key.clone(),
                timeout,
                settings.news_text_cap,
            )));
            registry.register_text_source(Box::new(FinnhubSocialSentiment::new(key.clone(), timeout)));
        }

        // Yahoo Finance: no API key needed, last resort
        match YahooFinanceProvider::new() {
            Ok(yahoo) => registry.register(Box::new(yahoo)),
            Err(e) => tracing::warn!(error = %e, "Yahoo Finance connector unavailable"),
        }

        // Reddit search: keyless social feed
        registry.register_text_source(Box::new(RedditProvider::new(timeout)));

        registry
    }

    /// Register a market-data provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.providers.push(provider);
    }

    /// Register a text source at the lowest priority within its channel.
    pub fn register_text_source(&mut self, source: Box<dyn TextSource>) {
        self.text_sources.push(source);
    }

    /// All providers in priority order.
    pub fn providers(&self) -> Vec<&dyn MarketDataProvider> {
        self.providers.iter().map(|p| p.as_ref()).collect()
    }

    /// Providers in the order a series request for `symbol` should try them.
    ///
    /// Registration order, except that for venue-suffixed tickers (or when
    /// per-bar volume is required) providers with the matching capability
    /// move ahead of those without it. The sort is stable.
    pub fn series_order(&self, symbol: &str, require_volume: bool) -> Vec<&dyn MarketDataProvider> {
        let mut ordered = self.providers();
        prefer_capable(&mut ordered, symbol, require_volume);
        ordered
    }

    /// Order for re-attempting a search match: secondary first, primary last.
    pub fn fallback_order(&self, symbol: &str, require_volume: bool) -> Vec<&dyn MarketDataProvider> {
        let mut ordered = self.providers();
        if ordered.len() > 1 {
            ordered.rotate_left(1);
        }
        prefer_capable(&mut ordered, symbol, require_volume);
        ordered
    }

    /// Providers that implement symbol search, in priority order.
    pub fn searchable(&self) -> Vec<&dyn MarketDataProvider> {
        self.providers
            .iter()
            .filter(|p| p.capabilities().search)
            .map(|p| p.as_ref())
            .collect()
    }

    /// Text sources for a channel, in priority order.
    pub fn text_sources_for(&self, channel: TextChannel) -> Vec<&dyn TextSource> {
        self.text_sources
            .iter()
            .filter(|s| s.channel() == channel)
            .map(|s| s.as_ref())
            .collect()
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn text_source_names(&self) -> Vec<String> {
        self.text_sources
            .iter()
            .map(|s| format!("{} ({})", s.name(), s.channel()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

fn prefer_capable(providers: &mut [&dyn MarketDataProvider], symbol: &str, require_volume: bool) {
    let suffixed = is_venue_suffixed(symbol);
    if !suffixed && !require_volume {
        return;
    }
    providers.sort_by_key(|p| {
        let caps = p.capabilities();
        let misses_suffix = suffixed && !caps.venue_suffixes;
        let misses_volume = require_volume && !caps.volume;
        u8::from(misses_suffix) + u8::from(misses_volume)
    });
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
