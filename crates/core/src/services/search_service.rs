use std::collections::HashSet;

use crate::errors::CoreError;
use crate::models::price::SymbolMatch;
use crate::providers::registry::ProviderRegistry;

/// Merged symbol search across every search-capable provider.
pub struct SearchService<'a> {
    registry: &'a ProviderRegistry,
}

impl<'a> SearchService<'a> {
    pub fn new(registry: &'a ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Query all providers concurrently and merge their hits.
    ///
    /// A failing provider contributes nothing. Results keep provider priority
    /// order, are deduplicated by symbol and capped at `limit`.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SymbolMatch>, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::ValidationError("search query must not be empty".into()));
        }

        let providers = self.registry.searchable();
        let results = futures::future::join_all(providers.iter().map(|p| p.search_symbol(query))).await;

        let lists: Vec<Vec<SymbolMatch>> = providers
            .iter()
            .zip(results)
            .filter_map(|(provider, result)| match result {
                Ok(hits) => Some(hits),
                Err(e) => {
                    tracing::warn!(provider = %provider.name(), query, error = %e, "symbol search failed");
                    None
                }
            })
            .collect();

        Ok(dedupe_merge(lists, limit))
    }
}

/// Concatenate hit lists in order, keeping the first hit per symbol.
pub fn dedupe_merge(lists: Vec<Vec<SymbolMatch>>, limit: usize) -> Vec<SymbolMatch> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|hit| seen.insert(hit.symbol.to_uppercase()))
        .take(limit)
        .collect()
}
