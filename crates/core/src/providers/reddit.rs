use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::symbol_stem;
use crate::models::sentiment::TextChannel;
use super::traits::{TextQuery, TextSource};

const SEARCH_URL: &str = "https://www.reddit.com/search.json";
const NAME: &str = "Reddit";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; TickerLens/0.1)";
const RESULT_LIMIT: &str = "50";

/// Reddit search as a social text feed (post titles only).
///
/// - **Free**: No API key; requires a descriptive User-Agent.
/// - **Endpoint**: `/search.json?q=...&sort=new&t=<period>`.
pub struct RedditProvider {
    client: Client,
}

impl RedditProvider {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(USER_AGENT)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

// ── Reddit API response types ───────────────────────────────────────

#[derive(Deserialize)]
struct Listing {
    data: Option<ListingData>,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Deserialize)]
struct Child {
    data: Option<Post>,
}

#[derive(Deserialize)]
struct Post {
    title: Option<String>,
}

/// Build an OR-joined search over ticker aliases and the company name:
/// `AAPL OR $AAPL OR "Apple Inc" OR "Apple Inc stock"`.
pub fn build_search_query(symbol: &str, name_hint: Option<&str>) -> String {
    let upper = symbol.trim().to_uppercase();
    let mut terms: Vec<String> = Vec::new();
    let mut push = |t: String| {
        if !t.is_empty() && !terms.contains(&t) {
            terms.push(t);
        }
    };

    push(upper.clone());
    push(format!("${upper}"));
    push(symbol_stem(&upper));

    if let Some(name) = name_hint.map(str::trim).filter(|n| n.len() > 1) {
        push(name.to_string());
        push(format!("{name} stock"));
    }

    terms
        .into_iter()
        .map(|t| {
            if t.contains(char::is_whitespace) {
                format!("\"{t}\"")
            } else {
                t
            }
        })
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Reddit's `t` parameter for a look-back window.
pub fn time_filter(window_days: u32) -> &'static str {
    match window_days {
        0..=1 => "day",
        2..=7 => "week",
        8..=31 => "month",
        _ => "year",
    }
}

/// Parse a search listing into trimmed, non-empty post titles.
pub fn parse_titles(body: &str) -> Result<Vec<String>, CoreError> {
    let listing: Listing = serde_json::from_str(body)
        .map_err(|e| CoreError::parse(NAME, format!("search listing: {e}")))?;
    Ok(listing
        .data
        .map(|d| d.children)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|c| c.data.and_then(|p| p.title))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

#[async_trait]
impl TextSource for RedditProvider {
    fn name(&self) -> &str {
        NAME
    }

    fn channel(&self) -> TextChannel {
        TextChannel::Social
    }

    async fn fetch_text_corpus(&self, query: &TextQuery) -> Result<Vec<String>, CoreError> {
        let q = build_search_query(&query.symbol, query.name_hint.as_deref());
        let resp = self
            .client
            .get(SEARCH_URL)
            .query(&[
                ("q", q.as_str()),
                ("sort", "new"),
                ("t", time_filter(query.window_days)),
                ("limit", RESULT_LIMIT),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::unavailable(NAME, format!("HTTP {status}")));
        }
        parse_titles(&resp.text().await?)
    }
}
