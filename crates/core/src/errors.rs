use thiserror::Error;

/// Unified error type for the entire ticker-lens-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Provider / Network ──────────────────────────────────────────
    #[error("Provider unavailable ({provider}): {message}")]
    ProviderUnavailable {
        provider: String,
        message: String,
    },

    #[error("No data from {provider} for {symbol}")]
    NoData {
        provider: String,
        symbol: String,
    },

    #[error("Payload from {provider} has an unexpected shape: {message}")]
    ParseError {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No provider available for: {0}")]
    NoProvider(String),

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: String,
    },

    // ── Analytics ───────────────────────────────────────────────────
    #[error("Insufficient history for {symbol}: need {required} points, have {available}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("Could not resolve a price series for {symbol} after {attempts} attempts")]
    ResolutionFailed { symbol: String, attempts: usize },

    // ── Input / Configuration ───────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Whether this error should move resolution on to the next strategy.
    ///
    /// Everything a provider can produce qualifies; a malformed payload is
    /// handled exactly like an empty one.
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(
            self,
            CoreError::ProviderUnavailable { .. }
                | CoreError::NoData { .. }
                | CoreError::ParseError { .. }
                | CoreError::Network(_)
                | CoreError::Unsupported { .. }
                | CoreError::InsufficientHistory { .. }
        )
    }

    pub(crate) fn unavailable(provider: &str, message: impl Into<String>) -> Self {
        CoreError::ProviderUnavailable {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn no_data(provider: &str, symbol: &str) -> Self {
        CoreError::NoData {
            provider: provider.to_string(),
            symbol: symbol.to_string(),
        }
    }

    pub(crate) fn parse(provider: &str, message: impl Into<String>) -> Self {
        CoreError::ParseError {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::ParseError {
            provider: "json".into(),
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest errors often contain full URLs with API keys in the query string.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}
