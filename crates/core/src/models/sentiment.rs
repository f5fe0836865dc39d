use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::errors::CoreError;

/// One scored text unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSample {
    pub text: String,
    /// Score in [-1, 1]; 0 when the text has no lexicon hits.
    pub score: f64,
}

/// Which kind of text feed a corpus came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextChannel {
    /// Company news headlines and summaries.
    News,
    /// Social posts (Reddit and similar).
    Social,
}

impl std::fmt::Display for TextChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextChannel::News => write!(f, "News"),
            TextChannel::Social => write!(f, "Social"),
        }
    }
}

/// Signed word weights used by the sentiment scorer.
///
/// Immutable once built. The built-in table is created once per process and
/// shared; custom tables can be loaded from JSON and injected into a scorer.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexicon {
    weights: HashMap<String, f64>,
}

/// (term, weight). Bullish/bearish English plus a small Swedish vocabulary.
const BUILTIN_TERMS: &[(&str, f64)] = &[
    // bullish
    ("beat", 2.0),
    ("beats", 2.0),
    ("record", 1.0),
    ("surge", 2.0),
    ("surges", 2.0),
    ("jump", 2.0),
    ("jumps", 2.0),
    ("soar", 2.0),
    ("soars", 2.0),
    ("rally", 2.0),
    ("rallies", 2.0),
    ("strong", 2.0),
    ("bullish", 2.0),
    ("outperform", 2.0),
    ("upgrade", 1.0),
    ("upgraded", 1.0),
    ("gain", 1.0),
    ("gains", 1.0),
    ("profit", 1.0),
    ("profits", 1.0),
    ("growth", 1.0),
    ("buyback", 1.0),
    ("all-time", 1.0),
    ("better-than-expected", 2.0),
    ("breakthrough", 2.0),
    // bearish
    ("miss", -2.0),
    ("misses", -2.0),
    ("fall", -2.0),
    ("falls", -2.0),
    ("plunge", -3.0),
    ("plunges", -3.0),
    ("crash", -3.0),
    ("tumble", -2.0),
    ("tumbles", -2.0),
    ("drop", -2.0),
    ("drops", -2.0),
    ("weak", -2.0),
    ("bearish", -2.0),
    ("underperform", -2.0),
    ("downgrade", -1.0),
    ("downgraded", -1.0),
    ("loss", -1.0),
    ("losses", -1.0),
    ("slowdown", -1.0),
    ("layoffs", -1.0),
    ("warning", -2.0),
    ("lawsuit", -2.0),
    ("probe", -2.0),
    ("investigation", -2.0),
    ("recall", -2.0),
    ("fraud", -3.0),
    ("bankruptcy", -3.0),
    ("worse-than-expected", -2.0),
    // Swedish
    ("rekord", 1.0),
    ("vinst", 1.0),
    ("vinstökning", 2.0),
    ("ökar", 1.0),
    ("stiger", 2.0),
    ("rusar", 2.0),
    ("höjer", 1.0),
    ("stark", 2.0),
    ("starkt", 2.0),
    ("uppgradering", 1.0),
    ("förlust", -1.0),
    ("faller", -2.0),
    ("sjunker", -2.0),
    ("rasar", -3.0),
    ("svag", -2.0),
    ("svagt", -2.0),
    ("sänker", -1.0),
    ("varning", -2.0),
    ("vinstvarning", -3.0),
    ("nedgradering", -1.0),
    ("stämning", -2.0),
    ("utredning", -2.0),
    ("bedrägeri", -3.0),
];

impl Lexicon {
    /// Build from explicit entries. Terms are case-folded.
    pub fn new<I, S>(entries: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut weights = HashMap::new();
        for (term, weight) in entries {
            let term: String = term.into();
            let term = term.trim().to_lowercase();
            if term.is_empty() {
                return Err(CoreError::Config("lexicon contains an empty term".into()));
            }
            if !weight.is_finite() {
                return Err(CoreError::Config(format!(
                    "lexicon weight for '{term}' is not finite"
                )));
            }
            weights.insert(term, weight);
        }
        Ok(Self { weights })
    }

    /// Parse a JSON object of `{"term": weight}`.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let raw: HashMap<String, f64> = serde_json::from_str(json)
            .map_err(|e| CoreError::Config(format!("invalid lexicon JSON: {e}")))?;
        Self::new(raw)
    }

    /// The shared built-in lexicon, built on first use.
    pub fn builtin() -> Arc<Lexicon> {
        static BUILTIN: OnceLock<Arc<Lexicon>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                Arc::new(Lexicon {
                    weights: BUILTIN_TERMS
                        .iter()
                        .map(|(term, w)| ((*term).to_string(), *w))
                        .collect(),
                })
            })
            .clone()
    }

    pub fn weight(&self, token: &str) -> Option<f64> {
        self.weights.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin().as_ref().clone()
    }
}
