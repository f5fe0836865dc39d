use std::sync::Arc;

use crate::models::sentiment::{Lexicon, SentimentSample};

/// Lower bound of the length damping divisor.
const MIN_DAMPING: f64 = 5.0;
/// Keeps single-hit texts well inside [-1, 1].
const SCORE_SCALE: f64 = 0.75;
/// Fraction of scores dropped from each end before averaging.
const TRIM_FRACTION: usize = 10;

/// Non-ASCII letters kept by the tokenizer for Swedish terms.
const EXTRA_LETTERS: &[char] = &['å', 'ä', 'ö', 'é', 'ü'];

/// Deterministic lexicon-based sentiment scorer.
///
/// The lexicon is injected and never mutated; cloning a scorer shares it.
#[derive(Debug, Clone)]
pub struct SentimentScorer {
    lexicon: Arc<Lexicon>,
}

impl SentimentScorer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Score one text in [-1, 1]. Texts without lexicon hits score exactly 0.
    ///
    /// The signed sum of hits is divided by `max(5, log2(8 + tokens))` so
    /// long texts do not win on volume alone.
    pub fn score_text(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let mut sum = 0.0;
        let mut hits = 0usize;
        for token in &tokens {
            if let Some(w) = self.lexicon.weight(token) {
                sum += w;
                hits += 1;
            }
        }
        if hits == 0 {
            return 0.0;
        }
        let damping = MIN_DAMPING.max((8.0 + tokens.len() as f64).log2());
        (sum / damping * SCORE_SCALE).clamp(-1.0, 1.0)
    }

    /// Per-text scores, in input order.
    pub fn score_samples<S: AsRef<str>>(&self, texts: &[S]) -> Vec<SentimentSample> {
        texts
            .iter()
            .map(|t| SentimentSample {
                text: t.as_ref().to_string(),
                score: self.score_text(t.as_ref()),
            })
            .collect()
    }

    /// Trimmed mean of per-text scores, rounded to 2 decimals. 0 for no texts.
    ///
    /// The top and bottom 10% (rounded down) of sorted scores are dropped.
    pub fn aggregate<S: AsRef<str>>(&self, texts: &[S]) -> f64 {
        if texts.is_empty() {
            return 0.0;
        }
        let mut scores: Vec<f64> = texts.iter().map(|t| self.score_text(t.as_ref())).collect();
        scores.sort_by(f64::total_cmp);

        let trim = scores.len() / TRIM_FRACTION;
        let kept = &scores[trim..scores.len() - trim];
        let mean = kept.iter().sum::<f64>() / kept.len() as f64;
        ((mean * 100.0).round() / 100.0).clamp(-1.0, 1.0)
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new(Lexicon::builtin())
    }
}

/// Case-fold, replace punctuation with spaces, keep hyphens only inside words.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || EXTRA_LETTERS.contains(&c) {
                c
            } else {
                ' '
            }
        })
        .collect();

    folded
        .split_whitespace()
        .map(|t| t.trim_matches('-'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Score one text with the built-in lexicon.
pub fn score_text(text: &str) -> f64 {
    SentimentScorer::default().score_text(text)
}

/// Aggregate texts with the built-in lexicon.
pub fn aggregate<S: AsRef<str>>(texts: &[S]) -> f64 {
    SentimentScorer::default().aggregate(texts)
}
