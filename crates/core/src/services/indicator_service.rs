//! Technical indicators over ascending close-price arrays.
//!
//! Everything here is pure and infallible: short or empty input yields
//! `None` ("unavailable"), never a made-up zero.

use crate::models::indicators::{IndicatorSet, Metric};

pub const SMA_SHORT_WINDOW: usize = 50;
pub const SMA_LONG_WINDOW: usize = 200;
pub const RSI_PERIOD: usize = 14;
/// Trading days in the 52-week high look-back.
pub const HIGH_LOOKBACK: usize = 252;
/// Trading days in ~6 months.
pub const SIX_MONTHS: usize = 126;
/// Trading days in ~12 months.
pub const TWELVE_MONTHS: usize = 252;

/// Mean of the last `window` closes.
pub fn sma(closes: &[f64], window: usize) -> Metric {
    if window == 0 || closes.len() < window {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64).filter(|v| v.is_finite())
}

fn rsi_from(avg_gain: f64, avg_loss: f64) -> Metric {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    Some((100.0 - 100.0 / (1.0 + avg_gain / avg_loss)).clamp(0.0, 100.0))
}

/// RSI by Wilder's smoothing, aligned to `closes`.
///
/// Entries before index `period` are `None`, as is every entry once a
/// non-finite close has entered the averages. The seed averages the first
/// `period` day-over-day moves; each later index smooths the previous
/// average by `(period - 1) / period`.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Metric> {
    let n = closes.len();
    let mut out = vec![None; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut gain = 0.0;
    let mut loss = 0.0;
    for i in 1..=period {
        let diff = closes[i] - closes[i - 1];
        if !diff.is_finite() {
            return out;
        }
        if diff >= 0.0 {
            gain += diff;
        } else {
            loss -= diff;
        }
    }
    let p = period as f64;
    let mut avg_gain = gain / p;
    let mut avg_loss = loss / p;
    out[period] = rsi_from(avg_gain, avg_loss);

    for i in period + 1..n {
        let diff = closes[i] - closes[i - 1];
        if !diff.is_finite() {
            break;
        }
        let g = diff.max(0.0);
        let l = (-diff).max(0.0);
        avg_gain = (avg_gain * (p - 1.0) + g) / p;
        avg_loss = (avg_loss * (p - 1.0) + l) / p;
        out[i] = rsi_from(avg_gain, avg_loss);
    }
    out
}

/// RSI at the last close.
pub fn rsi_last(closes: &[f64], period: usize) -> Metric {
    rsi(closes, period).last().copied().flatten()
}

/// Percent distance of the last close from the highest close in the last
/// `lookback` values (all of them if fewer). 0 at a new high, negative below.
pub fn dist_from_high_pct(closes: &[f64], lookback: usize) -> Metric {
    let last = *closes.last()?;
    if !last.is_finite() {
        return None;
    }
    let start = closes.len().saturating_sub(lookback.max(1));
    let high = closes[start..].iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !high.is_finite() || high <= 0.0 {
        return None;
    }
    Some((last - high) / high * 100.0)
}

/// Percent return over the last `n` trading days.
fn pct_return(x: &[f64], n: usize) -> f64 {
    let last = x[x.len() - 1];
    let base = x[x.len() - 1 - n];
    let r = (last - base) / base * 100.0;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// Return over `target_days` trading days minus the benchmark's, in
/// percentage points. Both arrays are aligned by offset from their ends,
/// and the window shrinks to whatever history both have; with no usable
/// window the result is 0.
pub fn rel_vs_benchmark(closes: &[f64], benchmark: &[f64], target_days: usize) -> f64 {
    let n = target_days
        .min(closes.len().saturating_sub(1))
        .min(benchmark.len().saturating_sub(1));
    if n == 0 {
        return 0.0;
    }
    pct_return(closes, n) - pct_return(benchmark, n)
}

/// Full indicator set for a series against a benchmark.
///
/// Any non-finite close makes the whole set unavailable; a non-finite
/// benchmark close makes the relative metrics unavailable. Relative metrics
/// also need at least two closes on each side (the benchmark may have
/// failed to resolve).
pub fn compute_indicators(closes: &[f64], benchmark: &[f64]) -> IndicatorSet {
    let all_finite = |xs: &[f64]| xs.iter().all(|x| x.is_finite());
    if !all_finite(closes) {
        return IndicatorSet::unavailable();
    }
    let relative_ok = closes.len() >= 2 && benchmark.len() >= 2 && all_finite(benchmark);
    let relative = |days| relative_ok.then(|| rel_vs_benchmark(closes, benchmark, days));

    IndicatorSet {
        sma50: sma(closes, SMA_SHORT_WINDOW),
        sma200: sma(closes, SMA_LONG_WINDOW),
        rsi14: rsi_last(closes, RSI_PERIOD),
        dist_from_high_pct: dist_from_high_pct(closes, HIGH_LOOKBACK),
        rel_vs_benchmark_6m: relative(SIX_MONTHS),
        rel_vs_benchmark_12m: relative(TWELVE_MONTHS),
    }
}
