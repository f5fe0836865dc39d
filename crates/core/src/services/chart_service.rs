use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use crate::models::chart::{ChartPayload, ChartPoint, ChartRange, Overlay};
use crate::models::price::{PricePoint, Series};

/// Merge the primary series and its overlays onto one indexed timeline,
/// using the whole primary series as the window.
///
/// Each series is rebased so its first in-window value is exactly 100.
/// Overlay values attach to a primary date only on an exact date match;
/// there is no interpolation across calendar gaps. An overlay with no
/// matching date at all is left out of `overlays_included`.
pub fn merge(primary: &Series, overlays: &[Overlay]) -> ChartPayload {
    merge_window(primary.points(), overlays)
}

/// Same as [`merge`], restricted to `range` calendar days before the last
/// primary date. Rebasing happens inside the range.
pub fn merge_range(primary: &Series, overlays: &[Overlay], range: ChartRange) -> ChartPayload {
    let window = match (range.days(), primary.last()) {
        (Some(days), Some(last)) => primary.since(last.date - Duration::days(days)),
        _ => primary.points(),
    };
    merge_window(window, overlays)
}

/// Overlay closes on the primary window's dates, indexed to the first date
/// both series share. Dates the primary lacks are ignored.
fn index_overlay(series: &Series, window: &[PricePoint]) -> Option<HashMap<NaiveDate, f64>> {
    let matched: Vec<(NaiveDate, f64)> = window
        .iter()
        .filter_map(|p| series.close_on(p.date).map(|close| (p.date, close)))
        .collect();
    let base = matched.first()?.1;
    if !base.is_finite() || base <= 0.0 {
        return None;
    }
    Some(
        matched
            .into_iter()
            .map(|(date, close)| (date, close / base * 100.0))
            .collect(),
    )
}

fn merge_window(window: &[PricePoint], overlays: &[Overlay]) -> ChartPayload {
    let Some(first) = window.first() else {
        return ChartPayload::default();
    };
    let base = first.close;
    if !base.is_finite() || base <= 0.0 {
        return ChartPayload::default();
    }

    let mut included: Vec<(&str, HashMap<NaiveDate, f64>)> = Vec::new();
    for overlay in overlays {
        if included.iter().any(|(name, _)| *name == overlay.name) {
            tracing::debug!(overlay = %overlay.name, "duplicate overlay name skipped");
            continue;
        }
        let Some(indexed) = index_overlay(&overlay.series, window) else {
            tracing::debug!(overlay = %overlay.name, "overlay shares no dates with primary");
            continue;
        };
        included.push((overlay.name.as_str(), indexed));
    }

    let points = window
        .iter()
        .map(|p| ChartPoint {
            date: p.date,
            stock: p.close / base * 100.0,
            overlays: included
                .iter()
                .map(|(name, values)| ((*name).to_string(), values.get(&p.date).copied()))
                .collect::<BTreeMap<_, _>>(),
            volume: p.volume,
        })
        .collect();

    ChartPayload {
        points,
        overlays_included: included.iter().map(|(name, _)| (*name).to_string()).collect(),
    }
}
