use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::price::Series;

/// A single point on the detail-view comparison chart.
///
/// The core computes all the numbers; the frontend only renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,

    /// Primary series indexed to 100 at the first in-window point.
    pub stock: f64,

    /// Indexed value per included overlay. Every included overlay has a key
    /// on every point; `None` means the overlay had no bar on this date.
    #[serde(default)]
    pub overlays: BTreeMap<String, Option<f64>>,

    /// Raw (unindexed) primary volume, if the primary series carries it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

/// Chart data for the detail view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub points: Vec<ChartPoint>,

    /// Overlays with at least one date matching the primary series in the
    /// window, in the order they were supplied.
    pub overlays_included: Vec<String>,
}

impl ChartPayload {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A named series to draw against the primary one (benchmark, regional index).
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub name: String,
    pub series: Series,
}

impl Overlay {
    pub fn new(name: impl Into<String>, series: Series) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }
}

/// Visible range of the detail chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartRange {
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "5Y")]
    FiveYears,
    #[serde(rename = "MAX")]
    Max,
}

impl ChartRange {
    /// Calendar days shown before the last primary date; `None` for everything.
    pub fn days(&self) -> Option<i64> {
        match self {
            ChartRange::OneMonth => Some(31),
            ChartRange::SixMonths => Some(183),
            ChartRange::OneYear => Some(365),
            ChartRange::FiveYears => Some(5 * 365 + 1),
            ChartRange::Max => None,
        }
    }
}

impl std::fmt::Display for ChartRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartRange::OneMonth => write!(f, "1M"),
            ChartRange::SixMonths => write!(f, "6M"),
            ChartRange::OneYear => write!(f, "1Y"),
            ChartRange::FiveYears => write!(f, "5Y"),
            ChartRange::Max => write!(f, "MAX"),
        }
    }
}

impl std::str::FromStr for ChartRange {
    type Err = crate::errors::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "1M" => Ok(ChartRange::OneMonth),
            "6M" => Ok(ChartRange::SixMonths),
            "1Y" => Ok(ChartRange::OneYear),
            "5Y" => Ok(ChartRange::FiveYears),
            "MAX" => Ok(ChartRange::Max),
            other => Err(crate::errors::CoreError::ValidationError(format!(
                "unknown chart range '{other}' (expected 1M, 6M, 1Y, 5Y or MAX)"
            ))),
        }
    }
}
