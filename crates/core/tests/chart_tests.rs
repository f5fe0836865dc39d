// ═══════════════════════════════════════════════════════════════════
// Chart Tests - index-to-100 rebasing, exact-date overlays, ranges
// ═══════════════════════════════════════════════════════════════════

use chrono::{Duration, NaiveDate};

use ticker_lens_core::models::chart::{ChartRange, Overlay};
use ticker_lens_core::models::price::{PricePoint, Series};
use ticker_lens_core::services::chart_service::{merge, merge_range};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Consecutive daily closes starting at `start`.
fn daily(symbol: &str, start: NaiveDate, closes: &[f64]) -> Series {
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::new(start + Duration::days(i as i64), c))
        .collect();
    Series::new(symbol, "Mock", points)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ── Primary normalization ───────────────────────────────────────────

mod primary {
    use super::*;

    #[test]
    fn first_point_is_exactly_100() {
        let series = daily("AAPL", date(2024, 1, 1), &[187.33, 190.0, 181.5]);
        let chart = merge(&series, &[]);
        assert_eq!(chart.points[0].stock, 100.0);
        assert!(approx(chart.points[2].stock, 181.5 / 187.33 * 100.0));
    }

    #[test]
    fn one_point_per_primary_date() {
        let series = daily("AAPL", date(2024, 1, 1), &[10.0, 11.0, 12.0, 13.0]);
        let chart = merge(&series, &[]);
        assert_eq!(chart.points.len(), 4);
        assert_eq!(chart.points[3].date, date(2024, 1, 4));
        assert!(approx(chart.points[3].stock, 130.0));
        assert!(chart.overlays_included.is_empty());
    }

    #[test]
    fn volume_passes_through_unindexed() {
        let points = vec![
            PricePoint::with_volume(date(2024, 1, 1), 50.0, 1_000.0),
            PricePoint::with_volume(date(2024, 1, 2), 55.0, 2_500.0),
        ];
        let series = Series::new("AAPL", "Mock", points);
        let chart = merge(&series, &[]);
        assert_eq!(chart.points[0].volume, Some(1_000.0));
        assert_eq!(chart.points[1].volume, Some(2_500.0));
    }

    #[test]
    fn empty_primary_gives_empty_payload() {
        let series = Series::new("AAPL", "Mock", vec![]);
        let chart = merge(&series, &[]);
        assert!(chart.is_empty());
        assert!(chart.overlays_included.is_empty());
    }
}

// ── Overlays ────────────────────────────────────────────────────────

mod overlays {
    use super::*;

    #[test]
    fn overlay_rebased_to_its_own_first_point() {
        let primary = daily("AAPL", date(2024, 1, 1), &[10.0, 20.0, 30.0]);
        let bench = daily("SPY", date(2024, 1, 1), &[400.0, 440.0, 420.0]);
        let chart = merge(&primary, &[Overlay::new("SPY", bench)]);

        assert_eq!(chart.overlays_included, vec!["SPY".to_string()]);
        assert_eq!(chart.points[0].overlays["SPY"], Some(100.0));
        assert!(approx(chart.points[1].overlays["SPY"].unwrap(), 110.0));
        assert!(approx(chart.points[2].overlays["SPY"].unwrap(), 105.0));
    }

    #[test]
    fn overlay_without_matching_dates_is_absent() {
        let primary = daily("AAPL", date(2024, 1, 1), &[10.0, 11.0, 12.0]);
        let disjoint = daily("^OMXS30", date(2023, 6, 1), &[2000.0, 2010.0]);
        let chart = merge(&primary, &[Overlay::new("OMXS30", disjoint)]);

        assert!(chart.overlays_included.is_empty());
        assert!(chart.points.iter().all(|p| p.overlays.is_empty()));
    }

    #[test]
    fn partial_overlap_is_pointwise_with_explicit_gaps() {
        let primary = daily("AAPL", date(2024, 1, 1), &[10.0, 11.0, 12.0, 13.0]);
        // Only Jan 2 and Jan 4 exist in the overlay.
        let overlay = Series::new(
            "SPY",
            "Mock",
            vec![
                PricePoint::new(date(2024, 1, 2), 200.0),
                PricePoint::new(date(2024, 1, 4), 210.0),
            ],
        );
        let chart = merge(&primary, &[Overlay::new("SPY", overlay)]);

        assert_eq!(chart.overlays_included, vec!["SPY".to_string()]);
        assert_eq!(chart.points[0].overlays.get("SPY"), Some(&None));
        assert_eq!(chart.points[1].overlays["SPY"], Some(100.0));
        assert_eq!(chart.points[2].overlays.get("SPY"), Some(&None));
        assert!(approx(chart.points[3].overlays["SPY"].unwrap(), 105.0));
    }

    #[test]
    fn no_interpolation_across_calendar_gaps() {
        // Primary trades on a date the overlay skipped.
        let primary = Series::new(
            "VOLV-B.ST",
            "Mock",
            vec![
                PricePoint::new(date(2024, 6, 5), 100.0),
                PricePoint::new(date(2024, 6, 6), 101.0),
                PricePoint::new(date(2024, 6, 7), 102.0),
            ],
        );
        let overlay = Series::new(
            "SPY",
            "Mock",
            vec![
                PricePoint::new(date(2024, 6, 5), 500.0),
                PricePoint::new(date(2024, 6, 7), 505.0),
            ],
        );
        let chart = merge(&primary, &[Overlay::new("SPY", overlay)]);
        assert_eq!(chart.points[1].overlays["SPY"], None);
    }

    #[test]
    fn overlay_base_is_first_shared_date_across_holidays() {
        // Primary is closed on Jan 3; the overlay trades that day.
        let primary = Series::new(
            "VOLV-B.ST",
            "Mock",
            vec![
                PricePoint::new(date(2024, 1, 2), 10.0),
                PricePoint::new(date(2024, 1, 4), 11.0),
                PricePoint::new(date(2024, 1, 5), 12.0),
            ],
        );
        let overlay = Series::new(
            "SPY",
            "Mock",
            vec![
                PricePoint::new(date(2024, 1, 3), 50.0),
                PricePoint::new(date(2024, 1, 4), 100.0),
                PricePoint::new(date(2024, 1, 5), 110.0),
            ],
        );
        let chart = merge(&primary, &[Overlay::new("SPY", overlay)]);

        assert_eq!(chart.overlays_included, vec!["SPY".to_string()]);
        assert_eq!(chart.points[0].overlays["SPY"], None);
        assert_eq!(chart.points[1].overlays["SPY"], Some(100.0));
        assert!(approx(chart.points[2].overlays["SPY"].unwrap(), 110.0));
        let first_plotted = chart.points.iter().find_map(|p| p.overlays["SPY"]);
        assert_eq!(first_plotted, Some(100.0));
    }

    #[test]
    fn overlay_points_before_window_do_not_move_the_base() {
        let primary = daily("AAPL", date(2024, 1, 10), &[10.0, 11.0]);
        let overlay = daily("SPY", date(2024, 1, 8), &[50.0, 60.0, 80.0, 88.0]);
        let chart = merge(&primary, &[Overlay::new("SPY", overlay)]);

        assert_eq!(chart.points[0].overlays["SPY"], Some(100.0));
        assert!(approx(chart.points[1].overlays["SPY"].unwrap(), 110.0));
    }

    #[test]
    fn included_overlays_keep_input_order_and_skip_duplicates() {
        let primary = daily("AAPL", date(2024, 1, 1), &[10.0, 11.0]);
        let spy = daily("SPY", date(2024, 1, 1), &[1.0, 2.0]);
        let omx = daily("^OMXS30", date(2024, 1, 1), &[3.0, 4.0]);
        let spy_again = daily("^GSPC", date(2024, 1, 1), &[5.0, 6.0]);
        let chart = merge(
            &primary,
            &[
                Overlay::new("SPY", spy),
                Overlay::new("OMXS30", omx),
                Overlay::new("SPY", spy_again),
            ],
        );
        assert_eq!(chart.overlays_included, vec!["SPY".to_string(), "OMXS30".to_string()]);
        assert_eq!(chart.points[1].overlays["SPY"], Some(200.0));
    }

    #[test]
    fn empty_overlay_is_absent() {
        let primary = daily("AAPL", date(2024, 1, 1), &[10.0, 11.0]);
        let empty = Series::new("SPY", "Mock", vec![]);
        let chart = merge(&primary, &[Overlay::new("SPY", empty)]);
        assert!(chart.overlays_included.is_empty());
    }
}

// ── Ranges ──────────────────────────────────────────────────────────

mod ranges {
    use super::*;

    #[test]
    fn range_rebases_inside_window() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let series = daily("AAPL", date(2024, 1, 1), &closes);
        let chart = merge_range(&series, &[], ChartRange::OneMonth);

        // last date is day 99; window starts 31 days earlier at day 68
        assert_eq!(chart.points.len(), 32);
        assert_eq!(chart.points[0].date, date(2024, 1, 1) + Duration::days(68));
        assert_eq!(chart.points[0].stock, 100.0);
        assert!(approx(chart.points[31].stock, 199.0 / 168.0 * 100.0));
    }

    #[test]
    fn max_range_matches_merge() {
        let series = daily("AAPL", date(2024, 1, 1), &[10.0, 12.0, 9.0]);
        assert_eq!(merge_range(&series, &[], ChartRange::Max), merge(&series, &[]));
    }

    #[test]
    fn overlay_outside_range_is_dropped() {
        let closes: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let series = daily("AAPL", date(2024, 1, 1), &closes);
        let early = daily("SPY", date(2024, 1, 1), &[1.0, 2.0, 3.0]);
        let chart = merge_range(&series, &[Overlay::new("SPY", early)], ChartRange::OneMonth);
        assert!(chart.overlays_included.is_empty());

        let full = merge(&series, &[Overlay::new("SPY", daily("SPY", date(2024, 1, 1), &[1.0, 2.0, 3.0]))]);
        assert_eq!(full.overlays_included, vec!["SPY".to_string()]);
    }

    #[test]
    fn range_parses_labels() {
        assert_eq!("1y".parse::<ChartRange>().unwrap(), ChartRange::OneYear);
        assert_eq!("MAX".parse::<ChartRange>().unwrap(), ChartRange::Max);
        assert!("2W".parse::<ChartRange>().is_err());
        assert_eq!(ChartRange::FiveYears.to_string(), "5Y");
    }
}
