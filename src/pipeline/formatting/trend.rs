//! Synthetic 12-month history for a single lab value.
//!
//! No real history exists; points are drawn around the current value from the
//! caller's random source, so a seeded source gives a reproducible series.

use chrono::{Months, NaiveDate};
use rand::Rng;

use super::FormatError;
use crate::models::{TrendPoint, TrendStatus};

/// Points per series, one per calendar month.
pub const TREND_MONTHS: u32 = 12;

/// Maximum relative deviation from the current value.
const MAX_VARIATION: f64 = 0.2;

/// Relative deviation beyond which a point is flagged high or low.
const FLAG_THRESHOLD: f64 = 0.15;

/// Series key: test name lower-cased with spaces removed.
pub fn trend_key(test_name: &str) -> String {
    test_name.to_lowercase().replace(' ', "")
}

/// Generate `TREND_MONTHS` points ending in the month of `today`, oldest first.
pub fn synthesize_trend<R: Rng + ?Sized>(
    test_name: &str,
    current_value: f64,
    today: NaiveDate,
    rng: &mut R,
) -> Result<Vec<TrendPoint>, FormatError> {
    (0..TREND_MONTHS)
        .rev()
        .map(|months_back| {
            let month = today
                .checked_sub_months(Months::new(months_back))
                .ok_or(FormatError::DateOutOfRange {
                    from: today,
                    months: months_back,
                })?;

            let variation = rng.gen_range(-MAX_VARIATION..MAX_VARIATION) * current_value;
            let value = (current_value + variation).clamp(0.0, f64::MAX);

            let status = if variation > FLAG_THRESHOLD * current_value {
                TrendStatus::High
            } else if variation < -FLAG_THRESHOLD * current_value {
                TrendStatus::Low
            } else {
                TrendStatus::Normal
            };

            Ok(TrendPoint {
                date: month.format("%Y-%m").to_string(),
                value: round_one_decimal(value),
                test_name: test_name.to_string(),
                status,
            })
        })
        .collect()
}

/// Values too large to scale are already far beyond one-decimal precision.
fn round_one_decimal(value: f64) -> f64 {
    let scaled = value * 10.0;
    if scaled.is_finite() {
        scaled.round() / 10.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn twelve_points_strictly_increasing_months() {
        let mut rng = StdRng::seed_from_u64(7);
        // Month-end start date: fixed 30-day steps would repeat March here
        let points = synthesize_trend("Hemoglobin", 14.2, day(2024, 3, 31), &mut rng).unwrap();
        assert_eq!(points.len(), 12);
        assert_eq!(points.first().unwrap().date, "2023-04");
        assert_eq!(points.last().unwrap().date, "2024-03");
        for pair in points.windows(2) {
            assert!(pair[0].date < pair[1].date, "{} !< {}", pair[0].date, pair[1].date);
        }
    }

    #[test]
    fn values_stay_within_twenty_percent_and_non_negative() {
        let mut rng = StdRng::seed_from_u64(42);
        for current in [0.0, 0.4, 5.4, 14.2, 162.0, 9_500.0] {
            let points = synthesize_trend("Test", current, day(2024, 6, 15), &mut rng).unwrap();
            for p in &points {
                assert!(p.value >= 0.0);
                // Rounding to one decimal adds at most 0.05
                assert!((p.value - current).abs() <= 0.2 * current + 0.05 + 1e-9);
            }
        }
    }

    #[test]
    fn status_reflects_fifteen_percent_threshold() {
        let mut rng = StdRng::seed_from_u64(3);
        let current = 100.0;
        let points = synthesize_trend("LDL", current, day(2024, 6, 15), &mut rng).unwrap();
        for p in &points {
            match p.status {
                TrendStatus::High => assert!(p.value >= 115.0),
                TrendStatus::Low => assert!(p.value <= 85.0),
                TrendStatus::Normal => assert!((85.0..=115.0).contains(&p.value)),
            }
        }
    }

    #[test]
    fn seeded_source_is_reproducible() {
        let a = synthesize_trend("ALT", 32.0, day(2024, 1, 10), &mut StdRng::seed_from_u64(9)).unwrap();
        let b = synthesize_trend("ALT", 32.0, day(2024, 1, 10), &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|p| p.test_name == "ALT"));
    }

    #[test]
    fn zero_value_is_flat_and_normal() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = synthesize_trend("CRP", 0.0, day(2024, 6, 15), &mut rng).unwrap();
        assert!(points.iter().all(|p| p.value == 0.0 && p.status == TrendStatus::Normal));
    }

    #[test]
    fn key_lowercases_and_removes_spaces() {
        assert_eq!(trend_key("LDL Cholesterol"), "ldlcholesterol");
        assert_eq!(trend_key("Hemoglobin"), "hemoglobin");
    }

    #[test]
    fn huge_values_stay_finite_and_serialize_as_numbers() {
        let mut rng = StdRng::seed_from_u64(4);
        for current in [1e308, f64::MAX] {
            let points = synthesize_trend("X", current, day(2024, 6, 15), &mut rng).unwrap();
            for p in &points {
                assert!(p.value.is_finite());
                assert!(p.value >= 0.0);
                let json = serde_json::to_value(p).unwrap();
                assert!(json["value"].is_number(), "got {}", json["value"]);
            }
        }
    }

    #[test]
    fn rounding_keeps_one_decimal() {
        assert_eq!(round_one_decimal(14.26), 14.3);
        assert_eq!(round_one_decimal(1e308), 1e308);
    }

    #[test]
    fn date_underflow_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = synthesize_trend("X", 1.0, NaiveDate::MIN, &mut rng);
        assert!(matches!(result, Err(FormatError::DateOutOfRange { .. })));
    }
}
