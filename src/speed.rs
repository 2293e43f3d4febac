//! Throughput metrics derived from duration and page count.

use serde::Serialize;

/// Seconds per page, pages per minute and pages per second.
///
/// Either all three are present or all three are `None`: there is no way
/// to know one without the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpeedMetrics {
    pub seconds_per_page: Option<f64>,
    pub pages_per_minute: Option<f64>,
    pub pages_per_second: Option<f64>,
}

impl SpeedMetrics {
    /// All fields unavailable.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Derive throughput from a job's duration and page count.
    ///
    /// Unknown or zero page count, and a duration that is not a positive
    /// finite number, all yield [`SpeedMetrics::unavailable`]; the result is
    /// never `0` or `NaN` standing in for "unknown".
    pub fn calculate(duration_seconds: f64, page_count: Option<usize>) -> Self {
        let pages = match page_count {
            Some(p) if p > 0 => p as f64,
            _ => return Self::unavailable(),
        };
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Self::unavailable();
        }

        Self {
            seconds_per_page: Some(duration_seconds / pages),
            pages_per_minute: Some(pages / (duration_seconds / 60.0)),
            pages_per_second: Some(pages / duration_seconds),
        }
    }

    pub fn is_available(&self) -> bool {
        self.seconds_per_page.is_some()
    }

    /// Display precision used in the processing log: 2, 2 and 4 decimals.
    pub fn rounded(&self) -> Self {
        Self {
            seconds_per_page: self.seconds_per_page.map(|v| round_to(v, 2)),
            pages_per_minute: self.pages_per_minute.map(|v| round_to(v, 2)),
            pages_per_second: self.pages_per_second.map(|v| round_to(v, 4)),
        }
    }
}

/// Round for display. Non-finite values pass through unchanged.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn rounding_keeps_unavailable_as_none() {
        assert_eq!(SpeedMetrics::unavailable().rounded(), SpeedMetrics::unavailable());
        let r = SpeedMetrics::calculate(7.0, Some(3)).rounded();
        assert_eq!(r.seconds_per_page, Some(2.33));
        assert_eq!(r.pages_per_minute, Some(25.71));
        assert_eq!(r.pages_per_second, Some(0.4286));
    }

    #[test]
    fn ten_pages_in_a_minute() {
        let s = SpeedMetrics::calculate(60.0, Some(10));
        assert!(close(s.seconds_per_page.unwrap(), 6.0));
        assert!(close(s.pages_per_minute.unwrap(), 10.0));
        assert!((s.pages_per_second.unwrap() - 0.1667).abs() < 1e-4);
    }

    #[test]
    fn pages_per_minute_matches_definition() {
        for &(p, d) in &[(1usize, 0.5f64), (3, 7.25), (250, 1234.5), (17, 0.001)] {
            let s = SpeedMetrics::calculate(d, Some(p));
            let expected = p as f64 / (d / 60.0);
            let got = s.pages_per_minute.unwrap();
            assert!((got - expected).abs() <= expected * 1e-12, "p={p} d={d}");
        }
    }

    #[test]
    fn unknown_page_count_nulls_everything() {
        let s = SpeedMetrics::calculate(12.0, None);
        assert_eq!(s, SpeedMetrics::unavailable());
        assert!(!s.is_available());
    }

    #[test]
    fn zero_pages_nulls_everything() {
        assert_eq!(SpeedMetrics::calculate(12.0, Some(0)), SpeedMetrics::unavailable());
    }

    #[test]
    fn non_positive_duration_nulls_everything() {
        assert_eq!(SpeedMetrics::calculate(0.0, Some(5)), SpeedMetrics::unavailable());
        assert_eq!(SpeedMetrics::calculate(-1.0, Some(5)), SpeedMetrics::unavailable());
        assert_eq!(
            SpeedMetrics::calculate(f64::NAN, Some(5)),
            SpeedMetrics::unavailable()
        );
    }

    #[test]
    fn unavailable_serialises_as_nulls() {
        let json = serde_json::to_value(SpeedMetrics::unavailable()).unwrap();
        assert!(json["seconds_per_page"].is_null());
        assert!(json["pages_per_minute"].is_null());
        assert!(json["pages_per_second"].is_null());
    }
}
