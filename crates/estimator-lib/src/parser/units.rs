//! Unit conversions for raw instrumentation figures
//!
//! The dump reports network traffic in megabytes per sampling window and
//! redo volume in megabytes per second; everything downstream works in
//! bytes per calendar day.

const MINUTES_PER_DAY: f64 = 1440.0;
const SECONDS_PER_DAY: f64 = 86400.0;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Sampling window assumed when no section supplies a duration.
pub const DEFAULT_WINDOW_MINUTES: f64 = 60.0;

/// Megabytes observed over a `window_minutes` sampling window, scaled to
/// bytes per day.
pub fn mb_per_window_to_bytes_per_day(mb: f64, window_minutes: f64) -> f64 {
    let minutes = if window_minutes > 0.0 {
        window_minutes
    } else {
        DEFAULT_WINDOW_MINUTES
    };
    mb * (MINUTES_PER_DAY / minutes) * BYTES_PER_MB
}

/// Megabytes-per-second rate scaled to bytes per day.
pub fn mb_per_sec_to_bytes_per_day(mb_per_s: f64) -> f64 {
    mb_per_s * SECONDS_PER_DAY * BYTES_PER_MB
}

/// Bytes to gigabytes.
pub fn bytes_to_gb(bytes: f64) -> f64 {
    bytes / (1024.0 * 1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_conversion_is_exact() {
        // 1024 MB over a 60-minute window = 1024 MB × 24 windows/day
        let expected = 1024.0 * 24.0 * 1024.0 * 1024.0;
        assert_eq!(mb_per_window_to_bytes_per_day(1024.0, 60.0), expected);
    }

    #[test]
    fn test_per_second_conversion_is_exact() {
        let expected = 86400.0 * 1024.0 * 1024.0;
        assert_eq!(mb_per_sec_to_bytes_per_day(1.0), expected);
    }

    #[test]
    fn test_zero_window_falls_back_to_default() {
        assert_eq!(
            mb_per_window_to_bytes_per_day(10.0, 0.0),
            mb_per_window_to_bytes_per_day(10.0, DEFAULT_WINDOW_MINUTES)
        );
    }

    #[test]
    fn test_bytes_to_gb() {
        assert_eq!(bytes_to_gb(2.0 * 1024.0 * 1024.0 * 1024.0), 2.0);
    }
}
