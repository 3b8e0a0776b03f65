//! Progress estimation for streaming transcodes.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::ProgressCallback;

static TIME_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=(\d{2,}):(\d{2}):(\d{2}(?:\.\d+)?)").expect("time marker pattern is valid")
});

/// Turns lines of tool output into completion fractions.
///
/// Stateless: it never reads the tool's output itself.
pub struct ProgressTracker;

impl ProgressTracker {
    /// Extracts the elapsed time in seconds from a `time=HH:MM:SS` marker.
    pub fn parse_elapsed(line: &str) -> Option<f64> {
        let caps = TIME_MARKER.captures(line)?;
        let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
        let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
        let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
        Some(hours * 3600.0 + minutes * 60.0 + seconds)
    }

    /// Elapsed time divided by `duration_secs`. Not clamped: markers past
    /// the duration yield values at or above 1.0.
    pub fn fraction(line: &str, duration_secs: f64) -> Option<f64> {
        if duration_secs <= 0.0 {
            return None;
        }
        Self::parse_elapsed(line).map(|elapsed| elapsed / duration_secs)
    }
}

/// Per-request progress state: the probed duration, the last fraction
/// reported and the caller's callback.
pub struct ProgressAccumulator {
    duration_secs: f64,
    last: f64,
    callback: Option<ProgressCallback>,
}

impl ProgressAccumulator {
    /// Creates an accumulator for a conversion of the given duration.
    pub fn new(duration_secs: f64, callback: Option<ProgressCallback>) -> Self {
        Self {
            duration_secs,
            last: 0.0,
            callback,
        }
    }

    /// Feeds one line of tool output. Returns the reported fraction when the
    /// line carried a time marker.
    ///
    /// Reported values are clamped to `[0, 1]` and never decrease.
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let raw = ProgressTracker::fraction(line, self.duration_secs)?;
        let fraction = raw.clamp(0.0, 1.0).max(self.last);
        self.last = fraction;
        if let Some(callback) = self.callback.as_mut() {
            callback(fraction);
        }
        Some(fraction)
    }

    /// The last reported fraction.
    pub fn last(&self) -> f64 {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_parse_elapsed_stats_line() {
        let line = "frame=  240 fps= 60 q=28.0 size=512kB time=00:01:30.50 bitrate=46.3kbits/s";
        assert_eq!(ProgressTracker::parse_elapsed(line), Some(90.5));
    }

    #[test]
    fn test_parse_elapsed_progress_key() {
        assert_eq!(
            ProgressTracker::parse_elapsed("out_time=01:00:02.000000"),
            Some(3602.0)
        );
    }

    #[test]
    fn test_parse_elapsed_ignores_other_lines() {
        assert_eq!(ProgressTracker::parse_elapsed("out_time_ms=1500000"), None);
        assert_eq!(ProgressTracker::parse_elapsed("out_time=N/A"), None);
        assert_eq!(ProgressTracker::parse_elapsed("Stream #0:0: Video: h264"), None);
        assert_eq!(ProgressTracker::parse_elapsed(""), None);
    }

    #[test]
    fn test_fraction_is_not_clamped() {
        assert_eq!(ProgressTracker::fraction("time=00:00:30", 60.0), Some(0.5));
        let over = ProgressTracker::fraction("time=00:02:00", 60.0).unwrap();
        assert!(over >= 1.0);
    }

    #[test]
    fn test_fraction_with_zero_duration() {
        assert_eq!(ProgressTracker::fraction("time=00:00:30", 0.0), None);
    }

    #[test]
    fn test_increasing_markers_are_monotonic() {
        let fractions: Vec<f64> = (0..10)
            .map(|s| format!("time=00:00:{:02}.00", s * 5))
            .filter_map(|line| ProgressTracker::fraction(&line, 50.0))
            .collect();
        assert_eq!(fractions.len(), 10);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_accumulator_clamps_and_never_decreases() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut acc = ProgressAccumulator::new(
            10.0,
            Some(Box::new(move |f| sink.lock().unwrap().push(f))),
        );

        assert_eq!(acc.observe("time=00:00:05"), Some(0.5));
        assert_eq!(acc.observe("noise"), None);
        assert_eq!(acc.observe("time=00:00:02"), Some(0.5));
        assert_eq!(acc.observe("time=00:00:20"), Some(1.0));

        assert_eq!(*seen.lock().unwrap(), vec![0.5, 0.5, 1.0]);
        assert_eq!(acc.last(), 1.0);
    }

    #[test]
    fn test_accumulator_without_callback() {
        let mut acc = ProgressAccumulator::new(4.0, None);
        assert_eq!(acc.observe("time=00:00:01"), Some(0.25));
    }
}
