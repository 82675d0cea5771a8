use std::time::Duration;

/// Converts between seconds and scheduling ticks of a fixed-rate display.
///
/// One tick spans `screentick_factor` refreshes. Conversion to ticks
/// truncates, once, so schedules hold exact integer counts afterwards.
/// Products within `1e-9` below an integer count as that integer, so
/// `2.3 s` at 60 Hz is 138 ticks rather than 137.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameClock {
    pub refresh_rate_hz: f64,
    pub screentick_factor: u32,
}

impl FrameClock {
    pub fn new(refresh_rate_hz: f64, screentick_factor: u32) -> Self {
        Self {
            refresh_rate_hz,
            screentick_factor: screentick_factor.max(1),
        }
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.refresh_rate_hz / self.screentick_factor as f64
    }

    pub fn ticks_for(&self, seconds: f64) -> u64 {
        (seconds * self.ticks_per_second() + 1e-9) as u64
    }

    /// Fractional tick count, for means and jitter bounds that are drawn
    /// from before truncation.
    pub fn ticks_for_exact(&self, seconds: f64) -> f64 {
        seconds * self.ticks_per_second()
    }

    pub fn seconds_for(&self, ticks: u64) -> f64 {
        ticks as f64 / self.ticks_per_second()
    }

    /// Display refreshes making up `ticks`.
    pub fn frames_for_ticks(&self, ticks: u64) -> u64 {
        ticks * self.screentick_factor.max(1) as u64
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate_hz)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(60.0, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_with_truncation() {
        let clock = FrameClock::new(60.0, 1);
        assert_eq!(clock.ticks_for(2.0), 120);
        assert_eq!(clock.ticks_for(0.999), 59);
        assert_eq!(clock.ticks_for(2.3), 138);
        assert!((clock.seconds_for(90) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn screentick_factor_groups_refreshes() {
        let clock = FrameClock::new(120.0, 2);
        assert_eq!(clock.ticks_for(1.0), 60);
        assert_eq!(clock.frames_for_ticks(60), 120);
        assert_eq!(clock.refresh_period(), Duration::from_secs_f64(1.0 / 120.0));
    }

    #[test]
    fn zero_factor_is_treated_as_one() {
        assert_eq!(FrameClock::new(60.0, 0).screentick_factor, 1);
    }
}
