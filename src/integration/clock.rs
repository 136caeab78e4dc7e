//! Experiment-relative time axis.

/// Time since `initial` in output units.
///
/// `timestamp == initial` yields exactly `0.0`. A timestamp earlier than
/// `initial` gives a negative value rather than wrapping.
#[inline]
pub fn elapsed(timestamp: u64, initial: u64, divisor: f64) -> f64 {
    (i128::from(timestamp) - i128::from(initial)) as f64 / divisor
}

/// Origin of the elapsed-time axis for the current tracking session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineClock {
    initial: Option<u64>,
}

impl PipelineClock {
    /// Latch `timestamp` as the origin if none is set; return the origin.
    pub fn observe(&mut self, timestamp: u64) -> u64 {
        *self.initial.get_or_insert(timestamp)
    }

    pub fn reset(&mut self) {
        self.initial = None;
    }

    pub fn initial(&self) -> Option<u64> {
        self.initial
    }

    /// Elapsed time of `timestamp`, or `None` before the origin is latched.
    pub fn elapsed(&self, timestamp: u64, divisor: f64) -> Option<f64> {
        self.initial.map(|initial| elapsed(timestamp, initial, divisor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed() {
        assert_eq!(elapsed(1000, 1000, 1.0), 0.0);
        assert_eq!(elapsed(1100, 1000, 1.0), 100.0);
        assert_eq!(elapsed(1_500_000_000, 1_000_000_000, 1e9), 0.5);
        assert_eq!(elapsed(900, 1000, 1.0), -100.0);
        assert_eq!(elapsed(u64::MAX, 0, 1.0), u64::MAX as f64);
    }

    #[test]
    fn test_clock_latches_first_timestamp() {
        let mut clock = PipelineClock::default();
        assert_eq!(clock.elapsed(5, 1.0), None);

        assert_eq!(clock.observe(1000), 1000);
        assert_eq!(clock.observe(2000), 1000);
        assert_eq!(clock.elapsed(2000, 1.0), Some(1000.0));

        clock.reset();
        assert_eq!(clock.initial(), None);
        assert_eq!(clock.observe(7000), 7000);
    }
}
