//! Frame timing and context

/// State of the frame currently being run
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    /// Event that triggered the frame
    pub event: String,
    /// Frame counter, starting at 1 for the first frame
    pub tick: u64,
    /// Clamped seconds since the previous frame
    pub delta_time: f64,
    /// Sum of all deltas so far
    pub elapsed: f64,
}

/// Frame counter and accumulated time
#[derive(Debug, Clone)]
pub struct FrameClock {
    tick: u64,
    elapsed: f64,
    max_delta_time: f64,
}

impl FrameClock {
    /// Create a new clock.
    ///
    /// A negative or NaN cap is treated as 0.
    pub fn new(max_delta_time: f64) -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
            max_delta_time: max_delta_time.max(0.0),
        }
    }

    /// Start a new frame
    pub fn advance(&mut self, event: &str, delta_time: f64) -> FrameState {
        let delta_time = if delta_time.is_finite() {
            delta_time.max(0.0).min(self.max_delta_time)
        } else {
            0.0
        };

        self.tick += 1;
        self.elapsed += delta_time;

        FrameState {
            event: event.to_string(),
            tick: self.tick,
            delta_time,
            elapsed: self.elapsed,
        }
    }

    /// Frames started so far
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Total elapsed time
    #[inline]
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let mut clock = FrameClock::new(0.25);

        let first = clock.advance("default", 0.1);
        assert_eq!(first.tick, 1);
        assert_eq!(first.elapsed, 0.1);

        let second = clock.advance("default", 0.1);
        assert_eq!(second.tick, 2);
        assert!((second.elapsed - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut clock = FrameClock::new(0.25);

        assert_eq!(clock.advance("default", 3.0).delta_time, 0.25);
        assert_eq!(clock.advance("default", -1.0).delta_time, 0.0);
        assert_eq!(clock.advance("default", f64::NAN).delta_time, 0.0);
        assert_eq!(clock.tick(), 3);
    }

    #[test]
    fn test_out_of_range_cap() {
        let mut clock = FrameClock::new(-1.0);
        assert_eq!(clock.advance("default", 0.5).delta_time, 0.0);

        let mut clock = FrameClock::new(f64::NAN);
        assert_eq!(clock.advance("default", 0.5).delta_time, 0.0);

        let mut clock = FrameClock::new(f64::INFINITY);
        assert_eq!(clock.advance("default", 10.0).delta_time, 10.0);
        assert_eq!(clock.advance("default", f64::INFINITY).delta_time, 0.0);
    }
}
