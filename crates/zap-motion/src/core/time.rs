use std::time::Instant;

/// Wall-clock frame delta for `Animator::tick`.
/// The first call has no previous frame to measure from and reports a fixed step.
pub struct TickClock {
    /// Delta reported by the first call.
    first_dt: f64,
    /// When the previous call happened.
    last: Option<Instant>,
}

impl TickClock {
    pub fn new(first_dt: f64) -> Self {
        Self {
            first_dt,
            last: None,
        }
    }

    /// Seconds since the previous call.
    pub fn delta(&mut self) -> f64 {
        self.delta_at(Instant::now())
    }

    /// Seconds between the previous call and `now`. Never negative.
    pub fn delta_at(&mut self, now: Instant) -> f64 {
        let dt = match self.last {
            Some(previous) => now.saturating_duration_since(previous).as_secs_f64(),
            None => self.first_dt,
        };
        self.last = Some(now);
        dt
    }

    /// Forget the previous frame, e.g. after the loop was paused.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
