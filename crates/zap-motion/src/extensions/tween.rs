// extensions/tween.rs
//
// Time-based field animation: interpolate from the value a field had when the
// tween started to its target over a fixed duration, shaped by an easing curve.
// The animator clock supplies `now`; a tween keeps no clock of its own.

use super::easing::{ease, Easing};

/// Bookkeeping for one tweened field.
#[derive(Debug, Clone, Copy)]
pub struct Tween {
    /// Field value when the tween was requested.
    pub start: f64,
    /// Animator time when the tween was requested.
    pub start_time: f64,
    /// Duration in seconds.
    pub duration_s: f64,
    pub easing: Easing,
}

impl Tween {
    pub fn new(start: f64, start_time: f64, duration_s: f64, easing: Easing) -> Self {
        Self {
            start,
            start_time,
            duration_s,
            easing,
        }
    }

    /// Seconds since the tween started.
    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.start_time).max(0.0)
    }

    /// Normalized progress [0, 1].
    pub fn progress(&self, now: f64) -> f64 {
        if self.duration_s <= 0.0 {
            1.0
        } else {
            (self.elapsed(now) / self.duration_s).clamp(0.0, 1.0)
        }
    }

    /// Interpolated value at `now` on the way to `target`.
    pub fn value_at(&self, target: f64, now: f64) -> f64 {
        if self.is_complete(now) {
            return target;
        }
        ease(self.start, target, self.progress(now), self.easing)
    }

    pub fn is_complete(&self, now: f64) -> bool {
        self.elapsed(now) >= self.duration_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_tween_midpoint() {
        let tween = Tween::new(0.0, 2.0, 1.0, Easing::Linear);
        assert!((tween.value_at(100.0, 2.5) - 50.0).abs() < 1e-9);
        assert!(!tween.is_complete(2.5));
    }

    #[test]
    fn lands_exactly_on_target() {
        let tween = Tween::new(0.3, 0.0, 0.75, Easing::Custom(|t| t * t));
        assert_eq!(tween.value_at(1.0, 0.75), 1.0);
        assert!(tween.is_complete(0.75));
        assert_eq!(tween.value_at(1.0, 10.0), 1.0);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let tween = Tween::new(5.0, 1.0, 0.0, Easing::CubicInOut);
        assert_eq!(tween.progress(1.0), 1.0);
        assert!(tween.is_complete(1.0));
        assert_eq!(tween.value_at(9.0, 1.0), 9.0);
    }

    #[test]
    fn easing_shapes_progress() {
        let tween = Tween::new(0.0, 0.0, 1.0, Easing::CubicIn);
        assert!((tween.value_at(1.0, 0.5) - 0.125).abs() < 1e-12);
    }

    #[test]
    fn before_start_holds_start_value() {
        let tween = Tween::new(4.0, 1.0, 1.0, Easing::Linear);
        assert_eq!(tween.value_at(8.0, 0.5), 4.0);
    }
}
