// extensions/easing.rs
//
// Easing curves for tweens. Each curve maps normalized progress in [0, 1]
// to eased progress; only `Back` leaves that range.

use std::f64::consts::FRAC_PI_2;

/// Progress curve for a tween.
#[derive(Debug, Clone, Copy, Default)]
pub enum Easing {
    /// Constant velocity.
    #[default]
    Linear,
    QuadIn,
    QuadOut,
    QuadInOut,
    /// Slow start.
    CubicIn,
    /// Slow end.
    CubicOut,
    /// Slow start and end.
    CubicInOut,
    SineIn,
    SineOut,
    SineInOut,
    /// Overshoots the target slightly, then settles back.
    BackOut,
    /// Caller-supplied curve. Should map 0 to 0 and 1 to 1.
    ///
    /// A plain function pointer, so the curve cannot capture state; build
    /// parameterized curves as named functions or compose a built-in one.
    Custom(fn(f64) -> f64),
}

impl Easing {
    /// Eased progress for `t`, clamped to [0, 1] first.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadIn => quad(t),
            Easing::QuadOut => reverse(quad, t),
            Easing::QuadInOut => mirror(quad, t),
            Easing::CubicIn => cubic(t),
            Easing::CubicOut => reverse(cubic, t),
            Easing::CubicInOut => mirror(cubic, t),
            Easing::SineIn => sine(t),
            Easing::SineOut => reverse(sine, t),
            Easing::SineInOut => mirror(sine, t),
            Easing::BackOut => reverse(back, t),
            Easing::Custom(curve) => curve(t),
        }
    }
}

fn quad(t: f64) -> f64 {
    t * t
}

fn cubic(t: f64) -> f64 {
    t * t * t
}

fn sine(t: f64) -> f64 {
    1.0 - (t * FRAC_PI_2).cos()
}

fn back(t: f64) -> f64 {
    const C1: f64 = 1.70158;
    (C1 + 1.0) * t * t * t - C1 * t * t
}

/// The "out" form of an "in" curve.
fn reverse(curve: fn(f64) -> f64, t: f64) -> f64 {
    1.0 - curve(1.0 - t)
}

/// "In" for the first half, "out" for the second.
fn mirror(curve: fn(f64) -> f64, t: f64) -> f64 {
    if t < 0.5 {
        curve(2.0 * t) / 2.0
    } else {
        1.0 - curve(2.0 - 2.0 * t) / 2.0
    }
}

/// Linearly interpolate between two values.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Interpolate with easing.
#[inline]
pub fn ease(a: f64, b: f64, t: f64, easing: Easing) -> f64 {
    lerp(a, b, easing.apply(t))
}
