//! Spring parameter derivation.
//!
//! Callers describe a spring by how long it should take to settle (and how
//! much it should bounce); [`SpringParams::resolve`] turns that into the
//! `strength`/`damping` pair the oscillator integrates.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// `2y` where `(1 + y)e^-y = 0.001`.
///
/// A critically damped spring with `damping = SETTLE_CONSTANT / T`, released
/// from rest, is within 0.1% of its target after `T` seconds.
pub const SETTLE_CONSTANT: f64 = 18.466_826_952_903;

/// Coefficients of `x'' = -strength (x - target) - damping x'`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsParameters {
    pub strength: f64,
    pub damping: f64,
}

/// Which closed form applies to a parameter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DampingRegime {
    /// `4k > b²`: decaying oscillation.
    Underdamped,
    /// `4k = b²`: fastest approach without overshoot.
    Critical,
    /// `4k < b²`: slow, non-oscillating approach.
    Overdamped,
}

impl PhysicsParameters {
    /// Infinitely stiff: the oscillator snaps to its target on the next step.
    pub const INSTANT: Self = Self {
        strength: f64::INFINITY,
        damping: f64::INFINITY,
    };

    pub fn new(strength: f64, damping: f64) -> Self {
        Self { strength, damping }
    }

    /// The strength at which this damping is exactly critical.
    pub fn critical_strength(&self) -> f64 {
        self.damping * self.damping / 4.0
    }

    pub fn is_instant(&self) -> bool {
        !self.strength.is_finite() || !self.damping.is_finite()
    }

    pub fn regime(&self) -> DampingRegime {
        let discriminant = 4.0 * self.strength - self.damping * self.damping;
        if discriminant > 0.0 {
            DampingRegime::Underdamped
        } else if discriminant < 0.0 {
            DampingRegime::Overdamped
        } else {
            DampingRegime::Critical
        }
    }
}

/// How a caller describes a spring. Deserializes from any of
/// `{"duration_s", "bounce"}`, `{"duration_s"}` or `{"strength", "damping"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpringParams {
    /// Critically damped base with an added oscillation of `bounce` cycles per
    /// half duration. `bounce <= 0` is plain exponential.
    Underdamped { duration_s: f64, bounce: f64 },
    /// Critically damped; settles to within 0.1% after `duration_s`.
    Exponential { duration_s: f64 },
    /// Raw coefficients, used as-is.
    Physics(PhysicsParameters),
}

impl SpringParams {
    pub fn exponential(duration_s: f64) -> Self {
        SpringParams::Exponential { duration_s }
    }

    pub fn underdamped(duration_s: f64, bounce: f64) -> Self {
        SpringParams::Underdamped { duration_s, bounce }
    }

    pub fn physics(strength: f64, damping: f64) -> Self {
        SpringParams::Physics(PhysicsParameters::new(strength, damping))
    }

    /// The coefficients the oscillator integrates.
    pub fn resolve(&self) -> PhysicsParameters {
        match *self {
            SpringParams::Underdamped { duration_s, bounce } => underdamped(duration_s, bounce),
            SpringParams::Exponential { duration_s } => exponential(duration_s),
            SpringParams::Physics(params) => params,
        }
    }
}

impl From<PhysicsParameters> for SpringParams {
    fn from(params: PhysicsParameters) -> Self {
        SpringParams::Physics(params)
    }
}

/// Critically damped coefficients settling within 0.1% after `duration_s`.
/// Non-positive durations are instant.
pub fn exponential(duration_s: f64) -> PhysicsParameters {
    if duration_s <= 0.0 {
        return PhysicsParameters::INSTANT;
    }
    let damping = SETTLE_CONSTANT / duration_s;
    PhysicsParameters {
        strength: damping * damping / 4.0,
        damping,
    }
}

/// [`exponential`] damping, with strength raised by `(4π·bounce / duration)²`
/// so the envelope is unchanged and only oscillation is added.
pub fn underdamped(duration_s: f64, bounce: f64) -> PhysicsParameters {
    let base = exponential(duration_s);
    if base.is_instant() {
        return base;
    }
    let omega = 4.0 * PI * bounce.max(0.0) / duration_s;
    PhysicsParameters {
        strength: base.strength + omega * omega,
        damping: base.damping,
    }
}
