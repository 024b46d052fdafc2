//! Closed-form damped harmonic oscillator.
//!
//! Solves `x'' = -k (x - target) - b x'` exactly over the whole step, one
//! formula per damping regime. Nothing is sub-stepped, so the result does not
//! depend on how a span of time is split into steps, and arbitrarily large
//! steps stay bounded.

use super::params::PhysicsParameters;

/// Position, velocity and target of one scalar oscillator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpringState {
    pub x: f64,
    pub v: f64,
    pub target: f64,
}

impl SpringState {
    pub fn new(x: f64, v: f64, target: f64) -> Self {
        Self { x, v, target }
    }

    pub fn at_rest(&self) -> bool {
        self.x == self.target && self.v == 0.0
    }
}

/// Advance `state` by `dt` seconds toward `state.target`.
///
/// Returns the potential energy `½·k·(x - target)²` after the step.
/// Non-finite coefficients or state snap the oscillator onto its target.
pub fn step_spring(dt: f64, state: &mut SpringState, params: PhysicsParameters) -> f64 {
    let PhysicsParameters { strength: k, damping: b } = params;
    let x0 = state.x - state.target;
    let v0 = state.v;

    if !(k.is_finite() && b.is_finite() && x0.is_finite() && v0.is_finite()) {
        state.x = state.target;
        state.v = 0.0;
        return 0.0;
    }
    if dt == 0.0 || (x0 == 0.0 && v0 == 0.0) {
        return 0.5 * k * x0 * x0;
    }

    let gamma = 0.5 * b;
    let discriminant = 4.0 * k - b * b;
    // v0 + γ·x0 appears in every regime
    let j = v0 + gamma * x0;

    let (x, v) = if discriminant > 0.0 {
        let omega = 0.5 * discriminant.sqrt();
        let decay = (-gamma * dt).exp();
        let (sin, cos) = (omega * dt).sin_cos();
        (
            decay * (x0 * cos + j / omega * sin),
            decay * (v0 * cos - (gamma * v0 + k * x0) / omega * sin),
        )
    } else if discriminant < 0.0 {
        // s <= γ for k >= 0, so neither exponent grows.
        let s = 0.5 * (-discriminant).sqrt();
        let slow = ((s - gamma) * dt).exp();
        let fast = (-(s + gamma) * dt).exp();
        let cosh = 0.5 * (slow + fast);
        let sinh = 0.5 * (slow - fast);
        (
            x0 * cosh + j / s * sinh,
            v0 * cosh - (gamma * v0 + k * x0) / s * sinh,
        )
    } else {
        let decay = (-gamma * dt).exp();
        (decay * (x0 + j * dt), decay * (v0 - gamma * j * dt))
    };

    state.x = state.target + x;
    state.v = v;
    0.5 * k * x * x
}
