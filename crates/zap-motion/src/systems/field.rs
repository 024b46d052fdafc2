//! Per-field animation state and the step function for each kind.

use crate::core::params::PhysicsParameters;
use crate::core::spring::{step_spring, SpringState};
use crate::extensions::tween::Tween;

/// How a field moves toward its target.
#[derive(Debug, Clone, Copy)]
pub enum AnimationKind {
    /// Physically simulated; keeps velocity across retargets.
    Spring { params: PhysicsParameters },
    /// Time-based interpolation from a start value.
    Tween(Tween),
}

/// Active animation of a single numeric leaf.
#[derive(Debug, Clone, Copy)]
pub struct FieldAnimation {
    pub target: f64,
    pub kind: AnimationKind,
    /// Current rate of change. Integrated for springs, reconstructed for tweens.
    pub velocity: f64,
    /// Animator time of the request (or latest retarget).
    pub started_at: f64,
}

/// Settling thresholds for spring fields.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Settle {
    pub position: f64,
    pub velocity: f64,
}

/// Result of stepping one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FieldStep {
    /// Value to write back to the host.
    pub value: f64,
    pub complete: bool,
}

impl FieldAnimation {
    pub fn spring(target: f64, params: PhysicsParameters, now: f64) -> Self {
        Self {
            target,
            kind: AnimationKind::Spring { params },
            velocity: 0.0,
            started_at: now,
        }
    }

    pub fn tween(target: f64, tween: Tween) -> Self {
        Self {
            target,
            kind: AnimationKind::Tween(tween),
            velocity: 0.0,
            started_at: tween.start_time,
        }
    }

    pub fn is_spring(&self) -> bool {
        matches!(self.kind, AnimationKind::Spring { .. })
    }

    /// Point a running spring at a new target, keeping its velocity.
    /// Returns false (and changes nothing) for non-spring animations.
    pub fn retarget(&mut self, target: f64, params: PhysicsParameters, now: f64) -> bool {
        let AnimationKind::Spring { params: current } = &mut self.kind else {
            return false;
        };
        *current = params;
        self.target = target;
        self.started_at = now;
        true
    }

    /// Advance from the host's `current` value by `dt`; `now` is the animator
    /// time after the step.
    pub(crate) fn step(&mut self, current: f64, dt: f64, now: f64, settle: Settle) -> FieldStep {
        match self.kind {
            AnimationKind::Spring { params } => step_spring_field(self, params, current, dt, settle),
            AnimationKind::Tween(tween) => step_tween_field(self, tween, current, dt, now),
        }
    }

    /// End the animation on its target, as when it exceeds the maximum duration.
    pub(crate) fn force_complete(&mut self) -> FieldStep {
        self.velocity = 0.0;
        FieldStep {
            value: self.target,
            complete: true,
        }
    }
}

fn step_spring_field(
    anim: &mut FieldAnimation,
    params: PhysicsParameters,
    current: f64,
    dt: f64,
    settle: Settle,
) -> FieldStep {
    let mut state = SpringState::new(current, anim.velocity, anim.target);
    step_spring(dt, &mut state, params);
    anim.velocity = state.v;

    let settled =
        (state.x - anim.target).abs() < settle.position && state.v.abs() < settle.velocity;
    if settled {
        anim.force_complete()
    } else {
        FieldStep {
            value: state.x,
            complete: false,
        }
    }
}

fn step_tween_field(
    anim: &mut FieldAnimation,
    tween: Tween,
    current: f64,
    dt: f64,
    now: f64,
) -> FieldStep {
    let value = tween.value_at(anim.target, now);
    anim.velocity = if dt > 0.0 { (value - current) / dt } else { 0.0 };
    FieldStep {
        value,
        complete: tween.is_complete(now),
    }
}
