// extensions/mod.rs
//
// Animation kinds layered on top of the core oscillator.
// Easing and tweens are plain math; orientation springs compose scalar springs
// over a direction and a roll angle.

pub mod easing;
pub mod orientation;
pub mod tween;

pub use easing::{Easing, lerp, ease};
pub use orientation::{
    DirectionMode, DirectionVelocity, OrientationSettle, OrientationSpring, OrientationSprings,
    unwrap_angle,
};
pub use tween::Tween;
