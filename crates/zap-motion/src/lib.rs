//! Spring, tween and orientation animation of numeric fields on caller-owned
//! host objects.
//!
//! Register a host, request animations toward [`Target`]s, and call
//! [`Animator::step`] (or [`Animator::tick`]) once per frame:
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//! use zap_motion::{Animator, SpringParams, Target, Value};
//!
//! let card = Rc::new(RefCell::new(Value::record([("opacity", Value::from(0.0))])));
//! let mut animator = Animator::new();
//! let handle = animator.register(&card);
//! animator.spring_to(handle, Target::field("opacity", 1.0), Some(SpringParams::exponential(0.5)))?;
//! while animator.has_active_animations() {
//!     animator.step(1.0 / 60.0)?;
//! }
//! # Ok::<(), zap_motion::AnimatorError>(())
//! ```

pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod extensions;
pub mod error;

// Re-export key types at crate root for convenience
pub use api::config::AnimatorConfig;
pub use api::types::{AnimationEvent, EventKind, FieldPath, HostHandle, PathSegment};
pub use components::target::Target;
pub use components::value::{Animatable, Value};
pub use core::hosts::{HostRegistry, SharedHost};
pub use core::params::{DampingRegime, PhysicsParameters, SpringParams, SETTLE_CONSTANT};
pub use core::spring::{step_spring, SpringState};
pub use core::time::TickClock;
pub use error::{AnimatorError, Result};
pub use systems::animator::Animator;
pub use systems::events::{EventHub, Listener, Subscription};
pub use systems::field::{AnimationKind, FieldAnimation};

// Extensions: tween curves and orientation springs
pub use extensions::{
    Easing, lerp, ease,
    Tween,
    DirectionMode, DirectionVelocity, OrientationSpring, OrientationSettle, unwrap_angle,
};
