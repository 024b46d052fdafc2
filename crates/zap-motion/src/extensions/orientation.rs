// extensions/orientation.rs
//
// Orientation springs: drive a quaternion-valued field toward a target
// rotation by springing the forward direction and the roll about it, rather
// than springing the four quaternion components independently.
//
// The quaternion lives in the host as four leaves `<prefix>.x/y/z/w`.
// Forward is the rotated +Z axis, up is the rotated +Y axis.

use std::f64::consts::TAU;

use glam::{DMat3, DQuat, DVec2, DVec3};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::api::types::{FieldPath, HostHandle};
use crate::components::value::Animatable;
use crate::core::params::PhysicsParameters;
use crate::core::spring::{step_spring, SpringState};

pub const FORWARD: DVec3 = DVec3::Z;
pub const UP: DVec3 = DVec3::Y;
pub const RIGHT: DVec3 = DVec3::X;

/// Leaf names of a quaternion field, in `DQuat::from_xyzw` order.
pub const QUAT_COMPONENTS: [&str; 4] = ["x", "y", "z", "w"];

/// How the forward direction is sprung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DirectionMode {
    /// Spring the three components, then renormalize.
    #[default]
    Cartesian,
    /// Spring elevation and azimuth, unwrapped so the path never jumps a branch cut.
    Spherical,
}

/// Angular velocity of the forward direction, in the mode's own coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DirectionVelocity {
    /// Per-second change of the direction's x, y, z.
    Cartesian(DVec3),
    /// Per-second change of (elevation, azimuth) in radians.
    Spherical(DVec2),
}

impl DirectionVelocity {
    pub fn length_squared(&self) -> f64 {
        match self {
            DirectionVelocity::Cartesian(v) => v.length_squared(),
            DirectionVelocity::Spherical(v) => v.length_squared(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DirectionState {
    Cartesian {
        velocity: DVec3,
    },
    Spherical {
        /// Unwrapped (elevation, azimuth) of the current direction.
        angles: DVec2,
        velocity: DVec2,
        /// Unwrapped target angles from the previous step.
        target_angles: DVec2,
    },
}

impl DirectionState {
    fn new(mode: DirectionMode, direction: DVec3) -> Self {
        match mode {
            DirectionMode::Cartesian => DirectionState::Cartesian {
                velocity: DVec3::ZERO,
            },
            DirectionMode::Spherical => {
                let angles = to_angles(direction);
                DirectionState::Spherical {
                    angles,
                    velocity: DVec2::ZERO,
                    target_angles: angles,
                }
            }
        }
    }

    fn mode(&self) -> DirectionMode {
        match self {
            DirectionState::Cartesian { .. } => DirectionMode::Cartesian,
            DirectionState::Spherical { .. } => DirectionMode::Spherical,
        }
    }
}

/// When an orientation spring counts as settled.
#[derive(Debug, Clone, Copy)]
pub struct OrientationSettle {
    /// `|current · target|` must exceed this.
    pub dot: f64,
    /// Squared direction speed and absolute roll speed must be below this.
    pub velocity: f64,
}

/// Spring state for one quaternion field.
#[derive(Debug, Clone)]
pub struct OrientationSpring {
    current: DQuat,
    target: DQuat,
    /// Unit forward axis of `current`.
    direction: DVec3,
    state: DirectionState,
    roll_velocity: f64,
    /// Unwrapped roll error remaining after the previous step.
    roll_error: f64,
    /// `None` snaps to the target on the next step.
    params: Option<PhysicsParameters>,
    started_at: f64,
}

impl OrientationSpring {
    pub fn new(
        current: DQuat,
        target: DQuat,
        params: Option<PhysicsParameters>,
        mode: DirectionMode,
        now: f64,
    ) -> Self {
        let current = current.normalize();
        let direction = current * FORWARD;
        Self {
            current,
            target: target.normalize(),
            direction,
            state: DirectionState::new(mode, direction),
            roll_velocity: 0.0,
            roll_error: 0.0,
            params,
            started_at: now,
        }
    }

    /// New target and parameters. Velocities carry over unless the mode changes.
    pub fn retarget(
        &mut self,
        target: DQuat,
        params: Option<PhysicsParameters>,
        mode: DirectionMode,
        now: f64,
    ) {
        self.target = target.normalize();
        self.params = params;
        self.started_at = now;
        if self.state.mode() != mode {
            self.state = DirectionState::new(mode, self.direction);
        }
    }

    pub fn current(&self) -> DQuat {
        self.current
    }

    pub fn target(&self) -> DQuat {
        self.target
    }

    pub fn direction(&self) -> DVec3 {
        self.direction
    }

    pub fn mode(&self) -> DirectionMode {
        self.state.mode()
    }

    pub fn direction_velocity(&self) -> DirectionVelocity {
        match self.state {
            DirectionState::Cartesian { velocity } => DirectionVelocity::Cartesian(velocity),
            DirectionState::Spherical { velocity, .. } => DirectionVelocity::Spherical(velocity),
        }
    }

    pub fn roll_velocity(&self) -> f64 {
        self.roll_velocity
    }

    pub fn started_at(&self) -> f64 {
        self.started_at
    }

    pub fn is_settled(&self, settle: OrientationSettle) -> bool {
        self.current.dot(self.target).abs() > settle.dot
            && self.direction_velocity().length_squared() < settle.velocity
            && self.roll_velocity.abs() < settle.velocity
    }

    /// Jump to the target and stop.
    pub fn snap(&mut self) {
        self.current = self.target;
        self.direction = self.target * FORWARD;
        self.state = DirectionState::new(self.state.mode(), self.direction);
        self.roll_velocity = 0.0;
        self.roll_error = 0.0;
    }

    /// Advance by `dt`. Returns true once settled (or snapped).
    pub fn step(&mut self, dt: f64, settle: OrientationSettle) -> bool {
        let params = match self.params {
            Some(params) if !params.is_instant() => params,
            _ => {
                self.snap();
                return true;
            }
        };

        let target_forward = self.target * FORWARD;
        let target_up = self.target * UP;

        self.direction = match &mut self.state {
            DirectionState::Cartesian { velocity } => {
                step_cartesian(dt, self.direction, velocity, target_forward, params)
            }
            DirectionState::Spherical {
                angles,
                velocity,
                target_angles,
            } => step_spherical(dt, angles, velocity, target_angles, target_forward, params),
        };
        let forward = self.direction;
        let aligned = realign(self.current, forward);

        // Roll: where the target's up axis would sit once the directions match.
        let transport = DQuat::from_rotation_arc(target_forward, forward);
        let desired_up = transport * target_up;
        let up = aligned * UP;
        let raw_error = up.cross(desired_up).dot(forward).atan2(up.dot(desired_up));
        let error = unwrap_angle(raw_error, self.roll_error);

        let mut roll = SpringState::new(0.0, self.roll_velocity, error);
        step_spring(dt, &mut roll, params);
        self.roll_velocity = roll.v;
        self.roll_error = error - roll.x;

        self.current = (DQuat::from_axis_angle(forward, roll.x) * aligned).normalize();
        self.is_settled(settle)
    }
}

fn step_cartesian(
    dt: f64,
    direction: DVec3,
    velocity: &mut DVec3,
    target: DVec3,
    params: PhysicsParameters,
) -> DVec3 {
    let mut next = direction;
    for axis in 0..3 {
        let mut s = SpringState::new(direction[axis], velocity[axis], target[axis]);
        step_spring(dt, &mut s, params);
        next[axis] = s.x;
        velocity[axis] = s.v;
    }
    // Passing through the origin (exactly opposite target) leaves no direction.
    next.try_normalize().unwrap_or(target)
}

fn step_spherical(
    dt: f64,
    angles: &mut DVec2,
    velocity: &mut DVec2,
    target_angles: &mut DVec2,
    target: DVec3,
    params: PhysicsParameters,
) -> DVec3 {
    let wrapped = to_angles(target);
    *target_angles = DVec2::new(
        unwrap_angle(wrapped.x, target_angles.x),
        unwrap_angle(wrapped.y, target_angles.y),
    );
    for axis in 0..2 {
        let mut s = SpringState::new(angles[axis], velocity[axis], target_angles[axis]);
        step_spring(dt, &mut s, params);
        angles[axis] = s.x;
        velocity[axis] = s.v;
    }
    from_angles(*angles)
}

/// (elevation, azimuth) of a unit direction. Azimuth is measured from +Z toward +X.
pub fn to_angles(direction: DVec3) -> DVec2 {
    DVec2::new(
        direction.y.clamp(-1.0, 1.0).asin(),
        direction.x.atan2(direction.z),
    )
}

/// Unit direction for (elevation, azimuth).
pub fn from_angles(angles: DVec2) -> DVec3 {
    let (sin_e, cos_e) = angles.x.sin_cos();
    let (sin_a, cos_a) = angles.y.sin_cos();
    DVec3::new(cos_e * sin_a, sin_e, cos_e * cos_a)
}

/// `angle` shifted by whole turns to lie within half a turn of `previous`,
/// i.e. in `(previous - π, previous + π]`.
pub fn unwrap_angle(angle: f64, previous: f64) -> f64 {
    let turns = (angle - previous) / TAU;
    let delta = turns - (turns - 0.5).ceil();
    previous + delta * TAU
}

/// Rotate `orientation` minimally so its forward axis becomes `forward`,
/// keeping up as close to the old up as possible.
fn realign(orientation: DQuat, forward: DVec3) -> DQuat {
    let old_up = orientation * UP;
    let mut right = old_up.cross(forward);
    if right.length_squared() < 1e-12 {
        // forward swung onto the old up axis; keep the old right instead
        let old_right = orientation * RIGHT;
        right = old_right - forward * old_right.dot(forward);
    }
    let right = right.normalize();
    let up = forward.cross(right);
    DQuat::from_mat3(&DMat3::from_cols(right, up, forward)).normalize()
}

/// Read `<prefix>.x/y/z/w`. On failure, returns the first missing component's path.
pub fn read_quat(host: &dyn Animatable, prefix: &FieldPath) -> Result<DQuat, FieldPath> {
    let mut xyzw = [0.0; 4];
    for (slot, name) in xyzw.iter_mut().zip(QUAT_COMPONENTS) {
        let path = prefix.clone().key(name);
        *slot = host.field(path.segments()).ok_or(path)?;
    }
    Ok(DQuat::from_array(xyzw))
}

/// Write `<prefix>.x/y/z/w`. Returns false if any component is missing.
pub fn write_quat(host: &mut dyn Animatable, prefix: &FieldPath, q: DQuat) -> bool {
    q.to_array()
        .into_iter()
        .zip(QUAT_COMPONENTS)
        .fold(true, |ok, (value, name)| {
            host.set_field(prefix.clone().key(name).segments(), value) && ok
        })
}

/// Orientation springs, keyed by host and quaternion field.
#[derive(Debug, Default)]
pub struct OrientationSprings {
    springs: IndexMap<(HostHandle, FieldPath), OrientationSpring>,
}

impl OrientationSprings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, host: HostHandle, field: &FieldPath) -> Option<&OrientationSpring> {
        self.springs.get(&(host, field.clone()))
    }

    pub fn get_mut(&mut self, host: HostHandle, field: &FieldPath) -> Option<&mut OrientationSpring> {
        self.springs.get_mut(&(host, field.clone()))
    }

    pub fn insert(&mut self, host: HostHandle, field: FieldPath, spring: OrientationSpring) {
        self.springs.insert((host, field), spring);
    }

    pub fn remove(&mut self, host: HostHandle, field: &FieldPath) -> Option<OrientationSpring> {
        self.springs.shift_remove(&(host, field.clone()))
    }

    /// Remove every spring on `host`, returning their fields.
    pub fn remove_host(&mut self, host: HostHandle) -> Vec<FieldPath> {
        let fields = self.fields_of(host);
        self.springs.retain(|(h, _), _| *h != host);
        fields
    }

    pub fn fields_of(&self, host: HostHandle) -> Vec<FieldPath> {
        self.springs
            .keys()
            .filter(|(h, _)| *h == host)
            .map(|(_, field)| field.clone())
            .collect()
    }

    pub fn has_host(&self, host: HostHandle) -> bool {
        self.springs.keys().any(|(h, _)| *h == host)
    }

    /// Snapshot of the current keys, in insertion order.
    pub fn keys(&self) -> Vec<(HostHandle, FieldPath)> {
        self.springs.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.springs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.springs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::value::Value;
    use crate::core::params::exponential;
    use std::f64::consts::{FRAC_PI_2, PI};

    const SETTLE: OrientationSettle = OrientationSettle {
        dot: 0.999,
        velocity: 1e-4,
    };

    fn roll_of(q: DQuat) -> f64 {
        let up = q * UP;
        (-up.x).atan2(up.y)
    }

    #[test]
    fn unwrap_stays_within_half_turn() {
        assert!((unwrap_angle(-3.1, 3.1) - (TAU - 3.1)).abs() < 1e-12);
        assert!((unwrap_angle(3.1, -3.1) - (3.1 - TAU)).abs() < 1e-12);
        assert!((unwrap_angle(0.5, 4.0 * TAU) - (4.0 * TAU + 0.5)).abs() < 1e-9);
        assert_eq!(unwrap_angle(1.0, 1.0), 1.0);
        for prev in [-7.0, -1.0, 0.0, 2.0, 9.0] {
            for angle in [-PI, -2.0, 0.0, 1.5, PI] {
                let d = unwrap_angle(angle, prev) - prev;
                assert!(d > -PI - 1e-12 && d <= PI + 1e-12);
            }
        }
    }

    #[test]
    fn angles_round_trip() {
        for d in [
            DVec3::new(0.0, 0.0, 1.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(-0.3, 0.5, -0.8).normalize(),
        ] {
            assert!((from_angles(to_angles(d)) - d).length() < 1e-12);
        }
    }

    #[test]
    fn realign_keeps_basis_orthonormal() {
        let q = realign(DQuat::IDENTITY, DVec3::new(1.0, 0.2, 0.3).normalize());
        assert!((q.length() - 1.0).abs() < 1e-12);
        let f = q * FORWARD;
        assert!((f - DVec3::new(1.0, 0.2, 0.3).normalize()).length() < 1e-9);
        assert!((q * UP).dot(f).abs() < 1e-9);
    }

    #[test]
    fn spherical_turn_settles_without_flipping_up() {
        let target = DQuat::from_rotation_y(FRAC_PI_2);
        let mut spring = OrientationSpring::new(
            DQuat::IDENTITY,
            target,
            Some(exponential(0.5)),
            DirectionMode::Spherical,
            0.0,
        );
        let mut settled = false;
        for _ in 0..240 {
            settled = spring.step(1.0 / 60.0, SETTLE);
            assert!((spring.current().length() - 1.0).abs() < 1e-9);
            assert!((spring.current() * UP).y > 0.99, "up vector flipped");
            if settled {
                break;
            }
        }
        assert!(settled);
        assert!(spring.current().dot(target).abs() > 0.999);
    }

    #[test]
    fn pure_roll_is_monotonic() {
        let target = DQuat::from_rotation_z(FRAC_PI_2);
        let mut spring = OrientationSpring::new(
            DQuat::IDENTITY,
            target,
            Some(exponential(0.5)),
            DirectionMode::Spherical,
            0.0,
        );
        let mut last = roll_of(spring.current());
        for _ in 0..120 {
            spring.step(1.0 / 60.0, SETTLE);
            let roll = roll_of(spring.current());
            assert!(roll >= last - 1e-12, "roll went backwards: {} -> {}", last, roll);
            assert!(roll - last < 0.25, "roll jumped: {} -> {}", last, roll);
            assert!((spring.direction() - FORWARD).length() < 1e-9);
            last = roll;
        }
        assert!((last - FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn cartesian_mode_reaches_target() {
        let target = DQuat::from_euler(glam::EulerRot::YXZ, 1.0, 0.4, -0.3);
        let mut spring = OrientationSpring::new(
            DQuat::IDENTITY,
            target,
            Some(exponential(0.3)),
            DirectionMode::Cartesian,
            0.0,
        );
        let settled = (0..600).any(|_| spring.step(1.0 / 60.0, SETTLE));
        assert!(settled);
        assert!(matches!(spring.direction_velocity(), DirectionVelocity::Cartesian(_)));
    }

    #[test]
    fn missing_params_snap() {
        let target = DQuat::from_rotation_x(0.7);
        let mut spring =
            OrientationSpring::new(DQuat::IDENTITY, target, None, DirectionMode::Cartesian, 0.0);
        assert!(spring.step(1.0 / 60.0, SETTLE));
        assert_eq!(spring.current(), target.normalize());
    }

    #[test]
    fn retarget_keeps_velocity_within_mode() {
        let mut spring = OrientationSpring::new(
            DQuat::IDENTITY,
            DQuat::from_rotation_y(1.0),
            Some(exponential(0.5)),
            DirectionMode::Spherical,
            0.0,
        );
        spring.step(0.05, SETTLE);
        let before = spring.direction_velocity();
        spring.retarget(DQuat::from_rotation_y(-1.0), Some(exponential(0.5)), DirectionMode::Spherical, 0.05);
        assert_eq!(spring.direction_velocity(), before);

        spring.retarget(DQuat::from_rotation_y(-1.0), Some(exponential(0.5)), DirectionMode::Cartesian, 0.05);
        assert_eq!(spring.direction_velocity(), DirectionVelocity::Cartesian(DVec3::ZERO));
    }

    #[test]
    fn quaternion_leaves_read_and_write() {
        let mut host = Value::record([("rotation", Value::from(DQuat::IDENTITY))]);
        let prefix = FieldPath::parse("rotation");
        assert_eq!(read_quat(&host, &prefix), Ok(DQuat::IDENTITY));

        let q = DQuat::from_rotation_x(0.5);
        assert!(write_quat(&mut host, &prefix, q));
        assert_eq!(read_quat(&host, &prefix), Ok(q));

        assert_eq!(
            read_quat(&host, &FieldPath::parse("missing")),
            Err(FieldPath::parse("missing.x"))
        );
    }

    #[test]
    fn registry_tracks_hosts() {
        let mut map: slotmap::SlotMap<HostHandle, ()> = slotmap::SlotMap::with_key();
        let (a, b) = (map.insert(()), map.insert(()));
        let spring = OrientationSpring::new(DQuat::IDENTITY, DQuat::IDENTITY, None, DirectionMode::Cartesian, 0.0);

        let mut springs = OrientationSprings::new();
        springs.insert(a, FieldPath::parse("head"), spring.clone());
        springs.insert(a, FieldPath::parse("body"), spring.clone());
        springs.insert(b, FieldPath::parse("head"), spring);

        assert!(springs.has_host(a));
        assert_eq!(springs.remove_host(a), vec![FieldPath::parse("head"), FieldPath::parse("body")]);
        assert!(!springs.has_host(a));
        assert_eq!(springs.len(), 1);
    }
}
