//! End-to-end behaviour of the animator against strongly typed and dynamic hosts.

use std::cell::{Cell, RefCell};
use std::f64::consts::{FRAC_PI_2, PI};
use std::rc::Rc;

use glam::{DQuat, DVec3};
use zap_motion::extensions::orientation::{FORWARD, UP};
use zap_motion::{
    step_spring, Animatable, Animator, AnimatorConfig, DirectionMode, FieldPath, PathSegment,
    PhysicsParameters, SpringParams, SpringState, Target, Value,
};

const FRAME: f64 = 1.0 / 60.0;

/// A typical strongly typed host.
#[derive(Debug, Default)]
struct Card {
    opacity: f64,
    pos: DVec3,
    rotation: DQuat,
}

impl Animatable for Card {
    fn field(&self, path: &[PathSegment]) -> Option<f64> {
        let (PathSegment::Key(head), rest) = path.split_first()? else {
            return None;
        };
        match head.as_str() {
            "opacity" => self.opacity.field(rest),
            "pos" => self.pos.field(rest),
            "rotation" => self.rotation.field(rest),
            _ => None,
        }
    }

    fn set_field(&mut self, path: &[PathSegment], value: f64) -> bool {
        let Some((PathSegment::Key(head), rest)) = path.split_first() else {
            return false;
        };
        match head.as_str() {
            "opacity" => self.opacity.set_field(rest, value),
            "pos" => self.pos.set_field(rest, value),
            "rotation" => self.rotation.set_field(rest, value),
            _ => false,
        }
    }
}

fn card() -> Rc<RefCell<Card>> {
    Rc::new(RefCell::new(Card {
        rotation: DQuat::IDENTITY,
        ..Card::default()
    }))
}

#[test]
fn critically_damped_step_from_rest() {
    let mut state = SpringState::new(0.0, 0.0, 1.0);
    step_spring(0.1, &mut state, PhysicsParameters::new(100.0, 20.0));
    assert!((state.x - 0.264).abs() < 1e-3, "x was {}", state.x);
}

#[test]
fn opacity_fade_settles_on_schedule() {
    let host = card();
    let mut animator = Animator::new();
    let h = animator.register(&host);

    let completed_at = Rc::new(Cell::new(None));
    let seen = completed_at.clone();
    animator.on_complete_field(h, "opacity", move |animator, event| {
        assert_eq!(event.field, FieldPath::parse("opacity"));
        assert!(seen.get().is_none(), "completed twice");
        seen.set(Some(animator.time_s()));
        Ok(())
    });

    animator
        .spring_to(h, Target::field("opacity", 1.0), Some(SpringParams::exponential(0.5)))
        .unwrap();

    for _ in 0..30 {
        animator.step(FRAME).unwrap();
    }
    let at_duration = host.borrow().opacity;
    assert!((at_duration - 1.0).abs() <= 1e-3 + 1e-9, "opacity at 0.5s was {}", at_duration);

    for _ in 0..60 {
        animator.step(FRAME).unwrap();
    }
    let t = completed_at.get().expect("spring never completed");
    assert!((0.5..=0.9).contains(&t), "completed at {}s", t);
    assert_eq!(host.borrow().opacity, 1.0);
}

#[test]
fn spherical_quarter_turn_keeps_up_and_settles() {
    let host = card();
    let mut animator = Animator::new();
    let h = animator.register(&host);
    let target = DQuat::from_rotation_y(FRAC_PI_2);

    animator
        .spring_orientation_to(
            h,
            "rotation",
            target,
            Some(SpringParams::exponential(0.5)),
            DirectionMode::Spherical,
        )
        .unwrap();

    let mut last_azimuth = 0.0;
    for _ in 0..300 {
        animator.step(FRAME).unwrap();
        let q = host.borrow().rotation;
        assert!((q.length() - 1.0).abs() < 1e-9);
        assert!((q * UP).y > 0.999, "up vector flipped");

        let forward = q * FORWARD;
        let azimuth = forward.x.atan2(forward.z);
        assert!(azimuth >= last_azimuth - 1e-9, "direction swung back");
        last_azimuth = azimuth;

        if !animator.is_animating(h, "rotation") {
            break;
        }
    }
    assert!(!animator.is_animating(h, "rotation"));
    assert!(host.borrow().rotation.dot(target).abs() > 0.999);
}

#[test]
fn pure_roll_is_continuous() {
    let host = card();
    let mut animator = Animator::new();
    let h = animator.register(&host);

    animator
        .spring_orientation_to(
            h,
            "rotation",
            DQuat::from_rotation_z(FRAC_PI_2),
            Some(SpringParams::exponential(0.5)),
            DirectionMode::Spherical,
        )
        .unwrap();

    let mut last_roll = 0.0;
    for _ in 0..120 {
        animator.step(FRAME).unwrap();
        let up = host.borrow().rotation * UP;
        let roll = (-up.x).atan2(up.y);
        assert!(roll >= last_roll - 1e-12 && roll - last_roll < 0.25);
        last_roll = roll;
    }
    assert!((last_roll - FRAC_PI_2).abs() < 1e-3);
}

/// Spring a quarter turn about a tilted axis, so direction and roll have to
/// converge together, and check neither reverses on the way.
fn tilted_quarter_turn(axis: DVec3, mode: DirectionMode) {
    let host = card();
    let mut animator = Animator::new();
    let h = animator.register(&host);
    let target = DQuat::from_axis_angle(axis.normalize(), FRAC_PI_2);

    animator
        .spring_orientation_to(h, "rotation", target, Some(SpringParams::exponential(0.5)), mode)
        .unwrap();

    let mut last_angle = DQuat::IDENTITY.angle_between(target);
    let mut last_up = UP;
    let mut roll_sign = 0.0;
    let mut peak_roll = 0.0_f64;
    for _ in 0..300 {
        animator.step(FRAME).unwrap();
        let q = host.borrow().rotation;

        let angle = q.angle_between(target);
        assert!(angle <= last_angle + 1e-9, "moved away from target: {} -> {}", last_angle, angle);
        last_angle = angle;

        let up = q * UP;
        assert!(up.angle_between(last_up) < 0.4, "up vector jumped to {:?}", up);
        last_up = up;

        let Some((_, roll_velocity)) = animator.orientation_velocity(h, "rotation") else {
            break;
        };
        if roll_velocity.abs() > 1e-6 {
            assert!(roll_sign * roll_velocity >= 0.0, "roll reversed at {}", animator.time_s());
            roll_sign = roll_velocity.signum();
            peak_roll = peak_roll.max(roll_velocity.abs());
        }
    }

    assert!(!animator.is_animating(h, "rotation"), "never settled");
    assert!(peak_roll > 0.1, "roll never moved");
    assert!(host.borrow().rotation.dot(target).abs() > 0.999);
}

#[test]
fn spherical_tilted_turn_moves_direction_and_roll_together() {
    tilted_quarter_turn(DVec3::ONE, DirectionMode::Spherical);
    tilted_quarter_turn(DVec3::new(0.3, 0.9, 0.1), DirectionMode::Spherical);
}

#[test]
fn cartesian_tilted_turn_moves_direction_and_roll_together() {
    tilted_quarter_turn(DVec3::ONE, DirectionMode::Cartesian);
    tilted_quarter_turn(DVec3::new(1.0, 0.0, 1.0), DirectionMode::Cartesian);
}

#[test]
fn azimuth_takes_the_short_way_across_the_branch_cut() {
    let host = card();
    host.borrow_mut().rotation = DQuat::from_rotation_y(PI * 170.0 / 180.0);
    let mut animator = Animator::new();
    let h = animator.register(&host);

    animator
        .spring_orientation_to(
            h,
            "rotation",
            DQuat::from_rotation_y(-PI * 170.0 / 180.0),
            Some(SpringParams::exponential(0.4)),
            DirectionMode::Spherical,
        )
        .unwrap();

    for _ in 0..180 {
        animator.step(FRAME).unwrap();
        let forward = host.borrow().rotation * FORWARD;
        assert!(forward.z < -0.98, "went the long way round: {:?}", forward);
    }
    assert!(!animator.is_animating(h, "rotation"));
}

#[test]
fn completion_listener_can_rearrange_animations_mid_step() {
    let host = Rc::new(RefCell::new(Value::record([
        ("a", Value::from(0.0)),
        ("b", Value::from(0.0)),
        ("c", Value::from(0.0)),
    ])));
    let mut animator = Animator::new();
    let h = animator.register(&host);

    animator
        .spring_to(h, Target::field("a", 1.0), Some(SpringParams::exponential(0.1)))
        .unwrap();
    animator
        .spring_to(h, Target::field("c", 1.0), Some(SpringParams::exponential(2.0)))
        .unwrap();

    animator.on_complete_field(h, "a", move |animator, event| {
        animator.spring_field_to(event.host, "b", 1.0, Some(SpringParams::exponential(0.2)))?;
        animator.remove(event.host, "c", false)?;
        Ok(())
    });
    let object_done = Rc::new(Cell::new(0));
    let seen = object_done.clone();
    animator.on_complete(h, move |_, _| {
        seen.set(seen.get() + 1);
        Ok(())
    });

    for _ in 0..120 {
        animator.step(FRAME).unwrap();
    }

    let value = |name: &str| host.borrow().field(FieldPath::parse(name).segments()).unwrap();
    assert_eq!(value("a"), 1.0);
    assert_eq!(value("b"), 1.0);
    assert!(value("c") > 0.0 && value("c") < 1.0, "c was {}", value("c"));
    assert_eq!(object_done.get(), 1);
    assert!(!animator.has_active_animations());
}

#[test]
fn listener_may_unregister_a_host_mid_step() {
    let first = card();
    let second = card();
    let mut animator = Animator::new();
    let (h1, h2) = (animator.register(&first), animator.register(&second));
    let params = Some(SpringParams::exponential(0.5));
    animator.spring_field_to(h1, "opacity", 1.0, params).unwrap();
    animator.spring_field_to(h2, "opacity", 1.0, params).unwrap();

    animator.on_change_field(h1, "opacity", move |animator, _| {
        animator.unregister(h2);
        Ok(())
    });

    animator.step(FRAME).unwrap();
    assert!(first.borrow().opacity > 0.0);
    assert_eq!(second.borrow().opacity, 0.0);
    assert!(!animator.is_registered(h2));
}

#[test]
fn dropped_host_mid_animation_is_forgotten() {
    let survivor = card();
    let mut animator = Animator::new();
    let keep = animator.register(&survivor);
    let params = Some(SpringParams::exponential(0.5));

    let doomed = card();
    let gone = animator.register(&doomed);
    animator.spring_field_to(gone, "pos.x", 5.0, params).unwrap();
    animator.spring_field_to(keep, "pos.x", 5.0, params).unwrap();
    animator.step(FRAME).unwrap();

    drop(doomed);
    animator.step(FRAME).unwrap();
    assert_eq!(animator.active_field_count(), 1);
    assert!(animator.is_animating(keep, "pos.x"));
    assert!(animator.spring_field_to(gone, "pos.x", 1.0, params).is_err());
}

#[test]
fn vector_targets_animate_each_component() {
    let host = card();
    let mut animator = Animator::new();
    let h = animator.register(&host);
    let goal = DVec3::new(3.0, -2.0, 0.5);

    animator.ease_in_out_to(h, Target::field("pos", goal), 0.5).unwrap();
    for _ in 0..40 {
        animator.step(FRAME).unwrap();
    }
    assert_eq!(host.borrow().pos, goal);
}

#[test]
fn config_from_json_changes_settling() {
    let loose = AnimatorConfig::from_json(r#"{ "position_epsilon": 0.05, "velocity_epsilon": 0.5 }"#).unwrap();
    let durations: Vec<f64> = [AnimatorConfig::default(), loose]
        .into_iter()
        .map(|config| {
            let host = card();
            let mut animator = Animator::with_config(config);
            let h = animator.register(&host);
            animator
                .spring_field_to(h, "opacity", 1.0, Some(SpringParams::exponential(0.5)))
                .unwrap();
            while animator.has_active_animations() {
                animator.step(FRAME).unwrap();
            }
            animator.time_s()
        })
        .collect();
    assert!(durations[1] < durations[0]);
}
