//! The animation scheduler.
//!
//! An [`Animator`] owns every active field animation, keyed by host and field
//! path, and advances them all on each [`Animator::step`]. Hosts stay owned by
//! the caller; the animator only holds weak references and writes numeric
//! leaves through [`Animatable`].
//!
//! Listeners receive `&mut Animator` and may freely start, retarget or remove
//! animations while a step is in progress. The step works from snapshots of
//! the host and field keys and re-fetches each entry before touching it, so
//! whatever a listener changes is observed consistently.

use std::cell::RefCell;
use std::rc::Rc;

use glam::DQuat;
use indexmap::IndexMap;

use crate::api::config::AnimatorConfig;
use crate::api::types::{AnimationEvent, EventKind, FieldPath, HostHandle};
use crate::components::target::Target;
use crate::components::value::Animatable;
use crate::core::hosts::HostRegistry;
use crate::core::params::SpringParams;
use crate::core::time::TickClock;
use crate::error::{AnimatorError, Result};
use crate::extensions::easing::Easing;
use crate::extensions::orientation::{
    read_quat, write_quat, DirectionMode, DirectionVelocity, OrientationSettle, OrientationSpring, OrientationSprings,
    QUAT_COMPONENTS,
};
use crate::extensions::tween::Tween;
use crate::systems::events::{EventHub, Subscription};
use crate::systems::field::{FieldAnimation, Settle};

/// Active field animations of one host, in request order.
type FieldSet = IndexMap<FieldPath, FieldAnimation>;

/// A target leaf resolved against its host.
struct Leaf {
    field: FieldPath,
    target: f64,
    current: f64,
}

/// Fields written since the outermost open bracket, grouped by host.
/// Nested brackets (a listener calling `set_to` mid-step) fold into the outer one.
#[derive(Default)]
struct ChangeBracket {
    depth: u32,
    touched: IndexMap<HostHandle, Vec<FieldPath>>,
}

impl ChangeBracket {
    fn begin(&mut self) {
        self.depth += 1;
    }

    fn mark(&mut self, host: HostHandle, field: &FieldPath) {
        let fields = self.touched.entry(host).or_default();
        if !fields.contains(field) {
            fields.push(field.clone());
        }
    }

    /// Close one level. Returns the touched set once the outermost level closes.
    fn end(&mut self) -> Option<IndexMap<HostHandle, Vec<FieldPath>>> {
        self.depth = self.depth.saturating_sub(1);
        (self.depth == 0).then(|| std::mem::take(&mut self.touched))
    }

    /// Close one level after a failure, discarding pending changes at the outermost level.
    fn abandon(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.touched.clear();
        }
    }
}

/// Drives spring, tween and orientation animations on registered hosts.
pub struct Animator {
    config: AnimatorConfig,
    hosts: HostRegistry,
    objects: IndexMap<HostHandle, FieldSet>,
    orientations: OrientationSprings,
    events: EventHub,
    clock: TickClock,
    /// Sum of every `dt` stepped so far; the time base for tweens.
    time_s: f64,
    changes: ChangeBracket,
}

impl Animator {
    pub fn new() -> Self {
        Self::with_config(AnimatorConfig::default())
    }

    pub fn with_config(config: AnimatorConfig) -> Self {
        Self {
            config,
            hosts: HostRegistry::new(),
            objects: IndexMap::new(),
            orientations: OrientationSprings::new(),
            events: EventHub::new(),
            clock: TickClock::new(config.first_tick_dt),
            time_s: 0.0,
            changes: ChangeBracket::default(),
        }
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    /// Animator time in seconds: the sum of every stepped `dt`.
    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    // -- Hosts --

    /// Start tracking a host. Registering the same host twice returns the same handle.
    pub fn register<T: Animatable + 'static>(&mut self, host: &Rc<RefCell<T>>) -> HostHandle {
        self.hosts.register(host)
    }

    /// Stop tracking a host, silently discarding its animations and listeners.
    pub fn unregister(&mut self, host: HostHandle) -> bool {
        self.objects.shift_remove(&host);
        self.orientations.remove_host(host);
        self.events.remove_host(host);
        self.hosts.unregister(host)
    }

    /// True while the host is registered and alive.
    pub fn is_registered(&self, host: HostHandle) -> bool {
        self.hosts.contains(host)
    }

    // -- Requests --

    /// Spring every leaf of `target`. Running springs keep their velocity;
    /// tweens on the same fields are replaced. `None` params set immediately.
    ///
    /// Fails without changing anything if the host is unknown, a leaf is
    /// missing or non-numeric on the host, or a target value is not finite.
    pub fn spring_to(
        &mut self,
        host: HostHandle,
        target: impl Into<Target>,
        params: Option<SpringParams>,
    ) -> Result<()> {
        let target = target.into();
        let Some(params) = params else {
            return self.set_to(host, target);
        };
        let params = params.resolve();
        let leaves = self.resolve_leaves(host, &target)?;
        if leaves.is_empty() {
            return Ok(());
        }

        self.cancel_orientations_over(host, &leaves);
        let now = self.time_s;
        let fields = self.objects.entry(host).or_default();
        for leaf in leaves {
            let retargeted = fields
                .get_mut(&leaf.field)
                .is_some_and(|anim| anim.retarget(leaf.target, params, now));
            if !retargeted {
                fields.insert(leaf.field, FieldAnimation::spring(leaf.target, params, now));
            }
        }
        Ok(())
    }

    /// Spring a single leaf.
    pub fn spring_field_to(
        &mut self,
        host: HostHandle,
        field: impl Into<FieldPath>,
        value: f64,
        params: Option<SpringParams>,
    ) -> Result<()> {
        self.spring_to(host, Target::at(field, value), params)
    }

    /// Tween every leaf of `target` from its current value over `duration_s`.
    /// Replaces any animation already running on those fields.
    pub fn tween_to(
        &mut self,
        host: HostHandle,
        target: impl Into<Target>,
        duration_s: f64,
        easing: Easing,
    ) -> Result<()> {
        if !(duration_s.is_finite() && duration_s >= 0.0) {
            return Err(AnimatorError::InvalidDuration(duration_s));
        }
        let leaves = self.resolve_leaves(host, &target.into())?;
        if leaves.is_empty() {
            return Ok(());
        }

        self.cancel_orientations_over(host, &leaves);
        let now = self.time_s;
        let fields = self.objects.entry(host).or_default();
        for leaf in leaves {
            let tween = Tween::new(leaf.current, now, duration_s, easing);
            fields.insert(leaf.field, FieldAnimation::tween(leaf.target, tween));
        }
        Ok(())
    }

    /// Tween with a caller-supplied progress curve.
    ///
    /// The curve is a plain `fn` pointer and cannot capture state.
    pub fn custom_tween_to(
        &mut self,
        host: HostHandle,
        target: impl Into<Target>,
        duration_s: f64,
        curve: fn(f64) -> f64,
    ) -> Result<()> {
        self.tween_to(host, target, duration_s, Easing::Custom(curve))
    }

    pub fn linear_to(&mut self, host: HostHandle, target: impl Into<Target>, duration_s: f64) -> Result<()> {
        self.tween_to(host, target, duration_s, Easing::Linear)
    }

    pub fn ease_in_to(&mut self, host: HostHandle, target: impl Into<Target>, duration_s: f64) -> Result<()> {
        self.tween_to(host, target, duration_s, Easing::CubicIn)
    }

    pub fn ease_out_to(&mut self, host: HostHandle, target: impl Into<Target>, duration_s: f64) -> Result<()> {
        self.tween_to(host, target, duration_s, Easing::CubicOut)
    }

    pub fn ease_in_out_to(
        &mut self,
        host: HostHandle,
        target: impl Into<Target>,
        duration_s: f64,
    ) -> Result<()> {
        self.tween_to(host, target, duration_s, Easing::CubicInOut)
    }

    /// Write every leaf of `target` now, cancelling animations on those fields.
    ///
    /// Fires field-complete and field-change for each leaf, object-complete if
    /// the host has nothing left running, and object-change.
    pub fn set_to(&mut self, host: HostHandle, target: impl Into<Target>) -> Result<()> {
        let leaves = self.resolve_leaves(host, &target.into())?;
        if leaves.is_empty() {
            return Ok(());
        }
        let shared = self.hosts.get(host).ok_or(AnimatorError::UnknownHost(host))?;

        self.cancel_orientations_over(host, &leaves);
        if let Some(fields) = self.objects.get_mut(&host) {
            for leaf in &leaves {
                fields.shift_remove(&leaf.field);
            }
            if fields.is_empty() {
                self.objects.shift_remove(&host);
            }
        }
        {
            let mut object = shared.borrow_mut();
            for leaf in &leaves {
                object.set_field(leaf.field.segments(), leaf.target);
            }
        }

        let written: Vec<FieldPath> = leaves.into_iter().map(|leaf| leaf.field).collect();
        self.changes.begin();
        let fired = self.fire_set_events(host, &written);
        self.close_bracket(fired)
    }

    /// Spring a quaternion field (`<field>.x/y/z/w`) toward `target` by its
    /// forward direction and roll. `None` params set immediately.
    pub fn spring_orientation_to(
        &mut self,
        host: HostHandle,
        field: impl Into<FieldPath>,
        target: DQuat,
        params: Option<SpringParams>,
        mode: DirectionMode,
    ) -> Result<()> {
        let field = field.into();
        let Some(params) = params else {
            return self.set_orientation_to(host, field, target);
        };
        let current = self.read_orientation(host, &field, target)?;
        let params = Some(params.resolve());
        let now = self.time_s;
        self.cancel_fields_under(host, &field);

        if let Some(spring) = self.orientations.get_mut(host, &field) {
            spring.retarget(target, params, mode, now);
            return Ok(());
        }
        let spring = OrientationSpring::new(current, target, params, mode, now);
        self.orientations.insert(host, field, spring);
        Ok(())
    }

    /// Write a quaternion field now, cancelling any orientation spring on it.
    pub fn set_orientation_to(
        &mut self,
        host: HostHandle,
        field: impl Into<FieldPath>,
        target: DQuat,
    ) -> Result<()> {
        let field = field.into();
        self.read_orientation(host, &field, target)?;
        let shared = self.hosts.get(host).ok_or(AnimatorError::UnknownHost(host))?;

        self.cancel_fields_under(host, &field);
        self.orientations.remove(host, &field);
        write_quat(&mut *shared.borrow_mut(), &field, target.normalize());

        self.changes.begin();
        let fired = self
            .fire_set_events(host, std::slice::from_ref(&field))
            .and_then(|()| self.emit_component_changes(host, &field));
        self.close_bracket(fired)
    }

    // -- Removal --

    /// Stop animating one field (scalar or orientation), leaving its value where it is.
    /// Returns false if nothing was running there.
    pub fn remove(
        &mut self,
        host: HostHandle,
        field: impl Into<FieldPath>,
        fire_complete: bool,
    ) -> Result<bool> {
        let field = field.into();
        let removed_scalar = self
            .objects
            .get_mut(&host)
            .is_some_and(|fields| fields.shift_remove(&field).is_some());
        if removed_scalar && self.objects.get(&host).is_some_and(|fields| fields.is_empty()) {
            self.objects.shift_remove(&host);
        }
        let removed = removed_scalar || self.orientations.remove(host, &field).is_some();

        if removed && fire_complete {
            self.emit(EventKind::FieldComplete, host, &field)?;
            if self.is_idle(host) {
                self.emit(EventKind::ObjectComplete, host, &FieldPath::root())?;
            }
        }
        Ok(removed)
    }

    /// Stop an orientation spring; same as [`Animator::remove`] on its field.
    pub fn remove_orientation(
        &mut self,
        host: HostHandle,
        field: impl Into<FieldPath>,
        fire_complete: bool,
    ) -> Result<bool> {
        self.remove(host, field, fire_complete)
    }

    /// Stop every animation on a host. Returns false if it had none.
    pub fn remove_object(&mut self, host: HostHandle, fire_complete: bool) -> Result<bool> {
        let mut fields: Vec<FieldPath> = self
            .objects
            .shift_remove(&host)
            .map(|fields| fields.into_keys().collect())
            .unwrap_or_default();
        fields.extend(self.orientations.remove_host(host));
        if fields.is_empty() {
            return Ok(false);
        }

        if fire_complete {
            for field in &fields {
                self.emit(EventKind::FieldComplete, host, field)?;
            }
            self.emit(EventKind::ObjectComplete, host, &FieldPath::root())?;
        }
        Ok(true)
    }

    /// Stop everything.
    pub fn remove_all(&mut self, fire_complete: bool) -> Result<()> {
        let mut hosts: Vec<HostHandle> = self.objects.keys().copied().collect();
        for (host, _) in self.orientations.keys() {
            if !hosts.contains(&host) {
                hosts.push(host);
            }
        }
        for host in hosts {
            self.remove_object(host, fire_complete)?;
        }
        Ok(())
    }

    // -- Queries --

    pub fn animation(&self, host: HostHandle, field: &FieldPath) -> Option<&FieldAnimation> {
        self.objects.get(&host)?.get(field)
    }

    pub fn orientation(&self, host: HostHandle, field: &FieldPath) -> Option<&OrientationSpring> {
        self.orientations.get(host, field)
    }

    /// Current velocity of a scalar field; 0 when it is not animating.
    pub fn velocity(&self, host: HostHandle, field: impl Into<FieldPath>) -> f64 {
        self.animation(host, &field.into()).map_or(0.0, |anim| anim.velocity)
    }

    /// Direction and roll velocity of an orientation spring.
    pub fn orientation_velocity(
        &self,
        host: HostHandle,
        field: impl Into<FieldPath>,
    ) -> Option<(DirectionVelocity, f64)> {
        self.orientations
            .get(host, &field.into())
            .map(|spring| (spring.direction_velocity(), spring.roll_velocity()))
    }

    /// Target of an animated scalar field.
    pub fn target(&self, host: HostHandle, field: impl Into<FieldPath>) -> Option<f64> {
        self.animation(host, &field.into()).map(|anim| anim.target)
    }

    /// True if `field` has a scalar animation, or lies under a running orientation spring.
    pub fn is_animating(&self, host: HostHandle, field: impl Into<FieldPath>) -> bool {
        let field = field.into();
        self.animation(host, &field).is_some()
            || self
                .orientations
                .fields_of(host)
                .iter()
                .any(|prefix| field.starts_with(prefix))
    }

    pub fn is_object_animating(&self, host: HostHandle) -> bool {
        !self.is_idle(host)
    }

    pub fn has_active_animations(&self) -> bool {
        !self.objects.is_empty() || !self.orientations.is_empty()
    }

    /// Number of running scalar and orientation animations.
    pub fn active_field_count(&self) -> usize {
        self.objects.values().map(|fields| fields.len()).sum::<usize>() + self.orientations.len()
    }

    // -- Subscriptions --

    /// Called when `field` of `host` completes.
    pub fn on_complete_field<F>(&mut self, host: HostHandle, field: impl Into<FieldPath>, listener: F) -> Subscription
    where
        F: FnMut(&mut Animator, &AnimationEvent) -> anyhow::Result<()> + 'static,
    {
        self.events
            .subscribe(EventKind::FieldComplete, host, field.into(), Box::new(listener))
    }

    /// Called when `host` has no animations left.
    pub fn on_complete<F>(&mut self, host: HostHandle, listener: F) -> Subscription
    where
        F: FnMut(&mut Animator, &AnimationEvent) -> anyhow::Result<()> + 'static,
    {
        self.events
            .subscribe(EventKind::ObjectComplete, host, FieldPath::root(), Box::new(listener))
    }

    /// Called each time `field` of `host` is written. Orientation writes
    /// report the quaternion field and each of its `x/y/z/w` leaves.
    pub fn on_change_field<F>(&mut self, host: HostHandle, field: impl Into<FieldPath>, listener: F) -> Subscription
    where
        F: FnMut(&mut Animator, &AnimationEvent) -> anyhow::Result<()> + 'static,
    {
        self.events
            .subscribe(EventKind::FieldChange, host, field.into(), Box::new(listener))
    }

    /// Called once per step (or `set_to`) in which any field of `host` was written.
    pub fn on_change<F>(&mut self, host: HostHandle, listener: F) -> Subscription
    where
        F: FnMut(&mut Animator, &AnimationEvent) -> anyhow::Result<()> + 'static,
    {
        self.events
            .subscribe(EventKind::ObjectChange, host, FieldPath::root(), Box::new(listener))
    }

    /// Like [`Animator::on_change`], restricted to fields under `prefix`.
    pub fn on_change_at<F>(&mut self, host: HostHandle, prefix: impl Into<FieldPath>, listener: F) -> Subscription
    where
        F: FnMut(&mut Animator, &AnimationEvent) -> anyhow::Result<()> + 'static,
    {
        self.events
            .subscribe(EventKind::ObjectChange, host, prefix.into(), Box::new(listener))
    }

    /// Dispose of a subscription. Safe to call from inside the listener itself.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.events.unsubscribe(subscription)
    }

    // -- Stepping --

    /// Step by the wall-clock time since the previous `tick`
    /// (`first_tick_dt` on the first call). Returns the `dt` used.
    pub fn tick(&mut self) -> Result<f64> {
        let dt = self.clock.delta();
        self.step(dt)?;
        Ok(dt)
    }

    /// Make the next `tick` use `first_tick_dt` again, e.g. after the host
    /// loop was paused.
    pub fn reset_clock(&mut self) {
        self.clock.reset();
    }

    /// Advance every animation by `dt_s` seconds.
    ///
    /// Scalar fields are stepped first, host by host in request order, then
    /// orientation springs. Per-field events fire as each field is written;
    /// object-change events fire once per touched host at the end.
    /// A listener error stops the step and is returned.
    pub fn step(&mut self, dt_s: f64) -> Result<()> {
        let dt = if dt_s.is_finite() && dt_s >= 0.0 {
            dt_s
        } else {
            log::warn!("ignoring invalid step of {dt_s}s");
            0.0
        };
        self.time_s += dt;
        self.prune_dropped_hosts();

        log::trace!(
            "step {dt:.4}s at t={:.4}s: {} hosts, {} orientation springs",
            self.time_s,
            self.objects.len(),
            self.orientations.len()
        );

        self.changes.begin();
        let stepped = self
            .step_fields(dt)
            .and_then(|()| self.step_orientations(dt));
        self.close_bracket(stepped)
    }

    fn step_fields(&mut self, dt: f64) -> Result<()> {
        let settle = Settle {
            position: self.config.position_epsilon,
            velocity: self.config.velocity_epsilon,
        };
        let max_duration = self.config.max_duration_s;

        let handles: Vec<HostHandle> = self.objects.keys().copied().collect();
        for handle in handles {
            let Some(shared) = self.hosts.get(handle) else {
                // unregistered or dropped by a listener earlier in this step
                self.objects.shift_remove(&handle);
                continue;
            };
            let fields: Vec<FieldPath> = match self.objects.get(&handle) {
                Some(fields) => fields.keys().cloned().collect(),
                None => continue,
            };

            let mut emptied = false;
            for field in fields {
                if self.animation(handle, &field).is_none() {
                    continue;
                }
                let current = shared.borrow().field(field.segments());
                let Some(current) = current else {
                    log::warn!("host {handle:?} no longer has field `{field}`; dropping its animation");
                    emptied |= self.drop_field(handle, &field);
                    continue;
                };

                let now = self.time_s;
                let Some(anim) = self.objects.get_mut(&handle).and_then(|f| f.get_mut(&field)) else {
                    continue;
                };
                let mut outcome = anim.step(current, dt, now, settle);
                if !outcome.complete && max_duration.is_some_and(|max| now - anim.started_at >= max) {
                    log::warn!(
                        "`{field}` on {handle:?} ran longer than {:.3}s; forcing completion",
                        max_duration.unwrap_or_default()
                    );
                    outcome = anim.force_complete();
                }

                shared.borrow_mut().set_field(field.segments(), outcome.value);
                self.changes.mark(handle, &field);
                if outcome.complete {
                    emptied |= self.drop_field(handle, &field);
                }

                self.emit(EventKind::FieldChange, handle, &field)?;
                if outcome.complete {
                    self.emit(EventKind::FieldComplete, handle, &field)?;
                }
            }

            if emptied && self.is_idle(handle) {
                log::debug!("host {handle:?} finished animating at t={:.4}s", self.time_s);
                self.emit(EventKind::ObjectComplete, handle, &FieldPath::root())?;
            }
        }
        Ok(())
    }

    fn step_orientations(&mut self, dt: f64) -> Result<()> {
        let settle = OrientationSettle {
            dot: self.config.orientation_dot_threshold,
            velocity: self.config.velocity_epsilon,
        };
        let max_duration = self.config.max_duration_s;

        for (handle, field) in self.orientations.keys() {
            let Some(shared) = self.hosts.get(handle) else {
                self.orientations.remove_host(handle);
                continue;
            };
            let now = self.time_s;
            let Some(spring) = self.orientations.get_mut(handle, &field) else {
                continue;
            };

            let mut complete = spring.step(dt, settle);
            if !complete && max_duration.is_some_and(|max| now - spring.started_at() >= max) {
                log::warn!("orientation `{field}` on {handle:?} ran too long; snapping to target");
                spring.snap();
                complete = true;
            }
            let value = spring.current();

            if !write_quat(&mut *shared.borrow_mut(), &field, value) {
                log::warn!("host {handle:?} no longer has orientation `{field}`; dropping its spring");
                self.orientations.remove(handle, &field);
                continue;
            }
            self.changes.mark(handle, &field);
            if complete {
                self.orientations.remove(handle, &field);
            }

            self.emit(EventKind::FieldChange, handle, &field)?;
            self.emit_component_changes(handle, &field)?;
            if complete {
                self.emit(EventKind::FieldComplete, handle, &field)?;
                if self.is_idle(handle) {
                    log::debug!("host {handle:?} finished animating at t={:.4}s", self.time_s);
                    self.emit(EventKind::ObjectComplete, handle, &FieldPath::root())?;
                }
            }
        }
        Ok(())
    }

    // -- Internals --

    /// Check every leaf of `target` against the host before anything is changed.
    fn resolve_leaves(&self, host: HostHandle, target: &Target) -> Result<Vec<Leaf>> {
        let shared = self.hosts.get(host).ok_or(AnimatorError::UnknownHost(host))?;
        let object = shared.borrow();
        let mut leaves = Vec::new();
        target.try_visit_leaves(&mut |field, value| {
            if !value.is_finite() {
                return Err(AnimatorError::InvalidTarget {
                    field: field.clone(),
                    value,
                });
            }
            let current = object
                .field(field.segments())
                .ok_or_else(|| AnimatorError::MissingField {
                    host,
                    field: field.clone(),
                })?;
            leaves.push(Leaf {
                field: field.clone(),
                target: value,
                current,
            });
            Ok(())
        })?;
        Ok(leaves)
    }

    /// Validate an orientation request and read the field's current rotation.
    fn read_orientation(&self, host: HostHandle, field: &FieldPath, target: DQuat) -> Result<DQuat> {
        if !target.is_finite() || target.length_squared() == 0.0 {
            let value = target
                .to_array()
                .into_iter()
                .find(|c| !c.is_finite())
                .unwrap_or(0.0);
            return Err(AnimatorError::InvalidTarget {
                field: field.clone(),
                value,
            });
        }
        let shared = self.hosts.get(host).ok_or(AnimatorError::UnknownHost(host))?;
        let current = read_quat(&*shared.borrow(), field)
            .map_err(|field| AnimatorError::MissingField { host, field })?;
        if current.is_finite() && current.length_squared() > 0.0 {
            Ok(current)
        } else {
            Ok(DQuat::IDENTITY)
        }
    }

    /// Drop orientation springs owning any of `leaves`. Scalar requests win.
    fn cancel_orientations_over(&mut self, host: HostHandle, leaves: &[Leaf]) {
        for prefix in self.orientations.fields_of(host) {
            if leaves.iter().any(|leaf| leaf.field.starts_with(&prefix)) {
                self.orientations.remove(host, &prefix);
            }
        }
    }

    /// Drop scalar animations on leaves under `prefix`.
    fn cancel_fields_under(&mut self, host: HostHandle, prefix: &FieldPath) {
        let Some(fields) = self.objects.get_mut(&host) else {
            return;
        };
        fields.retain(|field, _| !field.starts_with(prefix));
        if fields.is_empty() {
            self.objects.shift_remove(&host);
        }
    }

    /// Field-change for each `x/y/z/w` leaf of a quaternion field.
    fn emit_component_changes(&mut self, host: HostHandle, field: &FieldPath) -> Result<()> {
        for name in QUAT_COMPONENTS {
            self.emit(EventKind::FieldChange, host, &field.clone().key(name))?;
        }
        Ok(())
    }

    /// True when the host has no scalar or orientation animations.
    fn is_idle(&self, host: HostHandle) -> bool {
        !self.objects.contains_key(&host) && !self.orientations.has_host(host)
    }

    /// Remove one scalar entry, dropping the host's set when it empties.
    /// Returns true if the set emptied.
    fn drop_field(&mut self, host: HostHandle, field: &FieldPath) -> bool {
        let Some(fields) = self.objects.get_mut(&host) else {
            return false;
        };
        fields.shift_remove(field);
        if fields.is_empty() {
            self.objects.shift_remove(&host);
            true
        } else {
            false
        }
    }

    fn prune_dropped_hosts(&mut self) {
        for handle in self.hosts.prune() {
            let fields = self.objects.shift_remove(&handle).map_or(0, |f| f.len());
            let orientations = self.orientations.remove_host(handle).len();
            let listeners = self.events.remove_host(handle);
            log::debug!(
                "host {handle:?} was dropped; discarded {fields} field animations, \
                 {orientations} orientation springs and {listeners} listeners"
            );
        }
    }

    fn fire_set_events(&mut self, host: HostHandle, fields: &[FieldPath]) -> Result<()> {
        for field in fields {
            self.changes.mark(host, field);
            self.emit(EventKind::FieldComplete, host, field)?;
            self.emit(EventKind::FieldChange, host, field)?;
        }
        if self.is_idle(host) {
            self.emit(EventKind::ObjectComplete, host, &FieldPath::root())?;
        }
        Ok(())
    }

    fn close_bracket(&mut self, result: Result<()>) -> Result<()> {
        if let Err(err) = result {
            self.changes.abandon();
            return Err(err);
        }
        let Some(touched) = self.changes.end() else {
            return Ok(());
        };
        for (host, fields) in touched {
            self.emit(EventKind::ObjectChange, host, &FieldPath::root())?;
            for prefix in self.events.change_prefixes(host) {
                if fields.iter().any(|field| field.starts_with(&prefix)) {
                    self.emit(EventKind::ObjectChange, host, &prefix)?;
                }
            }
        }
        Ok(())
    }

    /// Call the listeners of one channel.
    ///
    /// Works from a snapshot; listeners unsubscribed by an earlier one in the
    /// same dispatch are skipped, as is a listener that is already running.
    fn emit(&mut self, kind: EventKind, host: HostHandle, field: &FieldPath) -> Result<()> {
        if !self.events.has_listeners(kind, host, field) {
            return Ok(());
        }
        let event = AnimationEvent {
            kind,
            host,
            field: field.clone(),
        };
        for (id, listener) in self.events.snapshot(kind, host, field) {
            if !self.events.is_subscribed(id) {
                continue;
            }
            let Ok(mut callback) = listener.try_borrow_mut() else {
                log::warn!("skipping re-entrant {kind:?} listener {id:?} on {host:?}");
                continue;
            };
            (&mut **callback)(self, &event).map_err(AnimatorError::Listener)?;
        }
        Ok(())
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}
