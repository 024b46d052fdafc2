use std::cell::RefCell;
use std::rc::{Rc, Weak};

use slotmap::SlotMap;

use crate::api::types::HostHandle;
use crate::components::value::Animatable;

/// Shared, caller-owned host object.
pub type SharedHost = Rc<RefCell<dyn Animatable>>;

/// Weak references to the host objects being animated.
/// The caller keeps ownership; a host dropped by the caller simply stops
/// resolving and is pruned on the next step.
pub struct HostRegistry {
    hosts: SlotMap<HostHandle, Weak<RefCell<dyn Animatable>>>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self {
            hosts: SlotMap::with_key(),
        }
    }

    /// Register a host. Registering the same `Rc` again returns the same handle.
    pub fn register<T: Animatable + 'static>(&mut self, host: &Rc<RefCell<T>>) -> HostHandle {
        let host: SharedHost = host.clone();
        let address = Rc::as_ptr(&host) as *const ();
        let existing = self
            .hosts
            .iter()
            .find(|(_, weak)| weak.strong_count() > 0 && Weak::as_ptr(weak) as *const () == address)
            .map(|(handle, _)| handle);
        match existing {
            Some(handle) => handle,
            None => self.hosts.insert(Rc::downgrade(&host)),
        }
    }

    /// Forget a host. Returns false if the handle was unknown.
    pub fn unregister(&mut self, handle: HostHandle) -> bool {
        self.hosts.remove(handle).is_some()
    }

    /// Resolve a handle to its host, if it is registered and still alive.
    pub fn get(&self, handle: HostHandle) -> Option<SharedHost> {
        self.hosts.get(handle)?.upgrade()
    }

    pub fn contains(&self, handle: HostHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Drop registrations whose host has been dropped. Returns their handles.
    pub fn prune(&mut self) -> Vec<HostHandle> {
        let dead: Vec<HostHandle> = self
            .hosts
            .iter()
            .filter(|(_, weak)| weak.strong_count() == 0)
            .map(|(handle, _)| handle)
            .collect();
        for handle in &dead {
            self.hosts.remove(*handle);
        }
        dead
    }

    /// Number of registrations, live or not yet pruned.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new()
    }
}
