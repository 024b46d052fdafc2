//! Listener registry for animation events.
//!
//! Listeners are keyed by `(kind, host)` and then by field path, so both
//! whole-object and path-scoped subscriptions resolve with a single lookup.
//! Dispatch itself lives on the [`Animator`], which hands listeners a mutable
//! reference to itself.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::api::types::{AnimationEvent, EventKind, FieldPath, HostHandle};
use crate::systems::animator::Animator;

/// Callback invoked for each matching event.
///
/// Listeners may call back into the animator: start, retarget or remove
/// animations, subscribe or unsubscribe. An error aborts the dispatching
/// call and is returned from it.
pub type Listener = dyn FnMut(&mut Animator, &AnimationEvent) -> anyhow::Result<()>;

pub(crate) type SharedListener = Rc<RefCell<Box<Listener>>>;

/// Token returned by every `on_*` call; pass it to `Animator::unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(u64);

struct Entry {
    id: Subscription,
    listener: SharedListener,
}

/// Subscriptions, grouped by `(kind, host)` then by field.
#[derive(Default)]
pub struct EventHub {
    channels: HashMap<(EventKind, HostHandle), HashMap<FieldPath, Vec<Entry>>>,
    index: HashMap<Subscription, (EventKind, HostHandle, FieldPath)>,
    next_id: u64,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(
        &mut self,
        kind: EventKind,
        host: HostHandle,
        field: FieldPath,
        listener: Box<Listener>,
    ) -> Subscription {
        let id = Subscription(self.next_id);
        self.next_id += 1;
        self.channels
            .entry((kind, host))
            .or_default()
            .entry(field.clone())
            .or_default()
            .push(Entry {
                id,
                listener: Rc::new(RefCell::new(listener)),
            });
        self.index.insert(id, (kind, host, field));
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: Subscription) -> bool {
        let Some((kind, host, field)) = self.index.remove(&id) else {
            return false;
        };
        if let Some(fields) = self.channels.get_mut(&(kind, host)) {
            if let Some(entries) = fields.get_mut(&field) {
                entries.retain(|entry| entry.id != id);
                if entries.is_empty() {
                    fields.remove(&field);
                }
            }
            if fields.is_empty() {
                self.channels.remove(&(kind, host));
            }
        }
        true
    }

    /// Drop every subscription for a host.
    pub fn remove_host(&mut self, host: HostHandle) -> usize {
        let ids: Vec<Subscription> = self
            .index
            .iter()
            .filter(|(_, (_, h, _))| *h == host)
            .map(|(id, _)| *id)
            .collect();
        for id in &ids {
            self.unsubscribe(*id);
        }
        ids.len()
    }

    pub fn is_subscribed(&self, id: Subscription) -> bool {
        self.index.contains_key(&id)
    }

    pub fn has_listeners(&self, kind: EventKind, host: HostHandle, field: &FieldPath) -> bool {
        self.channels
            .get(&(kind, host))
            .is_some_and(|fields| fields.contains_key(field))
    }

    /// Paths with object-change listeners for `host`, other than the root.
    pub(crate) fn change_prefixes(&self, host: HostHandle) -> Vec<FieldPath> {
        let Some(fields) = self.channels.get(&(EventKind::ObjectChange, host)) else {
            return Vec::new();
        };
        let mut prefixes: Vec<FieldPath> = fields.keys().filter(|p| !p.is_root()).cloned().collect();
        prefixes.sort();
        prefixes
    }

    /// The listeners on one channel, in subscription order, as of now.
    pub(crate) fn snapshot(
        &self,
        kind: EventKind,
        host: HostHandle,
        field: &FieldPath,
    ) -> Vec<(Subscription, SharedListener)> {
        self.channels
            .get(&(kind, host))
            .and_then(|fields| fields.get(field))
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| (entry.id, Rc::clone(&entry.listener)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total live subscriptions.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn handles(n: usize) -> Vec<HostHandle> {
        let mut map: SlotMap<HostHandle, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn noop() -> Box<Listener> {
        Box::new(|_, _| Ok(()))
    }

    #[test]
    fn subscribe_and_unsubscribe() {
        let host = handles(1)[0];
        let mut hub = EventHub::new();
        let field = FieldPath::parse("opacity");
        let id = hub.subscribe(EventKind::FieldComplete, host, field.clone(), noop());

        assert!(hub.has_listeners(EventKind::FieldComplete, host, &field));
        assert!(!hub.has_listeners(EventKind::FieldChange, host, &field));
        assert_eq!(hub.snapshot(EventKind::FieldComplete, host, &field).len(), 1);

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert!(!hub.has_listeners(EventKind::FieldComplete, host, &field));
        assert!(hub.is_empty());
    }

    #[test]
    fn snapshot_keeps_subscription_order() {
        let host = handles(1)[0];
        let mut hub = EventHub::new();
        let root = FieldPath::root();
        let a = hub.subscribe(EventKind::ObjectComplete, host, root.clone(), noop());
        let b = hub.subscribe(EventKind::ObjectComplete, host, root.clone(), noop());
        let ids: Vec<Subscription> = hub
            .snapshot(EventKind::ObjectComplete, host, &root)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn change_prefixes_exclude_root() {
        let host = handles(1)[0];
        let mut hub = EventHub::new();
        hub.subscribe(EventKind::ObjectChange, host, FieldPath::root(), noop());
        hub.subscribe(EventKind::ObjectChange, host, FieldPath::parse("rotation"), noop());
        hub.subscribe(EventKind::ObjectChange, host, FieldPath::parse("pos"), noop());
        assert_eq!(
            hub.change_prefixes(host),
            vec![FieldPath::parse("pos"), FieldPath::parse("rotation")]
        );
    }

    #[test]
    fn remove_host_only_touches_that_host() {
        let hosts = handles(2);
        let mut hub = EventHub::new();
        hub.subscribe(EventKind::FieldChange, hosts[0], FieldPath::parse("x"), noop());
        hub.subscribe(EventKind::ObjectChange, hosts[0], FieldPath::root(), noop());
        let kept = hub.subscribe(EventKind::FieldChange, hosts[1], FieldPath::parse("x"), noop());

        assert_eq!(hub.remove_host(hosts[0]), 2);
        assert_eq!(hub.len(), 1);
        assert!(hub.is_subscribed(kept));
    }
}
