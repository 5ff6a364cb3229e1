//! Change notifications for the host.
//!
//! The controller calls `notify` after each mutating operation; hosts
//! subscribe instead of diffing state.

use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// Graph contents or project details changed.
    Graph,
    Selection,
    /// Pan, zoom, connection mode or rubber band.
    View,
    /// The whole project was swapped or bulk-replaced.
    Reset,
}

impl ChangeKind {
    /// Whether this change should be persisted.
    pub fn is_structural(&self) -> bool {
        matches!(self, ChangeKind::Graph | ChangeKind::Reset)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn FnMut(ChangeKind)>;

#[derive(Default)]
pub struct Observers {
    next_id: u64,
    callbacks: Vec<(SubscriptionId, Callback)>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.callbacks.len())
            .finish()
    }
}

impl Observers {
    pub fn subscribe(&mut self, callback: impl FnMut(ChangeKind) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, Box::new(callback)));
        id
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(sid, _)| *sid != id);
        self.callbacks.len() != before
    }

    pub fn notify(&mut self, kind: ChangeKind) {
        for (_, cb) in self.callbacks.iter_mut() {
            cb(kind);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_subscribe_notify_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut observers = Observers::default();

        let sink = Rc::clone(&seen);
        let id = observers.subscribe(move |k| sink.borrow_mut().push(k));
        observers.notify(ChangeKind::Graph);
        observers.notify(ChangeKind::View);

        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.notify(ChangeKind::Reset);

        assert_eq!(*seen.borrow(), vec![ChangeKind::Graph, ChangeKind::View]);
    }
}
