//! Change notifications for snapshot and set-point observers.
//!
//! Each notification carries the previous and the new value of one topic.
//! Notifications whose old and new values are equal are dropped. Observers are
//! called outside the publisher's lock, so they may subscribe or unsubscribe
//! from within a callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::fixed_point::Fixed;
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Snapshot,
    SetPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Snapshot { old: Snapshot, new: Snapshot },
    SetPoint { old: Fixed, new: Fixed },
}

impl Change {
    pub fn topic(&self) -> Topic {
        match self {
            Change::Snapshot { .. } => Topic::Snapshot,
            Change::SetPoint { .. } => Topic::SetPoint,
        }
    }
}

pub trait Observer: Send + Sync {
    fn on_change(&self, change: &Change);
}

impl<F> Observer for F
where
    F: Fn(&Change) + Send + Sync,
{
    fn on_change(&self, change: &Change) {
        self(change);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    // None receives every topic
    topic: Option<Topic>,
    observer: Arc<dyn Observer>,
}

#[derive(Default)]
pub struct Publisher {
    subs: Mutex<Vec<Subscription>>,
    last: Mutex<Snapshot>,
    next_id: AtomicU64,
}

impl core::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let n = self.subs.lock().unwrap_or_else(PoisonError::into_inner).len();
        f.debug_struct("Publisher").field("subscribers", &n).finish()
    }
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every topic.
    pub fn subscribe(&self, observer: impl Observer + 'static) -> SubscriptionId {
        self.add(None, Arc::new(observer))
    }

    /// Receive one topic only.
    pub fn subscribe_to(&self, topic: Topic, observer: impl Observer + 'static) -> SubscriptionId {
        self.add(Some(topic), Arc::new(observer))
    }

    fn add(&self, topic: Option<Topic>, observer: Arc<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                id,
                topic,
                observer,
            });
        id
    }

    /// Returns false when the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subs.lock().unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Most recently published snapshot.
    pub fn last_snapshot(&self) -> Snapshot {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn publish_snapshot(&self, new: Snapshot) {
        let old = {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *last, new)
        };
        if old != new {
            self.notify(&Change::Snapshot { old, new });
        }
    }

    pub fn publish_set_point(&self, old: Fixed, new: Fixed) {
        if old != new {
            self.notify(&Change::SetPoint { old, new });
        }
    }

    fn notify(&self, change: &Change) {
        let topic = change.topic();
        let targets: Vec<Arc<dyn Observer>> = self
            .subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.topic.is_none_or(|t| t == topic))
            .map(|s| Arc::clone(&s.observer))
            .collect();
        for observer in targets {
            observer.on_change(change);
        }
    }
}
