//! Thread-safe handle over one `TachoCore`.
//!
//! Every edge, operator action and accessor takes the same lock, and the whole
//! handling of one edge (driver I/O included) runs under it. Notifications are
//! published after the lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rotor_traits::{Edge, EdgeSink};

use crate::builder::{BoxedDriver, Missing, TachoBuilder};
use crate::cycle::{SetPointChange, TachoCore};
use crate::fixed_point::Fixed;
use crate::publish::Publisher;
use crate::snapshot::Snapshot;

pub struct Tacho {
    core: Arc<Mutex<TachoCore<BoxedDriver>>>,
    publisher: Arc<Publisher>,
}

impl Clone for Tacho {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            publisher: Arc::clone(&self.publisher),
        }
    }
}

impl core::fmt::Debug for Tacho {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tacho")
            .field("core", &*self.lock())
            .field("publisher", &self.publisher)
            .finish()
    }
}

impl Tacho {
    /// Start building a Tacho.
    pub fn builder() -> TachoBuilder<Missing> {
        TachoBuilder::default()
    }

    pub(crate) fn from_core(core: TachoCore<BoxedDriver>) -> Self {
        Self {
            core: Arc::new(Mutex::new(core)),
            publisher: Arc::new(Publisher::new()),
        }
    }

    // A panic inside one edge leaves the state consistent enough to keep going.
    fn lock(&self) -> MutexGuard<'_, TachoCore<BoxedDriver>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process one edge; clock edges publish and return their snapshot.
    /// Expects a single clock-edge producer; see the `EdgeSink` impl.
    pub fn handle(&self, edge: Edge) -> Option<Snapshot> {
        let snapshot = self.lock().handle(edge);
        if let Some(s) = snapshot {
            self.publisher.publish_snapshot(s);
        }
        snapshot
    }

    pub fn on_clock_edge(&self) -> Snapshot {
        let snapshot = self.lock().on_clock_edge();
        self.publisher.publish_snapshot(snapshot);
        snapshot
    }

    /// Select the set-point shown as `value`. Returns false, leaving the
    /// current set-point in effect, when the value is not in the table.
    pub fn select_set_point(&self, value: Fixed) -> bool {
        let change = self.lock().select_set_point(value);
        match change {
            Some(c) => {
                self.publish_change(c);
                true
            }
            None => false,
        }
    }

    pub fn reset(&self) {
        let change = self.lock().reset();
        self.publish_change(change);
    }

    pub fn stop(&self) {
        let change = self.lock().stop();
        self.publish_change(change);
    }

    /// Read and log the driver fault register.
    pub fn check_fault(&self) -> Option<u8> {
        self.lock().check_fault()
    }

    fn publish_change(&self, change: SetPointChange) {
        self.publisher.publish_set_point(change.old, change.new);
    }

    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// Run `f` with the state locked.
    pub fn with_core<R>(&self, f: impl FnOnce(&mut TachoCore<BoxedDriver>) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn position(&self) -> i64 {
        self.lock().position()
    }

    pub fn counter(&self) -> u64 {
        self.lock().counter()
    }

    pub fn set_point(&self) -> Fixed {
        self.lock().set_point_display()
    }
}

/// Direct delivery: the edge is handled on the caller's thread.
///
/// Snapshots are published after the core lock is released, so clock edges
/// must come from a single producer or subscribers may see them out of order.
/// Route concurrent sources through a [`Dispatcher`](crate::Dispatcher).
impl EdgeSink for Tacho {
    fn emit(&self, edge: Edge) {
        self.handle(edge);
    }
}
