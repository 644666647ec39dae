//! Single consumer thread for hardware edges.
//!
//! Interrupt callbacks only enqueue; the dispatcher thread owns delivery into
//! the `Tacho`, so edges from every source are handled one at a time and in
//! arrival order. The queue is unbounded and never drops an edge.
//!
//! Each `Dispatcher` spawns exactly one thread, which drains the queue and is
//! joined on shutdown or drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel as xch;
use rotor_traits::{Edge, EdgeSink};

use crate::controller::Tacho;

enum Msg {
    Edge(Edge),
    Shutdown,
}

/// Cheap handle given to edge producers.
#[derive(Clone)]
pub struct EdgeSender {
    tx: xch::Sender<Msg>,
}

impl core::fmt::Debug for EdgeSender {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EdgeSender")
            .field("queued", &self.tx.len())
            .finish()
    }
}

impl EdgeSink for EdgeSender {
    fn emit(&self, edge: Edge) {
        if self.tx.send(Msg::Edge(edge)).is_err() {
            tracing::trace!(?edge, "dispatcher gone, edge discarded");
        }
    }
}

pub struct Dispatcher {
    tx: xch::Sender<Msg>,
    handled: Arc<AtomicU64>,
    join_handle: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn spawn(tacho: Tacho) -> Self {
        let (tx, rx) = xch::unbounded::<Msg>();
        let handled = Arc::new(AtomicU64::new(0));
        let handled_clone = Arc::clone(&handled);

        let join_handle = std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    Msg::Edge(edge) => {
                        tacho.handle(edge);
                        handled_clone.fetch_add(1, Ordering::Relaxed);
                    }
                    Msg::Shutdown => {
                        tracing::debug!("dispatcher received shutdown signal");
                        break;
                    }
                }
            }
            tracing::trace!("dispatcher thread exiting cleanly");
        });

        Self {
            tx,
            handled,
            join_handle: Some(join_handle),
        }
    }

    pub fn sender(&self) -> EdgeSender {
        EdgeSender {
            tx: self.tx.clone(),
        }
    }

    /// Edges delivered so far.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::Relaxed)
    }

    /// Deliver everything already queued, then stop the thread.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.join_handle.take() else {
            return;
        };
        let _ = self.tx.send(Msg::Shutdown);
        match handle.join() {
            Ok(()) => tracing::trace!("dispatcher thread joined successfully"),
            Err(e) => tracing::warn!(?e, "dispatcher thread panicked during shutdown"),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
