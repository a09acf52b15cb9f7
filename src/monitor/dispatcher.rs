//! Per-monitor callback dispatch worker.
//!
//! Each running monitor owns one dispatcher: an unbounded FIFO drained by a
//! dedicated thread that invokes the user's listener callbacks. Discovery
//! ingress enqueues after releasing the database write lock, so a slow (or
//! panicking) callback can never stall discovery. Shutdown flags the worker
//! first and then joins it, which gives `stop_monitor` its guarantee that
//! no callback runs after it returns.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::error;

use crate::listener::{CallbackMask, DomainListener, Status};
use crate::types::EntityId;

/// Which listener callback a discovery event maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallbackKind {
    Participant,
    Topic,
    DataReader,
    DataWriter,
}

impl CallbackKind {
    pub(crate) const fn mask_bit(self) -> CallbackMask {
        match self {
            Self::Participant => CallbackMask::PARTICIPANT_DISCOVERY,
            Self::Topic => CallbackMask::TOPIC_DISCOVERY,
            Self::DataReader => CallbackMask::DATAREADER_DISCOVERY,
            Self::DataWriter => CallbackMask::DATAWRITER_DISCOVERY,
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Participant => 0,
            Self::Topic => 1,
            Self::DataReader => 2,
            Self::DataWriter => 3,
        }
    }

    const fn callback_name(self) -> &'static str {
        match self {
            Self::Participant => "on_participant_discovery",
            Self::Topic => "on_topic_discovery",
            Self::DataReader => "on_datareader_discovery",
            Self::DataWriter => "on_datawriter_discovery",
        }
    }
}

/// One queued listener invocation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallbackEvent {
    pub kind: CallbackKind,
    pub domain_id: EntityId,
    pub entity_id: EntityId,
    pub status: Status,
}

type ListenerSlot = Arc<RwLock<Option<(Arc<dyn DomainListener>, CallbackMask)>>>;

/// Owns the dispatch queue and worker thread of one running monitor.
pub(crate) struct Dispatcher {
    tx: Option<Sender<CallbackEvent>>,
    stopped: Arc<AtomicBool>,
    listener: ListenerSlot,
    join: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .finish()
    }
}

impl Dispatcher {
    /// Spawns the worker thread for a monitor.
    pub(crate) fn spawn(
        monitor_id: EntityId,
        listener: Option<Arc<dyn DomainListener>>,
        mask: CallbackMask,
    ) -> Self {
        let slot: ListenerSlot = Arc::new(RwLock::new(listener.map(|l| (l, mask))));
        let stopped = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded::<CallbackEvent>();

        let worker_slot = Arc::clone(&slot);
        let worker_stopped = Arc::clone(&stopped);
        let join = thread::Builder::new()
            .name(format!("statmon-dispatch-{monitor_id}"))
            .spawn(move || worker_loop(&rx, &worker_stopped, &worker_slot))
            .expect("failed to spawn statmon dispatch worker");

        Self {
            tx: Some(tx),
            stopped,
            listener: slot,
            join: Some(join),
        }
    }

    /// Enqueues one callback invocation. Never blocks.
    pub(crate) fn enqueue(&self, event: CallbackEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    /// Replaces (or clears) the listener and mask seen by the worker.
    pub(crate) fn set_listener(&self, listener: Option<Arc<dyn DomainListener>>, mask: CallbackMask) {
        if let Ok(mut slot) = self.listener.write() {
            *slot = listener.map(|l| (l, mask));
        }
    }

    /// Stops dispatch and joins the worker.
    ///
    /// Queued events are drained without being dispatched; an in-flight
    /// callback runs to completion before this returns.
    pub(crate) fn shutdown(mut self) {
        self.stopped.store(true, Ordering::Release);
        drop(self.tx.take());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Detach rather than join: the worker exits once the sender is
        // gone, and joining here could deadlock a worker mid-callback.
        self.stopped.store(true, Ordering::Release);
        drop(self.tx.take());
    }
}

fn worker_loop(rx: &Receiver<CallbackEvent>, stopped: &AtomicBool, slot: &ListenerSlot) {
    while let Ok(event) = rx.recv() {
        if stopped.load(Ordering::Acquire) {
            continue;
        }
        let Some((listener, mask)) = slot.read().ok().and_then(|guard| guard.clone()) else {
            continue;
        };
        if !mask.contains(event.kind.mask_bit()) {
            continue;
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| match event.kind {
            CallbackKind::Participant => {
                listener.on_participant_discovery(event.domain_id, event.entity_id, event.status);
            }
            CallbackKind::Topic => {
                listener.on_topic_discovery(event.domain_id, event.entity_id, event.status);
            }
            CallbackKind::DataReader => {
                listener.on_datareader_discovery(event.domain_id, event.entity_id, event.status);
            }
            CallbackKind::DataWriter => {
                listener.on_datawriter_discovery(event.domain_id, event.entity_id, event.status);
            }
        }));

        if outcome.is_err() {
            error!(
                monitor_id = %event.domain_id,
                callback = event.kind.callback_name(),
                "listener callback panicked; continuing dispatch"
            );
        }
    }
}
