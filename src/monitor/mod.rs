//! Monitor lifecycle and registry.
//!
//! A monitor is a long-lived observation session bound to one domain. The
//! registry tracks one entry per domain id: its state (`Running` or
//! `Stopped`), the dispatcher owning the callback worker while running,
//! and the per-callback activity counters feeding listener [`Status`].

pub(crate) mod dispatcher;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::error::{BackendError, BackendResult};
use crate::listener::{CallbackMask, DomainListener, Status};
use crate::types::{DomainId, EntityId};

use self::dispatcher::{CallbackEvent, CallbackKind, Dispatcher};

/// Lifecycle state of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MonitorState {
    Running,
    Stopped,
}

struct MonitorEntry {
    monitor_id: EntityId,
    state: MonitorState,
    dispatcher: Option<Dispatcher>,
    /// Active-entity counters, indexed by [`CallbackKind::index`].
    counts: [i64; 4],
}

fn lock_err() -> BackendError {
    BackendError::internal("poisoned lock: monitor registry")
}

/// Registry of all monitors ever initialized, keyed by domain id.
#[derive(Default)]
pub(crate) struct MonitorRegistry {
    inner: Mutex<HashMap<DomainId, MonitorEntry>>,
}

impl MonitorRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a running monitor for `domain_id` and spawns its
    /// dispatcher.
    ///
    /// # Errors
    ///
    /// `AlreadyMonitored` if a running monitor exists for the domain.
    pub(crate) fn begin(
        &self,
        domain_id: DomainId,
        monitor_id: EntityId,
        listener: Option<Arc<dyn DomainListener>>,
        mask: CallbackMask,
    ) -> BackendResult<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_err())?;
        if let Some(entry) = inner.get(&domain_id) {
            if entry.state == MonitorState::Running {
                return Err(BackendError::AlreadyMonitored {
                    domain_id,
                    monitor_id: entry.monitor_id,
                });
            }
        }

        info!(domain_id, %monitor_id, "monitor initialized");
        inner.insert(
            domain_id,
            MonitorEntry {
                monitor_id,
                state: MonitorState::Running,
                dispatcher: Some(Dispatcher::spawn(monitor_id, listener, mask)),
                counts: [0; 4],
            },
        );
        Ok(())
    }

    /// Transitions a monitor to `Stopped`, handing back its dispatcher so
    /// the caller can shut it down outside the registry lock.
    ///
    /// Returns `None` when the monitor was already stopped (stopping is
    /// idempotent).
    ///
    /// # Errors
    ///
    /// `BadParameter` if `monitor_id` does not name a monitor.
    pub(crate) fn stop(&self, monitor_id: EntityId) -> BackendResult<Option<Dispatcher>> {
        let mut inner = self.inner.lock().map_err(|_| lock_err())?;
        let entry = inner
            .values_mut()
            .find(|entry| entry.monitor_id == monitor_id)
            .ok_or_else(|| BackendError::bad_parameter(format!("unknown monitor {monitor_id}")))?;

        if entry.state == MonitorState::Stopped {
            return Ok(None);
        }
        entry.state = MonitorState::Stopped;
        info!(%monitor_id, "monitor stopped");
        Ok(entry.dispatcher.take())
    }

    /// Returns true if `monitor_id` names a running monitor.
    pub(crate) fn is_running(&self, monitor_id: EntityId) -> BackendResult<bool> {
        let inner = self.inner.lock().map_err(|_| lock_err())?;
        Ok(inner
            .values()
            .any(|entry| entry.monitor_id == monitor_id && entry.state == MonitorState::Running))
    }

    /// Monitor ids of every running monitor except `monitor_id`.
    pub(crate) fn running_monitors_except(&self, monitor_id: EntityId) -> BackendResult<Vec<EntityId>> {
        let inner = self.inner.lock().map_err(|_| lock_err())?;
        Ok(inner
            .values()
            .filter(|entry| entry.state == MonitorState::Running && entry.monitor_id != monitor_id)
            .map(|entry| entry.monitor_id)
            .collect())
    }

    /// Replaces (or clears) the listener of a running monitor.
    ///
    /// # Errors
    ///
    /// `BadParameter` if the monitor is unknown or stopped.
    pub(crate) fn set_listener(
        &self,
        monitor_id: EntityId,
        listener: Option<Arc<dyn DomainListener>>,
        mask: CallbackMask,
    ) -> BackendResult<()> {
        let inner = self.inner.lock().map_err(|_| lock_err())?;
        let entry = inner
            .values()
            .find(|entry| entry.monitor_id == monitor_id)
            .ok_or_else(|| BackendError::bad_parameter(format!("unknown monitor {monitor_id}")))?;
        let dispatcher = entry.dispatcher.as_ref().ok_or_else(|| {
            BackendError::bad_parameter(format!("monitor {monitor_id} is stopped"))
        })?;
        dispatcher.set_listener(listener, mask);
        Ok(())
    }

    /// Updates the activity counter for `kind` and enqueues the matching
    /// listener callback. Events for stopped monitors are dropped.
    pub(crate) fn dispatch(
        &self,
        monitor_id: EntityId,
        kind: CallbackKind,
        entity_id: EntityId,
        change: i64,
    ) -> BackendResult<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_err())?;
        let Some(entry) = inner
            .values_mut()
            .find(|entry| entry.monitor_id == monitor_id && entry.state == MonitorState::Running)
        else {
            return Ok(());
        };

        entry.counts[kind.index()] += change;
        let status = Status {
            current_count: entry.counts[kind.index()],
            current_count_change: change,
        };
        if let Some(dispatcher) = &entry.dispatcher {
            dispatcher.enqueue(CallbackEvent {
                kind,
                domain_id: monitor_id,
                entity_id,
                status,
            });
        }
        Ok(())
    }
}
