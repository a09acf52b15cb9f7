//! The public facade of the statistics backend.
//!
//! [`StatisticsBackend`] ties the pieces together: the entity graph
//! database, the monitor registry, and the discovery ingress. Most
//! deployments hold exactly one backend for the whole process; use
//! [`StatisticsBackend::global`] for that, or own an instance directly
//! (tests do).

use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};

use crate::database::Database;
use crate::discovery::{self, DiscoveryEvent};
use crate::entity::{Entity, EntityData};
use crate::error::{BackendError, BackendResult};
use crate::listener::{CallbackMask, DomainListener};
use crate::monitor::MonitorRegistry;
use crate::types::{DomainId, EntityId, EntityKind};

static GLOBAL: OnceLock<StatisticsBackend> = OnceLock::new();

/// The statistics backend: monitor lifecycle, discovery ingress, and
/// queries over the entity graph.
#[derive(Default)]
pub struct StatisticsBackend {
    database: Database,
    monitors: MonitorRegistry,
}

impl StatisticsBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            database: Database::new(),
            monitors: MonitorRegistry::new(),
        }
    }

    /// The process-wide backend instance. Initialized on first use;
    /// calling this from several threads at once is safe.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::new)
    }

    /// Starts monitoring a domain.
    ///
    /// Creates (or, after a previous stop, reactivates) the domain entity
    /// and spawns the monitor's callback dispatcher. The returned id names
    /// both the monitor and its domain entity.
    ///
    /// # Errors
    ///
    /// `AlreadyMonitored` if a running monitor exists for `domain_id`.
    pub fn init_monitor(
        &self,
        domain_id: DomainId,
        listener: Option<Arc<dyn DomainListener>>,
        mask: CallbackMask,
    ) -> BackendResult<EntityId> {
        let (monitor_id, created) = self.database.insert_or_reactivate(Entity::new(
            domain_id.to_string(),
            EntityData::Domain { domain_id },
        ))?;
        self.monitors.begin(domain_id, monitor_id, listener, mask)?;
        debug!(domain_id, %monitor_id, created, "domain entity ready");
        Ok(monitor_id)
    }

    /// Stops a monitor.
    ///
    /// Idempotent. On return no further callbacks for this monitor will be
    /// invoked; an in-flight callback may run to completion. The domain
    /// entity and everything reachable from it are deactivated, except
    /// physical entities and locators still reachable from another running
    /// monitor. Topology never shrinks.
    ///
    /// # Errors
    ///
    /// `BadParameter` if `monitor_id` does not name a monitor.
    pub fn stop_monitor(&self, monitor_id: EntityId) -> BackendResult<()> {
        let Some(dispatcher) = self.monitors.stop(monitor_id)? else {
            return Ok(());
        };
        dispatcher.shutdown();

        let others = self.monitors.running_monitors_except(monitor_id)?;
        for kind in EntityKind::ALL {
            for id in self.database.get_entity_ids(kind, monitor_id)? {
                if (kind.is_physical() || kind == EntityKind::Locator)
                    && self.reachable_from_any(&others, id)?
                {
                    continue;
                }
                self.database.set_active(id, false)?;
            }
        }
        Ok(())
    }

    fn reachable_from_any(&self, monitors: &[EntityId], id: EntityId) -> BackendResult<bool> {
        let domains = self.database.get_entity_ids(EntityKind::Domain, id)?;
        Ok(monitors.iter().any(|m| domains.contains(m)))
    }

    /// Reserved: removes the monitor's non-physical entities.
    ///
    /// # Errors
    ///
    /// Always `NotSupported`.
    pub fn clear_monitor(&self, _monitor_id: EntityId) -> BackendResult<()> {
        Err(BackendError::NotSupported {
            operation: "clear_monitor",
        })
    }

    /// Replaces (or clears) the listener of a running monitor.
    pub fn set_domain_listener(
        &self,
        monitor_id: EntityId,
        listener: Option<Arc<dyn DomainListener>>,
        mask: CallbackMask,
    ) -> BackendResult<()> {
        self.monitors.set_listener(monitor_id, listener, mask)
    }

    /// Applies one discovery event on behalf of a monitor and dispatches
    /// the matching listener callback.
    ///
    /// Events are applied synchronously in call order; the callback is
    /// enqueued to the monitor's dispatcher after the database write
    /// completes. Recoverable application failures (schema violations,
    /// references to unknown entities) are logged and dropped.
    ///
    /// # Errors
    ///
    /// `BadParameter` if `monitor_id` does not name a running monitor or
    /// the event carries a `current_count_change` outside `{-1, 0, +1}`;
    /// `Internal` on fatal store failures.
    pub fn process_discovery_event(
        &self,
        monitor_id: EntityId,
        event: &DiscoveryEvent,
    ) -> BackendResult<()> {
        if !self.monitors.is_running(monitor_id)? {
            return Err(BackendError::bad_parameter(format!(
                "no running monitor {monitor_id}"
            )));
        }
        // A malformed delta is a caller bug, not middleware noise: surface
        // it instead of dropping it with the recoverable failures below.
        if !matches!(event.current_count_change, -1 | 0 | 1) {
            return Err(BackendError::bad_parameter(format!(
                "current_count_change must be -1, 0 or +1, got {}",
                event.current_count_change
            )));
        }

        match discovery::apply(&self.database, monitor_id, event) {
            Ok(applied) => self.monitors.dispatch(
                monitor_id,
                applied.callback,
                applied.entity_id,
                event.current_count_change,
            ),
            Err(err) if err.is_recoverable() => {
                warn!(%monitor_id, error = %err, "discovery event dropped");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// All entities of a kind.
    pub fn get_entities(&self, kind: EntityKind) -> BackendResult<Vec<Entity>> {
        self.database.by_kind(kind)
    }

    /// Entities of `kind` reachable from `origin` through the schema.
    pub fn get_entities_from(&self, kind: EntityKind, origin: EntityId) -> BackendResult<Vec<Entity>> {
        self.database.get_entities(kind, origin)
    }

    /// Ids of all entities of a kind.
    pub fn get_entity_ids(&self, kind: EntityKind) -> BackendResult<Vec<EntityId>> {
        self.database.ids_by_kind(kind)
    }

    /// Ids of entities of `kind` reachable from `origin`.
    pub fn get_entity_ids_from(
        &self,
        kind: EntityKind,
        origin: EntityId,
    ) -> BackendResult<Vec<EntityId>> {
        self.database.get_entity_ids(kind, origin)
    }

    /// Current activity flag of an entity.
    pub fn is_active(&self, id: EntityId) -> BackendResult<bool> {
        self.database.is_active(id)
    }

    /// Kind of a stored entity.
    pub fn get_type(&self, id: EntityId) -> BackendResult<EntityKind> {
        Ok(self.database.get_existing(id)?.kind())
    }

    /// Metatraffic flag of a stored entity.
    pub fn is_metatraffic(&self, id: EntityId) -> BackendResult<bool> {
        Ok(self.database.get_existing(id)?.metatraffic)
    }

    /// JSON dump of a stored entity.
    pub fn get_info(&self, id: EntityId) -> BackendResult<serde_json::Value> {
        let entity = self.database.get_existing(id)?;
        serde_json::to_value(&entity)
            .map_err(|e| BackendError::internal(format!("entity serialization failed: {e}")))
    }

    /// Direct access to the entity graph database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.database
    }
}
