//! Thread-safe in-memory entity graph store.
//!
//! All nine entity kinds live in one store: a `by_id` map holding the
//! records, a kind index for typed iteration, a natural-key index for
//! discovery deduplication, and per-direction adjacency tables holding the
//! schema-checked edges. A single readers/writer lock protects the whole
//! state; reachability walks run under the read lock for their full
//! duration.
//!
//! Entities are append-only: nothing is ever removed, and activation
//! changes never alter topology.

pub mod schema;

mod reachability;

use std::collections::HashMap;
use std::sync::RwLock;

use crate::entity::{Entity, NaturalKey};
use crate::error::{BackendError, BackendResult};
use crate::types::{EntityId, EntityKind};

fn lock_err(context: &'static str) -> BackendError {
    BackendError::internal(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct DatabaseState {
    next_id: u64,
    by_id: HashMap<EntityId, Entity>,
    by_kind: HashMap<EntityKind, Vec<EntityId>>,
    by_key: HashMap<NaturalKey, EntityId>,
    children: HashMap<EntityId, Vec<EntityId>>,
    parents: HashMap<EntityId, Vec<EntityId>>,
}

impl DatabaseState {
    fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        self.by_id.get(&id).map(Entity::kind)
    }

    fn neighbors_of_kind(
        map: &HashMap<EntityId, Vec<EntityId>>,
        by_id: &HashMap<EntityId, Entity>,
        id: EntityId,
        kind: EntityKind,
    ) -> Vec<EntityId> {
        map.get(&id)
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|n| by_id.get(n).map(Entity::kind) == Some(kind))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn children_of_kind(&self, id: EntityId, kind: EntityKind) -> Vec<EntityId> {
        Self::neighbors_of_kind(&self.children, &self.by_id, id, kind)
    }

    fn parents_of_kind(&self, id: EntityId, kind: EntityKind) -> Vec<EntityId> {
        Self::neighbors_of_kind(&self.parents, &self.by_id, id, kind)
    }
}

/// The entity graph database.
#[derive(Debug, Default)]
pub struct Database {
    state: RwLock<DatabaseState>,
}

impl Database {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new entity, assigning a fresh id.
    ///
    /// # Errors
    ///
    /// `DuplicateIdentity` if an entity with the same natural key is
    /// already stored. Use [`Database::insert_or_reactivate`] for the
    /// discovery upsert path.
    pub fn insert(&self, entity: Entity) -> BackendResult<EntityId> {
        let mut state = self.state.write().map_err(|_| lock_err("insert"))?;
        let key = entity.natural_key();
        if state.by_key.contains_key(&key) {
            return Err(BackendError::DuplicateIdentity {
                key: key.to_string(),
            });
        }
        Ok(Self::insert_locked(&mut state, entity, key))
    }

    /// Inserts the entity, or reactivates the stored entity with the same
    /// natural key.
    ///
    /// Reactivation sets `active = true`, refreshes `updated_at`, and
    /// replaces the QoS blob when the incoming entity carries one. Returns
    /// the entity id and whether a new record was created.
    pub fn insert_or_reactivate(&self, entity: Entity) -> BackendResult<(EntityId, bool)> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("insert_or_reactivate"))?;
        let key = entity.natural_key();
        if let Some(id) = state.by_key.get(&key).copied() {
            let existing = state
                .by_id
                .get_mut(&id)
                .ok_or_else(|| BackendError::internal(format!("key index points at missing entity {id}")))?;
            existing.active = true;
            if !entity.qos.is_null() {
                existing.qos = entity.qos;
            }
            existing.touch();
            return Ok((id, false));
        }
        Ok((Self::insert_locked(&mut state, entity, key), true))
    }

    fn insert_locked(state: &mut DatabaseState, mut entity: Entity, key: NaturalKey) -> EntityId {
        state.next_id += 1;
        let id = EntityId::from_raw(state.next_id);
        entity.id = id;
        state.by_kind.entry(entity.kind()).or_default().push(id);
        state.by_key.insert(key, id);
        state.by_id.insert(id, entity);
        id
    }

    /// Adds a bidirectional relation between two stored entities.
    ///
    /// Linking is idempotent: relinking an existing pair is a no-op.
    ///
    /// # Errors
    ///
    /// `BadParameter` if either endpoint is unknown; `SchemaViolation` if
    /// the kind pair is not in the relation schema.
    pub fn link(&self, parent: EntityId, child: EntityId) -> BackendResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("link"))?;
        let parent_kind = state
            .kind_of(parent)
            .ok_or_else(|| BackendError::bad_parameter(format!("unknown link parent {parent}")))?;
        let child_kind = state
            .kind_of(child)
            .ok_or_else(|| BackendError::bad_parameter(format!("unknown link child {child}")))?;
        if !schema::is_valid_relation(parent_kind, child_kind) {
            return Err(BackendError::SchemaViolation {
                parent_kind,
                child_kind,
            });
        }

        let down = state.children.entry(parent).or_default();
        if !down.contains(&child) {
            down.push(child);
        }
        let up = state.parents.entry(child).or_default();
        if !up.contains(&parent) {
            up.push(parent);
        }
        Ok(())
    }

    /// Returns a snapshot of the entity, if stored.
    pub fn get(&self, id: EntityId) -> BackendResult<Option<Entity>> {
        let state = self.state.read().map_err(|_| lock_err("get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    /// Returns a snapshot of the entity, failing on unknown ids.
    pub fn get_existing(&self, id: EntityId) -> BackendResult<Entity> {
        self.get(id)?
            .ok_or_else(|| BackendError::bad_parameter(format!("unknown entity {id}")))
    }

    /// All entities of a kind, in insertion order. Callers must not rely
    /// on the order.
    pub fn by_kind(&self, kind: EntityKind) -> BackendResult<Vec<Entity>> {
        let state = self.state.read().map_err(|_| lock_err("by_kind"))?;
        Self::check_kind(kind)?;
        Ok(state
            .by_kind
            .get(&kind)
            .map(|ids| ids.iter().filter_map(|id| state.by_id.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    /// Ids of all entities of a kind.
    pub fn ids_by_kind(&self, kind: EntityKind) -> BackendResult<Vec<EntityId>> {
        let state = self.state.read().map_err(|_| lock_err("ids_by_kind"))?;
        Self::check_kind(kind)?;
        Ok(state.by_kind.get(&kind).cloned().unwrap_or_default())
    }

    /// Entities of `kind` reachable from `origin` through the schema.
    pub fn get_entities(&self, kind: EntityKind, origin: EntityId) -> BackendResult<Vec<Entity>> {
        let state = self.state.read().map_err(|_| lock_err("get_entities"))?;
        let ids = Self::reachable_checked(&state, kind, origin)?;
        Ok(ids.into_iter().filter_map(|id| state.by_id.get(&id).cloned()).collect())
    }

    /// Ids of entities of `kind` reachable from `origin`.
    pub fn get_entity_ids(&self, kind: EntityKind, origin: EntityId) -> BackendResult<Vec<EntityId>> {
        let state = self.state.read().map_err(|_| lock_err("get_entity_ids"))?;
        Ok(Self::reachable_checked(&state, kind, origin)?.into_iter().collect())
    }

    fn reachable_checked(
        state: &DatabaseState,
        kind: EntityKind,
        origin: EntityId,
    ) -> BackendResult<std::collections::BTreeSet<EntityId>> {
        Self::check_kind(kind)?;
        if !state.by_id.contains_key(&origin) {
            return Err(BackendError::bad_parameter(format!(
                "unknown reachability origin {origin}"
            )));
        }
        Ok(reachability::reachable(state, kind, origin))
    }

    fn check_kind(kind: EntityKind) -> BackendResult<()> {
        if kind == EntityKind::Invalid {
            return Err(BackendError::bad_parameter("entity kind must not be invalid"));
        }
        Ok(())
    }

    /// Flips the activity flag of a stored entity.
    pub fn set_active(&self, id: EntityId, active: bool) -> BackendResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("set_active"))?;
        let entity = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| BackendError::bad_parameter(format!("unknown entity {id}")))?;
        if entity.active != active {
            entity.active = active;
            entity.touch();
        }
        Ok(())
    }

    /// Current activity flag of a stored entity.
    pub fn is_active(&self, id: EntityId) -> BackendResult<bool> {
        Ok(self.get_existing(id)?.active)
    }

    /// Replaces the QoS blob of a stored entity.
    pub fn update_qos(&self, id: EntityId, qos: serde_json::Value) -> BackendResult<()> {
        let mut state = self.state.write().map_err(|_| lock_err("update_qos"))?;
        let entity = state
            .by_id
            .get_mut(&id)
            .ok_or_else(|| BackendError::bad_parameter(format!("unknown entity {id}")))?;
        entity.qos = qos;
        entity.touch();
        Ok(())
    }

    /// Looks up an entity id by natural key.
    pub fn find_by_key(&self, key: &NaturalKey) -> BackendResult<Option<EntityId>> {
        let state = self.state.read().map_err(|_| lock_err("find_by_key"))?;
        Ok(state.by_key.get(key).copied())
    }

    /// Direct children of `id` with the given kind.
    pub fn children_of(&self, id: EntityId, kind: EntityKind) -> BackendResult<Vec<EntityId>> {
        let state = self.state.read().map_err(|_| lock_err("children_of"))?;
        Ok(state.children_of_kind(id, kind))
    }

    /// Direct parents of `id` with the given kind.
    pub fn parents_of(&self, id: EntityId, kind: EntityKind) -> BackendResult<Vec<EntityId>> {
        let state = self.state.read().map_err(|_| lock_err("parents_of"))?;
        Ok(state.parents_of_kind(id, kind))
    }
}
