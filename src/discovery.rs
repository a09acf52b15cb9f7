//! Discovery ingress: applies middleware discovery events to the graph.
//!
//! The middleware layer reports participants, topics and endpoints with a
//! `current_count_change` of `+1` (discovered), `-1` (undiscovered) or `0`
//! (QoS update). Application is keyed on natural identity: a `+1` for a
//! known key reactivates the stored entity instead of inserting a
//! duplicate, and a `-1` only flips activity flags. Topology never
//! shrinks.
//!
//! Participant descriptors carry the physical context the middleware
//! learned (host, user, process), so discovering a participant
//! materializes and links its whole physical chain. Endpoint descriptors
//! carry the owning participant GUID, the topic and the transport
//! locators.

use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::entity::{Entity, EntityData, NaturalKey};
use crate::error::{BackendError, BackendResult};
use crate::monitor::dispatcher::CallbackKind;
use crate::types::{EntityId, EntityKind, Guid};

/// Physical and identity data reported for a discovered participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDescriptor {
    /// Middleware GUID; the participant's natural key.
    pub guid: Guid,
    /// Participant name.
    pub name: String,
    /// Hostname of the machine running the participant.
    pub hostname: String,
    /// OS user owning the hosting process.
    pub username: String,
    /// Name of the hosting process.
    pub process_name: String,
    /// Pid of the hosting process.
    pub process_pid: u32,
    /// Opaque QoS blob.
    #[serde(default)]
    pub qos: serde_json::Value,
}

/// Identity data reported for a discovered topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicDescriptor {
    /// Topic name; part of the natural key.
    pub name: String,
    /// Registered type name; part of the natural key.
    pub type_name: String,
    /// True for discovery/liveness infrastructure topics.
    #[serde(default)]
    pub metatraffic: bool,
    /// Opaque QoS blob.
    #[serde(default)]
    pub qos: serde_json::Value,
}

/// Identity and transport data reported for a discovered endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Middleware GUID; the endpoint's natural key.
    pub guid: Guid,
    /// Endpoint name.
    pub name: String,
    /// GUID of the owning participant. The participant must already be
    /// discovered.
    pub participant_guid: Guid,
    /// Name of the topic this endpoint publishes or subscribes.
    pub topic_name: String,
    /// Registered type name of the topic.
    pub type_name: String,
    /// Transport locator addresses announced by the endpoint.
    pub locators: Vec<String>,
    /// True for discovery/liveness infrastructure endpoints.
    #[serde(default)]
    pub metatraffic: bool,
    /// Opaque QoS blob.
    #[serde(default)]
    pub qos: serde_json::Value,
}

/// What a discovery event refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum EntityDescriptor {
    /// A domain participant.
    Participant(ParticipantDescriptor),
    /// A topic.
    Topic(TopicDescriptor),
    /// A publishing endpoint.
    DataWriter(EndpointDescriptor),
    /// A subscribing endpoint.
    DataReader(EndpointDescriptor),
}

/// One discovery event delivered by the middleware layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryEvent {
    /// The entity the event refers to.
    pub descriptor: EntityDescriptor,
    /// `+1` discovered, `-1` undiscovered, `0` QoS/metadata update.
    pub current_count_change: i64,
}

impl DiscoveryEvent {
    /// A discovery (`+1`) event.
    #[must_use]
    pub fn discovered(descriptor: EntityDescriptor) -> Self {
        Self {
            descriptor,
            current_count_change: 1,
        }
    }

    /// An undiscovery (`-1`) event.
    #[must_use]
    pub fn undiscovered(descriptor: EntityDescriptor) -> Self {
        Self {
            descriptor,
            current_count_change: -1,
        }
    }

    /// A QoS/metadata update (`0`) event.
    #[must_use]
    pub fn updated(descriptor: EntityDescriptor) -> Self {
        Self {
            descriptor,
            current_count_change: 0,
        }
    }
}

/// Outcome of a successfully applied event: which listener callback to
/// dispatch and for which entity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AppliedEvent {
    pub callback: CallbackKind,
    pub entity_id: EntityId,
}

/// Applies one event to the database on behalf of a monitor's domain
/// entity.
///
/// # Errors
///
/// `BadParameter` for a malformed delta or an event referring to an
/// unknown entity; `SchemaViolation` if linking is rejected. Both are
/// recoverable: the caller logs and drops the event.
pub(crate) fn apply(
    db: &Database,
    domain_entity: EntityId,
    event: &DiscoveryEvent,
) -> BackendResult<AppliedEvent> {
    if !matches!(event.current_count_change, -1 | 0 | 1) {
        return Err(BackendError::bad_parameter(format!(
            "current_count_change must be -1, 0 or +1, got {}",
            event.current_count_change
        )));
    }

    match (&event.descriptor, event.current_count_change) {
        (EntityDescriptor::Participant(desc), 1) => discover_participant(db, domain_entity, desc),
        (EntityDescriptor::Participant(desc), -1) => {
            undiscover(db, &NaturalKey::Participant(desc.guid), CallbackKind::Participant)
        }
        (EntityDescriptor::Participant(desc), _) => {
            refresh(db, &NaturalKey::Participant(desc.guid), &desc.qos, CallbackKind::Participant)
        }
        (EntityDescriptor::Topic(desc), 1) => discover_topic(db, domain_entity, desc),
        (EntityDescriptor::Topic(desc), -1) => undiscover(
            db,
            &NaturalKey::Topic(domain_entity, desc.name.clone(), desc.type_name.clone()),
            CallbackKind::Topic,
        ),
        (EntityDescriptor::Topic(desc), _) => refresh(
            db,
            &NaturalKey::Topic(domain_entity, desc.name.clone(), desc.type_name.clone()),
            &desc.qos,
            CallbackKind::Topic,
        ),
        (EntityDescriptor::DataWriter(desc), 1) => {
            discover_endpoint(db, domain_entity, desc, EntityKind::DataWriter)
        }
        (EntityDescriptor::DataWriter(desc), -1) => {
            undiscover(db, &NaturalKey::DataWriter(desc.guid), CallbackKind::DataWriter)
        }
        (EntityDescriptor::DataWriter(desc), _) => {
            refresh(db, &NaturalKey::DataWriter(desc.guid), &desc.qos, CallbackKind::DataWriter)
        }
        (EntityDescriptor::DataReader(desc), 1) => {
            discover_endpoint(db, domain_entity, desc, EntityKind::DataReader)
        }
        (EntityDescriptor::DataReader(desc), -1) => {
            undiscover(db, &NaturalKey::DataReader(desc.guid), CallbackKind::DataReader)
        }
        (EntityDescriptor::DataReader(desc), _) => {
            refresh(db, &NaturalKey::DataReader(desc.guid), &desc.qos, CallbackKind::DataReader)
        }
    }
}

fn discover_participant(
    db: &Database,
    domain_entity: EntityId,
    desc: &ParticipantDescriptor,
) -> BackendResult<AppliedEvent> {
    let (host_id, _) = db.insert_or_reactivate(Entity::new(&desc.hostname, EntityData::Host))?;
    let (user_id, _) = db.insert_or_reactivate(Entity::new(
        &desc.username,
        EntityData::User { host_id },
    ))?;
    db.link(host_id, user_id)?;
    let (process_id, _) = db.insert_or_reactivate(Entity::new(
        &desc.process_name,
        EntityData::Process {
            pid: desc.process_pid,
            user_id,
        },
    ))?;
    db.link(user_id, process_id)?;

    let (participant_id, _) = db.insert_or_reactivate(
        Entity::new(
            &desc.name,
            EntityData::Participant {
                guid: desc.guid,
                process_id: Some(process_id),
                domain_id: domain_entity,
            },
        )
        .with_qos(desc.qos.clone()),
    )?;
    db.link(process_id, participant_id)?;
    db.link(domain_entity, participant_id)?;

    Ok(AppliedEvent {
        callback: CallbackKind::Participant,
        entity_id: participant_id,
    })
}

fn discover_topic(
    db: &Database,
    domain_entity: EntityId,
    desc: &TopicDescriptor,
) -> BackendResult<AppliedEvent> {
    let (topic_id, _) = db.insert_or_reactivate(
        Entity::new(
            &desc.name,
            EntityData::Topic {
                type_name: desc.type_name.clone(),
                domain_id: domain_entity,
            },
        )
        .with_metatraffic(desc.metatraffic)
        .with_qos(desc.qos.clone()),
    )?;
    db.link(domain_entity, topic_id)?;

    Ok(AppliedEvent {
        callback: CallbackKind::Topic,
        entity_id: topic_id,
    })
}

fn discover_endpoint(
    db: &Database,
    domain_entity: EntityId,
    desc: &EndpointDescriptor,
    kind: EntityKind,
) -> BackendResult<AppliedEvent> {
    let participant_id = db
        .find_by_key(&NaturalKey::Participant(desc.participant_guid))?
        .ok_or_else(|| {
            BackendError::bad_parameter(format!(
                "endpoint {} references unknown participant {}",
                desc.guid, desc.participant_guid
            ))
        })?;

    let (topic_id, _) = db.insert_or_reactivate(
        Entity::new(
            &desc.topic_name,
            EntityData::Topic {
                type_name: desc.type_name.clone(),
                domain_id: domain_entity,
            },
        )
        .with_metatraffic(desc.metatraffic),
    )?;
    db.link(domain_entity, topic_id)?;

    let data = match kind {
        EntityKind::DataWriter => EntityData::DataWriter {
            guid: desc.guid,
            participant_id,
            topic_id,
        },
        EntityKind::DataReader => EntityData::DataReader {
            guid: desc.guid,
            participant_id,
            topic_id,
        },
        other => {
            return Err(BackendError::internal(format!(
                "discover_endpoint called for kind {other}"
            )))
        }
    };

    let (endpoint_id, _) = db.insert_or_reactivate(
        Entity::new(&desc.name, data)
            .with_metatraffic(desc.metatraffic)
            .with_qos(desc.qos.clone()),
    )?;
    db.link(participant_id, endpoint_id)?;
    db.link(topic_id, endpoint_id)?;

    for address in &desc.locators {
        let (locator_id, _) = db.insert_or_reactivate(Entity::new(
            address,
            EntityData::Locator {
                address: address.clone(),
            },
        ))?;
        db.link(endpoint_id, locator_id)?;
    }

    // A live endpoint implies a live participant and physical chain, even
    // if the participant's own rediscovery has not arrived yet.
    activate_participant_chain(db, participant_id)?;

    Ok(AppliedEvent {
        callback: if kind == EntityKind::DataWriter {
            CallbackKind::DataWriter
        } else {
            CallbackKind::DataReader
        },
        entity_id: endpoint_id,
    })
}

fn activate_participant_chain(db: &Database, participant_id: EntityId) -> BackendResult<()> {
    db.set_active(participant_id, true)?;
    for process_id in db.parents_of(participant_id, EntityKind::Process)? {
        db.set_active(process_id, true)?;
        for user_id in db.parents_of(process_id, EntityKind::User)? {
            db.set_active(user_id, true)?;
            for host_id in db.parents_of(user_id, EntityKind::Host)? {
                db.set_active(host_id, true)?;
            }
        }
    }
    Ok(())
}

fn undiscover(db: &Database, key: &NaturalKey, callback: CallbackKind) -> BackendResult<AppliedEvent> {
    let id = db
        .find_by_key(key)?
        .ok_or_else(|| BackendError::bad_parameter(format!("undiscovery for unknown entity {key}")))?;
    db.set_active(id, false)?;

    match callback {
        CallbackKind::Participant => cascade_up_physical(db, id)?,
        CallbackKind::DataWriter | CallbackKind::DataReader => cascade_down_locators(db, id)?,
        // Topic activity is independent of its endpoints and cascades
        // nowhere.
        CallbackKind::Topic => {}
    }

    Ok(AppliedEvent {
        callback,
        entity_id: id,
    })
}

/// Deactivates physical ancestors whose children have all gone inactive:
/// process when its last participant leaves, then user, then host.
fn cascade_up_physical(db: &Database, participant_id: EntityId) -> BackendResult<()> {
    for process_id in db.parents_of(participant_id, EntityKind::Process)? {
        if any_active(db, &db.children_of(process_id, EntityKind::Participant)?)? {
            continue;
        }
        db.set_active(process_id, false)?;
        for user_id in db.parents_of(process_id, EntityKind::User)? {
            if any_active(db, &db.children_of(user_id, EntityKind::Process)?)? {
                continue;
            }
            db.set_active(user_id, false)?;
            for host_id in db.parents_of(user_id, EntityKind::Host)? {
                if any_active(db, &db.children_of(host_id, EntityKind::User)?)? {
                    continue;
                }
                db.set_active(host_id, false)?;
            }
        }
    }
    Ok(())
}

/// Deactivates locators whose linked endpoints have all gone inactive.
fn cascade_down_locators(db: &Database, endpoint_id: EntityId) -> BackendResult<()> {
    for locator_id in db.children_of(endpoint_id, EntityKind::Locator)? {
        let mut endpoints = db.parents_of(locator_id, EntityKind::DataWriter)?;
        endpoints.extend(db.parents_of(locator_id, EntityKind::DataReader)?);
        if !any_active(db, &endpoints)? {
            db.set_active(locator_id, false)?;
        }
    }
    Ok(())
}

fn any_active(db: &Database, ids: &[EntityId]) -> BackendResult<bool> {
    for id in ids {
        if db.is_active(*id)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn refresh(
    db: &Database,
    key: &NaturalKey,
    qos: &serde_json::Value,
    callback: CallbackKind,
) -> BackendResult<AppliedEvent> {
    let id = db
        .find_by_key(key)?
        .ok_or_else(|| BackendError::bad_parameter(format!("update for unknown entity {key}")))?;
    db.update_qos(id, qos.clone())?;

    Ok(AppliedEvent {
        callback,
        entity_id: id,
    })
}
