//! The entity model: one polymorphic record per discovered node.
//!
//! Every node in the graph shares a common header (id, name, activity and
//! metatraffic flags, QoS blob, timestamps) and carries a kind-specific
//! payload. The payload also holds the parent references the discovery
//! ingress resolved when the entity was first seen; the authoritative
//! topology lives in the database's edge tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DomainId, EntityId, EntityKind, Guid};

/// Kind-specific payload of an [`Entity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityData {
    /// A machine. The entity name is the hostname.
    Host,
    /// An OS user on a host. The entity name is the username.
    User {
        /// The host this user was discovered on.
        host_id: EntityId,
    },
    /// An OS process owned by a user.
    Process {
        /// Process id as reported by the middleware.
        pid: u32,
        /// The owning user.
        user_id: EntityId,
    },
    /// A communication domain.
    Domain {
        /// The middleware's numeric domain id.
        domain_id: DomainId,
    },
    /// A named, typed channel within a domain.
    Topic {
        /// Registered type name.
        type_name: String,
        /// The owning domain entity.
        domain_id: EntityId,
    },
    /// A process's presence in a domain.
    Participant {
        /// Middleware GUID.
        guid: Guid,
        /// The hosting process, if physical discovery data was available.
        process_id: Option<EntityId>,
        /// The owning domain entity.
        domain_id: EntityId,
    },
    /// A publishing endpoint.
    DataWriter {
        /// Middleware GUID.
        guid: Guid,
        /// The owning participant.
        participant_id: EntityId,
        /// The published topic.
        topic_id: EntityId,
    },
    /// A subscribing endpoint.
    DataReader {
        /// Middleware GUID.
        guid: Guid,
        /// The owning participant.
        participant_id: EntityId,
        /// The subscribed topic.
        topic_id: EntityId,
    },
    /// A transport endpoint address.
    Locator {
        /// Address string, e.g. `UDPv4:[127.0.0.1]:7412`.
        address: String,
    },
}

impl EntityData {
    /// The kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Host => EntityKind::Host,
            Self::User { .. } => EntityKind::User,
            Self::Process { .. } => EntityKind::Process,
            Self::Domain { .. } => EntityKind::Domain,
            Self::Topic { .. } => EntityKind::Topic,
            Self::Participant { .. } => EntityKind::Participant,
            Self::DataWriter { .. } => EntityKind::DataWriter,
            Self::DataReader { .. } => EntityKind::DataReader,
            Self::Locator { .. } => EntityKind::Locator,
        }
    }
}

/// The externally meaningful identity of an entity, used to deduplicate
/// discovery events across the entity's lifetime.
///
/// A `-1`/`+1` round trip must land on the same stored entity, so natural
/// keys are derived from stable middleware identity rather than from the
/// backend-assigned [`EntityId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NaturalKey {
    /// Hosts are identified by hostname.
    Host(String),
    /// Users are identified by username within their host.
    User(EntityId, String),
    /// Processes are identified by pid within their user.
    Process(EntityId, u32),
    /// Domains are identified by their numeric domain id.
    Domain(DomainId),
    /// Topics are identified by name and type within their domain.
    Topic(EntityId, String, String),
    /// Participants are identified by GUID.
    Participant(Guid),
    /// Writers are identified by GUID.
    DataWriter(Guid),
    /// Readers are identified by GUID.
    DataReader(Guid),
    /// Locators are identified by their address string.
    Locator(String),
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host(name) => write!(f, "host:{name}"),
            Self::User(host, name) => write!(f, "user:{host}/{name}"),
            Self::Process(user, pid) => write!(f, "process:{user}/{pid}"),
            Self::Domain(id) => write!(f, "domain:{id}"),
            Self::Topic(domain, name, type_name) => {
                write!(f, "topic:{domain}/{name}/{type_name}")
            }
            Self::Participant(guid) => write!(f, "participant:{guid}"),
            Self::DataWriter(guid) => write!(f, "data_writer:{guid}"),
            Self::DataReader(guid) => write!(f, "data_reader:{guid}"),
            Self::Locator(address) => write!(f, "locator:{address}"),
        }
    }
}

/// A typed, identified node in the backend's graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Backend-assigned identifier. [`EntityId::UNASSIGNED`] until inserted.
    pub id: EntityId,

    /// Human-readable name (hostname, username, topic name, GUID string...).
    pub name: String,

    /// Whether the entity is currently alive per discovery state.
    pub active: bool,

    /// True for infrastructure endpoints and topics used for discovery and
    /// liveness rather than user data.
    pub metatraffic: bool,

    /// Opaque QoS/metadata blob, refreshed by update events.
    #[serde(default)]
    pub qos: serde_json::Value,

    /// When the entity was first discovered.
    pub discovered_at: DateTime<Utc>,

    /// When the entity last changed (reactivation, QoS refresh).
    pub updated_at: DateTime<Utc>,

    /// Kind-specific payload.
    #[serde(flatten)]
    pub data: EntityData,
}

impl Entity {
    /// Creates a not-yet-inserted entity with `active = true`.
    #[must_use]
    pub fn new(name: impl Into<String>, data: EntityData) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::UNASSIGNED,
            name: name.into(),
            active: true,
            metatraffic: false,
            qos: serde_json::Value::Null,
            discovered_at: now,
            updated_at: now,
            data,
        }
    }

    /// Marks the entity as metatraffic infrastructure.
    #[must_use]
    pub fn with_metatraffic(mut self, metatraffic: bool) -> Self {
        self.metatraffic = metatraffic;
        self
    }

    /// Attaches a QoS blob.
    #[must_use]
    pub fn with_qos(mut self, qos: serde_json::Value) -> Self {
        self.qos = qos;
        self
    }

    /// The entity's kind, derived from its payload.
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    /// The natural key used for deduplication and reactivation.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        match &self.data {
            EntityData::Host => NaturalKey::Host(self.name.clone()),
            EntityData::User { host_id } => NaturalKey::User(*host_id, self.name.clone()),
            EntityData::Process { pid, user_id } => NaturalKey::Process(*user_id, *pid),
            EntityData::Domain { domain_id } => NaturalKey::Domain(*domain_id),
            EntityData::Topic { type_name, domain_id } => {
                NaturalKey::Topic(*domain_id, self.name.clone(), type_name.clone())
            }
            EntityData::Participant { guid, .. } => NaturalKey::Participant(*guid),
            EntityData::DataWriter { guid, .. } => NaturalKey::DataWriter(*guid),
            EntityData::DataReader { guid, .. } => NaturalKey::DataReader(*guid),
            EntityData::Locator { address } => NaturalKey::Locator(address.clone()),
        }
    }

    /// Refreshes `updated_at`.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_is_active_and_unassigned() {
        let entity = Entity::new("node-1", EntityData::Host);
        assert!(entity.active);
        assert!(!entity.metatraffic);
        assert_eq!(entity.id, EntityId::UNASSIGNED);
        assert_eq!(entity.kind(), EntityKind::Host);
    }

    #[test]
    fn kind_is_derived_from_payload() {
        let writer = Entity::new(
            "w",
            EntityData::DataWriter {
                guid: Guid::nil(),
                participant_id: EntityId::from_raw(1),
                topic_id: EntityId::from_raw(2),
            },
        );
        assert_eq!(writer.kind(), EntityKind::DataWriter);
        let locator = Entity::new(
            "UDPv4:[127.0.0.1]:7412",
            EntityData::Locator {
                address: "UDPv4:[127.0.0.1]:7412".to_string(),
            },
        );
        assert_eq!(locator.kind(), EntityKind::Locator);
    }

    #[test]
    fn natural_keys_distinguish_writer_and_reader_guids() {
        let guid = Guid::from_bytes([1; 16]);
        let writer = Entity::new(
            "w",
            EntityData::DataWriter {
                guid,
                participant_id: EntityId::from_raw(1),
                topic_id: EntityId::from_raw(2),
            },
        );
        let reader = Entity::new(
            "r",
            EntityData::DataReader {
                guid,
                participant_id: EntityId::from_raw(1),
                topic_id: EntityId::from_raw(2),
            },
        );
        assert_ne!(writer.natural_key(), reader.natural_key());
    }

    #[test]
    fn topic_natural_key_includes_type_name() {
        let domain = EntityId::from_raw(4);
        let a = Entity::new(
            "temperature",
            EntityData::Topic {
                type_name: "SensorReading".to_string(),
                domain_id: domain,
            },
        );
        let b = Entity::new(
            "temperature",
            EntityData::Topic {
                type_name: "LegacyReading".to_string(),
                domain_id: domain,
            },
        );
        assert_ne!(a.natural_key(), b.natural_key());
    }

    #[test]
    fn equality_is_by_id() {
        let mut a = Entity::new("node-1", EntityData::Host);
        let mut b = Entity::new("node-2", EntityData::Host);
        a.id = EntityId::from_raw(5);
        b.id = EntityId::from_raw(5);
        assert_eq!(a, b);
    }

    #[test]
    fn entity_serializes_with_flattened_payload() {
        let mut entity = Entity::new("node-1", EntityData::Host);
        entity.id = EntityId::from_raw(1);
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["kind"], "host");
        assert_eq!(json["name"], "node-1");
        assert_eq!(json["active"], true);
    }
}
