//! Identity primitives shared across the backend.
//!
//! Stable identifiers are the prerequisite for everything else: entities are
//! referenced by [`EntityId`] from edges, monitors, and listener callbacks,
//! and are classified by [`EntityKind`] for every typed query.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Globally unique, monotonically assigned entity identifier.
///
/// Ids are handed out by the database's internal counter and are never
/// reused for the lifetime of the process. Id `0` is reserved for entities
/// that have not been inserted yet.
///
/// # Examples
///
/// ```
/// use statmon::EntityId;
///
/// let id = EntityId::from_raw(42);
/// assert_eq!(id.value(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// The reserved placeholder id carried by entities before insertion.
    pub const UNASSIGNED: Self = Self(0);

    /// Creates an id from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw 64-bit value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns true if this id has been assigned by a database.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Numbered partition of the pub/sub universe. Peers in the same domain can
/// communicate; a monitor observes exactly one domain.
pub type DomainId = u16;

/// Classification of the nine entity kinds held by the backend.
///
/// The kinds form a layered schema: a physical layer (host, user, process),
/// a logical layer (domain, topic), the middleware layer (participant,
/// writer, reader), and the transport layer (locator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Sentinel for uninitialized or erroneous kinds. Never stored.
    Invalid,
    /// A machine running monitored processes.
    Host,
    /// An OS user owning monitored processes.
    User,
    /// An OS process hosting participants.
    Process,
    /// A communication domain.
    Domain,
    /// A named, typed channel within a domain.
    Topic,
    /// A process's presence in a domain.
    Participant,
    /// A publishing endpoint.
    DataWriter,
    /// A subscribing endpoint.
    DataReader,
    /// A transport endpoint address.
    Locator,
}

impl EntityKind {
    /// Every storable kind, in schema-layer order.
    pub const ALL: [Self; 9] = [
        Self::Host,
        Self::User,
        Self::Process,
        Self::Domain,
        Self::Topic,
        Self::Participant,
        Self::DataWriter,
        Self::DataReader,
        Self::Locator,
    ];

    /// Returns true for the physical layer (host, user, process).
    #[must_use]
    pub const fn is_physical(self) -> bool {
        matches!(self, Self::Host | Self::User | Self::Process)
    }

    /// Returns true for publishing/subscribing endpoints.
    #[must_use]
    pub const fn is_endpoint(self) -> bool {
        matches!(self, Self::DataWriter | Self::DataReader)
    }

    /// Stable lower-case name, matching the serde representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Host => "host",
            Self::User => "user",
            Self::Process => "process",
            Self::Domain => "domain",
            Self::Topic => "topic",
            Self::Participant => "participant",
            Self::DataWriter => "data_writer",
            Self::DataReader => "data_reader",
            Self::Locator => "locator",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 16-byte middleware GUID identifying participants and endpoints across
/// discovery events.
///
/// Displayed in the middleware's dotted form, twelve prefix octets, a pipe,
/// then the four entity octets: `01.0f.22.ba.54.13.ab.cd.00.00.00.00|0.0.1.c1`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guid([u8; 16]);

impl Guid {
    /// Creates a GUID from its raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Builds a GUID from a 12-byte prefix and a 4-byte entity id.
    #[must_use]
    pub fn from_parts(prefix: [u8; 12], entity: [u8; 4]) -> Self {
        let mut bytes = [0u8; 16];
        bytes[..12].copy_from_slice(&prefix);
        bytes[12..].copy_from_slice(&entity);
        Self(bytes)
    }

    /// The all-zero GUID, used as a sentinel in tests.
    #[must_use]
    pub const fn nil() -> Self {
        Self([0; 16])
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0[..12].iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{byte:02x}")?;
        }
        write!(f, "|")?;
        for (i, byte) in self.0[12..].iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{byte:x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}
