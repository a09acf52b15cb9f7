//! The listener capability exposed to backend users.
//!
//! A monitor owner passes a [`DomainListener`] at init time; the backend
//! holds a shared reference for the monitor's lifetime and invokes the
//! callbacks from the monitor's dispatcher thread, filtered by a
//! [`CallbackMask`]. All callbacks default to no-ops so implementors
//! override only what they care about.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Discovery statistics delivered with each callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Currently active entities of the callback's kind within the monitor.
    pub current_count: i64,
    /// The delta carried by the discovery event: `+1` discovery, `-1`
    /// undiscovery, `0` metadata update.
    pub current_count_change: i64,
}

/// User-provided discovery callbacks for one monitored domain.
///
/// Callbacks run on the monitor's dispatcher thread, strictly in event
/// order, and never under the database's write lock. A panic in a callback
/// is caught and logged by the dispatcher; it does not stop dispatch.
pub trait DomainListener: Send + Sync {
    /// A participant was discovered, updated, or undiscovered.
    fn on_participant_discovery(&self, domain_id: EntityId, participant_id: EntityId, status: Status) {
        let _ = (domain_id, participant_id, status);
    }

    /// A topic was discovered, updated, or undiscovered.
    fn on_topic_discovery(&self, domain_id: EntityId, topic_id: EntityId, status: Status) {
        let _ = (domain_id, topic_id, status);
    }

    /// A data reader was discovered, updated, or undiscovered.
    fn on_datareader_discovery(&self, domain_id: EntityId, datareader_id: EntityId, status: Status) {
        let _ = (domain_id, datareader_id, status);
    }

    /// A data writer was discovered, updated, or undiscovered.
    fn on_datawriter_discovery(&self, domain_id: EntityId, datawriter_id: EntityId, status: Status) {
        let _ = (domain_id, datawriter_id, status);
    }
}

/// Selects which [`DomainListener`] callbacks are dispatched.
///
/// The default mask enables every callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackMask(u32);

impl CallbackMask {
    /// Enables `on_participant_discovery`.
    pub const PARTICIPANT_DISCOVERY: Self = Self(1 << 0);
    /// Enables `on_topic_discovery`.
    pub const TOPIC_DISCOVERY: Self = Self(1 << 1);
    /// Enables `on_datareader_discovery`.
    pub const DATAREADER_DISCOVERY: Self = Self(1 << 2);
    /// Enables `on_datawriter_discovery`.
    pub const DATAWRITER_DISCOVERY: Self = Self(1 << 3);

    /// A mask with every callback disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    /// A mask with every callback enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self(
            Self::PARTICIPANT_DISCOVERY.0
                | Self::TOPIC_DISCOVERY.0
                | Self::DATAREADER_DISCOVERY.0
                | Self::DATAWRITER_DISCOVERY.0,
        )
    }

    /// Returns true if every bit of `other` is enabled in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `self` with the bits of `other` cleared.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl Default for CallbackMask {
    fn default() -> Self {
        Self::all()
    }
}

impl BitOr for CallbackMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CallbackMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mask_enables_everything() {
        let mask = CallbackMask::default();
        assert!(mask.contains(CallbackMask::PARTICIPANT_DISCOVERY));
        assert!(mask.contains(CallbackMask::TOPIC_DISCOVERY));
        assert!(mask.contains(CallbackMask::DATAREADER_DISCOVERY));
        assert!(mask.contains(CallbackMask::DATAWRITER_DISCOVERY));
    }

    #[test]
    fn mask_composition_and_removal() {
        let mask = CallbackMask::PARTICIPANT_DISCOVERY | CallbackMask::TOPIC_DISCOVERY;
        assert!(mask.contains(CallbackMask::TOPIC_DISCOVERY));
        assert!(!mask.contains(CallbackMask::DATAWRITER_DISCOVERY));

        let trimmed = mask.without(CallbackMask::TOPIC_DISCOVERY);
        assert!(trimmed.contains(CallbackMask::PARTICIPANT_DISCOVERY));
        assert!(!trimmed.contains(CallbackMask::TOPIC_DISCOVERY));
        assert!(!CallbackMask::none().contains(CallbackMask::PARTICIPANT_DISCOVERY));
    }

    #[test]
    fn listener_defaults_are_no_ops() {
        struct Silent;
        impl DomainListener for Silent {}
        let listener = Silent;
        listener.on_participant_discovery(
            EntityId::from_raw(1),
            EntityId::from_raw(2),
            Status::default(),
        );
        listener.on_topic_discovery(EntityId::from_raw(1), EntityId::from_raw(3), Status::default());
    }
}
