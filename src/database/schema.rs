//! The fixed relation schema of the entity graph.
//!
//! Which kinds may be linked is decided here, in one table, and nowhere
//! else. `link` validates against it and the reachability engine walks
//! along it; neither hardcodes kind pairs of its own.

use crate::types::EntityKind;

/// Every allowed parent→child relation.
///
/// All relations are 1→N except the endpoint→locator pairs, which are N↔N
/// (a locator may be shared by any number of writers and readers).
pub const RELATIONS: &[(EntityKind, EntityKind)] = &[
    (EntityKind::Host, EntityKind::User),
    (EntityKind::User, EntityKind::Process),
    (EntityKind::Process, EntityKind::Participant),
    (EntityKind::Domain, EntityKind::Participant),
    (EntityKind::Domain, EntityKind::Topic),
    (EntityKind::Participant, EntityKind::DataWriter),
    (EntityKind::Participant, EntityKind::DataReader),
    (EntityKind::Topic, EntityKind::DataWriter),
    (EntityKind::Topic, EntityKind::DataReader),
    (EntityKind::DataWriter, EntityKind::Locator),
    (EntityKind::DataReader, EntityKind::Locator),
];

/// Returns true if `parent` may be linked above `child`.
#[must_use]
pub fn is_valid_relation(parent: EntityKind, child: EntityKind) -> bool {
    RELATIONS.contains(&(parent, child))
}

/// Kinds that may appear above `child` in the graph.
pub fn parent_kinds(child: EntityKind) -> impl Iterator<Item = EntityKind> {
    RELATIONS
        .iter()
        .filter(move |(_, c)| *c == child)
        .map(|(p, _)| *p)
}

/// Kinds that may appear below `parent` in the graph.
pub fn child_kinds(parent: EntityKind) -> impl Iterator<Item = EntityKind> {
    RELATIONS
        .iter()
        .filter(move |(p, _)| *p == parent)
        .map(|(_, c)| *c)
}
