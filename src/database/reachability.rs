//! Typed reachability over the entity graph.
//!
//! The resolver answers "which entities of kind K can be reached from this
//! origin". Reachability is not a plain undirected walk: each origin kind
//! defines which relations carry the query onward. The participant↔topic
//! and locator↔endpoint paths flow through endpoints only, so an
//! endpoint-less topic is invisible to the physical tree and a locator
//! reaches writers and readers only through its direct links.
//!
//! Callers validate the origin and target before the walk; the resolver
//! itself is total and runs entirely on a locked state snapshot.

use std::collections::BTreeSet;

use crate::types::{EntityId, EntityKind};

use super::DatabaseState;

/// All entities of `target` kind reachable from `origin`.
pub(super) fn reachable(
    state: &DatabaseState,
    target: EntityKind,
    origin: EntityId,
) -> BTreeSet<EntityId> {
    let mut out = BTreeSet::new();
    walk(state, target, origin, &mut out);
    out
}

fn walk(state: &DatabaseState, target: EntityKind, origin: EntityId, out: &mut BTreeSet<EntityId>) {
    let Some(kind) = state.kind_of(origin) else {
        return;
    };
    if kind == target {
        out.insert(origin);
        return;
    }

    use EntityKind as K;
    match kind {
        K::Host => match target {
            K::User => collect(state.children_of_kind(origin, K::User), out),
            _ => recurse(state, target, state.children_of_kind(origin, K::User), out),
        },
        K::User => match target {
            K::Host => collect(state.parents_of_kind(origin, K::Host), out),
            _ => recurse(state, target, state.children_of_kind(origin, K::Process), out),
        },
        K::Process => match target {
            K::User => collect(state.parents_of_kind(origin, K::User), out),
            K::Host => recurse(state, target, state.parents_of_kind(origin, K::User), out),
            _ => recurse(state, target, state.children_of_kind(origin, K::Participant), out),
        },
        K::Domain => match target {
            K::Participant => collect(state.children_of_kind(origin, K::Participant), out),
            K::Topic => collect(state.children_of_kind(origin, K::Topic), out),
            _ => recurse(state, target, state.children_of_kind(origin, K::Participant), out),
        },
        K::Participant => match target {
            K::Process => collect(state.parents_of_kind(origin, K::Process), out),
            K::Host | K::User => recurse(state, target, state.parents_of_kind(origin, K::Process), out),
            K::Domain => collect(state.parents_of_kind(origin, K::Domain), out),
            K::DataWriter => collect(state.children_of_kind(origin, K::DataWriter), out),
            K::DataReader => collect(state.children_of_kind(origin, K::DataReader), out),
            _ => recurse(state, target, endpoints_below(state, origin), out),
        },
        K::Topic => match target {
            K::Domain => collect(state.parents_of_kind(origin, K::Domain), out),
            K::DataWriter => collect(state.children_of_kind(origin, K::DataWriter), out),
            K::DataReader => collect(state.children_of_kind(origin, K::DataReader), out),
            _ => recurse(state, target, endpoints_below(state, origin), out),
        },
        K::DataWriter => match target {
            K::Participant => collect(state.parents_of_kind(origin, K::Participant), out),
            K::Topic => collect(state.parents_of_kind(origin, K::Topic), out),
            K::Locator => collect(state.children_of_kind(origin, K::Locator), out),
            K::DataReader => recurse(state, target, state.parents_of_kind(origin, K::Topic), out),
            _ => recurse(state, target, state.parents_of_kind(origin, K::Participant), out),
        },
        K::DataReader => match target {
            K::Participant => collect(state.parents_of_kind(origin, K::Participant), out),
            K::Topic => collect(state.parents_of_kind(origin, K::Topic), out),
            K::Locator => collect(state.children_of_kind(origin, K::Locator), out),
            K::DataWriter => recurse(state, target, state.parents_of_kind(origin, K::Topic), out),
            _ => recurse(state, target, state.parents_of_kind(origin, K::Participant), out),
        },
        K::Locator => match target {
            K::DataWriter => collect(state.parents_of_kind(origin, K::DataWriter), out),
            K::DataReader => collect(state.parents_of_kind(origin, K::DataReader), out),
            _ => recurse(state, target, endpoints_above(state, origin), out),
        },
        K::Invalid => {}
    }
}

fn endpoints_below(state: &DatabaseState, id: EntityId) -> Vec<EntityId> {
    let mut out = state.children_of_kind(id, EntityKind::DataWriter);
    out.extend(state.children_of_kind(id, EntityKind::DataReader));
    out
}

fn endpoints_above(state: &DatabaseState, id: EntityId) -> Vec<EntityId> {
    let mut out = state.parents_of_kind(id, EntityKind::DataWriter);
    out.extend(state.parents_of_kind(id, EntityKind::DataReader));
    out
}

fn collect(ids: Vec<EntityId>, out: &mut BTreeSet<EntityId>) {
    out.extend(ids);
}

fn recurse(
    state: &DatabaseState,
    target: EntityKind,
    via: Vec<EntityId>,
    out: &mut BTreeSet<EntityId>,
) {
    for id in via {
        walk(state, target, id, out);
    }
}
