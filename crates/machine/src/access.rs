//! Access policy and whitelist collaborators.
//!
//! Both are injected at machine construction; the engine never consults
//! process-wide state to answer "may this actor use this machine" or
//! "does this item belong here".

use serde::{Deserialize, Serialize};
use smartvend_core::{ActorId, MachineId};
use std::collections::BTreeSet;

/// External access predicate consulted by the authorization gate.
pub trait AccessPolicy {
    /// Whether `actor` may dispense from `machine`.
    fn is_allowed(&self, actor: ActorId, machine: MachineId) -> bool;
}

/// Stock policy implementation: an explicit allow-set of actors.
#[derive(Debug, Default, Clone)]
pub struct AccessList {
    allowed: BTreeSet<ActorId>,
}

impl AccessList {
    /// Build a list from the given actors.
    pub fn new(actors: impl IntoIterator<Item = ActorId>) -> Self {
        Self {
            allowed: actors.into_iter().collect(),
        }
    }

    /// Grant access to an actor.
    pub fn grant(&mut self, actor: ActorId) {
        self.allowed.insert(actor);
    }

    /// Revoke access from an actor.
    pub fn revoke(&mut self, actor: ActorId) {
        self.allowed.remove(&actor);
    }
}

impl AccessPolicy for AccessList {
    fn is_allowed(&self, actor: ActorId, _machine: MachineId) -> bool {
        self.allowed.contains(&actor)
    }
}

impl<F> AccessPolicy for F
where
    F: Fn(ActorId, MachineId) -> bool,
{
    fn is_allowed(&self, actor: ActorId, machine: MachineId) -> bool {
        self(actor, machine)
    }
}

/// Item-type filter, applied separately to restock sources and to the items
/// they carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeWhitelist {
    /// Accept every type.
    Any,
    /// Accept only the listed type ids. An empty set accepts nothing.
    Types(BTreeSet<String>),
}

impl TypeWhitelist {
    /// Build an explicit whitelist from type ids.
    pub fn types<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Types(ids.into_iter().map(Into::into).collect())
    }

    /// Whether the type id passes the filter.
    pub fn matches(&self, type_id: &str) -> bool {
        match self {
            TypeWhitelist::Any => true,
            TypeWhitelist::Types(set) => set.contains(type_id),
        }
    }
}

impl Default for TypeWhitelist {
    fn default() -> Self {
        TypeWhitelist::Any
    }
}
