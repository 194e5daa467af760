//! Module: security
//! Responsibility: groups, permissions, record rules, and the combinator
//! that merges method execution control with record rules.
//! Does not own: group storage policy; `SecurityRegistry` is the boundary.

pub mod combinator;
mod groups;

#[cfg(test)]
mod tests;

pub use groups::GroupRegistry;

use crate::{condition::Condition, value::UserId};
use bitflags::bitflags;
use derive_more::Display;
use serde::Serialize;

///
/// GroupId
///

#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

///
/// Group
///
/// Security principal. Members of a group are members of all its parents,
/// transitively; parent links must stay acyclic.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub parents: Vec<GroupId>,
}

impl Group {
    #[must_use]
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: GroupId::new(id),
            name: name.to_string(),
            parents: Vec::new(),
        }
    }

    #[must_use]
    pub fn inherits(mut self, parent: &str) -> Self {
        self.parents.push(GroupId::new(parent));
        self
    }
}

bitflags! {
    /// Operations a record rule applies to.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct Permission: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const CREATE = 0x04;
        const UNLINK = 0x08;
        const ALL = Self::READ.bits() | Self::WRITE.bits() | Self::CREATE.bits() | Self::UNLINK.bits();
    }
}

///
/// RecordRule
///
/// Condition restricting which records of `model` may be accessed for
/// `perms`. Rules without a group are global and apply to everyone.
///

#[derive(Clone, Debug)]
pub struct RecordRule {
    pub name: String,
    pub model: String,
    pub group: Option<GroupId>,
    pub condition: Condition,
    pub perms: Permission,
}

impl RecordRule {
    #[must_use]
    pub fn global(name: &str, model: &str, condition: Condition, perms: Permission) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
            group: None,
            condition,
            perms,
        }
    }

    #[must_use]
    pub fn for_group(
        name: &str,
        model: &str,
        group: &str,
        condition: Condition,
        perms: Permission,
    ) -> Self {
        Self {
            group: Some(GroupId::new(group)),
            ..Self::global(name, model, condition, perms)
        }
    }

    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.group.is_none()
    }
}

///
/// SecurityRegistry
///
/// External store of groups, memberships and rules. Queried on every
/// check; implementations must reflect changes immediately.
///

pub trait SecurityRegistry: Send + Sync {
    /// Whether `uid` belongs to `group`, directly or through inheritance.
    fn is_member(&self, uid: UserId, group: &GroupId) -> bool;

    /// Every rule registered for `model`, in registration order.
    fn rules_for(&self, model: &str) -> Vec<RecordRule>;
}
