use crate::{
    registry::RegistryError,
    security::{Group, GroupId, RecordRule, SecurityRegistry},
    value::UserId,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

///
/// GroupRegistry
///
/// In-process `SecurityRegistry`. Groups, memberships and rules may change
/// while environments are live; readers always see the latest state.
///

#[derive(Debug, Default)]
pub struct GroupRegistry {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    groups: BTreeMap<GroupId, Group>,
    members: BTreeMap<UserId, BTreeSet<GroupId>>,
    rules: BTreeMap<String, Vec<RecordRule>>,
}

impl GroupRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a group. Parents must exist and the resulting
    /// inheritance graph must stay acyclic.
    pub fn add_group(&self, group: Group) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();

        for parent in &group.parents {
            if !inner.groups.contains_key(parent) && parent != &group.id {
                return Err(RegistryError::UnknownGroup(parent.to_string()));
            }
            if inner.reaches(parent, &group.id) {
                return Err(RegistryError::CyclicGroup(group.id.to_string()));
            }
        }
        inner.groups.insert(group.id.clone(), group);

        Ok(())
    }

    pub fn add_membership(&self, uid: UserId, group: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let id = GroupId::new(group);
        if !inner.groups.contains_key(&id) {
            return Err(RegistryError::UnknownGroup(id.to_string()));
        }
        inner.members.entry(uid).or_default().insert(id);

        Ok(())
    }

    pub fn remove_membership(&self, uid: UserId, group: &str) {
        if let Some(groups) = self.inner.write().members.get_mut(&uid) {
            groups.remove(&GroupId::new(group));
        }
    }

    pub fn add_rule(&self, rule: RecordRule) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if let Some(group) = &rule.group
            && !inner.groups.contains_key(group)
        {
            return Err(RegistryError::UnknownGroup(group.to_string()));
        }
        inner.rules.entry(rule.model.clone()).or_default().push(rule);

        Ok(())
    }

    /// Drop the named rule of `model`, if present.
    pub fn remove_rule(&self, model: &str, name: &str) {
        if let Some(rules) = self.inner.write().rules.get_mut(model) {
            rules.retain(|rule| rule.name != name);
        }
    }

    /// Groups `uid` holds directly.
    #[must_use]
    pub fn direct_groups(&self, uid: UserId) -> Vec<GroupId> {
        self.inner
            .read()
            .members
            .get(&uid)
            .map(|groups| groups.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Inner {
    // whether `target` is `from` or one of its ancestors
    fn reaches(&self, from: &GroupId, target: &GroupId) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(group) = self.groups.get(id) {
                stack.extend(group.parents.iter());
            }
        }

        false
    }
}

impl SecurityRegistry for GroupRegistry {
    fn is_member(&self, uid: UserId, group: &GroupId) -> bool {
        let inner = self.inner.read();
        inner
            .members
            .get(&uid)
            .is_some_and(|held| held.iter().any(|g| inner.reaches(g, group)))
    }

    fn rules_for(&self, model: &str) -> Vec<RecordRule> {
        self.inner
            .read()
            .rules
            .get(model)
            .cloned()
            .unwrap_or_default()
    }
}
