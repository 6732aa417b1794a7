//! Role groups: named bundles of permitted roles, stored by an optional backend and
//! served from memory. The cache reloads the full group list whenever a lookup misses.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, AuthResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGroup {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub permitted_roles: Vec<u16>,
}

impl RoleGroup {
    pub fn new<S: Into<String>>(name: S, permitted_roles: Vec<u16>) -> Self {
        Self { id: 0, name: name.into(), permitted_roles }
    }

    pub fn has_role(&self, role: u16) -> bool {
        self.permitted_roles.contains(&role)
    }
}

pub trait RoleGroupStore: Send + Sync {
    fn get_groups(&self) -> AuthResult<Vec<RoleGroup>>;
    fn get_by_name(&self, name: &str) -> AuthResult<RoleGroup>;
    fn get_by_id(&self, id: u32) -> AuthResult<RoleGroup>;
    /// Stores a new group and returns it with its assigned id.
    fn insert_group(&self, group: &RoleGroup) -> AuthResult<RoleGroup>;
    fn update_group(&self, group: &RoleGroup) -> AuthResult<()>;
    fn close(&self);
}

#[derive(Default)]
struct MemoryGroups {
    by_id: HashMap<u32, RoleGroup>,
    next_id: u32,
}

#[derive(Default)]
pub struct MemoryRoleGroupStore {
    groups: RwLock<MemoryGroups>,
}

impl MemoryRoleGroupStore {
    pub fn new() -> Self { Self::default() }
}

impl RoleGroupStore for MemoryRoleGroupStore {
    fn get_groups(&self) -> AuthResult<Vec<RoleGroup>> {
        let mut out: Vec<RoleGroup> = self.groups.read().by_id.values().cloned().collect();
        out.sort_by_key(|g| g.id);
        Ok(out)
    }

    fn get_by_name(&self, name: &str) -> AuthResult<RoleGroup> {
        self.groups
            .read()
            .by_id
            .values()
            .find(|g| g.name == name)
            .cloned()
            .ok_or_else(|| AuthError::role_group_not_found(name))
    }

    fn get_by_id(&self, id: u32) -> AuthResult<RoleGroup> {
        self.groups
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| AuthError::role_group_not_found(format!("id {}", id)))
    }

    fn insert_group(&self, group: &RoleGroup) -> AuthResult<RoleGroup> {
        let mut groups = self.groups.write();
        if groups.by_id.values().any(|g| g.name == group.name) {
            return Err(AuthError::unsupported(format!("role group '{}' already exists", group.name)));
        }
        groups.next_id += 1;
        let stored = RoleGroup { id: groups.next_id, ..group.clone() };
        groups.by_id.insert(stored.id, stored.clone());
        Ok(stored)
    }

    fn update_group(&self, group: &RoleGroup) -> AuthResult<()> {
        let mut groups = self.groups.write();
        match groups.by_id.get_mut(&group.id) {
            Some(existing) => {
                *existing = group.clone();
                Ok(())
            }
            None => Err(AuthError::role_group_not_found(format!("id {}", group.id))),
        }
    }

    fn close(&self) {}
}

#[derive(Default)]
struct GroupIndex {
    by_name: HashMap<String, RoleGroup>,
    by_id: HashMap<u32, RoleGroup>,
    // Bumped by every insert/update; a reload that started earlier is not installed.
    generation: u64,
}

pub struct RoleGroupCache {
    store: Arc<dyn RoleGroupStore>,
    index: RwLock<GroupIndex>,
}

impl RoleGroupCache {
    pub fn new(store: Arc<dyn RoleGroupStore>) -> Self {
        Self { store, index: RwLock::new(GroupIndex::default()) }
    }

    /// Reload every group from the store. The reloaded list is always returned, but it only
    /// replaces the in-memory index if no insert or update happened while it was loading.
    pub fn refresh(&self) -> AuthResult<Vec<RoleGroup>> {
        let generation = self.index.read().generation;
        let groups = self.store.get_groups()?;
        let mut index = self.index.write();
        if index.generation != generation {
            debug!(target: "authhub::role_group", "role group reload raced a write; not installing");
            return Ok(groups);
        }
        index.by_name.clear();
        index.by_id.clear();
        for g in &groups {
            index.by_name.insert(g.name.clone(), g.clone());
            index.by_id.insert(g.id, g.clone());
        }
        debug!(target: "authhub::role_group", "role group cache refreshed ({} groups)", groups.len());
        Ok(groups)
    }

    pub fn get_groups(&self) -> AuthResult<Vec<RoleGroup>> {
        self.refresh()
    }

    pub fn get_by_name(&self, name: &str) -> AuthResult<RoleGroup> {
        if let Some(g) = self.index.read().by_name.get(name) {
            return Ok(g.clone());
        }
        self.refresh()?
            .into_iter()
            .find(|g| g.name == name)
            .ok_or_else(|| AuthError::role_group_not_found(name))
    }

    pub fn get_by_id(&self, id: u32) -> AuthResult<RoleGroup> {
        if let Some(g) = self.index.read().by_id.get(&id) {
            return Ok(g.clone());
        }
        self.refresh()?
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| AuthError::role_group_not_found(format!("id {}", id)))
    }

    fn bump_generation(&self) {
        self.index.write().generation += 1;
    }

    pub fn insert_group(&self, group: &RoleGroup) -> AuthResult<RoleGroup> {
        let stored = self.store.insert_group(group)?;
        self.bump_generation();
        self.refresh()?;
        Ok(stored)
    }

    pub fn update_group(&self, group: &RoleGroup) -> AuthResult<()> {
        self.store.update_group(group)?;
        self.bump_generation();
        self.refresh()?;
        Ok(())
    }

    pub fn close(&self) {
        let mut index = self.index.write();
        index.by_name.clear();
        index.by_id.clear();
        index.generation += 1;
        drop(index);
        self.store.close();
    }
}
