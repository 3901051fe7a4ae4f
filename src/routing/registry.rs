//! Named route-group registry.
//!
//! # Responsibilities
//! - Map a path prefix to the group created for it
//! - Resolve `/` to the root without prior registration
//! - Stay consistent under concurrent registration from initializer tasks
//!
//! # Design Decisions
//! - One `RwLock` around one map: lookups share, registrations exclude
//! - Re-registering a prefix replaces the stored handle (last write wins);
//!   the earlier group keeps its routes
//! - A missing parent falls back to the root instead of failing
//! - A parent outside this registry's tree is rejected, since its routes
//!   would never be built
//! - `/` always names the root; registering it hands back the root

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use thiserror::Error;

use crate::routing::group::RouteGroup;

/// Errors returned by registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("router group not registered: {0}")]
    NotRegistered(String),

    #[error("router group {prefix}: parent {parent_base} is not part of this registry")]
    ForeignParent { prefix: String, parent_base: String },

    #[error("router group / is the root and cannot be nested under {0}")]
    NestedRoot(String),
}

/// Prefix → group handle, shared by every service during mounting.
pub struct GroupRegistry {
    root: RouteGroup,
    groups: RwLock<HashMap<String, RouteGroup>>,
}

impl GroupRegistry {
    /// Create a registry around a fresh root group.
    pub fn new() -> Self {
        Self::with_root(RouteGroup::root())
    }

    /// Create a registry around an existing tree; `root` is what gets built.
    pub fn with_root(root: RouteGroup) -> Self {
        Self {
            root,
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// The implicit `/` group.
    pub fn root(&self) -> &RouteGroup {
        &self.root
    }

    /// Create a sub-group for `prefix` under `parent` (or the root) and store it.
    ///
    /// `parent` must be the root or a group descended from it.
    pub fn register(&self, prefix: &str, parent: Option<&RouteGroup>) -> Result<RouteGroup, RegistryError> {
        let parent = parent.unwrap_or(&self.root);
        if !self.root.contains(parent) {
            return Err(RegistryError::ForeignParent {
                prefix: prefix.to_string(),
                parent_base: parent.base_path().to_string(),
            });
        }

        if prefix == "/" {
            if parent != &self.root {
                return Err(RegistryError::NestedRoot(parent.base_path().to_string()));
            }
            return Ok(self.root.clone());
        }

        let group = parent.group(prefix);

        let previous = self
            .groups
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(prefix.to_string(), group.clone());

        if previous.is_some() {
            tracing::debug!(prefix = %prefix, "Route group re-registered, replacing previous handle");
        }
        tracing::debug!(prefix = %prefix, base_path = %group.base_path(), "Route group registered");

        Ok(group)
    }

    /// Fetch the group registered for `prefix`.
    pub fn lookup(&self, prefix: &str) -> Result<RouteGroup, RegistryError> {
        if prefix == "/" {
            return Ok(self.root.clone());
        }

        self.groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(prefix)
            .cloned()
            .ok_or_else(|| RegistryError::NotRegistered(prefix.to_string()))
    }

    /// Number of explicitly registered prefixes (the root is not counted).
    pub fn len(&self) -> usize {
        self.groups.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered prefixes, sorted.
    pub fn prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = self
            .groups
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        prefixes.sort();
        prefixes
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}
