use crate::config::SchemaConfig;
use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Capabilities a user can hold on a database or table descriptor.
///
/// `All` implies every other privilege. The meaning of each privilege is
/// owned by the privilege subsystem; this core only asks whether a user
/// holds one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    All,
    Create,
    Drop,
    Grant,
    Select,
    Insert,
    Delete,
    Update,
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Privilege::All => "ALL",
            Privilege::Create => "CREATE",
            Privilege::Drop => "DROP",
            Privilege::Grant => "GRANT",
            Privilege::Select => "SELECT",
            Privilege::Insert => "INSERT",
            Privilege::Delete => "DELETE",
            Privilege::Update => "UPDATE",
        };
        f.write_str(name)
    }
}

/// Per-descriptor grant table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PrivilegeDescriptor {
    pub users: BTreeMap<String, BTreeSet<Privilege>>,
}

impl PrivilegeDescriptor {
    /// Grants `All` to the root user and nothing to anyone else.
    pub fn new_default(root_user: &str) -> Self {
        let mut users = BTreeMap::new();
        users.insert(root_user.to_string(), BTreeSet::from([Privilege::All]));
        Self { users }
    }

    pub fn grant(&mut self, user: &str, privileges: &[Privilege]) {
        let held = self.users.entry(user.to_string()).or_default();
        held.extend(privileges.iter().copied());
    }

    pub fn revoke(&mut self, user: &str, privileges: &[Privilege]) {
        if let Some(held) = self.users.get_mut(user) {
            for privilege in privileges {
                held.remove(privilege);
            }
            if held.is_empty() {
                self.users.remove(user);
            }
        }
    }

    pub fn check(&self, user: &str, privilege: Privilege) -> bool {
        self.users
            .get(user)
            .is_some_and(|held| held.contains(&Privilege::All) || held.contains(&privilege))
    }

    /// The root user must always retain `All`, otherwise the object could
    /// become unmanageable.
    pub fn validate(&self, root_user: &str, object: &str) -> Result<(), SchemaError> {
        if !self
            .users
            .get(root_user)
            .is_some_and(|held| held.contains(&Privilege::All))
        {
            return Err(SchemaError::InvalidArgument(format!(
                "user {root_user} does not have ALL privileges on {object}"
            )));
        }
        Ok(())
    }
}

/// Fails with `PermissionDenied` unless `user` holds `privilege` on the
/// descriptor whose grants are `privileges`.
pub fn check_privilege(
    user: &str,
    privileges: &PrivilegeDescriptor,
    privilege: Privilege,
    object: &str,
) -> Result<(), SchemaError> {
    if privileges.check(user, privilege) {
        return Ok(());
    }
    Err(SchemaError::PermissionDenied(format!(
        "user {user} does not have {privilege} privilege on {object}"
    )))
}

pub fn require_superuser(user: &str, config: &SchemaConfig, action: &str) -> Result<(), SchemaError> {
    if user == config.root_user {
        return Ok(());
    }
    Err(SchemaError::PermissionDenied(format!(
        "only {} is allowed to {action}",
        config.root_user
    )))
}
