//! Role model and authorization predicates.
//!
//! A user's roles are a mapping of opaque role-entry ids to role values
//! (`roles/{userId}/{roleEntryId} -> "admin"` in the store). Every
//! predicate here asks whether a role *value* is present among the
//! entries; the entry ids are administrative bookkeeping and never
//! participate in checks.
//!
//! These checks are advisory gating for the application surface. Real
//! enforcement belongs to the external store's access rules.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Roles recognized by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "moderator" => Ok(Role::Moderator),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Role entries as stored per user: entry id -> role value.
pub type RoleMap = BTreeMap<String, Role>;

/// Roles that open the moderation/admin surface.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Moderator];

/// Every role the application knows about.
pub const ALL_ROLES: &[Role] = &[Role::Admin, Role::Moderator, Role::User];

/// Whether the role value appears among the user's role entries.
pub fn has_role(roles: &RoleMap, role: Role) -> bool {
    roles.values().any(|r| *r == role)
}

/// Whether any of the given role values appears among the entries.
pub fn has_any_role(roles: &RoleMap, wanted: &[Role]) -> bool {
    wanted.iter().any(|role| has_role(roles, *role))
}

/// Whether all of the given role values appear among the entries.
pub fn has_all_roles(roles: &RoleMap, wanted: &[Role]) -> bool {
    wanted.iter().all(|role| has_role(roles, *role))
}

pub fn is_admin(roles: &RoleMap) -> bool {
    has_role(roles, Role::Admin)
}

/// Admins count as moderators for gating purposes.
pub fn is_moderator(roles: &RoleMap) -> bool {
    has_any_role(roles, ADMIN_ROLES)
}

/// The role values held, in entry order.
pub fn user_roles(roles: &RoleMap) -> Vec<Role> {
    roles.values().copied().collect()
}

/// The first role entry, falling back to the plain user role.
pub fn primary_role(roles: &RoleMap) -> Role {
    roles.values().next().copied().unwrap_or(Role::User)
}
