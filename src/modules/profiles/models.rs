use serde::{Deserialize, Serialize};

use pawclub_authz::RoleMap;

/// A club member. The authoritative record lives at `users/{id}`; role
/// entries live separately under `roles/{id}` and are merged in on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "RoleMap::is_empty")]
    pub roles: RoleMap,
}

/// Partial profile update; only present fields are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}
