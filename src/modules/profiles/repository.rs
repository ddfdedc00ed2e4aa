use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use pawclub_authz::{Role, RoleMap};
use pawclub_store::{path, PathStore, StoreError};

use super::models::{User, UserPatch};

const USERS_ROOT: &str = "users";
const ROLES_ROOT: &str = "roles";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("user {0:?} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("stored user record is malformed")]
    Encoding(#[from] serde_json::Error),
}

/// One user with role entries, as listed by the admin surface.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdminEntry {
    pub user_id: String,
    pub roles: RoleMap,
}

/// Users and their role entries over the path store.
#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn PathStore>,
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn PathStore>) -> Self {
        Self { store }
    }

    fn user_path(user_id: &str) -> Result<String, StoreError> {
        path::join(USERS_ROOT, user_id)
    }

    fn roles_path(user_id: &str) -> Result<String, StoreError> {
        path::join(ROLES_ROOT, user_id)
    }

    /// Read a user, merging in their role entries.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, ProfileError> {
        let Some(value) = self.store.get(&Self::user_path(user_id)?).await? else {
            return Ok(None);
        };
        let mut user: User = serde_json::from_value(value)?;
        user.roles = self.roles_of(user_id).await?;
        Ok(Some(user))
    }

    /// Write the profile record for a user, typically on login. Role
    /// entries are administered separately and never written here.
    pub async fn upsert_user(&self, user: &User) -> Result<(), ProfileError> {
        let mut value = serde_json::to_value(user)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("roles");
        }
        self.store.set(&Self::user_path(&user.id)?, value).await?;
        Ok(())
    }

    /// Merge present patch fields into an existing profile.
    pub async fn update_user(&self, user_id: &str, patch: &UserPatch) -> Result<(), ProfileError> {
        let user_path = Self::user_path(user_id)?;
        if self.store.get(&user_path).await?.is_none() {
            return Err(ProfileError::NotFound(user_id.to_string()));
        }
        let fields = match serde_json::to_value(patch)? {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        if fields.is_empty() {
            return Ok(());
        }
        self.store.merge(&user_path, fields).await?;
        Ok(())
    }

    /// The user's role entries. Unknown role strings in the store are
    /// skipped rather than failing the whole read.
    pub async fn roles_of(&self, user_id: &str) -> Result<RoleMap, ProfileError> {
        let Some(value) = self.store.get(&Self::roles_path(user_id)?).await? else {
            return Ok(RoleMap::new());
        };
        Ok(parse_role_entries(&value))
    }

    /// Add one role entry; returns the generated entry id.
    pub async fn assign_role(&self, user_id: &str, role: Role) -> Result<String, ProfileError> {
        let entry_id = format!("role_{}", Uuid::now_v7().simple());
        let entry_path = path::join(&Self::roles_path(user_id)?, &entry_id)?;
        self.store
            .set(&entry_path, Value::String(role.to_string()))
            .await?;
        Ok(entry_id)
    }

    /// Add several role entries at once.
    pub async fn assign_roles(
        &self,
        user_id: &str,
        roles: &[Role],
    ) -> Result<Vec<String>, ProfileError> {
        let mut entries = Vec::with_capacity(roles.len());
        for role in roles {
            entries.push(self.assign_role(user_id, *role).await?);
        }
        Ok(entries)
    }

    /// Drop every role entry the user holds.
    pub async fn remove_all_roles(&self, user_id: &str) -> Result<(), ProfileError> {
        self.store.delete(&Self::roles_path(user_id)?).await?;
        Ok(())
    }

    /// Every user holding the admin role, with their full role maps.
    pub async fn list_admins(&self) -> Result<Vec<AdminEntry>, ProfileError> {
        let Some(Value::Object(all)) = self.store.get(ROLES_ROOT).await? else {
            return Ok(Vec::new());
        };
        let mut admins = Vec::new();
        for (user_id, entries) in all {
            let roles = parse_role_entries(&entries);
            if pawclub_authz::is_admin(&roles) {
                admins.push(AdminEntry { user_id, roles });
            }
        }
        Ok(admins)
    }
}

fn parse_role_entries(value: &Value) -> RoleMap {
    let mut roles = RoleMap::new();
    let Some(entries) = value.as_object() else {
        return roles;
    };
    for (entry_id, role_value) in entries {
        let Some(role_str) = role_value.as_str() else {
            continue;
        };
        match Role::from_str(role_str) {
            Ok(role) => {
                roles.insert(entry_id.clone(), role);
            }
            Err(err) => {
                tracing::warn!(user_entry = %entry_id, %err, "skipping unknown role entry");
            }
        }
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawclub_store::MemoryStore;
    use serde_json::json;

    fn repo() -> (ProfileRepository, Arc<dyn PathStore>) {
        let store: Arc<dyn PathStore> = Arc::new(MemoryStore::new());
        (ProfileRepository::new(store.clone()), store)
    }

    fn ada() -> User {
        User {
            id: "u1".into(),
            display_name: "Ada".into(),
            email: "ada@club.example".into(),
            avatar_url: None,
            roles: RoleMap::new(),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_merges_roles() {
        let (repo, store) = repo();
        repo.upsert_user(&ada()).await.unwrap();
        store.set("roles/u1/r1", json!("moderator")).await.unwrap();

        let user = repo.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.display_name, "Ada");
        assert_eq!(user.roles.get("r1"), Some(&Role::Moderator));
    }

    #[tokio::test]
    async fn missing_user_reads_as_none() {
        let (repo, _) = repo();
        assert!(repo.get_user("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_only_present_fields() {
        let (repo, _) = repo();
        repo.upsert_user(&ada()).await.unwrap();

        let patch = UserPatch {
            display_name: Some("Ada L.".into()),
            ..UserPatch::default()
        };
        repo.update_user("u1", &patch).await.unwrap();

        let user = repo.get_user("u1").await.unwrap().unwrap();
        assert_eq!(user.display_name, "Ada L.");
        assert_eq!(user.email, "ada@club.example");
    }

    #[tokio::test]
    async fn update_of_missing_user_is_not_found() {
        let (repo, _) = repo();
        let err = repo
            .update_user("ghost", &UserPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(_)));
    }

    #[tokio::test]
    async fn role_assignment_roundtrips() {
        let (repo, _) = repo();
        let entry = repo.assign_role("u1", Role::Admin).await.unwrap();
        assert!(entry.starts_with("role_"));

        let roles = repo.roles_of("u1").await.unwrap();
        assert!(pawclub_authz::is_admin(&roles));

        repo.remove_all_roles("u1").await.unwrap();
        assert!(repo.roles_of("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_admins_filters_by_admin_role() {
        let (repo, _) = repo();
        repo.assign_role("u1", Role::Admin).await.unwrap();
        repo.assign_roles("u2", &[Role::Moderator, Role::User])
            .await
            .unwrap();

        let admins = repo.list_admins().await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].user_id, "u1");
    }

    #[tokio::test]
    async fn unknown_role_entries_are_skipped() {
        let (repo, store) = repo();
        store.set("roles/u1/r1", json!("owner")).await.unwrap();
        store.set("roles/u1/r2", json!("user")).await.unwrap();

        let roles = repo.roles_of("u1").await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles.get("r2"), Some(&Role::User));
    }
}
