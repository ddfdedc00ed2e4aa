pub mod models;
pub mod repository;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;

use pawclub_kernel::{settings::Settings, InitCtx, Module, Seed};
use pawclub_store::PathStore;

use crate::session::RoleGate;
use repository::ProfileRepository;
use routes::ProfilesState;

/// Member profiles and role administration.
pub struct ProfilesModule {
    state: ProfilesState,
    gate: RoleGate,
    bootstrap_admin: Option<String>,
}

impl ProfilesModule {
    pub fn new(store: Arc<dyn PathStore>, settings: &Settings) -> Self {
        Self {
            state: ProfilesState {
                repo: ProfileRepository::new(store),
            },
            gate: RoleGate::from_settings(&settings.session),
            bootstrap_admin: settings.session.bootstrap_admin.clone(),
        }
    }
}

#[async_trait]
impl Module for ProfilesModule {
    fn name(&self) -> &'static str {
        "profiles"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "profiles module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.state.clone(), self.gate.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/me": {
                    "get": {
                        "summary": "The signed-in member's profile",
                        "tags": ["Profiles"],
                        "responses": {
                            "200": {"description": "The profile"},
                            "401": {"description": "Not signed in"}
                        }
                    },
                    "post": {
                        "summary": "Sync the session user into the store after login",
                        "tags": ["Profiles"],
                        "responses": {"201": {"description": "Stored profile"}}
                    }
                },
                "/{user_id}": {
                    "get": {
                        "summary": "Fetch a member profile with merged roles",
                        "tags": ["Profiles"],
                        "responses": {
                            "200": {"description": "The profile"},
                            "404": {"description": "Unknown user"}
                        }
                    },
                    "put": {
                        "summary": "Edit a profile (self, or any profile for moderators)",
                        "tags": ["Profiles"],
                        "responses": {
                            "200": {"description": "Updated profile"},
                            "403": {"description": "Not your profile"}
                        }
                    }
                },
                "/admin": {
                    "get": {
                        "summary": "List members holding the admin role",
                        "tags": ["Profiles"],
                        "responses": {"200": {"description": "Admin entries"}}
                    }
                },
                "/admin/{user_id}/roles": {
                    "post": {
                        "summary": "Grant role entries (admin)",
                        "tags": ["Profiles"],
                        "responses": {"201": {"description": "Generated entry ids"}}
                    },
                    "delete": {
                        "summary": "Revoke every role entry (admin)",
                        "tags": ["Profiles"],
                        "responses": {"204": {"description": "Roles removed"}}
                    }
                }
            }
        }))
    }

    /// The configured bootstrap admin gets a role entry on first start,
    /// so a fresh deployment has someone who can open the admin panel.
    fn seeds(&self) -> Vec<Seed> {
        let Some(user_id) = &self.bootstrap_admin else {
            return vec![];
        };
        vec![Seed {
            id: "bootstrap-admin",
            path: format!("roles/{user_id}/role_bootstrap"),
            value: serde_json::json!("admin"),
        }]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "profiles module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "profiles module stopped");
        Ok(())
    }
}

/// Create a new instance of the profiles module.
pub fn create_module(store: Arc<dyn PathStore>, settings: &Settings) -> Arc<dyn Module> {
    Arc::new(ProfilesModule::new(store, settings))
}
