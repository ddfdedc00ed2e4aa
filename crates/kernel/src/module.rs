use async_trait::async_trait;
use axum::Router;

/// Context provided to modules during initialization.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// An idempotent startup write: `value` is stored at `path` only if the
/// path holds nothing yet. Modules use seeds to provision records the
/// application expects to exist (e.g. the bootstrap admin role).
#[derive(Debug, Clone)]
pub struct Seed {
    pub id: &'static str,
    pub path: String,
    pub value: serde_json::Value,
}

/// Core module trait implemented by every Pawclub module.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module.
    fn name(&self) -> &'static str;

    /// Initialize the module with the provided context.
    /// Called during application startup before seeds are applied.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Return the Axum router for this module's routes.
    /// Routes are mounted under `/api/{module_name}`.
    fn routes(&self) -> Router {
        Router::new()
    }

    /// Return an OpenAPI specification fragment for this module as JSON.
    /// Fragments from all modules are merged into one document.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Return seed records contributed by this module.
    /// Seeds are applied in deterministic order after initialization.
    fn seeds(&self) -> Vec<Seed> {
        vec![]
    }

    /// Start background work for this module.
    /// Called after seeds have been applied.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Stop the module and release resources.
    /// Called during application shutdown.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
