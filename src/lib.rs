//! Pawclub application library.
//!
//! Domain modules (books, comments, profiles), the session context,
//! and the bootstrap that wires them to the store and HTTP server.

pub mod modules;
pub mod session;
pub mod utils;

use pawclub_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use pawclub_store::PathStore;

/// Full application lifecycle: connect the store, initialize modules,
/// apply seeds, serve HTTP until shutdown, then stop modules in reverse.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let store = pawclub_store::connect(&settings.store.endpoint)?;
    let registry = modules::register_all(&store, &settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_core_modules(&ctx).await?;
    registry.init_custom_modules(&ctx).await?;
    apply_seeds(&registry, store.as_ref()).await?;
    registry.start_core_modules(&ctx).await?;
    registry.start_custom_modules(&ctx).await?;

    pawclub_http::start_server(&registry, &settings).await?;

    registry.stop_custom_modules().await?;
    registry.stop_core_modules().await?;
    Ok(())
}

/// Write every module seed whose path holds nothing yet. Occupied paths
/// are left alone, so seeding is idempotent across restarts.
pub async fn apply_seeds(
    registry: &ModuleRegistry,
    store: &dyn PathStore,
) -> anyhow::Result<()> {
    for (module, seed) in registry.collect_seeds() {
        if store.get(&seed.path).await?.is_some() {
            tracing::debug!(module, seed = seed.id, "seed target already present");
            continue;
        }
        store.set(&seed.path, seed.value.clone()).await?;
        tracing::info!(module, seed = seed.id, path = %seed.path, "applied seed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawclub_store::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store: Arc<dyn PathStore> = Arc::new(MemoryStore::new());
        let mut settings = Settings::default();
        settings.session.bootstrap_admin = Some("u1".to_string());
        let registry = modules::register_all(&store, &settings);

        apply_seeds(&registry, store.as_ref()).await.unwrap();
        let role = store.get("roles/u1/role_bootstrap").await.unwrap();
        assert_eq!(role, Some(serde_json::json!("admin")));

        // A later role change survives re-seeding.
        store
            .set("roles/u1/role_bootstrap", serde_json::json!("moderator"))
            .await
            .unwrap();
        apply_seeds(&registry, store.as_ref()).await.unwrap();
        let role = store.get("roles/u1/role_bootstrap").await.unwrap();
        assert_eq!(role, Some(serde_json::json!("moderator")));
    }
}
