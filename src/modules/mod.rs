pub mod books;
pub mod comments;
pub mod profiles;

use std::sync::Arc;

use pawclub_kernel::{settings::Settings, ModuleRegistry};
use pawclub_store::PathStore;

/// Register all application modules with the registry.
pub fn register_all(store: &Arc<dyn PathStore>, settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.register_custom(books::create_module(store.clone(), settings));
    registry.register_custom(comments::create_module(store.clone()));
    registry.register_custom(profiles::create_module(store.clone(), settings));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawclub_store::MemoryStore;

    #[test]
    fn all_domain_modules_register() {
        let store: Arc<dyn PathStore> = Arc::new(MemoryStore::new());
        let registry = register_all(&store, &Settings::default());

        assert_eq!(registry.custom_module_count(), 3);
        for name in ["books", "comments", "profiles"] {
            assert!(registry.get_module(name).is_some(), "missing module {name}");
        }
    }
}
