use crate::error::StoreError;
use crate::registry::{Registry, StoreContext};
use crate::status::status_model;
use crate::store::{check_models, Model, Store};
use std::sync::Arc;
use tracing::debug;

/// Mounts a list of models into a registry for as long as it lives.
///
/// Mounting validates the models, appends the status model, and registers
/// one store per model. Unmounting (explicitly or on drop) unregisters every
/// name it registered, in reverse order.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shared_store::registry::Registry;
/// use shared_store::{Model, Provider, STATUS_MODEL_NAME};
///
/// let registry = Registry::new();
/// let provider = Provider::mount(&registry, vec![Model::new("modelA", json!({ "a": 0 }))]).unwrap();
/// assert_eq!(provider.names(), ["modelA", STATUS_MODEL_NAME]);
///
/// provider.unmount();
/// assert!(registry.lookup("modelA").is_none());
/// ```
#[derive(Debug)]
pub struct Provider {
    registry: Arc<Registry>,
    names: Vec<String>,
}

impl Provider {
    pub fn mount(registry: &Arc<Registry>, models: Vec<Model>) -> Result<Self, StoreError> {
        check_models(&models)?;

        // Stores are built before anything is registered, so a failure
        // leaves the registry untouched.
        let stores = models
            .into_iter()
            .chain(std::iter::once(status_model()))
            .map(|model| Store::with_registry(model, registry).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let mut provider = Self {
            registry: Arc::clone(registry),
            names: Vec::with_capacity(stores.len()),
        };
        for store in stores {
            let name = store.name().to_string();
            provider.registry.register(&name, store)?;
            provider.names.push(name);
        }
        debug!(models = ?provider.names, "provider mounted");
        Ok(provider)
    }

    /// Mount into [`Registry::current`].
    pub fn mount_current(models: Vec<Model>) -> Result<Self, StoreError> {
        Self::mount(&Registry::current(), models)
    }

    /// Names registered by this provider, status model last.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn context(&self, name: &str) -> Option<StoreContext> {
        if self.names.iter().any(|n| n == name) {
            self.registry.lookup(name)
        } else {
            None
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn unmount(self) {}

    fn release(&mut self) {
        for name in self.names.drain(..).rev() {
            self.registry.unregister(&name);
        }
        debug!("provider unmounted");
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::STATUS_MODEL_NAME;
    use serde_json::json;

    #[test]
    fn mount_registers_models_and_status_store() {
        let registry = Registry::new();
        let provider = Provider::mount(
            &registry,
            vec![
                Model::new("modelA", json!({ "a": 0 })),
                Model::new("modelB", json!({ "b": 0 })),
            ],
        )
        .unwrap();

        assert_eq!(provider.names(), ["modelA", "modelB", STATUS_MODEL_NAME]);
        assert_eq!(registry.len(), 3);
        assert_eq!(
            provider.context("modelB").unwrap().display_name(),
            "modelB"
        );
        assert!(provider.context("elsewhere").is_none());
    }

    #[test]
    fn invalid_models_leave_registry_untouched() {
        let registry = Registry::new();
        let err = Provider::mount(
            &registry,
            vec![
                Model::new("modelA", json!({})),
                Model::new("modelB", json!(null)),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidModel { .. }));
        assert!(registry.is_empty());

        assert_eq!(
            Provider::mount(&registry, Vec::new()).unwrap_err(),
            StoreError::NoModels
        );
    }

    #[test]
    fn drop_unregisters_everything() {
        let registry = Registry::new();
        {
            let _provider =
                Provider::mount(&registry, vec![Model::new("modelA", json!({}))]).unwrap();
            assert!(registry.contains("modelA"));
            assert!(registry.contains(STATUS_MODEL_NAME));
        }
        assert!(registry.is_empty());
    }
}
