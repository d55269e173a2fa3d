use crate::error::StoreError;
use crate::store::Store;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Handle a provider hands to its consumers for one mounted store.
///
/// Carries a debug label alongside the store; the label has no effect on
/// behavior.
#[derive(Clone)]
pub struct StoreContext {
    display_name: String,
    store: Arc<Store>,
}

impl StoreContext {
    fn new(name: &str, store: Arc<Store>) -> Self {
        Self {
            display_name: name.to_string(),
            store,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

impl fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreContext")
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Registry of mounted stores, keyed by model name.
///
/// A context and its store are always added and removed together. Supports
/// both a process-wide registry (default) and scoped registries for isolation.
///
/// # Examples
///
/// Using the default global registry:
///
/// ```
/// use shared_store::registry::Registry;
///
/// let registry = Registry::global();
/// assert!(registry.lookup("nothing-mounted").is_none());
/// ```
///
/// Using a scoped registry:
///
/// ```
/// use serde_json::json;
/// use shared_store::registry::Registry;
/// use shared_store::{Model, Provider};
///
/// Registry::scope(|| {
///     let provider = Provider::mount_current(vec![Model::new("counter", json!({ "n": 0 }))]).unwrap();
///     assert!(Registry::current().get_store("counter").is_some());
///     provider.unmount();
/// });
/// ```
pub struct Registry {
    entries: RwLock<HashMap<String, StoreContext>>,
}

// Thread-local stack for scoped registries
thread_local! {
    static REGISTRY_STACK: RefCell<Vec<Arc<Registry>>> = const { RefCell::new(Vec::new()) };
}

impl Registry {
    /// Create a new, empty registry.
    ///
    /// Tests inject their own registry instead of sharing the global one.
    pub fn new() -> Arc<Self> {
        Arc::new(Registry {
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Run a function with a fresh isolated registry as the current one.
    ///
    /// The registry and every store still registered in it are dropped when
    /// the function returns.
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_registry(Self::new(), f)
    }

    /// Get or create the process-wide registry.
    pub fn global() -> Arc<Self> {
        static REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();
        Arc::clone(REGISTRY.get_or_init(Self::new))
    }

    /// The innermost scoped registry on this thread, or the global one.
    pub fn current() -> Arc<Self> {
        REGISTRY_STACK.with(|stack| stack.borrow().last().cloned().unwrap_or_else(Self::global))
    }

    /// Run a function with `registry` as the current registry.
    pub fn with_registry<F, R>(registry: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        REGISTRY_STACK.with(|stack| {
            stack.borrow_mut().push(registry);
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        REGISTRY_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Register `store` under `name`, replacing any existing entry.
    pub fn register(&self, name: &str, store: Arc<Store>) -> Result<StoreContext, StoreError> {
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        let context = StoreContext::new(name, store);
        let replaced = self
            .entries
            .write()
            .insert(name.to_string(), context.clone())
            .is_some();
        debug!(name, replaced, "registered store");
        Ok(context)
    }

    pub fn lookup(&self, name: &str) -> Option<StoreContext> {
        self.entries.read().get(name).cloned()
    }

    pub fn get_store(&self, name: &str) -> Option<Arc<Store>> {
        self.entries.read().get(name).map(|context| Arc::clone(&context.store))
    }

    /// Like [`Registry::get_store`], failing with [`StoreError::StoreNotFound`].
    pub fn require_store(&self, name: &str) -> Result<Arc<Store>, StoreError> {
        self.get_store(name).ok_or_else(|| StoreError::StoreNotFound {
            name: name.to_string(),
        })
    }

    /// Remove the entry for `name`, returning its context if there was one.
    pub fn unregister(&self, name: &str) -> Option<StoreContext> {
        let removed = self.entries.write().remove(name);
        debug!(name, found = removed.is_some(), "unregistered store");
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Names of every registered store, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry. Useful for resetting the global registry between tests.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}
