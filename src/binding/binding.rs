use crate::error::StoreError;
use crate::registry::Registry;
use crate::status::{check_status_key, ensure_status, read_status, Status, STATUS_MODEL_NAME};
use crate::store::{Dispatch, State, Store, Subscription};
use crate::utils::{loose_equal, loose_equal_serialized};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

type Selector<T> = Arc<dyn Fn(&State) -> T + Send + Sync>;
type Equality<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;
type OnChange<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Dispatches actions to one store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<Store>,
}

impl Dispatcher {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Run `action` on the store. See [`Store::dispatch`].
    pub fn dispatch(&self, action: &str, value: Value) -> Result<Dispatch, StoreError> {
        self.store.dispatch(action, value)
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dispatcher").field(&self.store.name()).finish()
    }
}

/// A consumer's view of one store: a selected value, kept up to date.
///
/// The binding caches the selector's output and subscribes to the store. On
/// every notification it recomputes the selector against the new state and,
/// only if the result differs from the cached value under the binding's
/// equality, updates the cache and calls `on_change`.
///
/// Dropping the binding unsubscribes it.
///
/// # Examples
///
/// ```
/// use serde_json::{json, Value};
/// use shared_store::registry::Registry;
/// use shared_store::{Action, Binding, Model, Provider};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let registry = Registry::new();
/// let model = Model::new("modelA", json!({ "a": 0, "b": 0 })).action(
///     "addA",
///     Action::sync(|value, state| {
///         state.insert("a".to_string(), value);
///         Ok(())
///     }),
/// );
/// let _provider = Provider::mount(&registry, vec![model]).unwrap();
///
/// let renders = Arc::new(AtomicUsize::new(0));
/// let renders_clone = renders.clone();
/// let a = Binding::new(
///     &registry,
///     "modelA",
///     |state| state.get("a").cloned().unwrap_or(Value::Null),
///     move |_| {
///         renders_clone.fetch_add(1, Ordering::SeqCst);
///     },
/// )
/// .unwrap();
///
/// let _ = a.dispatch("addA", json!(1)).unwrap();
/// let _ = a.dispatch("addA", json!(1)).unwrap();
/// assert_eq!(a.value(), json!(1));
/// assert_eq!(renders.load(Ordering::SeqCst), 1);
/// ```
pub struct Binding<T> {
    store: Arc<Store>,
    selector: Selector<T>,
    is_equal: Equality<T>,
    on_change: OnChange<T>,
    cached: Arc<Mutex<T>>,
    subscription: Option<Subscription>,
}

impl<T> Binding<T>
where
    T: Clone + Send + 'static,
{
    /// Bind to the store named `name`, comparing selected values with
    /// [`loose_equal`] over their serialized form.
    pub fn new<S, C>(registry: &Registry, name: &str, selector: S, on_change: C) -> Result<Self, StoreError>
    where
        T: Serialize,
        S: Fn(&State) -> T + Send + Sync + 'static,
        C: Fn(&T) + Send + Sync + 'static,
    {
        Self::with_equality(registry, name, selector, loose_equal_serialized::<T>, on_change)
    }

    /// Bind with a custom equality.
    pub fn with_equality<S, E, C>(
        registry: &Registry,
        name: &str,
        selector: S,
        is_equal: E,
        on_change: C,
    ) -> Result<Self, StoreError>
    where
        S: Fn(&State) -> T + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
        C: Fn(&T) + Send + Sync + 'static,
    {
        let store = registry.require_store(name)?;
        Ok(Self::attach(
            store,
            Arc::new(selector),
            Arc::new(is_equal),
            Arc::new(on_change),
        ))
    }

    fn attach(store: Arc<Store>, selector: Selector<T>, is_equal: Equality<T>, on_change: OnChange<T>) -> Self {
        let seed = store.read(|state| selector(state));
        let mut binding = Self {
            store,
            selector,
            is_equal,
            on_change,
            cached: Arc::new(Mutex::new(seed)),
            subscription: None,
        };
        binding.subscribe();
        binding.reselect();
        binding
    }

    fn subscribe(&mut self) {
        let selector = Arc::clone(&self.selector);
        let is_equal = Arc::clone(&self.is_equal);
        let on_change = Arc::clone(&self.on_change);
        let cached = Arc::clone(&self.cached);
        let store = self.store.name().to_string();

        self.subscription = Some(self.store.subscribe(move |state| {
            let next = selector(&**state);
            let changed = {
                let mut cached = cached.lock();
                if is_equal(&*cached, &next) {
                    false
                } else {
                    *cached = next.clone();
                    true
                }
            };
            trace!(store = %store, changed, "binding checked");
            if changed {
                on_change(&next);
            }
        }));
    }

    // Refresh the cache from the current state without calling `on_change`.
    // Runs after subscribing, so a change landing in between is either read
    // here or delivered to the listener.
    fn reselect(&self) {
        let mut cached = self.cached.lock();
        *cached = self.store.read(|state| (self.selector)(state));
    }

    fn resubscribe(&mut self) {
        self.subscription.take();
        self.subscribe();
        self.reselect();
    }

    /// The cached selected value.
    pub fn value(&self) -> T {
        self.cached.lock().clone()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.store))
    }

    /// Run `action` on the bound store. A pending [`Dispatch`] must be
    /// awaited or spawned, or the action is abandoned.
    pub fn dispatch(&self, action: &str, value: Value) -> Result<Dispatch, StoreError> {
        self.store.dispatch(action, value)
    }

    /// Replace the selector.
    pub fn set_selector<S>(&mut self, selector: S)
    where
        S: Fn(&State) -> T + Send + Sync + 'static,
    {
        self.selector = Arc::new(selector);
        self.resubscribe();
    }

    /// Replace the equality.
    pub fn set_equality<E>(&mut self, is_equal: E)
    where
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.is_equal = Arc::new(is_equal);
        self.resubscribe();
    }

    /// Move the binding to the store now registered under `name`.
    ///
    /// On failure the binding keeps its current store and subscription.
    pub fn rebind(&mut self, registry: &Registry, name: &str) -> Result<(), StoreError> {
        self.store = registry.require_store(name)?;
        self.resubscribe();
        Ok(())
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Stop listening. Equivalent to dropping the binding.
    pub fn unbind(mut self) {
        self.subscription.take();
    }
}

impl<T: fmt::Debug> fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("store", &self.store.name())
            .field("value", &*self.cached.lock())
            .finish_non_exhaustive()
    }
}

/// Bind to the whole state of `name` in the current registry.
pub fn use_store<C>(name: &str, on_change: C) -> Result<Binding<Value>, StoreError>
where
    C: Fn(&Value) + Send + Sync + 'static,
{
    Binding::with_equality(
        &Registry::current(),
        name,
        |state| Value::Object(state.clone()),
        loose_equal,
        on_change,
    )
}

/// Bind to a selected value of `name` in the current registry.
pub fn use_store_with<T, S, C>(name: &str, selector: S, on_change: C) -> Result<Binding<T>, StoreError>
where
    T: Clone + Send + Serialize + 'static,
    S: Fn(&State) -> T + Send + Sync + 'static,
    C: Fn(&T) + Send + Sync + 'static,
{
    Binding::new(&Registry::current(), name, selector, on_change)
}

/// Bind to the status record of `key` (`"model/action"`) in the current registry.
pub fn use_status<C>(key: &str, on_change: C) -> Result<Binding<Status>, StoreError>
where
    C: Fn(&Status) + Send + Sync + 'static,
{
    bind_status(&Registry::current(), key, on_change)
}

/// Bind to the status record of `key` in `registry`.
///
/// A missing record is created with the default value first, without
/// notifying anyone.
pub fn bind_status<C>(registry: &Registry, key: &str, on_change: C) -> Result<Binding<Status>, StoreError>
where
    C: Fn(&Status) + Send + Sync + 'static,
{
    check_status_key(key)?;
    let store = registry.require_store(STATUS_MODEL_NAME)?;
    ensure_status(&store, key);
    let key = key.to_string();
    Ok(Binding::attach(
        store,
        Arc::new(move |state: &State| read_status(state, &key)),
        Arc::new(loose_equal_serialized::<Status>),
        Arc::new(on_change),
    ))
}
