use super::State;
use crate::error::ActionError;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed, sendable future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

type SyncHandler = dyn Fn(Value, &mut State) -> Result<(), ActionError> + Send + Sync;
type AsyncHandler = dyn Fn(Value, Draft) -> BoxFuture<Result<(), ActionError>> + Send + Sync;

/// A named mutation procedure.
///
/// Whether an action completes immediately or asynchronously is fixed when it
/// is built, so dispatch never has to inspect a handler's return value.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shared_store::Action;
///
/// let set_a = Action::sync(|value, state| {
///     state.insert("a".to_string(), value);
///     Ok(())
/// });
/// assert!(!set_a.is_async());
///
/// let load_a = Action::future(|value, draft| async move {
///     draft.set("a", value);
///     Ok(())
/// });
/// assert!(load_a.is_async());
/// ```
#[derive(Clone)]
pub enum Action {
    Sync(Arc<SyncHandler>),
    Async(Arc<AsyncHandler>),
}

impl Action {
    /// An action that mutates the state in place and completes immediately.
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(Value, &mut State) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        Action::Sync(Arc::new(handler))
    }

    /// An action that completes when the returned future resolves.
    ///
    /// The handler writes through the [`Draft`] it is given, before or after
    /// any suspension point.
    pub fn future<F, Fut>(handler: F) -> Self
    where
        F: Fn(Value, Draft) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ActionError>> + Send + 'static,
    {
        Action::Async(Arc::new(move |value, draft| -> BoxFuture<Result<(), ActionError>> {
            Box::pin(handler(value, draft))
        }))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Action::Async(_))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Sync(_) => f.write_str("Action::Sync"),
            Action::Async(_) => f.write_str("Action::Async"),
        }
    }
}

/// Write handle to a store's state, handed to asynchronous actions.
///
/// Writes are copy-on-write: a snapshot taken earlier with
/// [`Draft::snapshot`] or [`crate::Store::state`] never changes afterwards.
#[derive(Clone)]
pub struct Draft {
    state: Arc<RwLock<Arc<State>>>,
}

impl Draft {
    pub(crate) fn new(state: Arc<RwLock<Arc<State>>>) -> Self {
        Self { state }
    }

    /// Mutate the state in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.write();
        f(Arc::make_mut(&mut *state))
    }

    /// Read the state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        let state = self.state.read();
        f(&**state)
    }

    pub fn snapshot(&self) -> Arc<State> {
        Arc::clone(&*self.state.read())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read(|state| state.get(key).cloned())
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.update(|state| {
            state.insert(key.into(), value);
        });
    }
}

impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Draft").field(&**self.state.read()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft() -> Draft {
        let mut state = State::new();
        state.insert("a".to_string(), json!(0));
        Draft::new(Arc::new(RwLock::new(Arc::new(state))))
    }

    #[test]
    fn draft_writes_do_not_touch_earlier_snapshots() {
        let draft = draft();
        let before = draft.snapshot();

        draft.set("a", json!(1));

        assert_eq!(before.get("a"), Some(&json!(0)));
        assert_eq!(draft.get("a"), Some(json!(1)));
        assert_eq!(draft.snapshot().get("a"), Some(&json!(1)));
    }

    #[test]
    fn draft_update_returns_closure_result() {
        let draft = draft();
        let previous = draft.update(|state| state.insert("a".to_string(), json!(5)));
        assert_eq!(previous, Some(json!(0)));
        assert_eq!(draft.read(|state| state.len()), 1);
    }

    #[test]
    fn action_kind_is_fixed_at_construction() {
        let sync = Action::sync(|_, _| Ok(()));
        let future = Action::future(|_, _| async { Ok(()) });
        assert!(!sync.is_async());
        assert!(future.is_async());
        assert_eq!(format!("{:?}", future), "Action::Async");
    }
}
