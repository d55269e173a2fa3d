use super::{Action, BoxFuture, Draft, Model, State};
use crate::error::{ActionError, StoreError};
use crate::registry::Registry;
use crate::status::{self, status_key, ABANDONED_ERROR, STATUS_MODEL_NAME};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Wake, Waker};
use tracing::{debug, trace, warn};

/// Callback invoked with the state on every notification.
pub type Listener = Arc<dyn Fn(&Arc<State>) + Send + Sync>;

struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

// State and listeners outlive a dispatch call, so async actions can notify
// after the borrow of the store has ended.
#[derive(Clone)]
struct Shared {
    state: Arc<RwLock<Arc<State>>>,
    listeners: Arc<Mutex<Listeners>>,
}

impl Shared {
    fn notify_with(&self, state: &Arc<State>) {
        // Positional snapshot: (un)subscribing during this pass affects only later passes.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!(listeners = listeners.len(), "notifying listeners");
        for listener in listeners {
            listener(state);
        }
    }

    fn notify(&self) {
        let state = Arc::clone(&*self.state.read());
        self.notify_with(&state);
    }
}

/// Runtime instance owning one model's state, actions and subscribers.
///
/// State is copy-on-write: [`Store::state`] hands out a snapshot that later
/// dispatches never mutate.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shared_store::{Action, Model, Store};
///
/// let store = Store::new(
///     Model::new("modelA", json!({ "a": 0 })).action(
///         "addA",
///         Action::sync(|value, state| {
///             state.insert("a".to_string(), value);
///             Ok(())
///         }),
///     ),
/// )
/// .unwrap();
///
/// let before = store.state();
/// let done = store.dispatch("addA", json!(1)).unwrap();
/// assert!(!done.is_pending());
/// assert_eq!(before["a"], json!(0));
/// assert_eq!(store.state()["a"], json!(1));
/// ```
pub struct Store {
    name: String,
    actions: BTreeMap<String, Action>,
    shared: Shared,
    registry: Weak<Registry>,
}

impl Store {
    /// Create a store that is not attached to any registry.
    ///
    /// Asynchronous actions still run, but no status records are written.
    pub fn new(model: Model) -> Result<Self, StoreError> {
        Self::build(model, Weak::new())
    }

    /// Create a store that records async action status in `registry`'s status store.
    pub fn with_registry(model: Model, registry: &Arc<Registry>) -> Result<Self, StoreError> {
        Self::build(model, Arc::downgrade(registry))
    }

    fn build(model: Model, registry: Weak<Registry>) -> Result<Self, StoreError> {
        model.check()?;
        let (name, state, actions) = model.into_parts();
        let state = match state {
            Value::Object(state) => state,
            _ => {
                return Err(StoreError::InvalidModel {
                    name,
                    reason: "model state should be an object".to_string(),
                })
            }
        };
        Ok(Self {
            name,
            actions,
            shared: Shared {
                state: Arc::new(RwLock::new(Arc::new(state))),
                listeners: Arc::new(Mutex::new(Listeners {
                    next_id: 0,
                    entries: Vec::new(),
                })),
            },
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> Arc<State> {
        Arc::clone(&*self.shared.state.read())
    }

    /// Read state without cloning it.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&State) -> R,
    {
        let state = self.shared.state.read();
        f(&**state)
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Subscribe to state notifications.
    ///
    /// The listener stays registered until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<State>) + Send + Sync + 'static,
    {
        let mut listeners = self.shared.listeners.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        trace!(store = %self.name, id, "subscribed");
        Subscription {
            id,
            listeners: Some(Arc::downgrade(&self.shared.listeners)),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().entries.len()
    }

    /// Run the named action.
    ///
    /// The synchronous part runs before this returns: an unknown action or a
    /// failing sync handler is reported here, and a sync handler's change is
    /// already notified.
    ///
    /// An async handler is polled once on the caller's thread, so everything
    /// up to its first suspension point has happened when this returns. A
    /// handler that finishes without suspending is settled right here. One
    /// that suspends is left in the returned [`Dispatch`], which must be
    /// awaited (or spawned) to drive it; dropping it early abandons the
    /// action. Async failures are recorded in the status store and never
    /// returned.
    ///
    /// Handlers that rely on a runtime (timers, IO) must be dispatched from
    /// inside that runtime, since their first poll happens here.
    pub fn dispatch(&self, action: &str, value: Value) -> Result<Dispatch, StoreError> {
        let handler = self
            .actions
            .get(action)
            .ok_or_else(|| StoreError::UnknownAction {
                model: self.name.clone(),
                action: action.to_string(),
            })?;
        debug!(store = %self.name, action, is_async = handler.is_async(), "dispatching action");

        match handler {
            Action::Sync(handler) => {
                {
                    let mut state = self.shared.state.write();
                    handler(value, Arc::make_mut(&mut *state))?;
                }
                self.notify();
                Ok(Dispatch::done())
            }
            Action::Async(handler) => {
                let mut work = handler(value, Draft::new(Arc::clone(&self.shared.state)));
                let first = poll_once(&mut work);
                let tracker = Tracker {
                    store: self.name.clone(),
                    key: status_key(&self.name, action),
                    status_store: self.status_store(),
                    owner: self.shared.clone(),
                };
                tracker.start();
                match first {
                    Poll::Ready(result) => {
                        tracker.finish(result.err());
                        Ok(Dispatch::done())
                    }
                    Poll::Pending => Ok(Dispatch {
                        in_flight: Some(InFlight { work, tracker }),
                    }),
                }
            }
        }
    }

    /// Notify every listener with the current state.
    pub fn notify(&self) {
        self.shared.notify();
    }

    /// Notify every listener with `state` instead of the store's own state.
    pub fn notify_with(&self, state: &Arc<State>) {
        self.shared.notify_with(state);
    }

    /// Mutate state directly, without notifying.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.shared.state.write();
        f(Arc::make_mut(&mut *state))
    }

    fn status_store(&self) -> Option<Arc<Store>> {
        if self.name == STATUS_MODEL_NAME {
            return None;
        }
        self.registry.upgrade()?.get_store(STATUS_MODEL_NAME)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// RAII guard for a store listener.
///
/// Removes exactly the listener it was created for, even when the same
/// callback is subscribed more than once.
#[must_use = "the listener is removed as soon as the subscription is dropped"]
pub struct Subscription {
    id: u64,
    listeners: Option<Weak<Mutex<Listeners>>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.remove();
    }

    pub fn is_active(&self) -> bool {
        self.listeners
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|listeners| listeners.lock().entries.iter().any(|(id, _)| *id == self.id))
    }

    fn remove(&mut self) {
        if let Some(listeners) = self.listeners.take().and_then(|weak| weak.upgrade()) {
            let mut listeners = listeners.lock();
            if let Some(index) = listeners.entries.iter().position(|(id, _)| *id == self.id) {
                listeners.entries.remove(index);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.remove();
    }
}

/// Completion of a dispatched action.
///
/// Already complete for synchronous actions and for async handlers that
/// finished during [`Store::dispatch`]. Otherwise it holds the suspended
/// handler: awaiting it drives the handler to completion, writes the settled
/// status and notifies the store's listeners. `Dispatch` is `Send + 'static`,
/// so it can also be handed to an executor, e.g. `tokio::spawn(dispatch)`.
///
/// Dropping a pending `Dispatch` abandons the action. Writes it already made
/// stay in place, its status record (if read) settles with the
/// [`ABANDONED_ERROR`](crate::status::ABANDONED_ERROR) message and listeners
/// are notified.
#[must_use = "an async action is abandoned when its dispatch is dropped before it settles"]
pub struct Dispatch {
    in_flight: Option<InFlight>,
}

struct InFlight {
    work: BoxFuture<Result<(), ActionError>>,
    tracker: Tracker,
}

// Status bookkeeping for one async dispatch.
struct Tracker {
    store: String,
    key: String,
    status_store: Option<Arc<Store>>,
    owner: Shared,
}

impl Tracker {
    fn start(&self) {
        if let Some(status_store) = &self.status_store {
            status::mark_pending(status_store, &self.key);
        }
    }

    fn finish(&self, error: Option<ActionError>) {
        if let Some(error) = &error {
            warn!(store = %self.store, key = %self.key, %error, "async action failed");
        }
        if let Some(status_store) = &self.status_store {
            status::settle(status_store, &self.key, error.as_ref());
        }
        self.owner.notify();
    }
}

impl Dispatch {
    fn done() -> Self {
        Self { in_flight: None }
    }

    /// True until an asynchronous action has settled.
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }
}

impl Future for Dispatch {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let Some(in_flight) = self.in_flight.as_mut() else {
            return Poll::Ready(());
        };
        match in_flight.work.as_mut().poll(cx) {
            Poll::Ready(result) => {
                if let Some(in_flight) = self.in_flight.take() {
                    in_flight.tracker.finish(result.err());
                }
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Dispatch {
    fn drop(&mut self) {
        if let Some(InFlight { work, tracker }) = self.in_flight.take() {
            drop(work);
            warn!(store = %tracker.store, key = %tracker.key, "async action dropped before it settled");
            tracker.finish(Some(ActionError::new(ABANDONED_ERROR)));
        }
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("pending", &self.is_pending())
            .finish()
    }
}

struct NoopWake;

impl Wake for NoopWake {
    fn wake(self: Arc<Self>) {}
}

// Run a future up to its first suspension point. Whoever polls it next
// registers the waker that matters.
fn poll_once<F: Future + Unpin>(future: &mut F) -> Poll<F::Output> {
    let waker = Waker::from(Arc::new(NoopWake));
    let mut cx = Context::from_waker(&waker);
    Pin::new(future).poll(&mut cx)
}
