use crate::error::{ActionError, StoreError};
use crate::store::{Model, State, Store};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::trace;

/// Name of the reserved status model. Not usable as a user model name.
pub const STATUS_MODEL_NAME: &str = "@STATUS";

/// Error recorded for an async action whose dispatch was dropped before it settled.
pub const ABANDONED_ERROR: &str = "action abandoned before it settled";

/// Pending/error record for one asynchronous action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub pending: bool,
    pub error: Option<String>,
}

impl Status {
    pub fn pending() -> Self {
        Self {
            pending: true,
            error: None,
        }
    }

    pub fn failed(error: &ActionError) -> Self {
        Self {
            pending: false,
            error: Some(error.message().to_string()),
        }
    }

    fn to_value(&self) -> Value {
        json!({ "pending": self.pending, "error": self.error })
    }
}

/// The model backing the status store.
pub fn status_model() -> Model {
    Model::new(STATUS_MODEL_NAME, json!({}))
}

/// Status key for `action` of `model`.
pub fn status_key(model: &str, action: &str) -> String {
    format!("{}/{}", model, action)
}

/// Check that `key` has the form `model/action`.
pub fn check_status_key(key: &str) -> Result<(), StoreError> {
    match key.split_once('/') {
        Some((model, action)) if !model.is_empty() && !action.is_empty() => Ok(()),
        _ => Err(StoreError::InvalidStatusKey {
            key: key.to_string(),
        }),
    }
}

/// The record under `key`, or the default record if it is missing or malformed.
pub(crate) fn read_status(state: &State, key: &str) -> Status {
    state
        .get(key)
        .and_then(|value| serde_json::from_value(value.clone()).ok())
        .unwrap_or_default()
}

/// Create the default record for `key` if there is none.
///
/// Writes straight into the status state and does not notify.
pub(crate) fn ensure_status(store: &Store, key: &str) -> Status {
    store.mutate(|state| {
        if !state.contains_key(key) {
            trace!(key, "initializing action status");
            state.insert(key.to_string(), Status::default().to_value());
        }
        read_status(state, key)
    })
}

/// Mark `key` pending if it already has a record, then notify.
pub(crate) fn mark_pending(store: &Store, key: &str) -> bool {
    write_existing(store, key, Status::pending())
}

/// Record the outcome for `key` if it has a record, then notify.
pub(crate) fn settle(store: &Store, key: &str, error: Option<&ActionError>) -> bool {
    let status = match error {
        Some(error) => Status::failed(error),
        None => Status::default(),
    };
    write_existing(store, key, status)
}

// Listeners are notified even when no record exists, so every transition
// reaches the status store's subscribers in dispatch order.
fn write_existing(store: &Store, key: &str, status: Status) -> bool {
    let written = store.mutate(|state| match state.get_mut(key) {
        Some(slot) => {
            *slot = status.to_value();
            true
        }
        None => false,
    });
    trace!(key, written, pending = status.pending, "action status transition");
    store.notify();
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn status_store() -> Store {
        Store::new(status_model()).unwrap()
    }

    #[test]
    fn status_key_checks() {
        assert_eq!(status_key("modelA", "addA"), "modelA/addA");
        assert!(check_status_key("modelA/addA").is_ok());
        assert!(check_status_key("").is_err());
        assert!(check_status_key("modelA").is_err());
        assert!(check_status_key("/addA").is_err());
        assert!(check_status_key("modelA/").is_err());
    }

    #[test]
    fn ensure_status_initializes_without_notifying() {
        let store = status_store();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _subscription = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(ensure_status(&store, "modelA/addA"), Status::default());
        assert!(store.state().contains_key("modelA/addA"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn transitions_only_touch_existing_records() {
        let store = status_store();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let _subscription = store.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!mark_pending(&store, "modelA/addA"));
        assert!(!store.state().contains_key("modelA/addA"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        ensure_status(&store, "modelA/addA");
        assert!(mark_pending(&store, "modelA/addA"));
        assert_eq!(read_status(&store.state(), "modelA/addA"), Status::pending());

        let error = ActionError::new("err");
        assert!(settle(&store, "modelA/addA", Some(&error)));
        assert_eq!(
            read_status(&store.state(), "modelA/addA"),
            Status {
                pending: false,
                error: Some("err".to_string())
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn malformed_record_reads_as_default() {
        let mut state = State::new();
        state.insert("modelA/addA".to_string(), json!("garbage"));
        assert_eq!(read_status(&state, "modelA/addA"), Status::default());
    }
}
