//! Error types for stores, bindings and providers.

use thiserror::Error;

/// Precondition violations and synchronous action faults.
///
/// Every variant names the invariant that was broken, so callers can tell a
/// bad model definition apart from a bad action lookup or a missing store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// A provider was mounted with an empty model list.
    #[error("should provide at least one model")]
    NoModels,

    /// A model name was empty.
    #[error("model name is required")]
    EmptyName,

    /// A model used the name reserved for action status tracking.
    #[error("model name [{name}] is reserved")]
    ReservedName { name: String },

    /// Two models in the same provider share a name.
    #[error("model name [{name}] is declared more than once")]
    DuplicateModel { name: String },

    /// The model definition has the wrong shape.
    #[error("model[{name}] is invalid: {reason}")]
    InvalidModel { name: String, reason: String },

    /// Dispatch of an action the model does not declare.
    #[error("model[{model}].actions[{action}] should be an action")]
    UnknownAction { model: String, action: String },

    /// No store is registered under the name.
    #[error("store with name[{name}] has not been created, ensure it is mounted by a provider")]
    StoreNotFound { name: String },

    /// The status reader was given something other than `model/action`.
    #[error("status key [{key}] should be of the form model/action")]
    InvalidStatusKey { key: String },

    /// A synchronous action handler failed.
    #[error("action failed: {0}")]
    Action(#[from] ActionError),
}

/// Failure reported by an action handler.
///
/// Synchronous failures propagate out of dispatch; asynchronous ones are
/// recorded in the action's status record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    message: String,
}

impl ActionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any error, keeping its display text.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_error(&err)
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_violation() {
        let e = StoreError::UnknownAction {
            model: "modelA".to_string(),
            action: "addA".to_string(),
        };
        assert_eq!(e.to_string(), "model[modelA].actions[addA] should be an action");

        let e = StoreError::StoreNotFound {
            name: "modelB".to_string(),
        };
        assert!(e.to_string().contains("modelB"));
    }

    #[test]
    fn action_error_converts_into_store_error() {
        let e: StoreError = ActionError::new("err").into();
        assert_eq!(e, StoreError::Action(ActionError::new("err")));
        assert_eq!(e.to_string(), "action failed: err");
    }

    #[test]
    fn action_error_from_json_error() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let e: ActionError = err.into();
        assert!(!e.message().is_empty());
    }
}
