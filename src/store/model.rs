use super::Action;
use crate::error::StoreError;
use crate::status::STATUS_MODEL_NAME;
use crate::utils::is_plain_object;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// A named unit of state plus the actions allowed to mutate it.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use shared_store::{Action, Model};
///
/// let model = Model::new("modelA", json!({ "a": 0, "b": 0 })).action(
///     "addA",
///     Action::sync(|value, state| {
///         state.insert("a".to_string(), value);
///         Ok(())
///     }),
/// );
/// assert_eq!(model.name(), "modelA");
/// assert!(model.actions().contains_key("addA"));
/// ```
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    state: Value,
    actions: BTreeMap<String, Action>,
}

impl Model {
    /// Create a model. `state` must be a JSON object; this is checked when
    /// the model is mounted.
    pub fn new(name: impl Into<String>, state: Value) -> Self {
        Self {
            name: name.into(),
            state,
            actions: BTreeMap::new(),
        }
    }

    /// Add an action, replacing any earlier one with the same name.
    pub fn action(mut self, name: impl Into<String>, action: Action) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &Value {
        &self.state
    }

    pub fn actions(&self) -> &BTreeMap<String, Action> {
        &self.actions
    }

    /// Check the shape of a single model.
    pub fn check(&self) -> Result<(), StoreError> {
        if self.name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if !is_plain_object(&self.state) {
            return Err(StoreError::InvalidModel {
                name: self.name.clone(),
                reason: "model state should be an object".to_string(),
            });
        }
        if let Some(action) = self.actions.keys().find(|action| action.is_empty()) {
            return Err(StoreError::InvalidModel {
                name: self.name.clone(),
                reason: format!("action name [{}] should not be empty", action),
            });
        }
        Ok(())
    }

    pub(crate) fn into_parts(self) -> (String, Value, BTreeMap<String, Action>) {
        (self.name, self.state, self.actions)
    }
}

/// Validate a list of user models before mounting it.
///
/// The list must be non-empty, every model must be well formed, no model may
/// use the reserved status name and no two models may share a name.
pub fn check_models(models: &[Model]) -> Result<(), StoreError> {
    if models.is_empty() {
        return Err(StoreError::NoModels);
    }
    let mut seen = HashSet::new();
    for model in models {
        model.check()?;
        if model.name == STATUS_MODEL_NAME {
            return Err(StoreError::ReservedName {
                name: model.name.clone(),
            });
        }
        if !seen.insert(model.name.as_str()) {
            return Err(StoreError::DuplicateModel {
                name: model.name.clone(),
            });
        }
    }
    Ok(())
}
