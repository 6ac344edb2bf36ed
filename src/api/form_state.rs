//! Flashed form state read back after a failed validation redirect.

use std::collections::HashMap;

use serde_json::Value;

use crate::constants::{SESSION_KEY_ERRORS, SESSION_KEY_FORM_DATA};
use crate::error::ServiceResult;
use crate::functional::validation_engine::PostedData;
use crate::services::session_store::SessionStore;

/// Errors and previously submitted values for re-rendering a form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    errors: HashMap<String, String>,
    values: PostedData,
}

impl FormState {
    pub fn new(errors: HashMap<String, String>, values: PostedData) -> Self {
        Self { errors, values }
    }

    /// Consumes `errors` and `form_data` from the session.
    ///
    /// Missing or malformed entries read as empty.
    pub fn take_from(session: &dyn SessionStore) -> ServiceResult<Self> {
        let errors = match session.take(SESSION_KEY_ERRORS)? {
            Some(Value::Object(map)) => map
                .into_iter()
                .filter_map(|(field, message)| match message {
                    Value::String(message) => Some((field, message)),
                    _ => None,
                })
                .collect(),
            _ => HashMap::new(),
        };

        let values = match session.take(SESSION_KEY_FORM_DATA)? {
            Some(Value::Object(map)) => PostedData::from(map),
            _ => PostedData::new(),
        };

        Ok(Self { errors, values })
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    pub fn error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn errors(&self) -> &HashMap<String, String> {
        &self.errors
    }

    /// Previously submitted value of `field`.
    pub fn old(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn values(&self) -> &PostedData {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session_store::MemorySessionStore;
    use serde_json::json;

    #[test]
    fn test_take_from_session() {
        let session = MemorySessionStore::new();
        session
            .set(SESSION_KEY_ERRORS, json!({"name": "Field 'name' is required", "bad": 3}))
            .unwrap();
        session
            .set(SESSION_KEY_FORM_DATA, json!({"name": "", "age": "30"}))
            .unwrap();

        let state = FormState::take_from(&session).unwrap();
        assert!(state.has_errors());
        assert_eq!(state.error("name"), Some("Field 'name' is required"));
        assert!(!state.has_error("bad"));
        assert_eq!(state.old("age"), Some(&json!("30")));

        // Flashed state is consumed.
        assert_eq!(FormState::take_from(&session).unwrap(), FormState::default());
    }

    #[test]
    fn test_empty_session() {
        let state = FormState::take_from(&MemorySessionStore::new()).unwrap();
        assert!(!state.has_errors());
        assert!(state.old("name").is_none());
        assert!(state.values().is_empty());
    }
}
