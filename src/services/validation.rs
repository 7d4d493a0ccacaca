use crate::errors::StepError;
use serde_json::{Map, Value};

#[derive(Clone, Default)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    /// Fails with a missing-key error naming the first required key that is absent.
    pub fn ensure_keys(&self, data: &Map<String, Value>, keys: &[&str]) -> Result<(), StepError> {
        match keys.iter().find(|key| !data.contains_key(**key)) {
            Some(missing) => Err(StepError::missing_key(missing)),
            None => Ok(()),
        }
    }

    pub fn ensure_string(
        &self,
        data: &Map<String, Value>,
        key: &str,
        allow_empty: bool,
    ) -> Result<String, StepError> {
        let value = data.get(key).ok_or_else(|| StepError::missing_key(key))?;
        let text = value.as_str().ok_or_else(|| {
            StepError::invalid_payload(format!("{} must be a string", key))
                .with_details(serde_json::json!({ "key": key, "value": value }))
        })?;
        if !allow_empty && text.trim().is_empty() {
            return Err(StepError::invalid_payload(format!("{} must be a non-empty string", key)));
        }
        Ok(text.to_string())
    }
}
