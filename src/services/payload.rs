//! Parsing of the step payload the workflow engine writes to the script's stdin.

use crate::constants::payload as keys;
use crate::errors::StepError;
use crate::services::logger::Logger;
use crate::services::validation::Validation;
use crate::utils::redact::redact_value;
use crate::utils::stdin::{read_payload, PayloadSource};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The record the workflow step is acting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordReference {
    pub database: String,
    pub table: String,
    pub record_history_guid: String,
}

/// Normalized step context. Read-only once parsed.
#[derive(Debug, Clone)]
pub struct StepContext {
    workflow_id: String,
    workflow_definition_id: String,
    transition_name: String,
    workflow_url: String,
    authorization_header: String,
    client_credential_type: String,
    record: Option<RecordReference>,
    attributes: Option<Value>,
    custom_values: Option<Value>,
    raw: Map<String, Value>,
}

impl StepContext {
    pub fn parse(source: PayloadSource<'_>, logger: &Logger) -> Result<Self, StepError> {
        let raw = read_payload(source)?;
        logger.debug(
            &format!("Dataflow data received: {}", Value::Object(raw.clone())),
            None,
        );
        Self::from_map(raw)
    }

    pub fn from_map(raw: Map<String, Value>) -> Result<Self, StepError> {
        let validation = Validation::new();
        validation.ensure_keys(&raw, keys::REQUIRED_KEYS)?;

        // A record that does not match the expected shape is still passed through in `raw`.
        let record = raw
            .get(keys::RECORD)
            .filter(|v| !v.is_null())
            .and_then(|v| serde_json::from_value::<RecordReference>(v.clone()).ok());

        Ok(Self {
            workflow_id: validation.ensure_string(&raw, keys::WORKFLOW_ID, false)?,
            workflow_definition_id:
                validation.ensure_string(&raw, keys::WORKFLOW_DEFINITION_ID, true)?,
            transition_name: validation.ensure_string(&raw, keys::TRANSITION_NAME, false)?,
            workflow_url: validation.ensure_string(&raw, keys::WORKFLOW_URL, false)?,
            authorization_header:
                validation.ensure_string(&raw, keys::AUTHORIZATION_HEADER, true)?,
            client_credential_type:
                validation.ensure_string(&raw, keys::CLIENT_CREDENTIAL_TYPE, true)?,
            record,
            attributes: passthrough(&raw, keys::ATTRIBUTES),
            custom_values: passthrough(&raw, keys::CUSTOM_VALUES),
            raw,
        })
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn workflow_definition_id(&self) -> &str {
        &self.workflow_definition_id
    }

    pub fn transition_name(&self) -> &str {
        &self.transition_name
    }

    pub fn workflow_url(&self) -> &str {
        &self.workflow_url
    }

    pub fn authorization_header(&self) -> &str {
        &self.authorization_header
    }

    pub fn client_credential_type(&self) -> &str {
        &self.client_credential_type
    }

    pub fn record(&self) -> Option<&RecordReference> {
        self.record.as_ref()
    }

    /// Opaque; whatever shape the workflow sent.
    pub fn attributes(&self) -> Option<&Value> {
        self.attributes.as_ref()
    }

    pub fn custom_values(&self) -> Option<&Value> {
        self.custom_values.as_ref()
    }

    /// The payload exactly as received, including keys this crate does not interpret.
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Copy of the payload safe to echo into logs or record attributes.
    pub fn redacted_payload(&self) -> Value {
        redact_value(&Value::Object(self.raw.clone()))
    }
}

fn passthrough(raw: &Map<String, Value>, key: &str) -> Option<Value> {
    raw.get(key).filter(|v| !v.is_null()).cloned()
}
