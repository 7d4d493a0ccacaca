use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    InvalidPayload,
    MissingKey,
    InvalidValue,
    FileNotFound,
    NotImplemented,
    MissingClientModule,
    UnsupportedPlatform,
    Transport,
    Internal,
}

#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct StepError {
    pub kind: StepErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl StepError {
    pub fn new(kind: StepErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            hint: None,
            details: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::InvalidPayload, "INVALID_PAYLOAD", message)
    }

    pub fn missing_key(key: &str) -> Self {
        Self::new(
            StepErrorKind::MissingKey,
            "MISSING_KEY",
            format!("Data Flow payload is missing required key \"{}\"", key),
        )
        .with_details(serde_json::json!({ "key": key }))
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::InvalidValue, "INVALID_VALUE", message)
    }

    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::FileNotFound, "FILE_NOT_FOUND", message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::NotImplemented, "NOT_IMPLEMENTED", message)
    }

    pub fn missing_client_module(message: impl Into<String>) -> Self {
        Self::new(
            StepErrorKind::MissingClientModule,
            "MISSING_CLIENT_MODULE",
            message,
        )
    }

    pub fn unsupported_platform(message: impl Into<String>) -> Self {
        Self::new(
            StepErrorKind::UnsupportedPlatform,
            "UNSUPPORTED_PLATFORM",
            message,
        )
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::Transport, "TRANSPORT", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::Internal, "INTERNAL", message)
    }

    /// HTTP status carried by a `Transport` error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        self.details
            .as_ref()
            .and_then(|d| d.get("status"))
            .and_then(|v| v.as_u64())
            .and_then(|v| u16::try_from(v).ok())
    }
}

impl From<std::io::Error> for StepError {
    fn from(err: std::io::Error) -> Self {
        StepError::internal(err.to_string())
    }
}

impl From<serde_json::Error> for StepError {
    fn from(err: serde_json::Error) -> Self {
        StepError::invalid_payload(format!("Data Flow payload is not valid JSON: {}", err))
    }
}

impl From<reqwest::Error> for StepError {
    fn from(err: reqwest::Error) -> Self {
        let message = format!("Data Flow request failed: {}", err);
        match err.status() {
            Some(status) => StepError::transport(message)
                .with_details(serde_json::json!({ "status": status.as_u16() })),
            None => StepError::transport(message),
        }
    }
}
