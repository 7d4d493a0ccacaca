//! Mapping of the payload's `ClientCredentialType` onto an authentication flow.

use crate::constants::credentials;
use crate::errors::StepError;
use base64::Engine;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationMode {
    IntegratedWindows,
    Basic,
    Oidc,
    Unsupported(String),
}

impl AuthenticationMode {
    /// Never fails; unknown tags are carried for a later "not implemented" error.
    pub fn classify(credential_type: &str) -> Self {
        match credential_type {
            credentials::WINDOWS => AuthenticationMode::IntegratedWindows,
            credentials::BASIC => AuthenticationMode::Basic,
            credentials::OIDC => AuthenticationMode::Oidc,
            other => AuthenticationMode::Unsupported(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AuthenticationMode::IntegratedWindows => "Windows",
            AuthenticationMode::Basic => "Basic",
            AuthenticationMode::Oidc => "OIDC",
            AuthenticationMode::Unsupported(tag) => tag,
        }
    }

    /// Basic and OIDC callbacks forward the inbound header; Windows negotiates instead.
    pub fn forwards_authorization_header(&self) -> bool {
        matches!(self, AuthenticationMode::Basic | AuthenticationMode::Oidc)
    }

    pub fn ensure_supported(&self) -> Result<(), StepError> {
        match self {
            AuthenticationMode::Unsupported(tag) => Err(unknown_credentials(tag)),
            _ => Ok(()),
        }
    }

    /// Extracts what this mode needs from the authorization header.
    pub fn credentials(&self, authorization_header: &str) -> Result<Credentials, StepError> {
        match self {
            AuthenticationMode::IntegratedWindows => Ok(Credentials::Autologon),
            AuthenticationMode::Basic => {
                let (username, password) = extract_basic_credentials(authorization_header)?;
                Ok(Credentials::UsernamePassword { username, password })
            }
            AuthenticationMode::Oidc => {
                Ok(Credentials::OidcToken(extract_bearer_token(authorization_header)?))
            }
            AuthenticationMode::Unsupported(tag) => Err(unknown_credentials(tag)),
        }
    }
}

fn unknown_credentials(tag: &str) -> StepError {
    StepError::not_implemented(format!("Unknown credentials type \"{}\"", tag))
        .with_details(serde_json::json!({ "client_credential_type": tag }))
}

/// Credentials handed to the legacy toolkit or a REST connection factory.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Autologon,
    UsernamePassword { username: String, password: String },
    OidcToken(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Autologon => write!(f, "Autologon"),
            Credentials::UsernamePassword { username, .. } => f
                .debug_struct("UsernamePassword")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Credentials::OidcToken(_) => write!(f, "OidcToken(***)"),
        }
    }
}

/// Decodes `Basic <base64(user:pass)>`, splitting at the first colon.
pub fn extract_basic_credentials(
    authorization_header: &str,
) -> Result<(String, String), StepError> {
    let encoded = authorization_header
        .get(credentials::BASIC_PREFIX_LEN..)
        .unwrap_or("")
        .trim();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.as_bytes())
        .map_err(|err| {
            StepError::invalid_payload(format!(
                "AuthorizationHeader is not valid Basic credentials: {}",
                err
            ))
        })?;
    let decoded = String::from_utf8(decoded).map_err(|_| {
        StepError::invalid_payload("AuthorizationHeader Basic credentials are not valid UTF-8")
    })?;
    let (username, password) = decoded.split_once(':').ok_or_else(|| {
        StepError::invalid_payload("AuthorizationHeader Basic credentials must be user:password")
    })?;
    Ok((username.to_string(), password.to_string()))
}

/// Strips the `Bearer ` prefix.
pub fn extract_bearer_token(authorization_header: &str) -> Result<String, StepError> {
    let token = authorization_header
        .get(credentials::BEARER_PREFIX_LEN..)
        .unwrap_or("");
    if token.is_empty() {
        return Err(StepError::invalid_payload(
            "AuthorizationHeader does not carry an OIDC bearer token",
        ));
    }
    Ok(token.to_string())
}
