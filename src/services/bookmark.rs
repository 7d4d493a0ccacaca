//! The HTTP callback that resumes the workflow engine's suspended bookmark.

use crate::constants::urls;
use crate::errors::StepError;
use crate::services::auth::AuthenticationMode;
use crate::services::logger::Logger;
use crate::services::payload::StepContext;
use crate::services::transport::TransportPolicy;
use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

const NEGOTIATE_HINT: &str = "Register a NegotiateAuth with \
    DataflowIntegration::with_negotiate_auth, or use Basic or OIDC credentials for this step.";

/// Status reported back to the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExitCode {
    Code(i64),
    Text(String),
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCode::Code(code) => write!(f, "{}", code),
            ExitCode::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<i64> for ExitCode {
    fn from(code: i64) -> Self {
        ExitCode::Code(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode::Code(i64::from(code))
    }
}

impl From<&str> for ExitCode {
    fn from(text: &str) -> Self {
        ExitCode::Text(text.to_string())
    }
}

impl From<String> for ExitCode {
    fn from(text: String) -> Self {
        ExitCode::Text(text)
    }
}

/// Integrated (SPNEGO) authentication, used to answer a `Negotiate` challenge.
pub trait NegotiateAuth: Send + Sync {
    /// Token for an `Authorization: Negotiate <token>` header; `challenge` is the
    /// server's challenge data, empty on the first round.
    fn negotiate(&self, url: &str, challenge: &str) -> Result<String, StepError>;
}

#[derive(Clone)]
pub struct BookmarkClient {
    logger: Logger,
    negotiate: Option<Arc<dyn NegotiateAuth>>,
}

impl BookmarkClient {
    pub fn new(logger: &Logger, negotiate: Option<Arc<dyn NegotiateAuth>>) -> Self {
        Self {
            logger: logger.child("bookmark"),
            negotiate,
        }
    }

    pub fn callback_url(policy: &TransportPolicy, context: &StepContext) -> String {
        format!(
            "{}/{}/{}",
            policy.dataflow_url(),
            urls::WORKFLOWS_API_PATH,
            context.workflow_id()
        )
    }

    pub fn resume(
        &self,
        context: &StepContext,
        policy: &TransportPolicy,
        mode: &AuthenticationMode,
        exit_code: &ExitCode,
    ) -> Result<(), StepError> {
        mode.ensure_supported()?;
        self.logger.debug(
            &format!(
                "Returning control to MI Data Flow with exit code {}",
                exit_code
            ),
            None,
        );
        let body = serde_json::to_vec(&serde_json::json!({
            "Values": { "ExitCode": exit_code },
            "WorkflowDefinitionName": context.workflow_definition_id(),
            "TransitionName": context.transition_name(),
        }))?;

        self.logger.debug(
            &format!("Resuming bookmark using URL {}", policy.dataflow_url()),
            None,
        );
        let url = Self::callback_url(policy, context);
        let client = policy.client_builder()?.build()?;

        let response = if mode.forwards_authorization_header() {
            send(&client, &url, &body, Some(context.authorization_header()))?
        } else {
            let first = send(&client, &url, &body, None)?;
            self.answer_challenge(&client, &url, &body, first)?
        };
        ensure_success(response)
    }

    fn answer_challenge(
        &self,
        client: &Client,
        url: &str,
        body: &[u8],
        response: Response,
    ) -> Result<Response, StepError> {
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(challenge) = negotiate_challenge(&response) else {
            return Ok(response);
        };
        let Some(negotiate) = &self.negotiate else {
            let message = "Data Flow requested Negotiate authentication but no integrated \
                authenticator is configured";
            self.logger.warn(message, None);
            let err = StepError::transport(message)
                .with_hint(NEGOTIATE_HINT)
                .with_details(serde_json::json!({ "status": 401, "url": url }));
            return Err(err);
        };
        self.logger.debug("Answering Negotiate challenge", None);
        let token = negotiate.negotiate(url, &challenge)?;
        send(client, url, body, Some(&format!("Negotiate {}", token)))
    }
}

fn send(
    client: &Client,
    url: &str,
    body: &[u8],
    authorization: Option<&str>,
) -> Result<Response, StepError> {
    let mut request = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .body(body.to_vec());
    if let Some(value) = authorization {
        request = request.header(AUTHORIZATION, value);
    }
    Ok(request.send()?)
}

fn negotiate_challenge(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| {
            let trimmed = value.trim();
            let scheme = trimmed.get(..9)?;
            let rest = &trimmed[9..];
            let token_follows = rest.is_empty() || rest.starts_with(' ');
            if token_follows && scheme.eq_ignore_ascii_case("negotiate") {
                Some(rest.trim().to_string())
            } else {
                None
            }
        })
}

fn ensure_success(response: Response) -> Result<(), StepError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let url = response.url().to_string();
    let text = response.text().unwrap_or_default();
    Err(StepError::transport(format!(
        "Resuming the Data Flow bookmark failed ({})",
        status.as_u16()
    ))
    .with_details(serde_json::json!({
        "status": status.as_u16(),
        "url": url,
        "body": text,
    })))
}
