//! Transport (HTTP vs HTTPS) and certificate-verification policy for a step.

use crate::constants::urls;
use crate::errors::StepError;
use crate::services::logger::Logger;
use crate::utils::paths::{resolve_against, PathForm};
use std::path::{Path, PathBuf};
use url::Url;

const PEM_CERTIFICATE_MARKER: &[u8] = b"-----BEGIN CERTIFICATE-----";

/// Caller-side transport flags, before they are reconciled with the server.
#[derive(Debug, Clone, Copy)]
pub struct TransportRequest<'a> {
    pub use_https: bool,
    pub verify_ssl: bool,
    pub certificate_file: Option<&'a Path>,
    pub supporting_files_dir: &'a Path,
}

#[derive(Debug, Clone)]
pub struct TransportPolicy {
    https_enabled: bool,
    verify_ssl: bool,
    ca_path: Option<PathBuf>,
    hostname: String,
    dataflow_path: String,
    warnings: Vec<String>,
}

impl TransportPolicy {
    pub fn resolve(
        workflow_url: &str,
        request: TransportRequest<'_>,
        logger: &Logger,
    ) -> Result<Self, StepError> {
        logger.debug("Parsing Data Flow URL", None);
        let parsed = Url::parse(workflow_url).map_err(|err| {
            StepError::invalid_payload(format!("WorkflowUrl is not a valid URL: {}", err))
                .with_details(serde_json::json!({ "WorkflowUrl": workflow_url }))
        })?;
        let hostname = netloc(workflow_url, &parsed)?;
        let dataflow_path = parsed.path().trim_end_matches('/').to_string();
        logger.debug(&format!("Data Flow hostname: \"{}\"", hostname), None);
        logger.debug(&format!("Data Flow path: \"{}\"", dataflow_path), None);

        let server_supports_https = parsed.scheme() == "https";
        let mut warnings = Vec::new();
        if request.use_https && !server_supports_https {
            let message = "\"use_https\" is set to True, but Granta MI server did not provide \
                an https Data Flow url. Either set \"use_https\" to false in the integration \
                options, or ensure that https is properly configured on the Granta MI server.";
            logger.warn(message, None);
            warnings.push(message.to_string());
        }
        let https_enabled = request.use_https && server_supports_https;

        let mut policy = Self {
            https_enabled,
            verify_ssl: https_enabled,
            ca_path: None,
            hostname,
            dataflow_path,
            warnings,
        };

        if !https_enabled {
            policy.verify_ssl = false;
            logger.debug("HTTPS is not enabled. Using plain HTTP.", None);
        } else if !request.verify_ssl {
            policy.verify_ssl = false;
            logger.debug("Certificate verification is disabled.", None);
        } else if let Some(reference) = request.certificate_file {
            let supporting_files_dir = request.supporting_files_dir;
            policy.ca_path = Some(resolve_certificate(reference, supporting_files_dir, logger)?);
        } else {
            logger.debug(
                "No CA certificate provided. Using public CAs to verify certificates.",
                None,
            );
        }

        Ok(policy)
    }

    pub fn https_enabled(&self) -> bool {
        self.https_enabled
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn ca_path(&self) -> Option<&Path> {
        self.ca_path.as_deref()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn scheme(&self) -> &'static str {
        if self.https_enabled {
            "https"
        } else {
            "http"
        }
    }

    pub fn service_layer_url(&self) -> String {
        format!(
            "{}://{}{}",
            self.scheme(),
            self.hostname,
            urls::SERVICE_LAYER_PATH
        )
    }

    pub fn dataflow_url(&self) -> String {
        format!(
            "{}://{}{}",
            self.scheme(),
            self.hostname,
            self.dataflow_path
        )
    }

    /// HTTP client builder honouring the verification policy and any private CA.
    pub fn client_builder(&self) -> Result<reqwest::blocking::ClientBuilder, StepError> {
        let builder = reqwest::blocking::Client::builder();
        if !self.https_enabled {
            return Ok(builder);
        }
        if !self.verify_ssl {
            return Ok(builder.danger_accept_invalid_certs(true));
        }
        match &self.ca_path {
            Some(path) => Ok(builder.add_root_certificate(load_certificate(path)?)),
            None => Ok(builder),
        }
    }
}

/// Authority exactly as written in the workflow URL, minus any userinfo.
///
/// Taken from the raw text because the parsed form drops default ports.
fn netloc(workflow_url: &str, parsed: &Url) -> Result<String, StepError> {
    parsed.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
        StepError::invalid_payload("WorkflowUrl must include a host")
            .with_details(serde_json::json!({ "WorkflowUrl": workflow_url }))
    })?;
    let after_scheme = workflow_url
        .trim()
        .split_once("://")
        .map_or(workflow_url, |(_, rest)| rest);
    let authority = after_scheme
        .split(|c: char| matches!(c, '/' | '\\' | '?' | '#'))
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);
    Ok(host_port.to_string())
}

fn resolve_certificate(
    reference: &Path,
    supporting_files_dir: &Path,
    logger: &Logger,
) -> Result<PathBuf, StepError> {
    let form = PathForm::of(reference);
    logger.debug(
        &format!(
            "CA certificate {} \"{}\" provided.",
            form.describe(),
            reference.display()
        ),
        None,
    );
    let resolved = resolve_against(supporting_files_dir, reference);
    if resolved.is_file() {
        logger.debug(
            &format!("Successfully resolved file \"{}\"", resolved.display()),
            None,
        );
        return Ok(resolved);
    }

    let message = match form {
        PathForm::Absolute => format!(
            "CA certificate \"{}\" not found. Ensure the path refers to a file on disk and try \
             again.",
            reference.display()
        ),
        PathForm::Filename | PathForm::Relative => format!(
            "CA certificate \"{}\" not found. Ensure the {} is correct and that the certificate \
             was included in the Workflow definition and try again.",
            reference.display(),
            form.describe()
        ),
    };
    logger.error(&message, None);
    Err(StepError::file_not_found(message).with_details(serde_json::json!({
        "certificate_file": reference.display().to_string(),
        "resolved_path": resolved.display().to_string(),
    })))
}

/// Reads a PEM CA certificate; anything without a PEM certificate block is rejected.
pub(crate) fn load_certificate(path: &Path) -> Result<reqwest::Certificate, StepError> {
    let pem = std::fs::read(path).map_err(|err| {
        StepError::file_not_found(format!(
            "CA certificate \"{}\" could not be read: {}",
            path.display(),
            err
        ))
    })?;
    let has_certificate_block = pem
        .windows(PEM_CERTIFICATE_MARKER.len())
        .any(|window| window == PEM_CERTIFICATE_MARKER);
    if !has_certificate_block {
        let message = format!(
            "CA certificate \"{}\" is not a valid PEM certificate",
            path.display()
        );
        let hint = "Provide the CA certificate in PEM format.";
        return Err(StepError::invalid_value(message).with_hint(hint));
    }
    reqwest::Certificate::from_pem(&pem).map_err(|err| {
        StepError::invalid_value(format!(
            "CA certificate \"{}\" is not a valid PEM certificate: {}",
            path.display(),
            err
        ))
    })
}
