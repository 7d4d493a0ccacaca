//! REST API connection builders configured from Data Flow credentials.

use crate::constants::session as defaults;
use crate::errors::StepError;
use crate::services::auth::{AuthenticationMode, Credentials};
use crate::services::logger::Logger;
use crate::services::transport::{load_certificate, TransportPolicy};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

/// HTTP session settings handed to a connection factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfiguration {
    pub cert_store_path: Option<PathBuf>,
    pub verify_ssl: bool,
    pub headers: BTreeMap<String, String>,
    /// Scheme (`http` / `https`) to proxy URL.
    pub proxies: BTreeMap<String, String>,
    pub max_redirects: u32,
    pub retry_count: u32,
    pub request_timeout: Duration,
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            cert_store_path: None,
            verify_ssl: true,
            headers: BTreeMap::new(),
            proxies: BTreeMap::new(),
            max_redirects: defaults::MAX_REDIRECTS,
            retry_count: defaults::RETRY_COUNT,
            request_timeout: Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS),
        }
    }
}

impl SessionConfiguration {
    /// Replaces only the certificate-verification fields with the step's policy.
    pub fn with_transport_policy(mut self, policy: &TransportPolicy) -> Self {
        self.verify_ssl = policy.verify_ssl();
        self.cert_store_path = policy.ca_path().map(|p| p.to_path_buf());
        self
    }

    pub fn http_client(&self) -> Result<reqwest::blocking::Client, StepError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(self.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(self.max_redirects as usize));

        if !self.headers.is_empty() {
            let mut headers = HeaderMap::new();
            for (name, value) in &self.headers {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                    StepError::invalid_value(format!("Invalid header name \"{}\"", name))
                })?;
                let value = HeaderValue::from_str(value).map_err(|_| {
                    StepError::invalid_value(format!(
                        "Invalid value for header \"{}\"",
                        name.as_str()
                    ))
                })?;
                headers.insert(name, value);
            }
            builder = builder.default_headers(headers);
        }

        for (scheme, target) in &self.proxies {
            let proxy = match scheme.as_str() {
                "http" => reqwest::Proxy::http(target),
                "https" => reqwest::Proxy::https(target),
                _ => reqwest::Proxy::all(target),
            }
            .map_err(|err| {
                StepError::invalid_value(format!("Invalid proxy \"{}\": {}", target, err))
            })?;
            builder = builder.proxy(proxy);
        }

        if !self.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(path) = &self.cert_store_path {
            builder = builder.add_root_certificate(load_certificate(path)?);
        }

        Ok(builder.build()?)
    }
}

/// Second half of the OIDC flow: attach the bearer token.
pub trait OidcTokenAttach {
    type Builder;

    fn with_token(self, access_token: &str) -> Result<Self::Builder, StepError>;
}

/// `OidcBuilder` for factories that have no OIDC flow.
pub struct OidcUnsupported<B>(PhantomData<B>);

impl<B> OidcTokenAttach for OidcUnsupported<B> {
    type Builder = B;

    fn with_token(self, _access_token: &str) -> Result<B, StepError> {
        Err(StepError::not_implemented(
            "OIDC authentication is not supported by this connection factory",
        ))
    }
}

/// A family of REST API client factories sharing one builder protocol.
pub trait ApiClientFactory: Sized {
    type Builder;
    type OidcBuilder: OidcTokenAttach<Builder = Self::Builder>;

    /// Name used in diagnostics.
    fn family() -> &'static str;

    fn new(service_layer_url: &str, session_configuration: SessionConfiguration) -> Self;

    fn with_autologon(self) -> Result<Self::Builder, StepError>;

    fn with_credentials(self, username: &str, password: &str) -> Result<Self::Builder, StepError>;

    fn supports_oidc() -> bool {
        false
    }

    fn with_oidc(
        self,
        _idp_session_configuration: SessionConfiguration,
    ) -> Result<Self::OidcBuilder, StepError> {
        Err(oidc_not_supported(Self::family()))
    }
}

fn oidc_not_supported(family: &str) -> StepError {
    StepError::not_implemented(format!(
        "OIDC authentication is not supported with {} connections",
        family
    ))
}

pub struct ConnectionManager {
    logger: Logger,
}

impl ConnectionManager {
    pub fn new(logger: &Logger) -> Self {
        Self {
            logger: logger.child("connection"),
        }
    }

    pub fn configure<F: ApiClientFactory>(
        &self,
        service_layer_url: &str,
        policy: &TransportPolicy,
        mode: &AuthenticationMode,
        authorization_header: &str,
        session_configuration: Option<SessionConfiguration>,
    ) -> Result<F::Builder, StepError> {
        self.logger.debug("Creating REST API client.", None);
        mode.ensure_supported()?;
        if *mode == AuthenticationMode::Oidc && !F::supports_oidc() {
            return Err(oidc_not_supported(F::family()));
        }

        let config = session_configuration
            .unwrap_or_default()
            .with_transport_policy(policy);
        let builder = F::new(service_layer_url, config.clone());

        self.logger
            .debug(&format!("Using {} authentication.", mode.label()), None);
        match mode.credentials(authorization_header)? {
            Credentials::Autologon => builder.with_autologon(),
            Credentials::UsernamePassword { username, password } => {
                builder.with_credentials(&username, &password)
            }
            Credentials::OidcToken(token) => builder.with_oidc(config)?.with_token(&token),
        }
    }
}
