//! The per-step integration session: parsed payload, resolved transport and
//! authentication, lazily built client sessions and the resume callback.
//!
//! A step constructs one [`DataflowIntegration`], optionally asks it for a
//! Scripting Toolkit session or a REST connection builder, runs its business
//! logic and finally calls [`DataflowIntegration::resume_bookmark`].

use crate::constants::env as env_keys;
use crate::errors::StepError;
use crate::managers::connection::{ApiClientFactory, ConnectionManager, SessionConfiguration};
use crate::managers::toolkit::{ScriptingToolkit, ToolkitManager, ToolkitSession};
use crate::services::auth::AuthenticationMode;
use crate::services::bookmark::{BookmarkClient, ExitCode, NegotiateAuth};
use crate::services::logger::{LogLevel, Logger};
use crate::services::payload::StepContext;
use crate::services::transport::{TransportPolicy, TransportRequest};
use crate::utils::feature_flags::env_flag;
use crate::utils::paths::{normalize_env_path, resolve_supporting_files_dir};
use crate::utils::stdin::PayloadSource;
use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};
use std::any::Any;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct IntegrationOptions {
    pub logging_level: Option<LogLevel>,
    /// Use HTTPS if the server offers it.
    pub use_https: bool,
    /// Ignored unless HTTPS is in use.
    pub verify_ssl: bool,
    /// Private CA certificate: an absolute path, or a filename / relative path
    /// inside the supporting-files directory.
    pub certificate_file: Option<PathBuf>,
    pub supporting_files_dir: Option<PathBuf>,
    pub logger: Option<Logger>,
}

impl Default for IntegrationOptions {
    fn default() -> Self {
        Self {
            logging_level: None,
            use_https: true,
            verify_ssl: true,
            certificate_file: None,
            supporting_files_dir: None,
            logger: None,
        }
    }
}

impl IntegrationOptions {
    /// Defaults overlaid with `DATAFLOW_*` and `LOG_LEVEL` environment variables.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(use_https) = env_flag(env_keys::USE_HTTPS) {
            options.use_https = use_https;
        }
        if let Some(verify_ssl) = env_flag(env_keys::VERIFY_SSL) {
            options.verify_ssl = verify_ssl;
        }
        options.certificate_file = normalize_env_path(std::env::var(env_keys::CA_CERTIFICATE).ok());
        options.supporting_files_dir =
            normalize_env_path(std::env::var(env_keys::SUPPORTING_FILES_DIR).ok());
        options.logging_level = std::env::var(env_keys::LOG_LEVEL)
            .ok()
            .and_then(|raw| LogLevel::parse(&raw));
        options
    }

    pub fn use_https(mut self, use_https: bool) -> Self {
        self.use_https = use_https;
        self
    }

    pub fn verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }

    pub fn certificate_file(mut self, certificate_file: impl Into<PathBuf>) -> Self {
        self.certificate_file = Some(certificate_file.into());
        self
    }

    pub fn supporting_files_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.supporting_files_dir = Some(dir.into());
        self
    }

    pub fn logging_level(mut self, level: LogLevel) -> Self {
        self.logging_level = Some(level);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }
}

pub struct DataflowIntegration {
    logger: Logger,
    context: StepContext,
    policy: TransportPolicy,
    mode: AuthenticationMode,
    supporting_files_dir: PathBuf,
    toolkit: Option<Arc<dyn ScriptingToolkit>>,
    negotiate: Option<Arc<dyn NegotiateAuth>>,
    mi_session: OnceCell<ToolkitSession>,
    rest_connection: OnceCell<Box<dyn Any>>,
}

impl DataflowIntegration {
    pub fn from_stdin(options: IntegrationOptions) -> Result<Self, StepError> {
        Self::new(PayloadSource::stdin(), options)
    }

    pub fn from_reader<R: Read>(reader: R, options: IntegrationOptions) -> Result<Self, StepError> {
        Self::new(PayloadSource::Reader(Box::new(reader)), options)
    }

    pub fn from_str_payload(payload: &str, options: IntegrationOptions) -> Result<Self, StepError> {
        Self::new(PayloadSource::Text(payload), options)
    }

    /// Builds from an already-parsed payload, e.g. one captured from a real run.
    pub fn from_dict_payload(
        payload: Value,
        options: IntegrationOptions,
    ) -> Result<Self, StepError> {
        match payload {
            Value::Object(map) => Self::new(PayloadSource::Map(map), options),
            _ => Err(StepError::invalid_payload("Data Flow payload must be a JSON object")),
        }
    }

    pub fn new(source: PayloadSource<'_>, options: IntegrationOptions) -> Result<Self, StepError> {
        let mut logger = options
            .logger
            .clone()
            .unwrap_or_else(|| Logger::new("MIDataFlowIntegration"));
        if let Some(level) = options.logging_level {
            logger.set_level(level);
        }

        logger.debug("", None);
        logger.debug("---------- NEW RUN ----------", None);

        let context = StepContext::parse(source, &logger)?;
        let supporting_files_dir = options
            .supporting_files_dir
            .clone()
            .unwrap_or_else(resolve_supporting_files_dir);

        let policy = TransportPolicy::resolve(
            context.workflow_url(),
            TransportRequest {
                use_https: options.use_https,
                verify_ssl: options.verify_ssl,
                certificate_file: options.certificate_file.as_deref(),
                supporting_files_dir: &supporting_files_dir,
            },
            &logger,
        )?;

        let mode = AuthenticationMode::classify(context.client_credential_type());
        if mode == AuthenticationMode::Oidc && !policy.https_enabled() {
            return Err(StepError::invalid_value(
                "OIDC authentication requires HTTPS. Enable HTTPS on the Granta MI server and \
                 do not set \"use_https\" to false.",
            )
            .with_details(serde_json::json!({
                "use_https": options.use_https,
                "WorkflowUrl": context.workflow_url(),
            })));
        }

        Ok(Self {
            logger,
            context,
            policy,
            mode,
            supporting_files_dir,
            toolkit: None,
            negotiate: None,
            mi_session: OnceCell::new(),
            rest_connection: OnceCell::new(),
        })
    }

    pub fn with_scripting_toolkit(mut self, toolkit: Arc<dyn ScriptingToolkit>) -> Self {
        self.toolkit = Some(toolkit);
        self
    }

    pub fn with_negotiate_auth(mut self, negotiate: Arc<dyn NegotiateAuth>) -> Self {
        self.negotiate = Some(negotiate);
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn context(&self) -> &StepContext {
        &self.context
    }

    /// The received payload, untouched.
    pub fn df_data(&self) -> &Map<String, Value> {
        self.context.raw()
    }

    pub fn transport_policy(&self) -> &TransportPolicy {
        &self.policy
    }

    pub fn authentication_mode(&self) -> &AuthenticationMode {
        &self.mode
    }

    pub fn supporting_files_dir(&self) -> &Path {
        &self.supporting_files_dir
    }

    pub fn service_layer_url(&self) -> String {
        self.policy.service_layer_url()
    }

    pub fn dataflow_url(&self) -> String {
        self.policy.dataflow_url()
    }

    /// Scripting Toolkit session, connected on first access and reused afterwards.
    pub fn mi_session(&self) -> Result<&(dyn Any + Send), StepError> {
        let session = self.mi_session.get_or_try_init(|| {
            ToolkitManager::new(&self.logger, self.toolkit.as_deref()).start_session(
                &self.service_layer_url(),
                &self.mode,
                self.context.authorization_header(),
            )
        })?;
        Ok(session.as_ref())
    }

    pub fn mi_session_as<T: Any>(&self) -> Result<&T, StepError> {
        self.mi_session()?.downcast_ref::<T>().ok_or_else(|| {
            StepError::internal(format!(
                "Scripting Toolkit session is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Connection builder for a REST API package, with Data Flow credentials
    /// attached. The caller finalizes it (e.g. `connect()`).
    ///
    /// Only the certificate-verification fields of `session_configuration` are
    /// replaced. The first configured builder is cached; later calls return a
    /// clone of it.
    pub fn configure_rest_connection<F>(
        &self,
        session_configuration: Option<SessionConfiguration>,
    ) -> Result<F::Builder, StepError>
    where
        F: ApiClientFactory,
        F::Builder: Clone + 'static,
    {
        let cached = self.rest_connection.get_or_try_init(|| {
            ConnectionManager::new(&self.logger)
                .configure::<F>(
                    &self.service_layer_url(),
                    &self.policy,
                    &self.mode,
                    self.context.authorization_header(),
                    session_configuration,
                )
                .map(|builder| Box::new(builder) as Box<dyn Any>)
        })?;
        cached.downcast_ref::<F::Builder>().cloned().ok_or_else(|| {
            StepError::invalid_value(format!(
                "A REST connection was already configured with a different factory than {}",
                F::family()
            ))
        })
    }

    /// Tells Data Flow the step has finished. May be called more than once.
    pub fn resume_bookmark(&self, exit_code: impl Into<ExitCode>) -> Result<(), StepError> {
        BookmarkClient::new(&self.logger, self.negotiate.clone()).resume(
            &self.context,
            &self.policy,
            &self.mode,
            &exit_code.into(),
        )
    }
}
