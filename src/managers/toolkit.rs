//! Legacy MI Scripting Toolkit sessions built from Data Flow credentials.

use crate::errors::StepError;
use crate::services::auth::{AuthenticationMode, Credentials};
use crate::services::logger::Logger;
use std::any::Any;

/// Opaque session handle returned by the toolkit.
pub type ToolkitSession = Box<dyn Any + Send>;

/// The toolkit's connect entry point.
pub trait ScriptingToolkit: Send + Sync {
    fn connect(
        &self,
        service_layer_url: &str,
        credentials: &Credentials,
    ) -> Result<ToolkitSession, StepError>;

    /// Autologon relies on the Windows security context of the step process.
    fn supports_autologon(&self) -> bool {
        cfg!(windows)
    }
}

pub struct ToolkitManager<'a> {
    logger: Logger,
    toolkit: Option<&'a dyn ScriptingToolkit>,
}

impl<'a> ToolkitManager<'a> {
    pub fn new(logger: &Logger, toolkit: Option<&'a dyn ScriptingToolkit>) -> Self {
        Self {
            logger: logger.child("toolkit"),
            toolkit,
        }
    }

    pub fn start_session(
        &self,
        service_layer_url: &str,
        mode: &AuthenticationMode,
        authorization_header: &str,
    ) -> Result<ToolkitSession, StepError> {
        self.logger
            .debug("Creating MI Scripting Toolkit session.", None);
        mode.ensure_supported()?;

        let toolkit = self.toolkit.ok_or_else(|| {
            StepError::missing_client_module(
                "Could not find Scripting Toolkit. Ensure Scripting Toolkit is installed and try \
                 again.",
            )
            .with_hint("Register a toolkit with DataflowIntegration::with_scripting_toolkit.")
        })?;

        self.logger
            .debug(&format!("Using {} authentication.", mode.label()), None);
        let credentials = mode.credentials(authorization_header)?;
        if credentials == Credentials::Autologon && !toolkit.supports_autologon() {
            let message = format!(
                "Windows authentication with Scripting Toolkit is not available on {}",
                std::env::consts::OS
            );
            let hint = "Run the step on the Windows Data Flow server, or use Basic or OIDC \
                authentication.";
            return Err(StepError::unsupported_platform(message).with_hint(hint));
        }

        toolkit.connect(service_layer_url, &credentials)
    }
}
