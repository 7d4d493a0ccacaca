use crate::constants::exit_codes;
use crate::errors::StepError;
use crate::integration::DataflowIntegration;
use crate::services::bookmark::ExitCode;
use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Runs `logic`, then always resumes the bookmark: exit code 0 on success, 1 on
/// error or panic. Returns the reported exit code, or the resume failure.
pub fn run_step<F, E>(integration: &DataflowIntegration, logic: F) -> Result<ExitCode, StepError>
where
    F: FnOnce(&DataflowIntegration) -> Result<(), E>,
    E: Display,
{
    let logger = integration.logger().child("step");
    let code = match catch_unwind(AssertUnwindSafe(|| logic(integration))) {
        Ok(Ok(())) => exit_codes::SUCCESS,
        Ok(Err(err)) => {
            logger.error(&format!("Business logic failed: {}", err), None);
            exit_codes::FAILURE
        }
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            logger.error(&format!("Business logic panicked: {}", message), None);
            exit_codes::FAILURE
        }
    };
    let exit_code = ExitCode::from(code);
    integration.resume_bookmark(exit_code.clone())?;
    Ok(exit_code)
}
