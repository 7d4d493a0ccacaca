//! Glue between an MI Data Flow workflow step and the Granta MI APIs.
//!
//! Data Flow starts a step by writing a JSON payload to the process's stdin
//! and waits until the step POSTs back to resume its bookmark. This crate
//! parses that payload, works out the transport and credentials to use, and
//! hands out authenticated Scripting Toolkit sessions or REST connection
//! builders on demand.

pub mod constants;
pub mod errors;
pub mod integration;
pub mod managers;
pub mod services;
pub mod step;
pub mod utils;

pub use errors::{StepError, StepErrorKind};
pub use integration::{DataflowIntegration, IntegrationOptions};
pub use services::auth::{AuthenticationMode, Credentials};
pub use services::bookmark::{ExitCode, NegotiateAuth};
pub use step::run_step;
