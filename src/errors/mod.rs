mod step_error;

pub use step_error::{StepError, StepErrorKind};
