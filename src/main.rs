//! `dataflow-step`: a pass-through step that logs the record and resumes the workflow.
//!
//! No [`dataflow_toolkit::NegotiateAuth`] is registered here. A Windows-authenticated
//! workflow whose server answers the resume with a `Negotiate` challenge therefore fails
//! with a transport error. Steps that need integrated authentication link the library
//! and call [`DataflowIntegration::with_negotiate_auth`].

use dataflow_toolkit::{run_step, DataflowIntegration, IntegrationOptions, StepError};

fn main() {
    let integration = match DataflowIntegration::from_stdin(IntegrationOptions::from_env()) {
        Ok(integration) => integration,
        Err(err) => {
            eprintln!("dataflow-step: {}", err);
            std::process::exit(1);
        }
    };

    let outcome = run_step(&integration, |df| {
        let logger = df.logger().child("step");
        match df.context().record() {
            Some(record) => logger.info(
                &format!(
                    "Step \"{}\" reached record {} in {} / {}",
                    df.context().transition_name(),
                    record.record_history_guid,
                    record.database,
                    record.table
                ),
                None,
            ),
            None => logger.info("Step payload carries no record reference", None),
        }
        logger.debug("Payload", Some(&df.context().redacted_payload()));
        Ok::<(), StepError>(())
    });

    if let Err(err) = outcome {
        eprintln!("dataflow-step: {}", err);
        std::process::exit(1);
    }
}
