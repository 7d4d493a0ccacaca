pub mod payload {
    pub const WORKFLOW_ID: &str = "WorkflowId";
    pub const WORKFLOW_DEFINITION_ID: &str = "WorkflowDefinitionId";
    pub const TRANSITION_NAME: &str = "TransitionName";
    pub const WORKFLOW_URL: &str = "WorkflowUrl";
    pub const AUTHORIZATION_HEADER: &str = "AuthorizationHeader";
    pub const CLIENT_CREDENTIAL_TYPE: &str = "ClientCredentialType";
    pub const RECORD: &str = "Record";
    pub const ATTRIBUTES: &str = "Attributes";
    pub const CUSTOM_VALUES: &str = "CustomValues";

    pub const REQUIRED_KEYS: &[&str] = &[
        WORKFLOW_ID,
        WORKFLOW_DEFINITION_ID,
        TRANSITION_NAME,
        WORKFLOW_URL,
        AUTHORIZATION_HEADER,
        CLIENT_CREDENTIAL_TYPE,
    ];
}

pub mod credentials {
    pub const WINDOWS: &str = "Windows";
    pub const BASIC: &str = "Basic";
    pub const OIDC: &str = "None";
    pub const BASIC_PREFIX_LEN: usize = "Basic ".len();
    pub const BEARER_PREFIX_LEN: usize = "Bearer ".len();
}

pub mod urls {
    pub const SERVICE_LAYER_PATH: &str = "/mi_servicelayer";
    pub const WORKFLOWS_API_PATH: &str = "api/workflows";
}

pub mod session {
    pub const MAX_REDIRECTS: u32 = 10;
    pub const RETRY_COUNT: u32 = 3;
    pub const REQUEST_TIMEOUT_SECS: u64 = 31;
}

pub mod env {
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const USE_HTTPS: &str = "DATAFLOW_USE_HTTPS";
    pub const VERIFY_SSL: &str = "DATAFLOW_VERIFY_SSL";
    pub const CA_CERTIFICATE: &str = "DATAFLOW_CA_CERTIFICATE";
    pub const SUPPORTING_FILES_DIR: &str = "DATAFLOW_SUPPORTING_FILES_DIR";
}

pub mod exit_codes {
    pub const SUCCESS: i64 = 0;
    pub const FAILURE: i64 = 1;
}
