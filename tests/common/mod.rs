#![allow(dead_code)]

use base64::Engine;
use dataflow_toolkit::managers::connection::{
    ApiClientFactory, OidcTokenAttach, OidcUnsupported, SessionConfiguration,
};
use dataflow_toolkit::managers::toolkit::{ScriptingToolkit, ToolkitSession};
use dataflow_toolkit::services::logger::Logger;
use dataflow_toolkit::{Credentials, IntegrationOptions, StepError};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::Duration;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const CERT_FILE: &str = "test_cert.crt";

pub const HTTP_URL: &str = "http://my_server_name/mi_dataflow";
pub const HTTPS_URL: &str = "https://my_server_name/mi_dataflow";
pub const HTTP_SL_URL: &str = "http://my_server_name/mi_servicelayer";
pub const HTTPS_SL_URL: &str = "https://my_server_name/mi_servicelayer";

pub const WORKFLOW_ID: &str = "67eb55ff-363a-42c7-9793-df363f1ecc83";
pub const WORKFLOW_DEFINITION_ID: &str = "Example; Version=1.0.0.0";
pub const TRANSITION_NAME: &str = "Script_83e51914-3752-40d0-8350-c096674873e2";

pub const USERNAME: &str = "username";
pub const PASSWORD: &str = "secret_password";
pub const ACCESS_TOKEN: &str = "0123456789abcdefghijkl";

pub fn basic_header() -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", USERNAME, PASSWORD));
    format!("Basic {}", encoded)
}

pub fn oidc_header() -> String {
    format!("Bearer {}", ACCESS_TOKEN)
}

pub fn payload(url: &str, credential_type: &str, header: &str) -> Value {
    serde_json::json!({
        "WorkflowId": WORKFLOW_ID,
        "WorkflowDefinitionId": WORKFLOW_DEFINITION_ID,
        "TransitionName": TRANSITION_NAME,
        "Record": {
            "Database": "MI_Training",
            "Table": "Metals Pedigree",
            "RecordHistoryGuid": "d2f51a3d-c274-4a1e-b7c9-8ba2976202cc",
        },
        "WorkflowUrl": url,
        "AuthorizationHeader": header,
        "ClientCredentialType": credential_type,
        "Attributes": {
            "Record": { "Value": ["d2f51a3d-c274-4a1e-b7c9-8ba2976202cc+MI_Training"] },
            "TransitionId": { "Value": "9f1bf6e7-0b05-4cd3-ac61-1d2d11a1d351" },
        },
        "CustomValues": {},
    })
}

pub fn windows_http() -> Value {
    payload(HTTP_URL, "Windows", "")
}

pub fn windows_https() -> Value {
    payload(HTTPS_URL, "Windows", "")
}

pub fn basic_http() -> Value {
    payload(HTTP_URL, "Basic", &basic_header())
}

pub fn basic_https() -> Value {
    payload(HTTPS_URL, "Basic", &basic_header())
}

pub fn oidc_https() -> Value {
    payload(HTTPS_URL, "None", &oidc_header())
}

pub fn oidc_http() -> Value {
    payload(HTTP_URL, "None", &oidc_header())
}

pub fn digest_http() -> Value {
    payload(HTTP_URL, "Digest", &basic_header())
}

pub fn digest_https() -> Value {
    payload(HTTPS_URL, "Digest", &basic_header())
}

/// Options with a capturing logger and an empty supporting-files directory.
pub fn options(logger: &Logger) -> IntegrationOptions {
    IntegrationOptions::default()
        .logger(logger.clone())
        .supporting_files_dir(std::env::temp_dir())
}

pub fn tmp_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

/// A supporting-files directory holding a non-PEM file named [`CERT_FILE`].
pub fn supporting_dir_with_cert() -> PathBuf {
    let dir = tmp_dir("dataflow-supporting");
    std::fs::write(dir.join(CERT_FILE), b"placeholder").expect("write cert");
    dir
}

/// A supporting-files directory holding the test CA as [`CERT_FILE`].
pub fn supporting_dir_with_ca() -> PathBuf {
    let dir = tmp_dir("dataflow-supporting");
    std::fs::copy(tls_fixture("ca.pem"), dir.join(CERT_FILE)).expect("copy ca");
    dir
}

pub fn tls_fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/tls")
        .join(name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSession {
    pub service_layer_url: String,
}

#[derive(Default)]
pub struct MockToolkit {
    pub autologon: bool,
    pub calls: Mutex<Vec<(String, Credentials)>>,
}

impl MockToolkit {
    pub fn with_autologon() -> Self {
        Self {
            autologon: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<(String, Credentials)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl ScriptingToolkit for MockToolkit {
    fn connect(
        &self,
        service_layer_url: &str,
        credentials: &Credentials,
    ) -> Result<ToolkitSession, StepError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((service_layer_url.to_string(), credentials.clone()));
        Ok(Box::new(MockSession {
            service_layer_url: service_layer_url.to_string(),
        }))
    }

    fn supports_autologon(&self) -> bool {
        self.autologon
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockAuth {
    Autologon,
    Credentials { username: String, password: String },
    Oidc {
        idp_session_configuration: SessionConfiguration,
        access_token: String,
    },
}

/// Connection factory that records how it was configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockConnection {
    pub service_layer_url: String,
    pub session_configuration: SessionConfiguration,
    pub auth: Option<MockAuth>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockClient {
    pub service_layer_url: String,
    pub auth: MockAuth,
}

impl MockConnection {
    pub fn connect(self) -> Result<MockClient, StepError> {
        let auth = self
            .auth
            .ok_or_else(|| StepError::invalid_value("no authentication configured"))?;
        Ok(MockClient {
            service_layer_url: self.service_layer_url,
            auth,
        })
    }
}

pub struct MockOidc {
    connection: MockConnection,
    idp_session_configuration: SessionConfiguration,
}

impl OidcTokenAttach for MockOidc {
    type Builder = MockConnection;

    fn with_token(mut self, access_token: &str) -> Result<MockConnection, StepError> {
        self.connection.auth = Some(MockAuth::Oidc {
            idp_session_configuration: self.idp_session_configuration,
            access_token: access_token.to_string(),
        });
        Ok(self.connection)
    }
}

impl ApiClientFactory for MockConnection {
    type Builder = MockConnection;
    type OidcBuilder = MockOidc;

    fn family() -> &'static str {
        "mock"
    }

    fn new(service_layer_url: &str, session_configuration: SessionConfiguration) -> Self {
        Self {
            service_layer_url: service_layer_url.to_string(),
            session_configuration,
            auth: None,
        }
    }

    fn with_autologon(mut self) -> Result<MockConnection, StepError> {
        self.auth = Some(MockAuth::Autologon);
        Ok(self)
    }

    fn with_credentials(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<MockConnection, StepError> {
        self.auth = Some(MockAuth::Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        Ok(self)
    }

    fn supports_oidc() -> bool {
        true
    }

    fn with_oidc(
        self,
        idp_session_configuration: SessionConfiguration,
    ) -> Result<MockOidc, StepError> {
        Ok(MockOidc {
            connection: self,
            idp_session_configuration,
        })
    }
}

/// Same protocol as [`MockConnection`] but without an OIDC flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordListsConnection(pub MockConnection);

impl ApiClientFactory for RecordListsConnection {
    type Builder = RecordListsConnection;
    type OidcBuilder = OidcUnsupported<RecordListsConnection>;

    fn family() -> &'static str {
        "record lists"
    }

    fn new(service_layer_url: &str, session_configuration: SessionConfiguration) -> Self {
        Self(MockConnection::new(service_layer_url, session_configuration))
    }

    fn with_autologon(self) -> Result<Self, StepError> {
        Ok(Self(self.0.with_autologon()?))
    }

    fn with_credentials(self, username: &str, password: &str) -> Result<Self, StepError> {
        Ok(Self(self.0.with_credentials(username, password)?))
    }
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body json")
    }
}

/// Canned reply: status plus extra headers.
pub type Reply = (u16, Vec<(&'static str, &'static str)>);

pub type ServerHandle = JoinHandle<Vec<CapturedRequest>>;

/// Serves one reply per expected request; the handle yields what was received.
pub fn spawn_callback_server(replies: Vec<Reply>) -> (String, ServerHandle) {
    let server = tiny_http::Server::http("127.0.0.1:0").expect("http server");
    let base = format!("http://{}/mi_dataflow", server.server_addr());
    (base, serve(server, replies))
}

/// HTTPS variant of [`spawn_callback_server`]. The certificate is issued for
/// `localhost` by the CA in `tests/fixtures/tls/ca.pem`.
pub fn spawn_tls_callback_server(replies: Vec<Reply>) -> (String, ServerHandle) {
    let ssl = tiny_http::SslConfig {
        certificate: std::fs::read(tls_fixture("server.pem")).expect("server certificate"),
        private_key: std::fs::read(tls_fixture("server.key")).expect("server key"),
    };
    let server = tiny_http::Server::https("127.0.0.1:0", ssl).expect("https server");
    let port = server.server_addr().to_ip().expect("ip listener").port();
    let base = format!("https://localhost:{}/mi_dataflow", port);
    (base, serve(server, replies))
}

fn serve(server: tiny_http::Server, replies: Vec<Reply>) -> ServerHandle {
    std::thread::spawn(move || {
        let mut captured = Vec::new();
        for (status, headers) in replies {
            let Ok(Some(mut request)) = server.recv_timeout(Duration::from_secs(10)) else {
                break;
            };
            captured.push(capture(&mut request));
            let mut response = tiny_http::Response::empty(status);
            for (name, value) in headers {
                let header = tiny_http::Header::from_bytes(name, value).expect("header");
                response = response.with_header(header);
            }
            request.respond(response).expect("respond");
        }
        captured
    })
}

fn capture(request: &mut tiny_http::Request) -> CapturedRequest {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    CapturedRequest {
        method: request.method().as_str().to_string(),
        path: request.url().to_string(),
        headers: request
            .headers()
            .iter()
            .map(|h| (h.field.to_string(), h.value.to_string()))
            .collect(),
        body,
    }
}
