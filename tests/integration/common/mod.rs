//! Common test utilities for the mocked EDS integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eds_client_rs::{CallerContext, ClientConfig, EdsClient, MemorySessionStore, SessionStore};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Directory holding the EDS XML fixtures
pub fn fixture_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/integration/test_data/eds_xml")
}

/// Read a fixture or panic with a descriptive message
pub fn fixture(name: &str) -> String {
    let file = fixture_dir().join(name);
    fs::read_to_string(&file).unwrap_or_else(|_| panic!("Failed to read fixture: {:?}", file))
}

/// All fixture files, sorted by name
pub fn fixture_files() -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(fixture_dir())
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("xml"))
                .collect()
        })
        .unwrap_or_default();
    files.sort();
    files
}

/// XML response with the given status
pub fn xml_response(status: u16, body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(status)
        .set_body_string(body.into())
        .insert_header("content-type", "text/xml")
}

/// Configuration pointing both endpoints at the mock server
pub fn mock_config(mock_server: &MockServer) -> ClientConfig {
    ClientConfig::new()
        .with_credentials("apiuser", "apipass")
        .with_profile("edsapi")
        .with_organization("ACME University")
        .with_base_url(mock_server.uri())
        .with_auth_url(mock_server.uri())
}

/// Client for `caller` sharing `store`
pub fn create_mock_client(
    mock_server: &MockServer,
    store: Arc<dyn SessionStore>,
    caller: &CallerContext,
) -> EdsClient {
    EdsClient::new(mock_config(mock_server), store, caller).expect("client should build")
}

pub fn new_store() -> Arc<MemorySessionStore> {
    Arc::new(MemorySessionStore::new())
}

/// Mount the authentication endpoint, expecting `times` calls
pub async fn mount_auth(mock_server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/uidauth"))
        .respond_with(xml_response(200, fixture("auth.xml")))
        .expect(times)
        .mount(mock_server)
        .await;
}

/// Mount the session endpoint, expecting `times` calls
pub async fn mount_session(mock_server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path("/CreateSession"))
        .respond_with(xml_response(200, fixture("session.xml")))
        .expect(times)
        .mount(mock_server)
        .await;
}

/// Mount `action` answering with a fixture, expecting `times` calls
pub async fn mount_action(mock_server: &MockServer, action: &str, fixture_name: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", action)))
        .respond_with(xml_response(200, fixture(fixture_name)))
        .expect(times)
        .mount(mock_server)
        .await;
}

/// Real API tests need the integration-tests feature and EDS_REAL_API_TESTS
pub fn should_run_real_api_tests() -> bool {
    #[cfg(not(feature = "integration-tests"))]
    {
        false
    }

    #[cfg(feature = "integration-tests")]
    {
        std::env::var("EDS_REAL_API_TESTS").is_ok()
    }
}

/// Client for the live EDS API, credentials taken from the environment
#[cfg(feature = "integration-tests")]
pub fn create_real_client() -> Option<EdsClient> {
    let user_id = std::env::var("EDS_USER_ID").ok()?;
    let password = std::env::var("EDS_PASSWORD").ok()?;
    let profile = std::env::var("EDS_PROFILE").unwrap_or_else(|_| "edsapi".to_string());

    let config = ClientConfig::new()
        .with_credentials(user_id, password)
        .with_profile(profile)
        .with_user_agent("eds-client-rs-integration-tests");
    EdsClient::new(config, new_store(), &CallerContext::authenticated()).ok()
}
