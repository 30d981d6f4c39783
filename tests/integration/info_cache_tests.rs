//! Info caching tests against a mocked EDS API
//!
//! Info is cached in the session store together with its fetch time; entries
//! older than the configured TTL are refetched.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{fixture, mock_config, mount_action, mount_auth, mount_session, new_store, xml_response};
use eds_client_rs::eds::Info;
use eds_client_rs::eds::models::LimiterSelection;
use eds_client_rs::eds::query::AppliedFilters;
use eds_client_rs::session::keys;
use eds_client_rs::{CallerContext, ClientConfig, EdsClient, MemorySessionStore, SessionStore};
use tracing_test::traced_test;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer};

fn client_with(config: ClientConfig, store: Arc<MemorySessionStore>) -> EdsClient {
    EdsClient::new(config, store, &CallerContext::anonymous()).expect("client should build")
}

async fn mount_tokens(mock_server: &MockServer) {
    mount_auth(mock_server, 1).await;
    mount_session(mock_server, 1).await;
}

#[tokio::test]
#[traced_test]
async fn test_info_is_cached_within_ttl() {
    let mock_server = MockServer::start().await;
    mount_tokens(&mock_server).await;
    mount_action(&mock_server, "Info", "info.xml", 1).await;

    let store = new_store();
    let client = client_with(mock_config(&mock_server), store.clone());

    let first = client.info().await.expect("info");
    let second = client.info().await.expect("cached info");
    assert_eq!(first, second);
    assert_eq!(first.sorts.len(), 3);
    assert_eq!(first.search_fields[1].code, "AU");
    assert!(store.get(keys::INFO).is_some());
}

#[tokio::test]
async fn test_info_without_ttl_never_expires() {
    let mock_server = MockServer::start().await;
    mount_tokens(&mock_server).await;
    mount_action(&mock_server, "Info", "info.xml", 0).await;

    let store = new_store();
    store.set(
        keys::INFO,
        serde_json::json!({ "cached_at": 0, "info": Info::default() }).to_string(),
    );
    let config = mock_config(&mock_server).with_info_ttl(None);
    let info = client_with(config, store).info().await.unwrap();
    assert_eq!(info, Info::default());
}

#[tokio::test]
async fn test_stale_info_is_refetched() {
    let mock_server = MockServer::start().await;
    mount_tokens(&mock_server).await;
    mount_action(&mock_server, "Info", "info.xml", 1).await;

    let store = new_store();
    store.set(
        keys::INFO,
        serde_json::json!({ "cached_at": 0, "info": Info::default() }).to_string(),
    );
    let config = mock_config(&mock_server).with_info_ttl(Some(Duration::from_secs(3600)));
    let info = client_with(config, store).info().await.unwrap();
    assert_eq!(info.expanders.len(), 2);
}

#[tokio::test]
async fn test_zero_ttl_always_refetches() {
    let mock_server = MockServer::start().await;
    mount_tokens(&mock_server).await;
    mount_action(&mock_server, "Info", "info.xml", 2).await;

    let config = mock_config(&mock_server).with_info_ttl(Some(Duration::ZERO));
    let client = client_with(config, new_store());
    client.info().await.unwrap();
    client.info().await.unwrap();
}

#[tokio::test]
async fn test_invalidate_info_forces_refetch() {
    let mock_server = MockServer::start().await;
    mount_tokens(&mock_server).await;
    mount_action(&mock_server, "Info", "info.xml", 2).await;

    let store = new_store();
    let client = client_with(mock_config(&mock_server), store.clone());
    client.info().await.unwrap();
    client.invalidate_info();
    assert!(store.get(keys::INFO).is_none());
    client.info().await.unwrap();
}

#[tokio::test]
async fn test_failed_info_is_not_cached() {
    let mock_server = MockServer::start().await;
    mount_tokens(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/Info"))
        .respond_with(xml_response(500, "unavailable"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = new_store();
    let client = client_with(mock_config(&mock_server), store.clone());
    assert!(client.info().await.is_err());
    assert!(store.get(keys::INFO).is_none());
}

#[tokio::test]
async fn test_applied_filters_against_info() {
    let mock_server = MockServer::start().await;
    mount_tokens(&mock_server).await;
    mount_action(&mock_server, "Info", "info.xml", 1).await;

    let client = client_with(mock_config(&mock_server), new_store());
    let mut info = client.info().await.unwrap();

    let actions = [
        "addlimiter(FT:y)",
        "addlimiter(DT1:2015-01/2020-12)",
        "addlimiter(LA99:Spanish)",
        "addexpander(thesaurus)",
    ];
    let applied = AppliedFilters::new(&actions, Some(&info));
    let described: Vec<(&str, &str)> = applied
        .iter()
        .map(|f| (f.display_field.as_str(), f.display_value.as_str()))
        .collect();
    assert_eq!(
        described,
        vec![
            ("Full Text", "yes"),
            ("Published Date", "2015-01/2020-12"),
            ("Language", "Spanish"),
            ("thesaurus", "yes"),
        ]
    );

    applied.mark_limiters(&mut info.limiters);
    applied.mark_expanders(&mut info.expanders);

    assert_eq!(info.limiters[0].selected, LimiterSelection::Toggle);
    assert_eq!(
        info.limiters[1].selected,
        LimiterSelection::Range("addlimiter(DT1:2015-01/2020-12)".to_string())
    );
    assert_eq!(
        info.limiters[2].selected,
        LimiterSelection::Values(vec!["addlimiter(LA99:Spanish)".to_string()])
    );
    assert!(!info.limiters[2].values[0].selected);
    assert!(info.limiters[2].values[1].selected);
    assert!(!info.expanders[0].selected);
    assert!(info.expanders[1].selected);
}

#[tokio::test]
async fn test_info_request_carries_tokens() {
    let mock_server = MockServer::start().await;
    mount_tokens(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/Info"))
        .and(header("x-sessionToken", "SESSION-TOKEN-1"))
        .respond_with(xml_response(200, fixture("info.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_with(mock_config(&mock_server), new_store());
    let info = client.info().await.unwrap();
    assert!(info.related_content_default_on("rs"));
    assert!(!info.image_quick_view_default_on());
}
