//! Token lifecycle tests against a mocked EDS API
//!
//! These tests count authentication, session and search calls to verify token
//! reuse, the bounded refresh loop and guest-state session invalidation.

mod common;

use common::{
    create_mock_client, fixture, mock_config, mount_action, mount_auth, mount_session, new_store,
    xml_response,
};
use eds_client_rs::config::GuestState;
use eds_client_rs::eds::Action;
use eds_client_rs::eds::query::QueryPlan;
use eds_client_rs::session::keys;
use eds_client_rs::{
    CallerContext, EdsClient, ErrorCode, SearchRequest, SessionStore, TokenCache,
};
use tracing_test::traced_test;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer};

fn ocean() -> SearchRequest {
    SearchRequest::new().lookfor("ocean", "AllFields")
}

#[tokio::test]
#[traced_test]
async fn test_warm_cache_reuses_tokens() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 1).await;
    mount_session(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/Search"))
        .and(header("x-authenticationToken", "AUTH-TOKEN-1"))
        .and(header("x-sessionToken", "SESSION-TOKEN-1"))
        .respond_with(xml_response(200, fixture("search.xml")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let store = new_store();
    let client = create_mock_client(&mock_server, store.clone(), &CallerContext::anonymous());

    let first = client.search(&ocean()).await.expect("first search");
    let second = client.search(&ocean()).await.expect("second search");
    assert_eq!(first.record_count, 1342);
    assert_eq!(second.record_count, 1342);

    assert_eq!(store.get(keys::AUTH_TOKEN), Some("AUTH-TOKEN-1".to_string()));
    assert_eq!(store.get(keys::SESSION_TOKEN), Some("SESSION-TOKEN-1".to_string()));
    assert_eq!(store.get(keys::GUEST), Some("y".to_string()));
    assert!(store.get(keys::AUTH_EXPIRY).is_some());
}

#[tokio::test]
#[traced_test]
async fn test_clients_sharing_a_store_share_tokens() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 1).await;
    mount_session(&mock_server, 1).await;
    mount_action(&mock_server, "Search", "search.xml", 2).await;

    let store = new_store();
    let caller = CallerContext::anonymous();
    create_mock_client(&mock_server, store.clone(), &caller)
        .search(&ocean())
        .await
        .unwrap();
    create_mock_client(&mock_server, store.clone(), &caller)
        .search(&ocean())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_auth_request_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/uidauth"))
        .and(body_string_contains("<UserId>apiuser</UserId>"))
        .and(body_string_contains("<Password>apipass</Password>"))
        .and(body_string_contains("<InterfaceId>wsapi</InterfaceId>"))
        .and(body_string_contains("<Option>autocomplete</Option>"))
        .respond_with(xml_response(200, fixture("auth.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = mock_config(&mock_server).with_autocomplete(true);
    let client = EdsClient::new(config, new_store(), &CallerContext::anonymous()).unwrap();
    let auth = client.authenticate().await.expect("authentication");
    assert_eq!(auth.token, "AUTH-TOKEN-1");
    assert_eq!(auth.timeout, 1800);
}

#[tokio::test]
async fn test_session_request_carries_profile_org_and_guest() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/CreateSession"))
        .and(query_param("profile", "edsapi"))
        .and(query_param("org", "ACME University"))
        .and(query_param("guest", "n"))
        .and(header("x-authenticationToken", "AUTH-TOKEN-1"))
        .respond_with(xml_response(200, fixture("session.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server, new_store(), &CallerContext::authenticated());
    let session = client.create_session("AUTH-TOKEN-1").await.unwrap();
    assert_eq!(session, "SESSION-TOKEN-1");
}

#[tokio::test]
#[traced_test]
async fn test_session_token_invalid_is_retried_a_bounded_number_of_times() {
    let mock_server = MockServer::start().await;
    // One initial acquisition plus one full refresh per retry
    mount_auth(&mock_server, 6).await;
    mount_session(&mock_server, 6).await;

    Mock::given(method("GET"))
        .and(path("/Search"))
        .respond_with(xml_response(400, fixture("error_109.xml")))
        .expect(6)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server, new_store(), &CallerContext::anonymous());
    let err = client.search(&ocean()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::SessionTokenInvalid));
}

#[tokio::test]
#[traced_test]
async fn test_auth_token_invalid_refreshes_only_auth() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 6).await;
    mount_session(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/Search"))
        .respond_with(xml_response(400, fixture("error_104.xml")))
        .expect(6)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server, new_store(), &CallerContext::anonymous());
    let err = client.search(&ocean()).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::AuthTokenInvalid));
}

#[tokio::test]
async fn test_request_with_zero_attempts_calls_once() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 1).await;
    mount_session(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/Search"))
        .respond_with(xml_response(400, fixture("error_109.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server, new_store(), &CallerContext::anonymous());
    let plan = QueryPlan::new().with("query-1", "AND,ocean");
    let err = client.request(Action::Search, &plan, 0).await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_retry_recovers_after_one_session_refresh() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 2).await;
    mount_session(&mock_server, 2).await;

    Mock::given(method("GET"))
        .and(path("/Search"))
        .respond_with(xml_response(400, fixture("error_109.xml")))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_action(&mock_server, "Search", "search.xml", 1).await;

    let client = create_mock_client(&mock_server, new_store(), &CallerContext::anonymous());
    let results = client.search(&ocean()).await.expect("search after refresh");
    assert_eq!(results.records.len(), 2);
    assert!(!results.is_error());
}

#[tokio::test]
#[traced_test]
async fn test_guest_change_recreates_only_the_session() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 1).await;

    Mock::given(method("GET"))
        .and(path("/CreateSession"))
        .and(query_param("guest", "y"))
        .respond_with(xml_response(200, fixture("session.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/CreateSession"))
        .and(query_param("guest", "n"))
        .respond_with(xml_response(
            200,
            "<CreateSessionResponseMessage><SessionToken>SESSION-TOKEN-2</SessionToken></CreateSessionResponseMessage>",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_action(&mock_server, "Search", "search.xml", 3).await;

    let store = new_store();
    let guest = create_mock_client(&mock_server, store.clone(), &CallerContext::anonymous());
    guest.search(&ocean()).await.unwrap();
    guest.search(&ocean()).await.unwrap();

    let member = create_mock_client(&mock_server, store.clone(), &CallerContext::authenticated());
    member.search(&ocean()).await.unwrap();

    assert_eq!(store.get(keys::SESSION_TOKEN), Some("SESSION-TOKEN-2".to_string()));
    assert_eq!(store.get(keys::GUEST), Some("n".to_string()));
}

#[tokio::test]
async fn test_missing_guest_flag_counts_as_a_change() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 0).await;
    mount_session(&mock_server, 1).await;
    mount_action(&mock_server, "Search", "search.xml", 1).await;

    let store = new_store();
    store.set(keys::AUTH_TOKEN, "AUTH-TOKEN-1".into());
    store.set(keys::SESSION_TOKEN, "SESSION-OLD".into());

    let client = create_mock_client(&mock_server, store.clone(), &CallerContext::anonymous());
    client.search(&ocean()).await.unwrap();
    assert_eq!(store.get(keys::SESSION_TOKEN), Some("SESSION-TOKEN-1".to_string()));
}

#[tokio::test]
#[traced_test]
async fn test_failed_guest_refresh_keeps_the_cached_session() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 0).await;

    Mock::given(method("GET"))
        .and(path("/CreateSession"))
        .respond_with(xml_response(500, "boom"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Search"))
        .and(header("x-sessionToken", "SESSION-OLD"))
        .respond_with(xml_response(200, fixture("search.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = new_store();
    let tokens = TokenCache::new(store.clone());
    tokens.set_auth_token("AUTH-TOKEN-1", 1800);
    tokens.set_session_token("SESSION-OLD", GuestState::Guest);

    let member = create_mock_client(&mock_server, store.clone(), &CallerContext::authenticated());
    let results = member.search(&ocean()).await.expect("search with stale session");
    assert_eq!(results.record_count, 1342);
    assert_eq!(store.get(keys::GUEST), Some("y".to_string()));
}

#[tokio::test]
async fn test_expired_auth_token_is_reacquired_with_a_session() {
    let mock_server = MockServer::start().await;
    mount_auth(&mock_server, 1).await;
    mount_session(&mock_server, 1).await;
    mount_action(&mock_server, "Search", "search.xml", 1).await;

    let store = new_store();
    let tokens = TokenCache::new(store.clone());
    tokens.set_auth_token("AUTH-OLD", 1800);
    tokens.set_session_token("SESSION-OLD", GuestState::Guest);
    store.set(keys::AUTH_EXPIRY, "1".into());

    let client = create_mock_client(&mock_server, store.clone(), &CallerContext::anonymous());
    client.search(&ocean()).await.unwrap();
    assert_eq!(store.get(keys::AUTH_TOKEN), Some("AUTH-TOKEN-1".to_string()));
    assert_eq!(store.get(keys::SESSION_TOKEN), Some("SESSION-TOKEN-1".to_string()));
}

#[tokio::test]
async fn test_failed_authentication_aborts_before_the_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/uidauth"))
        .respond_with(xml_response(
            400,
            "<ErrorResponse><ErrorCode>1102</ErrorCode><Reason>Invalid Credentials.</Reason></ErrorResponse>",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_session(&mock_server, 0).await;
    mount_action(&mock_server, "Search", "search.xml", 0).await;

    let client = create_mock_client(&mock_server, new_store(), &CallerContext::anonymous());
    let results = client.search(&ocean()).await.expect("zero-result object");
    assert!(results.is_error());
    assert!(results.records.is_empty());
    assert_eq!(results.error.as_deref(), Some(eds_client_rs::error::GENERIC_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_auth_response_without_token_is_missing_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/uidauth"))
        .respond_with(xml_response(200, "<AuthResponseMessage><AuthToken/></AuthResponseMessage>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_mock_client(&mock_server, new_store(), &CallerContext::anonymous());
    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, eds_client_rs::EdsError::MissingToken { token: "authentication" }));
}
