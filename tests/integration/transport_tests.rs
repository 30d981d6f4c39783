//! Transport tests against a mock HTTP server
//!
//! One `send` is one HTTP request; these check what goes on the wire and how
//! statuses are classified.

mod common;

use common::{fixture, xml_response};
use eds_client_rs::ClientConfig;
use eds_client_rs::eds::query::QueryPlan;
use eds_client_rs::transport::{Method, Payload, Transport};
use eds_client_rs::{EdsError, ErrorCode};
use serde::Deserialize;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKENS: &[(&str, &str)] = &[("x-authenticationToken", "A"), ("x-sessionToken", "S")];

fn transport() -> Transport {
    Transport::new(&ClientConfig::new()).expect("transport should build")
}

#[tokio::test]
async fn test_get_sends_query_and_headers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Search"))
        .and(query_param("query-1", "AND,cats & dogs"))
        .and(query_param("view", "brief"))
        .and(header("x-sessionToken", "S"))
        .and(header("content-type", "text/xml"))
        .respond_with(xml_response(200, fixture("search_empty.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let plan = QueryPlan::new()
        .with("query-1", "AND,cats & dogs")
        .with("view", "brief");
    let root = transport()
        .send(
            &format!("{}/Search", mock_server.uri()),
            &Payload::Query(plan),
            TOKENS,
            Method::Get,
        )
        .await
        .expect("send should succeed");

    assert_eq!(root.name(), "SearchResponseMessageGet");
    assert_eq!(root.path_text(&["SearchResult", "Statistics", "TotalHits"]), "0");
}

#[tokio::test]
async fn test_post_sends_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/uidauth"))
        .and(body_string("<Auth/>"))
        .respond_with(xml_response(200, fixture("auth.xml")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = transport()
        .send(
            &format!("{}/uidauth", mock_server.uri()),
            &Payload::Body("<Auth/>".to_string()),
            &[],
            Method::Post,
        )
        .await
        .unwrap();
    assert_eq!(root.child_text("AuthToken"), "AUTH-TOKEN-1");
}

#[tokio::test]
async fn test_delete_without_payload_omits_token_headers() {
    let mock_server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/EndSession"))
        .respond_with(xml_response(200, "<EndSessionResponse><IsSuccessful>y</IsSuccessful></EndSessionResponse>"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let url = format!("{}/EndSession", mock_server.uri());
    let transport = transport();
    transport
        .send(&url, &Payload::None, TOKENS, Method::Delete)
        .await
        .unwrap();
    transport
        .send(
            &url,
            &Payload::Query(QueryPlan::new().with("sessiontoken", "S")),
            TOKENS,
            Method::Delete,
        )
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("x-sessionToken").is_none());
    assert!(requests[1].headers.get("x-sessionToken").is_some());
}

#[tokio::test]
async fn test_400_carries_remote_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(xml_response(400, fixture("error_109.xml")))
        .mount(&mock_server)
        .await;

    let err = transport()
        .send(&mock_server.uri(), &Payload::None, TOKENS, Method::Get)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::SessionTokenInvalid));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_404_is_critical() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let err = transport()
        .send(&mock_server.uri(), &Payload::None, &[], Method::Get)
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Critical));
    assert!(err.to_string().contains("HTTP 404"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_host_is_request_error() {
    let config = ClientConfig::new().with_timeout(std::time::Duration::from_secs(2));
    let err = Transport::new(&config)
        .unwrap()
        .send("http://127.0.0.1:1/Search", &Payload::None, &[], Method::Get)
        .await
        .unwrap_err();
    assert!(matches!(err, EdsError::RequestError(_)));
}

#[derive(Debug, Deserialize)]
struct Terms {
    terms: Vec<String>,
}

#[tokio::test]
async fn test_get_json() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/autocomplete"))
        .and(query_param("term", "clim"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "terms": ["climate"] })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let parsed: Terms = transport()
        .get_json(
            &format!("{}/autocomplete", mock_server.uri()),
            &QueryPlan::new().with("term", "clim"),
        )
        .await
        .unwrap();
    assert_eq!(parsed.terms, vec!["climate"]);
}

#[tokio::test]
async fn test_get_json_failure_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let result: eds_client_rs::Result<Terms> = transport()
        .get_json(&mock_server.uri(), &QueryPlan::new())
        .await;
    assert_eq!(result.unwrap_err().code(), Some(ErrorCode::Critical));
}
