//! Response normalizer tests over the recorded EDS XML documents

mod common;

use common::{fixture, fixture_files};
use eds_client_rs::eds::markup::MarkupOptions;
use eds_client_rs::eds::parser::{XmlNode, parse_response};
use eds_client_rs::eds::{ApiResponse, Info};
use eds_client_rs::error::ErrorKind;
use rstest::rstest;

fn parse(name: &str) -> eds_client_rs::Result<ApiResponse> {
    let root = XmlNode::parse(&fixture(name))?;
    parse_response(&root, &MarkupOptions::default())
}

#[rstest]
#[case("auth.xml", "authentication")]
#[case("auth_autocomplete.xml", "authentication")]
#[case("session.xml", "session")]
#[case("search.xml", "search")]
#[case("search_empty.xml", "search")]
#[case("retrieve.xml", "record")]
#[case("info.xml", "info")]
#[case("export.xml", "export")]
#[case("citations.xml", "citations")]
fn test_fixture_kind(#[case] name: &str, #[case] kind: &str) {
    let response = parse(name).unwrap_or_else(|e| panic!("{} failed to parse: {}", name, e));
    assert_eq!(response.kind(), kind);
}

#[test]
fn test_every_fixture_is_well_formed() {
    let files = fixture_files();
    assert!(!files.is_empty(), "no fixtures found");
    for file in files {
        let xml = std::fs::read_to_string(&file).unwrap();
        assert!(XmlNode::parse(&xml).is_ok(), "{:?} is not well-formed", file);
    }
}

#[rstest]
#[case("error_104.xml")]
#[case("error_109.xml")]
#[case("error_112.xml")]
#[case("error_135.xml")]
fn test_error_documents_are_not_payloads(#[case] name: &str) {
    let err = parse(name).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
}

#[test]
fn test_autocomplete_settings_are_decoded() {
    let ApiResponse::Authentication(auth) = parse("auth_autocomplete.xml").unwrap() else {
        panic!("expected an authentication response");
    };
    assert_eq!(auth.token, "AUTH-TOKEN-1");
    assert_eq!(auth.timeout, 1800);
    let settings = auth.autocomplete.expect("autocomplete settings");
    assert_eq!(settings.token, "AC-TOKEN");
    assert_eq!(settings.customer_id, "acme");
    assert_eq!(settings.token_timeout, 300);
}

#[test]
fn test_plain_auth_has_no_autocomplete() {
    let ApiResponse::Authentication(auth) = parse("auth.xml").unwrap() else {
        panic!("expected an authentication response");
    };
    assert!(auth.autocomplete.is_none());
}

#[test]
fn test_empty_search_has_no_records_or_facets() {
    let ApiResponse::Search(results) = parse("search_empty.xml").unwrap() else {
        panic!("expected a search response");
    };
    assert_eq!(results.record_count, 0);
    assert!(results.records.is_empty());
    assert!(results.facets.is_empty());
}

#[test]
fn test_info_capabilities() {
    let ApiResponse::Info(info) = parse("info.xml").unwrap() else {
        panic!("expected an info response");
    };
    let info: Info = *info;
    let sort_ids: Vec<&str> = info.sorts.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(sort_ids, vec!["relevance", "date", "date2"]);
    assert_eq!(info.limiters.len(), 3);
    assert_eq!(info.limiters[2].values.len(), 2);
    assert!(info.auto_suggest_default_on());
    assert!(!info.related_content_default_on("emp"));
}

#[test]
fn test_unknown_root_is_rejected() {
    let root = XmlNode::parse("<Mystery><Thing>1</Thing></Mystery>").unwrap();
    let err = parse_response(&root, &MarkupOptions::default()).unwrap_err();
    assert!(err.to_string().contains("<Mystery>"));
}

#[test]
fn test_empty_token_is_not_a_payload() {
    let root = XmlNode::parse("<AuthResponseMessage><AuthToken></AuthToken></AuthResponseMessage>").unwrap();
    assert!(parse_response(&root, &MarkupOptions::default()).is_err());
}
