//! Smoke tests against the live EDS API
//!
//! Run with `--features integration-tests` and `EDS_REAL_API_TESTS=1`, plus
//! `EDS_USER_ID`, `EDS_PASSWORD` and optionally `EDS_PROFILE`.

#![cfg(feature = "integration-tests")]

mod common;

use common::{create_real_client, should_run_real_api_tests};
use eds_client_rs::eds::RetrieveOptions;
use eds_client_rs::{EdsClient, SearchRequest};
use tracing_test::traced_test;

fn real_client() -> Option<EdsClient> {
    if !should_run_real_api_tests() {
        println!("Skipping real API test (EDS_REAL_API_TESTS not set)");
        return None;
    }
    let client = create_real_client();
    if client.is_none() {
        println!("Skipping real API test (EDS credentials not set)");
    }
    client
}

#[tokio::test]
#[traced_test]
async fn test_real_info() {
    let Some(client) = real_client() else {
        return;
    };
    let info = client.info().await.expect("info should load");
    assert!(!info.sorts.is_empty());
    assert!(!info.search_fields.is_empty());
}

#[tokio::test]
#[traced_test]
async fn test_real_search_and_retrieve() {
    let Some(client) = real_client() else {
        return;
    };
    let results = client
        .search(&SearchRequest::new().lookfor("climate change", "AllFields").page_size(5))
        .await
        .expect("search should succeed");
    assert!(results.error.is_none(), "search error: {:?}", results.error);
    println!("{} hits in {:.3}s", results.record_count, results.search_time);

    let Some(first) = results.records.first() else {
        return;
    };
    let record = client
        .retrieve(&first.id(), &RetrieveOptions::default())
        .await
        .expect("retrieve should succeed");
    assert_eq!(record.id(), first.id());
}
