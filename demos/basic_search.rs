//! Run one search against the EDS API and print the first page
//!
//! ```sh
//! EDS_USER_ID=... EDS_PASSWORD=... EDS_PROFILE=edsapi \
//!     cargo run --example basic_search -- "ocean acidification"
//! ```
//!
//! Set `RUST_LOG=eds_client_rs=debug` to see the request flow, and
//! `EDS_LOG_REQUESTS=1` to log every API exchange.

use std::env;
use std::sync::Arc;

use eds_client_rs::eds::RetrieveOptions;
use eds_client_rs::{CallerContext, ClientConfig, EdsClient, MemorySessionStore, SearchRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let query = env::args().nth(1).unwrap_or_else(|| "climate change".to_string());
    let config = ClientConfig::new()
        .with_credentials(env::var("EDS_USER_ID")?, env::var("EDS_PASSWORD")?)
        .with_profile(env::var("EDS_PROFILE").unwrap_or_else(|_| "edsapi".to_string()))
        .with_request_logging(env::var("EDS_LOG_REQUESTS").is_ok());

    let client = EdsClient::new(
        config,
        Arc::new(MemorySessionStore::new()),
        &CallerContext::authenticated(),
    )?;

    println!("🔍 Searching EDS for: {}", query);
    let results = client
        .search(&SearchRequest::new().lookfor(&query, "AllFields"))
        .await?;

    if let Some(message) = &results.error {
        eprintln!("❌ {}", message);
        return Ok(());
    }

    println!(
        "Showing {}-{} of {} results ({:.2}s)",
        results.record_start(),
        results.record_end(),
        results.record_count,
        results.search_time
    );
    for record in &results.records {
        println!("\n📄 {} [{}]", record.title(), record.id());
        if !record.authors().is_empty() {
            println!("   {}", record.authors());
        }
        if record.pdf_available() {
            println!("   PDF available");
        }
    }

    for facet in results.facets.iter().take(3) {
        let values: Vec<String> = facet
            .values
            .iter()
            .take(5)
            .map(|v| format!("{} ({})", v.value, v.count))
            .collect();
        println!("\n{}: {}", facet.label, values.join(", "));
    }

    if let Some(first) = results.records.first() {
        let record = client.retrieve(&first.id(), &RetrieveOptions::default()).await?;
        println!("\nFull record for {}: {} custom links", record.id(), record.custom_links.len());
    }

    Ok(())
}
