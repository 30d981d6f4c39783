//! # EDS Client
//!
//! A Rust client library for the EBSCO Discovery Service (EDS) API.
//! It manages the authentication and session tokens, compiles structured
//! search requests into the wire query, and normalizes the XML responses into
//! typed records, facets and capability catalogs.
//!
//! ## Features
//!
//! - **Token lifecycle**: tokens are cached in a session store you provide and
//!   refreshed automatically when the API rejects them, within a fixed budget
//! - **Query compiler**: free text, field-qualified clause groups and the
//!   `addfacetfilter(...)` / `addlimiter(...)` / `addexpander(...)` action strings
//! - **Typed responses**: records, facets, Info catalogs, citations and exports
//! - **Safe markup**: EDS inline tags are rewritten into allow-listed HTML
//! - **Async Support**: Built on tokio for async/await support
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use eds_client_rs::{CallerContext, ClientConfig, EdsClient, MemorySessionStore};
//! use eds_client_rs::eds::query::SearchRequest;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new()
//!         .with_credentials("user", "secret")
//!         .with_profile("edsapi")
//!         .with_organization("ACME University");
//!     let store = Arc::new(MemorySessionStore::new());
//!     let client = EdsClient::new(config, store, &CallerContext::authenticated())?;
//!
//!     let request = SearchRequest::new()
//!         .lookfor("ocean acidification", "AllFields")
//!         .filter("addlimiter(FT:y)")
//!         .page_size(20);
//!     let results = client.search(&request).await?;
//!
//!     println!("{} hits", results.record_count);
//!     for record in &results.records {
//!         println!("{} | {}", record.id(), record.title());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod eds;
pub mod error;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use config::{CallerContext, ClientConfig, GuestState};
pub use eds::{EdsClient, Record, RecordId, SearchRequest, SearchResults};
pub use error::{EdsError, ErrorCode, ErrorKind, Result};
pub use session::{MemorySessionStore, SessionStore, TokenCache};
