pub mod client;
pub mod markup;
pub mod models;
pub mod parser;
pub mod query;

pub use client::{Action, EdsClient, RetrieveOptions};
pub use models::{
    ApiResponse, Citation, ExportPayload, Facet, FacetValue, Info, Record, RecordId,
    SearchResults,
};
pub use query::{DetailLevel, SearchMode, SearchRequest, SortOrder};
