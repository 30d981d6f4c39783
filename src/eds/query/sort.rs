//! Sort order resolution for EDS searches

use serde::{Deserialize, Serialize};

/// The four sort identifiers the EDS API understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Relevance ranking (default)
    #[default]
    Relevance,
    /// Newest first
    Date,
    /// Oldest first
    Date2,
    /// Source title
    Source,
}

impl SortOrder {
    /// Resolve a caller-facing sort name
    ///
    /// Canonical names pass through. Known aliases map through a fixed table and
    /// anything else falls back to relevance, so a raw caller value never
    /// reaches the wire.
    ///
    /// # Example
    ///
    /// ```
    /// use eds_client_rs::eds::query::SortOrder;
    ///
    /// assert_eq!(SortOrder::resolve("date_asc"), SortOrder::Date2);
    /// assert_eq!(SortOrder::resolve("no-such-sort"), SortOrder::Relevance);
    /// ```
    pub fn resolve(name: &str) -> Self {
        match name.trim() {
            "relevance" | "" => SortOrder::Relevance,
            "date" | "date_desc" | "subject" | "callnumber" | "title" => SortOrder::Date,
            "date2" | "date_asc" => SortOrder::Date2,
            "source" => SortOrder::Source,
            _ => SortOrder::Relevance,
        }
    }

    /// Wire value for the `sort` parameter
    pub fn as_api_param(&self) -> &'static str {
        match self {
            SortOrder::Relevance => "relevance",
            SortOrder::Date => "date",
            SortOrder::Date2 => "date2",
            SortOrder::Source => "source",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_api_param())
    }
}
