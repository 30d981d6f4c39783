//! Query compiler for EDS searches
//!
//! A [`SearchRequest`] plus the caller's list of filter action strings compiles
//! into a [`QueryPlan`], the flat parameter list sent to the `Search` endpoint.

mod builder;
mod filters;
mod sort;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use builder::{BoolOp, Clause, SearchRequest, SearchTerms};
pub use filters::{AppliedFilter, AppliedFilters, FilterAction, FilterKind, FilterSet};
pub use sort::SortOrder;

/// Amount of data returned per record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Title only
    Title,
    /// Title, source and subjects
    #[default]
    Brief,
    /// Brief plus the full abstract
    Detailed,
}

impl DetailLevel {
    pub fn as_api_param(&self) -> &'static str {
        match self {
            DetailLevel::Title => "title",
            DetailLevel::Brief => "brief",
            DetailLevel::Detailed => "detailed",
        }
    }

    /// Parse a caller value, falling back to brief
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "title" => DetailLevel::Title,
            "detailed" => DetailLevel::Detailed,
            _ => DetailLevel::Brief,
        }
    }
}

/// How the terms of a query are combined by the remote search engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// All terms must match
    #[default]
    All,
    /// Any term may match
    Any,
    /// Boolean / phrase
    Bool,
    /// SmartText searching
    Smart,
}

impl SearchMode {
    pub fn as_api_param(&self) -> &'static str {
        match self {
            SearchMode::All => "all",
            SearchMode::Any => "any",
            SearchMode::Bool => "bool",
            SearchMode::Smart => "smart",
        }
    }

    /// Parse a caller value, falling back to `all`
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "any" => SearchMode::Any,
            "bool" => SearchMode::Bool,
            "smart" => SearchMode::Smart,
            _ => SearchMode::All,
        }
    }
}

/// Ordered multimap of wire parameters
///
/// Keys may repeat (`facetfilter` is sent once per facet group) and insertion
/// order is kept so the wire form is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    params: Vec<(String, String)>,
}

impl QueryPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, keeping any earlier value under the same key
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.push((key.into(), value.into()));
    }

    /// Builder form of [`QueryPlan::push`]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// First value recorded under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded under `key`, in insertion order
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Percent-encoded `key=value&...` form
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_query_string())
    }
}

/// Field tag for a caller-facing search field name
///
/// Unknown fields search all fields, which is the empty tag.
pub fn field_tag(field: &str) -> &'static str {
    match field {
        "Abstract" => "AB",
        "Author" => "AU",
        "Source" => "SO",
        "Subject" => "SU",
        "Title" => "TI",
        "ISBN" => "IB",
        "ISSN" => "IS",
        _ => "",
    }
}

/// Trim, escape the query-language metacharacters and collapse whitespace runs
pub fn escape_term(term: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    let whitespace =
        WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"));

    let mut escaped = String::with_capacity(term.len());
    for c in term.trim().chars() {
        if matches!(c, ',' | ':' | '(' | ')') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    whitespace.replace_all(&escaped, " ").into_owned()
}

/// Whether a free-text term already carries its own boolean combinators
pub(crate) fn is_boolean_expression(term: &str) -> bool {
    static BOOLEAN: OnceLock<Regex> = OnceLock::new();
    let boolean = BOOLEAN.get_or_init(|| {
        Regex::new(r"(?i)(.*) (AND|OR) (.*)").expect("Failed to compile boolean regex")
    });
    boolean.is_match(term)
}

/// `OP,TAG:term`, or `OP,term` when the tag is empty
pub(crate) fn query_clause(op: &str, tag: &str, term: &str) -> String {
    if tag.is_empty() {
        format!("{},{}", op, term)
    } else {
        format!("{},{}:{}", op, tag, term)
    }
}
