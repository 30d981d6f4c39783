//! Response normalizer
//!
//! Every EDS response is an XML document whose root element wraps exactly one
//! payload. [`parse_response`] recognizes the payload by the first matching
//! child, checked in a fixed priority order, and normalizes it into an
//! [`ApiResponse`]. Missing branches inside a recognized payload decode to
//! empty values; only an unrecognized root is an error.

mod info;
mod record;
pub mod xml;

use serde_json::Value;
use tracing::debug;

use crate::eds::markup::MarkupOptions;
use crate::eds::models::{
    ApiResponse, AuthenticationResult, AutocompleteSettings, Citation, ExportPayload, Facet,
    FacetValue, SearchResults,
};
use crate::error::{EdsError, Result};

pub use record::PDF_PLACEHOLDER_URL;
pub use xml::XmlNode;

/// Normalize a parsed response document
///
/// # Arguments
///
/// * `root` - Root element of the response
/// * `options` - Settings for rich-text fields
///
/// # Errors
///
/// Returns [`EdsError::UnexpectedResponse`] when the document matches none of
/// the known payload shapes.
pub fn parse_response(root: &XmlNode, options: &MarkupOptions) -> Result<ApiResponse> {
    let non_empty = |name: &str| root.child(name).is_some_and(|n| !n.is_empty());

    let response = if non_empty("AuthToken") {
        ApiResponse::Authentication(parse_authentication(root))
    } else if non_empty("SessionToken") {
        ApiResponse::Session(root.child_text("SessionToken"))
    } else if non_empty("AutocompleteToken") {
        ApiResponse::AutocompleteToken(root.child_text("AutocompleteToken"))
    } else if let Some(search) = root.child("SearchResult") {
        ApiResponse::Search(Box::new(parse_search(search, options)))
    } else if let Some(node) = root.child("Record") {
        ApiResponse::Record(Box::new(record::parse_record(node, options, true)))
    } else if root.has_child("AvailableSearchCriteria") {
        ApiResponse::Info(Box::new(info::parse_info(root)))
    } else if root.has_child("Format") && root.has_child("Data") {
        ApiResponse::Export(ExportPayload {
            format: root.child_text("Format"),
            data: root.child_text("Data"),
        })
    } else if root.has_child("Citations") || root.has_child("Citation") {
        ApiResponse::Citations(parse_citations(root))
    } else {
        return Err(EdsError::UnexpectedResponse {
            root: root.name().to_string(),
            payload: root.to_xml_string(),
        });
    };

    debug!(kind = response.kind(), root = root.name(), "Parsed EDS response");
    Ok(response)
}

fn parse_authentication(root: &XmlNode) -> AuthenticationResult {
    let autocomplete = root
        .child("Autocomplete")
        .map(|ac| AutocompleteSettings {
            url: ac.child_text("Url"),
            token: ac.child_text("Token"),
            token_timeout: ac.child_text("TokenTimeOut").parse().unwrap_or(0),
            customer_id: ac.child_text("CustId"),
        })
        .filter(AutocompleteSettings::is_configured);

    AuthenticationResult {
        token: root.child_text("AuthToken"),
        timeout: root.child_text("AuthTimeout").parse().unwrap_or(0),
        autocomplete,
    }
}

/// Decode a `<SearchResult>` element
pub(crate) fn parse_search(search: &XmlNode, options: &MarkupOptions) -> SearchResults {
    let record_count: u64 = search
        .path_text(&["Statistics", "TotalHits"])
        .parse()
        .unwrap_or(0);
    let search_millis: u64 = search
        .path_text(&["Statistics", "TotalSearchTime"])
        .parse()
        .unwrap_or(0);

    let (records, facets) = if record_count > 0 {
        let records = search
            .list(&["Data", "Records"], "Record")
            .into_iter()
            .map(|r| record::parse_record(r, options, false))
            .collect();
        (records, parse_facets(search))
    } else {
        (Vec::new(), Vec::new())
    };

    let side_payload = |name: &str| -> Option<Value> { search.child(name).map(XmlNode::to_json) };

    SearchResults {
        record_count,
        search_time: search_millis as f64 / 1000.0,
        start: 0,
        records,
        facets,
        related_content: side_payload("RelatedContent"),
        auto_suggest_terms: side_payload("AutoSuggestedTerms"),
        image_quick_view_terms: side_payload("imageQuickViewedTerms"),
        citation_styles_terms: side_payload("citationStylesTerms"),
        error: None,
    }
}

fn unescape_parens(value: &str) -> String {
    value.replace("\\(", "(").replace("\\)", ")")
}

fn parse_facets(search: &XmlNode) -> Vec<Facet> {
    search
        .list(&["AvailableFacets"], "AvailableFacet")
        .into_iter()
        .filter_map(|facet| {
            let label = facet.child_text("Label");
            if label.is_empty() {
                return None;
            }
            let values = facet
                .list(&["AvailableFacetValues"], "AvailableFacetValue")
                .into_iter()
                .map(|v| FacetValue {
                    value: unescape_parens(&v.child_text("Value")),
                    action: unescape_parens(&v.child_text("AddAction")),
                    count: v.child_text("Count").parse().unwrap_or(0),
                    applied: false,
                })
                .collect();
            Some(Facet {
                id: facet.child_text("Id"),
                label,
                values,
                applied: false,
            })
        })
        .collect()
}

fn parse_citations(root: &XmlNode) -> Vec<Citation> {
    let citations = match root.child("Citations") {
        Some(wrapper) => wrapper.children("Citation").collect::<Vec<_>>(),
        None => root.children("Citation").collect(),
    };
    citations
        .into_iter()
        .map(|c| Citation {
            id: c.child_text("Id"),
            label: c.child_text("Label"),
            section_label: c.child_text("SectionLabel"),
            data: c.child_text("Data"),
            caption: c.child_text("Caption"),
        })
        .collect()
}
