//! SearchRequest builder and its compilation into a QueryPlan

use serde::{Deserialize, Serialize};

use super::filters::FilterSet;
use super::{
    DetailLevel, QueryPlan, SearchMode, SortOrder, escape_term, field_tag, is_boolean_expression,
    query_clause,
};
use crate::eds::models::Info;

/// Boolean operator joining a clause to the ones before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BoolOp {
    #[default]
    And,
    Or,
    Not,
}

impl BoolOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoolOp::And => "AND",
            BoolOp::Or => "OR",
            BoolOp::Not => "NOT",
        }
    }

    /// Parse `AND`/`OR`/`NOT` case-insensitively, defaulting to AND
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "OR" => BoolOp::Or,
            "NOT" => BoolOp::Not,
            _ => BoolOp::And,
        }
    }
}

/// One field-scoped term of an advanced search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    pub term: String,
    /// Caller-facing field name (`AllFields`, `Title`, `Author`, ...)
    pub field: String,
    /// Operator, AND when absent
    pub op: Option<BoolOp>,
}

impl Clause {
    pub fn new(term: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            field: field.into(),
            op: None,
        }
    }

    pub fn with_op(mut self, op: BoolOp) -> Self {
        self.op = Some(op);
        self
    }
}

/// What the caller is searching for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchTerms {
    #[default]
    None,
    /// Basic search: one term in one field
    FreeText { term: String, field: String },
    /// Advanced search: ordered clauses
    Group(Vec<Clause>),
}

/// Builder for an EDS search
///
/// # Example
///
/// ```
/// use eds_client_rs::eds::query::SearchRequest;
///
/// let plan = SearchRequest::new()
///     .lookfor("machine learning", "Title")
///     .filter("addlimiter(FT:y)")
///     .page(2)
///     .compile(10, Default::default())
///     .unwrap();
///
/// assert_eq!(plan.get("query-1"), Some("AND,TI:machine learning"));
/// assert_eq!(plan.get("action"), Some("GoToPage(2)"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub terms: SearchTerms,
    /// Active filter action strings, in the order the caller applied them
    pub filters: Vec<String>,
    /// One-based page number
    pub page: u32,
    pub page_size: Option<u32>,
    pub sort: SortOrder,
    pub detail_level: Option<DetailLevel>,
    pub mode: SearchMode,
    pub related_content_rs: bool,
    pub related_content_emp: bool,
    pub auto_suggest: bool,
    pub image_quick_view: bool,
    pub citation_styles: bool,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self {
            terms: SearchTerms::None,
            filters: Vec::new(),
            page: 1,
            page_size: None,
            sort: SortOrder::Relevance,
            detail_level: None,
            mode: SearchMode::All,
            related_content_rs: false,
            related_content_emp: false,
            auto_suggest: false,
            image_quick_view: false,
            citation_styles: false,
        }
    }

    /// Basic search for `term` in `field`
    ///
    /// # Arguments
    ///
    /// * `term` - Free text; may itself contain `AND`/`OR`
    /// * `field` - Search field name, `AllFields` (or empty) for all fields
    pub fn lookfor(mut self, term: impl Into<String>, field: impl Into<String>) -> Self {
        self.terms = SearchTerms::FreeText {
            term: term.into(),
            field: field.into(),
        };
        self
    }

    /// Advanced search over an ordered list of clauses
    pub fn group(mut self, clauses: Vec<Clause>) -> Self {
        self.terms = SearchTerms::Group(clauses);
        self
    }

    /// Append one clause, switching to an advanced search if needed
    pub fn clause(mut self, clause: Clause) -> Self {
        match &mut self.terms {
            SearchTerms::Group(clauses) => clauses.push(clause),
            _ => self.terms = SearchTerms::Group(vec![clause]),
        }
        self
    }

    /// Add one filter action string (`addlimiter(...)`, `addexpander(...)`, `addfacetfilter(...)`)
    pub fn filter(mut self, action: impl Into<String>) -> Self {
        self.filters.push(action.into());
        self
    }

    pub fn filters<S: AsRef<str>>(mut self, actions: &[S]) -> Self {
        self.filters
            .extend(actions.iter().map(|a| a.as_ref().to_string()));
        self
    }

    /// One-based page; 0 is treated as 1
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sort by caller-facing name, resolved through the alias table
    pub fn sort(mut self, name: &str) -> Self {
        self.sort = SortOrder::resolve(name);
        self
    }

    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.sort = order;
        self
    }

    pub fn detail_level(mut self, level: DetailLevel) -> Self {
        self.detail_level = Some(level);
        self
    }

    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Request research starters (`rs`) and/or exact match publications (`emp`)
    pub fn related_content(mut self, rs: bool, emp: bool) -> Self {
        self.related_content_rs = rs;
        self.related_content_emp = emp;
        self
    }

    pub fn auto_suggest(mut self, enabled: bool) -> Self {
        self.auto_suggest = enabled;
        self
    }

    pub fn image_quick_view(mut self, enabled: bool) -> Self {
        self.image_quick_view = enabled;
        self
    }

    pub fn citation_styles(mut self, enabled: bool) -> Self {
        self.citation_styles = enabled;
        self
    }

    /// Switch on the optional payloads the profile enables by default
    pub fn with_info_defaults(mut self, info: &Info) -> Self {
        self.related_content_rs |= info.related_content_default_on("rs");
        self.related_content_emp |= info.related_content_default_on("emp");
        self.auto_suggest |= info.auto_suggest_default_on();
        self.image_quick_view |= info.image_quick_view_default_on();
        self
    }

    /// Whether compiling would produce no query at all
    pub fn is_empty(&self) -> bool {
        self.query_params().is_empty()
    }

    /// `query` / `query-N` parameters for the search terms
    fn query_params(&self) -> Vec<(String, String)> {
        match &self.terms {
            SearchTerms::None => Vec::new(),
            SearchTerms::FreeText { term, field } => {
                if term.trim().is_empty() {
                    return Vec::new();
                }
                let term = escape_term(term);
                if is_boolean_expression(&term) {
                    vec![("query".to_string(), term)]
                } else {
                    let clause = query_clause(BoolOp::And.as_str(), field_tag(field), &term);
                    vec![("query-1".to_string(), clause)]
                }
            }
            SearchTerms::Group(clauses) => clauses
                .iter()
                .map(|c| (c, escape_term(&c.term)))
                .filter(|(_, term)| !term.trim().is_empty())
                .enumerate()
                .map(|(i, (c, term))| {
                    let op = c.op.unwrap_or_default();
                    (
                        format!("query-{}", i + 1),
                        query_clause(op.as_str(), field_tag(&c.field), &term),
                    )
                })
                .collect(),
        }
    }

    /// Compile into wire parameters
    ///
    /// Returns `None` when there is nothing to search for; the caller answers
    /// with an empty result set without contacting the remote.
    ///
    /// # Arguments
    ///
    /// * `default_page_size` - Used when the request sets no page size
    /// * `default_detail_level` - Used when the request sets no detail level
    pub fn compile(
        &self,
        default_page_size: u32,
        default_detail_level: DetailLevel,
    ) -> Option<QueryPlan> {
        let query = self.query_params();
        if query.is_empty() {
            return None;
        }

        let detail = self.detail_level.unwrap_or(default_detail_level);
        let page = self.page.max(1);

        let mut plan = QueryPlan::new()
            .with("sort", self.sort.as_api_param())
            .with("searchmode", self.mode.as_api_param())
            .with("view", detail.as_api_param())
            .with("includefacets", "y")
            .with(
                "resultsperpage",
                self.page_size.unwrap_or(default_page_size).to_string(),
            )
            .with("pagenumber", page.to_string())
            .with("highlight", "y");

        if self.auto_suggest {
            plan.push("autosuggest", "y");
        }
        match (self.related_content_rs, self.related_content_emp) {
            (true, true) => plan.push("relatedcontent", "rs,emp"),
            (true, false) => plan.push("relatedcontent", "rs"),
            (false, true) => plan.push("relatedcontent", "emp"),
            (false, false) => {}
        }
        if self.image_quick_view {
            plan.push("includeimagequickview", "y");
        }
        if self.citation_styles {
            plan.push("styles", "all");
        }

        for (key, value) in query {
            plan.push(key, value);
        }
        FilterSet::from_actions(&self.filters).apply(&mut plan);

        if page > 1 {
            plan.push("action", format!("GoToPage({})", page));
        }

        Some(plan)
    }
}
