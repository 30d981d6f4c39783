//! Normalized EDS records and catalogs
//!
//! Everything here is plain data produced by the response normalizer. Rich text
//! fields (item data, full text) hold sanitized HTML; every other string is the
//! raw remote value, empty when the remote omitted it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EdsError, Result};

/// Record identity, written `an|dbid`
///
/// # Example
///
/// ```
/// use eds_client_rs::eds::RecordId;
///
/// let id: RecordId = "123456|a9h".parse().unwrap();
/// assert_eq!(id.an, "123456");
/// assert_eq!(id.db_id, "a9h");
/// assert_eq!(id.to_string(), "123456|a9h");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    /// Accession number
    pub an: String,
    /// Database id
    pub db_id: String,
}

impl RecordId {
    pub fn new(an: impl Into<String>, db_id: impl Into<String>) -> Self {
        Self {
            an: an.into(),
            db_id: db_id.into(),
        }
    }

    /// Parse `an|dbid`, splitting on the first `|`
    pub fn parse(id: &str) -> Result<Self> {
        match id.split_once('|') {
            Some((an, db_id)) if !an.is_empty() && !db_id.is_empty() => Ok(Self::new(an, db_id)),
            _ => Err(EdsError::InvalidRecordId { id: id.to_string() }),
        }
    }

    /// Parse the citation form `an|dbid|styles`
    ///
    /// The styles segment is optional; an empty segment counts as absent.
    pub fn parse_with_styles(id: &str) -> Result<(Self, Option<String>)> {
        let mut parts = id.splitn(3, '|');
        let an = parts.next().unwrap_or_default();
        let db_id = parts.next().unwrap_or_default();
        if an.is_empty() || db_id.is_empty() {
            return Err(EdsError::InvalidRecordId { id: id.to_string() });
        }
        let styles = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        Ok((Self::new(an, db_id), styles))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.an, self.db_id)
    }
}

impl FromStr for RecordId {
    type Err = EdsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Full text availability and typed links
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullText {
    /// Whether the full text is available inline
    pub available: bool,
    /// Typed links (`pdflink`, `ebook-pdf`, ...)
    pub links: Vec<FullTextLink>,
    /// Sanitized full text body (retrieve only)
    pub value: Option<String>,
}

impl FullText {
    /// URL of the first link with the given type
    pub fn link(&self, link_type: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.link_type == link_type)
            .map(|l| l.url.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTextLink {
    pub link_type: String,
    pub url: String,
}

/// Link to an external resolver or full text provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomLink {
    pub category: String,
    pub icon: String,
    pub mouse_over_text: String,
    pub name: String,
    pub text: String,
    pub url: String,
}

/// Named display field of a record (title, author, abstract, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Field name, e.g. `Title`, `Author`, `TitleSource`
    pub name: String,
    /// Display label
    pub label: String,
    /// Semantic group (`Ti`, `Au`, `Su`, ...)
    pub group: String,
    /// Sanitized HTML
    pub data: String,
}

/// Cover art or illustration image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Size key (`thumb`, `medium`, ...)
    pub size: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    pub id_type: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_full: String,
    pub subject_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub title_full: String,
    pub title_type: String,
}

/// Partial date (any component may be empty)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub d: String,
    pub m: String,
    pub y: String,
    pub date_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Numbering {
    pub number_type: String,
    pub value: String,
}

/// Bibliographic description of the record itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibEntity {
    pub identifiers: Vec<Identifier>,
    pub languages: Vec<Language>,
    pub page_count: String,
    pub start_page: String,
    pub subjects: Vec<Subject>,
    pub titles: Vec<Title>,
}

/// Container the record is part of (journal issue, book, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOf {
    pub dates: Vec<PartialDate>,
    pub identifiers: Vec<Identifier>,
    pub titles: Vec<Title>,
    pub numbering: Vec<Numbering>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibRelationships {
    /// Full contributor names, in record order
    pub contributors: Vec<String>,
    pub is_part_of: Vec<PartOf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInfo {
    pub bib_entity: BibEntity,
    pub relationships: BibRelationships,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageQuickViewItem {
    pub db_id: String,
    pub an: String,
    pub item_type: String,
    pub url: String,
}

/// One normalized record, from a search hit or a retrieve call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Position in the result list (search only)
    pub result_id: Option<u32>,
    pub an: String,
    pub db_id: String,
    pub db_label: String,
    pub pub_type: String,
    pub access_level: String,
    /// Permanent link
    pub plink: String,
    /// Cover art keyed by size
    pub images: Vec<Image>,
    pub full_text: Option<FullText>,
    pub custom_links: Vec<CustomLink>,
    pub items: Vec<Item>,
    pub record_info: Option<RecordInfo>,
    pub image_quick_view: Vec<ImageQuickViewItem>,
    /// Illustration images (retrieve only)
    pub illustrations: Vec<Image>,
}

impl Record {
    /// `an|dbid` identity
    pub fn id(&self) -> RecordId {
        RecordId::new(self.an.clone(), self.db_id.clone())
    }

    /// Item with the given name
    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.name == name)
    }

    fn item_data(&self, name: &str) -> &str {
        self.item(name).map(|i| i.data.as_str()).unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.item_data("Title")
    }

    pub fn authors(&self) -> &str {
        self.item_data("Author")
    }

    pub fn subjects(&self) -> &str {
        self.item_data("Subject")
    }

    /// Abstract
    pub fn summary(&self) -> &str {
        self.item_data("Abstract")
    }

    pub fn source(&self) -> &str {
        self.item_data("TitleSource")
    }

    pub fn full_text_available(&self) -> bool {
        self.full_text.as_ref().is_some_and(|ft| ft.available)
    }

    /// Sanitized full text body, empty when not retrieved
    pub fn full_text_value(&self) -> &str {
        self.full_text
            .as_ref()
            .and_then(|ft| ft.value.as_deref())
            .unwrap_or_default()
    }

    pub fn pdf_link(&self) -> Option<&str> {
        self.full_text.as_ref().and_then(|ft| ft.link("pdflink"))
    }

    pub fn pdf_available(&self) -> bool {
        self.pdf_link().is_some_and(|url| !url.is_empty())
    }

    /// Thumbnail URL; `medium`/`large` pick the medium image, anything else the thumb
    ///
    /// Returns `None` unless the record carries a `thumb` image.
    pub fn thumb_link(&self, size: &str) -> Option<&str> {
        let image = |key: &str| {
            self.images
                .iter()
                .find(|i| i.size == key)
                .map(|i| i.target.as_str())
        };
        image("thumb")?;
        match size {
            "medium" | "large" => image("medium"),
            _ => image("thumb"),
        }
    }
}

/// One value of a facet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    /// Literal action token, e.g. `addfacetfilter(SubjectEDS:Math)`
    pub action: String,
    pub count: u64,
    /// Whether the caller's active filters contain this action
    pub applied: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub id: String,
    pub label: String,
    pub values: Vec<FacetValue>,
    /// Whether any value of this facet is applied
    pub applied: bool,
}

/// Results of a search call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Total hits reported by the remote
    pub record_count: u64,
    /// Search time in seconds
    pub search_time: f64,
    /// Zero-based offset of the first record
    pub start: u64,
    pub records: Vec<Record>,
    pub facets: Vec<Facet>,
    pub related_content: Option<Value>,
    pub auto_suggest_terms: Option<Value>,
    pub image_quick_view_terms: Option<Value>,
    pub citation_styles_terms: Option<Value>,
    /// Message for the end user when the search failed remotely
    pub error: Option<String>,
}

impl SearchResults {
    /// Zero hits, no records, no facets
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zero-result object carrying a message for the end user
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// One-based position of the first record on this page
    pub fn record_start(&self) -> u64 {
        if self.records.is_empty() { 0 } else { self.start + 1 }
    }

    /// One-based position of the last record on this page
    pub fn record_end(&self) -> u64 {
        if self.records.is_empty() {
            return 0;
        }
        self.start + self.records.len() as u64
    }
}

/// Sort option advertised by the Info call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOption {
    pub id: String,
    pub label: String,
    pub action: String,
}

/// Searchable field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchField {
    pub label: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expander {
    pub id: String,
    pub label: String,
    pub action: String,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedContentOption {
    /// `rs` (research starters) or `emp` (exact match publication)
    pub content_type: String,
    pub label: String,
    pub action: String,
    pub default_on: bool,
}

/// "Did you mean" option
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoSuggestOption {
    pub id: String,
    pub label: String,
    pub default_on: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageQuickViewOption {
    pub id: String,
    pub label: String,
    pub default_on: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterValue {
    pub value: String,
    pub action: String,
    pub selected: bool,
}

/// Selection state of a limiter against the active filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimiterSelection {
    #[default]
    None,
    /// Multi-value limiter: the selected value actions
    Values(Vec<String>),
    /// Date range limiter: the active action
    Range(String),
    /// Single toggle limiter switched on
    Toggle,
}

impl LimiterSelection {
    pub fn is_selected(&self) -> bool {
        !matches!(self, LimiterSelection::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limiter {
    pub id: String,
    pub label: String,
    /// Action template, e.g. `addlimiter(FT:value)`
    pub action: String,
    /// `select`, `multiselectvalue`, `ymrange`, ...
    pub limiter_type: String,
    pub values: Vec<LimiterValue>,
    pub selected: LimiterSelection,
}

/// Capabilities of the profile, from the Info call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub sorts: Vec<SortOption>,
    pub search_fields: Vec<SearchField>,
    pub expanders: Vec<Expander>,
    pub limiters: Vec<Limiter>,
    pub related_content: Vec<RelatedContentOption>,
    pub did_you_mean: Vec<AutoSuggestOption>,
    pub image_quick_view: Vec<ImageQuickViewOption>,
}

impl Info {
    /// Label of the limiter with the given id
    pub fn limiter_label(&self, id: &str) -> Option<&str> {
        self.limiters
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.label.as_str())
    }

    pub fn related_content_default_on(&self, content_type: &str) -> bool {
        self.related_content
            .iter()
            .any(|r| r.content_type == content_type && r.default_on)
    }

    pub fn auto_suggest_default_on(&self) -> bool {
        self.did_you_mean.first().is_some_and(|o| o.default_on)
    }

    pub fn image_quick_view_default_on(&self) -> bool {
        self.image_quick_view.first().is_some_and(|o| o.default_on)
    }
}

/// Formatted citation in one style
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: String,
    pub label: String,
    pub section_label: String,
    /// Formatted citation as returned by the remote
    pub data: String,
    pub caption: String,
}

/// Export payload (RIS)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPayload {
    pub format: String,
    pub data: String,
}

/// Autocomplete endpoint credentials handed out at authentication time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteSettings {
    pub url: String,
    pub token: String,
    /// Token lifetime in seconds
    pub token_timeout: u64,
    pub customer_id: String,
}

impl AutocompleteSettings {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.token.is_empty()
    }
}

/// Result of the authentication exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResult {
    pub token: String,
    /// Token lifetime in seconds
    pub timeout: u64,
    pub autocomplete: Option<AutocompleteSettings>,
}

/// Normalized response, one variant per recognized shape
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Authentication(AuthenticationResult),
    Session(String),
    AutocompleteToken(String),
    Search(Box<SearchResults>),
    Record(Box<Record>),
    Info(Box<Info>),
    Export(ExportPayload),
    Citations(Vec<Citation>),
}

impl ApiResponse {
    /// Variant name, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            ApiResponse::Authentication(_) => "authentication",
            ApiResponse::Session(_) => "session",
            ApiResponse::AutocompleteToken(_) => "autocomplete token",
            ApiResponse::Search(_) => "search",
            ApiResponse::Record(_) => "record",
            ApiResponse::Info(_) => "info",
            ApiResponse::Export(_) => "export",
            ApiResponse::Citations(_) => "citations",
        }
    }
}
