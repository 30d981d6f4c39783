//! Rewrites EDS inline markup into sanitized HTML
//!
//! Item data and full text arrive with a proprietary tag vocabulary
//! (`<highlight>`, `<searchLink>`, `<bibl>`, ...). The rewrite is textual: an
//! ordered replacement table, a handful of regex repairs, link synthesis, and
//! finally an allow-list sanitizer. The order matters. Tags are renamed before
//! links are synthesized, and sanitizing comes last so synthesized anchors are
//! checked by the same policy as everything else.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use ammonia::Builder;
use quick_xml::escape::resolve_html5_entity;
use regex::{Captures, Regex};

/// Ordered tag renames; earlier rows win
const TAG_RENAMES: &[(&str, &str)] = &[
    ("<jsection", "<section"),
    ("</jsection", "</section"),
    ("<highlight", "<span class=\"highlight\""),
    ("<highligh", "<span class=\"highlight\""),
    ("</highlight>", "</span>"),
    ("</highligh", "</span"),
    ("<text", "<div"),
    ("</text", "</div"),
    ("<title", "<h2"),
    ("</title", "</h2"),
    ("<anid", "<p"),
    ("</anid", "</p"),
    ("<aug", "<p class=\"aug\""),
    ("</aug", "</p"),
    ("<hd", "<h3"),
    ("</hd", "</h3"),
    ("<linebr", "<br"),
    ("</linebr", ""),
    ("<olist", "<ol"),
    ("</olist", "</ol"),
    ("<reflink", "<a"),
    ("</reflink", "</a"),
    ("<blist", "<p class=\"blist\""),
    ("</blist", "</p"),
    ("<bibl", "<a"),
    ("</bibl", "</a"),
    ("<bibtext", "<span"),
    ("</bibtext", "</span"),
    ("<ref", "<div class=\"ref\""),
    ("</ref", "</div"),
    ("<ulink", "<a"),
    ("</ulink", "</a"),
    ("<superscript", "<sup"),
    ("</superscript", "</sup"),
    ("<relatesTo", "<sup"),
    ("</relatesTo", "</sup"),
];

/// Tags that survive sanitizing
const ALLOWED_TAGS: &[&str] = &[
    "a", "b", "br", "div", "em", "h2", "h3", "h4", "i", "li", "ol", "p", "section", "span",
    "strong", "sub", "sup", "u", "ul",
];

/// Search type used in synthesized links for a field group
fn search_type(group: &str) -> Option<&'static str> {
    match group {
        "au" => Some("Author"),
        "su" => Some("Subject"),
        _ => None,
    }
}

/// Settings for search-link synthesis
#[derive(Debug, Clone)]
pub struct MarkupOptions {
    /// Path of the host's results page, e.g. `/ebsco/results`
    pub results_path: String,
    /// Field groups (lowercase) whose search links become anchors
    pub search_link_groups: Vec<String>,
}

impl Default for MarkupOptions {
    fn default() -> Self {
        Self {
            results_path: "/ebsco/results".to_string(),
            search_link_groups: vec!["au".to_string()],
        }
    }
}

struct Patterns {
    entity: Regex,
    unclosed_highlight: Regex,
    doubled_span_close: Regex,
    unclosed_search_link: Regex,
    doubled_search_link_close: Regex,
    search_link: Regex,
    bibl_idref: Regex,
    bibl_id_idref: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |pattern: &str| Regex::new(pattern).expect("Failed to compile markup regex");
        Patterns {
            entity: re(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);"),
            unclosed_highlight: re(r"</highlight"),
            doubled_span_close: re(r"</span>>"),
            unclosed_search_link: re(r"</searchLink"),
            doubled_search_link_close: re(r"</searchLink>>"),
            search_link: re(r#"<searchLink fieldCode="([^"]*)" term="%22([^"]*)%22">"#),
            bibl_idref: re(r#"<a idref="([^"]*)""#),
            bibl_id_idref: re(r#"<a id="([^"]*)" idref="([^"]*)" type="([^"]*)""#),
        }
    })
}

/// Decode HTML character references, leaving unknown ones untouched
pub fn decode_entities(input: &str) -> String {
    patterns()
        .entity
        .replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else {
                resolve_html5_entity(name).map(str::to_string)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Repair unclosed tags, then apply the rename table
fn rename_tags(input: &str) -> String {
    let p = patterns();
    let data = p.unclosed_highlight.replace_all(input, "</span>");
    let data = p.doubled_span_close.replace_all(&data, "</span>");
    let data = p.unclosed_search_link.replace_all(&data, "</searchLink>");
    let mut data = p
        .doubled_search_link_close
        .replace_all(&data, "</searchLink>")
        .into_owned();

    for &(from, to) in TAG_RENAMES {
        if data.contains(from) {
            data = data.replace(from, to);
        }
    }
    data
}

/// Turn search links into anchors (allowed groups) or plain spans
fn rewrite_search_links(input: &str, group: Option<&str>, options: &MarkupOptions) -> String {
    let p = patterns();
    let mut data = input.to_string();

    if let Some(group) = group.map(str::to_lowercase) {
        let allowed = options.search_link_groups.iter().any(|g| g.eq_ignore_ascii_case(&group));
        if let (true, Some(kind)) = (allowed, search_type(&group)) {
            let results_path = options.results_path.as_str();
            data = p
                .search_link
                .replace_all(&data, |caps: &Captures| {
                    format!(
                        "<a href=\"{}?type={}&lookfor={}\">",
                        results_path, kind, &caps[2]
                    )
                })
                .into_owned();
            data = data.replace("</searchLink>", "</a>");
        }
    }

    let data = p.search_link.replace_all(&data, "<span>");
    data.replace("</searchLink>", "</span>")
}

/// Rewrite bibliography cross references into fragment links
fn rewrite_bibliography(input: &str) -> String {
    let p = patterns();
    let data = p.bibl_idref.replace_all(input, "<a href=\"#$1\"");
    p.bibl_id_idref
        .replace_all(&data, "<a id=\"$1\" href=\"#$2\"")
        .into_owned()
}

fn sanitizer() -> &'static Builder<'static> {
    static SANITIZER: OnceLock<Builder<'static>> = OnceLock::new();
    SANITIZER.get_or_init(|| {
        let tags: HashSet<&str> = ALLOWED_TAGS.iter().copied().collect();
        let generic: HashSet<&str> = ["class"].into_iter().collect();
        let mut tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
        tag_attributes.insert("a", ["href", "id", "title"].into_iter().collect());

        let mut builder = Builder::default();
        builder
            .tags(tags)
            .generic_attributes(generic)
            .tag_attributes(tag_attributes)
            .link_rel(None);
        builder
    })
}

/// Final allow-list pass
fn sanitize(input: &str) -> String {
    sanitizer().clean(input).to_string()
}

/// Convert one rich-text field to sanitized HTML
///
/// # Arguments
///
/// * `data` - Raw field text as it came out of the XML document
/// * `group` - Semantic group of the field (`Au`, `Su`, ...), if any
/// * `options` - Search-link settings
///
/// # Example
///
/// ```
/// use eds_client_rs::eds::markup::{to_html, MarkupOptions};
///
/// let html = to_html("<highlight>result</highlight>", None, &MarkupOptions::default());
/// assert_eq!(html, r#"<span class="highlight">result</span>"#);
/// ```
pub fn to_html(data: &str, group: Option<&str>, options: &MarkupOptions) -> String {
    let decoded = decode_entities(data);
    if decoded.is_empty() {
        return decoded;
    }

    let renamed = rename_tags(&decoded);
    let linked = rewrite_search_links(&renamed, group.filter(|g| !g.is_empty()), options);
    let anchored = rewrite_bibliography(&linked);
    sanitize(&anchored)
}
