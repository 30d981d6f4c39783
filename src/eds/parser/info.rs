//! Info (capabilities) decoding

use super::xml::XmlNode;
use crate::eds::models::{
    AutoSuggestOption, Expander, ImageQuickViewOption, Info, Limiter, LimiterSelection,
    LimiterValue, RelatedContentOption, SearchField, SortOption,
};

const CRITERIA: &str = "AvailableSearchCriteria";

fn default_on(node: &XmlNode) -> bool {
    node.child_text("DefaultOn").eq_ignore_ascii_case("y")
}

/// Decode an Info response root
pub(crate) fn parse_info(root: &XmlNode) -> Info {
    Info {
        sorts: root
            .list(&[CRITERIA, "AvailableSorts"], "AvailableSort")
            .into_iter()
            .map(|s| SortOption {
                id: s.child_text("Id"),
                label: s.child_text("Label"),
                action: s.child_text("AddAction"),
            })
            .collect(),
        search_fields: root
            .list(&[CRITERIA, "AvailableSearchFields"], "AvailableSearchField")
            .into_iter()
            .map(|f| SearchField {
                label: f.child_text("Label"),
                code: f.child_text("FieldCode"),
            })
            .collect(),
        expanders: root
            .list(&[CRITERIA, "AvailableExpanders"], "AvailableExpander")
            .into_iter()
            .map(|e| Expander {
                id: e.child_text("Id"),
                label: e.child_text("Label"),
                action: e.child_text("AddAction"),
                selected: false,
            })
            .collect(),
        limiters: root
            .list(&[CRITERIA, "AvailableLimiters"], "AvailableLimiter")
            .into_iter()
            .map(parse_limiter)
            .collect(),
        related_content: root
            .list(&[CRITERIA, "AvailableRelatedContent"], "AvailableRelatedContent")
            .into_iter()
            .map(|r| RelatedContentOption {
                content_type: r.child_text("Type"),
                label: r.child_text("Label"),
                action: r.child_text("AddAction"),
                default_on: default_on(r),
            })
            .collect(),
        did_you_mean: root
            .list(
                &[CRITERIA, "AvailableDidYouMeanOptions"],
                "AvailableDidYouMeanOption",
            )
            .into_iter()
            .map(|o| AutoSuggestOption {
                id: o.child_text("Id"),
                label: o.child_text("Label"),
                default_on: default_on(o),
            })
            .collect(),
        image_quick_view: root
            .list(&["ViewResultSettings"], "IncludeImageQuickView")
            .into_iter()
            .map(|o| ImageQuickViewOption {
                id: o.child_text("Id"),
                label: o.child_text("Label"),
                default_on: default_on(o),
            })
            .collect(),
    }
}

/// Each limiter owns only its own values
fn parse_limiter(node: &XmlNode) -> Limiter {
    Limiter {
        id: node.child_text("Id"),
        label: node.child_text("Label"),
        action: node.child_text("AddAction"),
        limiter_type: node.child_text("Type"),
        values: node
            .list(&["LimiterValues"], "LimiterValue")
            .into_iter()
            .map(|v| LimiterValue {
                value: v.child_text("Value"),
                action: v.child_text("AddAction"),
                selected: false,
            })
            .collect(),
        selected: LimiterSelection::None,
    }
}
