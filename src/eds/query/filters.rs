//! Filter action tokens (`addlimiter`, `addexpander`, `addfacetfilter`)
//!
//! The host application keeps the caller's active filters as the literal
//! action strings the API hands out in facet and limiter catalogs. This module
//! parses those strings, compiles them into wire parameters and marks catalog
//! entries as applied by exact string match.

use tracing::warn;

use super::QueryPlan;
use crate::eds::models::{Expander, Facet, Info, Limiter, LimiterSelection};

/// The three filter mini-languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Limiter,
    Expander,
    FacetFilter,
}

impl FilterKind {
    fn prefix(&self) -> &'static str {
        match self {
            FilterKind::Limiter => "addlimiter(",
            FilterKind::Expander => "addexpander(",
            FilterKind::FacetFilter => "addfacetfilter(",
        }
    }
}

/// One parsed filter action
///
/// The original string is kept verbatim as [`FilterAction::raw`]; it is the
/// identity used to mark catalog entries as applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterAction {
    pub kind: FilterKind,
    /// Limiter id, facet id or expander name
    pub field: String,
    /// Limiter or facet value; expanders have none
    pub value: Option<String>,
    pub raw: String,
}

impl FilterAction {
    /// Parse an action token
    ///
    /// Returns `None` for anything that is not one of the three forms, and for
    /// limiter or facet tokens without a `FIELD:VALUE` body.
    ///
    /// # Example
    ///
    /// ```
    /// use eds_client_rs::eds::query::{FilterAction, FilterKind};
    ///
    /// let action = FilterAction::parse("addlimiter(LA99:English,French)").unwrap();
    /// assert_eq!(action.kind, FilterKind::Limiter);
    /// assert_eq!(action.field, "LA99");
    /// assert_eq!(action.value.as_deref(), Some("English,French"));
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let (kind, body) = [FilterKind::Limiter, FilterKind::Expander, FilterKind::FacetFilter]
            .into_iter()
            .find_map(|kind| trimmed.strip_prefix(kind.prefix()).map(|body| (kind, body)))?;
        let body = body.strip_suffix(')').unwrap_or(body);

        match kind {
            FilterKind::Expander => {
                if body.is_empty() {
                    return None;
                }
                Some(Self {
                    kind,
                    field: body.to_string(),
                    value: None,
                    raw: raw.to_string(),
                })
            }
            FilterKind::Limiter | FilterKind::FacetFilter => {
                let (field, value) = body.split_once(':')?;
                if field.is_empty() {
                    return None;
                }
                Some(Self {
                    kind,
                    field: field.to_string(),
                    value: Some(value.to_string()),
                    raw: raw.to_string(),
                })
            }
        }
    }

    /// `FIELD:VALUE` body of a limiter or facet action
    fn field_and_value(&self) -> String {
        match &self.value {
            Some(value) => format!("{}:{}", self.field, value),
            None => self.field.clone(),
        }
    }
}

/// Filter actions grouped the way the wire format needs them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    limiters: Vec<(String, Vec<String>)>,
    expanders: Vec<String>,
    facets: Vec<(String, Vec<String>)>,
}

impl FilterSet {
    /// Group a list of action strings, skipping the ones that do not parse
    pub fn from_actions<S: AsRef<str>>(actions: &[S]) -> Self {
        let mut set = FilterSet::default();
        for raw in actions {
            let raw = raw.as_ref();
            if raw.trim().is_empty() {
                continue;
            }
            let Some(action) = FilterAction::parse(raw) else {
                warn!(action = raw, "Ignoring unparseable filter action");
                continue;
            };
            match action.kind {
                FilterKind::Limiter => {
                    let value = action.value.clone().unwrap_or_default();
                    push_grouped(&mut set.limiters, &action.field, value);
                }
                FilterKind::Expander => set.expanders.push(action.field),
                FilterKind::FacetFilter => {
                    let body = action.field_and_value();
                    push_grouped(&mut set.facets, &action.field, body);
                }
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty() && self.expanders.is_empty() && self.facets.is_empty()
    }

    /// Append `limiter`, `expander` and `facetfilter` parameters
    ///
    /// Limiters concatenate per field in first-seen order
    /// (`FT:yLA99:English,French`); each facet field becomes its own
    /// `facetfilter` numbered from 1 (`1,SU:Math,SU:History`).
    pub fn apply(&self, plan: &mut QueryPlan) {
        if !self.limiters.is_empty() {
            let limiter: String = self
                .limiters
                .iter()
                .map(|(field, values)| format!("{}:{}", field, values.join(",")))
                .collect();
            plan.push("limiter", limiter);
        }
        if !self.expanders.is_empty() {
            plan.push("expander", self.expanders.join(","));
        }
        for (group_id, (_, bodies)) in self.facets.iter().enumerate() {
            plan.push("facetfilter", format!("{},{}", group_id + 1, bodies.join(",")));
        }
    }
}

fn push_grouped(groups: &mut Vec<(String, Vec<String>)>, field: &str, value: String) {
    match groups.iter_mut().find(|(f, _)| f == field) {
        Some((_, values)) => values.push(value),
        None => groups.push((field.to_string(), vec![value])),
    }
}

/// Presentation form of one active filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFilter {
    pub field: String,
    pub value: String,
    /// The literal action string
    pub action: String,
    /// Limiter label when known, otherwise the field id
    pub display_field: String,
    /// `yes` for `y`, otherwise the value
    pub display_value: String,
}

/// The caller's active filters, described for display and used to mark catalogs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedFilters {
    filters: Vec<AppliedFilter>,
}

impl AppliedFilters {
    /// Describe the active filter actions
    ///
    /// Field labels come from the limiters in `info` when one is given.
    pub fn new<S: AsRef<str>>(actions: &[S], info: Option<&Info>) -> Self {
        let label = |field: &str| {
            info.and_then(|i| i.limiter_label(field))
                .unwrap_or(field)
                .to_string()
        };

        let mut filters = Vec::with_capacity(actions.len());
        for raw in actions {
            let raw: &str = raw.as_ref();
            if raw.is_empty() {
                continue;
            }
            let body = strip_action(raw);
            let filter = if raw.contains(':') {
                let (field, value) = body.split_once(':').unwrap_or((body, ""));
                AppliedFilter {
                    field: field.to_string(),
                    value: value.to_string(),
                    action: raw.to_string(),
                    display_field: label(field),
                    display_value: if value == "y" { "yes".into() } else { value.into() },
                }
            } else if raw.contains("addexpander") {
                AppliedFilter {
                    field: body.to_string(),
                    value: "y".into(),
                    action: raw.to_string(),
                    display_field: label(body),
                    display_value: "yes".into(),
                }
            } else {
                AppliedFilter {
                    field: raw.to_string(),
                    value: raw.to_string(),
                    action: raw.to_string(),
                    display_field: raw.to_string(),
                    display_value: raw.to_string(),
                }
            };
            filters.push(filter);
        }

        Self { filters }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppliedFilter> {
        self.filters.iter()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn contains_action(&self, action: &str) -> bool {
        self.filters.iter().any(|f| f.action == action)
    }

    /// Set `applied` on every facet value whose action is active
    pub fn mark_facets(&self, facets: &mut [Facet]) {
        for facet in facets.iter_mut() {
            for value in facet.values.iter_mut() {
                value.applied = self.contains_action(&value.action);
            }
            facet.applied = facet.values.iter().any(|v| v.applied);
        }
    }

    /// Set `selected` on every expander whose action is active
    pub fn mark_expanders(&self, expanders: &mut [Expander]) {
        for expander in expanders.iter_mut() {
            expander.selected = self.contains_action(&expander.action);
        }
    }

    /// Compute the selection state of each limiter
    ///
    /// Multi-value limiters collect their active value actions, date ranges
    /// take the active action for their id, and single toggles match their
    /// action template with `value` replaced by `y`.
    pub fn mark_limiters(&self, limiters: &mut [Limiter]) {
        for limiter in limiters.iter_mut() {
            limiter.selected = if !limiter.values.is_empty() {
                let mut selected = Vec::new();
                for value in limiter.values.iter_mut() {
                    value.selected = self.contains_action(&value.action);
                    if value.selected {
                        selected.push(value.action.clone());
                    }
                }
                if selected.is_empty() {
                    LimiterSelection::None
                } else {
                    LimiterSelection::Values(selected)
                }
            } else if limiter.limiter_type == "ymrange" {
                self.filters
                    .iter()
                    .find(|f| f.field == limiter.id)
                    .map(|f| LimiterSelection::Range(f.action.clone()))
                    .unwrap_or_default()
            } else if self.contains_action(&limiter.action.replace("value", "y")) {
                LimiterSelection::Toggle
            } else {
                LimiterSelection::None
            };
        }
    }
}

/// Body of an action string with the `addX(` prefix and trailing `)` removed
fn strip_action(raw: &str) -> &str {
    let body = ["addfacetfilter(", "addlimiter(", "addexpander("]
        .iter()
        .find_map(|prefix| raw.strip_prefix(prefix))
        .unwrap_or(raw);
    body.strip_suffix(')').unwrap_or(body)
}
