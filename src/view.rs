// src/view.rs
//! View-time interaction over a finished report: category selection, feature
//! and source filters (ANDed) and sort key. The reducer is pure; the document is only read.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::analyze::{FeatureLabel, ScoredRecord};
use crate::ingest::types::Source;
use crate::report::{by_score, ReportDocument};

/// A filter predicate over a record's features or origin.
/// Wire names: `sota`, the feature label names, `source:<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FilterId {
    Sota,
    Feature(FeatureLabel),
    Source(Source),
}

impl FilterId {
    /// Every filter, in display order.
    pub fn all() -> impl Iterator<Item = FilterId> {
        std::iter::once(FilterId::Sota)
            .chain(FeatureLabel::ALL.into_iter().map(FilterId::Feature))
            .chain(Source::ALL.into_iter().map(FilterId::Source))
    }

    pub fn matches(&self, rec: &ScoredRecord) -> bool {
        match self {
            FilterId::Sota => rec.features.sota,
            FilterId::Feature(label) => rec.features.has(*label),
            FilterId::Source(source) => rec.record.source == *source,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterId::Sota => "sota",
            FilterId::Feature(label) => label.as_str(),
            FilterId::Source(Source::Github) => "source:github",
            FilterId::Source(Source::HuggingFace) => "source:huggingface",
            FilterId::Source(Source::Arxiv) => "source:arxiv",
        }
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("sota") {
            return Ok(FilterId::Sota);
        }
        if let Some(name) = s.strip_prefix("source:") {
            return Source::ALL
                .into_iter()
                .find(|src| src.as_str().eq_ignore_ascii_case(name.trim()))
                .map(FilterId::Source)
                .ok_or_else(|| anyhow!("unknown source filter `{s}`"));
        }
        s.parse::<FeatureLabel>()
            .map(FilterId::Feature)
            .map_err(|_| anyhow!("unknown filter `{s}`"))
    }
}

impl TryFrom<String> for FilterId {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        s.parse()
    }
}

impl From<FilterId> for String {
    fn from(f: FilterId) -> String {
        f.as_str().to_string()
    }
}

impl From<FeatureLabel> for FilterId {
    fn from(label: FeatureLabel) -> Self {
        FilterId::Feature(label)
    }
}

impl From<Source> for FilterId {
    fn from(source: Source) -> Self {
        FilterId::Source(source)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Score,
    Stars,
    Date,
}

impl SortKey {
    /// Primary key descending, id ascending on ties.
    pub fn compare(&self, a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
        match self {
            SortKey::Score => by_score(a, b),
            SortKey::Stars => b
                .record
                .metric_primary
                .cmp(&a.record.metric_primary)
                .then_with(|| a.record.id.cmp(&b.record.id)),
            SortKey::Date => b
                .record
                .created_at
                .cmp(&a.record.created_at)
                .then_with(|| a.record.id.cmp(&b.record.id)),
        }
    }
}

/// Transient selection state for one open document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub active_category: Option<String>,
    #[serde(default)]
    pub active_filters: BTreeSet<FilterId>,
    #[serde(default)]
    pub sort_key: SortKey,
}

impl FilterState {
    /// First category selected, no filters, ranked by score.
    pub fn initial(doc: &ReportDocument) -> Self {
        Self {
            active_category: doc.category_names().next().map(str::to_string),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ViewAction {
    SelectCategory { category: String },
    ToggleFilter { filter: FilterId },
    SetSortKey { key: SortKey },
}

/// Apply one transition.
pub fn reduce(mut state: FilterState, action: &ViewAction) -> FilterState {
    match action {
        ViewAction::SelectCategory { category } => {
            state.active_category = Some(category.clone());
        }
        ViewAction::ToggleFilter { filter } => {
            if !state.active_filters.remove(filter) {
                state.active_filters.insert(*filter);
            }
        }
        ViewAction::SetSortKey { key } => state.sort_key = *key,
    }
    state
}

/// Records of the active category passing every active filter, in sort order.
/// Unknown or unset category gives an empty list.
pub fn visible<'a>(doc: &'a ReportDocument, state: &FilterState) -> Vec<&'a ScoredRecord> {
    let Some(records) = state.active_category.as_deref().and_then(|c| doc.category(c)) else {
        return Vec::new();
    };
    let mut out: Vec<&ScoredRecord> = records
        .iter()
        .filter(|r| state.active_filters.iter().all(|f| f.matches(r)))
        .collect();
    out.sort_by(|a, b| state.sort_key.compare(a, b));
    out
}

/// Holds the state for one viewer of one document. Every transition returns
/// the recomputed visible list.
#[derive(Debug, Clone)]
pub struct ViewEngine<'a> {
    doc: &'a ReportDocument,
    state: FilterState,
}

impl<'a> ViewEngine<'a> {
    pub fn new(doc: &'a ReportDocument) -> Self {
        Self {
            doc,
            state: FilterState::initial(doc),
        }
    }

    pub fn with_state(doc: &'a ReportDocument, state: FilterState) -> Self {
        Self { doc, state }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn apply(&mut self, action: &ViewAction) -> Vec<&'a ScoredRecord> {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
        self.visible()
    }

    pub fn select_category(&mut self, category: &str) -> Vec<&'a ScoredRecord> {
        self.apply(&ViewAction::SelectCategory {
            category: category.to_string(),
        })
    }

    pub fn toggle_filter(&mut self, filter: impl Into<FilterId>) -> Vec<&'a ScoredRecord> {
        self.apply(&ViewAction::ToggleFilter {
            filter: filter.into(),
        })
    }

    pub fn set_sort_key(&mut self, key: SortKey) -> Vec<&'a ScoredRecord> {
        self.apply(&ViewAction::SetSortKey { key })
    }

    pub fn visible(&self) -> Vec<&'a ScoredRecord> {
        visible(self.doc, &self.state)
    }
}
