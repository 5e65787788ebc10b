// src/report/mod.rs
//! Report assembly: per-category buckets, dedup, default ranking, run log.

pub mod html;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::analyze::ScoredRecord;
use crate::ingest::types::{ErrorEntry, Source, SourceCounts};

pub use html::render_html;

/// One category bucket, ranked by trend score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryReport {
    pub name: String,
    pub records: Vec<ScoredRecord>,
}

/// The assembled, immutable result of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub generated_at: DateTime<Utc>,
    pub per_source_counts: BTreeMap<Source, SourceCounts>,
    /// Buckets in configured category order. A record may sit in several.
    pub per_category: Vec<CategoryReport>,
    pub errors: Vec<ErrorEntry>,
}

impl ReportDocument {
    pub fn category(&self, name: &str) -> Option<&[ScoredRecord]> {
        self.per_category
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.records.as_slice())
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.per_category.iter().map(|c| c.name.as_str())
    }

    pub fn total_records(&self) -> usize {
        self.per_category.iter().map(|c| c.records.len()).sum()
    }

    /// Every source failed outright.
    pub fn all_sources_failed(&self) -> bool {
        !self.per_source_counts.is_empty()
            && self.per_source_counts.values().all(|c| !c.succeeded())
    }

    /// Single list across categories, deduplicated by id with the same
    /// keep-the-better rule, ranked by score.
    pub fn global_ranking(&self) -> Vec<&ScoredRecord> {
        let mut best: HashMap<&str, &ScoredRecord> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for rec in self.per_category.iter().flat_map(|c| c.records.iter()) {
            let id = rec.record.id.as_str();
            let replace = match best.get(id) {
                Some(kept) => is_better(rec, kept),
                None => {
                    order.push(id);
                    true
                }
            };
            if replace {
                best.insert(id, rec);
            }
        }
        let mut out: Vec<&ScoredRecord> = order.iter().filter_map(|id| best.get(id).copied()).collect();
        out.sort_by(|a, b| by_score(a, b));
        out
    }
}

/// `a` should replace `b`: higher score, or equal score and newer.
pub fn is_better(a: &ScoredRecord, b: &ScoredRecord) -> bool {
    match a.trend_score.total_cmp(&b.trend_score) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => a.record.created_at > b.record.created_at,
    }
}

/// Score descending, id ascending.
pub fn by_score(a: &ScoredRecord, b: &ScoredRecord) -> Ordering {
    b.trend_score
        .total_cmp(&a.trend_score)
        .then_with(|| a.record.id.cmp(&b.record.id))
}

/// Drop repeated ids, keeping the better entry in the first entry's slot.
pub fn dedup_keep_best(records: Vec<ScoredRecord>) -> (Vec<ScoredRecord>, usize) {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<ScoredRecord> = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for rec in records {
        match index.get(&rec.record.id) {
            Some(&i) => {
                dropped += 1;
                if is_better(&rec, &kept[i]) {
                    kept[i] = rec;
                }
            }
            None => {
                index.insert(rec.record.id.clone(), kept.len());
                kept.push(rec);
            }
        }
    }
    (kept, dropped)
}

/// Build the document. `category_order` fixes bucket order; categories seen
/// only on records are appended after it.
pub fn assemble(
    category_order: &[String],
    scored: Vec<ScoredRecord>,
    per_source_counts: BTreeMap<Source, SourceCounts>,
    errors: Vec<ErrorEntry>,
    generated_at: DateTime<Utc>,
) -> ReportDocument {
    let mut names: Vec<String> = category_order.to_vec();
    let mut buckets: HashMap<String, Vec<ScoredRecord>> = HashMap::new();
    for rec in scored {
        if !buckets.contains_key(&rec.record.category) && !names.contains(&rec.record.category) {
            names.push(rec.record.category.clone());
        }
        buckets
            .entry(rec.record.category.clone())
            .or_default()
            .push(rec);
    }

    let per_category = names
        .into_iter()
        .map(|name| {
            let (mut records, dropped) = dedup_keep_best(buckets.remove(&name).unwrap_or_default());
            if dropped > 0 {
                tracing::debug!(category = %name, dropped, "duplicate ids removed");
            }
            records.sort_by(by_score);
            CategoryReport { name, records }
        })
        .collect();

    ReportDocument {
        generated_at,
        per_source_counts,
        per_category,
        errors,
    }
}
