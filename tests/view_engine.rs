// tests/view_engine.rs
//
// Report interaction over an assembled document: filters AND together,
// toggles are involutions, sort keys are deterministic.

use chrono::{TimeZone, Utc};
use std::collections::BTreeMap;

use ts_trend_scanner::analyze::{FeatureLabel, FeatureSet, ScoredRecord};
use ts_trend_scanner::ingest::normalize::NormalizedRecord;
use ts_trend_scanner::ingest::types::Source;
use ts_trend_scanner::report::assemble;
use ts_trend_scanner::view::{reduce, visible, FilterId, FilterState, SortKey, ViewAction, ViewEngine};

fn scored(id: &str, score: f64, stars: u64, day: u32, labels: &[FeatureLabel]) -> ScoredRecord {
    let mut features = FeatureSet::default();
    for l in labels {
        features.insert(*l);
    }
    ScoredRecord {
        record: NormalizedRecord {
            id: id.to_string(),
            source: Source::Github,
            title: id.to_string(),
            text: String::new(),
            tags: vec![],
            author: None,
            url: format!("https://github.com/{id}"),
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap(),
            metric_primary: stars,
            age_days: 10,
            category: "Forecasting".into(),
        },
        features,
        velocity: 0.0,
        trend_score: score,
    }
}

fn five() -> Vec<ScoredRecord> {
    vec![
        scored("r1", 10.0, 100, 1, &[]),
        scored("r2", 40.0, 5, 2, &[FeatureLabel::Docker]),
        scored("r3", 30.0, 60, 3, &[FeatureLabel::Gpu]),
        scored("r4", 20.0, 500, 4, &[FeatureLabel::Docker, FeatureLabel::Gpu]),
        scored("r5", 50.0, 1, 5, &[FeatureLabel::Pip]),
    ]
}

fn ids(list: &[&ScoredRecord]) -> Vec<String> {
    list.iter().map(|r| r.record.id.clone()).collect()
}

#[test]
fn docker_filter_keeps_exactly_the_two_docker_records() {
    let doc = assemble(&["Forecasting".into()], five(), BTreeMap::new(), vec![], Utc::now());
    let mut engine = ViewEngine::new(&doc);

    assert_eq!(ids(&engine.toggle_filter(FeatureLabel::Docker)), vec!["r2", "r4"]);
    assert_eq!(ids(&engine.set_sort_key(SortKey::Stars)), vec!["r4", "r2"]);
    assert_eq!(ids(&engine.set_sort_key(SortKey::Date)), vec!["r4", "r2"]);
    assert_eq!(ids(&engine.toggle_filter(FeatureLabel::Gpu)), vec!["r4"]);
}

#[test]
fn double_toggle_restores_the_list() {
    let doc = assemble(&["Forecasting".into()], five(), BTreeMap::new(), vec![], Utc::now());
    let start = FilterState::initial(&doc);
    let base = ids(&visible(&doc, &start));
    assert_eq!(base, vec!["r5", "r2", "r3", "r4", "r1"]);

    for f in [FilterId::Sota, FilterId::Feature(FeatureLabel::Gpu)] {
        let action = ViewAction::ToggleFilter { filter: f };
        let twice = reduce(reduce(start.clone(), &action), &action);
        assert_eq!(twice, start);
        assert_eq!(ids(&visible(&doc, &twice)), base);
    }
}

#[test]
fn equal_keys_fall_back_to_id() {
    let recs = vec![
        scored("b", 1.0, 7, 9, &[]),
        scored("a", 1.0, 7, 9, &[]),
        scored("c", 1.0, 7, 9, &[]),
    ];
    let doc = assemble(&["Forecasting".into()], recs, BTreeMap::new(), vec![], Utc::now());
    for key in [SortKey::Score, SortKey::Stars, SortKey::Date] {
        let state = FilterState {
            active_category: Some("Forecasting".into()),
            sort_key: key,
            ..Default::default()
        };
        assert_eq!(ids(&visible(&doc, &state)), vec!["a", "b", "c"], "{key:?}");
    }
}

#[test]
fn empty_document_has_no_active_category() {
    let doc = assemble(&[], vec![], BTreeMap::new(), vec![], Utc::now());
    let engine = ViewEngine::new(&doc);
    assert_eq!(engine.state().active_category, None);
    assert!(engine.visible().is_empty());
}

#[test]
fn source_filter_ands_with_feature_filters() {
    let mut recs = five();
    recs[1].record.source = Source::HuggingFace;
    recs[3].record.source = Source::Arxiv;
    recs[4].record.source = Source::HuggingFace;
    let doc = assemble(&["Forecasting".into()], recs, BTreeMap::new(), vec![], Utc::now());
    let mut engine = ViewEngine::new(&doc);

    assert_eq!(ids(&engine.toggle_filter(Source::HuggingFace)), vec!["r5", "r2"]);
    assert_eq!(ids(&engine.toggle_filter(FeatureLabel::Docker)), vec!["r2"]);
    engine.toggle_filter(Source::HuggingFace);
    assert_eq!(ids(&engine.toggle_filter(Source::Arxiv)), vec!["r4"]);

    let action: ViewAction =
        serde_json::from_str(r#"{"action":"toggle_filter","filter":"source:arxiv"}"#).unwrap();
    assert_eq!(ids(&engine.apply(&action)), vec!["r2", "r4"]);
    assert!(engine
        .state()
        .active_filters
        .iter()
        .all(|f| *f == FilterId::Feature(FeatureLabel::Docker)));
}
