// tests/config_loading.rs
//
// Startup configuration: env path, then ./config/, then built-ins.

use std::{env, fs};

use ts_trend_scanner::analyze::{Analyzer, FeatureLabel, FeatureRules, ScoringWeights};

fn clear_env() {
    for k in ["FEATURES_CONFIG_PATH", "WEIGHTS_CONFIG_PATH", "CATEGORIES_CONFIG_PATH"] {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn builtins_when_nothing_is_configured() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    assert_eq!(FeatureRules::load_default().unwrap(), FeatureRules::default_seed());
    assert_eq!(ScoringWeights::load_default().unwrap(), ScoringWeights::default());
    let analyzer = Analyzer::from_config().unwrap();
    assert_eq!(analyzer.weights, ScoringWeights::default());

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn env_paths_take_precedence() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // ./config/ fallback
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("weights.json"), r#"{"sota_multiplier": 2.0}"#).unwrap();
    assert_eq!(ScoringWeights::load_default().unwrap().sota_multiplier, 2.0);

    // env wins
    let w = tmp.path().join("w.json");
    fs::write(&w, r#"{"w_base": 1.0, "w_velocity": 0.0, "sota_multiplier": 1.5}"#).unwrap();
    env::set_var("WEIGHTS_CONFIG_PATH", w.display().to_string());

    let f = tmp.path().join("features.toml");
    fs::write(
        &f,
        r#"
[labels.gpu]
contains = ["tpu"]

[sota]
regex = ['\bbest\b']
"#,
    )
    .unwrap();
    env::set_var("FEATURES_CONFIG_PATH", f.display().to_string());

    let analyzer = Analyzer::from_config().unwrap();
    assert_eq!(analyzer.weights.w_base, 1.0);
    let fs_ = analyzer.extractor.extract("Runs on TPU, best in class", &[]);
    assert!(fs_.has(FeatureLabel::Gpu));
    assert!(fs_.sota);
    assert!(!analyzer.extractor.extract("docker", &[]).has(FeatureLabel::Docker));

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn missing_env_target_is_an_error() {
    clear_env();
    env::set_var("FEATURES_CONFIG_PATH", "/definitely/not/here.toml");
    assert!(Analyzer::from_config().is_err());
    env::set_var("WEIGHTS_CONFIG_PATH", "/definitely/not/here.json");
    assert!(ScoringWeights::load_default().is_err());
    clear_env();
}

#[serial_test::serial]
#[test]
fn broken_regex_fails_at_startup() {
    let tmp = tempfile::tempdir().unwrap();
    let f = tmp.path().join("features.toml");
    fs::write(&f, "[labels.docker]\nregex = ['(unclosed']\n").unwrap();
    clear_env();
    env::set_var("FEATURES_CONFIG_PATH", f.display().to_string());
    let err = Analyzer::from_config().unwrap_err();
    assert!(format!("{err:#}").contains("docker"));
    clear_env();
}
