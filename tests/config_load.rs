// tests/config_load.rs
//
// Config lookup order and file parsing. Tests touching process env or CWD
// are serialized.

use std::{env, fs};

use bountyfeed::config::{AppConfig, SourceKind, ENV_CONFIG_PATH};
use bountyfeed::ingest::validate::ValidationMode;

const ENV_KEYS: &[&str] = &[
    ENV_CONFIG_PATH,
    "MIN_SCORE",
    "ENABLED_SCANNERS",
    "POLL_INTERVAL_SECONDS",
    "GITHUB_LABELS",
];

fn clear_env() {
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

const SAMPLE: &str = r#"
enabled_sources = ["github", "bountycaster", "github"]
poll_interval_secs = 120
min_score = 70
storage_path = "state/feed.json"
validation_mode = "drop_invalid"
emit_fallback_samples = true

[github]
labels = [" bounty ", "", "polar"]
per_page = 50

[bountycaster]
statuses = ["funded", "open"]

[rate_limit]
disable_sleep = true

[heuristics]
payment_preferences = ["USDC", "PayPal"]

[[heuristics.platform_bonuses]]
patterns = ["gitcoin"]
points = 12
"#;

#[serial_test::serial]
#[test]
fn env_path_is_loaded_and_normalized() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bountyfeed.toml");
    fs::write(&p, SAMPLE).unwrap();
    env::set_var(ENV_CONFIG_PATH, &p);

    let cfg = AppConfig::load_default().unwrap();
    clear_env();

    assert_eq!(cfg.sources(), vec![SourceKind::Github, SourceKind::Bountycaster]);
    assert_eq!(cfg.poll_interval_secs, 120);
    assert_eq!(cfg.min_score, 70);
    assert_eq!(cfg.storage_path, std::path::PathBuf::from("state/feed.json"));
    assert_eq!(cfg.validation_mode, ValidationMode::DropInvalid);
    assert!(cfg.emit_fallback_samples);
    assert_eq!(cfg.github.labels, vec!["bounty".to_string(), "polar".to_string()]);
    assert_eq!(cfg.github.per_page, 50);
    assert_eq!(cfg.github.max_pages, 10);
    assert!(cfg.rate_limit.disable_sleep);

    let h = cfg.heuristics();
    assert_eq!(h.crypto_currencies, vec!["USDC".to_string()]);
    assert_eq!(h.fiat_methods, vec!["PAYPAL".to_string()]);
    assert_eq!(h.platform_bonuses.len(), 1);
    assert_eq!(h.platform_bonuses[0].patterns, vec!["GITCOIN".to_string()]);
}

#[serial_test::serial]
#[test]
fn env_overrides_win_over_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bountyfeed.toml");
    fs::write(&p, SAMPLE).unwrap();
    env::set_var(ENV_CONFIG_PATH, &p);
    env::set_var("MIN_SCORE", "90");
    env::set_var("ENABLED_SCANNERS", "superteam");
    env::set_var("POLL_INTERVAL_SECONDS", "0");

    let cfg = AppConfig::load_default().unwrap();
    clear_env();

    assert_eq!(cfg.min_score, 90);
    assert_eq!(cfg.sources(), vec![SourceKind::Superteam]);
    // Non-positive intervals are ignored.
    assert_eq!(cfg.poll_interval_secs, 120);
}

#[serial_test::serial]
#[test]
fn missing_env_path_is_an_error() {
    clear_env();
    env::set_var(ENV_CONFIG_PATH, "/definitely/not/here.toml");
    let res = AppConfig::load_default();
    clear_env();
    assert!(res.is_err());
}

#[serial_test::serial]
#[test]
fn falls_back_to_cwd_file_then_defaults() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // Nothing on disk: built-in defaults.
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.min_score, 60);
    assert_eq!(cfg.github.per_page, 100);

    fs::create_dir_all("config").unwrap();
    fs::write("config/bountyfeed.toml", "min_score = 33\n").unwrap();
    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.min_score, 33);

    env::set_current_dir(old).unwrap();
}

#[test]
fn unknown_sources_only_is_fatal() {
    let cfg = AppConfig::from_toml_str("enabled_sources = [\"reddit\", \"\"]").unwrap();
    assert!(cfg.sources().is_empty());
    assert!(cfg.check().is_err());
}

#[test]
fn malformed_toml_is_rejected() {
    assert!(AppConfig::from_toml_str("min_score = \"high\"").is_err());
    assert!(AppConfig::from_toml_str("[github\nlabels = 1").is_err());
}
