/*!
 * Tests for application configuration
 */

use anyhow::Result;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use blogflow::app_config::{Config, LogLevel};

use crate::common::{create_temp_dir, create_test_file};

#[test]
fn test_default_config_shouldMatchBackendDefaults() {
    let config = Config::default();

    assert_eq!(config.backend.endpoint, "http://localhost:8000/api");
    assert_eq!(config.backend.timeout(), Duration::from_secs(120));
    assert!(!config.backend.trailing_slash);
    assert_eq!(config.polling.research.interval_ms, 2000);
    assert_eq!(config.polling.research.max_attempts, Some(30));
    assert_eq!(config.polling.content.interval_ms, 5000);
    assert_eq!(config.polling.content.max_attempts, None);
    assert_eq!(config.polling.titles.interval_ms, 5000);
    assert_eq!(config.retry.max_retries, 3);
    assert_eq!(config.retry.backoff_base_ms, 1000);
    assert_eq!(config.formatting.target_length, 20);
    assert!(config.cache.enabled);
    assert_eq!(config.images.slow_notice_secs, 60);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_poll_settings_options_shouldCarryIntervalAndCap() {
    let config = Config::default();

    let research = config.polling.research.options();
    assert_eq!(research.interval, Duration::from_secs(2));
    assert_eq!(research.max_attempts, Some(30));

    let content = config.polling.content.options();
    assert_eq!(content.interval, Duration::from_secs(5));
    assert_eq!(content.max_attempts, None);
}

#[test]
fn test_retry_config_policy_shouldUseBackoffBase() {
    let mut config = Config::default();
    config.retry.backoff_base_ms = 250;

    let policy = config.retry.policy();
    assert_eq!(policy.max_retries, 3);
    assert_eq!(policy.delay_for(1), Duration::from_millis(250));
    assert_eq!(policy.delay_for(3), Duration::from_millis(1000));
}

/// Whether validation rejects the default config after `mutate`
fn rejects(mutate: impl FnOnce(&mut Config)) -> bool {
    let mut config = Config::default();
    mutate(&mut config);
    config.validate().is_err()
}

#[test]
fn test_validate_withInvalidValues_shouldFail() {
    assert!(rejects(|c| c.backend.endpoint = "not a url".to_string()), "bad url");
    assert!(rejects(|c| c.backend.endpoint = "ftp://example.com".to_string()), "ftp scheme");
    assert!(rejects(|c| c.backend.timeout_secs = 0), "zero timeout");
    assert!(rejects(|c| c.polling.content.interval_ms = 0), "zero interval");
    assert!(rejects(|c| c.polling.research.max_attempts = Some(0)), "zero cap");
    assert!(rejects(|c| c.retry.max_retries = 0), "zero retries");
    assert!(rejects(|c| c.formatting.target_length = 0), "zero width");
    assert!(!rejects(|c| c.polling.titles.max_attempts = Some(5)), "positive cap");
}

#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = dir.path().join("nested").join("conf.json");

    let config = Config::load_or_create(&path)?;

    assert_eq!(config, Config::default());
    assert!(path.exists());
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(written["backend"]["endpoint"], "http://localhost:8000/api");
    assert_eq!(written["log_level"], "info");
    Ok(())
}

#[test]
fn test_load_or_create_withPartialFile_shouldFillDefaults() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = create_test_file(
        dir.path(),
        "conf.json",
        r#"{
            "backend": { "endpoint": "https://blog.example.com/api" },
            "polling": { "titles": { "interval_ms": 3000, "max_attempts": 10 } },
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.backend.endpoint, "https://blog.example.com/api");
    assert_eq!(config.backend.timeout_secs, 120);
    assert_eq!(config.polling.titles.interval_ms, 3000);
    assert_eq!(config.polling.titles.max_attempts, Some(10));
    assert_eq!(config.polling.research.max_attempts, Some(30));
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_load_or_create_withInvalidFile_shouldFail() -> Result<()> {
    let dir = create_temp_dir()?;
    let broken = create_test_file(dir.path(), "broken.json", "{ not json")?;
    let invalid = create_test_file(dir.path(), "invalid.json", r#"{"retry": {"max_retries": 0}}"#)?;

    assert!(Config::load_or_create(&broken).is_err());
    assert!(Config::load_or_create(&invalid).is_err());
    Ok(())
}

#[test]
fn test_save_then_load_shouldPreserveCustomValues() -> Result<()> {
    let dir = create_temp_dir()?;
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.backend.trailing_slash = true;
    config.cache.path = Some(PathBuf::from("/tmp/blogflow-cache.json"));
    config.save(&path)?;

    let loaded = Config::load_or_create(&path)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.cache_path(), Some(PathBuf::from("/tmp/blogflow-cache.json")));
    Ok(())
}

#[test]
fn test_log_level_from_str_shouldAcceptAliasesCaseInsensitively() {
    assert_eq!(LogLevel::from_str("WARNING").unwrap(), LogLevel::Warn);
    assert_eq!(LogLevel::from_str("Trace").unwrap(), LogLevel::Trace);
    assert_eq!(LogLevel::Error.to_level_filter(), log::LevelFilter::Error);
    assert!(LogLevel::from_str("verbose").is_err());
}
