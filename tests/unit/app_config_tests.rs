/*!
 * Tests for application configuration functionality
 */

use std::collections::HashMap;
use std::time::Duration;

use bilingual_book::app_config::{Config, LogLevel, OutputFormat};
use bilingual_book::errors::ConfigError;
use bilingual_book::translation::Backoff;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.translation.max_concurrency, 5);
    assert_eq!(config.translation.timeout_secs, 60);
    assert_eq!(config.translation.retry_attempts, 3);
    assert_eq!(config.output_format, OutputFormat::Epub);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.paths.state_file_name, "pipeline_state.json");
    assert_eq!(config.converter.program, "magic-pdf");
    assert_eq!(config.renderer.program, "pandoc");
}

#[test]
fn test_default_config_withoutCredentials_shouldFailValidation() {
    let config = Config::default();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::MissingSetting { env: "LLM_API_KEY", .. })
    ));
}

#[test]
fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.translation.max_concurrency, 5);

    // Second load reads the file that was just written
    let reloaded = Config::load_or_create(&path).unwrap();
    assert_eq!(reloaded.paths.output_dir, config.paths.output_dir);
}

#[test]
fn test_loadOrCreate_withPartialFile_shouldFillDefaults() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{"translation": {"model": "qwen-plus", "max_concurrency": 8}, "output_format": "pdf"}"#,
    )
    .unwrap();

    let config = Config::load_or_create(&path).unwrap();
    assert_eq!(config.translation.model, "qwen-plus");
    assert_eq!(config.translation.max_concurrency, 8);
    assert_eq!(config.translation.retry_attempts, 3);
    assert_eq!(config.output_format, OutputFormat::Pdf);
}

#[test]
fn test_loadOrCreate_withInvalidJson_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json").unwrap();
    assert!(Config::load_or_create(&path).is_err());
}

#[test]
fn test_applyOverrides_withEnvironmentValues_shouldReplaceSettings() {
    let mut config = Config::default();
    let env: HashMap<&str, &str> = HashMap::from([
        ("LLM_API_KEY", "sk-test"),
        ("LLM_BASE_URL", "https://api.example.com/v1"),
        ("LLM_MODEL", "deepseek-chat"),
        ("MAX_CONCURRENCY", "2"),
        ("RETRY_ATTEMPTS", ""),
    ]);

    config
        .apply_overrides(|key| env.get(key).map(|value| value.to_string()))
        .unwrap();

    assert_eq!(config.translation.api_key, "sk-test");
    assert_eq!(config.translation.base_url, "https://api.example.com/v1");
    assert_eq!(config.translation.model, "deepseek-chat");
    assert_eq!(config.translation.max_concurrency, 2);
    assert_eq!(config.translation.retry_attempts, 3);
    assert!(config.validate().is_ok());
}

#[test]
fn test_applyOverrides_withNonNumericConcurrency_shouldFail() {
    let mut config = Config::default();
    let result = config.apply_overrides(|key| (key == "MAX_CONCURRENCY").then(|| "many".to_string()));
    assert!(result.is_err());
}

#[test]
fn test_validate_withBadValues_shouldReject() {
    let mut config = common::test_config();
    assert!(config.validate().is_ok());

    config.translation.base_url = "ftp://example.com".to_string();
    assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));

    let mut config = common::test_config();
    config.translation.max_concurrency = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidValue { key: "translation.max_concurrency", .. })
    ));
}

#[test]
fn test_retryPolicy_fromConfig_shouldUseConfiguredDelays() {
    let mut config = common::test_config();
    config.translation.retry_attempts = 4;
    config.translation.rate_limit_backoff_base_ms = 500;

    let policy = config.translation.retry_policy();
    assert_eq!(policy.max_attempts, 4);
    assert_eq!(
        policy.rate_limit_backoff,
        Backoff::Exponential { base: Duration::from_millis(500) }
    );
}
