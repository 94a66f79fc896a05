//! Configuration loading tests. Environment mutation requires serial
//! execution.

use std::env;

use serial_test::serial;

use asr_got_pipeline::config::{Config, LogFormat};

const ALL_VARS: &[&str] = &[
    "GEMINI_API_KEY",
    "PERPLEXITY_API_KEY",
    "OPENAI_API_KEY",
    "GEMINI_BASE_URL",
    "PERPLEXITY_BASE_URL",
    "REQUEST_TIMEOUT_MS",
    "MAX_RETRIES",
    "RETRY_DELAY_MS",
    "CHUNK_TOKEN_LIMIT",
    "SCHEDULER_WORKERS",
    "SCHEDULER_POLL_TIMEOUT_MS",
    "SCHEDULER_RETENTION_MS",
    "PRUNE_THRESHOLD",
    "SIMILARITY_THRESHOLD",
    "IMPACT_THRESHOLD",
    "MIN_HYPOTHESES",
    "MAX_HYPOTHESES",
    "LOG_LEVEL",
    "LOG_FORMAT",
];

fn clear_env() {
    for var in ALL_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_apply_without_environment() {
    clear_env();
    let config = Config::from_env().unwrap();

    // Missing keys do not fail the load
    assert!(!config.credentials.has_any());

    assert_eq!(config.request.timeout_ms, 30000);
    assert_eq!(config.request.max_retries, 3);
    assert_eq!(config.request.chunk_token_limit, 8000);

    assert_eq!(config.scheduler.workers, 3);
    assert_eq!(config.scheduler.poll_timeout_ms, 30000);
    assert_eq!(config.scheduler.retention_ms, 30000);

    assert!((config.pipeline.prune_threshold - 0.2).abs() < 1e-9);
    assert!((config.pipeline.similarity_threshold - 0.75).abs() < 1e-9);
    assert!((config.pipeline.impact_threshold - 0.6).abs() < 1e-9);
    assert_eq!(config.pipeline.min_hypotheses, 3);
    assert_eq!(config.pipeline.max_hypotheses, 5);

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
#[serial]
fn environment_overrides_are_honored() {
    clear_env();
    env::set_var("GEMINI_API_KEY", "gk-123");
    env::set_var("SCHEDULER_WORKERS", "5");
    env::set_var("PRUNE_THRESHOLD", "0.35");
    env::set_var("LOG_FORMAT", "json");
    env::set_var("GEMINI_BASE_URL", "http://localhost:9999");

    let config = Config::from_env().unwrap();
    assert_eq!(config.credentials.gemini.as_deref(), Some("gk-123"));
    assert!(config.credentials.has_any());
    assert_eq!(config.scheduler.workers, 5);
    assert!((config.pipeline.prune_threshold - 0.35).abs() < 1e-9);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.endpoints.gemini_base_url, "http://localhost:9999");

    clear_env();
}

#[test]
#[serial]
fn blank_api_keys_count_as_missing() {
    clear_env();
    env::set_var("GEMINI_API_KEY", "   ");

    let config = Config::from_env().unwrap();
    assert!(config.credentials.gemini.is_none());
    assert!(!config.credentials.has_any());

    clear_env();
}

#[test]
#[serial]
fn unparseable_numbers_fall_back_to_defaults() {
    clear_env();
    env::set_var("SCHEDULER_WORKERS", "many");
    env::set_var("REQUEST_TIMEOUT_MS", "soon");

    let config = Config::from_env().unwrap();
    assert_eq!(config.scheduler.workers, 3);
    assert_eq!(config.request.timeout_ms, 30000);

    clear_env();
}

#[test]
#[serial]
fn inverted_hypothesis_bounds_are_a_config_error() {
    clear_env();
    env::set_var("MIN_HYPOTHESES", "6");
    env::set_var("MAX_HYPOTHESES", "4");

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("MIN_HYPOTHESES"));

    clear_env();
}
