use std::env;

use crate::error::AppError;
use crate::model::Credentials;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider API keys.
    pub credentials: Credentials,
    /// Provider base URLs.
    pub endpoints: EndpointConfig,
    /// HTTP request tuning.
    pub request: RequestConfig,
    /// Task scheduler sizing.
    pub scheduler: SchedulerConfig,
    /// Stage pipeline thresholds.
    pub pipeline: PipelineConfig,
    /// Log level and format.
    pub logging: LoggingConfig,
}

/// Model provider endpoints
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Gemini API base URL.
    pub gemini_base_url: String,
    /// Perplexity API base URL.
    pub perplexity_base_url: String,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout.
    pub timeout_ms: u64,
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub retry_delay_ms: u64,
    /// Prompts above this token estimate are chunked.
    pub chunk_token_limit: usize,
}

/// Task scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Bounded worker pool size.
    pub workers: usize,
    /// Default result-polling timeout.
    pub poll_timeout_ms: u64,
    /// Grace window a completed result stays retrievable after its first
    /// read. Unread results are retained indefinitely.
    pub retention_ms: u64,
}

/// Stage pipeline thresholds
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Nodes below this mean confidence are pruned in stage 5.
    pub prune_threshold: f64,
    /// Label similarity required to group merge candidates.
    pub similarity_threshold: f64,
    /// Impact score a node must exceed for subgraph extraction.
    pub impact_threshold: f64,
    /// Minimum hypotheses generated per dimension.
    pub min_hypotheses: usize,
    /// Maximum hypotheses generated per dimension.
    pub max_hypotheses: usize,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// Structured JSON output.
    Json,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing API keys do not fail the load: credential absence is an
    /// `ExecuteStage` precondition failure, not a configuration error.
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let key = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());

        let credentials = Credentials {
            gemini: key("GEMINI_API_KEY"),
            perplexity: key("PERPLEXITY_API_KEY"),
            openai: key("OPENAI_API_KEY"),
        };

        let endpoints = EndpointConfig {
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            perplexity_base_url: env::var("PERPLEXITY_BASE_URL")
                .unwrap_or_else(|_| "https://api.perplexity.ai".to_string()),
        };

        let request = RequestConfig {
            timeout_ms: parse_env("REQUEST_TIMEOUT_MS", 30000),
            max_retries: parse_env("MAX_RETRIES", 3),
            retry_delay_ms: parse_env("RETRY_DELAY_MS", 1000),
            chunk_token_limit: parse_env("CHUNK_TOKEN_LIMIT", 8000),
        };

        let scheduler = SchedulerConfig {
            workers: parse_env("SCHEDULER_WORKERS", 3),
            poll_timeout_ms: parse_env("SCHEDULER_POLL_TIMEOUT_MS", 30000),
            retention_ms: parse_env("SCHEDULER_RETENTION_MS", 30000),
        };

        let pipeline = PipelineConfig {
            prune_threshold: parse_env("PRUNE_THRESHOLD", 0.2),
            similarity_threshold: parse_env("SIMILARITY_THRESHOLD", 0.75),
            impact_threshold: parse_env("IMPACT_THRESHOLD", 0.6),
            min_hypotheses: parse_env("MIN_HYPOTHESES", 3),
            max_hypotheses: parse_env("MAX_HYPOTHESES", 5),
        };

        if pipeline.min_hypotheses > pipeline.max_hypotheses {
            return Err(AppError::Config {
                message: "MIN_HYPOTHESES must not exceed MAX_HYPOTHESES".to_string(),
            });
        }

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        Ok(Config {
            credentials,
            endpoints,
            request,
            scheduler,
            pipeline,
            logging,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            perplexity_base_url: "https://api.perplexity.ai".to_string(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
            chunk_token_limit: 8000,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            poll_timeout_ms: 30000,
            retention_ms: 30000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prune_threshold: 0.2,
            similarity_threshold: 0.75,
            impact_threshold: 0.6,
            min_hypotheses: 3,
            max_hypotheses: 5,
        }
    }
}
