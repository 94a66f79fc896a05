use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Model call error: {0}")]
    Model(#[from] ModelError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Stage engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid stage number: {stage} (expected 1-9)")]
    InvalidStageNumber { stage: i64 },

    #[error("Query cannot be empty for stage 1")]
    EmptyQuery,

    #[error("No API credentials configured")]
    MissingCredentials,

    #[error("Model call failed: {0}")]
    Model(#[from] ModelError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Model Call Service errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Quota exceeded: {message}")]
    Quota { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Model unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Task scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Single-tool rule violation: {message}")]
    SingleToolRuleViolation { message: String },

    #[error("Task not found: {task_id}")]
    NotFound { task_id: String },

    #[error("Task failed: {message}")]
    TaskFailed { message: String },

    #[error("Result polling timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Scheduler is shut down")]
    Shutdown,
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for stage engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for model call operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Result type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
