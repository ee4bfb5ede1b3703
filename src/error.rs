use thiserror::Error;
use uuid::Uuid;

/// Main error type for the pension service
#[derive(Error, Debug)]
pub enum PensionError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Infrastructure errors
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Broker error: {0}")]
    Broker(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Domain errors
    #[error("{0}")]
    NotFound(#[from] NotFound),

    #[error("{0}")]
    Conflict(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unsupported plan type: {0}")]
    UnsupportedPlanType(String),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for PensionError
pub type Result<T> = std::result::Result<T, PensionError>;

/// Lookup failures, one per resolution step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    #[error("User not found")]
    User,

    #[error("This contract number does not exist or is not related to this Pension Plan")]
    PensionPlan,

    #[error("Withdrawal {0} not found")]
    Withdrawal(Uuid),

    #[error("Transactions not found")]
    Transaction,
}

impl PensionError {
    /// Whether a failed message should be redelivered.
    ///
    /// Domain errors are terminal for the call; infrastructure errors may be
    /// transient (storage, cache or broker briefly unavailable).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PensionError::Database(_)
                | PensionError::Migration(_)
                | PensionError::Cache(_)
                | PensionError::Broker(_)
                | PensionError::Io(_)
                | PensionError::Internal(_)
        )
    }
}

impl From<redis::RedisError> for PensionError {
    fn from(err: redis::RedisError) -> Self {
        PensionError::Cache(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for PensionError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        PensionError::Cache(err.to_string())
    }
}
