//! Error types shared across the dispatching core.

use thiserror::Error;

/// Errors raised by the core domain services (queue manager, charging
/// service, billing engine, identity service).
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not_found: {entity} {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("auth: {0}")]
    Auth(String),

    #[error("capacity: {0}")]
    Capacity(String),

    #[error("state: {0}")]
    State(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl DomainError {
    /// The wire-surface error kind name used by the router's response.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::NotFound { .. } => "not_found",
            Self::Auth(_) => "auth",
            Self::Capacity(_) => "capacity",
            Self::State(_) => "state",
            Self::Internal(_) => "internal",
        }
    }
}

/// Errors raised by ambient infrastructure (the store backends, config
/// loading). Kept separate from [`DomainError`] the way the reference
/// stack separates domain errors from infrastructure errors.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for infrastructure operations.
pub type InfraResult<T> = Result<T, InfraError>;
