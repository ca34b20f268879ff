//! Error types for the lead intake service.

use std::time::Duration;

use crate::pipeline::types::FieldErrors;

/// Top-level error type for the service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Store rejected the write: {0}")]
    Rejected(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store did not answer within {0:?}")]
    Timeout(Duration),
}

/// Email dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("Failed to set up {provider} client: {reason}")]
    Client { provider: String, reason: String },

    #[error("Provider {provider} request failed: {reason}")]
    SendFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    Rejected {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Email send did not finish within {0:?}")]
    Timeout(Duration),
}

/// Ways a submission can be refused. Each maps to one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("Rate limit exceeded for {client}")]
    RateLimited { client: String },

    #[error("Validation failed on {} field(s)", .0.len())]
    ValidationFailed(FieldErrors),

    #[error("Storage failed: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;
