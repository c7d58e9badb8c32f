//! Error types for the admin engine

use thiserror::Error;

/// Errors that can occur while discovering, configuring or querying record sets
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Entity type not found in the model: {0}")]
    EntityNotFound(String),

    #[error("Primary key not found: {0}")]
    PrimaryKeyNotFound(String),

    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("Set not found: {0}")]
    SetNotFound(String),

    #[error("Policy not found: {0}")]
    PolicyNotFound(String),

    #[error("Query provider error: {0}")]
    Provider(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AdminError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn entity_not_found(msg: impl Into<String>) -> Self {
        Self::EntityNotFound(msg.into())
    }

    pub fn primary_key_not_found(msg: impl Into<String>) -> Self {
        Self::PrimaryKeyNotFound(msg.into())
    }

    pub fn context_not_found(msg: impl Into<String>) -> Self {
        Self::ContextNotFound(msg.into())
    }

    pub fn set_not_found(msg: impl Into<String>) -> Self {
        Self::SetNotFound(msg.into())
    }

    pub fn policy_not_found(msg: impl Into<String>) -> Self {
        Self::PolicyNotFound(msg.into())
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AdminError>;
