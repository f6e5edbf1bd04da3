//! Error types for honestfast

use thiserror::Error;

use crate::PlanId;

/// Core error type for honestfast operations
#[derive(Debug, Error)]
pub enum FastError {
    #[error("Unknown plan: {0}")]
    UnknownPlan(PlanId),

    #[error("No active fast")]
    NoActiveFast,

    #[error("A fast is already active")]
    FastAlreadyActive,

    #[error("Invalid target duration: {0}h")]
    InvalidTarget(f64),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Host error: {0}")]
    HostError(String),

    #[error("Sync error: {0}")]
    SyncError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FastError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn host(msg: impl Into<String>) -> Self {
        Self::HostError(msg.into())
    }

    pub fn sync(msg: impl Into<String>) -> Self {
        Self::SyncError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FastError>;
