use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::intent::PrimitiveStep;

/// Rejected before any step ran; the interface was not touched.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    EmptyName { field: &'static str },

    #[error("'{name}' is not a valid interface name: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("interface '{name}' does not exist")]
    NotFound { name: String },

    #[error("an interface named '{name}' already exists")]
    NameInUse { name: String },

    #[error("interface '{name}' is not a wireless device")]
    NotWireless { name: String },
}

/// The device table could not be read.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("failed to enumerate interfaces ({context}): {reason}")]
pub struct EnumerationError {
    pub context: String,
    pub reason: String,
}

impl EnumerationError {
    pub fn new(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// A primitive step did not take effect (or cannot be shown to have).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionError {
    #[error("{step}: {diagnostic}")]
    Failed { step: String, diagnostic: String },

    #[error("{step}: timed out after {timeout_ms}ms")]
    Timeout { step: String, timeout_ms: u64 },

    #[error("{step}: reported success but {detail}")]
    PostCondition { step: String, detail: String },
}

impl ExecutionError {
    pub fn failed(step: &PrimitiveStep, diagnostic: impl Into<String>) -> Self {
        Self::Failed {
            step: step.to_string(),
            diagnostic: diagnostic.into(),
        }
    }

    pub fn timeout(step: &PrimitiveStep, after: Duration) -> Self {
        Self::Timeout {
            step: step.to_string(),
            timeout_ms: after.as_millis() as u64,
        }
    }

    /// A timed out step may still have been applied by the kernel.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// A compensating step issued during recovery failed.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("rollback step '{step}' failed: {source}")]
pub struct RollbackError {
    pub step: PrimitiveStep,
    pub source: ExecutionError,
}

/// Errors that stop an intent before its first step.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Enumeration(#[from] EnumerationError),
}
