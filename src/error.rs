//! Structured error types for task tree operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or missing input: blank title, bad status or date, unknown advice kind.
    InvalidArgument,
    /// Referenced id does not exist (update and soft delete only).
    NotFound,
    /// Advice provider misconfigured or unreachable.
    UpstreamUnavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Structured error returned by the tree service and its collaborators.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct TreeError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TreeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::InvalidArgument, format!("{} is required", field)).with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, reason).with_field(field)
    }

    pub fn task_not_found(task_id: &str) -> Self {
        Self::new(ErrorCode::NotFound, format!("Task not found: {}", task_id))
    }

    pub fn upstream(code: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UpstreamUnavailable, message).with_details(code)
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::Internal, err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    /// Message safe to hand to an end user. Internal causes stay in the logs.
    pub fn public_message(&self) -> &str {
        match self.code {
            ErrorCode::Internal => "Internal error",
            _ => &self.message,
        }
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for TreeError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<TreeError>() {
            Ok(tree_err) => tree_err,
            Err(err) => {
                tracing::error!(error = %err, "Unexpected failure");
                TreeError::internal(err)
            }
        }
    }
}

impl From<rusqlite::Error> for TreeError {
    fn from(err: rusqlite::Error) -> Self {
        tracing::error!(error = %err, "Database failure");
        TreeError::internal(err)
    }
}

/// Result type for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;
