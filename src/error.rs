//! Error types for engine operations and API responses.

use crate::store::StoreError;
use crate::types::{ItemId, ProjectId};
use serde::Serialize;
use std::fmt;

/// Failures of the tree engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("parent item {parent_id} not found in project {project_id}")]
    ParentNotFound {
        project_id: ProjectId,
        parent_id: ItemId,
    },

    #[error("item not found: {0}")]
    NotFound(ItemId),

    #[error("invalid depth {0}: expected 1..=4")]
    InvalidDepth(i64),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl EngineError {
    /// Only storage failures are worth retrying; everything else is a caller error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable(_))
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(err: rusqlite::Error) -> Self {
        EngineError::StoreUnavailable(StoreError::Sqlite(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidDepth,
    InvalidFieldValue,

    // Not found errors
    NotFound,
    ParentNotFound,

    // Internal errors
    StoreUnavailable,
    InternalError,
}

/// Structured error for API responses.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
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

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// Whether the client may retry the same request.
    pub fn is_retryable(&self) -> bool {
        self.code == ErrorCode::StoreUnavailable
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::ParentNotFound { parent_id, .. } => {
                ApiError::new(ErrorCode::ParentNotFound, err.to_string())
                    .with_field("parent_id")
                    .with_details(parent_id.to_string())
            }
            EngineError::NotFound(_) => ApiError::new(ErrorCode::NotFound, err.to_string()),
            EngineError::InvalidDepth(_) => {
                ApiError::new(ErrorCode::InvalidDepth, err.to_string()).with_field("depth")
            }
            EngineError::StoreUnavailable(ref inner) => {
                ApiError::new(ErrorCode::StoreUnavailable, "store unavailable")
                    .with_details(inner.to_string())
            }
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(engine_err) => engine_err.into(),
            Err(err) => ApiError::internal(err),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
