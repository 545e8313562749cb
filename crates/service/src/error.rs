#![forbid(unsafe_code)]

use pf_core::{DepartmentCodeError, RecordIdError, TemplateLookupError};
use pf_storage::StoreError;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidTemplate,
    AlreadyAssigned,
    InvalidTransition,
    StoreUnavailable,
    Conflict,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InvalidTemplate => "INVALID_TEMPLATE",
            Self::AlreadyAssigned => "ALREADY_ASSIGNED",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::Conflict => "CONFLICT",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Internal => "INTERNAL",
        }
    }

    /// Only infrastructure hiccups and lost races may be retried with the same parameters.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::StoreUnavailable | Self::Conflict)
    }
}

/// Failure surfaced at the workflow boundary: a taxonomy kind, a readable message and the
/// identifiers involved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowError {
    pub kind: ErrorKind,
    pub message: String,
    pub ids: BTreeMap<String, String>,
}

impl WorkflowError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            ids: BTreeMap::new(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn with_id(mut self, key: &str, value: impl Into<String>) -> Self {
        self.ids.insert(key.to_string(), value.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for WorkflowError {}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        if err.is_transient() {
            return Self::new(ErrorKind::StoreUnavailable, message);
        }
        match err {
            StoreError::Io(_) => Self::new(ErrorKind::StoreUnavailable, message),
            StoreError::Sql(_) | StoreError::Corrupt(_) => Self::new(ErrorKind::Internal, message),
            StoreError::InvalidInput(_) => Self::new(ErrorKind::InvalidInput, message),
            StoreError::UnknownId => Self::new(ErrorKind::NotFound, message),
            StoreError::RevisionMismatch { expected, actual } => {
                Self::new(ErrorKind::Conflict, message)
                    .with_id("expected_revision", expected.to_string())
                    .with_id("actual_revision", actual.to_string())
            }
            StoreError::InvalidTemplate { template } => {
                Self::new(ErrorKind::InvalidTemplate, message).with_id("template", template)
            }
            StoreError::AlreadyAssigned {
                post_id,
                department,
                ..
            } => Self::new(ErrorKind::AlreadyAssigned, message)
                .with_id("post_id", post_id)
                .with_id("department", department),
            StoreError::InvalidTransition {
                task_id, from, to, ..
            } => Self::new(ErrorKind::InvalidTransition, message)
                .with_id("task_id", task_id)
                .with_id("from", from)
                .with_id("to", to),
        }
    }
}

impl From<TemplateLookupError> for WorkflowError {
    fn from(err: TemplateLookupError) -> Self {
        let TemplateLookupError::NotFound { query } = &err;
        Self::not_found(err.message()).with_id("template", query.clone())
    }
}

impl From<RecordIdError> for WorkflowError {
    fn from(err: RecordIdError) -> Self {
        Self::invalid_input(format!("invalid id: {}", err.message()))
    }
}

impl From<DepartmentCodeError> for WorkflowError {
    fn from(err: DepartmentCodeError) -> Self {
        Self::invalid_input(format!("invalid department code: {}", err.message()))
    }
}
