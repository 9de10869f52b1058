use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by portal operations.
///
/// Coercion problems never show up here: the sanitizer degrades bad values to
/// their zero value. What does show up is caller misuse (`Usage`), requests
/// that cannot be read at all, and failures of the external stores.
#[derive(Error, Debug)]
pub enum PortalError {
    /// The request was understood but cannot be carried out as asked.
    #[error("{0}")]
    Usage(String),

    /// The request body could not be read as a payload.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// No authenticated principal.
    #[error("Authentication required")]
    Unauthenticated,

    /// The addressed document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request conflicts with existing state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The document or blob store failed.
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl PortalError {
    /// Convenience constructor for usage errors.
    pub fn usage(message: impl Into<String>) -> Self {
        PortalError::Usage(message.into())
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::Usage(_) | PortalError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            PortalError::Unauthenticated => StatusCode::UNAUTHORIZED,
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Conflict(_) => StatusCode::CONFLICT,
            PortalError::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<StoreError> for PortalError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { path } => PortalError::NotFound(path),
            other => PortalError::Store(other),
        }
    }
}

impl From<Violation> for PortalError {
    fn from(v: Violation) -> Self {
        match v.kind {
            ViolationKind::Unauthenticated => PortalError::Unauthenticated,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// A policy violation detected at the request boundary.
#[derive(Debug)]
pub struct Violation {
    /// The kind of violation that occurred
    pub kind: ViolationKind,
    /// Human-readable message explaining the violation
    pub message: String,
}

impl Violation {
    /// Creates a new violation.
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Violation {}

/// The kind of policy violation.
#[derive(Debug, PartialEq)]
pub enum ViolationKind {
    /// Authentication is required but missing
    Unauthenticated,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::Unauthenticated => write!(f, "Unauthenticated"),
        }
    }
}
