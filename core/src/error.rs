//! Error types for the detection API client.
//!
//! # Design
//! Every failure a caller can observe is one `ApiError` variant. Lookups that
//! callers routinely branch on (missing task, unfinished report, dead server)
//! get dedicated variants; anything the interceptor propagates unchanged lands
//! in `Transport` or `HttpError` with the raw data kept for diagnosis.
//! `ErrorClassification` is the coarse view the UI switches on.

use std::fmt;

use thiserror::Error;

use crate::http::TransportError;

/// Shown when the login endpoint answers 401.
pub const CREDENTIAL_MISMATCH_MESSAGE: &str = "incorrect username or password";

/// Default for an unfinished report when the backend gives no message.
pub const NOT_YET_COMPLETE_MESSAGE: &str = "task not yet complete";

/// Application codes that mean the current credential is no longer usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCode {
    IllegalToken,
    LoggedInElsewhere,
    TokenExpired,
}

impl SessionCode {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            50008 => Some(SessionCode::IllegalToken),
            50012 => Some(SessionCode::LoggedInElsewhere),
            50014 => Some(SessionCode::TokenExpired),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            SessionCode::IllegalToken => 50008,
            SessionCode::LoggedInElsewhere => 50012,
            SessionCode::TokenExpired => 50014,
        }
    }
}

/// What a report or detail lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Task,
    TaskReport,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Task => write!(f, "task"),
            Resource::TaskReport => write!(f, "task report"),
        }
    }
}

/// Errors returned by `DetectClient` parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The body matched none of the shapes known for this endpoint family.
    #[error("{family} response has an unexpected format: {body}")]
    ShapeMismatch { family: &'static str, body: String },

    /// The body matched no known shape but carried a `message`.
    #[error("{0}")]
    Rejected(String),

    /// Non-success application code.
    #[error("{message}")]
    Application { code: i64, message: String },

    /// One of the session invalidation codes.
    #[error("{message}")]
    SessionInvalidated { code: SessionCode, message: String },

    #[error("{resource} not found for id {task_id}")]
    NotFound { resource: Resource, task_id: String },

    /// The task exists but has not finished yet (400 on a report lookup).
    #[error("{0}")]
    NotYetComplete(String),

    #[error("server unreachable, check the network connection or server status")]
    NetworkUnreachable,

    /// 401 on the login endpoint.
    #[error("{}", CREDENTIAL_MISMATCH_MESSAGE)]
    CredentialMismatch,

    /// No response; propagated as the host reported it.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-2xx response outside the special cases above.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("serialization failed: {0}")]
    SerializationError(String),
}

/// Coarse classification of an `ApiError`, derived per response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    SessionInvalid,
    GenericApplicationError,
    NetworkUnreachable,
    NotFound,
    BadRequest,
    Unrecognized,
}

impl ApiError {
    pub fn classification(&self) -> ErrorClassification {
        match self {
            ApiError::SessionInvalidated { .. } => ErrorClassification::SessionInvalid,
            ApiError::Application { .. } | ApiError::Rejected(_) | ApiError::CredentialMismatch => {
                ErrorClassification::GenericApplicationError
            }
            ApiError::NetworkUnreachable | ApiError::Transport(_) => {
                ErrorClassification::NetworkUnreachable
            }
            ApiError::NotFound { .. } | ApiError::HttpError { status: 404, .. } => {
                ErrorClassification::NotFound
            }
            ApiError::NotYetComplete(_) | ApiError::HttpError { status: 400, .. } => {
                ErrorClassification::BadRequest
            }
            ApiError::ShapeMismatch { .. }
            | ApiError::HttpError { .. }
            | ApiError::SerializationError(_) => ErrorClassification::Unrecognized,
        }
    }
}
