//! Shared primitives for all Rust crates in auditkit.

#![forbid(unsafe_code)]

/// Query compilation failure records shared across crates.
pub mod failure;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use failure::{QueryError, QueryFailure, describe_failures};

/// Result type used across auditkit crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Error categories surfaced by the query-editor client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid caller input, rejected before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Connection, TLS or timeout failure below HTTP. Never retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP response with a best-effort message from the body.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// Response body could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// The platform did not reach the required session status.
    #[error("failed to allocate audit session: {0}")]
    Allocation(String),

    /// An async request did not complete within the polling budget.
    #[error(
        "audit request {request_id} polled {elapsed_seconds} seconds without success: session may no longer be valid"
    )]
    PollingTimeout {
        /// Request that was being polled.
        request_id: String,
        /// Seconds spent sleeping between polls.
        elapsed_seconds: u64,
    },

    /// The platform reported the async request as failed.
    #[error("query editor request failed: {0}")]
    PollingFailed(String),

    /// Query source did not compile or validate.
    #[error("query compilation failed: {}", describe_failures(.0))]
    QueryCompilation(Vec<QueryFailure>),

    /// The operation needs state the caller has not established yet.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status for protocol errors.
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the compilation failures carried by this error, if any.
    #[must_use]
    pub fn query_failures(&self) -> &[QueryFailure] {
        match self {
            Self::QueryCompilation(failures) => failures.as_slice(),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString, QueryError, QueryFailure};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn query_failure_decodes_wire_names() {
        let failure: QueryFailure = serde_json::from_str(
            r#"{"query_id":"Q1","error":[{"line":3,"start_column":1,"end_column":9,"code":"CS1002","message":"; expected"}]}"#,
        )
        .unwrap_or_default();

        assert_eq!(failure.query_id, "Q1");
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(failure.errors[0].code, "CS1002");
    }

    #[test]
    fn query_failure_accepts_numeric_and_missing_codes() {
        let failure: QueryFailure = serde_json::from_str(
            r#"{"query_id":"Q2","error":[
                {"line":3,"start_column":1,"end_column":9,"code":100,"message":"; expected"},
                {"line":4,"code":null,"message":"unknown symbol"}
            ]}"#,
        )
        .unwrap_or_default();

        assert_eq!(failure.query_id, "Q2");
        assert_eq!(failure.errors.len(), 2);
        assert_eq!(failure.errors[0].code, "100");
        assert_eq!(failure.errors[1].code, "");
        assert!(failure.to_string().contains("line 3 [1-9] 100: ; expected"));
    }

    #[test]
    fn compilation_error_lists_every_failure() {
        let error = AppError::QueryCompilation(vec![
            QueryFailure {
                query_id: "A".to_owned(),
                errors: vec![QueryError {
                    line: 2,
                    message: "bad".to_owned(),
                    ..QueryError::default()
                }],
            },
            QueryFailure {
                query_id: "B".to_owned(),
                errors: Vec::new(),
            },
        ]);

        let rendered = error.to_string();
        assert!(rendered.contains("query A; line 2"));
        assert!(rendered.contains("query B"));
        assert_eq!(error.query_failures().len(), 2);
    }

    #[test]
    fn http_status_is_exposed_only_for_protocol_errors() {
        let error = AppError::Http {
            status: 404,
            message: "not found".to_owned(),
        };
        assert_eq!(error.http_status(), Some(404));
        assert_eq!(AppError::Transport("reset".to_owned()).http_status(), None);
    }
}
