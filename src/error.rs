//! The error taxonomy of an ingestion run.
//!
//! Every failure is terminal for the invocation. The core hands back an
//! [`IngestionError`] and each entry point decides how to surface it: the JSON
//! Lambdas fail the invocation, the API Gateway flavor maps the kind onto an
//! HTTP status code.

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    ConfigurationMissing,
    Timeout,
    FetchFailed,
    InvalidResponse,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConfigurationMissing => "ConfigurationMissing",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::FetchFailed => "FetchFailed",
            ErrorKind::InvalidResponse => "InvalidResponse",
            ErrorKind::Internal => "Internal",
        }
    }

    /// The HTTP status reported for this kind of failure.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Timeout => 504,
            ErrorKind::InvalidResponse => 502,
            ErrorKind::ConfigurationMissing | ErrorKind::FetchFailed | ErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct IngestionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl IngestionError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        IngestionError {
            kind,
            message: message.into(),
        }
    }

    pub fn configuration_missing<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::ConfigurationMissing, message)
    }

    pub fn invalid_response<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::InvalidResponse, message)
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// The `{"error": ...}` body returned by the HTTP-facing entry point.
    pub fn to_body(&self) -> Value {
        json!({ "error": self.message })
    }
}

impl From<anyhow::Error> for IngestionError {
    fn from(e: anyhow::Error) -> Self {
        IngestionError::internal(format!("Unexpected error: {e:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(ErrorKind::ConfigurationMissing.status_code(), 500);
        assert_eq!(ErrorKind::Timeout.status_code(), 504);
        assert_eq!(ErrorKind::FetchFailed.status_code(), 500);
        assert_eq!(ErrorKind::InvalidResponse.status_code(), 502);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn display_names_the_kind() {
        let e = IngestionError::configuration_missing("API_URL is not configured");
        assert_eq!(e.to_string(), "ConfigurationMissing: API_URL is not configured");
        assert_eq!(e.to_body(), json!({ "error": "API_URL is not configured" }));
    }

    #[test]
    fn anyhow_errors_become_internal() {
        let e: IngestionError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(e.kind, ErrorKind::Internal);
        assert!(e.message.contains("disk on fire"));
    }
}
