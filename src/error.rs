use std::fmt;
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_error::SpanTrace;

use crate::entities::{Operation, Resource};

/// QuickBooks fault code returned when an entity no longer exists.
pub const OBJECT_NOT_FOUND_CODE: &str = "610";

/// A single error element of a QuickBooks fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FaultError {
    pub message: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(rename = "code", default)]
    pub code: Option<String>,
    #[serde(rename = "element", default)]
    pub element: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Fault {
    #[serde(default)]
    pub error: Vec<FaultError>,
    #[serde(rename = "type", default)]
    pub r#type: Option<String>,
}

impl Fault {
    /// Returns true when any element of the fault reports an entity that does not exist.
    #[must_use]
    pub fn is_object_not_found(&self) -> bool {
        self.error
            .iter()
            .any(|e| e.code.as_deref() == Some(OBJECT_NOT_FOUND_CODE))
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.r#type.as_deref().unwrap_or("Fault"))?;
        for error in &self.error {
            write!(f, "; {}", error.message)?;
            if let Some(code) = &error.code {
                write!(f, " (code {code})")?;
            }
            if let Some(detail) = error.detail.as_deref().filter(|d| !d.is_empty()) {
                write!(f, ": {detail}")?;
            }
        }
        Ok(())
    }
}

/// Body returned by the accounting API for any failed call.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(rename = "Fault", alias = "fault")]
    pub fault: Fault,
    #[serde(default)]
    pub time: Option<String>,
}

/// Errors that can occur when executing QuickBooks actions.
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    /// The caller supplied parameters that cannot form a valid request. Raised before any
    /// network call.
    #[error("invalid parameters: {message}")]
    #[diagnostic(
        code(quickbooks_rs::validation),
        help("Check the required fields for this resource and operation")
    )]
    Validation { message: String },

    #[error("missing parameter `{name}`")]
    #[diagnostic(
        code(quickbooks_rs::missing_parameter),
        help("Provide a value for `{name}` on every input item")
    )]
    MissingParameter { name: String },

    #[error("operation `{operation}` is not supported for resource `{resource}`")]
    #[diagnostic(
        code(quickbooks_rs::unsupported_operation),
        help("Pick an operation listed for this resource")
    )]
    UnsupportedOperation {
        resource: Resource,
        operation: Operation,
    },

    #[error("error making request: {0:?}")]
    #[diagnostic(
        code(quickbooks_rs::request_error),
        help("Check your network connection and QuickBooks API availability")
    )]
    Request(#[source] reqwest::Error),

    #[error("error decoding response: {0:?}")]
    #[diagnostic(
        code(quickbooks_rs::deserialization_error),
        help("The API returned data in an unexpected format")
    )]
    DeserializationError(#[source] serde_json::Error, Option<String>),

    #[error("unexpected response from {url}: {message}")]
    #[diagnostic(code(quickbooks_rs::unexpected_response))]
    UnexpectedResponse { url: String, message: String },

    #[error("object not found: {entity} (url: {url})")]
    #[diagnostic(
        code(quickbooks_rs::not_found),
        help("Verify that the {entity} exists and has not been deleted")
    )]
    NotFound {
        entity: String,
        url: String,
        status_code: reqwest::StatusCode,
        response_body: Option<String>,
        span_trace: SpanTrace,
    },

    #[error("endpoint could not be parsed as a URL")]
    #[diagnostic(
        code(quickbooks_rs::invalid_endpoint),
        help("Check the configured base URL and company id")
    )]
    InvalidEndpoint,

    /// A fault returned by the accounting API, such as a `ValidationFault`.
    #[error("QuickBooks API error ({status_code}): {fault}")]
    #[diagnostic(
        code(quickbooks_rs::api_fault),
        help("Review the fault details returned by the QuickBooks API")
    )]
    API {
        fault: Fault,
        status_code: reqwest::StatusCode,
        url: String,
        span_trace: SpanTrace,
    },

    #[error("unauthorized request to {url}")]
    #[diagnostic(
        code(quickbooks_rs::unauthorized),
        help("The access token is missing, expired or revoked; refresh it in the host")
    )]
    Unauthorized {
        url: String,
        response_body: Option<String>,
    },

    /// Rate limit exceeded (HTTP 429 Too Many Requests)
    #[error("rate limit exceeded: retry after {retry_after:?}")]
    #[diagnostic(
        code(quickbooks_rs::rate_limit_exceeded),
        help("The QuickBooks API throttled this company; wait and retry")
    )]
    RateLimitExceeded {
        retry_after: Option<Duration>,
        status_code: reqwest::StatusCode,
        url: String,
        response_body: Option<String>,
    },

    #[error("invalid configuration: {0}")]
    #[diagnostic(
        code(quickbooks_rs::configuration),
        help("Set QUICKBOOKS_COMPANY_ID and QUICKBOOKS_ACCESS_TOKEN")
    )]
    Configuration(String),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// The span trace captured when a remote failure was observed, if any.
    #[must_use]
    pub fn span_trace(&self) -> Option<&SpanTrace> {
        match self {
            Self::NotFound { span_trace, .. } | Self::API { span_trace, .. } => Some(span_trace),
            _ => None,
        }
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::UnexpectedResponse { url, .. }
            | Self::NotFound { url, .. }
            | Self::API { url, .. }
            | Self::Unauthorized { url, .. }
            | Self::RateLimitExceeded { url, .. } => Some(url),
            _ => None,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::NotFound { status_code, .. }
            | Self::API { status_code, .. }
            | Self::RateLimitExceeded { status_code, .. } => Some(*status_code),
            Self::Unauthorized { .. } => Some(reqwest::StatusCode::UNAUTHORIZED),
            Self::Request(e) => e.status(),
            _ => None,
        }
    }

    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::NotFound { response_body, .. }
            | Self::Unauthorized { response_body, .. }
            | Self::RateLimitExceeded { response_body, .. } => response_body.as_deref(),
            Self::DeserializationError(_, body) => body.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::API { fault, .. } => Some(fault),
            _ => None,
        }
    }

    /// True for errors raised before anything was sent to the API.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::MissingParameter { .. }
                | Self::UnsupportedOperation { .. }
                | Self::InvalidEndpoint
                | Self::Configuration(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::DeserializationError(e, None)
    }
}

impl From<url::ParseError> for Error {
    fn from(_: url::ParseError) -> Self {
        Self::InvalidEndpoint
    }
}

/// Type alias for results from this crate.
pub type Result<O> = std::result::Result<O, Error>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fault_deserializes_and_detects_missing_object() {
        let body = json!({
            "Fault": {
                "Error": [{
                    "Message": "Object Not Found",
                    "Detail": "Object Not Found : Something you're trying to use has been made inactive.",
                    "code": "610",
                    "element": ""
                }],
                "type": "ValidationFault"
            },
            "time": "2024-03-01T10:00:00.000-08:00"
        });

        let response: Response = serde_json::from_value(body).unwrap();
        assert!(response.fault.is_object_not_found());
        assert_eq!(response.fault.r#type.as_deref(), Some("ValidationFault"));
    }

    #[test]
    fn fault_display_lists_every_error() {
        let fault = Fault {
            error: vec![
                FaultError {
                    message: "Stale Object Error".to_string(),
                    detail: Some("You and root were working on this at the same time.".to_string()),
                    code: Some("5010".to_string()),
                    element: None,
                },
                FaultError {
                    message: "Required param missing".to_string(),
                    detail: None,
                    code: None,
                    element: None,
                },
            ],
            r#type: Some("ValidationFault".to_string()),
        };

        let text = fault.to_string();
        assert!(text.starts_with("ValidationFault; Stale Object Error (code 5010)"));
        assert!(text.contains("Required param missing"));
    }

    #[test]
    fn local_errors_are_flagged() {
        assert!(Error::validation("no lines").is_local());
        assert!(
            Error::UnsupportedOperation {
                resource: Resource::Item,
                operation: Operation::Delete,
            }
            .is_local()
        );
        assert!(
            !Error::Unauthorized {
                url: String::new(),
                response_body: None,
            }
            .is_local()
        );
    }
}
