//! Sentry integration for quickbooks-rs errors.
//!
//! Only available with the `sentry` feature:
//!
//! ```toml
//! [dependencies]
//! quickbooks-rs = { version = "0.1", features = ["sentry"] }
//! ```
//!
//! Span traces are only populated when the subscriber carries `tracing_error::ErrorLayer`.

use std::collections::BTreeMap;

use sentry_core::{Breadcrumb, protocol::Value};

use crate::error::Error;

const BODY_PREVIEW_CHARS: usize = 500;

impl<'a> From<&'a Error> for Breadcrumb {
    fn from(error: &'a Error) -> Self {
        let mut data = BTreeMap::new();
        if let Some(url) = error.url() {
            data.insert("url".to_string(), Value::from(url.to_string()));
        }
        if let Some(status) = error.status_code() {
            data.insert("status_code".to_string(), Value::from(status.as_u16()));
        }

        let (category, message) = match error {
            Error::Validation { .. } | Error::MissingParameter { .. } => {
                ("quickbooks.validation", error.to_string())
            }
            Error::UnsupportedOperation {
                resource,
                operation,
            } => {
                data.insert("resource".to_string(), Value::from(resource.as_str()));
                data.insert("operation".to_string(), Value::from(operation.as_str()));
                ("quickbooks.validation", error.to_string())
            }
            Error::Request(source) => ("http.request", format!("HTTP request error: {source}")),
            Error::DeserializationError(..) | Error::UnexpectedResponse { .. } => {
                ("http.response", error.to_string())
            }
            Error::NotFound { entity, .. } => {
                data.insert("entity".to_string(), Value::from(entity.clone()));
                ("http.response", format!("{entity} not found"))
            }
            Error::API { fault, .. } => {
                let fault_type = fault.r#type.clone().unwrap_or_else(|| "Fault".to_string());
                if let Some(code) = fault.error.iter().find_map(|e| e.code.clone()) {
                    data.insert("code".to_string(), Value::from(code));
                }
                data.insert("fault_type".to_string(), Value::from(fault_type.clone()));
                ("quickbooks.api", format!("QuickBooks API error: {fault_type}"))
            }
            Error::Unauthorized { .. } => ("auth", "Unauthorized".to_string()),
            Error::RateLimitExceeded { retry_after, .. } => {
                if let Some(retry) = retry_after {
                    data.insert("retry_after_secs".to_string(), Value::from(retry.as_secs()));
                }
                ("quickbooks.rate_limit", "Rate limit exceeded".to_string())
            }
            Error::InvalidEndpoint | Error::Configuration(_) => {
                ("quickbooks.config", error.to_string())
            }
        };

        Breadcrumb {
            ty: "error".to_string(),
            category: Some(category.to_string()),
            message: Some(message),
            data,
            level: sentry_core::Level::Error,
            ..Default::default()
        }
    }
}

/// Extracts the error's remote context for use as Sentry extras.
pub fn error_to_sentry_context(error: &Error) -> BTreeMap<String, Value> {
    let mut context = BTreeMap::new();

    if let Some(span_trace) = error.span_trace() {
        context.insert(
            "quickbooks.span_trace".to_string(),
            Value::from(format!("{span_trace}")),
        );
    }
    if let Some(url) = error.url() {
        context.insert("quickbooks.url".to_string(), Value::from(url.to_string()));
    }
    if let Some(status) = error.status_code() {
        context.insert("quickbooks.status_code".to_string(), Value::from(status.as_u16()));
    }
    if let Some(body) = error.response_body() {
        let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        context.insert("quickbooks.response_body".to_string(), Value::from(preview));
    }
    if let Some(fault) = error.fault() {
        context.insert("quickbooks.fault".to_string(), Value::from(fault.to_string()));
    }

    context
}
