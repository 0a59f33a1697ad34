//! # quickbooks-rs
//!
//! QuickBooks Online accounting actions for workflow hosts: create, get, list, update, delete,
//! send and void bills, customers, employees, estimates, invoices, items, payments and vendors.
//!
//! The host hands over one set of [`Parameters`] per input item; [`QuickBooks::execute`] turns
//! each item into exactly one API call path and returns one [`ItemOutput`] per item.
//!
//! ```ignore
//! use quickbooks_rs::{ActionItem, Client, Credentials, Operation, Parameters, QuickBooks, Resource};
//! use serde_json::json;
//!
//! let client = Client::new(Credentials::from_env()?)?;
//! let actions = QuickBooks::from_client(client);
//!
//! let params = Parameters::new()
//!     .with("displayName", "Acme")
//!     .with("additionalFields", json!({ "PrimaryEmailAddr": "billing@acme.test" }));
//! let outputs = actions
//!     .execute(Resource::Customer, Operation::Create, vec![ActionItem::new(params)])
//!     .await?;
//! ```
//!
//! ## Sentry Integration
//!
//! Remote failures carry a [`SpanTrace`] captured where the failure was observed. With the
//! `sentry` feature, errors convert into `sentry_core::Breadcrumb`s. Span traces are only
//! populated when the subscriber includes `tracing_error::ErrorLayer`:
//!
//! ```ignore
//! use tracing_subscriber::prelude::*;
//! use tracing_error::ErrorLayer;
//!
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(ErrorLayer::default())
//!     .init();
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
extern crate tracing;

pub mod action;
pub mod binary;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod entities;
pub mod error;
pub mod fields;
pub mod listing;
pub mod parameters;
pub mod request;
pub mod sync_token;
pub mod transport;
pub mod utils;

#[cfg(feature = "sentry")]
pub mod sentry_integration;

pub use action::{ActionItem, ItemOutput, QuickBooks};
pub use binary::{BinaryAttachment, DownloadOptions};
pub use client::Client;
pub use config::{ClientOptions, Credentials, Environment, RequestOptions};
pub use endpoints::Endpoint;
pub use entities::{Line, Operation, Reference, Resource};
pub use error::{Error, Result};
pub use listing::{Filters, ListParameters, Listing, OptionItem};
pub use parameters::Parameters;
pub use request::ApiRequest;
pub use transport::Transport;

// Re-export SpanTrace for users who want to access it
pub use tracing_error::SpanTrace;
