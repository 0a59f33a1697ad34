use serde_json::Value;

use crate::{endpoints::Endpoint, error::Result, request::ApiRequest};

/// The seam between the actions and the authenticated HTTP layer.
///
/// [`crate::Client`] is the production implementation; tests substitute an in-memory one.
pub trait Transport {
    /// Sends a JSON request and returns the decoded JSON response.
    ///
    /// Implementations must reject a request that still has a pending sync token.
    fn send(&self, request: &ApiRequest) -> impl Future<Output = Result<Value>>;

    /// Fetches the raw bytes of a PDF rendition.
    fn fetch_pdf(&self, endpoint: &Endpoint) -> impl Future<Output = Result<Vec<u8>>>;
}
