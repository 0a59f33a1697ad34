//! Reads an entity's current `SyncToken`, the optimistic-concurrency counter every mutation
//! of an existing entity has to echo back.

use serde_json::Value;

use crate::{
    endpoints::Endpoint,
    entities::Resource,
    error::{Error, Result},
    request::ApiRequest,
    transport::Transport,
};

/// Fetches `resource` `id` and returns its `SyncToken`.
///
/// The token is accepted as text or as a number; anything else is an unexpected response.
#[instrument(skip(transport))]
pub async fn fetch<T: Transport>(transport: &T, resource: Resource, id: &str) -> Result<String> {
    let endpoint = Endpoint::EntityById(resource, id.to_string());
    let request = ApiRequest::new(reqwest::Method::GET, endpoint.clone());
    let response = transport.send(&request).await?;

    let token = from_response(&response, resource).ok_or_else(|| Error::UnexpectedResponse {
        url: endpoint.to_string(),
        message: format!("{} {id} has no SyncToken", resource.entity_name()),
    })?;
    debug!(%resource, id, sync_token = %token, "fetched sync token");
    Ok(token)
}

/// Reads `response[EntityName].SyncToken`.
#[must_use]
pub fn from_response(response: &Value, resource: Resource) -> Option<String> {
    match response.get(resource.entity_name())?.get("SyncToken")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
