//! Builds the HTTP request for one `(resource, operation)` pair from host parameters.
//!
//! Building is pure: it never touches the network. Mutations that need the entity's current
//! `SyncToken` come back with a pending slot that [`ApiRequest::with_sync_token`] fills once
//! the token has been fetched.

use reqwest::Method;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::{
    endpoints::Endpoint,
    entities::{Operation, Reference, Resource, line_item},
    error::{Error, Result},
    fields::{FieldTable, Mode},
    parameters::Parameters,
};

/// Where a fetched `SyncToken` has to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Body,
    Query,
}

/// A mutation still waiting for the entity's current `SyncToken`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSyncToken {
    pub id: String,
    pub placement: Placement,
}

/// A fully described call against the accounting API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub query: Vec<(String, String)>,
    pub body: Option<Map<String, Value>>,
    pending: Option<PendingSyncToken>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            query: Vec::new(),
            body: None,
            pending: None,
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    fn awaiting_sync_token(mut self, id: String, placement: Placement) -> Self {
        self.pending = Some(PendingSyncToken { id, placement });
        self
    }

    /// The sync token this request still needs, if any.
    #[must_use]
    pub fn pending_sync_token(&self) -> Option<&PendingSyncToken> {
        self.pending.as_ref()
    }

    /// Writes `token` into the slot the operation expects.
    #[must_use]
    pub fn with_sync_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        match self.pending.take().map(|p| p.placement) {
            Some(Placement::Body) => {
                self.body
                    .get_or_insert_with(Map::new)
                    .insert("SyncToken".to_string(), Value::String(token));
            }
            Some(Placement::Query) => {
                let position = self.query.iter().position(|(k, _)| k == "Id").map_or(0, |i| i + 1);
                self.query.insert(position, ("SyncToken".to_string(), token));
            }
            None => {}
        }
        self
    }

    /// First value of query parameter `key`.
    #[must_use]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builds one request from host parameters.
type BuildFn = fn(Resource, &Parameters) -> Result<ApiRequest>;

fn builder(resource: Resource, operation: Operation) -> Option<BuildFn> {
    if !resource.supports(operation) {
        return None;
    }

    let build: BuildFn = match (resource, operation) {
        (Resource::Bill, Operation::Create) => create_bill,
        (Resource::Customer | Resource::Employee | Resource::Vendor, Operation::Create) => {
            create_named
        }
        (Resource::Estimate | Resource::Invoice, Operation::Create) => create_sales,
        (Resource::Payment, Operation::Create) => create_payment,
        (_, Operation::Get) => get,
        (_, Operation::Update) => update,
        (_, Operation::Delete) => delete,
        (_, Operation::Void) => void,
        (_, Operation::Send) => send,
        (_, Operation::GetAll | Operation::Create) => return None,
    };
    Some(build)
}

/// Builds the request for `operation` on `resource`.
///
/// Fails with [`Error::UnsupportedOperation`] for pairs the resource does not offer, and for
/// `getAll`, which is served by [`crate::listing`] instead.
pub fn build(resource: Resource, operation: Operation, params: &Parameters) -> Result<ApiRequest> {
    let build = builder(resource, operation).ok_or(Error::UnsupportedOperation {
        resource,
        operation,
    })?;
    let request = build(resource, params)?;
    trace!(%resource, %operation, ?request, "built request");
    Ok(request)
}

fn required_reference(params: &Parameters, name: &str) -> Result<Value> {
    Ok(Reference::from_input(name, params.required(name)?)?
        .value_only()
        .into_value())
}

fn required_lines(params: &Parameters, resource: Resource) -> Result<Value> {
    let input = params.get("Line").cloned().unwrap_or(Value::Null);
    line_item::process(line_item::parse(input)?, resource)
}

fn amount(name: &str, value: &Value) -> Result<Value> {
    let decimal: Decimal = serde_json::from_value(value.clone())
        .map_err(|_| Error::validation(format!("`{name}` must be a number")))?;
    Ok(rust_decimal::serde::float::serialize(
        &decimal,
        serde_json::value::Serializer,
    )?)
}

fn finish_create(
    resource: Resource,
    params: &Parameters,
    mut body: Map<String, Value>,
) -> Result<ApiRequest> {
    let additional_fields = params.object("additionalFields")?;
    FieldTable::lookup(resource, Mode::Create).apply(&mut body, additional_fields, resource)?;
    Ok(ApiRequest::new(Method::POST, Endpoint::Entity(resource)).with_body(body))
}

fn create_bill(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let mut body = Map::new();
    body.insert("VendorRef".to_string(), required_reference(params, "VendorRef")?);
    body.insert("Line".to_string(), required_lines(params, resource)?);
    finish_create(resource, params, body)
}

fn create_named(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let mut body = Map::new();
    body.insert(
        "DisplayName".to_string(),
        Value::String(params.string("displayName")?),
    );
    finish_create(resource, params, body)
}

fn create_sales(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let mut body = Map::new();
    body.insert(
        "CustomerRef".to_string(),
        required_reference(params, "CustomerRef")?,
    );
    body.insert("Line".to_string(), required_lines(params, resource)?);
    finish_create(resource, params, body)
}

fn create_payment(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let mut body = Map::new();
    body.insert(
        "CustomerRef".to_string(),
        required_reference(params, "CustomerRef")?,
    );
    body.insert(
        "TotalAmt".to_string(),
        amount("TotalAmt", params.required("TotalAmt")?)?,
    );
    finish_create(resource, params, body)
}

fn get(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let id = params.id(resource)?;
    Ok(ApiRequest::new(Method::GET, Endpoint::EntityById(resource, id)))
}

fn update(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let id = params.id(resource)?;
    let update_fields = params.object("updateFields")?;
    if update_fields.is_empty() {
        return Err(Error::validation(format!(
            "enter at least one field to update for the {resource}"
        )));
    }

    let mut body = Map::new();
    FieldTable::lookup(resource, Mode::Update).apply(&mut body, update_fields, resource)?;
    body.insert("Id".to_string(), Value::String(id.clone()));
    body.insert("sparse".to_string(), Value::Bool(true));

    Ok(ApiRequest::new(Method::POST, Endpoint::Entity(resource))
        .with_body(body)
        .awaiting_sync_token(id, Placement::Body))
}

fn delete(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let id = params.id(resource)?;
    let mut body = Map::new();
    body.insert("Id".to_string(), Value::String(id.clone()));

    Ok(ApiRequest::new(Method::POST, Endpoint::Entity(resource))
        .with_query("operation", "delete")
        .with_body(body)
        .awaiting_sync_token(id, Placement::Body))
}

fn void(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let id = params.id(resource)?;
    Ok(ApiRequest::new(Method::POST, Endpoint::Entity(resource))
        .with_query("Id", id.clone())
        .with_query("operation", "void")
        .with_body(Map::new())
        .awaiting_sync_token(id, Placement::Query))
}

fn send(resource: Resource, params: &Parameters) -> Result<ApiRequest> {
    let id = params.id(resource)?;
    let email = params.string("email")?;
    Ok(ApiRequest::new(Method::POST, Endpoint::Send(resource, id))
        .with_query("sendTo", email)
        .with_body(Map::new()))
}
