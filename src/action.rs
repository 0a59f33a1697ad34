//! Runs one `(resource, operation)` action over a batch of host items.
//!
//! Every item takes exactly one path: a built request (with a sync-token fetch first when the
//! operation mutates an existing entity), a listing, or a PDF download. The path and the
//! request are worked out before anything is sent, so invalid parameters never reach the API.

use serde_json::Value;

use crate::{
    binary::{self, BinaryAttachment, DownloadOptions},
    client::Client,
    entities::{Operation, Resource},
    error::{Error, Result},
    listing::{self, Filters, ListParameters, MAX_PAGE_SIZE, OptionItem},
    parameters::Parameters,
    request::{self, ApiRequest},
    sync_token,
    transport::Transport,
};

/// One input item: its resolved parameters and the JSON it carried in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionItem {
    pub parameters: Parameters,
    pub json: Value,
}

impl ActionItem {
    #[must_use]
    pub fn new(parameters: Parameters) -> Self {
        Self {
            parameters,
            json: Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn with_json(mut self, json: Value) -> Self {
        self.json = json;
        self
    }
}

/// What one item produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutput {
    /// JSON records: the entity, the API response, or the listed rows.
    Records(Vec<Value>),
    /// The input item's JSON with a downloaded PDF attached.
    RecordWithAttachment {
        json: Value,
        attachment: BinaryAttachment,
    },
}

impl ItemOutput {
    /// The JSON records, whichever path produced them.
    #[must_use]
    pub fn records(&self) -> Vec<&Value> {
        match self {
            Self::Records(records) => records.iter().collect(),
            Self::RecordWithAttachment { json, .. } => vec![json],
        }
    }
}

/// The path one item takes.
#[derive(Debug, Clone, PartialEq)]
enum Plan {
    Request(ApiRequest),
    List(ListParameters),
    Download { id: String, options: DownloadOptions },
}

fn plan(resource: Resource, operation: Operation, params: &Parameters) -> Result<Plan> {
    if !resource.supports(operation) {
        return Err(Error::UnsupportedOperation {
            resource,
            operation,
        });
    }

    match operation {
        Operation::GetAll => Ok(Plan::List(ListParameters::from_parameters(params)?)),
        Operation::Get if resource.supports_pdf() && params.flag("download") => Ok(Plan::Download {
            id: params.id(resource)?,
            options: DownloadOptions::from_parameters(params),
        }),
        _ => Ok(Plan::Request(request::build(resource, operation, params)?)),
    }
}

/// Unwraps `{"Invoice": {...}, "time": ...}` to the entity itself.
fn unwrap_entity(response: Value, resource: Resource) -> Value {
    match response {
        Value::Object(mut map) => match map.remove(resource.entity_name()) {
            Some(entity @ Value::Object(_)) => entity,
            Some(other) => {
                map.insert(resource.entity_name().to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// QuickBooks actions over a [`Transport`].
#[derive(Debug, Clone)]
pub struct QuickBooks<T> {
    transport: T,
    page_size: u32,
}

impl QuickBooks<Client> {
    /// Uses the client's configured page size for listings.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        let page_size = client.options().page_size;
        Self::new(client).with_page_size(page_size)
    }
}

impl<T: Transport> QuickBooks<T> {
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Sets the listing page size, capped at [`MAX_PAGE_SIZE`].
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs the action for every item in order.
    ///
    /// The first failing item aborts the batch; API effects of earlier items stay in place.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub async fn execute(
        &self,
        resource: Resource,
        operation: Operation,
        items: Vec<ActionItem>,
    ) -> Result<Vec<ItemOutput>> {
        let mut outputs = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match self.execute_item(resource, operation, item).await {
                Ok(output) => outputs.push(output),
                Err(err) => {
                    warn!(index, %resource, %operation, error = %err, "item failed, aborting batch");
                    return Err(err);
                }
            }
        }
        Ok(outputs)
    }

    /// Runs the action for a single item.
    #[instrument(skip(self, item))]
    pub async fn execute_item(
        &self,
        resource: Resource,
        operation: Operation,
        item: ActionItem,
    ) -> Result<ItemOutput> {
        match plan(resource, operation, &item.parameters)? {
            Plan::Request(request) => self.send(resource, request).await,
            Plan::List(params) => {
                listing::list(&self.transport, resource, params, self.page_size)
                    .await
                    .map(ItemOutput::Records)
            }
            Plan::Download { id, options } => {
                let attachment = binary::fetch(&self.transport, resource, &id, options).await?;
                Ok(ItemOutput::RecordWithAttachment {
                    json: item.json,
                    attachment,
                })
            }
        }
    }

    async fn send(&self, resource: Resource, request: ApiRequest) -> Result<ItemOutput> {
        let pending_id = request.pending_sync_token().map(|pending| pending.id.clone());
        let request = match pending_id {
            Some(id) => {
                let token = sync_token::fetch(&self.transport, resource, &id).await?;
                request.with_sync_token(token)
            }
            None => request,
        };

        let response = self.transport.send(&request).await?;
        Ok(ItemOutput::Records(vec![unwrap_entity(response, resource)]))
    }

    /// Counts the `resource` entities matching `filters`.
    pub async fn count(&self, resource: Resource, filters: &Filters) -> Result<u64> {
        listing::count(&self.transport, resource, filters).await
    }

    /// Loads `{name, value}` picker options for customers, employees or vendors.
    pub async fn load_options(&self, resource: Resource) -> Result<Vec<OptionItem>> {
        listing::load_options(&self.transport, resource).await
    }
}
