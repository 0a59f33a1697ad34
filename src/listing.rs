//! `getAll` support: query-language listing with offset paging.
//!
//! Every resource is listed through the shared `/query` endpoint:
//!
//! ```text
//! SELECT * FROM Invoice WHERE MetaData.LastUpdatedTime >= '2024-01-01T00:00:00Z' STARTPOSITION 1 MAXRESULTS 1000
//! ```
//!
//! `STARTPOSITION` is 1-based and advances by the page size until a short page comes back, or
//! until the caller's `limit` is reached when `returnAll` is off.

use serde::Serialize;
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    endpoints::Endpoint,
    entities::Resource,
    error::{Error, Result},
    parameters::Parameters,
    request::ApiRequest,
    transport::Transport,
};

/// Largest `MAXRESULTS` the API accepts.
pub const MAX_PAGE_SIZE: u32 = 1000;
/// Result count when `returnAll` is off and no `limit` was given.
pub const DEFAULT_LIMIT: u32 = 50;

/// Optional narrowing of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// A raw condition such as `Balance > '0'`; a leading `WHERE` is tolerated.
    pub query: Option<String>,
    pub modified_since: Option<OffsetDateTime>,
    /// Sort clause such as `TxnDate DESC`.
    pub order_by: Option<String>,
}

impl Filters {
    /// Reads the `filters` collection: `query`, `modifiedSince` and `orderBy`.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let modified_since = text("modifiedSince")
            .map(|s| {
                OffsetDateTime::parse(&s, &Rfc3339).map_err(|e| {
                    Error::validation(format!("`modifiedSince` must be an RFC 3339 timestamp: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            query: text("query").map(|q| strip_where(&q).to_string()),
            modified_since,
            order_by: text("orderBy"),
        })
    }

    /// The `WHERE` condition, if any filter narrows the listing.
    fn condition(&self) -> Result<Option<String>> {
        let mut conditions = Vec::new();
        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            conditions.push(query.to_string());
        }
        if let Some(since) = self.modified_since {
            let since = since
                .format(&Rfc3339)
                .map_err(|e| Error::validation(format!("`modifiedSince` cannot be formatted: {e}")))?;
            conditions.push(format!("MetaData.LastUpdatedTime >= '{since}'"));
        }
        Ok((!conditions.is_empty()).then(|| conditions.join(" AND ")))
    }

    /// `SELECT {projection} FROM {Entity}[ WHERE …][ ORDERBY …]`
    fn select(&self, projection: &str, resource: Resource) -> Result<String> {
        let mut statement = format!("SELECT {projection} FROM {}", resource.entity_name());
        if let Some(condition) = self.condition()? {
            statement.push_str(" WHERE ");
            statement.push_str(&condition);
        }
        Ok(statement)
    }
}

fn strip_where(query: &str) -> &str {
    let trimmed = query.trim_start();
    match trimmed.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("where ") => trimmed[6..].trim_start(),
        _ => trimmed,
    }
}

/// The `getAll` parameters for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParameters {
    pub return_all: bool,
    pub limit: u32,
    pub filters: Filters,
    /// Emit one record per transaction line instead of one per entity.
    pub flatten_lines: bool,
}

impl Default for ListParameters {
    fn default() -> Self {
        Self {
            return_all: false,
            limit: DEFAULT_LIMIT,
            filters: Filters::default(),
            flatten_lines: false,
        }
    }
}

impl ListParameters {
    /// Reads `returnAll`, `limit`, `filters` and `flattenLines`.
    pub fn from_parameters(params: &Parameters) -> Result<Self> {
        let return_all = params.flag("returnAll");
        let limit = params.unsigned("limit")?.unwrap_or(DEFAULT_LIMIT);
        if !return_all && limit == 0 {
            return Err(Error::validation("`limit` must be at least 1"));
        }

        Ok(Self {
            return_all,
            limit,
            filters: Filters::from_map(&params.object("filters")?)?,
            flatten_lines: params.flag("flattenLines"),
        })
    }
}

/// A lazy, finite cursor over the pages of one listing.
///
/// Construct a new cursor to restart from the first page.
#[derive(Debug)]
pub struct Listing<'a, T> {
    transport: &'a T,
    resource: Resource,
    filters: Filters,
    flatten_lines: bool,
    page_size: u32,
    start_position: u32,
    remaining: Option<u32>,
    done: bool,
}

impl<'a, T: Transport> Listing<'a, T> {
    #[must_use]
    pub fn new(
        transport: &'a T,
        resource: Resource,
        params: ListParameters,
        page_size: u32,
    ) -> Self {
        Self {
            transport,
            resource,
            filters: params.filters,
            flatten_lines: params.flatten_lines && resource.has_lines(),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            start_position: 1,
            remaining: (!params.return_all).then_some(params.limit),
            done: false,
        }
    }

    /// The statement for the next page.
    pub fn statement(&self) -> Result<String> {
        Ok(format!(
            "{} {}STARTPOSITION {} MAXRESULTS {}",
            self.filters.select("*", self.resource)?,
            self.filters
                .order_by
                .as_deref()
                .map(|o| format!("ORDERBY {o} "))
                .unwrap_or_default(),
            self.start_position,
            self.max_results()
        ))
    }

    fn max_results(&self) -> u32 {
        self.remaining
            .map_or(self.page_size, |remaining| remaining.min(self.page_size))
    }

    /// Fetches the next page, or `None` once the listing is exhausted.
    #[instrument(skip(self), fields(resource = %self.resource, start = self.start_position))]
    pub async fn next_page(&mut self) -> Result<Option<Vec<Value>>> {
        if self.done || self.remaining == Some(0) {
            self.done = true;
            return Ok(None);
        }

        let requested = self.max_results();
        let request = ApiRequest::new(reqwest::Method::GET, Endpoint::Query)
            .with_query("query", self.statement()?);
        trace!(query = ?request.query_value("query"), "querying page");

        let response = self.transport.send(&request).await?;
        let entities = page_entities(response, self.resource)?;
        let received = u32::try_from(entities.len()).unwrap_or(u32::MAX);
        debug!(requested, received, "page received");

        let mut records: Vec<Value> = if self.flatten_lines {
            entities
                .into_iter()
                .flat_map(|entity| flatten(entity, self.resource))
                .collect()
        } else {
            entities
        };

        // The limit counts emitted records, so flattened pages can be cut short.
        self.start_position = self.start_position.saturating_add(requested);
        if let Some(remaining) = self.remaining.as_mut() {
            records.truncate(usize::try_from(*remaining).unwrap_or(usize::MAX));
            let emitted = u32::try_from(records.len()).unwrap_or(u32::MAX);
            *remaining = remaining.saturating_sub(emitted);
        }
        if received < requested || self.remaining == Some(0) {
            self.done = true;
        }

        Ok(Some(records))
    }

    /// Drains every remaining page.
    pub async fn collect(mut self) -> Result<Vec<Value>> {
        let mut records = Vec::new();
        while let Some(page) = self.next_page().await? {
            records.extend(page);
        }
        Ok(records)
    }
}

/// Lists `resource` according to `params`.
#[instrument(skip(transport, params))]
pub async fn list<T: Transport>(
    transport: &T,
    resource: Resource,
    params: ListParameters,
    page_size: u32,
) -> Result<Vec<Value>> {
    Listing::new(transport, resource, params, page_size).collect().await
}

fn query_response(response: Value) -> Result<Map<String, Value>> {
    match response {
        Value::Object(mut map) => match map.remove("QueryResponse") {
            Some(Value::Object(query_response)) => Ok(query_response),
            _ => Err(Error::UnexpectedResponse {
                url: Endpoint::Query.to_string(),
                message: "response has no QueryResponse".to_string(),
            }),
        },
        _ => Err(Error::UnexpectedResponse {
            url: Endpoint::Query.to_string(),
            message: "response is not a JSON object".to_string(),
        }),
    }
}

/// The entities of one page; an empty `QueryResponse` means no rows.
fn page_entities(response: Value, resource: Resource) -> Result<Vec<Value>> {
    match query_response(response)?.remove(resource.entity_name()) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entities)) => Ok(entities),
        Some(_) => Err(Error::UnexpectedResponse {
            url: Endpoint::Query.to_string(),
            message: format!("QueryResponse.{} is not a list", resource.entity_name()),
        }),
    }
}

/// One record per line, tagged with the parent transaction. An entity without lines yields
/// nothing.
fn flatten(entity: Value, resource: Resource) -> Vec<Value> {
    let Value::Object(mut entity) = entity else {
        return Vec::new();
    };
    let Some(Value::Array(lines)) = entity.remove("Line") else {
        return Vec::new();
    };

    let txn_id = entity.get("Id").cloned().unwrap_or(Value::Null);
    let doc_number = entity.get("DocNumber").cloned();

    lines
        .into_iter()
        .filter_map(|line| match line {
            Value::Object(mut line) => {
                line.insert("TxnId".to_string(), txn_id.clone());
                line.insert(
                    "TxnType".to_string(),
                    Value::String(resource.entity_name().to_string()),
                );
                if let Some(doc_number) = &doc_number {
                    line.insert("DocNumber".to_string(), doc_number.clone());
                }
                Some(Value::Object(line))
            }
            _ => None,
        })
        .collect()
}

/// Counts the entities matching `filters` with `SELECT COUNT(*)`.
#[instrument(skip(transport, filters))]
pub async fn count<T: Transport>(transport: &T, resource: Resource, filters: &Filters) -> Result<u64> {
    let request = ApiRequest::new(reqwest::Method::GET, Endpoint::Query)
        .with_query("query", filters.select("COUNT(*)", resource)?);
    let response = transport.send(&request).await?;
    Ok(query_response(response)?
        .get("totalCount")
        .and_then(Value::as_u64)
        .unwrap_or(0))
}

/// A picker entry for a host drop-down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionItem {
    pub name: String,
    pub value: String,
}

/// Loads every entity of a name-list resource as `{name: DisplayName, value: Id}`.
#[instrument(skip(transport))]
pub async fn load_options<T: Transport>(transport: &T, resource: Resource) -> Result<Vec<OptionItem>> {
    if !matches!(resource, Resource::Customer | Resource::Employee | Resource::Vendor) {
        return Err(Error::validation(format!("{resource} has no display names to load")));
    }

    let params = ListParameters {
        return_all: true,
        ..ListParameters::default()
    };
    let entities = list(transport, resource, params, MAX_PAGE_SIZE).await?;

    Ok(entities
        .iter()
        .filter_map(|entity| {
            Some(OptionItem {
                name: entity.get("DisplayName")?.as_str()?.to_string(),
                value: crate::utils::serde_helpers::value_to_id(entity.get("Id")?)?,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transport::mock::MockTransport;

    fn page(entity: &str, ids: std::ops::Range<u32>) -> Value {
        let rows: Vec<Value> = ids.map(|id| json!({ "Id": id.to_string() })).collect();
        json!({ "QueryResponse": { entity: rows }, "time": "2024-01-01T00:00:00Z" })
    }

    fn queries(transport: &MockTransport) -> Vec<String> {
        transport
            .sent
            .borrow()
            .iter()
            .map(|r| r.query_value("query").unwrap_or_default().to_string())
            .collect()
    }

    fn return_all() -> ListParameters {
        ListParameters {
            return_all: true,
            ..ListParameters::default()
        }
    }

    #[tokio::test]
    async fn pages_until_a_short_page() {
        let transport = MockTransport::new()
            .respond(page("Invoice", 1..3))
            .respond(page("Invoice", 3..5))
            .respond(page("Invoice", 5..6));

        let records = list(&transport, Resource::Invoice, return_all(), 2).await.unwrap();

        let ids: Vec<_> = records.iter().map(|r| r["Id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5"]);
        assert_eq!(
            queries(&transport),
            [
                "SELECT * FROM Invoice STARTPOSITION 1 MAXRESULTS 2",
                "SELECT * FROM Invoice STARTPOSITION 3 MAXRESULTS 2",
                "SELECT * FROM Invoice STARTPOSITION 5 MAXRESULTS 2",
            ]
        );
    }

    #[tokio::test]
    async fn empty_query_response_ends_the_listing() {
        let transport = MockTransport::new()
            .respond(page("Vendor", 1..3))
            .respond(json!({ "QueryResponse": {}, "time": "2024-01-01T00:00:00Z" }));

        let records = list(&transport, Resource::Vendor, return_all(), 2).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn limit_clamps_the_last_page() {
        let transport = MockTransport::new()
            .respond(page("Customer", 1..3))
            .respond(page("Customer", 3..4));

        let params = ListParameters {
            limit: 3,
            ..ListParameters::default()
        };
        let records = list(&transport, Resource::Customer, params, 2).await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            queries(&transport),
            [
                "SELECT * FROM Customer STARTPOSITION 1 MAXRESULTS 2",
                "SELECT * FROM Customer STARTPOSITION 3 MAXRESULTS 1",
            ]
        );
    }

    #[tokio::test]
    async fn cursor_reports_exhaustion() {
        let transport = MockTransport::new().respond(page("Item", 1..2));
        let mut listing = Listing::new(&transport, Resource::Item, return_all(), 10);

        assert_eq!(listing.next_page().await.unwrap().map(|p| p.len()), Some(1));
        assert_eq!(listing.next_page().await.unwrap(), None);
        assert_eq!(transport.calls(), 1);
    }

    #[test]
    fn filters_render_into_the_statement() {
        let filters = Filters::from_map(
            json!({
                "query": "where Balance > '0'",
                "modifiedSince": "2024-03-01T10:00:00Z",
                "orderBy": "TxnDate DESC"
            })
            .as_object()
            .unwrap(),
        )
        .unwrap();

        let transport = MockTransport::new();
        let params = ListParameters {
            filters,
            ..ListParameters::default()
        };
        let listing = Listing::new(&transport, Resource::Invoice, params, 1000);

        assert_eq!(
            listing.statement().unwrap(),
            "SELECT * FROM Invoice WHERE Balance > '0' AND MetaData.LastUpdatedTime >= '2024-03-01T10:00:00Z' ORDERBY TxnDate DESC STARTPOSITION 1 MAXRESULTS 50"
        );
    }

    #[test]
    fn bad_timestamps_are_rejected() {
        let filters = json!({ "modifiedSince": "yesterday" });
        let err = Filters::from_map(filters.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn list_parameters_read_host_names() {
        let params = Parameters::new()
            .with("returnAll", false)
            .with("limit", 5)
            .with("flattenLines", true);
        let parsed = ListParameters::from_parameters(&params).unwrap();
        assert_eq!(parsed.limit, 5);
        assert!(parsed.flatten_lines);
        assert!(!parsed.return_all);

        let params = Parameters::new().with("limit", 0);
        assert!(ListParameters::from_parameters(&params).is_err());
    }

    #[tokio::test]
    async fn flattening_emits_one_record_per_line() {
        let transport = MockTransport::new().respond(json!({
            "QueryResponse": {
                "Invoice": [
                    {
                        "Id": "130",
                        "DocNumber": "1037",
                        "Line": [
                            { "Id": "1", "Amount": 50, "DetailType": "SalesItemLineDetail" },
                            { "Amount": 50, "DetailType": "SubTotalLineDetail" }
                        ]
                    },
                    { "Id": "131", "Line": [{ "Id": "1", "Amount": 10 }] },
                    { "Id": "132" }
                ]
            }
        }));

        let params = ListParameters {
            flatten_lines: true,
            ..return_all()
        };
        let records = list(&transport, Resource::Invoice, params, 10).await.unwrap();

        assert_eq!(
            records,
            vec![
                json!({ "Id": "1", "Amount": 50, "DetailType": "SalesItemLineDetail", "TxnId": "130", "TxnType": "Invoice", "DocNumber": "1037" }),
                json!({ "Amount": 50, "DetailType": "SubTotalLineDetail", "TxnId": "130", "TxnType": "Invoice", "DocNumber": "1037" }),
                json!({ "Id": "1", "Amount": 10, "TxnId": "131", "TxnType": "Invoice" }),
            ]
        );
    }

    #[tokio::test]
    async fn limit_counts_flattened_lines() {
        let lines = json!([
            { "Id": "1", "Amount": 1 },
            { "Id": "2", "Amount": 2 },
            { "Id": "3", "Amount": 3 }
        ]);
        let transport = MockTransport::new().respond(json!({
            "QueryResponse": {
                "Invoice": [
                    { "Id": "130", "Line": lines.clone() },
                    { "Id": "131", "Line": lines }
                ]
            }
        }));

        let params = ListParameters {
            limit: 2,
            flatten_lines: true,
            ..ListParameters::default()
        };
        let records = list(&transport, Resource::Invoice, params, 10).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["Id"], "1");
        assert_eq!(records[1]["Id"], "2");
        assert!(records.iter().all(|r| r["TxnId"] == "130"));
        assert_eq!(transport.calls(), 1);
        assert!(queries(&transport)[0].ends_with("MAXRESULTS 2"));
    }

    #[tokio::test]
    async fn flattening_is_ignored_for_name_lists() {
        let transport = MockTransport::new().respond(page("Customer", 1..3));
        let params = ListParameters {
            flatten_lines: true,
            ..return_all()
        };
        let records = list(&transport, Resource::Customer, params, 10).await.unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn count_reads_total_count() {
        let transport = MockTransport::new()
            .respond(json!({ "QueryResponse": { "totalCount": 42 }, "time": "2024-01-01" }));
        let filters = Filters {
            query: Some("Active = true".to_string()),
            ..Filters::default()
        };

        assert_eq!(count(&transport, Resource::Customer, &filters).await.unwrap(), 42);
        assert_eq!(
            queries(&transport),
            ["SELECT COUNT(*) FROM Customer WHERE Active = true"]
        );
    }

    #[tokio::test]
    async fn load_options_maps_display_names() {
        let transport = MockTransport::new().respond(json!({
            "QueryResponse": {
                "Vendor": [
                    { "Id": "56", "DisplayName": "Bob's Burger Joint" },
                    { "Id": 57, "DisplayName": "Cal Telephone" },
                    { "Id": "58" }
                ]
            }
        }));

        let options = load_options(&transport, Resource::Vendor).await.unwrap();
        assert_eq!(
            options,
            vec![
                OptionItem { name: "Bob's Burger Joint".to_string(), value: "56".to_string() },
                OptionItem { name: "Cal Telephone".to_string(), value: "57".to_string() },
            ]
        );

        assert!(load_options(&transport, Resource::Invoice).await.is_err());
    }
}
