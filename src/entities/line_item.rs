use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    entities::{Reference, Resource},
    error::{Error, Result},
    utils::serde_helpers::{empty_string_as_none, id_as_string},
};

pub const ACCOUNT_BASED_EXPENSE: &str = "AccountBasedExpenseLineDetail";
pub const ITEM_BASED_EXPENSE: &str = "ItemBasedExpenseLineDetail";
pub const SALES_ITEM: &str = "SalesItemLineDetail";

/// A transaction line as supplied by the caller.
///
/// `accountId` and `itemId` are shorthands that are folded into the detail object named by
/// `DetailType`. Every other key is sent unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Line {
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub detail_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        serialize_with = "rust_decimal::serde::float_option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<Decimal>,
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        rename = "accountId",
        default,
        deserialize_with = "id_as_string",
        skip_serializing
    )]
    pub account_id: Option<String>,
    #[serde(
        rename = "itemId",
        default,
        deserialize_with = "id_as_string",
        skip_serializing
    )]
    pub item_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Line {
    #[must_use]
    pub fn new(detail_type: impl Into<String>, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            detail_type: Some(detail_type.into()),
            amount: Some(amount),
            description: Some(description.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    #[must_use]
    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    /// An amount of zero counts as unset.
    fn is_complete(&self) -> bool {
        self.detail_type.is_some()
            && self.amount.is_some_and(|amount| !amount.is_zero())
            && self.description.is_some()
    }

    /// Converts the line into its wire shape for `resource`, expanding the id shorthands.
    pub fn into_payload(mut self, resource: Resource) -> Result<Value> {
        let detail_type = self.detail_type.clone().unwrap_or_default();
        let expansion = match (resource, detail_type.as_str()) {
            (Resource::Bill, ACCOUNT_BASED_EXPENSE) => {
                self.account_id.take().map(|id| ("AccountRef", id))
            }
            (Resource::Bill, ITEM_BASED_EXPENSE) => self.item_id.take().map(|id| ("ItemRef", id)),
            (Resource::Estimate | Resource::Invoice, SALES_ITEM) => {
                self.item_id.take().map(|id| ("ItemRef", id))
            }
            _ => None,
        };

        let leftover = match (&self.account_id, &self.item_id) {
            (Some(_), _) => Some("accountId"),
            (None, Some(_)) => Some("itemId"),
            (None, None) => None,
        };
        if let Some(shorthand) = leftover {
            return Err(Error::validation(format!(
                "`{shorthand}` cannot be used on a `{detail_type}` line of a {resource}"
            )));
        }

        if let Some((ref_key, id)) = expansion {
            let detail = self
                .extra
                .entry(detail_type)
                .or_insert_with(|| Value::Object(Map::new()));
            match detail {
                Value::Object(detail) => {
                    detail.insert(ref_key.to_string(), Reference::new(id).into_value());
                }
                _ => {
                    return Err(Error::validation(format!(
                        "line detail `{}` must be an object",
                        self.detail_type.unwrap_or_default()
                    )));
                }
            }
        }

        Ok(serde_json::to_value(self)?)
    }
}

/// Parses the caller's `Line` parameter.
pub fn parse(input: Value) -> Result<Vec<Line>> {
    match input {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(input)
            .map_err(|e| Error::validation(format!("`Line` entries are malformed: {e}"))),
        Value::Object(_) => Ok(vec![
            serde_json::from_value(input)
                .map_err(|e| Error::validation(format!("`Line` entry is malformed: {e}")))?,
        ]),
        _ => Err(Error::validation("`Line` must be a list of line objects")),
    }
}

/// Checks the line invariants: at least one line, and every line has a detail type, an
/// amount and a description.
pub fn validate(lines: &[Line], resource: Resource) -> Result<()> {
    if lines.is_empty() {
        return Err(Error::validation(format!(
            "enter at least one line for the {resource}"
        )));
    }
    if let Some(position) = lines.iter().position(|line| !line.is_complete()) {
        return Err(Error::validation(format!(
            "line {} needs a detail type, an amount and a description",
            position + 1
        )));
    }
    Ok(())
}

/// Validates and converts lines into their wire shape, preserving order.
pub fn process(lines: Vec<Line>, resource: Resource) -> Result<Value> {
    validate(&lines, resource)?;
    lines
        .into_iter()
        .map(|line| line.into_payload(resource))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}
