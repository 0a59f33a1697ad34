//! Nested sub-objects the API expects for contact details.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailAddress {
    pub address: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TelephoneNumber {
    pub free_form_number: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomField {
    pub definition_id: String,
    pub string_value: String,
    pub r#type: String,
}

impl CustomField {
    #[must_use]
    pub fn string(definition_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            definition_id: definition_id.into(),
            string_value: value.into(),
            r#type: "StringType".to_string(),
        }
    }
}

/// A physical address (`BillAddr`, `ShipAddr`) with blank sub-fields removed.
///
/// Accepts either the address object itself or one nested under `details`.
pub fn physical_address(field: &str, input: Value) -> Result<Value> {
    let details = match input {
        Value::Object(mut map) => match map.remove("details") {
            Some(Value::Object(details)) => details,
            Some(_) => {
                return Err(Error::validation(format!(
                    "`{field}.details` must be an object"
                )));
            }
            None => map,
        },
        _ => return Err(Error::validation(format!("`{field}` must be an object"))),
    };

    let address: Map<String, Value> = details
        .into_iter()
        .filter(|(_, v)| !matches!(v, Value::String(s) if s.is_empty()))
        .collect();
    Ok(Value::Object(address))
}
