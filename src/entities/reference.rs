use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A pointer to another entity, e.g. `VendorRef` or `APAccountRef`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub value: String,
}

impl Reference {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }

    /// Normalizes any accepted input shape into a reference.
    ///
    /// Accepted shapes are a flat string or number (`"42"`), an object with `value`
    /// (and optionally `name`), or the same object nested under `details`.
    pub fn from_input(field: &str, input: &Value) -> Result<Self> {
        let invalid = || Error::validation(format!("`{field}` must be an id or a {{name, value}} pair"));

        match input {
            Value::String(s) if !s.is_empty() => Ok(Self::new(s.as_str())),
            Value::Number(n) => Ok(Self::new(n.to_string())),
            Value::Object(map) => {
                if let Some(details) = map.get("details") {
                    return Self::from_input(field, details);
                }
                let value = match map.get("value") {
                    Some(Value::String(s)) if !s.is_empty() => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => return Err(invalid()),
                };
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
                Ok(Self { name, value })
            }
            _ => Err(invalid()),
        }
    }

    /// The `{value}` form, used for the required top-level references.
    #[must_use]
    pub fn value_only(self) -> Self {
        Self {
            name: None,
            value: self.value,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        let mut map = serde_json::Map::new();
        if let Some(name) = self.name {
            map.insert("name".to_string(), Value::String(name));
        }
        map.insert("value".to_string(), Value::String(self.value));
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn details_object_keeps_name_and_value() {
        let input = json!({ "details": { "name": "Accounts Payable", "value": "33" } });
        let reference = Reference::from_input("APAccountRef", &input).unwrap();
        assert_eq!(reference, Reference::named("Accounts Payable", "33"));
        assert_eq!(
            reference.into_value(),
            json!({ "name": "Accounts Payable", "value": "33" })
        );
    }

    #[test]
    fn flat_ids_become_value_only() {
        assert_eq!(
            Reference::from_input("VendorRef", &json!("56")).unwrap().into_value(),
            json!({ "value": "56" })
        );
        assert_eq!(
            Reference::from_input("VendorRef", &json!(56)).unwrap().into_value(),
            json!({ "value": "56" })
        );
    }

    #[test]
    fn value_only_drops_the_name() {
        let reference = Reference::from_input("CustomerRef", &json!({ "name": "Amy", "value": 1 }))
            .unwrap()
            .value_only();
        assert_eq!(reference.into_value(), json!({ "value": "1" }));
    }

    #[test]
    fn empty_and_malformed_inputs_are_rejected() {
        assert!(Reference::from_input("VendorRef", &json!("")).is_err());
        assert!(Reference::from_input("VendorRef", &json!(true)).is_err());
        assert!(Reference::from_input("VendorRef", &json!({ "name": "x" })).is_err());
    }
}
