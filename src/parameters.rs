use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    entities::Resource,
    error::{Error, Result},
    utils::serde_helpers::value_to_id,
};

/// The per-item parameters supplied by the host, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Map<String, Value>);

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, returning the updated parameters.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn required(&self, name: &str) -> Result<&Value> {
        self.get(name).ok_or_else(|| Error::MissingParameter {
            name: name.to_string(),
        })
    }

    /// A required, non-empty text parameter. Numbers are rendered as text.
    pub fn string(&self, name: &str) -> Result<String> {
        match self.required(name)? {
            Value::String(s) if s.trim().is_empty() => Err(Error::MissingParameter {
                name: name.to_string(),
            }),
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(Error::validation(format!("`{name}` must be text"))),
        }
    }

    #[must_use]
    pub fn optional_string(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// A boolean flag; absent means `false`.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn unsigned(&self, name: &str) -> Result<Option<u32>> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .or_else(|| {
                    value
                        .as_f64()
                        .filter(|f| f.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(f))
                        .map(|f| f as u64)
                })
                .and_then(|n| u32::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| Error::validation(format!("`{name}` must be a positive integer"))),
        }
    }

    /// An optional field collection such as `additionalFields`; absent means empty.
    pub fn object(&self, name: &str) -> Result<Map<String, Value>> {
        match self.get(name) {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(Error::validation(format!("`{name}` must be an object"))),
        }
    }

    /// The entity id for `resource`, read from `{resource}Id`.
    pub fn id(&self, resource: Resource) -> Result<String> {
        let name = resource.id_parameter();
        let value = self.required(&name)?;
        value_to_id(value).ok_or(Error::MissingParameter { name })
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Parameters {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(Error::validation("parameters must be a JSON object")),
        }
    }
}
