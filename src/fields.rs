//! Per-resource translation of caller field maps into request bodies.
//!
//! Each resource declares one table for `create` and one for `update`. A table maps a field
//! name to the transform that writes it into the body; keys that are not listed are copied
//! verbatim.

use serde_json::{Map, Value, json};

use crate::{
    entities::{
        Reference, Resource,
        contact::{self, CustomField, EmailAddress, TelephoneNumber},
        line_item,
    },
    error::{Error, Result},
};

/// Writes one caller field into the body.
pub type Transform = fn(&mut Map<String, Value>, &str, Value, Resource) -> Result<()>;

/// Which request the fields are applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

#[derive(Debug)]
pub struct FieldTable {
    special: &'static [(&'static str, Transform)],
    /// Treat any other key ending in `Ref` as a `{name, value}` reference.
    ref_suffix: bool,
}

impl FieldTable {
    /// The table for `resource` in `mode`.
    #[must_use]
    pub fn lookup(resource: Resource, mode: Mode) -> &'static Self {
        match (resource, mode) {
            (Resource::Bill, Mode::Create) => &BILL_CREATE,
            (Resource::Bill, Mode::Update) => &BILL_UPDATE,
            (Resource::Customer, Mode::Create) => &CUSTOMER_CREATE,
            (Resource::Customer, Mode::Update) => &CUSTOMER_UPDATE,
            (Resource::Estimate | Resource::Invoice, Mode::Create) => &SALES_CREATE,
            (Resource::Estimate | Resource::Invoice, Mode::Update) => &SALES_UPDATE,
            (Resource::Employee | Resource::Item | Resource::Payment | Resource::Vendor, _) => {
                &VERBATIM
            }
        }
    }

    fn transform_for(&self, key: &str) -> Option<Transform> {
        self.special
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, transform)| *transform)
            .or_else(|| {
                (self.ref_suffix && key.ends_with("Ref")).then_some(named_reference as Transform)
            })
    }

    /// Applies every caller field to `body`.
    pub fn apply(
        &self,
        body: &mut Map<String, Value>,
        fields: Map<String, Value>,
        resource: Resource,
    ) -> Result<()> {
        for (key, value) in fields {
            match self.transform_for(&key) {
                Some(transform) => transform(body, &key, value, resource)?,
                None => {
                    body.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

static VERBATIM: FieldTable = FieldTable {
    special: &[],
    ref_suffix: false,
};

static BILL_CREATE: FieldTable = FieldTable {
    special: &[
        ("APAccountRef", named_reference),
        ("SalesTermRef", named_reference),
    ],
    ref_suffix: false,
};

static BILL_UPDATE: FieldTable = FieldTable {
    special: &[
        ("APAccountRef", named_reference),
        ("SalesTermRef", named_reference),
        ("VendorRef", value_reference),
        ("Line", lines),
    ],
    ref_suffix: false,
};

static CUSTOMER_CREATE: FieldTable = FieldTable {
    special: &[
        ("BillingAddress", billing_address),
        ("PrimaryEmailAddr", primary_email),
        ("PrimaryPhone", primary_phone),
    ],
    ref_suffix: false,
};

static CUSTOMER_UPDATE: FieldTable = FieldTable {
    special: &[
        ("BillingAddress", billing_address),
        ("PrimaryEmailAddr", primary_email),
        ("PrimaryPhone", primary_phone),
    ],
    ref_suffix: false,
};

static SALES_CREATE: FieldTable = FieldTable {
    special: &[
        ("BillingAddress", billing_address),
        ("ShippingAddress", shipping_address),
        ("BillEmail", bill_email),
        ("CustomerMemo", customer_memo),
        ("TotalTax", total_tax),
        ("CustomFields", custom_fields),
    ],
    ref_suffix: true,
};

static SALES_UPDATE: FieldTable = FieldTable {
    special: &[
        ("BillingAddress", billing_address),
        ("ShippingAddress", shipping_address),
        ("BillEmail", bill_email),
        ("CustomerMemo", customer_memo),
        ("TotalTax", total_tax),
        ("CustomFields", custom_fields),
        ("CustomerRef", value_reference),
        ("Line", lines),
    ],
    ref_suffix: true,
};

fn text(key: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::validation(format!("`{key}` must be text"))),
    }
}

fn named_reference(
    body: &mut Map<String, Value>,
    key: &str,
    value: Value,
    _: Resource,
) -> Result<()> {
    let reference = Reference::from_input(key, &value)?;
    body.insert(key.to_string(), reference.into_value());
    Ok(())
}

fn value_reference(
    body: &mut Map<String, Value>,
    key: &str,
    value: Value,
    _: Resource,
) -> Result<()> {
    let reference = Reference::from_input(key, &value)?.value_only();
    body.insert(key.to_string(), reference.into_value());
    Ok(())
}

fn billing_address(
    body: &mut Map<String, Value>,
    key: &str,
    value: Value,
    _: Resource,
) -> Result<()> {
    body.insert("BillAddr".to_string(), contact::physical_address(key, value)?);
    Ok(())
}

fn shipping_address(
    body: &mut Map<String, Value>,
    key: &str,
    value: Value,
    _: Resource,
) -> Result<()> {
    body.insert("ShipAddr".to_string(), contact::physical_address(key, value)?);
    Ok(())
}

fn email(key: &str, value: Value) -> Result<Value> {
    let address = text(key, value)?;
    Ok(serde_json::to_value(EmailAddress { address })?)
}

fn primary_email(
    body: &mut Map<String, Value>,
    key: &str,
    value: Value,
    _: Resource,
) -> Result<()> {
    body.insert("PrimaryEmailAddr".to_string(), email(key, value)?);
    Ok(())
}

fn bill_email(body: &mut Map<String, Value>, key: &str, value: Value, _: Resource) -> Result<()> {
    body.insert("BillEmail".to_string(), email(key, value)?);
    Ok(())
}

fn primary_phone(
    body: &mut Map<String, Value>,
    key: &str,
    value: Value,
    _: Resource,
) -> Result<()> {
    let free_form_number = text(key, value)?;
    body.insert(
        "PrimaryPhone".to_string(),
        serde_json::to_value(TelephoneNumber { free_form_number })?,
    );
    Ok(())
}

fn customer_memo(
    body: &mut Map<String, Value>,
    _: &str,
    value: Value,
    _: Resource,
) -> Result<()> {
    body.insert("CustomerMemo".to_string(), json!({ "value": value }));
    Ok(())
}

fn total_tax(body: &mut Map<String, Value>, _: &str, value: Value, _: Resource) -> Result<()> {
    body.insert("TxnTaxDetail".to_string(), json!({ "TotalTax": value }));
    Ok(())
}

/// `CustomFields` arrives either as a list or as `{customFieldsValues: [...]}`, each entry
/// holding `DefinitionId` and `Value`.
fn custom_fields(
    body: &mut Map<String, Value>,
    key: &str,
    value: Value,
    _: Resource,
) -> Result<()> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("customFieldsValues") {
            Some(Value::Array(entries)) => entries,
            _ => Vec::new(),
        },
        _ => return Err(Error::validation(format!("`{key}` must be a list"))),
    };

    let fields = entries
        .into_iter()
        .map(|mut entry| {
            let definition_id = entry
                .get_mut("DefinitionId")
                .map(Value::take)
                .ok_or_else(|| Error::validation("custom field is missing `DefinitionId`"))?;
            let string_value = entry.get_mut("Value").map_or(Value::Null, Value::take);
            Ok(CustomField::string(
                text("DefinitionId", definition_id)?,
                text("Value", string_value).unwrap_or_default(),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    body.insert("CustomField".to_string(), serde_json::to_value(fields)?);
    Ok(())
}

fn lines(body: &mut Map<String, Value>, _: &str, value: Value, resource: Resource) -> Result<()> {
    let lines = line_item::process(line_item::parse(value)?, resource)?;
    body.insert("Line".to_string(), lines);
    Ok(())
}
