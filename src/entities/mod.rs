use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub mod contact;
pub mod line_item;
pub mod reference;

pub use line_item::Line;
pub use reference::Reference;

/// An accounting entity exposed as an action resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Bill,
    Customer,
    Employee,
    Estimate,
    Invoice,
    Item,
    Payment,
    Vendor,
}

impl Resource {
    pub const ALL: [Self; 8] = [
        Self::Bill,
        Self::Customer,
        Self::Employee,
        Self::Estimate,
        Self::Invoice,
        Self::Item,
        Self::Payment,
        Self::Vendor,
    ];

    /// Lowercase name, used as the URL path segment and for parameter names like `invoiceId`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bill => "bill",
            Self::Customer => "customer",
            Self::Employee => "employee",
            Self::Estimate => "estimate",
            Self::Invoice => "invoice",
            Self::Item => "item",
            Self::Payment => "payment",
            Self::Vendor => "vendor",
        }
    }

    /// Entity name as used in response envelopes and query statements.
    #[must_use]
    pub const fn entity_name(self) -> &'static str {
        match self {
            Self::Bill => "Bill",
            Self::Customer => "Customer",
            Self::Employee => "Employee",
            Self::Estimate => "Estimate",
            Self::Invoice => "Invoice",
            Self::Item => "Item",
            Self::Payment => "Payment",
            Self::Vendor => "Vendor",
        }
    }

    /// Whether the `(self, operation)` pair is a legal action.
    #[must_use]
    pub const fn supports(self, operation: Operation) -> bool {
        use Operation::{Create, Delete, Get, GetAll, Update};

        match self {
            Self::Item => matches!(operation, Get | GetAll),
            Self::Customer | Self::Employee | Self::Vendor => {
                matches!(operation, Create | Get | GetAll | Update)
            }
            Self::Bill | Self::Estimate => {
                matches!(operation, Create | Get | GetAll | Update | Delete)
            }
            Self::Invoice | Self::Payment => true,
        }
    }

    /// Whether a PDF rendition can be downloaded on `get`.
    #[must_use]
    pub const fn supports_pdf(self) -> bool {
        matches!(self, Self::Estimate | Self::Invoice | Self::Payment)
    }

    /// Whether listing responses nest a `Line` array under each entity.
    #[must_use]
    pub const fn has_lines(self) -> bool {
        matches!(
            self,
            Self::Bill | Self::Estimate | Self::Invoice | Self::Payment
        )
    }

    /// Name of the host parameter carrying the entity id, e.g. `invoiceId`.
    #[must_use]
    pub fn id_parameter(self) -> String {
        format!("{}Id", self.as_str())
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::validation(format!("unknown resource `{s}`")))
    }
}

/// An action that can be applied to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create,
    Get,
    GetAll,
    Update,
    Delete,
    Send,
    Void,
}

impl Operation {
    pub const ALL: [Self; 7] = [
        Self::Create,
        Self::Get,
        Self::GetAll,
        Self::Update,
        Self::Delete,
        Self::Send,
        Self::Void,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::GetAll => "getAll",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Send => "send",
            Self::Void => "void",
        }
    }

    /// Mutations that must carry the entity's current `SyncToken`.
    #[must_use]
    pub const fn requires_sync_token(self) -> bool {
        matches!(self, Self::Update | Self::Delete | Self::Void)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::validation(format!("unknown operation `{s}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_and_void_are_limited_to_invoice_and_payment() {
        for resource in Resource::ALL {
            let expected = matches!(resource, Resource::Invoice | Resource::Payment);
            assert_eq!(resource.supports(Operation::Send), expected, "{resource} send");
            assert_eq!(resource.supports(Operation::Void), expected, "{resource} void");
        }
    }

    #[test]
    fn every_resource_can_be_read_and_listed() {
        for resource in Resource::ALL {
            assert!(resource.supports(Operation::Get));
            assert!(resource.supports(Operation::GetAll));
        }
        assert!(!Resource::Item.supports(Operation::Create));
        assert!(!Resource::Customer.supports(Operation::Delete));
        assert!(Resource::Bill.supports(Operation::Delete));
    }

    #[test]
    fn names_round_trip_through_from_str() {
        for resource in Resource::ALL {
            assert_eq!(resource.as_str().parse::<Resource>().unwrap(), resource);
        }
        for operation in Operation::ALL {
            assert_eq!(operation.as_str().parse::<Operation>().unwrap(), operation);
        }
        assert_eq!("Invoice".parse::<Resource>().unwrap(), Resource::Invoice);
        assert!("journal".parse::<Resource>().is_err());
    }

    #[test]
    fn id_parameter_follows_resource_name() {
        assert_eq!(Resource::Invoice.id_parameter(), "invoiceId");
        assert_eq!(Resource::Bill.id_parameter(), "billId");
    }
}
