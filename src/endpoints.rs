use std::fmt;

use url::Url;

use crate::entities::Resource;
use crate::error::{Error, Result};

/// A typed representation of the accounting API endpoints used by the actions.
///
/// Endpoints are relative to a company; [`Endpoint::path`] renders them under
/// `/v3/company/{companyId}/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// `/{resource}`: create, update, delete and void.
    Entity(Resource),
    /// `/{resource}/{id}`
    EntityById(Resource, String),
    /// `/{resource}/{id}/send`
    Send(Resource, String),
    /// `/{resource}/{id}/pdf`
    Pdf(Resource, String),
    /// `/query`, shared by every resource.
    Query,
}

impl Endpoint {
    /// Path below the API host, e.g. `/v3/company/123/invoice/42`. Segments are not escaped.
    #[must_use]
    pub fn path(&self, company_id: &str) -> String {
        format!("/{}", self.segments(company_id).join("/"))
    }

    fn segments<'a>(&'a self, company_id: &'a str) -> Vec<&'a str> {
        let mut segments = vec!["v3", "company", company_id];
        match self {
            Self::Entity(resource) => segments.push(resource.as_str()),
            Self::EntityById(resource, id) => segments.extend([resource.as_str(), id.as_str()]),
            Self::Send(resource, id) => segments.extend([resource.as_str(), id.as_str(), "send"]),
            Self::Pdf(resource, id) => segments.extend([resource.as_str(), id.as_str(), "pdf"]),
            Self::Query => segments.push("query"),
        }
        segments
    }

    fn id(&self) -> Option<&str> {
        match self {
            Self::EntityById(_, id) | Self::Send(_, id) | Self::Pdf(_, id) => Some(id.as_str()),
            Self::Entity(_) | Self::Query => None,
        }
    }

    /// Converts the endpoint to a URL on `base`, percent-encoding the entity id as a
    /// single path segment.
    pub fn to_url(&self, base: &Url, company_id: &str) -> Result<Url> {
        if company_id.is_empty() || company_id.contains('/') {
            return Err(Error::InvalidEndpoint);
        }
        if self.id().is_some_and(|id| matches!(id, "" | "." | "..")) {
            return Err(Error::InvalidEndpoint);
        }

        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| Error::InvalidEndpoint)?
            .clear()
            .extend(self.segments(company_id));
        Ok(url)
    }

    /// The resource this endpoint addresses, if any.
    #[must_use]
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Self::Entity(resource)
            | Self::EntityById(resource, _)
            | Self::Send(resource, _)
            | Self::Pdf(resource, _) => Some(*resource),
            Self::Query => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path("{companyId}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_scoped_to_the_company() {
        assert_eq!(
            Endpoint::Entity(Resource::Bill).path("123"),
            "/v3/company/123/bill"
        );
        assert_eq!(
            Endpoint::EntityById(Resource::Invoice, "42".to_string()).path("123"),
            "/v3/company/123/invoice/42"
        );
        assert_eq!(
            Endpoint::Send(Resource::Payment, "9".to_string()).path("123"),
            "/v3/company/123/payment/9/send"
        );
        assert_eq!(
            Endpoint::Pdf(Resource::Estimate, "8".to_string()).path("123"),
            "/v3/company/123/estimate/8/pdf"
        );
        assert_eq!(Endpoint::Query.path("123"), "/v3/company/123/query");
    }

    #[test]
    fn url_joins_onto_base() {
        let base = Url::parse("https://sandbox-quickbooks.api.intuit.com").unwrap();
        let url = Endpoint::Query.to_url(&base, "4620816365").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sandbox-quickbooks.api.intuit.com/v3/company/4620816365/query"
        );
        assert!(Endpoint::Query.to_url(&base, "").is_err());
        assert!(Endpoint::Query.to_url(&base, "1/2").is_err());
    }

    #[test]
    fn ids_cannot_escape_their_segment() {
        let base = Url::parse("https://sandbox-quickbooks.api.intuit.com").unwrap();
        let url = Endpoint::EntityById(Resource::Invoice, "42/pdf?x=1#".to_string())
            .to_url(&base, "123")
            .unwrap();
        assert_eq!(url.path(), "/v3/company/123/invoice/42%2Fpdf%3Fx=1%23");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = Endpoint::Pdf(Resource::Invoice, "7 8".to_string())
            .to_url(&base, "123")
            .unwrap();
        assert_eq!(url.path(), "/v3/company/123/invoice/7%208/pdf");

        for id in ["", ".", ".."] {
            let endpoint = Endpoint::EntityById(Resource::Invoice, id.to_string());
            assert!(endpoint.to_url(&base, "123").is_err(), "{id:?}");
        }
    }
}
