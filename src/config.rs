use std::{fmt, str::FromStr};

use oauth2::AccessToken;
use url::Url;

use crate::error::{Error, Result};

pub const PRODUCTION_URL: &str = "https://quickbooks.api.intuit.com";
pub const SANDBOX_URL: &str = "https://sandbox-quickbooks.api.intuit.com";

const COMPANY_ID_VAR: &str = "QUICKBOOKS_COMPANY_ID";
const ACCESS_TOKEN_VAR: &str = "QUICKBOOKS_ACCESS_TOKEN";
const ENVIRONMENT_VAR: &str = "QUICKBOOKS_ENVIRONMENT";

/// Which QuickBooks Online host the company lives on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Production,
    Sandbox,
    /// Any other base URL, e.g. a local mock server.
    Custom(Url),
}

impl Environment {
    pub fn base_url(&self) -> Result<Url> {
        match self {
            Self::Production => Ok(Url::parse(PRODUCTION_URL)?),
            Self::Sandbox => Ok(Url::parse(SANDBOX_URL)?),
            Self::Custom(url) => Ok(url.clone()),
        }
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "production" => Ok(Self::Production),
            "sandbox" => Ok(Self::Sandbox),
            _ => Url::parse(s.trim()).map(Self::Custom).map_err(|_| {
                Error::Configuration(format!(
                    "`{s}` is not `production`, `sandbox` or a base URL"
                ))
            }),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Sandbox => f.write_str("sandbox"),
            Self::Custom(url) => write!(f, "{url}"),
        }
    }
}

/// The OAuth 2 access token and company the host has already authorized.
///
/// Token acquisition and refresh stay with the host; this crate only presents the token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub(crate) access_token: AccessToken,
    pub(crate) company_id: String,
    pub(crate) environment: Environment,
}

impl Credentials {
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        company_id: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            access_token: AccessToken::new(access_token.into()),
            company_id: company_id.into(),
            environment,
        }
    }

    /// Reads `QUICKBOOKS_COMPANY_ID`, `QUICKBOOKS_ACCESS_TOKEN` and the optional
    /// `QUICKBOOKS_ENVIRONMENT` (`production`, `sandbox` or a base URL).
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::Configuration(format!("{name} not set")))
        };

        let environment = match std::env::var(ENVIRONMENT_VAR) {
            Ok(value) => value.parse()?,
            Err(_) => Environment::default(),
        };

        Ok(Self::new(var(ACCESS_TOKEN_VAR)?, var(COMPANY_ID_VAR)?, environment))
    }

    #[must_use]
    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}

/// Options applied to every API request.
#[derive(Debug, Default, Clone)]
pub struct RequestOptions {
    /// API minor version, sent as `minorversion`. Unset uses the account default.
    pub minor_version: Option<u16>,
}

impl RequestOptions {
    /// Apply the options as query parameters to a URL.
    pub fn apply_to_url(&self, url: &mut Url) {
        if let Some(minor_version) = self.minor_version {
            url.query_pairs_mut()
                .append_pair("minorversion", &minor_version.to_string());
        }
    }
}

/// Tuning for the HTTP client and listing.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Page size for `getAll` queries; capped at 1000 by the API.
    pub page_size: u32,
    /// Retries after a 429 before the error is surfaced.
    pub max_retry_attempts: usize,
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            page_size: 1000,
            max_retry_attempts: 3,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}
