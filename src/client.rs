use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode, header};
use serde_json::Value;
use tokio::time::sleep;
use url::Url;

use crate::{
    config::{ClientOptions, Credentials, RequestOptions},
    endpoints::Endpoint,
    error::{self, Error, Result},
    request::ApiRequest,
    transport::Transport,
};

const JSON: &str = "application/json";
const PDF: &str = "application/pdf";
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// This is the client that is used for interacting with the QuickBooks Online API. It presents
/// the host's OAuth 2 access token and scopes every call to one company.
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    credentials: Credentials,
    base_url: Url,
    request_options: RequestOptions,
    options: ClientOptions,
}

impl Client {
    /// Creates a client with default options.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_options(credentials, ClientOptions::default(), RequestOptions::default())
    }

    pub fn with_options(
        credentials: Credentials,
        options: ClientOptions,
        request_options: RequestOptions,
    ) -> Result<Self> {
        let base_url = credentials.environment.base_url()?;
        let http = Self::build_http_client(&credentials, &options)?;
        debug!(
            company_id = %credentials.company_id,
            environment = %credentials.environment,
            "created QuickBooks client"
        );
        Ok(Self {
            http,
            credentials,
            base_url,
            request_options,
            options,
        })
    }

    #[instrument(skip_all)]
    fn build_http_client(credentials: &Credentials, options: &ClientOptions) -> Result<reqwest::Client> {
        let mut authorization =
            header::HeaderValue::from_str(&format!("Bearer {}", credentials.access_token.secret()))
                .map_err(|_| Error::Configuration("access token is not a valid header value".to_string()))?;
        authorization.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, authorization);

        reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(Error::Request)
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Resolves `endpoint` against the configured host, appending `query` and the request options.
    pub fn url(&self, endpoint: &Endpoint, query: &[(String, String)]) -> Result<Url> {
        let mut url = endpoint.to_url(&self.base_url, &self.credentials.company_id)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        self.request_options.apply_to_url(&mut url);
        Ok(url)
    }

    /// Build a request object accepting `accept`.
    fn build_request(&self, method: reqwest::Method, url: Url, accept: &'static str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(header::ACCEPT, accept)
    }

    /// Execute a request with automatic retry for rate limit errors
    async fn execute_with_retry<T, F, Fut>(&self, request_fn: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match request_fn().await {
                Err(Error::RateLimitExceeded { retry_after, .. })
                    if attempts <= self.options.max_retry_attempts =>
                {
                    let wait_time = retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
                    warn!(
                        attempt = attempts,
                        max_attempts = self.options.max_retry_attempts,
                        ?wait_time,
                        "rate limit exceeded, waiting before retrying"
                    );
                    sleep(wait_time).await;
                }
                result => return result,
            }
        }
    }

    /// Turns a non-success status and its body into an error.
    fn error_for_status(status: StatusCode, url: String, entity: &str, text: String) -> Error {
        if status == StatusCode::UNAUTHORIZED {
            warn!(%url, "request was not authorized");
            return Error::Unauthorized {
                url,
                response_body: Some(text),
            };
        }

        let fault = serde_json::from_str::<error::Response>(&text).ok().map(|r| r.fault);
        let not_found = status == StatusCode::NOT_FOUND
            || fault.as_ref().is_some_and(error::Fault::is_object_not_found);

        if not_found {
            return Error::NotFound {
                entity: entity.to_string(),
                url,
                status_code: status,
                response_body: Some(text),
                span_trace: tracing_error::SpanTrace::capture(),
            };
        }

        match fault {
            Some(fault) => {
                error!(%status, %fault, "QuickBooks API fault");
                Error::API {
                    fault,
                    status_code: status,
                    url,
                    span_trace: tracing_error::SpanTrace::capture(),
                }
            }
            None => {
                error!(%status, "unexpected status code");
                Error::UnexpectedResponse {
                    url,
                    message: format!("status {status}: {}", text.chars().take(200).collect::<String>()),
                }
            }
        }
    }

    fn rate_limited(response: &reqwest::Response) -> Option<Option<Duration>> {
        (response.status() == StatusCode::TOO_MANY_REQUESTS).then(|| {
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        })
    }

    async fn handle_response(response: reqwest::Response, entity: &str) -> Result<Value> {
        let status = response.status();
        let url = response.url().to_string();

        debug!(%url, %status, entity, "response received");

        if let Some(retry_after) = Self::rate_limited(&response) {
            warn!(%url, ?retry_after, "rate limit exceeded");
            let text = response.text().await.unwrap_or_default();
            return Err(Error::RateLimitExceeded {
                retry_after,
                status_code: status,
                url,
                response_body: Some(text),
            });
        }

        let text = response.text().await?;
        debug!(bytes = text.len(), "response body received");
        trace!("Response text:\n{}", text);

        if !status.is_success() {
            return Err(Self::error_for_status(status, url, entity, text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        let value: Value = serde_json::from_str(&text).map_err(|e| {
            error!(
                error = %e,
                column = e.column(),
                near = %text.chars().skip(e.column().saturating_sub(30)).take(100).collect::<String>(),
                "failed to deserialize response"
            );
            Error::DeserializationError(e, Some(text.clone()))
        })?;

        // A fault can arrive with a 200 status.
        if value.get("Fault").is_some() {
            return Err(Self::error_for_status(status, url, entity, text));
        }

        Ok(value)
    }
}

fn entity_label(endpoint: &Endpoint) -> &'static str {
    endpoint.resource().map_or("QueryResponse", |r| r.entity_name())
}

impl Transport for Client {
    #[instrument(skip(self, request), fields(method = %request.method, endpoint = %request.endpoint))]
    async fn send(&self, request: &ApiRequest) -> Result<Value> {
        if let Some(pending) = request.pending_sync_token() {
            return Err(Error::validation(format!(
                "sync token for entity {} has not been fetched",
                pending.id
            )));
        }

        let url = self.url(&request.endpoint, &request.query)?;
        let entity = entity_label(&request.endpoint);

        self.execute_with_retry(|| async {
            trace!(body = ?request.body, %url, "making request");
            let mut builder = self.build_request(request.method.clone(), url.clone(), JSON);
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }
            let response = builder.send().await?;
            Self::handle_response(response, entity).await
        })
        .await
    }

    #[instrument(skip(self), fields(endpoint = %endpoint))]
    async fn fetch_pdf(&self, endpoint: &Endpoint) -> Result<Vec<u8>> {
        let url = self.url(endpoint, &[])?;
        let entity = entity_label(endpoint);

        self.execute_with_retry(|| async {
            trace!(%url, "downloading PDF");
            let response = self
                .build_request(reqwest::Method::GET, url.clone(), PDF)
                .send()
                .await?;

            let status = response.status();
            if let Some(retry_after) = Self::rate_limited(&response) {
                return Err(Error::RateLimitExceeded {
                    retry_after,
                    status_code: status,
                    url: url.to_string(),
                    response_body: None,
                });
            }
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(Self::error_for_status(status, url.to_string(), entity, text));
            }

            let bytes = response.bytes().await?;
            debug!(bytes = bytes.len(), "PDF received");
            Ok(bytes.to_vec())
        })
        .await
    }
}
