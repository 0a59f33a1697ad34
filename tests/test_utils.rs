use std::sync::Once;

use quickbooks_rs::{
    Client, ClientOptions, Credentials, Environment, QuickBooks, RequestOptions,
};
use tracing::info;
use url::Url;
use wiremock::MockServer;

pub const COMPANY_ID: &str = "4620816365";
pub const ACCESS_TOKEN: &str = "test-access-token";

/// Path below the mock server for `suffix`, e.g. `company_path("/invoice")`.
#[allow(dead_code)]
pub fn company_path(suffix: &str) -> String {
    format!("/v3/company/{COMPANY_ID}{suffix}")
}

/// A client pointed at `server`, with no retry delay surprises.
#[allow(dead_code)]
pub fn mock_client(server: &MockServer, options: ClientOptions, request_options: RequestOptions) -> Client {
    let base = Url::parse(&server.uri()).expect("mock server uri");
    Client::with_options(
        Credentials::new(ACCESS_TOKEN, COMPANY_ID, Environment::Custom(base)),
        options,
        request_options,
    )
    .expect("client")
}

/// Actions over a default client pointed at `server`.
#[allow(dead_code)]
pub fn mock_actions(server: &MockServer) -> QuickBooks<Client> {
    QuickBooks::from_client(mock_client(
        server,
        ClientOptions::default(),
        RequestOptions::default(),
    ))
}

static LOGGING_CONFIGURED: Once = Once::new();

/// Setup before test runs
pub fn do_setup() {
    LOGGING_CONFIGURED.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .init();
    });
    info!("Setting up test environment");
}
