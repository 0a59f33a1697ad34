use miette::{Diagnostic, IntoDiagnostic};
use quickbooks_rs::{
    ActionItem, Error, Operation, Parameters, QuickBooks, Resource, error::Response,
};
use serde_json::json;

mod test_utils;

#[test]
fn validation_fault_deserializes() {
    let body = json!({
        "Fault": {
            "Error": [{
                "Message": "Required param missing, need to supply the required value for the API",
                "Detail": "Required parameter Line.Amount is missing in the request",
                "code": "2020",
                "element": "Line.Amount"
            }],
            "type": "ValidationFault"
        },
        "time": "2024-05-01T10:00:00.000-07:00"
    });

    let response: Response = serde_json::from_value(body).unwrap();
    assert_eq!(response.fault.error[0].element.as_deref(), Some("Line.Amount"));
    assert!(!response.fault.is_object_not_found());
    assert!(response.fault.to_string().contains("code 2020"));
}

#[test]
fn errors_carry_diagnostic_codes() {
    let error = Error::UnsupportedOperation {
        resource: Resource::Item,
        operation: Operation::Delete,
    };
    assert_eq!(
        error.code().map(|c| c.to_string()).as_deref(),
        Some("quickbooks_rs::unsupported_operation")
    );
    assert!(error.help().is_some());
    assert!(error.is_local());
}

#[tokio::test]
async fn local_errors_convert_into_miette_reports() {
    test_utils::do_setup();
    let server = wiremock::MockServer::start().await;
    let actions: QuickBooks<_> = test_utils::mock_actions(&server);

    let result: miette::Result<_> = actions
        .execute(
            Resource::Vendor,
            Operation::Create,
            vec![ActionItem::new(Parameters::new())],
        )
        .await
        .into_diagnostic();

    let report = result.unwrap_err();
    assert!(report.to_string().contains("displayName"));
}
