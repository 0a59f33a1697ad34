use anyhow::Result;
use quickbooks_rs::{
    ActionItem, Error, Line, Operation, Parameters, Resource, entities::line_item,
};
use rust_decimal_macros::dec;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path},
};

mod test_utils;

#[tokio::test]
async fn create_bill_with_expense_lines() -> Result<()> {
    test_utils::do_setup();
    let server = MockServer::start().await;

    let expected_lines = vec![
        Line::new(line_item::ACCOUNT_BASED_EXPENSE, dec!(103.55), "Lumber")
            .with_account("7")
            .into_payload(Resource::Bill)?,
        Line::new(line_item::ITEM_BASED_EXPENSE, dec!(20), "Nails")
            .with_item("11")
            .into_payload(Resource::Bill)?,
    ];

    Mock::given(method("POST"))
        .and(path(test_utils::company_path("/bill")))
        .and(body_json(json!({
            "VendorRef": { "value": "56" },
            "Line": expected_lines,
            "SalesTermRef": { "name": "Net 30", "value": "3" },
            "DueDate": "2024-06-30"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Bill": { "Id": "25", "SyncToken": "0", "TotalAmt": 123.55 },
            "time": "2024-05-01T10:00:00.000-07:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = Parameters::new()
        .with("VendorRef", json!({ "details": { "name": "Bob's Burger Joint", "value": "56" } }))
        .with(
            "Line",
            json!([
                { "DetailType": "AccountBasedExpenseLineDetail", "Amount": 103.55, "Description": "Lumber", "accountId": "7" },
                { "DetailType": "ItemBasedExpenseLineDetail", "Amount": 20, "Description": "Nails", "itemId": 11 }
            ]),
        )
        .with(
            "additionalFields",
            json!({ "SalesTermRef": { "details": { "name": "Net 30", "value": "3" } }, "DueDate": "2024-06-30" }),
        );

    let output = test_utils::mock_actions(&server)
        .execute_item(Resource::Bill, Operation::Create, ActionItem::new(params))
        .await?;

    assert_eq!(output.records()[0]["Id"], json!("25"));
    Ok(())
}

#[tokio::test]
async fn incomplete_line_is_rejected_locally() -> Result<()> {
    test_utils::do_setup();
    let server = MockServer::start().await;

    let params = Parameters::new().with("VendorRef", "56").with(
        "Line",
        json!([
            { "DetailType": "AccountBasedExpenseLineDetail", "Amount": 10, "Description": "Paper", "accountId": "7" },
            { "DetailType": "AccountBasedExpenseLineDetail", "Amount": 10, "Description": "" }
        ]),
    );

    let result = test_utils::mock_actions(&server)
        .execute_item(Resource::Bill, Operation::Create, ActionItem::new(params))
        .await;

    match result {
        Err(Error::Validation { message }) => assert!(message.contains("line 2"), "{message}"),
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}
