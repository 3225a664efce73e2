//! Invoice lifecycle integration tests: totals, draft-only edits, send,
//! payments and the overdue sweep.

mod common;

use common::{as_admin, as_member, create_test_client, TestApp};
use serde_json::json;

async fn create_invoice(app: &TestApp, client_id: &str, due_date: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let response = as_member(client.post(format!("{}/invoices", app.address)))
        .json(&json!({
            "clientId": client_id,
            "lineItems": [{"description": "Consulting", "quantity": 2, "rate": 50}],
            "taxRate": 10,
            "dueDate": due_date,
        }))
        .send()
        .await
        .expect("Failed to create invoice");
    assert_eq!(response.status(), 201);

    response.json().await.expect("Invalid JSON")
}

async fn send_invoice(app: &TestApp, invoice_id: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let response = as_member(client.post(format!(
        "{}/invoices/{}/send",
        app.address, invoice_id
    )))
    .json(&json!({}))
    .send()
    .await
    .expect("Failed to send invoice");
    assert_eq!(response.status(), 200);

    response.json().await.expect("Invalid JSON")
}

fn amount(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::String(s) => s.parse().expect("unparseable amount"),
        serde_json::Value::Number(n) => n.as_f64().unwrap(),
        other => panic!("unexpected amount value: {}", other),
    }
}

#[tokio::test]
async fn totals_are_computed_from_line_items() {
    let app = TestApp::spawn().await;

    let client_id = create_test_client(&app, "totals@example.com").await;
    let invoice = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;

    assert_eq!(invoice["status"], "draft");
    assert_eq!(amount(&invoice["subtotal"]), 100.0);
    assert_eq!(amount(&invoice["taxAmount"]), 10.0);
    assert_eq!(amount(&invoice["totalAmount"]), 110.0);
    assert_eq!(amount(&invoice["balanceDue"]), 110.0);
    assert_eq!(amount(&invoice["amountPaid"]), 0.0);

    app.cleanup().await;
}

#[tokio::test]
async fn draft_edit_recomputes_totals() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "edit@example.com").await;
    let invoice = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;
    let invoice_id = invoice["invoiceId"].as_str().unwrap();

    let response = as_member(client.put(format!("{}/invoices/{}", app.address, invoice_id)))
        .json(&json!({
            "lineItems": [
                {"description": "Consulting", "quantity": 3, "rate": 100},
                {"description": "Hosting", "quantity": 1, "rate": 50},
            ],
            "discountAmount": 25,
        }))
        .send()
        .await
        .expect("Failed to update invoice");
    assert_eq!(response.status(), 200);

    let updated: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(amount(&updated["subtotal"]), 350.0);
    assert_eq!(amount(&updated["taxAmount"]), 35.0);
    assert_eq!(amount(&updated["totalAmount"]), 360.0);
    assert_eq!(updated["lineItems"].as_array().unwrap().len(), 2);

    app.cleanup().await;
}

#[tokio::test]
async fn non_draft_edit_is_rejected_and_leaves_invoice_unchanged() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "locked@example.com").await;
    let invoice = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;
    let invoice_id = invoice["invoiceId"].as_str().unwrap();
    send_invoice(&app, invoice_id).await;

    let response = as_member(client.put(format!("{}/invoices/{}", app.address, invoice_id)))
        .json(&json!({
            "lineItems": [{"description": "Sneaky edit", "quantity": 1, "rate": 1}],
        }))
        .send()
        .await
        .expect("Failed to send update");
    assert_eq!(response.status(), 409);

    let unchanged: serde_json::Value = as_member(
        client.get(format!("{}/invoices/{}", app.address, invoice_id)),
    )
    .send()
    .await
    .expect("Failed to get invoice")
    .json()
    .await
    .expect("Invalid JSON");
    assert_eq!(amount(&unchanged["totalAmount"]), 110.0);
    assert_eq!(
        unchanged["lineItems"][0]["description"],
        "Consulting"
    );

    app.cleanup().await;
}

#[tokio::test]
async fn send_assigns_invoice_number() {
    let app = TestApp::spawn().await;

    let client_id = create_test_client(&app, "number@example.com").await;
    let invoice = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;
    let sent = send_invoice(&app, invoice["invoiceId"].as_str().unwrap()).await;

    assert_eq!(sent["status"], "sent");
    let number = sent["invoiceNumber"].as_str().expect("Missing invoice number");
    assert!(number.starts_with("INV-"), "number was: {}", number);

    app.cleanup().await;
}

#[tokio::test]
async fn payments_reduce_balance_and_flip_to_paid() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "payer@example.com").await;
    let invoice = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;
    let invoice_id = invoice["invoiceId"].as_str().unwrap();
    send_invoice(&app, invoice_id).await;

    // Partial payment leaves the invoice sent.
    let response = as_member(client.post(format!("{}/payments", app.address)))
        .json(&json!({"invoiceId": invoice_id, "amount": 60}))
        .send()
        .await
        .expect("Failed to record payment");
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(amount(&body["invoice"]["amountPaid"]), 60.0);
    assert_eq!(amount(&body["invoice"]["balanceDue"]), 50.0);
    assert_eq!(body["invoice"]["status"], "sent");

    // Paying the remainder flips to paid.
    let response = as_member(client.post(format!("{}/payments", app.address)))
        .json(&json!({"invoiceId": invoice_id, "amount": 50}))
        .send()
        .await
        .expect("Failed to record payment");
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(amount(&body["invoice"]["balanceDue"]), 0.0);
    assert_eq!(body["invoice"]["status"], "paid");
    assert!(body["invoice"]["paidUtc"].is_string());

    // Overpaying a settled invoice is rejected.
    let response = as_member(client.post(format!("{}/payments", app.address)))
        .json(&json!({"invoiceId": invoice_id, "amount": 1}))
        .send()
        .await
        .expect("Failed to send payment");
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn overpayment_is_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "overpay@example.com").await;
    let invoice = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;
    let invoice_id = invoice["invoiceId"].as_str().unwrap();
    send_invoice(&app, invoice_id).await;

    let response = as_member(client.post(format!("{}/payments", app.address)))
        .json(&json!({"invoiceId": invoice_id, "amount": 500}))
        .send()
        .await
        .expect("Failed to send payment");
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn delete_is_draft_only() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "delete@example.com").await;
    let draft = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;
    let sent = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;
    send_invoice(&app, sent["invoiceId"].as_str().unwrap()).await;

    let response = as_admin(client.delete(format!(
        "{}/invoices/{}",
        app.address,
        draft["invoiceId"].as_str().unwrap()
    )))
    .send()
    .await
    .expect("Failed to delete");
    assert_eq!(response.status(), 204);

    let response = as_admin(client.delete(format!(
        "{}/invoices/{}",
        app.address,
        sent["invoiceId"].as_str().unwrap()
    )))
    .send()
    .await
    .expect("Failed to delete");
    assert_eq!(response.status(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn overdue_sweep_flips_each_invoice_exactly_once() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "overdue@example.com").await;
    let invoice = create_invoice(&app, &client_id.to_string(), "2027-01-31").await;
    let invoice_id = invoice["invoiceId"].as_str().unwrap();
    send_invoice(&app, invoice_id).await;

    // Push the due date into the past.
    sqlx::query("UPDATE invoices SET due_date = CURRENT_DATE - 1 WHERE invoice_id = $1::uuid")
        .bind(invoice_id)
        .execute(app.db.pool())
        .await
        .expect("Failed to backdate invoice");

    // First sweep transitions it and returns it for the reminder.
    let flipped = app.db.mark_overdue_invoices().await.expect("Sweep failed");
    assert_eq!(flipped.len(), 1);
    assert_eq!(flipped[0].status, "overdue");

    // A second sweep must not return it again.
    let flipped_again = app.db.mark_overdue_invoices().await.expect("Sweep failed");
    assert!(flipped_again.is_empty(), "reminder would re-fire");

    let overdue: Vec<serde_json::Value> = as_member(
        client.get(format!("{}/invoices/overdue", app.address)),
    )
    .send()
    .await
    .expect("Failed to list overdue")
    .json()
    .await
    .expect("Invalid JSON");
    assert!(overdue
        .iter()
        .any(|inv| inv["invoiceId"].as_str() == Some(invoice_id)));

    app.cleanup().await;
}
