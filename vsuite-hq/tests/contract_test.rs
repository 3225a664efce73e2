//! Contract lifecycle integration tests: signature chain, draft-only
//! edits and the needs-attention query.

mod common;

use common::{as_member, create_test_client, TestApp};
use serde_json::json;

async fn create_contract(app: &TestApp, client_id: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let response = as_member(client.post(format!("{}/contracts", app.address)))
        .json(&json!({
            "title": "Retainer Agreement",
            "clientId": client_id,
            "content": "Services will be provided as described.",
            "lineItems": [{"description": "Retainer", "quantity": 1, "rate": 2000}],
            "signers": [
                {"name": "Alice Doe", "email": "alice@example.com"},
                {"name": "Bob Roe", "email": "bob@example.com"},
            ],
            "expirationDate": "2027-06-30",
        }))
        .send()
        .await
        .expect("Failed to create contract");
    assert_eq!(response.status(), 201);

    response.json().await.expect("Invalid JSON")
}

async fn send_contract(app: &TestApp, contract_id: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let response = as_member(client.post(format!(
        "{}/contracts/{}/send",
        app.address, contract_id
    )))
    .send()
    .await
    .expect("Failed to send contract");
    assert_eq!(response.status(), 200);

    response.json().await.expect("Invalid JSON")
}

async fn sign(app: &TestApp, contract_id: &str, email: &str) -> reqwest::Response {
    let client = reqwest::Client::new();
    as_member(client.post(format!(
        "{}/contracts/{}/signatures",
        app.address, contract_id
    )))
    .json(&json!({"email": email}))
    .send()
    .await
    .expect("Failed to sign contract")
}

#[tokio::test]
async fn signature_chain_advances_to_executed() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "contract@example.com").await;
    let contract = create_contract(&app, &client_id.to_string()).await;
    let contract_id = contract["contractId"].as_str().unwrap();
    assert_eq!(contract["status"], "draft");

    let sent = send_contract(&app, contract_id).await;
    assert_eq!(sent["status"], "pending_signature");
    let number = sent["contractNumber"].as_str().expect("Missing number");
    assert!(number.starts_with("CON-"), "number was: {}", number);

    // First signature: partially signed.
    let response = sign(&app, contract_id, "alice@example.com").await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "partially_signed");

    // Same signer again: conflict.
    let response = sign(&app, contract_id, "alice@example.com").await;
    assert_eq!(response.status(), 409);

    // Second signature: fully signed.
    let response = sign(&app, contract_id, "bob@example.com").await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "fully_signed");

    // Execute.
    let response = as_member(client.post(format!(
        "{}/contracts/{}/execute",
        app.address, contract_id
    )))
    .send()
    .await
    .expect("Failed to execute contract");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "executed");
    assert!(body["executedUtc"].is_string());

    app.cleanup().await;
}

#[tokio::test]
async fn execute_requires_full_signatures() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "early@example.com").await;
    let contract = create_contract(&app, &client_id.to_string()).await;
    let contract_id = contract["contractId"].as_str().unwrap();
    send_contract(&app, contract_id).await;

    let response = as_member(client.post(format!(
        "{}/contracts/{}/execute",
        app.address, contract_id
    )))
    .send()
    .await
    .expect("Failed to call execute");
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn non_draft_edit_is_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "lockedcontract@example.com").await;
    let contract = create_contract(&app, &client_id.to_string()).await;
    let contract_id = contract["contractId"].as_str().unwrap();
    send_contract(&app, contract_id).await;

    let response = as_member(client.put(format!("{}/contracts/{}", app.address, contract_id)))
        .json(&json!({
            "lineItems": [{"description": "Changed", "quantity": 1, "rate": 1}],
        }))
        .send()
        .await
        .expect("Failed to send update");
    assert_eq!(response.status(), 409);

    let unchanged: serde_json::Value = as_member(
        client.get(format!("{}/contracts/{}", app.address, contract_id)),
    )
    .send()
    .await
    .expect("Failed to get contract")
    .json()
    .await
    .expect("Invalid JSON");
    assert_eq!(unchanged["lineItems"][0]["description"], "Retainer");

    app.cleanup().await;
}

#[tokio::test]
async fn pending_contracts_need_attention() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "attention@example.com").await;
    let contract = create_contract(&app, &client_id.to_string()).await;
    let contract_id = contract["contractId"].as_str().unwrap();

    // Drafts are not flagged.
    let flagged: Vec<serde_json::Value> = as_member(
        client.get(format!("{}/contracts/needs-attention", app.address)),
    )
    .send()
    .await
    .expect("Failed to query")
    .json()
    .await
    .expect("Invalid JSON");
    assert!(!flagged
        .iter()
        .any(|c| c["contractId"].as_str() == Some(contract_id)));

    send_contract(&app, contract_id).await;

    let flagged: Vec<serde_json::Value> = as_member(
        client.get(format!("{}/contracts/needs-attention", app.address)),
    )
    .send()
    .await
    .expect("Failed to query")
    .json()
    .await
    .expect("Invalid JSON");
    assert!(flagged
        .iter()
        .any(|c| c["contractId"].as_str() == Some(contract_id)));

    app.cleanup().await;
}

#[tokio::test]
async fn signed_contract_near_expiration_needs_attention() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let client_id = create_test_client(&app, "expiring@example.com").await;
    let contract = create_contract(&app, &client_id.to_string()).await;
    let contract_id = contract["contractId"].as_str().unwrap();
    send_contract(&app, contract_id).await;
    sign(&app, contract_id, "alice@example.com").await;
    sign(&app, contract_id, "bob@example.com").await;

    // Fully signed and expiring within 30 days.
    sqlx::query(
        "UPDATE contracts SET expiration_date = CURRENT_DATE + 10 WHERE contract_id = $1::uuid",
    )
    .bind(contract_id)
    .execute(app.db.pool())
    .await
    .expect("Failed to adjust expiration");

    let flagged: Vec<serde_json::Value> = as_member(
        client.get(format!("{}/contracts/needs-attention", app.address)),
    )
    .send()
    .await
    .expect("Failed to query")
    .json()
    .await
    .expect("Invalid JSON");
    assert!(flagged
        .iter()
        .any(|c| c["contractId"].as_str() == Some(contract_id)));

    app.cleanup().await;
}
