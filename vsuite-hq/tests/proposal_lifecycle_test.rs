//! Proposal lifecycle integration tests: create, send, view, respond,
//! revise.

mod common;

use common::{as_member, TestApp};
use serde_json::json;

async fn create_template(app: &TestApp) -> String {
    let client = reqwest::Client::new();
    let response = as_member(client.post(format!("{}/templates", app.address)))
        .json(&json!({
            "name": "Standard proposal",
            "type": "proposal",
            "variables": [
                {"name": "budget", "label": "Budget", "type": "number"},
                {"name": "start", "label": "Start Date", "type": "date"},
            ],
        }))
        .send()
        .await
        .expect("Failed to create template");
    assert_eq!(response.status(), 201);

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    body["templateId"].as_str().expect("Missing templateId").to_string()
}

async fn create_proposal(app: &TestApp, template_id: &str, email: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let response = as_member(client.post(format!("{}/proposals", app.address)))
        .json(&json!({
            "templateId": template_id,
            "title": "Website Build",
            "clientName": "Acme Corp",
            "clientEmail": email,
            "variables": {"budget": 1500, "start": "2026-03-05"},
            "expiresInDays": 30,
        }))
        .send()
        .await
        .expect("Failed to create proposal");
    assert_eq!(response.status(), 201);

    response.json().await.expect("Invalid JSON")
}

async fn send_proposal(app: &TestApp, proposal_id: &str) -> serde_json::Value {
    let client = reqwest::Client::new();
    let response = as_member(client.post(format!(
        "{}/proposals/{}/send",
        app.address, proposal_id
    )))
    .json(&json!({}))
    .send()
    .await
    .expect("Failed to send proposal");
    assert_eq!(response.status(), 200);

    response.json().await.expect("Invalid JSON")
}

#[tokio::test]
async fn template_proposal_renders_currency_amount() {
    let app = TestApp::spawn().await;

    let template_id = create_template(&app).await;
    let proposal = create_proposal(&app, &template_id, "render@example.com").await;

    assert_eq!(proposal["status"], "draft");
    let content = proposal["content"].as_str().expect("Missing content");
    assert!(content.contains("Amount:"), "content was: {}", content);
    assert!(content.contains("1,500.00"), "content was: {}", content);
    assert!(content.contains("March 5, 2026"), "content was: {}", content);

    app.cleanup().await;
}

#[tokio::test]
async fn proposal_creation_reuses_client_by_email() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let template_id = create_template(&app).await;
    let first = create_proposal(&app, &template_id, "shared@example.com").await;
    let second = create_proposal(&app, &template_id, "shared@example.com").await;

    assert_eq!(first["clientId"], second["clientId"]);

    let response = as_member(client.get(format!("{}/clients", app.address)))
        .send()
        .await
        .expect("Failed to list clients");
    let clients: Vec<serde_json::Value> = response.json().await.expect("Invalid JSON");
    let matching = clients
        .iter()
        .filter(|c| c["email"] == "shared@example.com")
        .count();
    assert_eq!(matching, 1, "expected a single auto-created client");

    app.cleanup().await;
}

#[tokio::test]
async fn send_assigns_unique_link_exactly_once() {
    let app = TestApp::spawn().await;

    let template_id = create_template(&app).await;
    let first = create_proposal(&app, &template_id, "first@example.com").await;
    let second = create_proposal(&app, &template_id, "second@example.com").await;

    let sent_first = send_proposal(&app, first["proposalId"].as_str().unwrap()).await;
    let sent_second = send_proposal(&app, second["proposalId"].as_str().unwrap()).await;

    let link_first = sent_first["proposal"]["shareableLink"]
        .as_str()
        .expect("Missing shareable link");
    let link_second = sent_second["proposal"]["shareableLink"]
        .as_str()
        .expect("Missing shareable link");

    assert_eq!(sent_first["proposal"]["status"], "sent");
    assert!(!link_first.is_empty());
    assert_ne!(link_first, link_second, "links must be unique");

    // Re-sending keeps the original link.
    let resent = send_proposal(&app, first["proposalId"].as_str().unwrap()).await;
    assert_eq!(
        resent["proposal"]["shareableLink"].as_str().unwrap(),
        link_first
    );

    app.cleanup().await;
}

#[tokio::test]
async fn first_view_transitions_once_and_never_regresses() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let template_id = create_template(&app).await;
    let proposal = create_proposal(&app, &template_id, "viewer@example.com").await;
    let sent = send_proposal(&app, proposal["proposalId"].as_str().unwrap()).await;
    let link = sent["proposal"]["shareableLink"].as_str().unwrap();

    let first_view: serde_json::Value = client
        .get(format!("{}/shared/proposals/{}", app.address, link))
        .send()
        .await
        .expect("Failed to view proposal")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(first_view["status"], "viewed");
    let viewed_utc = first_view["viewedUtc"].as_str().expect("viewedUtc not set").to_string();

    let second_view: serde_json::Value = client
        .get(format!("{}/shared/proposals/{}", app.address, link))
        .send()
        .await
        .expect("Failed to view proposal")
        .json()
        .await
        .expect("Invalid JSON");
    assert_eq!(second_view["status"], "viewed");
    assert_eq!(second_view["viewedUtc"].as_str().unwrap(), viewed_utc);

    app.cleanup().await;
}

#[tokio::test]
async fn respond_accepted_sets_timestamps() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let template_id = create_template(&app).await;
    let proposal = create_proposal(&app, &template_id, "accept@example.com").await;
    let sent = send_proposal(&app, proposal["proposalId"].as_str().unwrap()).await;
    let link = sent["proposal"]["shareableLink"].as_str().unwrap();

    let response = client
        .post(format!("{}/shared/proposals/{}/respond", app.address, link))
        .json(&json!({"response": "accepted", "message": "Looks great"}))
        .send()
        .await
        .expect("Failed to respond");
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "accepted");
    assert!(body["respondedUtc"].is_string());
    assert!(body["acceptedUtc"].is_string());
    assert_eq!(body["responseMessage"], "Looks great");

    app.cleanup().await;
}

#[tokio::test]
async fn respond_after_expiry_is_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let template_id = create_template(&app).await;
    let proposal = create_proposal(&app, &template_id, "expired@example.com").await;
    let proposal_id = proposal["proposalId"].as_str().unwrap();
    let sent = send_proposal(&app, proposal_id).await;
    let link = sent["proposal"]["shareableLink"].as_str().unwrap();

    // Force the proposal past its expiry.
    sqlx::query("UPDATE proposals SET expires_utc = NOW() - INTERVAL '1 day' WHERE proposal_id = $1::uuid")
        .bind(proposal_id)
        .execute(app.db.pool())
        .await
        .expect("Failed to expire proposal");

    let response = client
        .post(format!("{}/shared/proposals/{}/respond", app.address, link))
        .json(&json!({"response": "accepted"}))
        .send()
        .await
        .expect("Failed to respond");
    assert_eq!(response.status(), 400);

    // Status is unchanged.
    let shared: serde_json::Value = client
        .get(format!("{}/shared/proposals/{}", app.address, link))
        .send()
        .await
        .expect("Failed to view proposal")
        .json()
        .await
        .expect("Invalid JSON");
    assert_ne!(shared["status"], "accepted");

    app.cleanup().await;
}

#[tokio::test]
async fn respond_with_invalid_value_is_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let template_id = create_template(&app).await;
    let proposal = create_proposal(&app, &template_id, "invalid@example.com").await;
    let sent = send_proposal(&app, proposal["proposalId"].as_str().unwrap()).await;
    let link = sent["proposal"]["shareableLink"].as_str().unwrap();

    let response = client
        .post(format!("{}/shared/proposals/{}/respond", app.address, link))
        .json(&json!({"response": "maybe"}))
        .send()
        .await
        .expect("Failed to respond");
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn revision_increments_version_and_preserves_original() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let template_id = create_template(&app).await;
    let proposal = create_proposal(&app, &template_id, "revise@example.com").await;
    let proposal_id = proposal["proposalId"].as_str().unwrap();

    let response = as_member(client.post(format!(
        "{}/proposals/{}/create-revision",
        app.address, proposal_id
    )))
    .json(&json!({"revisionNotes": "Client asked for a smaller scope"}))
    .send()
    .await
    .expect("Failed to create revision");
    assert_eq!(response.status(), 201);

    let revision: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(revision["version"], 2);
    assert_eq!(revision["parentProposalId"].as_str().unwrap(), proposal_id);
    assert_eq!(revision["status"], "draft");

    // Original is untouched.
    let original: serde_json::Value = as_member(
        client.get(format!("{}/proposals/{}", app.address, proposal_id)),
    )
    .send()
    .await
    .expect("Failed to get proposal")
    .json()
    .await
    .expect("Invalid JSON");
    assert_eq!(original["version"], 1);
    assert!(original["parentProposalId"].is_null());

    app.cleanup().await;
}
