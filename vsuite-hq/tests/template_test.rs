//! Template validation integration tests.

mod common;

use common::{as_member, TestApp};
use serde_json::json;

#[tokio::test]
async fn duplicate_variable_names_are_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = as_member(client.post(format!("{}/templates", app.address)))
        .json(&json!({
            "name": "Broken",
            "type": "proposal",
            "variables": [
                {"name": "budget", "label": "Budget", "type": "number"},
                {"name": "budget", "label": "Budget Again", "type": "number"},
            ],
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn invalid_template_type_is_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = as_member(client.post(format!("{}/templates", app.address)))
        .json(&json!({
            "name": "Broken",
            "type": "spreadsheet",
            "variables": [],
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn legacy_content_templates_substitute_variables() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = as_member(client.post(format!("{}/templates", app.address)))
        .json(&json!({
            "name": "Legacy",
            "type": "proposal",
            "content": "Dear {{client}}, the budget is {{budget}}.",
        }))
        .send()
        .await
        .expect("Failed to create template");
    assert_eq!(response.status(), 201);
    let template: serde_json::Value = response.json().await.expect("Invalid JSON");

    let response = as_member(client.post(format!("{}/proposals", app.address)))
        .json(&json!({
            "templateId": template["templateId"],
            "title": "Legacy Proposal",
            "clientName": "Acme",
            "clientEmail": "legacy@example.com",
            "variables": {"client": "Acme", "budget": 5000},
        }))
        .send()
        .await
        .expect("Failed to create proposal");
    assert_eq!(response.status(), 201);

    let proposal: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(
        proposal["content"],
        "Dear Acme, the budget is 5000."
    );

    app.cleanup().await;
}
