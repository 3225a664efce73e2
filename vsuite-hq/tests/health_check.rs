//! Health endpoint integration tests.

mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_reports_ok() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("Failed to reach health endpoint");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "vsuite-hq");

    app.cleanup().await;
}

#[tokio::test]
async fn mutating_routes_require_auth_headers() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/proposals", app.address))
        .json(&serde_json::json!({
            "title": "No auth",
            "clientName": "Acme",
            "clientEmail": "acme@example.com",
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);

    app.cleanup().await;
}
