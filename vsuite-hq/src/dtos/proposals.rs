//! Proposal request/response shapes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

use crate::models::Proposal;
use crate::services::NotificationOutcome;

/// Body for `POST /proposals`.
///
/// Template mode supplies `templateId` + `variables`; direct mode supplies
/// the free-form fields instead and the document is synthesized from them.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProposalRequest {
    pub template_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: String,
    pub project_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Client name cannot be empty"))]
    pub client_name: String,
    #[validate(email(message = "Invalid client email address"))]
    pub client_email: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    // Direct-mode fields
    #[serde(default)]
    pub project_description: Option<String>,
    #[serde(default)]
    pub total_budget: Option<Value>,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub deliverables: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub line_items: Vec<Value>,
    #[serde(default)]
    pub calculated_total: Option<Value>,
    #[validate(range(min = 1, max = 365, message = "Expiry must be 1-365 days"))]
    #[serde(default = "default_expires_in_days")]
    pub expires_in_days: i64,
}

fn default_expires_in_days() -> i64 {
    30
}

/// Body for `PUT /proposals/:id` (draft only).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProposalRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub variables: Option<Value>,
    pub client_name: Option<String>,
    #[validate(email(message = "Invalid client email address"))]
    pub client_email: Option<String>,
}

/// Body for `POST /proposals/:id/send`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendProposalRequest {
    #[validate(email(message = "Invalid recipient email address"))]
    pub client_email: Option<String>,
    pub message: Option<String>,
}

/// Body for `POST /shared/proposals/:link/respond`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RespondProposalRequest {
    #[validate(length(min = 1, message = "Response cannot be empty"))]
    pub response: String,
    pub message: Option<String>,
}

/// Body for `POST /proposals/:id/create-revision`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRevisionRequest {
    #[validate(length(min = 1, message = "Revision notes cannot be empty"))]
    pub revision_notes: String,
}

/// Query parameters for `GET /proposals`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProposalsQuery {
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

/// Response for `POST /proposals/:id/send`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendProposalResponse {
    pub proposal: Proposal,
    pub shareable_url: String,
    pub notification: NotificationOutcome,
    pub pdf_generated: bool,
}
