//! Contract request/response shapes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::invoices::LineItemRequest;
use crate::models::{Contract, ContractLineItem, ContractSigner};
use crate::services::NotificationOutcome;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignerRequest {
    #[validate(length(min = 1, message = "Signer name cannot be empty"))]
    pub name: String,
    #[validate(email(message = "Invalid signer email address"))]
    pub email: String,
}

/// Body for `POST /contracts`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: String,
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "Content cannot be empty"))]
    pub content: String,
    #[serde(default)]
    #[validate(nested)]
    pub line_items: Vec<LineItemRequest>,
    #[serde(default)]
    #[validate(nested)]
    pub signers: Vec<SignerRequest>,
    pub expiration_date: Option<NaiveDate>,
}

/// Body for `PUT /contracts/:id` (draft only).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[validate(nested)]
    pub line_items: Option<Vec<LineItemRequest>>,
    pub expiration_date: Option<NaiveDate>,
}

/// Body for `POST /contracts/:id/signatures`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignContractRequest {
    #[validate(email(message = "Invalid signer email address"))]
    pub email: String,
}

/// Contract with its line items and signers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractResponse {
    #[serde(flatten)]
    pub contract: Contract,
    pub line_items: Vec<ContractLineItem>,
    pub signers: Vec<ContractSigner>,
}

/// Response for `POST /contracts/:id/send`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendContractResponse {
    #[serde(flatten)]
    pub contract: ContractResponse,
    /// One outcome per signer email dispatched.
    pub notifications: Vec<NotificationOutcome>,
}
