//! Invoice request/response shapes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Invoice, InvoiceLineItem};
use crate::services::NotificationOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
}

/// Body for `POST /invoices`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub client_id: Uuid,
    #[validate(length(min = 1, message = "At least one line item is required"), nested)]
    pub line_items: Vec<LineItemRequest>,
    #[serde(default)]
    pub tax_rate: Option<Decimal>,
    #[serde(default)]
    pub discount_amount: Option<Decimal>,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
}

/// Body for `PUT /invoices/:id` (draft only).
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoiceRequest {
    #[validate(nested)]
    pub line_items: Option<Vec<LineItemRequest>>,
    pub tax_rate: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Body for `POST /invoices/:id/send`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceRequest {
    pub message: Option<String>,
}

/// Query parameters for `GET /invoices`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
}

/// Invoice with its line items.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub line_items: Vec<InvoiceLineItem>,
}

/// Response for `POST /invoices/:id/send`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInvoiceResponse {
    #[serde(flatten)]
    pub invoice: InvoiceResponse,
    pub notification: NotificationOutcome,
}
