//! Payment request/response shapes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Invoice, Payment};

/// Body for `POST /payments`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub reference: Option<String>,
    /// Defaults to today when omitted.
    pub payment_date: Option<NaiveDate>,
}

/// Query parameters for `GET /payments`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPaymentsQuery {
    pub invoice_id: Option<Uuid>,
}

/// A recorded payment together with the updated invoice.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub payment: Payment,
    pub invoice: Invoice,
}
