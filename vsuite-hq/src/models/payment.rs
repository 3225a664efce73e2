//! Payment record against an invoice.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub client_id: Uuid,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub reference: Option<String>,
    pub payment_date: NaiveDate,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub reference: Option<String>,
    pub payment_date: NaiveDate,
}
