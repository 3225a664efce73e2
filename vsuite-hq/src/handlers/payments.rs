//! Payment handlers.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::dtos::{CreatePaymentRequest, ListPaymentsQuery, PaymentResponse};
use crate::middleware::CurrentUser;
use crate::models::{CreatePayment, Payment};
use crate::services::metrics::INVOICES_TOTAL;
use crate::startup::AppState;
use vsuite_core::error::AppError;

/// Record a payment against an invoice. The payment row and the invoice
/// balance update commit in one transaction; the invoice flips to paid when
/// the balance reaches zero.
#[tracing::instrument(skip(state, request), fields(invoice_id = %request.invoice_id))]
pub async fn create_payment(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), AppError> {
    request.validate()?;

    let (payment, invoice) = state
        .db
        .record_payment(&CreatePayment {
            invoice_id: request.invoice_id,
            amount: request.amount,
            payment_method: request.payment_method,
            reference: request.reference,
            payment_date: request
                .payment_date
                .unwrap_or_else(|| Utc::now().date_naive()),
        })
        .await?;

    if invoice.status == "paid" {
        INVOICES_TOTAL.with_label_values(&["paid"]).inc();
    }

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse { payment, invoice }),
    ))
}

/// List payments.
#[tracing::instrument(skip(state, query))]
pub async fn list_payments(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListPaymentsQuery>,
) -> Result<Json<Vec<Payment>>, AppError> {
    let payments = state.db.list_payments(query.invoice_id).await?;
    Ok(Json(payments))
}
