//! Invoice lifecycle handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CreateInvoiceRequest, InvoiceResponse, ListInvoicesQuery, SendInvoiceRequest,
    SendInvoiceResponse, UpdateInvoiceRequest,
};
use crate::middleware::CurrentUser;
use crate::models::{
    CreateInvoice, Invoice, InvoiceStatus, LineItemInput, ListInvoicesFilter, UpdateInvoice,
};
use crate::services::metrics::INVOICES_TOTAL;
use crate::services::renderer::format_currency;
use crate::startup::AppState;
use vsuite_core::error::AppError;

fn line_item_inputs(items: &[crate::dtos::LineItemRequest]) -> Vec<LineItemInput> {
    items
        .iter()
        .map(|item| LineItemInput {
            description: item.description.clone(),
            quantity: item.quantity,
            rate: item.rate,
        })
        .collect()
}

/// Create a draft invoice.
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn create_invoice(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<InvoiceResponse>), AppError> {
    request.validate()?;

    if state.db.get_client(request.client_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
    }

    let (invoice, line_items) = state
        .db
        .create_invoice(&CreateInvoice {
            client_id: request.client_id,
            line_items: line_item_inputs(&request.line_items),
            tax_rate: request.tax_rate.unwrap_or(Decimal::ZERO),
            discount_amount: request.discount_amount.unwrap_or(Decimal::ZERO),
            due_date: request.due_date,
            notes: request.notes,
            created_by: user.user_id,
        })
        .await?;

    INVOICES_TOTAL.with_label_values(&["draft"]).inc();

    Ok((
        StatusCode::CREATED,
        Json(InvoiceResponse {
            invoice,
            line_items,
        }),
    ))
}

/// List invoices.
#[tracing::instrument(skip(state, query))]
pub async fn list_invoices(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let filter = ListInvoicesFilter {
        status: query.status.as_deref().map(InvoiceStatus::from_string),
        client_id: query.client_id,
    };

    let invoices = state.db.list_invoices(&filter).await?;
    Ok(Json(invoices))
}

/// Get an invoice with its line items.
#[tracing::instrument(skip(state), fields(invoice_id = %invoice_id))]
pub async fn get_invoice(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    let line_items = state.db.get_invoice_line_items(invoice_id).await?;

    Ok(Json(InvoiceResponse {
        invoice,
        line_items,
    }))
}

/// Update a draft invoice. Line item edits recompute totals atomically;
/// a non-draft invoice is rejected with a conflict and left unchanged.
#[tracing::instrument(skip(state, request), fields(invoice_id = %invoice_id))]
pub async fn update_invoice(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<UpdateInvoiceRequest>,
) -> Result<Json<InvoiceResponse>, AppError> {
    request.validate()?;

    let (invoice, line_items) = state
        .db
        .update_draft_invoice(
            invoice_id,
            &UpdateInvoice {
                line_items: request.line_items.as_deref().map(line_item_inputs),
                tax_rate: request.tax_rate,
                discount_amount: request.discount_amount,
                due_date: request.due_date,
                notes: request.notes,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(InvoiceResponse {
        invoice,
        line_items,
    }))
}

/// Send an invoice to its client. The number assignment and status flip
/// commit before the best-effort email.
#[tracing::instrument(skip(state, request), fields(invoice_id = %invoice_id))]
pub async fn send_invoice(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Json(request): Json<SendInvoiceRequest>,
) -> Result<Json<SendInvoiceResponse>, AppError> {
    let invoice = state
        .db
        .send_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    let line_items = state.db.get_invoice_line_items(invoice_id).await?;

    INVOICES_TOTAL.with_label_values(&["sent"]).inc();

    let notification = match state.db.get_client(invoice.client_id).await? {
        Some(client) => {
            let mut body = format!(
                "Hi {},\n\nInvoice {} for ${} is due on {}.\n",
                client.name,
                invoice.invoice_number.as_deref().unwrap_or(""),
                format_currency(invoice.total_amount),
                invoice.due_date,
            );
            if let Some(message) = &request.message {
                body.push_str(&format!("\n{}\n", message));
            }
            state
                .notifier
                .send_email(
                    &client.email,
                    &format!(
                        "Invoice {}",
                        invoice.invoice_number.as_deref().unwrap_or("")
                    ),
                    body,
                    None,
                    None,
                )
                .await
        }
        None => {
            tracing::warn!(invoice_id = %invoice_id, "Invoice client missing, skipping email");
            crate::services::NotificationOutcome::Skipped {
                reason: "Invoice client no longer exists".to_string(),
            }
        }
    };

    Ok(Json(SendInvoiceResponse {
        invoice: InvoiceResponse {
            invoice,
            line_items,
        },
        notification,
    }))
}

/// List overdue invoices.
#[tracing::instrument(skip(state))]
pub async fn list_overdue_invoices(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Invoice>>, AppError> {
    let invoices = state.db.list_overdue_invoices().await?;
    Ok(Json(invoices))
}

/// Delete a draft invoice.
#[tracing::instrument(skip(state), fields(invoice_id = %invoice_id))]
pub async fn delete_invoice(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_invoice(invoice_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
