//! Invoice, line item and payment queries.

use super::Database;
use crate::models::{
    compute_invoice_totals, CreateInvoice, CreatePayment, Invoice, InvoiceLineItem,
    LineItemInput, ListInvoicesFilter, Payment, UpdateInvoice,
};
use crate::services::metrics::DB_QUERY_DURATION;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;
use vsuite_core::error::AppError;

const INVOICE_COLUMNS: &str = "invoice_id, invoice_number, client_id, status, subtotal, \
    tax_rate, tax_amount, discount_amount, total_amount, amount_paid, balance_due, due_date, \
    notes, sent_utc, paid_utc, overdue_notified_utc, created_by, created_utc";

const LINE_ITEM_COLUMNS: &str =
    "line_item_id, invoice_id, description, quantity, rate, amount, sort_order, created_utc";

const PAYMENT_COLUMNS: &str = "payment_id, invoice_id, client_id, amount, payment_method, \
    reference, payment_date, created_utc";

impl Database {
    /// Create a draft invoice with its line items. Totals are computed and
    /// written in the same transaction as the items.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn create_invoice(
        &self,
        input: &CreateInvoice,
    ) -> Result<(Invoice, Vec<InvoiceLineItem>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        let totals = compute_invoice_totals(&input.line_items, input.tax_rate, input.discount_amount);

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice_id = Uuid::new_v4();
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                invoice_id, client_id, status, subtotal, tax_rate, tax_amount, discount_amount,
                total_amount, amount_paid, balance_due, due_date, notes, created_by
            )
            VALUES ($1, $2, 'draft', $3, $4, $5, $6, $7, 0, $7, $8, $9, $10)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(input.client_id)
        .bind(totals.subtotal)
        .bind(input.tax_rate)
        .bind(totals.tax_amount)
        .bind(input.discount_amount)
        .bind(totals.total_amount)
        .bind(input.due_date)
        .bind(&input.notes)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        let line_items = insert_line_items(&mut tx, invoice_id, &input.line_items).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice: {}", e))
        })?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, total = %invoice.total_amount, "Draft invoice created");

        Ok((invoice, line_items))
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// Get line items for an invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice_line_items(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceLineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice_line_items"])
            .start_timer();

        let line_items = sqlx::query_as::<_, InvoiceLineItem>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS}
            FROM invoice_line_items
            WHERE invoice_id = $1
            ORDER BY sort_order, created_utc
            "#
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(line_items)
    }

    /// List invoices, optionally filtered by status/client.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let status_str = filter.status.map(|s| s.as_str().to_string());

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
            ORDER BY created_utc DESC
            "#
        ))
        .bind(&status_str)
        .bind(filter.client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Update a draft invoice, replacing line items and recomputing totals
    /// atomically with the edit. Rejected with a conflict outside `draft`.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id))]
    pub async fn update_draft_invoice(
        &self,
        invoice_id: Uuid,
        input: &UpdateInvoice,
    ) -> Result<Option<(Invoice, Vec<InvoiceLineItem>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_draft_invoice"])
            .start_timer();

        let existing = match self.get_invoice(invoice_id).await? {
            Some(inv) if inv.status == "draft" => inv,
            Some(_) => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Only draft invoices can be edited"
                )))
            }
            None => return Ok(None),
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let line_items = match &input.line_items {
            Some(items) => {
                sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = $1")
                    .bind(invoice_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Failed to clear line items: {}",
                            e
                        ))
                    })?;
                insert_line_items(&mut tx, invoice_id, items).await?
            }
            None => fetch_line_items(&mut tx, invoice_id).await?,
        };

        let inputs: Vec<LineItemInput> = line_items
            .iter()
            .map(|item| LineItemInput {
                description: item.description.clone(),
                quantity: item.quantity,
                rate: item.rate,
            })
            .collect();
        let tax_rate = input.tax_rate.unwrap_or(existing.tax_rate);
        let discount_amount = input.discount_amount.unwrap_or(existing.discount_amount);
        let totals = compute_invoice_totals(&inputs, tax_rate, discount_amount);

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET subtotal = $2,
                tax_rate = $3,
                tax_amount = $4,
                discount_amount = $5,
                total_amount = $6,
                balance_due = $6 - amount_paid,
                due_date = COALESCE($7, due_date),
                notes = COALESCE($8, notes)
            WHERE invoice_id = $1 AND status = 'draft'
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .bind(totals.subtotal)
        .bind(tax_rate)
        .bind(totals.tax_amount)
        .bind(discount_amount)
        .bind(totals.total_amount)
        .bind(input.due_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice update: {}", e))
        })?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, total = %invoice.total_amount, "Invoice updated");

        Ok(Some((invoice, line_items)))
    }

    /// Send an invoice: assign its number and flip draft to sent. Re-sends
    /// of an already-sent invoice keep number and status.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn send_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["send_invoice"])
            .start_timer();

        match self.get_invoice(invoice_id).await? {
            Some(inv) if inv.status == "draft" || inv.status == "sent" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft invoices can be sent"
                )))
            }
            None => return Ok(None),
        };

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET invoice_number = COALESCE(invoice_number, next_invoice_number()),
                status = CASE WHEN status = 'draft' THEN 'sent' ELSE status END,
                sent_utc = NOW()
            WHERE invoice_id = $1 AND status IN ('draft', 'sent')
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to send invoice: {}", e)))?;

        timer.observe_duration();

        if let Some(ref inv) = invoice {
            info!(
                invoice_id = %inv.invoice_id,
                invoice_number = %inv.invoice_number.as_deref().unwrap_or(""),
                "Invoice sent"
            );
        }

        Ok(invoice)
    }

    /// Delete a draft invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, invoice_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        match self.get_invoice(invoice_id).await? {
            Some(inv) if inv.status == "draft" => {}
            Some(_) => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Only draft invoices can be deleted"
                )))
            }
            None => return Ok(false),
        };

        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = $1 AND status = 'draft'")
            .bind(invoice_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, "Draft invoice deleted");
        }

        Ok(deleted)
    }

    /// List overdue invoices.
    #[instrument(skip(self))]
    pub async fn list_overdue_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_overdue_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE status = 'overdue' ORDER BY due_date"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list overdue invoices: {}", e))
        })?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Flip sent invoices past their due date to overdue. The returned rows
    /// are exactly the invoices transitioned by this call, so the caller
    /// fires one reminder per invoice per transition and can never re-fire
    /// on later sweeps.
    #[instrument(skip(self))]
    pub async fn mark_overdue_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_overdue_invoices"])
            .start_timer();

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = 'overdue'
            WHERE status = 'sent' AND due_date < CURRENT_DATE
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark overdue invoices: {}", e))
        })?;

        timer.observe_duration();

        if !invoices.is_empty() {
            info!(count = invoices.len(), "Invoices flipped to overdue");
        }

        Ok(invoices)
    }

    /// Record when the overdue reminder for an invoice went out.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn mark_overdue_notified(&self, invoice_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE invoices SET overdue_notified_utc = NOW() WHERE invoice_id = $1")
            .bind(invoice_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to mark overdue reminder sent: {}",
                    e
                ))
            })?;
        Ok(())
    }

    /// Record a payment and update the invoice balance in one transaction.
    /// The invoice flips to paid when the balance reaches zero.
    #[instrument(skip(self, input), fields(invoice_id = %input.invoice_id))]
    pub async fn record_payment(
        &self,
        input: &CreatePayment,
    ) -> Result<(Payment, Invoice), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1 FOR UPDATE"
        ))
        .bind(input.invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        let invoice = match invoice {
            Some(inv) if inv.status == "sent" || inv.status == "overdue" => inv,
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Can only record payments against sent invoices"
                )))
            }
            None => return Err(AppError::NotFound(anyhow::anyhow!("Invoice not found"))),
        };

        if input.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount must be positive"
            )));
        }
        if input.amount > invoice.balance_due {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount {} exceeds balance due {}",
                input.amount,
                invoice.balance_due
            )));
        }

        let payment_id = Uuid::new_v4();
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (
                payment_id, invoice_id, client_id, amount, payment_method, reference, payment_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment_id)
        .bind(input.invoice_id)
        .bind(invoice.client_id)
        .bind(input.amount)
        .bind(&input.payment_method)
        .bind(&input.reference)
        .bind(input.payment_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET amount_paid = amount_paid + $2,
                balance_due = total_amount - (amount_paid + $2),
                status = CASE
                    WHEN total_amount - (amount_paid + $2) <= 0 THEN 'paid'
                    ELSE status
                END,
                paid_utc = CASE
                    WHEN total_amount - (amount_paid + $2) <= 0 THEN NOW()
                    ELSE paid_utc
                END
            WHERE invoice_id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(input.invoice_id)
        .bind(input.amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice balance: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit payment: {}", e))
        })?;

        timer.observe_duration();

        info!(
            payment_id = %payment.payment_id,
            invoice_id = %invoice.invoice_id,
            amount = %payment.amount,
            balance_due = %invoice.balance_due,
            status = %invoice.status,
            "Payment recorded"
        );

        Ok((payment, invoice))
    }

    /// List payments, optionally for one invoice.
    #[instrument(skip(self))]
    pub async fn list_payments(
        &self,
        invoice_id: Option<Uuid>,
    ) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let payments = sqlx::query_as::<_, Payment>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS}
            FROM payments
            WHERE ($1::uuid IS NULL OR invoice_id = $1)
            ORDER BY payment_date DESC, created_utc DESC
            "#
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }
}

async fn insert_line_items(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
    items: &[LineItemInput],
) -> Result<Vec<InvoiceLineItem>, AppError> {
    let mut line_items = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let amount = (item.quantity * item.rate).round_dp(2);
        let line_item = sqlx::query_as::<_, InvoiceLineItem>(&format!(
            r#"
            INSERT INTO invoice_line_items (
                line_item_id, invoice_id, description, quantity, rate, amount, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {LINE_ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.rate)
        .bind(amount)
        .bind(index as i32)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to add line item: {}", e)))?;
        line_items.push(line_item);
    }
    Ok(line_items)
}

async fn fetch_line_items(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
) -> Result<Vec<InvoiceLineItem>, AppError> {
    sqlx::query_as::<_, InvoiceLineItem>(&format!(
        r#"
        SELECT {LINE_ITEM_COLUMNS}
        FROM invoice_line_items
        WHERE invoice_id = $1
        ORDER BY sort_order, created_utc
        "#
    ))
    .bind(invoice_id)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))
}
