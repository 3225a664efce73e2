//! Invoice model and money math.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Invoice status.
///
/// Lifecycle: draft -> sent -> {paid | overdue}. `paid` is reached when a
/// payment drives the balance to zero; `overdue` is flipped by the
/// background sweep once the due date passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "sent" => InvoiceStatus::Sent,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            _ => InvoiceStatus::Draft,
        }
    }
}

/// Invoice document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub invoice_id: Uuid,
    /// Assigned from the invoice number sequence at send time.
    pub invoice_number: Option<String>,
    pub client_id: Uuid,
    pub status: String,
    pub subtotal: Decimal,
    /// Percentage, e.g. 10 for 10%.
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub sent_utc: Option<DateTime<Utc>>,
    pub paid_utc: Option<DateTime<Utc>>,
    /// When the one-shot overdue reminder went out.
    pub overdue_notified_utc: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
}

/// Line item on an invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLineItem {
    pub line_item_id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Line item as supplied by the caller; `amount` is derived.
#[derive(Debug, Clone)]
pub struct LineItemInput {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
}

/// Derived monetary fields for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Compute invoice totals from line items.
///
/// Invariant: `total_amount = subtotal + tax_amount - discount_amount`.
/// All amounts are rounded to 2 decimal places.
pub fn compute_invoice_totals(
    line_items: &[LineItemInput],
    tax_rate: Decimal,
    discount_amount: Decimal,
) -> InvoiceTotals {
    let subtotal: Decimal = line_items
        .iter()
        .map(|item| (item.quantity * item.rate).round_dp(2))
        .sum();
    let tax_amount = (subtotal * tax_rate / Decimal::ONE_HUNDRED).round_dp(2);
    let total_amount = (subtotal + tax_amount - discount_amount).round_dp(2);

    InvoiceTotals {
        subtotal: subtotal.round_dp(2),
        tax_amount,
        total_amount,
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoice {
    pub client_id: Uuid,
    pub line_items: Vec<LineItemInput>,
    pub tax_rate: Decimal,
    pub discount_amount: Decimal,
    pub due_date: NaiveDate,
    pub notes: Option<String>,
    pub created_by: Uuid,
}

/// Input for updating a draft invoice.
#[derive(Debug, Clone, Default)]
pub struct UpdateInvoice {
    pub line_items: Option<Vec<LineItemInput>>,
    pub tax_rate: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn item(quantity: &str, rate: &str) -> LineItemInput {
        LineItemInput {
            description: "item".to_string(),
            quantity: d(quantity),
            rate: d(rate),
        }
    }

    #[test]
    fn totals_follow_the_invariant() {
        let totals = compute_invoice_totals(&[item("2", "50")], d("10"), d("5"));
        assert_eq!(totals.subtotal, d("100"));
        assert_eq!(totals.tax_amount, d("10"));
        assert_eq!(totals.total_amount, d("105"));
        assert_eq!(
            totals.total_amount,
            totals.subtotal + totals.tax_amount - d("5")
        );
    }

    #[test]
    fn two_at_fifty_with_ten_percent_tax() {
        let totals = compute_invoice_totals(&[item("2", "50")], d("10"), Decimal::ZERO);
        assert_eq!(totals.subtotal, d("100"));
        assert_eq!(totals.tax_amount, d("10"));
        assert_eq!(totals.total_amount, d("110"));
    }

    #[test]
    fn empty_line_items_total_zero() {
        let totals = compute_invoice_totals(&[], d("18"), Decimal::ZERO);
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn fractional_amounts_round_to_two_places() {
        let totals = compute_invoice_totals(&[item("3", "33.335")], Decimal::ZERO, Decimal::ZERO);
        assert_eq!(totals.subtotal, d("100.00"));
        assert_eq!(totals.total_amount, d("100.00"));
    }

    #[test]
    fn status_round_trip() {
        for s in ["draft", "sent", "paid", "overdue"] {
            assert_eq!(InvoiceStatus::from_string(s).as_str(), s);
        }
        assert_eq!(InvoiceStatus::from_string("void"), InvoiceStatus::Draft);
    }
}
