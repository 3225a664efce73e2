//! Background sweep over invoice and contract lifecycles.
//!
//! Runs on a fixed interval inside the single server process. The overdue
//! flip is a single status-guarded UPDATE returning exactly the rows it
//! transitioned, so each invoice gets its reminder once per transition and
//! never again on later sweeps.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::services::metrics::INVOICES_TOTAL;
use crate::services::renderer::format_currency;
use crate::services::{Database, Notifier};

pub struct SweepWorker {
    db: Database,
    notifier: Notifier,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl SweepWorker {
    pub fn new(db: Database, notifier: Notifier, interval: Duration) -> Self {
        Self {
            db,
            notifier,
            interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Starting sweep worker");

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Sweep worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// One sweep pass. Errors are logged and the pass continues; the worker
    /// never dies on a failed tick.
    pub async fn sweep_once(&self) {
        match self.db.mark_overdue_invoices().await {
            Ok(invoices) => {
                for invoice in invoices {
                    INVOICES_TOTAL.with_label_values(&["overdue"]).inc();
                    self.send_overdue_reminder(&invoice).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Overdue invoice sweep failed");
            }
        }

        match self.db.contracts_needing_attention().await {
            Ok(contracts) => {
                if !contracts.is_empty() {
                    tracing::info!(count = contracts.len(), "Contracts needing attention");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Contract attention sweep failed");
            }
        }
    }

    async fn send_overdue_reminder(&self, invoice: &crate::models::Invoice) {
        let client = match self.db.get_client(invoice.client_id).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                tracing::warn!(
                    invoice_id = %invoice.invoice_id,
                    "Invoice client missing, skipping overdue reminder"
                );
                return;
            }
            Err(e) => {
                tracing::error!(invoice_id = %invoice.invoice_id, error = %e, "Failed to load client");
                return;
            }
        };

        let outcome = self
            .notifier
            .send_email(
                &client.email,
                &format!(
                    "Invoice {} is overdue",
                    invoice.invoice_number.as_deref().unwrap_or("")
                ),
                format!(
                    "Hi {},\n\nInvoice {} for ${} was due on {} and is now overdue.\n",
                    client.name,
                    invoice.invoice_number.as_deref().unwrap_or(""),
                    format_currency(invoice.balance_due),
                    invoice.due_date,
                ),
                None,
                None,
            )
            .await;

        if outcome.is_sent() {
            if let Err(e) = self.db.mark_overdue_notified(invoice.invoice_id).await {
                tracing::warn!(
                    invoice_id = %invoice.invoice_id,
                    error = %e,
                    "Failed to record overdue reminder timestamp"
                );
            }
        } else {
            tracing::warn!(
                invoice_id = %invoice.invoice_id,
                ?outcome,
                "Overdue reminder not delivered"
            );
        }
    }
}
