//! Contract, signer and line item queries.

use super::Database;
use crate::models::{
    compute_invoice_totals, Contract, ContractLineItem, ContractSigner, ContractStatus,
    CreateContract, LineItemInput, UpdateContract,
};
use crate::services::metrics::DB_QUERY_DURATION;
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;
use vsuite_core::error::AppError;

const CONTRACT_COLUMNS: &str = "contract_id, contract_number, title, client_id, content, \
    status, total_value, expiration_date, sent_utc, executed_utc, created_by, created_utc";

const SIGNER_COLUMNS: &str = "signer_id, contract_id, name, email, signed_utc, sort_order";

const CONTRACT_ITEM_COLUMNS: &str =
    "line_item_id, contract_id, description, quantity, rate, amount, sort_order, created_utc";

impl Database {
    /// Create a draft contract with its line items and signers.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_contract(
        &self,
        input: &CreateContract,
    ) -> Result<(Contract, Vec<ContractLineItem>, Vec<ContractSigner>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_contract"])
            .start_timer();

        let totals = compute_invoice_totals(&input.line_items, Decimal::ZERO, Decimal::ZERO);

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let contract_id = Uuid::new_v4();
        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            INSERT INTO contracts (
                contract_id, title, client_id, content, status, total_value,
                expiration_date, created_by
            )
            VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7)
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(contract_id)
        .bind(&input.title)
        .bind(input.client_id)
        .bind(&input.content)
        .bind(totals.total_amount)
        .bind(input.expiration_date)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create contract: {}", e)))?;

        let line_items = insert_contract_items(&mut tx, contract_id, &input.line_items).await?;

        let mut signers = Vec::with_capacity(input.signers.len());
        for (index, signer) in input.signers.iter().enumerate() {
            let row = sqlx::query_as::<_, ContractSigner>(&format!(
                r#"
                INSERT INTO contract_signers (signer_id, contract_id, name, email, sort_order)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING {SIGNER_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(contract_id)
            .bind(&signer.name)
            .bind(&signer.email)
            .bind(index as i32)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to add signer: {}", e))
            })?;
            signers.push(row);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit contract: {}", e))
        })?;

        timer.observe_duration();

        info!(contract_id = %contract.contract_id, "Draft contract created");

        Ok((contract, line_items, signers))
    }

    /// Get a contract by ID.
    #[instrument(skip(self), fields(contract_id = %contract_id))]
    pub async fn get_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_contract"])
            .start_timer();

        let contract = sqlx::query_as::<_, Contract>(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE contract_id = $1"
        ))
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get contract: {}", e)))?;

        timer.observe_duration();

        Ok(contract)
    }

    /// List contracts, optionally filtered by status.
    #[instrument(skip(self))]
    pub async fn list_contracts(
        &self,
        status: Option<ContractStatus>,
    ) -> Result<Vec<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_contracts"])
            .start_timer();

        let status_str = status.map(|s| s.as_str().to_string());

        let contracts = sqlx::query_as::<_, Contract>(&format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM contracts
            WHERE ($1::varchar IS NULL OR status = $1)
            ORDER BY created_utc DESC
            "#
        ))
        .bind(&status_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list contracts: {}", e)))?;

        timer.observe_duration();

        Ok(contracts)
    }

    /// Get line items for a contract.
    #[instrument(skip(self), fields(contract_id = %contract_id))]
    pub async fn get_contract_line_items(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<ContractLineItem>, AppError> {
        let line_items = sqlx::query_as::<_, ContractLineItem>(&format!(
            r#"
            SELECT {CONTRACT_ITEM_COLUMNS}
            FROM contract_line_items
            WHERE contract_id = $1
            ORDER BY sort_order, created_utc
            "#
        ))
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get contract line items: {}", e))
        })?;

        Ok(line_items)
    }

    /// Get signers for a contract.
    #[instrument(skip(self), fields(contract_id = %contract_id))]
    pub async fn get_contract_signers(
        &self,
        contract_id: Uuid,
    ) -> Result<Vec<ContractSigner>, AppError> {
        let signers = sqlx::query_as::<_, ContractSigner>(&format!(
            r#"
            SELECT {SIGNER_COLUMNS}
            FROM contract_signers
            WHERE contract_id = $1
            ORDER BY sort_order
            "#
        ))
        .bind(contract_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get signers: {}", e)))?;

        Ok(signers)
    }

    /// Update a draft contract, replacing line items and recomputing the
    /// total atomically. Rejected with a conflict outside `draft`.
    #[instrument(skip(self, input), fields(contract_id = %contract_id))]
    pub async fn update_draft_contract(
        &self,
        contract_id: Uuid,
        input: &UpdateContract,
    ) -> Result<Option<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_draft_contract"])
            .start_timer();

        let existing = match self.get_contract(contract_id).await? {
            Some(c) if c.status == "draft" => c,
            Some(_) => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Only draft contracts can be edited"
                )))
            }
            None => return Ok(None),
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let total_value = match &input.line_items {
            Some(items) => {
                sqlx::query("DELETE FROM contract_line_items WHERE contract_id = $1")
                    .bind(contract_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| {
                        AppError::DatabaseError(anyhow::anyhow!(
                            "Failed to clear contract line items: {}",
                            e
                        ))
                    })?;
                let items = insert_contract_items(&mut tx, contract_id, items).await?;
                items.iter().map(|i| i.amount).sum::<Decimal>().round_dp(2)
            }
            None => existing.total_value,
        };

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                total_value = $4,
                expiration_date = COALESCE($5, expiration_date)
            WHERE contract_id = $1 AND status = 'draft'
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(contract_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(total_value)
        .bind(input.expiration_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update contract: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit contract update: {}", e))
        })?;

        timer.observe_duration();

        info!(contract_id = %contract.contract_id, "Contract updated");

        Ok(Some(contract))
    }

    /// Send a contract: assign its number and start signature collection
    /// when signers are attached.
    #[instrument(skip(self), fields(contract_id = %contract_id))]
    pub async fn send_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["send_contract"])
            .start_timer();

        match self.get_contract(contract_id).await? {
            Some(c) if c.status == "draft" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only draft contracts can be sent"
                )))
            }
            None => return Ok(None),
        };

        let signers = self.get_contract_signers(contract_id).await?;
        let next_status = if signers.is_empty() {
            ContractStatus::Sent
        } else {
            ContractStatus::PendingSignature
        };

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET contract_number = COALESCE(contract_number, next_contract_number()),
                status = $2,
                sent_utc = NOW()
            WHERE contract_id = $1 AND status = 'draft'
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(contract_id)
        .bind(next_status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to send contract: {}", e)))?;

        timer.observe_duration();

        if let Some(ref c) = contract {
            info!(
                contract_id = %c.contract_id,
                contract_number = %c.contract_number.as_deref().unwrap_or(""),
                status = %c.status,
                "Contract sent"
            );
        }

        Ok(contract)
    }

    /// Record a signature by signer email and advance the signature chain:
    /// partially_signed while signatures are missing, fully_signed once all
    /// signers have signed.
    #[instrument(skip(self), fields(contract_id = %contract_id, email = %email))]
    pub async fn record_signature(
        &self,
        contract_id: Uuid,
        email: &str,
    ) -> Result<Option<(Contract, ContractSigner)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_signature"])
            .start_timer();

        let contract = match self.get_contract(contract_id).await? {
            Some(c) => c,
            None => return Ok(None),
        };
        if !ContractStatus::from_string(&contract.status).accepts_signatures() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Contract is not collecting signatures"
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let signer = sqlx::query_as::<_, ContractSigner>(&format!(
            r#"
            UPDATE contract_signers
            SET signed_utc = NOW()
            WHERE contract_id = $1 AND email = $2 AND signed_utc IS NULL
            RETURNING {SIGNER_COLUMNS}
            "#
        ))
        .bind(contract_id)
        .bind(email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record signature: {}", e))
        })?;

        let signer = match signer {
            Some(s) => s,
            None => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "No pending signature for {} on this contract",
                    email
                )))
            }
        };

        let unsigned: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contract_signers WHERE contract_id = $1 AND signed_utc IS NULL",
        )
        .bind(contract_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to count signers: {}", e))
        })?;

        let next_status = if unsigned == 0 {
            ContractStatus::FullySigned
        } else {
            ContractStatus::PartiallySigned
        };

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = $2
            WHERE contract_id = $1
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(contract_id)
        .bind(next_status.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to advance contract status: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit signature: {}", e))
        })?;

        timer.observe_duration();

        info!(
            contract_id = %contract.contract_id,
            signer = %signer.email,
            status = %contract.status,
            "Signature recorded"
        );

        Ok(Some((contract, signer)))
    }

    /// Execute a fully signed contract.
    #[instrument(skip(self), fields(contract_id = %contract_id))]
    pub async fn execute_contract(&self, contract_id: Uuid) -> Result<Option<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["execute_contract"])
            .start_timer();

        match self.get_contract(contract_id).await? {
            Some(c) if c.status == "fully_signed" => {}
            Some(_) => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Only fully signed contracts can be executed"
                )))
            }
            None => return Ok(None),
        };

        let contract = sqlx::query_as::<_, Contract>(&format!(
            r#"
            UPDATE contracts
            SET status = 'executed',
                executed_utc = NOW()
            WHERE contract_id = $1 AND status = 'fully_signed'
            RETURNING {CONTRACT_COLUMNS}
            "#
        ))
        .bind(contract_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to execute contract: {}", e))
        })?;

        timer.observe_duration();

        if let Some(ref c) = contract {
            info!(contract_id = %c.contract_id, "Contract executed");
        }

        Ok(contract)
    }

    /// Delete a draft contract.
    #[instrument(skip(self), fields(contract_id = %contract_id))]
    pub async fn delete_contract(&self, contract_id: Uuid) -> Result<bool, AppError> {
        match self.get_contract(contract_id).await? {
            Some(c) if c.status == "draft" => {}
            Some(_) => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Only draft contracts can be deleted"
                )))
            }
            None => return Ok(false),
        };

        let result = sqlx::query("DELETE FROM contracts WHERE contract_id = $1 AND status = 'draft'")
            .bind(contract_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete contract: {}", e))
            })?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(contract_id = %contract_id, "Draft contract deleted");
        }

        Ok(deleted)
    }

    /// Contracts needing attention: signed/executed contracts within 30 days
    /// of expiration, plus anything still waiting on signatures. Read-only.
    #[instrument(skip(self))]
    pub async fn contracts_needing_attention(&self) -> Result<Vec<Contract>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["contracts_needing_attention"])
            .start_timer();

        let contracts = sqlx::query_as::<_, Contract>(&format!(
            r#"
            SELECT {CONTRACT_COLUMNS}
            FROM contracts
            WHERE (
                    status IN ('fully_signed', 'executed')
                    AND expiration_date IS NOT NULL
                    AND expiration_date <= CURRENT_DATE + INTERVAL '30 days'
                  )
               OR status IN ('sent', 'viewed', 'pending_signature', 'partially_signed')
            ORDER BY expiration_date NULLS LAST, created_utc
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to list contracts needing attention: {}",
                e
            ))
        })?;

        timer.observe_duration();

        Ok(contracts)
    }
}

async fn insert_contract_items(
    tx: &mut Transaction<'_, Postgres>,
    contract_id: Uuid,
    items: &[LineItemInput],
) -> Result<Vec<ContractLineItem>, AppError> {
    let mut line_items = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let amount = (item.quantity * item.rate).round_dp(2);
        let line_item = sqlx::query_as::<_, ContractLineItem>(&format!(
            r#"
            INSERT INTO contract_line_items (
                line_item_id, contract_id, description, quantity, rate, amount, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CONTRACT_ITEM_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(contract_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.rate)
        .bind(amount)
        .bind(index as i32)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to add contract line item: {}", e))
        })?;
        line_items.push(line_item);
    }
    Ok(line_items)
}
