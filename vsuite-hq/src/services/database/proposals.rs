//! Proposal queries.

use super::Database;
use crate::models::{CreateProposal, ListProposalsFilter, Proposal, ProposalStatus, UpdateProposal};
use crate::services::metrics::DB_QUERY_DURATION;
use tracing::{info, instrument};
use uuid::Uuid;
use vsuite_core::error::AppError;

const PROPOSAL_COLUMNS: &str = "proposal_id, title, template_id, project_id, client_id, \
    client_name, client_email, content, variables, status, shareable_link, sent_utc, viewed_utc, \
    responded_utc, accepted_utc, expires_utc, response_message, version, parent_proposal_id, \
    revision_notes, created_by, created_utc";

impl Database {
    /// Create a new proposal row. Revisions pass a parent id and bumped
    /// version; the parent row is never touched.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_proposal(&self, input: &CreateProposal) -> Result<Proposal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_proposal"])
            .start_timer();

        let proposal_id = Uuid::new_v4();
        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            r#"
            INSERT INTO proposals (
                proposal_id, title, template_id, project_id, client_id, client_name, client_email,
                content, variables, status, expires_utc, version, parent_proposal_id,
                revision_notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'draft', $10, $11, $12, $13, $14)
            RETURNING {PROPOSAL_COLUMNS}
            "#
        ))
        .bind(proposal_id)
        .bind(&input.title)
        .bind(input.template_id)
        .bind(input.project_id)
        .bind(input.client_id)
        .bind(&input.client_name)
        .bind(&input.client_email)
        .bind(&input.content)
        .bind(&input.variables)
        .bind(input.expires_utc)
        .bind(input.version)
        .bind(input.parent_proposal_id)
        .bind(&input.revision_notes)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create proposal: {}", e)))?;

        timer.observe_duration();

        info!(proposal_id = %proposal.proposal_id, version = proposal.version, "Proposal created");

        Ok(proposal)
    }

    /// Get a proposal by ID.
    #[instrument(skip(self), fields(proposal_id = %proposal_id))]
    pub async fn get_proposal(&self, proposal_id: Uuid) -> Result<Option<Proposal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_proposal"])
            .start_timer();

        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE proposal_id = $1"
        ))
        .bind(proposal_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get proposal: {}", e)))?;

        timer.observe_duration();

        Ok(proposal)
    }

    /// Resolve a proposal through its public shareable link.
    #[instrument(skip(self))]
    pub async fn get_proposal_by_link(&self, link: &str) -> Result<Option<Proposal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_proposal_by_link"])
            .start_timer();

        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE shareable_link = $1"
        ))
        .bind(link)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to resolve shareable link: {}", e))
        })?;

        timer.observe_duration();

        Ok(proposal)
    }

    /// List proposals, optionally filtered by status/client/project.
    #[instrument(skip(self, filter))]
    pub async fn list_proposals(
        &self,
        filter: &ListProposalsFilter,
    ) -> Result<Vec<Proposal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_proposals"])
            .start_timer();

        let status_str = filter.status.map(|s| s.as_str().to_string());

        let proposals = sqlx::query_as::<_, Proposal>(&format!(
            r#"
            SELECT {PROPOSAL_COLUMNS}
            FROM proposals
            WHERE ($1::varchar IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR client_id = $2)
              AND ($3::uuid IS NULL OR project_id = $3)
            ORDER BY created_utc DESC
            "#
        ))
        .bind(&status_str)
        .bind(filter.client_id)
        .bind(filter.project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list proposals: {}", e)))?;

        timer.observe_duration();

        Ok(proposals)
    }

    /// Update a draft proposal.
    #[instrument(skip(self, input), fields(proposal_id = %proposal_id))]
    pub async fn update_draft_proposal(
        &self,
        proposal_id: Uuid,
        input: &UpdateProposal,
    ) -> Result<Option<Proposal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_draft_proposal"])
            .start_timer();

        let existing = self.get_proposal(proposal_id).await?;
        match existing {
            Some(p) if p.status == "draft" => {}
            Some(_) => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Only draft proposals can be updated"
                )))
            }
            None => return Ok(None),
        };

        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            r#"
            UPDATE proposals
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                variables = COALESCE($4, variables),
                client_name = COALESCE($5, client_name),
                client_email = COALESCE($6, client_email)
            WHERE proposal_id = $1 AND status = 'draft'
            RETURNING {PROPOSAL_COLUMNS}
            "#
        ))
        .bind(proposal_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(&input.variables)
        .bind(&input.client_name)
        .bind(&input.client_email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update proposal: {}", e)))?;

        timer.observe_duration();

        Ok(proposal)
    }

    /// Mark a proposal sent. The shareable link is assigned exactly once:
    /// re-sends keep the original link, and a viewed or responded proposal
    /// never regresses to `sent`.
    #[instrument(skip(self), fields(proposal_id = %proposal_id))]
    pub async fn mark_proposal_sent(
        &self,
        proposal_id: Uuid,
        shareable_link: &str,
    ) -> Result<Option<Proposal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_proposal_sent"])
            .start_timer();

        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            r#"
            UPDATE proposals
            SET shareable_link = COALESCE(shareable_link, $2),
                status = CASE WHEN status = 'draft' THEN 'sent' ELSE status END,
                sent_utc = NOW()
            WHERE proposal_id = $1
            RETURNING {PROPOSAL_COLUMNS}
            "#
        ))
        .bind(proposal_id)
        .bind(shareable_link)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark proposal sent: {}", e))
        })?;

        timer.observe_duration();

        if let Some(ref p) = proposal {
            info!(proposal_id = %p.proposal_id, status = %p.status, "Proposal sent");
        }

        Ok(proposal)
    }

    /// Record the first public view of a proposal. Only the first access of
    /// a `sent` proposal sets `viewed_utc`; repeat views and later states
    /// are untouched. Returns the updated row only when a transition
    /// happened.
    #[instrument(skip(self))]
    pub async fn mark_proposal_viewed(&self, link: &str) -> Result<Option<Proposal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_proposal_viewed"])
            .start_timer();

        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            r#"
            UPDATE proposals
            SET viewed_utc = NOW(),
                status = 'viewed'
            WHERE shareable_link = $1 AND status = 'sent' AND viewed_utc IS NULL
            RETURNING {PROPOSAL_COLUMNS}
            "#
        ))
        .bind(link)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark proposal viewed: {}", e))
        })?;

        timer.observe_duration();

        Ok(proposal)
    }

    /// Record a client response on an open proposal.
    #[instrument(skip(self, message), fields(proposal_id = %proposal_id))]
    pub async fn record_proposal_response(
        &self,
        proposal_id: Uuid,
        response: ProposalStatus,
        message: Option<&str>,
    ) -> Result<Option<Proposal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_proposal_response"])
            .start_timer();

        let proposal = sqlx::query_as::<_, Proposal>(&format!(
            r#"
            UPDATE proposals
            SET status = $2,
                responded_utc = NOW(),
                accepted_utc = CASE WHEN $2 = 'accepted' THEN NOW() ELSE accepted_utc END,
                response_message = $3
            WHERE proposal_id = $1 AND status IN ('sent', 'viewed')
            RETURNING {PROPOSAL_COLUMNS}
            "#
        ))
        .bind(proposal_id)
        .bind(response.as_str())
        .bind(message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to record proposal response: {}", e))
        })?;

        timer.observe_duration();

        if let Some(ref p) = proposal {
            info!(proposal_id = %p.proposal_id, status = %p.status, "Proposal response recorded");
        }

        Ok(proposal)
    }
}
