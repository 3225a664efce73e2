//! Public shareable-link endpoints. No authentication; the opaque link is
//! the capability.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::dtos::RespondProposalRequest;
use crate::models::{Proposal, ProposalStatus};
use crate::services::metrics::PROPOSALS_TOTAL;
use crate::startup::AppState;
use vsuite_core::error::AppError;

/// Resolve a proposal through its shareable link. The first access of a
/// sent proposal marks it viewed; repeat views and later states are
/// left untouched.
#[tracing::instrument(skip(state))]
pub async fn get_shared_proposal(
    State(state): State<AppState>,
    Path(link): Path<String>,
) -> Result<Json<Proposal>, AppError> {
    if let Some(proposal) = state.db.mark_proposal_viewed(&link).await? {
        PROPOSALS_TOTAL.with_label_values(&["viewed"]).inc();
        tracing::info!(proposal_id = %proposal.proposal_id, "Proposal viewed for the first time");
        return Ok(Json(proposal));
    }

    let proposal = state
        .db
        .get_proposal_by_link(&link)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    Ok(Json(proposal))
}

/// Record the client's response to a proposal. Rejected once the proposal
/// has expired, whatever the response value.
#[tracing::instrument(skip(state, request))]
pub async fn respond_shared_proposal(
    State(state): State<AppState>,
    Path(link): Path<String>,
    Json(request): Json<RespondProposalRequest>,
) -> Result<Json<Proposal>, AppError> {
    request.validate()?;

    let response = ProposalStatus::parse_response(&request.response).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Invalid response value: '{}'",
            request.response
        ))
    })?;

    let proposal = state
        .db
        .get_proposal_by_link(&link)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    if proposal.is_expired(Utc::now()) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "This proposal has expired and can no longer be responded to"
        )));
    }

    if !ProposalStatus::from_string(&proposal.status).is_open_for_response() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Proposal has already been responded to"
        )));
    }

    let proposal = state
        .db
        .record_proposal_response(proposal.proposal_id, response, request.message.as_deref())
        .await?
        .ok_or_else(|| {
            AppError::Conflict(anyhow::anyhow!("Proposal has already been responded to"))
        })?;

    PROPOSALS_TOTAL
        .with_label_values(&[response.as_str()])
        .inc();

    // Best-effort owner notification; the response is already committed.
    let outcome = state
        .notifier
        .notify_owner(
            &format!("Proposal {}: {}", response.as_str(), proposal.title),
            format!(
                "{} ({}) responded '{}' to proposal '{}'.\n\n{}",
                proposal.client_name,
                proposal.client_email,
                response.as_str(),
                proposal.title,
                request.message.as_deref().unwrap_or(""),
            ),
        )
        .await;
    if !outcome.is_sent() {
        tracing::debug!(?outcome, "Owner notification not delivered");
    }

    Ok(Json(proposal))
}
