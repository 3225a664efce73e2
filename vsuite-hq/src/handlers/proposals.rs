//! Proposal lifecycle handlers.
//!
//! The state transition always commits before any side effect runs; PDF
//! rendering and outbound email are best-effort and never fail the request.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    CreateProposalRequest, CreateRevisionRequest, ListProposalsQuery, SendProposalRequest,
    SendProposalResponse, UpdateProposalRequest,
};
use crate::middleware::CurrentUser;
use crate::models::{
    CreateClient, CreateProposal, ListProposalsFilter, Proposal, ProposalStatus, UpdateProposal,
};
use crate::services::metrics::PROPOSALS_TOTAL;
use crate::services::renderer::{self, DirectContent};
use crate::services::{EmailAttachment, PdfError};
use crate::startup::AppState;
use vsuite_core::error::AppError;

/// Create a proposal, either from a template or from direct-mode fields.
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn create_proposal(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateProposalRequest>,
) -> Result<(StatusCode, Json<Proposal>), AppError> {
    request.validate()?;

    // Reuse an existing client by exact email match, otherwise create one.
    let client = match state.db.find_client_by_email(&request.client_email).await? {
        Some(client) => client,
        None => {
            state
                .db
                .create_client(&CreateClient {
                    name: request.client_name.clone(),
                    email: request.client_email.clone(),
                    phone: None,
                    company: None,
                    notes: None,
                    created_by: user.user_id,
                })
                .await?
        }
    };

    let (content, variables) = match request.template_id {
        Some(template_id) => {
            let template = state
                .db
                .get_template(template_id)
                .await?
                .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;
            let content = renderer::render(&template, &request.variables, &request.title);
            (content, serde_json::Value::Object(request.variables.clone()))
        }
        None => {
            let direct = DirectContent {
                project_description: request.project_description.clone().unwrap_or_default(),
                total_budget: request
                    .total_budget
                    .as_ref()
                    .and_then(renderer::parse_decimal),
                timeline: request.timeline.clone().unwrap_or_default(),
                deliverables: request.deliverables.clone().unwrap_or_default(),
                terms: request.terms.clone().unwrap_or_default(),
                line_items: request.line_items.clone(),
                calculated_total: request
                    .calculated_total
                    .as_ref()
                    .and_then(renderer::parse_decimal),
            };
            let content = renderer::render_direct(&request.title, &direct);
            (content, serde_json::json!({ "lineItems": request.line_items }))
        }
    };

    let proposal = state
        .db
        .create_proposal(&CreateProposal {
            title: request.title,
            template_id: request.template_id,
            project_id: request.project_id,
            client_id: Some(client.client_id),
            client_name: request.client_name,
            client_email: request.client_email,
            content,
            variables,
            expires_utc: Utc::now() + Duration::days(request.expires_in_days),
            version: 1,
            parent_proposal_id: None,
            revision_notes: None,
            created_by: user.user_id,
        })
        .await?;

    PROPOSALS_TOTAL.with_label_values(&["draft"]).inc();

    Ok((StatusCode::CREATED, Json(proposal)))
}

/// List proposals.
#[tracing::instrument(skip(state, query))]
pub async fn list_proposals(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListProposalsQuery>,
) -> Result<Json<Vec<Proposal>>, AppError> {
    let filter = ListProposalsFilter {
        status: query.status.as_deref().map(ProposalStatus::from_string),
        client_id: query.client_id,
        project_id: query.project_id,
    };

    let proposals = state.db.list_proposals(&filter).await?;
    Ok(Json(proposals))
}

/// Get a proposal by ID.
#[tracing::instrument(skip(state), fields(proposal_id = %proposal_id))]
pub async fn get_proposal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(proposal_id): Path<Uuid>,
) -> Result<Json<Proposal>, AppError> {
    let proposal = state
        .db
        .get_proposal(proposal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    Ok(Json(proposal))
}

/// Update a draft proposal.
#[tracing::instrument(skip(state, request), fields(proposal_id = %proposal_id))]
pub async fn update_proposal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(proposal_id): Path<Uuid>,
    Json(request): Json<UpdateProposalRequest>,
) -> Result<Json<Proposal>, AppError> {
    request.validate()?;

    let proposal = state
        .db
        .update_draft_proposal(
            proposal_id,
            &UpdateProposal {
                title: request.title,
                content: request.content,
                variables: request.variables,
                client_name: request.client_name,
                client_email: request.client_email,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    Ok(Json(proposal))
}

/// Send a proposal: issue its shareable link, flip it to sent, then attempt
/// the PDF render and the outbound email.
#[tracing::instrument(skip(state, request), fields(proposal_id = %proposal_id))]
pub async fn send_proposal(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(proposal_id): Path<Uuid>,
    Json(request): Json<SendProposalRequest>,
) -> Result<Json<SendProposalResponse>, AppError> {
    request.validate()?;

    let existing = state
        .db
        .get_proposal(proposal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    // The link is assigned exactly once; re-sends reuse it.
    let link = existing
        .shareable_link
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let proposal = state
        .db
        .mark_proposal_sent(proposal_id, &link)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    let link = proposal.shareable_link.clone().unwrap_or(link);
    let shareable_url = format!("{}/shared/proposals/{}", state.config.share.base_url, link);

    // Best-effort side effects from here on; the transition is committed.
    let mut attachment = None;
    let mut pdf_generated = false;
    match state.pdf.render(&proposal.title, &proposal.content).await {
        Ok(data) => {
            pdf_generated = true;
            attachment = Some(EmailAttachment {
                filename: format!("{}.pdf", proposal.title),
                content_type: "application/pdf".to_string(),
                data,
            });
        }
        Err(PdfError::NotEnabled(reason)) => {
            tracing::debug!(reason = %reason, "PDF renderer disabled, skipping attachment");
        }
        Err(e) => {
            tracing::warn!(error = %e, "PDF generation failed, sending without attachment");
        }
    }

    let recipient = request
        .client_email
        .unwrap_or_else(|| proposal.client_email.clone());
    let mut body = format!(
        "Hi {},\n\nYou have received a proposal: {}\n\nView and respond here: {}\n",
        proposal.client_name, proposal.title, shareable_url
    );
    if let Some(message) = &request.message {
        body.push_str(&format!("\n{}\n", message));
    }

    let notification = state
        .notifier
        .send_email(
            &recipient,
            &format!("Proposal: {}", proposal.title),
            body,
            None,
            attachment,
        )
        .await;

    PROPOSALS_TOTAL.with_label_values(&["sent"]).inc();

    Ok(Json(SendProposalResponse {
        proposal,
        shareable_url,
        notification,
        pdf_generated,
    }))
}

/// Create a revision: a new draft derived from an existing proposal. The
/// original row, including its response history, is never mutated.
#[tracing::instrument(skip(state, request), fields(proposal_id = %proposal_id))]
pub async fn create_revision(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(proposal_id): Path<Uuid>,
    Json(request): Json<CreateRevisionRequest>,
) -> Result<(StatusCode, Json<Proposal>), AppError> {
    request.validate()?;

    let parent = state
        .db
        .get_proposal(proposal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Proposal not found")))?;

    let revision = state
        .db
        .create_proposal(&CreateProposal {
            title: parent.title.clone(),
            template_id: parent.template_id,
            project_id: parent.project_id,
            client_id: parent.client_id,
            client_name: parent.client_name.clone(),
            client_email: parent.client_email.clone(),
            content: parent.content.clone(),
            variables: parent.variables.clone(),
            expires_utc: Utc::now() + Duration::days(30),
            version: parent.version + 1,
            parent_proposal_id: Some(parent.proposal_id),
            revision_notes: Some(request.revision_notes),
            created_by: user.user_id,
        })
        .await?;

    tracing::info!(
        parent_id = %parent.proposal_id,
        revision_id = %revision.proposal_id,
        version = revision.version,
        "Proposal revision created"
    );

    Ok((StatusCode::CREATED, Json(revision)))
}
