//! Contract lifecycle handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    ContractResponse, CreateContractRequest, SendContractResponse, SignContractRequest,
    UpdateContractRequest,
};
use crate::middleware::CurrentUser;
use crate::models::{
    Contract, ContractStatus, CreateContract, CreateSigner, LineItemInput, UpdateContract,
};
use crate::services::metrics::CONTRACTS_TOTAL;
use crate::startup::AppState;
use vsuite_core::error::AppError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListContractsQuery {
    pub status: Option<String>,
}

async fn contract_response(
    state: &AppState,
    contract: Contract,
) -> Result<ContractResponse, AppError> {
    let line_items = state.db.get_contract_line_items(contract.contract_id).await?;
    let signers = state.db.get_contract_signers(contract.contract_id).await?;
    Ok(ContractResponse {
        contract,
        line_items,
        signers,
    })
}

/// Create a draft contract with its signers.
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn create_contract(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<ContractResponse>), AppError> {
    request.validate()?;

    if state.db.get_client(request.client_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
    }

    let (contract, line_items, signers) = state
        .db
        .create_contract(&CreateContract {
            title: request.title,
            client_id: request.client_id,
            content: request.content,
            line_items: request
                .line_items
                .iter()
                .map(|item| LineItemInput {
                    description: item.description.clone(),
                    quantity: item.quantity,
                    rate: item.rate,
                })
                .collect(),
            signers: request
                .signers
                .iter()
                .map(|signer| CreateSigner {
                    name: signer.name.clone(),
                    email: signer.email.clone(),
                })
                .collect(),
            expiration_date: request.expiration_date,
            created_by: user.user_id,
        })
        .await?;

    CONTRACTS_TOTAL.with_label_values(&["draft"]).inc();

    Ok((
        StatusCode::CREATED,
        Json(ContractResponse {
            contract,
            line_items,
            signers,
        }),
    ))
}

/// List contracts.
#[tracing::instrument(skip(state, query))]
pub async fn list_contracts(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListContractsQuery>,
) -> Result<Json<Vec<Contract>>, AppError> {
    let status = query.status.as_deref().map(ContractStatus::from_string);
    let contracts = state.db.list_contracts(status).await?;
    Ok(Json(contracts))
}

/// Get a contract with its line items and signers.
#[tracing::instrument(skip(state), fields(contract_id = %contract_id))]
pub async fn get_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<ContractResponse>, AppError> {
    let contract = state
        .db
        .get_contract(contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;

    Ok(Json(contract_response(&state, contract).await?))
}

/// Update a draft contract. Rejected with a conflict outside draft.
#[tracing::instrument(skip(state, request), fields(contract_id = %contract_id))]
pub async fn update_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(contract_id): Path<Uuid>,
    Json(request): Json<UpdateContractRequest>,
) -> Result<Json<ContractResponse>, AppError> {
    request.validate()?;

    let contract = state
        .db
        .update_draft_contract(
            contract_id,
            &UpdateContract {
                title: request.title,
                content: request.content,
                line_items: request.line_items.map(|items| {
                    items
                        .iter()
                        .map(|item| LineItemInput {
                            description: item.description.clone(),
                            quantity: item.quantity,
                            rate: item.rate,
                        })
                        .collect()
                }),
                expiration_date: request.expiration_date,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;

    Ok(Json(contract_response(&state, contract).await?))
}

/// Send a contract for signature. The status flip commits before the
/// best-effort signer emails.
#[tracing::instrument(skip(state), fields(contract_id = %contract_id))]
pub async fn send_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<SendContractResponse>, AppError> {
    let contract = state
        .db
        .send_contract(contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;

    CONTRACTS_TOTAL
        .with_label_values(&[contract.status.as_str()])
        .inc();

    let signers = state.db.get_contract_signers(contract_id).await?;
    let mut notifications = Vec::with_capacity(signers.len());
    for signer in &signers {
        let outcome = state
            .notifier
            .send_email(
                &signer.email,
                &format!("Signature requested: {}", contract.title),
                format!(
                    "Hi {},\n\nYour signature is requested on contract {} ({}).\n",
                    signer.name,
                    contract.contract_number.as_deref().unwrap_or(""),
                    contract.title,
                ),
                None,
                None,
            )
            .await;
        notifications.push(outcome);
    }

    let line_items = state.db.get_contract_line_items(contract_id).await?;

    Ok(Json(SendContractResponse {
        contract: ContractResponse {
            contract,
            line_items,
            signers,
        },
        notifications,
    }))
}

/// Record a signature and advance the signature chain.
#[tracing::instrument(skip(state, request), fields(contract_id = %contract_id))]
pub async fn sign_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(contract_id): Path<Uuid>,
    Json(request): Json<SignContractRequest>,
) -> Result<Json<ContractResponse>, AppError> {
    request.validate()?;

    let (contract, _signer) = state
        .db
        .record_signature(contract_id, &request.email)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;

    CONTRACTS_TOTAL
        .with_label_values(&[contract.status.as_str()])
        .inc();

    Ok(Json(contract_response(&state, contract).await?))
}

/// Execute a fully signed contract.
#[tracing::instrument(skip(state), fields(contract_id = %contract_id))]
pub async fn execute_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<ContractResponse>, AppError> {
    let contract = state
        .db
        .execute_contract(contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Contract not found")))?;

    CONTRACTS_TOTAL.with_label_values(&["executed"]).inc();

    Ok(Json(contract_response(&state, contract).await?))
}

/// Contracts needing attention: expiring soon or still waiting on
/// signatures. Read-only.
#[tracing::instrument(skip(state))]
pub async fn contracts_needing_attention(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Contract>>, AppError> {
    let contracts = state.db.contracts_needing_attention().await?;
    Ok(Json(contracts))
}

/// Delete a draft contract.
#[tracing::instrument(skip(state), fields(contract_id = %contract_id))]
pub async fn delete_contract(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(contract_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = state.db.delete_contract(contract_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Contract not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
