//! Client CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateClientRequest, UpdateClientRequest};
use crate::middleware::CurrentUser;
use crate::models::{Client, CreateClient, UpdateClient};
use crate::startup::AppState;
use vsuite_core::error::AppError;

/// Create a client.
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn create_client(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    request.validate()?;

    let client = state
        .db
        .create_client(&CreateClient {
            name: request.name,
            email: request.email,
            phone: request.phone,
            company: request.company,
            notes: request.notes,
            created_by: user.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

/// List clients.
#[tracing::instrument(skip(state))]
pub async fn list_clients(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Client>>, AppError> {
    let clients = state.db.list_clients().await?;
    Ok(Json(clients))
}

/// Get a client by ID.
#[tracing::instrument(skip(state), fields(client_id = %client_id))]
pub async fn get_client(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(client_id): Path<Uuid>,
) -> Result<Json<Client>, AppError> {
    let client = state
        .db
        .get_client(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    Ok(Json(client))
}

/// Update a client. Owner or admin only.
#[tracing::instrument(skip(state, request), fields(client_id = %client_id))]
pub async fn update_client(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(client_id): Path<Uuid>,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<Client>, AppError> {
    request.validate()?;

    let existing = state
        .db
        .get_client(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;
    if !user.can_edit(existing.created_by) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not allowed to edit this client"
        )));
    }

    let client = state
        .db
        .update_client(
            client_id,
            &UpdateClient {
                name: request.name,
                phone: request.phone,
                company: request.company,
                notes: request.notes,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    Ok(Json(client))
}

/// Delete a client. Admin only.
#[tracing::instrument(skip(state), fields(client_id = %client_id))]
pub async fn delete_client(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Only admins can delete clients"
        )));
    }

    let deleted = state.db.delete_client(client_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
