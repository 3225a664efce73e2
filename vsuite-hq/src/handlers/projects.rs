//! Project CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateProjectRequest, UpdateProjectRequest};
use crate::middleware::CurrentUser;
use crate::models::{CreateProject, Project, UpdateProject};
use crate::startup::AppState;
use vsuite_core::error::AppError;

/// Create a project.
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn create_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    request.validate()?;

    let project = state
        .db
        .create_project(&CreateProject {
            name: request.name,
            description: request.description,
            client_id: request.client_id,
            created_by: user.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// List projects.
#[tracing::instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Project>>, AppError> {
    let projects = state.db.list_projects().await?;
    Ok(Json(projects))
}

/// Get a project by ID.
#[tracing::instrument(skip(state), fields(project_id = %project_id))]
pub async fn get_project(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Project>, AppError> {
    let project = state
        .db
        .get_project(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))?;

    Ok(Json(project))
}

/// Update a project. Owner or admin only.
#[tracing::instrument(skip(state, request), fields(project_id = %project_id))]
pub async fn update_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
    Json(request): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    request.validate()?;

    let existing = state
        .db
        .get_project(project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))?;
    if !user.can_edit(existing.created_by) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not allowed to edit this project"
        )));
    }

    let project = state
        .db
        .update_project(
            project_id,
            &UpdateProject {
                name: request.name,
                description: request.description,
                client_id: request.client_id,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))?;

    Ok(Json(project))
}

/// Delete a project. Admin only.
#[tracing::instrument(skip(state), fields(project_id = %project_id))]
pub async fn delete_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Only admins can delete projects"
        )));
    }

    let deleted = state.db.delete_project(project_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Project not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
