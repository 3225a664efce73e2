//! Time log handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateTimeLogRequest, ListTimeLogsQuery, UpdateTimeLogRequest};
use crate::middleware::CurrentUser;
use crate::models::{CreateTimeLog, TimeLog, UpdateTimeLog};
use crate::startup::AppState;
use vsuite_core::error::AppError;

/// Create a time log for the current user.
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn create_time_log(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateTimeLogRequest>,
) -> Result<(StatusCode, Json<TimeLog>), AppError> {
    request.validate()?;

    if let Some(ended) = request.ended_utc {
        if ended < request.started_utc {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "End time cannot be before start time"
            )));
        }
    }

    let time_log = state
        .db
        .create_time_log(&CreateTimeLog {
            task_id: request.task_id,
            project_id: request.project_id,
            user_id: user.user_id,
            description: request.description,
            started_utc: request.started_utc,
            ended_utc: request.ended_utc,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(time_log)))
}

/// List time logs.
#[tracing::instrument(skip(state, query))]
pub async fn list_time_logs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListTimeLogsQuery>,
) -> Result<Json<Vec<TimeLog>>, AppError> {
    let time_logs = state.db.list_time_logs(query.task_id, query.user_id).await?;
    Ok(Json(time_logs))
}

/// Update a time log. Owner or admin only.
#[tracing::instrument(skip(state, request), fields(time_log_id = %time_log_id))]
pub async fn update_time_log(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(time_log_id): Path<Uuid>,
    Json(request): Json<UpdateTimeLogRequest>,
) -> Result<Json<TimeLog>, AppError> {
    request.validate()?;

    let existing = state
        .db
        .get_time_log(time_log_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Time log not found")))?;
    if !user.can_edit(existing.user_id) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not allowed to edit this time log"
        )));
    }

    let time_log = state
        .db
        .update_time_log(
            time_log_id,
            &UpdateTimeLog {
                description: request.description,
                ended_utc: request.ended_utc,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Time log not found")))?;

    Ok(Json(time_log))
}

/// Delete a time log. Owner or admin only.
#[tracing::instrument(skip(state), fields(time_log_id = %time_log_id))]
pub async fn delete_time_log(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(time_log_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let existing = state
        .db
        .get_time_log(time_log_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Time log not found")))?;
    if !user.can_edit(existing.user_id) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not allowed to delete this time log"
        )));
    }

    let deleted = state.db.delete_time_log(time_log_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Time log not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
