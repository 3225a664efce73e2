//! Task handlers, including dependency management with cycle prevention.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{AddDependencyRequest, CreateTaskRequest, ListTasksQuery, UpdateTaskRequest};
use crate::middleware::CurrentUser;
use crate::models::{
    would_create_cycle, CreateTask, Task, TaskDependency, TaskPriority, TaskStatus, UpdateTask,
};
use crate::startup::AppState;
use vsuite_core::error::AppError;

/// Create a task.
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    request.validate()?;

    let priority = request
        .priority
        .as_deref()
        .map(TaskPriority::from_string)
        .unwrap_or(TaskPriority::Medium);

    let task = state
        .db
        .create_task(&CreateTask {
            title: request.title,
            description: request.description,
            project_id: request.project_id,
            priority: priority.as_str().to_string(),
            assignee_id: request.assignee_id,
            due_date: request.due_date,
            created_by: user.user_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// List tasks.
#[tracing::instrument(skip(state, query))]
pub async fn list_tasks(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let tasks = state.db.list_tasks(query.project_id, query.assignee_id).await?;
    Ok(Json(tasks))
}

/// Get a task by ID.
#[tracing::instrument(skip(state), fields(task_id = %task_id))]
pub async fn get_task(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(task_id): Path<Uuid>,
) -> Result<Json<Task>, AppError> {
    let task = state
        .db
        .get_task(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))?;

    Ok(Json(task))
}

/// Update a task. Creator, assignee or admin only.
#[tracing::instrument(skip(state, request), fields(task_id = %task_id))]
pub async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Uuid>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<Task>, AppError> {
    request.validate()?;

    let existing = state
        .db
        .get_task(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))?;
    if !user.can_edit_assigned(existing.created_by, existing.assignee_id) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not allowed to edit this task"
        )));
    }

    let task = state
        .db
        .update_task(
            task_id,
            &UpdateTask {
                title: request.title,
                description: request.description,
                project_id: request.project_id,
                status: request.status.as_deref().map(TaskStatus::from_string),
                priority: request.priority.as_deref().map(TaskPriority::from_string),
                assignee_id: request.assignee_id,
                due_date: request.due_date,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Task not found")))?;

    Ok(Json(task))
}

/// Delete a task. Admin only.
#[tracing::instrument(skip(state), fields(task_id = %task_id))]
pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Only admins can delete tasks"
        )));
    }

    let deleted = state.db.delete_task(task_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Task not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Add a dependency edge. Edges that would close a cycle are rejected.
#[tracing::instrument(skip(state, request), fields(task_id = %task_id))]
pub async fn add_task_dependency(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(task_id): Path<Uuid>,
    Json(request): Json<AddDependencyRequest>,
) -> Result<(StatusCode, Json<TaskDependency>), AppError> {
    request.validate()?;

    if state.db.get_task(task_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Task not found")));
    }
    if state
        .db
        .get_task(request.depends_on_task_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Dependency task not found"
        )));
    }

    let edges = state.db.list_task_dependencies().await?;
    if would_create_cycle(&edges, task_id, request.depends_on_task_id) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Dependency would create a cycle"
        )));
    }

    let edge = state
        .db
        .add_task_dependency(task_id, request.depends_on_task_id)
        .await?;

    Ok((StatusCode::CREATED, Json(edge)))
}

/// Remove a dependency edge.
#[tracing::instrument(skip(state), fields(task_id = %task_id, depends_on = %depends_on_task_id))]
pub async fn remove_task_dependency(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((task_id, depends_on_task_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let removed = state
        .db
        .remove_task_dependency(task_id, depends_on_task_id)
        .await?;
    if !removed {
        return Err(AppError::NotFound(anyhow::anyhow!("Dependency not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
