//! Template CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateTemplateRequest, UpdateTemplateRequest};
use crate::middleware::CurrentUser;
use crate::models::{CreateTemplate, FieldDef, Template, UpdateTemplate};
use crate::startup::AppState;
use vsuite_core::error::AppError;

const VALID_DOC_TYPES: &[&str] = &["proposal", "invoice", "contract", "deck"];

/// Parse and check a variables list: every entry must be a valid field
/// definition and names must be unique within the template.
fn validate_variables(variables: &[serde_json::Value]) -> Result<(), AppError> {
    let mut names = HashSet::new();
    for entry in variables {
        let field: FieldDef = serde_json::from_value(entry.clone()).map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Invalid field definition: {}", e))
        })?;
        if !names.insert(field.name.clone()) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Duplicate variable name '{}'",
                field.name
            )));
        }
    }
    Ok(())
}

/// Create a template.
#[tracing::instrument(skip(state, request), fields(user_id = %user.user_id))]
pub async fn create_template(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<Template>), AppError> {
    request.validate()?;

    if !VALID_DOC_TYPES.contains(&request.doc_type.as_str()) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Invalid template type: '{}'",
            request.doc_type
        )));
    }
    validate_variables(&request.variables)?;

    let template = state
        .db
        .create_template(&CreateTemplate {
            name: request.name,
            doc_type: request.doc_type,
            description: request.description,
            content: request.content,
            variables: serde_json::Value::Array(request.variables),
            is_system: false,
            is_public: request.is_public,
            created_by: user.user_id,
            tags: serde_json::json!(request.tags),
            metadata: request.metadata,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(template)))
}

/// List templates visible to the caller.
#[tracing::instrument(skip(state), fields(user_id = %user.user_id))]
pub async fn list_templates(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Template>>, AppError> {
    let templates = state.db.list_templates(user.user_id).await?;
    Ok(Json(templates))
}

/// Get a template by ID.
#[tracing::instrument(skip(state), fields(template_id = %template_id))]
pub async fn get_template(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(template_id): Path<Uuid>,
) -> Result<Json<Template>, AppError> {
    let template = state
        .db
        .get_template(template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;

    if !template.is_public && !template.is_system && !user.can_edit(template.created_by) {
        return Err(AppError::NotFound(anyhow::anyhow!("Template not found")));
    }

    Ok(Json(template))
}

/// Update a template. System templates are immutable; otherwise owner or
/// admin only.
#[tracing::instrument(skip(state, request), fields(template_id = %template_id))]
pub async fn update_template(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(template_id): Path<Uuid>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<Template>, AppError> {
    request.validate()?;

    let existing = state
        .db
        .get_template(template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;
    if existing.is_system {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "System templates cannot be modified"
        )));
    }
    if !user.can_edit(existing.created_by) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not allowed to edit this template"
        )));
    }
    if let Some(variables) = &request.variables {
        validate_variables(variables)?;
    }

    let template = state
        .db
        .update_template(
            template_id,
            &UpdateTemplate {
                name: request.name,
                description: request.description,
                content: request.content,
                variables: request.variables.map(serde_json::Value::Array),
                is_public: request.is_public,
                tags: request.tags.map(|tags| serde_json::json!(tags)),
                metadata: request.metadata,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;

    Ok(Json(template))
}

/// Delete a template. System templates are protected; otherwise owner or
/// admin only.
#[tracing::instrument(skip(state), fields(template_id = %template_id))]
pub async fn delete_template(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(template_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let existing = state
        .db
        .get_template(template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;
    if existing.is_system {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "System templates cannot be deleted"
        )));
    }
    if !user.can_edit(existing.created_by) {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Not allowed to delete this template"
        )));
    }

    let deleted = state.db.delete_template(template_id).await?;
    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Template not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
