//! Template queries.

use super::Database;
use crate::models::{CreateTemplate, Template, UpdateTemplate};
use crate::services::metrics::DB_QUERY_DURATION;
use tracing::{info, instrument};
use uuid::Uuid;
use vsuite_core::error::AppError;

const TEMPLATE_COLUMNS: &str = "template_id, name, doc_type, description, content, variables, \
    is_system, is_public, created_by, tags, metadata, created_utc";

impl Database {
    /// Create a new template.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_template(&self, input: &CreateTemplate) -> Result<Template, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_template"])
            .start_timer();

        let template_id = Uuid::new_v4();
        let template = sqlx::query_as::<_, Template>(&format!(
            r#"
            INSERT INTO templates (
                template_id, name, doc_type, description, content, variables,
                is_system, is_public, created_by, tags, metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(template_id)
        .bind(&input.name)
        .bind(&input.doc_type)
        .bind(&input.description)
        .bind(&input.content)
        .bind(&input.variables)
        .bind(input.is_system)
        .bind(input.is_public)
        .bind(input.created_by)
        .bind(&input.tags)
        .bind(&input.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create template: {}", e)))?;

        timer.observe_duration();

        info!(template_id = %template.template_id, "Template created");

        Ok(template)
    }

    /// Get a template by ID.
    #[instrument(skip(self), fields(template_id = %template_id))]
    pub async fn get_template(&self, template_id: Uuid) -> Result<Option<Template>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_template"])
            .start_timer();

        let template = sqlx::query_as::<_, Template>(&format!(
            "SELECT {TEMPLATE_COLUMNS} FROM templates WHERE template_id = $1"
        ))
        .bind(template_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get template: {}", e)))?;

        timer.observe_duration();

        Ok(template)
    }

    /// List templates visible to a user: their own, plus public and system
    /// templates.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_templates(&self, user_id: Uuid) -> Result<Vec<Template>, AppError> {
        let templates = sqlx::query_as::<_, Template>(&format!(
            r#"
            SELECT {TEMPLATE_COLUMNS}
            FROM templates
            WHERE created_by = $1 OR is_public = TRUE OR is_system = TRUE
            ORDER BY name
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list templates: {}", e)))?;

        Ok(templates)
    }

    /// Update a template.
    #[instrument(skip(self, input), fields(template_id = %template_id))]
    pub async fn update_template(
        &self,
        template_id: Uuid,
        input: &UpdateTemplate,
    ) -> Result<Option<Template>, AppError> {
        let template = sqlx::query_as::<_, Template>(&format!(
            r#"
            UPDATE templates
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                content = COALESCE($4, content),
                variables = COALESCE($5, variables),
                is_public = COALESCE($6, is_public),
                tags = COALESCE($7, tags),
                metadata = COALESCE($8, metadata)
            WHERE template_id = $1
            RETURNING {TEMPLATE_COLUMNS}
            "#
        ))
        .bind(template_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(&input.content)
        .bind(&input.variables)
        .bind(input.is_public)
        .bind(&input.tags)
        .bind(&input.metadata)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update template: {}", e)))?;

        Ok(template)
    }

    /// Delete a template.
    #[instrument(skip(self), fields(template_id = %template_id))]
    pub async fn delete_template(&self, template_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM templates WHERE template_id = $1")
            .bind(template_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete template: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
