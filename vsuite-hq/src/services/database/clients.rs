//! Client and project queries.

use super::Database;
use crate::models::{Client, CreateClient, CreateProject, Project, UpdateClient, UpdateProject};
use crate::services::metrics::DB_QUERY_DURATION;
use tracing::{info, instrument};
use uuid::Uuid;
use vsuite_core::error::AppError;

const CLIENT_COLUMNS: &str =
    "client_id, name, email, phone, company, notes, created_by, created_utc";

const PROJECT_COLUMNS: &str =
    "project_id, name, description, client_id, created_by, created_utc";

impl Database {
    /// Create a new client.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_client(&self, input: &CreateClient) -> Result<Client, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_client"])
            .start_timer();

        let client_id = Uuid::new_v4();
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            INSERT INTO clients (client_id, name, email, phone, company, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.company)
        .bind(&input.notes)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "A client with email '{}' already exists",
                    input.email
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create client: {}", e)),
        })?;

        timer.observe_duration();

        info!(client_id = %client.client_id, "Client created");

        Ok(client)
    }

    /// Find a client by exact email match (case-sensitive).
    #[instrument(skip(self))]
    pub async fn find_client_by_email(&self, email: &str) -> Result<Option<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_client_by_email"])
            .start_timer();

        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to find client by email: {}", e))
        })?;

        timer.observe_duration();

        Ok(client)
    }

    /// Get a client by ID.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn get_client(&self, client_id: Uuid) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE client_id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get client: {}", e)))?;

        Ok(client)
    }

    /// List all clients.
    #[instrument(skip(self))]
    pub async fn list_clients(&self) -> Result<Vec<Client>, AppError> {
        let clients = sqlx::query_as::<_, Client>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list clients: {}", e)))?;

        Ok(clients)
    }

    /// Update a client.
    #[instrument(skip(self, input), fields(client_id = %client_id))]
    pub async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClient,
    ) -> Result<Option<Client>, AppError> {
        let client = sqlx::query_as::<_, Client>(&format!(
            r#"
            UPDATE clients
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                company = COALESCE($4, company),
                notes = COALESCE($5, notes)
            WHERE client_id = $1
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(client_id)
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.company)
        .bind(&input.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update client: {}", e)))?;

        Ok(client)
    }

    /// Delete a client.
    #[instrument(skip(self), fields(client_id = %client_id))]
    pub async fn delete_client(&self, client_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete client: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }

    /// Create a new project.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_project(&self, input: &CreateProject) -> Result<Project, AppError> {
        let project_id = Uuid::new_v4();
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (project_id, name, description, client_id, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.client_id)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create project: {}", e)))?;

        info!(project_id = %project.project_id, "Project created");

        Ok(project)
    }

    /// Get a project by ID.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn get_project(&self, project_id: Uuid) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE project_id = $1"
        ))
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get project: {}", e)))?;

        Ok(project)
    }

    /// List all projects.
    #[instrument(skip(self))]
    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_utc DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list projects: {}", e)))?;

        Ok(projects)
    }

    /// Update a project.
    #[instrument(skip(self, input), fields(project_id = %project_id))]
    pub async fn update_project(
        &self,
        project_id: Uuid,
        input: &UpdateProject,
    ) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                client_id = COALESCE($4, client_id)
            WHERE project_id = $1
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.client_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update project: {}", e)))?;

        Ok(project)
    }

    /// Delete a project.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn delete_project(&self, project_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE project_id = $1")
            .bind(project_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete project: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
