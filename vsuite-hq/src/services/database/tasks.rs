//! Task, dependency and time log queries.

use super::Database;
use crate::models::{
    CreateTask, CreateTimeLog, Task, TaskDependency, TimeLog, UpdateTask, UpdateTimeLog,
};
use crate::services::metrics::DB_QUERY_DURATION;
use tracing::{info, instrument};
use uuid::Uuid;
use vsuite_core::error::AppError;

const TASK_COLUMNS: &str = "task_id, title, description, project_id, status, priority, \
    assignee_id, due_date, created_by, created_utc, completed_utc";

const TIME_LOG_COLUMNS: &str = "time_log_id, task_id, project_id, user_id, description, \
    started_utc, ended_utc, duration_minutes, created_utc";

impl Database {
    /// Create a new task.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_task(&self, input: &CreateTask) -> Result<Task, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_task"])
            .start_timer();

        let task_id = Uuid::new_v4();
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (
                task_id, title, description, project_id, status, priority,
                assignee_id, due_date, created_by
            )
            VALUES ($1, $2, $3, $4, 'todo', $5, $6, $7, $8)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.project_id)
        .bind(&input.priority)
        .bind(input.assignee_id)
        .bind(input.due_date)
        .bind(input.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create task: {}", e)))?;

        timer.observe_duration();

        info!(task_id = %task.task_id, "Task created");

        Ok(task)
    }

    /// Get a task by ID.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>, AppError> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE task_id = $1"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get task: {}", e)))?;

        Ok(task)
    }

    /// List tasks, optionally filtered by project or assignee.
    #[instrument(skip(self))]
    pub async fn list_tasks(
        &self,
        project_id: Option<Uuid>,
        assignee_id: Option<Uuid>,
    ) -> Result<Vec<Task>, AppError> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE ($1::uuid IS NULL OR project_id = $1)
              AND ($2::uuid IS NULL OR assignee_id = $2)
            ORDER BY created_utc DESC
            "#
        ))
        .bind(project_id)
        .bind(assignee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list tasks: {}", e)))?;

        Ok(tasks)
    }

    /// Update a task. Completing a task stamps `completed_utc`; moving it
    /// back out of done clears it.
    #[instrument(skip(self, input), fields(task_id = %task_id))]
    pub async fn update_task(
        &self,
        task_id: Uuid,
        input: &UpdateTask,
    ) -> Result<Option<Task>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_task"])
            .start_timer();

        let status_str = input.status.map(|s| s.as_str().to_string());
        let priority_str = input.priority.map(|p| p.as_str().to_string());

        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                project_id = COALESCE($4, project_id),
                status = COALESCE($5, status),
                priority = COALESCE($6, priority),
                assignee_id = COALESCE($7, assignee_id),
                due_date = COALESCE($8, due_date),
                completed_utc = CASE
                    WHEN $5 = 'done' AND completed_utc IS NULL THEN NOW()
                    WHEN $5 IS NOT NULL AND $5 <> 'done' THEN NULL
                    ELSE completed_utc
                END
            WHERE task_id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(task_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.project_id)
        .bind(&status_str)
        .bind(&priority_str)
        .bind(input.assignee_id)
        .bind(input.due_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update task: {}", e)))?;

        timer.observe_duration();

        Ok(task)
    }

    /// Delete a task.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn delete_task(&self, task_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE task_id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete task: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    /// Add a dependency edge. The caller must have run the cycle check.
    #[instrument(skip(self), fields(task_id = %task_id, depends_on = %depends_on_task_id))]
    pub async fn add_task_dependency(
        &self,
        task_id: Uuid,
        depends_on_task_id: Uuid,
    ) -> Result<TaskDependency, AppError> {
        let edge = sqlx::query_as::<_, TaskDependency>(
            r#"
            INSERT INTO task_dependencies (task_id, depends_on_task_id)
            VALUES ($1, $2)
            RETURNING task_id, depends_on_task_id
            "#,
        )
        .bind(task_id)
        .bind(depends_on_task_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Dependency already exists"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to add dependency: {}", e)),
        })?;

        info!(task_id = %task_id, depends_on = %depends_on_task_id, "Task dependency added");

        Ok(edge)
    }

    /// Remove a dependency edge.
    #[instrument(skip(self), fields(task_id = %task_id, depends_on = %depends_on_task_id))]
    pub async fn remove_task_dependency(
        &self,
        task_id: Uuid,
        depends_on_task_id: Uuid,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "DELETE FROM task_dependencies WHERE task_id = $1 AND depends_on_task_id = $2",
        )
        .bind(task_id)
        .bind(depends_on_task_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to remove dependency: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// All dependency edges, for the cycle check.
    #[instrument(skip(self))]
    pub async fn list_task_dependencies(&self) -> Result<Vec<TaskDependency>, AppError> {
        let edges = sqlx::query_as::<_, TaskDependency>(
            "SELECT task_id, depends_on_task_id FROM task_dependencies",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list dependencies: {}", e))
        })?;

        Ok(edges)
    }

    /// Create a time log.
    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn create_time_log(&self, input: &CreateTimeLog) -> Result<TimeLog, AppError> {
        let duration = input
            .ended_utc
            .map(|ended| crate::models::duration_between(input.started_utc, ended));

        let time_log_id = Uuid::new_v4();
        let time_log = sqlx::query_as::<_, TimeLog>(&format!(
            r#"
            INSERT INTO time_logs (
                time_log_id, task_id, project_id, user_id, description,
                started_utc, ended_utc, duration_minutes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TIME_LOG_COLUMNS}
            "#
        ))
        .bind(time_log_id)
        .bind(input.task_id)
        .bind(input.project_id)
        .bind(input.user_id)
        .bind(&input.description)
        .bind(input.started_utc)
        .bind(input.ended_utc)
        .bind(duration)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create time log: {}", e)))?;

        info!(time_log_id = %time_log.time_log_id, "Time log created");

        Ok(time_log)
    }

    /// Get a time log by ID.
    #[instrument(skip(self), fields(time_log_id = %time_log_id))]
    pub async fn get_time_log(&self, time_log_id: Uuid) -> Result<Option<TimeLog>, AppError> {
        let time_log = sqlx::query_as::<_, TimeLog>(&format!(
            "SELECT {TIME_LOG_COLUMNS} FROM time_logs WHERE time_log_id = $1"
        ))
        .bind(time_log_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get time log: {}", e)))?;

        Ok(time_log)
    }

    /// List time logs, optionally filtered by task or user.
    #[instrument(skip(self))]
    pub async fn list_time_logs(
        &self,
        task_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<TimeLog>, AppError> {
        let time_logs = sqlx::query_as::<_, TimeLog>(&format!(
            r#"
            SELECT {TIME_LOG_COLUMNS}
            FROM time_logs
            WHERE ($1::uuid IS NULL OR task_id = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY started_utc DESC
            "#
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list time logs: {}", e)))?;

        Ok(time_logs)
    }

    /// Update a time log; closing it derives the duration.
    #[instrument(skip(self, input), fields(time_log_id = %time_log_id))]
    pub async fn update_time_log(
        &self,
        time_log_id: Uuid,
        input: &UpdateTimeLog,
    ) -> Result<Option<TimeLog>, AppError> {
        let existing = match self.get_time_log(time_log_id).await? {
            Some(log) => log,
            None => return Ok(None),
        };

        let duration = input
            .ended_utc
            .map(|ended| crate::models::duration_between(existing.started_utc, ended));

        let time_log = sqlx::query_as::<_, TimeLog>(&format!(
            r#"
            UPDATE time_logs
            SET description = COALESCE($2, description),
                ended_utc = COALESCE($3, ended_utc),
                duration_minutes = COALESCE($4, duration_minutes)
            WHERE time_log_id = $1
            RETURNING {TIME_LOG_COLUMNS}
            "#
        ))
        .bind(time_log_id)
        .bind(&input.description)
        .bind(input.ended_utc)
        .bind(duration)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update time log: {}", e)))?;

        Ok(time_log)
    }

    /// Delete a time log.
    #[instrument(skip(self), fields(time_log_id = %time_log_id))]
    pub async fn delete_time_log(&self, time_log_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM time_logs WHERE time_log_id = $1")
            .bind(time_log_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete time log: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
