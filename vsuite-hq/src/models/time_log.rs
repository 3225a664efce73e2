//! Time log record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
    pub time_log_id: Uuid,
    pub task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub user_id: Uuid,
    pub description: Option<String>,
    pub started_utc: DateTime<Utc>,
    pub ended_utc: Option<DateTime<Utc>>,
    /// Derived from started/ended when the log is closed.
    pub duration_minutes: Option<i32>,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateTimeLog {
    pub task_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub user_id: Uuid,
    pub description: Option<String>,
    pub started_utc: DateTime<Utc>,
    pub ended_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTimeLog {
    pub description: Option<String>,
    pub ended_utc: Option<DateTime<Utc>>,
}

/// Minutes between start and end, rounded down, never negative.
pub fn duration_between(
    started_utc: DateTime<Utc>,
    ended_utc: DateTime<Utc>,
) -> i32 {
    let minutes = (ended_utc - started_utc).num_minutes();
    minutes.max(0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn duration_rounds_down_and_clamps() {
        let start = Utc::now();
        assert_eq!(duration_between(start, start + Duration::seconds(119)), 1);
        assert_eq!(duration_between(start, start - Duration::minutes(5)), 0);
    }
}
