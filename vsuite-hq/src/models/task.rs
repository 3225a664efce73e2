//! Task model with dependency edges.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "in_progress" => TaskStatus::InProgress,
            "done" => TaskStatus::Done,
            _ => TaskStatus::Todo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "low" => TaskPriority::Low,
            "high" => TaskPriority::High,
            _ => TaskPriority::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub status: String,
    pub priority: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_utc: DateTime<Utc>,
    pub completed_utc: Option<DateTime<Utc>>,
}

/// A dependency edge: `task_id` cannot start before `depends_on_task_id`
/// is done. New edges are rejected when they would close a cycle.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskDependency {
    pub task_id: Uuid,
    pub depends_on_task_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub priority: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

/// Whether adding `task_id -> depends_on_task_id` would close a cycle in
/// the dependency graph. Walks the existing depends-on edges from the
/// proposed dependency; a path back to `task_id` means a cycle.
pub fn would_create_cycle(
    edges: &[TaskDependency],
    task_id: Uuid,
    depends_on_task_id: Uuid,
) -> bool {
    if task_id == depends_on_task_id {
        return true;
    }

    let mut adjacency: std::collections::HashMap<Uuid, Vec<Uuid>> =
        std::collections::HashMap::new();
    for edge in edges {
        adjacency
            .entry(edge.task_id)
            .or_default()
            .push(edge.depends_on_task_id);
    }

    let mut stack = vec![depends_on_task_id];
    let mut visited = std::collections::HashSet::new();
    while let Some(current) = stack.pop() {
        if current == task_id {
            return true;
        }
        if !visited.insert(current) {
            continue;
        }
        if let Some(next) = adjacency.get(&current) {
            stack.extend(next.iter().copied());
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: Uuid, to: Uuid) -> TaskDependency {
        TaskDependency {
            task_id: from,
            depends_on_task_id: to,
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let a = Uuid::new_v4();
        assert!(would_create_cycle(&[], a, a));
    }

    #[test]
    fn direct_back_edge_is_a_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let edges = vec![edge(a, b)];
        assert!(would_create_cycle(&edges, b, a));
    }

    #[test]
    fn transitive_back_edge_is_a_cycle() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let edges = vec![edge(a, b), edge(b, c)];
        assert!(would_create_cycle(&edges, c, a));
    }

    #[test]
    fn independent_edges_are_not_cycles() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let edges = vec![edge(a, b)];
        assert!(!would_create_cycle(&edges, a, c));
        assert!(!would_create_cycle(&edges, c, b));
    }

    #[test]
    fn diamond_dependencies_are_allowed() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let d = Uuid::new_v4();
        let edges = vec![edge(a, b), edge(a, c), edge(b, d)];
        assert!(!would_create_cycle(&edges, c, d));
    }
}
