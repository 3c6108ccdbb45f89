//! Task domain model.
//!
//! # Responsibility
//! - Define the task record persisted as `task.json`.
//! - Own the status vocabulary and the status-tagged directory name grammar.
//!
//! # Invariants
//! - New tasks start as `TaskStatus::Open`.
//! - `dir_name()` is the only place the `[status]-id` grammar is rendered.

use crate::model::ids::{ProjectId, TaskId};
use crate::model::project::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Task lifecycle state, mirrored in the task directory name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, not started.
    #[default]
    Open,
    InProgress,
    Completed,
    /// Kept for history, no longer actionable.
    Archived,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Open,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    /// Parses the persisted/status-prefix form. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Short marker used by text front ends.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Open => "📋",
            Self::InProgress => "🔄",
            Self::Completed => "✅",
            Self::Archived => "📦",
        }
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of work inside a project; owns a set of artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Overrides the project workspace when non-empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workspace_path: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates an open task stamped with the current system time.
    pub fn new(project_id: ProjectId, id: TaskId, name: impl Into<String>) -> Self {
        Self::new_at(project_id, id, name, Utc::now())
    }

    /// Creates an open task with an explicit creation timestamp.
    pub fn new_at(
        project_id: ProjectId,
        id: TaskId,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            project_id,
            name: name.into(),
            description: String::new(),
            status: TaskStatus::Open,
            workspace_path: String::new(),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Directory name encoding the current status, e.g. `[open]-fix-bug`.
    pub fn dir_name(&self) -> String {
        format!("[{}]-{}", self.status.as_str(), self.id)
    }
}
