//! Project domain model.
//!
//! # Responsibility
//! - Define the top-level container record persisted as `project.json`.
//!
//! # Invariants
//! - `id` is unique within a store; directory existence is the uniqueness check.
//! - `updated_at` is never earlier than `created_at` for records written by core.

use crate::model::ids::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// String key/value bag attached to projects, tasks and artifacts.
pub type Metadata = BTreeMap<String, String>;

/// Top-level container for tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Default workspace root for tasks that do not set their own.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workspace_path: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a project stamped with the current system time.
    pub fn new(id: ProjectId, name: impl Into<String>) -> Self {
        Self::new_at(id, name, Utc::now())
    }

    /// Creates a project with an explicit creation timestamp.
    pub fn new_at(id: ProjectId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            workspace_path: String::new(),
            metadata: Metadata::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
