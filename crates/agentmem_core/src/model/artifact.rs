//! Artifact domain model.
//!
//! # Responsibility
//! - Define the immutable work record attached to a task.
//! - Own the open artifact type vocabulary and the artifact file name grammar.
//!
//! # Invariants
//! - Artifacts are never edited in place; only created and deleted.
//! - A fresh artifact id is the decimal nanosecond timestamp of `created_at`.

use crate::model::ids::{ProjectId, TaskId};
use crate::model::project::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Artifact category. Unknown values are preserved verbatim in `Other`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArtifactType {
    Note,
    Code,
    Decision,
    Discussion,
    Reference,
    /// Log of a workspace file read.
    FileRead,
    /// Log of a workspace directory listing.
    FileList,
    /// Log of a workspace search.
    Search,
    /// Generic artifact; used when the caller gives no type.
    #[default]
    Generic,
    Other(String),
}

impl ArtifactType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Note => "note",
            Self::Code => "code",
            Self::Decision => "decision",
            Self::Discussion => "discussion",
            Self::Reference => "reference",
            Self::FileRead => "file_read",
            Self::FileList => "file_list",
            Self::Search => "search",
            Self::Generic => "artifact",
            Self::Other(value) => value,
        }
    }

    /// Maps a raw type name onto the vocabulary; blank input is `Generic`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "artifact" => Self::Generic,
            "note" => Self::Note,
            "code" => Self::Code,
            "decision" => Self::Decision,
            "discussion" => Self::Discussion,
            "reference" => Self::Reference,
            "file_read" => Self::FileRead,
            "file_list" => Self::FileList,
            "search" => Self::Search,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the type can be embedded in `<type>.<seconds>.md`.
    ///
    /// Dots would break the name split, separators would escape the
    /// artifacts directory.
    pub fn is_file_safe(&self) -> bool {
        let value = self.as_str();
        !value.is_empty()
            && !value
                .chars()
                .any(|ch| ch == '.' || ch == '/' || ch == '\\' || ch.is_whitespace())
    }
}

impl Display for ArtifactType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ArtifactType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for ArtifactType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<ArtifactType> for String {
    fn from(value: ArtifactType) -> Self {
        value.as_str().to_string()
    }
}

/// Immutable piece of work output attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub project_id: ProjectId,
    pub task_id: TaskId,
    /// Serialized as `type` to match the frontmatter key.
    #[serde(rename = "type")]
    pub kind: ArtifactType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Creates an artifact stamped with the current system time.
    pub fn new(
        project_id: ProjectId,
        task_id: TaskId,
        kind: ArtifactType,
        content: impl Into<String>,
    ) -> Self {
        Self::new_at(project_id, task_id, kind, content, Utc::now())
    }

    /// Creates an artifact with an explicit creation timestamp.
    pub fn new_at(
        project_id: ProjectId,
        task_id: TaskId,
        kind: ArtifactType,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: nanosecond_id(now),
            project_id,
            task_id,
            kind,
            content: content.into(),
            metadata: Metadata::new(),
            created_at: now,
        }
    }

    /// File name under `artifacts/`: `<type>.<unix-seconds>.md`.
    pub fn file_name(&self) -> String {
        format!("{}.{}.md", self.kind, self.created_at.timestamp())
    }
}

fn nanosecond_id(at: DateTime<Utc>) -> String {
    // Out-of-range dates (beyond ~2262) fall back to second precision.
    match at.timestamp_nanos_opt() {
        Some(nanos) => nanos.to_string(),
        None => at.timestamp().to_string(),
    }
}
