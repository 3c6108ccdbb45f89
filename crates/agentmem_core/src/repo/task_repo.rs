//! Project/task/artifact repository contracts.
//!
//! # Responsibility
//! - Define the storage-agnostic operation surface for the three entity kinds.
//! - Define the semantic error vocabulary shared by every implementation.
//!
//! # Invariants
//! - Precondition failures (`*NotFound`, `*AlreadyExists`, invalid ids) are
//!   returned as dedicated variants, never wrapped in `Storage`.
//! - Every list operation returns a [`ListResult`] produced by
//!   [`paginate`](crate::repo::pagination::paginate).

use crate::model::{Artifact, Project, ProjectId, Task, TaskId, TaskStatus};
use crate::repo::pagination::DEFAULT_LIST_LIMIT;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::{Path, PathBuf};

pub type RepoResult<T> = Result<T, RepoError>;

/// Low-level persistence failure with the path it happened on.
#[derive(Debug)]
pub enum StorageError {
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    Json {
        action: &'static str,
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(action: &'static str, path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io {
                action,
                path,
                source,
            } => write!(f, "failed to {action} `{}`: {source}", path.display()),
            Self::Json {
                action,
                path,
                source,
            } => write!(f, "failed to {action} `{}`: {source}", path.display()),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
        }
    }
}

/// Repository error for project, task and artifact operations.
#[derive(Debug)]
pub enum RepoError {
    ProjectNotFound(ProjectId),
    ProjectAlreadyExists(ProjectId),
    /// Normalized project id is empty or malformed.
    InvalidProjectId(String),
    TaskNotFound {
        project_id: ProjectId,
        task_id: TaskId,
    },
    TaskAlreadyExists {
        project_id: ProjectId,
        task_id: TaskId,
    },
    /// Normalized task id is empty or malformed.
    InvalidTaskId(String),
    ArtifactNotFound {
        project_id: ProjectId,
        task_id: TaskId,
        artifact_id: String,
    },
    /// Artifact type cannot be embedded in an artifact file name.
    InvalidArtifactType(String),
    /// Artifact metadata key cannot be stored in frontmatter unchanged.
    InvalidMetadataKey(String),
    /// Any I/O or (de)serialization failure underneath the store.
    Storage(StorageError),
}

impl RepoError {
    /// Stable machine-readable code for front ends and log records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound(_) => "project_not_found",
            Self::ProjectAlreadyExists(_) => "project_already_exists",
            Self::InvalidProjectId(_) => "invalid_project_id",
            Self::TaskNotFound { .. } => "task_not_found",
            Self::TaskAlreadyExists { .. } => "task_already_exists",
            Self::InvalidTaskId(_) => "invalid_task_id",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::InvalidArtifactType(_) => "invalid_artifact_type",
            Self::InvalidMetadataKey(_) => "invalid_metadata_key",
            Self::Storage(_) => "storage_failed",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::ProjectAlreadyExists(id) => write!(f, "project already exists: {id}"),
            Self::InvalidProjectId(raw) => write!(f, "invalid project ID: `{raw}`"),
            Self::TaskNotFound {
                project_id,
                task_id,
            } => write!(f, "task not found: {project_id}/{task_id}"),
            Self::TaskAlreadyExists {
                project_id,
                task_id,
            } => write!(f, "task already exists: {project_id}/{task_id}"),
            Self::InvalidTaskId(raw) => write!(f, "invalid task ID: `{raw}`"),
            Self::ArtifactNotFound {
                project_id,
                task_id,
                artifact_id,
            } => write!(
                f,
                "artifact not found: {project_id}/{task_id}/{artifact_id}"
            ),
            Self::InvalidArtifactType(kind) => write!(f, "invalid artifact type: `{kind}`"),
            Self::InvalidMetadataKey(key) => write!(f, "invalid artifact metadata key: `{key}`"),
            Self::Storage(err) => write!(f, "storage operation failed: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for RepoError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Pagination and filter options for list operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Page size; `0` means the default of 50.
    pub limit: usize,
    pub offset: usize,
    /// Task status filter; ignored by non-task listings.
    pub status: Option<TaskStatus>,
}

impl ListOptions {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self {
            limit,
            offset,
            status: None,
        }
    }

    /// Options that return every item in one page.
    pub fn all() -> Self {
        Self::new(usize::MAX, 0)
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_LIMIT, 0)
    }
}

/// One page of a sorted listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    /// Item count before windowing.
    pub total: usize,
    /// Applied page size (after defaulting).
    pub limit: usize,
    /// Applied offset.
    pub offset: usize,
    pub has_more: bool,
}

/// Storage contract for the project → task → artifact hierarchy.
pub trait TaskRepository {
    fn create_project(&self, project: &Project) -> RepoResult<()>;
    fn get_project(&self, id: &ProjectId) -> RepoResult<Project>;
    /// Lists projects, most recently updated first.
    fn list_projects(&self, opts: &ListOptions) -> RepoResult<ListResult<Project>>;
    /// Persists `project` with a fresh `updated_at` and returns the stored record.
    fn update_project(&self, project: &Project) -> RepoResult<Project>;
    /// Removes the project and everything below it.
    fn delete_project(&self, id: &ProjectId) -> RepoResult<()>;

    fn create_task(&self, task: &Task) -> RepoResult<()>;
    fn get_task(&self, project_id: &ProjectId, task_id: &TaskId) -> RepoResult<Task>;
    /// Lists one project's tasks, most recently updated first.
    fn list_tasks(&self, project_id: &ProjectId, opts: &ListOptions)
        -> RepoResult<ListResult<Task>>;
    /// Lists tasks across every project, most recently updated first.
    fn list_all_tasks(&self, opts: &ListOptions) -> RepoResult<ListResult<Task>>;
    /// Persists `task` (relocating it when its status changed) and returns the
    /// stored record.
    fn update_task(&self, task: &Task) -> RepoResult<Task>;
    fn delete_task(&self, project_id: &ProjectId, task_id: &TaskId) -> RepoResult<()>;

    fn save_artifact(&self, artifact: &Artifact) -> RepoResult<()>;
    fn get_artifact(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        artifact_id: &str,
    ) -> RepoResult<Artifact>;
    /// Lists one task's artifacts, newest first.
    fn list_artifacts(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        opts: &ListOptions,
    ) -> RepoResult<ListResult<Artifact>>;
    fn delete_artifact(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        artifact_id: &str,
    ) -> RepoResult<()>;

    /// Case-insensitive substring search over artifact content.
    ///
    /// Built on the list operations above; see [`crate::search::content`].
    fn search_artifacts(
        &self,
        query: &str,
        project_id: Option<&ProjectId>,
        task_id: Option<&TaskId>,
        opts: &ListOptions,
    ) -> RepoResult<ListResult<Artifact>> {
        crate::search::content::search_artifacts(self, query, project_id, task_id, opts)
    }

    /// Releases held resources. The filesystem store holds none.
    fn close(&self) -> RepoResult<()> {
        Ok(())
    }
}
