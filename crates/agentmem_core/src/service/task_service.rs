//! Project/task/artifact use-case service.
//!
//! # Responsibility
//! - Accept raw caller input, normalize ids and apply partial updates.
//! - Delegate persistence to a [`TaskRepository`] implementation.
//! - Log one outcome record per mutation.
//!
//! # Invariants
//! - Creation paths validate normalized ids before any repository call.
//! - Repository errors are returned unchanged.
//! - Service layer remains storage-agnostic.

use crate::clock::{Clock, SystemClock};
use crate::model::{
    Artifact, ArtifactType, Metadata, Project, ProjectId, Task, TaskId, TaskStatus,
};
use crate::repo::task_repo::{ListOptions, ListResult, RepoError, RepoResult, TaskRepository};
use log::{error, info};
use std::sync::Arc;

/// Input for [`TaskService::create_project`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateProjectRequest {
    /// Raw id; normalized into a slug.
    pub id: String,
    /// Display name; defaults to the raw id when blank.
    pub name: String,
    pub description: String,
    pub workspace_path: String,
    pub metadata: Metadata,
}

/// Input for [`TaskService::update_project`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateProjectRequest {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub workspace_path: Option<String>,
    /// Replaces the whole metadata map when set.
    pub metadata: Option<Metadata>,
}

/// Input for [`TaskService::create_task`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub project_id: String,
    pub id: String,
    /// Display name; defaults to the raw id when blank.
    pub name: String,
    pub description: String,
    /// Overrides the project workspace when non-empty.
    pub workspace_path: String,
    pub metadata: Metadata,
}

/// Input for [`TaskService::update_task`]. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTaskRequest {
    pub project_id: String,
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub workspace_path: Option<String>,
    /// A changed status relocates the task directory.
    pub status: Option<TaskStatus>,
    pub metadata: Option<Metadata>,
}

/// Input for [`TaskService::save_artifact`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveArtifactRequest {
    pub project_id: String,
    pub task_id: String,
    /// Defaults to the generic `artifact` type.
    pub kind: Option<ArtifactType>,
    pub content: String,
    pub metadata: Metadata,
}

/// Input for [`TaskService::search_artifacts`]. Blank filters mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchArtifactsRequest {
    pub query: String,
    pub project_id: String,
    pub task_id: String,
}

/// Use-case service wrapper for the project/task/artifact store.
pub struct TaskService<R: TaskRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: TaskRepository> TaskService<R> {
    /// Creates a service stamping new records with the system clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    pub fn with_clock(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn create_project(&self, request: CreateProjectRequest) -> RepoResult<Project> {
        let project_id = valid_project_id(&request.id)?;
        let name = default_name(request.name, &request.id);

        let mut project = Project::new_at(project_id.clone(), name, self.clock.now());
        project.description = request.description;
        project.workspace_path = request.workspace_path;
        project.metadata = request.metadata;

        match self.repo.create_project(&project) {
            Ok(()) => {
                info!(
                    "event=project_create module=service status=ok project_id={}",
                    project_id
                );
                Ok(project)
            }
            Err(err) => Err(log_failure("project_create", &project_id, None, err)),
        }
    }

    pub fn get_project(&self, id: &str) -> RepoResult<Project> {
        self.repo.get_project(&ProjectId::new(id))
    }

    pub fn list_projects(&self, opts: &ListOptions) -> RepoResult<ListResult<Project>> {
        self.repo.list_projects(opts)
    }

    pub fn update_project(&self, request: UpdateProjectRequest) -> RepoResult<Project> {
        let project_id = ProjectId::new(&request.id);
        let mut project = self.repo.get_project(&project_id)?;

        if let Some(name) = request.name {
            project.name = name;
        }
        if let Some(description) = request.description {
            project.description = description;
        }
        if let Some(workspace_path) = request.workspace_path {
            project.workspace_path = workspace_path;
        }
        if let Some(metadata) = request.metadata {
            project.metadata = metadata;
        }

        match self.repo.update_project(&project) {
            Ok(stored) => {
                info!(
                    "event=project_update module=service status=ok project_id={}",
                    project_id
                );
                Ok(stored)
            }
            Err(err) => Err(log_failure("project_update", &project_id, None, err)),
        }
    }

    /// Deletes a project with all of its tasks and artifacts.
    pub fn delete_project(&self, id: &str) -> RepoResult<()> {
        let project_id = ProjectId::new(id);
        match self.repo.delete_project(&project_id) {
            Ok(()) => {
                info!(
                    "event=project_delete module=service status=ok project_id={}",
                    project_id
                );
                Ok(())
            }
            Err(err) => Err(log_failure("project_delete", &project_id, None, err)),
        }
    }

    pub fn create_task(&self, request: CreateTaskRequest) -> RepoResult<Task> {
        let project_id = valid_project_id(&request.project_id)?;
        let task_id = valid_task_id(&request.id)?;
        let name = default_name(request.name, &request.id);

        let mut task = Task::new_at(project_id.clone(), task_id.clone(), name, self.clock.now());
        task.description = request.description;
        task.workspace_path = request.workspace_path;
        task.metadata = request.metadata;

        match self.repo.create_task(&task) {
            Ok(()) => {
                info!(
                    "event=task_create module=service status=ok project_id={} task_id={}",
                    project_id, task_id
                );
                Ok(task)
            }
            Err(err) => Err(log_failure("task_create", &project_id, Some(&task_id), err)),
        }
    }

    pub fn get_task(&self, project_id: &str, task_id: &str) -> RepoResult<Task> {
        self.repo
            .get_task(&ProjectId::new(project_id), &TaskId::new(task_id))
    }

    pub fn list_tasks(&self, project_id: &str, opts: &ListOptions) -> RepoResult<ListResult<Task>> {
        self.repo.list_tasks(&ProjectId::new(project_id), opts)
    }

    pub fn list_all_tasks(&self, opts: &ListOptions) -> RepoResult<ListResult<Task>> {
        self.repo.list_all_tasks(opts)
    }

    pub fn update_task(&self, request: UpdateTaskRequest) -> RepoResult<Task> {
        let project_id = ProjectId::new(&request.project_id);
        let task_id = TaskId::new(&request.id);
        let mut task = self.repo.get_task(&project_id, &task_id)?;

        if let Some(name) = request.name {
            task.name = name;
        }
        if let Some(description) = request.description {
            task.description = description;
        }
        if let Some(workspace_path) = request.workspace_path {
            task.workspace_path = workspace_path;
        }
        if let Some(status) = request.status {
            task.status = status;
        }
        if let Some(metadata) = request.metadata {
            task.metadata = metadata;
        }

        match self.repo.update_task(&task) {
            Ok(stored) => {
                info!(
                    "event=task_update module=service status=ok project_id={} task_id={} \
                     task_status={}",
                    project_id, task_id, stored.status
                );
                Ok(stored)
            }
            Err(err) => Err(log_failure("task_update", &project_id, Some(&task_id), err)),
        }
    }

    pub fn delete_task(&self, project_id: &str, task_id: &str) -> RepoResult<()> {
        let project_id = ProjectId::new(project_id);
        let task_id = TaskId::new(task_id);
        match self.repo.delete_task(&project_id, &task_id) {
            Ok(()) => {
                info!(
                    "event=task_delete module=service status=ok project_id={} task_id={}",
                    project_id, task_id
                );
                Ok(())
            }
            Err(err) => Err(log_failure("task_delete", &project_id, Some(&task_id), err)),
        }
    }

    /// Saves a new artifact after confirming the owning task exists.
    pub fn save_artifact(&self, request: SaveArtifactRequest) -> RepoResult<Artifact> {
        let project_id = ProjectId::new(&request.project_id);
        let task_id = TaskId::new(&request.task_id);
        self.repo.get_task(&project_id, &task_id)?;

        let kind = request.kind.unwrap_or_default();
        let mut artifact = Artifact::new_at(
            project_id.clone(),
            task_id.clone(),
            kind,
            request.content,
            self.clock.now(),
        );
        artifact.metadata = request.metadata;

        match self.repo.save_artifact(&artifact) {
            Ok(()) => {
                info!(
                    "event=artifact_save module=service status=ok project_id={} task_id={} \
                     type={} artifact_id={}",
                    project_id, task_id, artifact.kind, artifact.id
                );
                Ok(artifact)
            }
            Err(err) => Err(log_failure("artifact_save", &project_id, Some(&task_id), err)),
        }
    }

    pub fn get_artifact(
        &self,
        project_id: &str,
        task_id: &str,
        artifact_id: &str,
    ) -> RepoResult<Artifact> {
        self.repo.get_artifact(
            &ProjectId::new(project_id),
            &TaskId::new(task_id),
            artifact_id,
        )
    }

    pub fn list_artifacts(
        &self,
        project_id: &str,
        task_id: &str,
        opts: &ListOptions,
    ) -> RepoResult<ListResult<Artifact>> {
        self.repo
            .list_artifacts(&ProjectId::new(project_id), &TaskId::new(task_id), opts)
    }

    pub fn search_artifacts(
        &self,
        request: &SearchArtifactsRequest,
        opts: &ListOptions,
    ) -> RepoResult<ListResult<Artifact>> {
        let project_id = non_blank(&request.project_id).map(ProjectId::new);
        let task_id = non_blank(&request.task_id).map(TaskId::new);
        self.repo.search_artifacts(
            &request.query,
            project_id.as_ref(),
            task_id.as_ref(),
            opts,
        )
    }

    pub fn delete_artifact(
        &self,
        project_id: &str,
        task_id: &str,
        artifact_id: &str,
    ) -> RepoResult<()> {
        let project_id = ProjectId::new(project_id);
        let task_id = TaskId::new(task_id);
        match self.repo.delete_artifact(&project_id, &task_id, artifact_id) {
            Ok(()) => {
                info!(
                    "event=artifact_delete module=service status=ok project_id={} task_id={} \
                     artifact_id={}",
                    project_id, task_id, artifact_id
                );
                Ok(())
            }
            Err(err) => Err(log_failure("artifact_delete", &project_id, Some(&task_id), err)),
        }
    }

    /// Workspace root for a task: its own path, else the project's.
    pub fn effective_workspace_path(&self, project_id: &str, task_id: &str) -> RepoResult<String> {
        let task = self.get_task(project_id, task_id)?;
        if !task.workspace_path.is_empty() {
            return Ok(task.workspace_path);
        }
        let project = self.repo.get_project(&task.project_id)?;
        Ok(project.workspace_path)
    }
}

fn valid_project_id(raw: &str) -> RepoResult<ProjectId> {
    let id = ProjectId::new(raw);
    if id.is_valid() {
        Ok(id)
    } else {
        Err(RepoError::InvalidProjectId(raw.to_string()))
    }
}

fn valid_task_id(raw: &str) -> RepoResult<TaskId> {
    let id = TaskId::new(raw);
    if id.is_valid() {
        Ok(id)
    } else {
        Err(RepoError::InvalidTaskId(raw.to_string()))
    }
}

fn default_name(name: String, raw_id: &str) -> String {
    if name.trim().is_empty() {
        raw_id.to_string()
    } else {
        name
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn log_failure(
    event: &str,
    project_id: &ProjectId,
    task_id: Option<&TaskId>,
    err: RepoError,
) -> RepoError {
    error!(
        "event={} module=service status=error project_id={} task_id={} error_code={} error={}",
        event,
        project_id,
        task_id.map_or("-", TaskId::as_str),
        err.code(),
        err
    );
    err
}
