//! Core of the agentmem project/task/artifact store.
//! Everything persisted lives under one base directory as plain JSON and
//! Markdown files; this crate owns that layout and its invariants.

pub mod clock;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError, ConfigResult};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::{Artifact, ArtifactType, Metadata, Project, ProjectId, Task, TaskId, TaskStatus};
pub use repo::fs_repo::FsTaskRepository;
pub use repo::pagination::{paginate, DEFAULT_LIST_LIMIT};
pub use repo::task_repo::{
    ListOptions, ListResult, RepoError, RepoResult, StorageError, TaskRepository,
};
pub use search::search_artifacts;
pub use service::task_service::{
    CreateProjectRequest, CreateTaskRequest, SaveArtifactRequest, SearchArtifactsRequest,
    TaskService, UpdateProjectRequest, UpdateTaskRequest,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
