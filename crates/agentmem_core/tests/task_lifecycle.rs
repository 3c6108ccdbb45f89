use agentmem_core::{
    Clock, CreateProjectRequest, CreateTaskRequest, FsTaskRepository, ListOptions, ManualClock,
    ProjectId, RepoError, SaveArtifactRequest, Task, TaskId, TaskService, TaskStatus,
    UpdateTaskRequest,
};
use chrono::{Duration, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn setup() -> (TempDir, PathBuf, TaskService<FsTaskRepository>) {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("store");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::with_step(
        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        Duration::seconds(1),
    ));
    let repo = FsTaskRepository::open_with_clock(&base, clock.clone()).unwrap();
    let service = TaskService::with_clock(repo, clock);
    service
        .create_project(CreateProjectRequest {
            id: "demo".to_string(),
            workspace_path: "/work/demo".to_string(),
            ..CreateProjectRequest::default()
        })
        .unwrap();
    (dir, base, service)
}

fn create_task(service: &TaskService<FsTaskRepository>, project_id: &str, id: &str) -> Task {
    service
        .create_task(CreateTaskRequest {
            project_id: project_id.to_string(),
            id: id.to_string(),
            ..CreateTaskRequest::default()
        })
        .unwrap()
}

fn set_status(
    service: &TaskService<FsTaskRepository>,
    task_id: &str,
    status: TaskStatus,
) -> Result<Task, RepoError> {
    service.update_task(UpdateTaskRequest {
        project_id: "demo".to_string(),
        id: task_id.to_string(),
        status: Some(status),
        ..UpdateTaskRequest::default()
    })
}

fn dir_names(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(path)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn create_lays_out_status_tagged_directory() {
    let (_dir, base, service) = setup();
    let task = create_task(&service, "demo", "Bug 1");

    assert_eq!(task.id.as_str(), "bug-1");
    assert_eq!(task.name, "Bug 1");
    assert_eq!(task.status, TaskStatus::Open);

    let task_dir = base.join("demo").join("[open]-bug-1");
    assert!(task_dir.join("task.json").is_file());
    assert!(task_dir.join("artifacts").is_dir());
    assert_eq!(service.get_task("demo", "bug-1").unwrap(), task);
}

#[test]
fn create_in_missing_project_returns_not_found() {
    let (_dir, _base, service) = setup();
    let err = service
        .create_task(CreateTaskRequest {
            project_id: "ghost".to_string(),
            id: "bug-1".to_string(),
            ..CreateTaskRequest::default()
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::ProjectNotFound(_)));
}

#[test]
fn invalid_task_id_is_rejected() {
    let (_dir, _base, service) = setup();
    let err = service
        .create_task(CreateTaskRequest {
            project_id: "demo".to_string(),
            id: "///".to_string(),
            ..CreateTaskRequest::default()
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidTaskId(_)));
    assert_eq!(err.code(), "invalid_task_id");
}

#[test]
fn task_ids_are_unique_across_statuses() {
    let (_dir, _base, service) = setup();
    create_task(&service, "demo", "bug-1");
    set_status(&service, "bug-1", TaskStatus::Completed).unwrap();

    let err = service
        .create_task(CreateTaskRequest {
            project_id: "demo".to_string(),
            id: "BUG 1".to_string(),
            ..CreateTaskRequest::default()
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::TaskAlreadyExists { .. }));
}

#[test]
fn status_change_renames_directory_and_keeps_artifacts() {
    let (_dir, base, service) = setup();
    let created = create_task(&service, "demo", "bug-1");
    service
        .save_artifact(SaveArtifactRequest {
            project_id: "demo".to_string(),
            task_id: "bug-1".to_string(),
            content: "investigation notes".to_string(),
            ..SaveArtifactRequest::default()
        })
        .unwrap();

    let moved = set_status(&service, "bug-1", TaskStatus::InProgress).unwrap();
    assert_eq!(moved.status, TaskStatus::InProgress);
    assert!(moved.updated_at > created.updated_at);

    let project_dir = base.join("demo");
    assert_eq!(dir_names(&project_dir), vec!["[in_progress]-bug-1", "project.json"]);

    let task_dir = project_dir.join("[in_progress]-bug-1");
    assert_eq!(dir_names(&task_dir), vec!["artifacts", "task.json"]);
    let stored: serde_json::Value =
        serde_json::from_slice(&fs::read(task_dir.join("task.json")).unwrap()).unwrap();
    assert_eq!(stored["status"], "in_progress");

    let artifacts = service
        .list_artifacts("demo", "bug-1", &ListOptions::default())
        .unwrap();
    assert_eq!(artifacts.total, 1);
    assert_eq!(artifacts.items[0].content, "investigation notes");
}

#[test]
fn every_status_maps_to_exactly_one_directory() {
    let (_dir, base, service) = setup();
    create_task(&service, "demo", "bug-1");

    for status in [
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Archived,
        TaskStatus::Open,
    ] {
        set_status(&service, "bug-1", status).unwrap();
        let names: Vec<String> = dir_names(&base.join("demo"))
            .into_iter()
            .filter(|name| name.ends_with("-bug-1"))
            .collect();
        assert_eq!(names, vec![format!("[{}]-bug-1", status.as_str())]);
        assert_eq!(service.get_task("demo", "bug-1").unwrap().status, status);
    }
}

#[test]
fn update_without_status_change_rewrites_in_place() {
    let (_dir, base, service) = setup();
    create_task(&service, "demo", "bug-1");

    let updated = service
        .update_task(UpdateTaskRequest {
            project_id: "demo".to_string(),
            id: "bug-1".to_string(),
            description: Some("repro steps".to_string()),
            ..UpdateTaskRequest::default()
        })
        .unwrap();
    assert_eq!(updated.description, "repro steps");
    assert_eq!(updated.name, "bug-1");
    assert!(base.join("demo").join("[open]-bug-1").is_dir());
}

#[test]
fn update_missing_task_returns_not_found() {
    let (_dir, _base, service) = setup();
    let err = set_status(&service, "ghost", TaskStatus::Completed).unwrap_err();
    assert!(matches!(err, RepoError::TaskNotFound { .. }));
}

#[test]
fn list_filters_by_status_and_orders_by_update() {
    let (_dir, _base, service) = setup();
    for id in ["a", "b", "c"] {
        create_task(&service, "demo", id);
    }
    set_status(&service, "a", TaskStatus::Completed).unwrap();

    let all = service.list_tasks("demo", &ListOptions::default()).unwrap();
    let ids: Vec<&str> = all.items.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c", "b"]);

    let open = service
        .list_tasks("demo", &ListOptions::default().with_status(TaskStatus::Open))
        .unwrap();
    assert_eq!(open.total, 2);
    assert!(open.items.iter().all(|t| t.status == TaskStatus::Open));

    let completed = service
        .list_tasks(
            "demo",
            &ListOptions::default().with_status(TaskStatus::Completed),
        )
        .unwrap();
    assert_eq!(completed.items.len(), 1);
    assert_eq!(completed.items[0].id.as_str(), "a");

    let page = service.list_tasks("demo", &ListOptions::new(1, 1)).unwrap();
    assert_eq!(page.items[0].id.as_str(), "c");
    assert!(page.has_more);
}

#[test]
fn list_in_missing_project_returns_not_found() {
    let (_dir, _base, service) = setup();
    let err = service
        .list_tasks("ghost", &ListOptions::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::ProjectNotFound(_)));
}

#[test]
fn list_all_tasks_spans_projects() {
    let (_dir, _base, service) = setup();
    service
        .create_project(CreateProjectRequest {
            id: "other".to_string(),
            ..CreateProjectRequest::default()
        })
        .unwrap();
    create_task(&service, "demo", "first");
    create_task(&service, "other", "second");
    set_status(&service, "first", TaskStatus::Archived).unwrap();

    let all = service.list_all_tasks(&ListOptions::default()).unwrap();
    let pairs: Vec<(&str, &str)> = all
        .items
        .iter()
        .map(|t| (t.project_id.as_str(), t.id.as_str()))
        .collect();
    assert_eq!(pairs, vec![("demo", "first"), ("other", "second")]);

    let archived = service
        .list_all_tasks(&ListOptions::default().with_status(TaskStatus::Archived))
        .unwrap();
    assert_eq!(archived.total, 1);
}

#[test]
fn unprefixed_legacy_directory_is_found_and_listed() {
    let (_dir, base, service) = setup();
    let legacy = Task::new_at(
        ProjectId::new("demo"),
        TaskId::new("legacy-task"),
        "Legacy",
        Utc.timestamp_opt(1_600_000_000, 0).unwrap(),
    );
    let legacy_dir = base.join("demo").join("legacy-task");
    fs::create_dir_all(&legacy_dir).unwrap();
    fs::write(
        legacy_dir.join("task.json"),
        serde_json::to_vec_pretty(&legacy).unwrap(),
    )
    .unwrap();

    let loaded = service.get_task("demo", "legacy-task").unwrap();
    assert_eq!(loaded, legacy);

    let listed = service.list_tasks("demo", &ListOptions::default()).unwrap();
    assert_eq!(listed.total, 1);

    set_status(&service, "legacy-task", TaskStatus::Completed).unwrap();
    assert!(base.join("demo").join("[completed]-legacy-task").is_dir());
    assert!(!legacy_dir.exists());
}

#[test]
fn directory_without_metadata_is_readable_but_not_listed() {
    let (_dir, base, service) = setup();
    fs::create_dir_all(base.join("demo").join("[completed]-ghost")).unwrap();

    let loaded = service.get_task("demo", "ghost").unwrap();
    assert_eq!(loaded.name, "ghost");
    assert_eq!(loaded.status, TaskStatus::Completed);
    assert_eq!(loaded.project_id.as_str(), "demo");

    let listed = service.list_tasks("demo", &ListOptions::default()).unwrap();
    assert_eq!(listed.total, 0);
}

#[test]
fn delete_removes_directory_and_artifacts() {
    let (_dir, base, service) = setup();
    create_task(&service, "demo", "bug-1");
    set_status(&service, "bug-1", TaskStatus::InProgress).unwrap();

    service.delete_task("demo", "bug-1").unwrap();

    assert!(!base.join("demo").join("[in_progress]-bug-1").exists());
    assert!(matches!(
        service.get_task("demo", "bug-1").unwrap_err(),
        RepoError::TaskNotFound { .. }
    ));
    assert!(matches!(
        service.delete_task("demo", "bug-1").unwrap_err(),
        RepoError::TaskNotFound { .. }
    ));
}

#[test]
fn effective_workspace_prefers_task_over_project() {
    let (_dir, _base, service) = setup();
    create_task(&service, "demo", "inherits");
    service
        .create_task(CreateTaskRequest {
            project_id: "demo".to_string(),
            id: "overrides".to_string(),
            workspace_path: "/work/override".to_string(),
            ..CreateTaskRequest::default()
        })
        .unwrap();

    assert_eq!(
        service.effective_workspace_path("demo", "inherits").unwrap(),
        "/work/demo"
    );
    assert_eq!(
        service.effective_workspace_path("demo", "overrides").unwrap(),
        "/work/override"
    );
}
