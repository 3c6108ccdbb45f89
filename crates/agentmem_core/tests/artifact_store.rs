use agentmem_core::{
    ArtifactType, Clock, CreateProjectRequest, CreateTaskRequest, FsTaskRepository, ListOptions,
    ManualClock, Metadata, RepoError, SaveArtifactRequest, TaskService,
};
use chrono::{Duration, TimeZone, Utc};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const START: i64 = 1_700_000_000;

fn setup() -> (TempDir, PathBuf, TaskService<FsTaskRepository>) {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("store");
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::with_step(
        Utc.timestamp_opt(START, 0).unwrap(),
        Duration::seconds(1),
    ));
    let repo = FsTaskRepository::open_with_clock(&base, clock.clone()).unwrap();
    let service = TaskService::with_clock(repo, clock);
    service
        .create_project(CreateProjectRequest {
            id: "demo".to_string(),
            ..CreateProjectRequest::default()
        })
        .unwrap();
    service
        .create_task(CreateTaskRequest {
            project_id: "demo".to_string(),
            id: "bug-1".to_string(),
            ..CreateTaskRequest::default()
        })
        .unwrap();
    (dir, base, service)
}

fn artifacts_dir(base: &std::path::Path) -> PathBuf {
    base.join("demo").join("[open]-bug-1").join("artifacts")
}

fn save(
    service: &TaskService<FsTaskRepository>,
    kind: Option<ArtifactType>,
    content: &str,
) -> agentmem_core::Artifact {
    service
        .save_artifact(SaveArtifactRequest {
            project_id: "demo".to_string(),
            task_id: "bug-1".to_string(),
            kind,
            content: content.to_string(),
            metadata: Metadata::new(),
        })
        .unwrap()
}

#[test]
fn save_writes_markdown_file_named_by_type_and_second() {
    let (_dir, base, service) = setup();
    let saved = save(&service, Some(ArtifactType::Note), "first finding");

    let seconds = saved.created_at.timestamp();
    let path = artifacts_dir(&base).join(format!("note.{seconds}.md"));
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("---\n"));
    assert!(text.contains("\ntype: note\n"));
    assert!(text.contains("\nproject_id: demo\n"));
    assert!(text.ends_with("---\n\nfirst finding"));
    assert_eq!(saved.id, (seconds * 1_000_000_000).to_string());
}

#[test]
fn missing_type_defaults_to_generic_artifact() {
    let (_dir, base, service) = setup();
    let saved = save(&service, None, "untyped");

    assert_eq!(saved.kind, ArtifactType::Generic);
    let expected = format!("artifact.{}.md", saved.created_at.timestamp());
    assert!(artifacts_dir(&base).join(expected).is_file());
}

#[test]
fn list_returns_newest_first_with_second_ids() {
    let (_dir, _base, service) = setup();
    let first = save(&service, Some(ArtifactType::Note), "one");
    let second = save(&service, Some(ArtifactType::Decision), "two");
    let third = save(&service, Some(ArtifactType::Note), "three");

    let page = service
        .list_artifacts("demo", "bug-1", &ListOptions::default())
        .unwrap();
    let contents: Vec<&str> = page.items.iter().map(|a| a.content.as_str()).collect();
    assert_eq!(contents, vec!["three", "two", "one"]);

    let ids: Vec<String> = page.items.iter().map(|a| a.id.clone()).collect();
    assert_eq!(
        ids,
        vec![
            third.created_at.timestamp().to_string(),
            second.created_at.timestamp().to_string(),
            first.created_at.timestamp().to_string(),
        ]
    );
    assert_eq!(page.items[1].kind, ArtifactType::Decision);
    assert_eq!(page.items[2].created_at, first.created_at);
}

#[test]
fn list_paginates() {
    let (_dir, _base, service) = setup();
    for n in 0..5 {
        save(&service, Some(ArtifactType::Note), &format!("entry {n}"));
    }

    let page = service
        .list_artifacts("demo", "bug-1", &ListOptions::new(2, 2))
        .unwrap();
    assert_eq!(page.total, 5);
    let contents: Vec<&str> = page.items.iter().map(|a| a.content.as_str()).collect();
    assert_eq!(contents, vec!["entry 2", "entry 1"]);
    assert!(page.has_more);
}

#[test]
fn get_accepts_listed_and_recorded_ids() {
    let (_dir, _base, service) = setup();
    let saved = save(&service, Some(ArtifactType::Code), "fn main() {}");
    let listed_id = saved.created_at.timestamp().to_string();

    let by_listed = service.get_artifact("demo", "bug-1", &listed_id).unwrap();
    let by_recorded = service.get_artifact("demo", "bug-1", &saved.id).unwrap();
    assert_eq!(by_listed, by_recorded);
    assert_eq!(by_listed.content, "fn main() {}");
    assert_eq!(by_listed.kind, ArtifactType::Code);
}

#[test]
fn metadata_and_multiline_content_survive_roundtrip() {
    let (_dir, _base, service) = setup();
    let mut metadata = Metadata::new();
    metadata.insert("agent".to_string(), "reviewer".to_string());
    metadata.insert("path".to_string(), "src/lib.rs".to_string());
    let content = "## Summary\n\nLine one.\n\n- bullet: with colon\n---\nafter rule";

    let saved = service
        .save_artifact(SaveArtifactRequest {
            project_id: "demo".to_string(),
            task_id: "bug-1".to_string(),
            kind: Some(ArtifactType::Discussion),
            content: content.to_string(),
            metadata: metadata.clone(),
        })
        .unwrap();

    let loaded = service
        .get_artifact("demo", "bug-1", &saved.id)
        .unwrap();
    assert_eq!(loaded.content, content);
    assert_eq!(loaded.metadata, metadata);
}

#[test]
fn metadata_keys_that_cannot_roundtrip_are_rejected() {
    let (_dir, base, service) = setup();
    for key in ["source:url", " padded ", ""] {
        let mut metadata = Metadata::new();
        metadata.insert(key.to_string(), "http://x".to_string());
        let err = service
            .save_artifact(SaveArtifactRequest {
                project_id: "demo".to_string(),
                task_id: "bug-1".to_string(),
                kind: Some(ArtifactType::Reference),
                content: "link".to_string(),
                metadata,
            })
            .unwrap_err();
        assert!(
            matches!(&err, RepoError::InvalidMetadataKey(rejected) if rejected == key),
            "key={key:?}"
        );
        assert_eq!(err.code(), "invalid_metadata_key");
    }
    assert_eq!(fs::read_dir(artifacts_dir(&base)).unwrap().count(), 0);
}

#[test]
fn metadata_values_with_colons_roundtrip_through_listing() {
    let (_dir, _base, service) = setup();
    let mut metadata = Metadata::new();
    metadata.insert("source_url".to_string(), "http://x:80/a: b".to_string());
    metadata.insert("note".to_string(), "  indented".to_string());

    service
        .save_artifact(SaveArtifactRequest {
            project_id: "demo".to_string(),
            task_id: "bug-1".to_string(),
            kind: Some(ArtifactType::Reference),
            content: "link".to_string(),
            metadata: metadata.clone(),
        })
        .unwrap();

    let page = service
        .list_artifacts("demo", "bug-1", &ListOptions::default())
        .unwrap();
    assert_eq!(page.items[0].metadata, metadata);
}

#[test]
fn unsafe_type_is_rejected() {
    let (_dir, base, service) = setup();
    let err = service
        .save_artifact(SaveArtifactRequest {
            project_id: "demo".to_string(),
            task_id: "bug-1".to_string(),
            kind: Some(ArtifactType::parse("../escape")),
            content: "x".to_string(),
            metadata: Metadata::new(),
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidArtifactType(_)));
    assert_eq!(fs::read_dir(artifacts_dir(&base)).unwrap().count(), 0);
}

#[test]
fn save_to_missing_task_returns_not_found() {
    let (_dir, _base, service) = setup();
    let err = service
        .save_artifact(SaveArtifactRequest {
            project_id: "demo".to_string(),
            task_id: "ghost".to_string(),
            content: "x".to_string(),
            ..SaveArtifactRequest::default()
        })
        .unwrap_err();
    assert!(matches!(err, RepoError::TaskNotFound { .. }));
}

#[test]
fn save_bumps_task_updated_at() {
    let (_dir, _base, service) = setup();
    let before = service.get_task("demo", "bug-1").unwrap();
    let saved = save(&service, None, "progress");
    let after = service.get_task("demo", "bug-1").unwrap();

    assert!(after.updated_at > before.updated_at);
    assert!(after.updated_at >= saved.created_at);
}

#[test]
fn unknown_artifact_id_returns_not_found() {
    let (_dir, _base, service) = setup();
    save(&service, None, "present");

    let err = service.get_artifact("demo", "bug-1", "42").unwrap_err();
    assert!(matches!(err, RepoError::ArtifactNotFound { .. }));
    assert_eq!(err.code(), "artifact_not_found");
}

#[test]
fn delete_removes_only_the_named_artifact() {
    let (_dir, _base, service) = setup();
    let keep = save(&service, Some(ArtifactType::Note), "keep");
    let drop = save(&service, Some(ArtifactType::Note), "drop");

    service.delete_artifact("demo", "bug-1", &drop.id).unwrap();

    let page = service
        .list_artifacts("demo", "bug-1", &ListOptions::default())
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].content, keep.content);

    let err = service
        .delete_artifact("demo", "bug-1", &drop.id)
        .unwrap_err();
    assert!(matches!(err, RepoError::ArtifactNotFound { .. }));
}

#[test]
fn foreign_and_hidden_files_are_ignored() {
    let (_dir, base, service) = setup();
    save(&service, Some(ArtifactType::Note), "real");
    let dir = artifacts_dir(&base);
    fs::write(dir.join("README.txt"), "not an artifact").unwrap();
    fs::write(dir.join(".note.1.md.abc.tmp"), "staging leftover").unwrap();
    fs::write(dir.join("no-timestamp.md"), "bad name").unwrap();

    let page = service
        .list_artifacts("demo", "bug-1", &ListOptions::default())
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].content, "real");
}

#[test]
fn file_without_frontmatter_is_read_whole() {
    let (_dir, base, service) = setup();
    fs::write(
        artifacts_dir(&base).join("reference.1600000000.md"),
        "plain body\nsecond line",
    )
    .unwrap();

    let loaded = service
        .get_artifact("demo", "bug-1", "1600000000")
        .unwrap();
    assert_eq!(loaded.kind, ArtifactType::Reference);
    assert_eq!(loaded.content, "plain body\nsecond line");
    assert_eq!(loaded.created_at.timestamp(), 1_600_000_000);
    assert!(loaded.metadata.is_empty());
}

#[test]
fn artifact_listing_of_missing_task_returns_not_found() {
    let (_dir, _base, service) = setup();
    let err = service
        .list_artifacts("demo", "ghost", &ListOptions::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::TaskNotFound { .. }));
}
