//! Filesystem-backed implementation of [`TaskRepository`].
//!
//! # Responsibility
//! - Map projects, tasks and artifacts onto directories and files.
//! - Resolve task ids by scanning status-tagged directory names.
//! - Keep every read derived from disk; nothing is cached.
//!
//! # Invariants
//! - Ids are validated before any path is built from them.
//! - A task status change renames the task directory; the staged metadata
//!   file travels with the rename and is promoted afterwards.
//! - A status prefix in the directory name wins over `task.json` on read.
//! - Artifact save touches the owning task's `updated_at` on a best-effort
//!   basis; failures are logged, never returned.
//!
//! # See also
//! - [`crate::repo::layout`] for the on-disk grammar.

use crate::clock::{Clock, SystemClock};
use crate::model::{Artifact, Project, ProjectId, Task, TaskId};
use crate::repo::artifact_file::{
    is_valid_metadata_key, parse_artifact, render_artifact, StoredArtifact,
};
use crate::repo::layout::{
    parse_task_dir_name, staging_file_name, ARTIFACTS_DIR, ARTIFACT_EXTENSION,
    PROJECT_METADATA_FILE, TASK_METADATA_FILE,
};
use crate::repo::pagination::paginate;
use crate::repo::task_repo::{
    ListOptions, ListResult, RepoError, RepoResult, StorageError, TaskRepository,
};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filesystem store rooted at a base directory.
#[derive(Clone)]
pub struct FsTaskRepository {
    base_path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FsTaskRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsTaskRepository")
            .field("base_path", &self.base_path)
            .finish_non_exhaustive()
    }
}

impl FsTaskRepository {
    /// Opens (creating if needed) a store at `base_path` using the system clock.
    pub fn open(base_path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with_clock(base_path, Arc::new(SystemClock))
    }

    /// Opens a store with an explicit time source.
    pub fn open_with_clock(base_path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> RepoResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)
            .map_err(|err| StorageError::io("create base directory", &base_path, err))?;
        info!(
            "event=store_open module=store status=ok base_path={}",
            base_path.display()
        );
        Ok(Self { base_path, clock })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn project_dir(&self, id: &ProjectId) -> PathBuf {
        self.base_path.join(id.as_str())
    }

    fn require_project_dir(&self, id: &ProjectId) -> RepoResult<PathBuf> {
        ensure_project_id(id)?;
        let dir = self.project_dir(id);
        if !path_exists(&dir)? {
            return Err(RepoError::ProjectNotFound(id.clone()));
        }
        Ok(dir)
    }

    /// Finds the directory currently backing `(project_id, task_id)`.
    ///
    /// Entries are scanned in name order and the first match wins.
    fn find_task_dir(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
    ) -> RepoResult<Option<PathBuf>> {
        ensure_project_id(project_id)?;
        ensure_task_id(task_id)?;

        let project_dir = self.project_dir(project_id);
        let names = match list_dir_names(&project_dir) {
            Ok(names) => names,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::io("scan project directory", &project_dir, err).into())
            }
        };

        let mut matches = names
            .into_iter()
            .filter(|name| parse_task_dir_name(name).task_id == task_id.as_str());
        let Some(first) = matches.next() else {
            return Ok(None);
        };

        let extra = matches.count();
        if extra > 0 {
            warn!(
                "event=task_resolve module=store status=ambiguous project_id={} task_id={} \
                 chosen={} extra_candidates={}",
                project_id, task_id, first, extra
            );
        }

        Ok(Some(project_dir.join(first)))
    }

    fn require_task_dir(&self, project_id: &ProjectId, task_id: &TaskId) -> RepoResult<PathBuf> {
        self.find_task_dir(project_id, task_id)?
            .ok_or_else(|| RepoError::TaskNotFound {
                project_id: project_id.clone(),
                task_id: task_id.clone(),
            })
    }

    fn load_project(&self, id: &ProjectId) -> RepoResult<Project> {
        let path = self.project_dir(id).join(PROJECT_METADATA_FILE);
        match read_json::<Project>(&path)? {
            Some(project) => Ok(project),
            None => {
                debug!(
                    "event=project_load module=store status=synthesized project_id={}",
                    id
                );
                Ok(Project::new_at(id.clone(), id.as_str(), self.clock.now()))
            }
        }
    }

    fn load_task_from_dir(&self, task_dir: &Path) -> RepoResult<Task> {
        let dir_name = file_name_lossy(task_dir);
        let parsed = parse_task_dir_name(&dir_name);
        let path = task_dir.join(TASK_METADATA_FILE);

        let Some(mut task) = read_json::<Task>(&path)? else {
            let project_id = task_dir
                .parent()
                .map(file_name_lossy)
                .unwrap_or_default();
            let mut task = Task::new_at(
                ProjectId::from_stored(project_id),
                TaskId::from_stored(parsed.task_id),
                parsed.task_id,
                self.clock.now(),
            );
            task.status = parsed.implied_status();
            debug!(
                "event=task_load module=store status=synthesized dir={}",
                dir_name
            );
            return Ok(task);
        };

        if let Some(dir_status) = parsed.prefixed_status() {
            if dir_status != task.status {
                debug!(
                    "event=task_load module=store status=reconciled dir={} json_status={} \
                     dir_status={}",
                    dir_name, task.status, dir_status
                );
                task.status = dir_status;
            }
        }

        Ok(task)
    }

    /// Reads every task with a metadata file under `project_dir`.
    fn collect_tasks(&self, project_dir: &Path, opts: &ListOptions) -> RepoResult<Vec<Task>> {
        let names = list_dir_names(project_dir)
            .map_err(|err| StorageError::io("scan project directory", project_dir, err))?;

        let mut tasks = Vec::new();
        for name in names {
            let task_dir = project_dir.join(&name);
            if !path_exists(&task_dir.join(TASK_METADATA_FILE))? {
                continue;
            }
            match self.load_task_from_dir(&task_dir) {
                Ok(task) => {
                    if opts.status.map_or(true, |status| status == task.status) {
                        tasks.push(task);
                    }
                }
                Err(err) => debug!(
                    "event=task_list module=store status=skipped dir={} error={}",
                    task_dir.display(),
                    err
                ),
            }
        }
        Ok(tasks)
    }

    /// Ids of every project directory under the base path.
    fn project_ids(&self) -> RepoResult<Vec<ProjectId>> {
        let names = list_dir_names(&self.base_path)
            .map_err(|err| StorageError::io("scan base directory", &self.base_path, err))?;

        Ok(names
            .into_iter()
            .filter_map(|name| {
                let id = ProjectId::from_stored(name);
                if id.is_valid() {
                    Some(id)
                } else {
                    debug!(
                        "event=project_list module=store status=skipped dir={}",
                        id.as_str()
                    );
                    None
                }
            })
            .collect())
    }

    fn write_task_metadata(&self, task_dir: &Path, task: &Task) -> RepoResult<()> {
        write_json_atomic(&task_dir.join(TASK_METADATA_FILE), task)
    }

    /// Every artifact of a task, newest first, with on-disk identity.
    fn load_artifacts(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        task_dir: &Path,
    ) -> RepoResult<Vec<StoredArtifact>> {
        let artifacts_dir = task_dir.join(ARTIFACTS_DIR);
        let entries = match fs::read_dir(&artifacts_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(StorageError::io("scan artifacts directory", &artifacts_dir, err).into())
            }
        };

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| {
                StorageError::io("scan artifacts directory", &artifacts_dir, err)
            })?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.ends_with(ARTIFACT_EXTENSION) || file_name.starts_with('.') {
                continue;
            }
            let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let text = match fs::read_to_string(entry.path()) {
                Ok(text) => text,
                Err(err) => {
                    debug!(
                        "event=artifact_list module=store status=skipped file={} error={}",
                        file_name, err
                    );
                    continue;
                }
            };
            match parse_artifact(project_id, task_id, &file_name, &text) {
                Some(stored) => artifacts.push(stored),
                None => debug!(
                    "event=artifact_list module=store status=skipped file={} error=unparsable_name",
                    file_name
                ),
            }
        }

        // Name order first keeps same-second ties deterministic.
        artifacts.sort_by(|a, b| b.file_name.cmp(&a.file_name));
        artifacts.sort_by(|a, b| b.artifact.created_at.cmp(&a.artifact.created_at));
        Ok(artifacts)
    }

    fn find_artifact(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        artifact_id: &str,
    ) -> RepoResult<(PathBuf, StoredArtifact)> {
        let task_dir = self.require_task_dir(project_id, task_id)?;
        self.load_artifacts(project_id, task_id, &task_dir)?
            .into_iter()
            .find(|stored| stored.matches_id(artifact_id))
            .map(|stored| (task_dir, stored))
            .ok_or_else(|| RepoError::ArtifactNotFound {
                project_id: project_id.clone(),
                task_id: task_id.clone(),
                artifact_id: artifact_id.to_string(),
            })
    }

    /// Best-effort `updated_at` bump after an artifact write.
    fn touch_task(&self, task_dir: &Path) {
        let result = self.load_task_from_dir(task_dir).and_then(|mut task| {
            task.updated_at = self.clock.now();
            self.write_task_metadata(task_dir, &task)
        });
        if let Err(err) = result {
            warn!(
                "event=task_touch module=store status=error dir={} error={}",
                task_dir.display(),
                err
            );
        }
    }
}

impl TaskRepository for FsTaskRepository {
    fn create_project(&self, project: &Project) -> RepoResult<()> {
        ensure_project_id(&project.id)?;
        let dir = self.project_dir(&project.id);
        if path_exists(&dir)? {
            return Err(RepoError::ProjectAlreadyExists(project.id.clone()));
        }

        fs::create_dir_all(&dir)
            .map_err(|err| StorageError::io("create project directory", &dir, err))?;
        write_json_atomic(&dir.join(PROJECT_METADATA_FILE), project)
    }

    fn get_project(&self, id: &ProjectId) -> RepoResult<Project> {
        self.require_project_dir(id)?;
        self.load_project(id)
    }

    fn list_projects(&self, opts: &ListOptions) -> RepoResult<ListResult<Project>> {
        let mut projects = Vec::new();
        for id in self.project_ids()? {
            match self.load_project(&id) {
                Ok(project) => projects.push(project),
                Err(err) => debug!(
                    "event=project_list module=store status=skipped project_id={} error={}",
                    id, err
                ),
            }
        }

        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(paginate(projects, opts))
    }

    fn update_project(&self, project: &Project) -> RepoResult<Project> {
        let dir = self.require_project_dir(&project.id)?;
        let mut stored = project.clone();
        stored.updated_at = self.clock.now();
        write_json_atomic(&dir.join(PROJECT_METADATA_FILE), &stored)?;
        Ok(stored)
    }

    fn delete_project(&self, id: &ProjectId) -> RepoResult<()> {
        let dir = self.require_project_dir(id)?;
        fs::remove_dir_all(&dir)
            .map_err(|err| StorageError::io("remove project directory", &dir, err))?;
        Ok(())
    }

    fn create_task(&self, task: &Task) -> RepoResult<()> {
        let project_dir = self.require_project_dir(&task.project_id)?;
        if self.find_task_dir(&task.project_id, &task.id)?.is_some() {
            return Err(RepoError::TaskAlreadyExists {
                project_id: task.project_id.clone(),
                task_id: task.id.clone(),
            });
        }

        let task_dir = project_dir.join(task.dir_name());
        let artifacts_dir = task_dir.join(ARTIFACTS_DIR);
        fs::create_dir_all(&artifacts_dir)
            .map_err(|err| StorageError::io("create task directory", &artifacts_dir, err))?;
        self.write_task_metadata(&task_dir, task)
    }

    fn get_task(&self, project_id: &ProjectId, task_id: &TaskId) -> RepoResult<Task> {
        let task_dir = self.require_task_dir(project_id, task_id)?;
        self.load_task_from_dir(&task_dir)
    }

    fn list_tasks(
        &self,
        project_id: &ProjectId,
        opts: &ListOptions,
    ) -> RepoResult<ListResult<Task>> {
        let project_dir = self.require_project_dir(project_id)?;
        let mut tasks = self.collect_tasks(&project_dir, opts)?;
        tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(paginate(tasks, opts))
    }

    fn list_all_tasks(&self, opts: &ListOptions) -> RepoResult<ListResult<Task>> {
        let mut tasks = Vec::new();
        for id in self.project_ids()? {
            match self.collect_tasks(&self.project_dir(&id), opts) {
                Ok(mut project_tasks) => tasks.append(&mut project_tasks),
                Err(err) => debug!(
                    "event=task_list module=store status=skipped project_id={} error={}",
                    id, err
                ),
            }
        }

        tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(paginate(tasks, opts))
    }

    fn update_task(&self, task: &Task) -> RepoResult<Task> {
        let current_dir = self.require_task_dir(&task.project_id, &task.id)?;
        let mut stored = task.clone();
        stored.updated_at = self.clock.now();

        let target_dir = self.project_dir(&task.project_id).join(stored.dir_name());
        if current_dir == target_dir {
            self.write_task_metadata(&current_dir, &stored)?;
            return Ok(stored);
        }

        if path_exists(&target_dir)? {
            return Err(StorageError::io(
                "rename task directory onto",
                &target_dir,
                io::Error::from(io::ErrorKind::AlreadyExists),
            )
            .into());
        }

        // Stage the new metadata inside the current directory so the rename
        // below is the single commit point for both name and content.
        let staged_name = staging_file_name(TASK_METADATA_FILE);
        let staged_path = current_dir.join(&staged_name);
        write_json(&staged_path, &stored)?;

        if let Err(err) = fs::rename(&current_dir, &target_dir) {
            if let Err(cleanup) = fs::remove_file(&staged_path) {
                warn!(
                    "event=task_update module=store status=cleanup_failed file={} error={}",
                    staged_path.display(),
                    cleanup
                );
            }
            return Err(StorageError::io("rename task directory", &current_dir, err).into());
        }

        let promoted_from = target_dir.join(&staged_name);
        let metadata_path = target_dir.join(TASK_METADATA_FILE);
        fs::rename(&promoted_from, &metadata_path)
            .map_err(|err| StorageError::io("promote staged task metadata", &promoted_from, err))?;

        info!(
            "event=task_relocate module=store status=ok project_id={} task_id={} from={} to={}",
            task.project_id,
            task.id,
            file_name_lossy(&current_dir),
            file_name_lossy(&target_dir)
        );
        Ok(stored)
    }

    fn delete_task(&self, project_id: &ProjectId, task_id: &TaskId) -> RepoResult<()> {
        let task_dir = self.require_task_dir(project_id, task_id)?;
        fs::remove_dir_all(&task_dir)
            .map_err(|err| StorageError::io("remove task directory", &task_dir, err))?;
        Ok(())
    }

    fn save_artifact(&self, artifact: &Artifact) -> RepoResult<()> {
        if !artifact.kind.is_file_safe() {
            return Err(RepoError::InvalidArtifactType(artifact.kind.to_string()));
        }
        if let Some(key) = artifact
            .metadata
            .keys()
            .find(|key| !is_valid_metadata_key(key))
        {
            return Err(RepoError::InvalidMetadataKey(key.clone()));
        }
        let task_dir = self.require_task_dir(&artifact.project_id, &artifact.task_id)?;

        let artifacts_dir = task_dir.join(ARTIFACTS_DIR);
        fs::create_dir_all(&artifacts_dir)
            .map_err(|err| StorageError::io("create artifacts directory", &artifacts_dir, err))?;

        let file_name = artifact.file_name();
        let path = artifacts_dir.join(&file_name);
        if path_exists(&path)? {
            warn!(
                "event=artifact_save module=store status=overwrite project_id={} task_id={} \
                 file={}",
                artifact.project_id, artifact.task_id, file_name
            );
        }
        write_bytes_atomic(&path, render_artifact(artifact).as_bytes())?;

        self.touch_task(&task_dir);
        Ok(())
    }

    fn get_artifact(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        artifact_id: &str,
    ) -> RepoResult<Artifact> {
        self.find_artifact(project_id, task_id, artifact_id)
            .map(|(_, stored)| stored.artifact)
    }

    fn list_artifacts(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        opts: &ListOptions,
    ) -> RepoResult<ListResult<Artifact>> {
        let task_dir = self.require_task_dir(project_id, task_id)?;
        let artifacts = self
            .load_artifacts(project_id, task_id, &task_dir)?
            .into_iter()
            .map(|stored| stored.artifact)
            .collect();
        Ok(paginate(artifacts, opts))
    }

    fn delete_artifact(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        artifact_id: &str,
    ) -> RepoResult<()> {
        let (task_dir, stored) = self.find_artifact(project_id, task_id, artifact_id)?;
        let path = task_dir.join(ARTIFACTS_DIR).join(&stored.file_name);
        fs::remove_file(&path).map_err(|err| StorageError::io("remove artifact file", &path, err))?;
        Ok(())
    }
}

fn ensure_project_id(id: &ProjectId) -> RepoResult<()> {
    if id.is_valid() {
        Ok(())
    } else {
        Err(RepoError::InvalidProjectId(id.as_str().to_string()))
    }
}

fn ensure_task_id(id: &TaskId) -> RepoResult<()> {
    if id.is_valid() {
        Ok(())
    } else {
        Err(RepoError::InvalidTaskId(id.as_str().to_string()))
    }
}

fn path_exists(path: &Path) -> RepoResult<bool> {
    path.try_exists()
        .map_err(|err| StorageError::io("stat", path, err).into())
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Names of the visible subdirectories of `dir`, sorted.
fn list_dir_names(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with('.') {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Reads and decodes a JSON file; a missing file is `Ok(None)`.
fn read_json<T: DeserializeOwned>(path: &Path) -> RepoResult<Option<T>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StorageError::io("read metadata", path, err).into()),
    };
    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|err| StorageError::json("decode metadata", path, err).into())
}

fn encode_json<T: Serialize>(path: &Path, value: &T) -> RepoResult<Vec<u8>> {
    serde_json::to_vec_pretty(value)
        .map_err(|err| StorageError::json("encode metadata", path, err).into())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RepoResult<()> {
    let data = encode_json(path, value)?;
    fs::write(path, data).map_err(|err| StorageError::io("write metadata", path, err).into())
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> RepoResult<()> {
    let data = encode_json(path, value)?;
    write_bytes_atomic(path, &data)
}

/// Writes to a sibling staging file, then renames it over `path`.
fn write_bytes_atomic(path: &Path, data: &[u8]) -> RepoResult<()> {
    let final_name = file_name_lossy(path);
    let staged = path.with_file_name(staging_file_name(&final_name));
    fs::write(&staged, data).map_err(|err| StorageError::io("write", &staged, err))?;
    if let Err(err) = fs::rename(&staged, path) {
        if let Err(cleanup) = fs::remove_file(&staged) {
            warn!(
                "event=atomic_write module=store status=cleanup_failed file={} error={}",
                staged.display(),
                cleanup
            );
        }
        return Err(StorageError::io("replace", path, err).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{write_bytes_atomic, FsTaskRepository};
    use crate::clock::ManualClock;
    use crate::model::{Project, ProjectId, Task, TaskId, TaskStatus};
    use crate::repo::task_repo::{RepoError, TaskRepository};
    use chrono::{Duration, TimeZone, Utc};
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn repo() -> (TempDir, FsTaskRepository) {
        let dir = TempDir::new().unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::with_step(start, Duration::seconds(1)));
        let repo = FsTaskRepository::open_with_clock(dir.path(), clock).unwrap();
        (dir, repo)
    }

    #[test]
    fn invalid_ids_are_rejected_before_touching_disk() {
        let (dir, repo) = repo();
        let err = repo.delete_project(&ProjectId::new("///")).unwrap_err();
        assert!(matches!(err, RepoError::InvalidProjectId(_)));
        assert!(dir.path().exists());

        repo.create_project(&Project::new(ProjectId::new("demo"), "Demo"))
            .unwrap();
        let err = repo
            .get_task(&ProjectId::new("demo"), &TaskId::new("--"))
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidTaskId(_)));
    }

    #[test]
    fn directory_status_wins_over_stale_metadata() {
        let (dir, repo) = repo();
        let project = ProjectId::new("demo");
        repo.create_project(&Project::new(project.clone(), "Demo"))
            .unwrap();
        repo.create_task(&Task::new(project.clone(), TaskId::new("bug-1"), "Bug"))
            .unwrap();

        // Simulate a crash between directory rename and metadata promotion.
        fs::rename(
            dir.path().join("demo/[open]-bug-1"),
            dir.path().join("demo/[completed]-bug-1"),
        )
        .unwrap();

        let task = repo.get_task(&project, &TaskId::new("bug-1")).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    fn staged_files(task_dir: &Path) -> Vec<String> {
        fs::read_dir(task_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn occupied_target_is_rejected_before_staging() {
        let (dir, repo) = repo();
        let project = ProjectId::new("demo");
        repo.create_project(&Project::new(project.clone(), "Demo"))
            .unwrap();
        let task = Task::new(project.clone(), TaskId::new("bug-1"), "Bug");
        repo.create_task(&task).unwrap();

        fs::write(dir.path().join("demo/[completed]-bug-1"), b"squatter").unwrap();

        let mut changed = repo.get_task(&project, &task.id).unwrap();
        changed.status = TaskStatus::Completed;
        let err = repo.update_task(&changed).unwrap_err();
        assert!(matches!(err, RepoError::Storage(_)));
        assert!(staged_files(&dir.path().join("demo/[open]-bug-1")).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn failed_rename_removes_staged_metadata_and_keeps_task_json() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, repo) = repo();
        let project = ProjectId::new("demo");
        repo.create_project(&Project::new(project.clone(), "Demo"))
            .unwrap();
        let task = Task::new(project.clone(), TaskId::new("bug-1"), "Bug");
        repo.create_task(&task).unwrap();

        let project_dir = dir.path().join("demo");
        let task_dir = project_dir.join("[open]-bug-1");
        let metadata_before = fs::read(task_dir.join("task.json")).unwrap();

        // Renaming an entry needs write access to its parent directory.
        fs::set_permissions(&project_dir, fs::Permissions::from_mode(0o555)).unwrap();
        if fs::write(project_dir.join("write-check"), b"").is_ok() {
            // Permission bits are not enforced for this user (root).
            fs::remove_file(project_dir.join("write-check")).unwrap();
            fs::set_permissions(&project_dir, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut changed = repo.get_task(&project, &task.id).unwrap();
        changed.status = TaskStatus::Completed;
        changed.name = "Renamed".to_string();
        let result = repo.update_task(&changed);

        fs::set_permissions(&project_dir, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(RepoError::Storage(_))));
        assert!(task_dir.is_dir());
        assert!(!project_dir.join("[completed]-bug-1").exists());
        assert_eq!(fs::read(task_dir.join("task.json")).unwrap(), metadata_before);
        let leftovers = staged_files(&task_dir);
        assert!(leftovers.is_empty(), "staged files left behind: {leftovers:?}");

        let reloaded = repo.get_task(&project, &task.id).unwrap();
        assert_eq!(reloaded.status, TaskStatus::Open);
        assert_eq!(reloaded.name, "Bug");
    }

    #[test]
    fn atomic_write_over_directory_fails_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("note.1.md");
        fs::create_dir_all(target.join("occupied")).unwrap();

        let err = write_bytes_atomic(&target, b"body").unwrap_err();
        assert!(matches!(err, RepoError::Storage(_)));
        assert!(target.join("occupied").is_dir());
        assert!(staged_files(dir.path()).is_empty());
    }

    #[test]
    fn first_match_wins_for_duplicate_task_directories() {
        let (dir, repo) = repo();
        let project = ProjectId::new("demo");
        repo.create_project(&Project::new(project.clone(), "Demo"))
            .unwrap();
        fs::create_dir_all(dir.path().join("demo/[archived]-dup")).unwrap();
        fs::create_dir_all(dir.path().join("demo/[open]-dup")).unwrap();

        let task = repo.get_task(&project, &TaskId::new("dup")).unwrap();
        assert_eq!(task.status, TaskStatus::Archived);
    }
}
