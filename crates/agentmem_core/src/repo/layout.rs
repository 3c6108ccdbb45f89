//! Directory layout and name grammar of the filesystem store.
//!
//! ```text
//! <base>/<project-id>/project.json
//! <base>/<project-id>/[<status>]-<task-id>/task.json
//! <base>/<project-id>/[<status>]-<task-id>/artifacts/<type>.<unix-seconds>.md
//! ```
//!
//! # Invariants
//! - A task directory without a `[status]-` prefix is a legacy entry whose
//!   whole name is the task id and whose implicit status is `open`.

use crate::model::TaskStatus;
use once_cell::sync::Lazy;
use regex::Regex;

pub const PROJECT_METADATA_FILE: &str = "project.json";
pub const TASK_METADATA_FILE: &str = "task.json";
pub const ARTIFACTS_DIR: &str = "artifacts";
pub const ARTIFACT_EXTENSION: &str = ".md";

static TASK_DIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[([a-z_]+)\]-(.+)$").expect("valid task dir regex"));

/// Decoded task directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDirName<'a> {
    /// Raw status prefix; `None` for legacy directories.
    pub status: Option<&'a str>,
    pub task_id: &'a str,
}

impl TaskDirName<'_> {
    /// Status implied by the name. Legacy and unknown prefixes read as `Open`.
    pub fn implied_status(&self) -> TaskStatus {
        self.status
            .and_then(TaskStatus::parse)
            .unwrap_or(TaskStatus::Open)
    }

    /// Known status carried by the prefix, if any.
    pub fn prefixed_status(&self) -> Option<TaskStatus> {
        self.status.and_then(TaskStatus::parse)
    }
}

/// Splits `[status]-id` (or a bare legacy id) into its parts.
pub fn parse_task_dir_name(name: &str) -> TaskDirName<'_> {
    match TASK_DIR_RE.captures(name) {
        Some(captures) => {
            let status = captures.get(1).map(|m| m.as_str());
            let task_id = captures.get(2).map_or(name, |m| m.as_str());
            TaskDirName { status, task_id }
        }
        None => TaskDirName {
            status: None,
            task_id: name,
        },
    }
}

/// Splits `<type>.<unix-seconds>.md` into type name and seconds.
///
/// Returns `None` when the name lacks the extension, has fewer than two
/// dot-separated parts, or the second part is not an integer.
pub fn parse_artifact_file_name(name: &str) -> Option<(&str, i64)> {
    let stem = name.strip_suffix(ARTIFACT_EXTENSION)?;
    let mut parts = stem.split('.');
    let kind = parts.next()?;
    let seconds = parts.next()?.parse::<i64>().ok()?;
    Some((kind, seconds))
}

/// Names used for files staged next to their final location.
pub fn staging_file_name(final_name: &str) -> String {
    format!(".{final_name}.{}.tmp", uuid::Uuid::new_v4().simple())
}
