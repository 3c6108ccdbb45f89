//! Substring search over artifact content.
//!
//! # Responsibility
//! - Enumerate the requested project/task scope through repository list
//!   operations and collect artifacts whose content contains the query.
//!
//! # Invariants
//! - Matching is case-insensitive on both sides.
//! - Hits are collected across the whole scope before a single pagination
//!   pass; cost is linear in the number of artifacts scanned.
//! - A task filter only narrows the scan when a project filter is also given.

use crate::model::{Artifact, ProjectId, TaskId};
use crate::repo::pagination::paginate;
use crate::repo::task_repo::{ListOptions, ListResult, RepoResult, TaskRepository};
use log::debug;

/// Searches artifact content in the given scope.
///
/// Per-project and per-task listing failures are skipped so one unreadable
/// corner of the tree does not hide the rest of the results. Failing to list
/// the projects themselves is returned as an error.
pub fn search_artifacts<R: TaskRepository + ?Sized>(
    repo: &R,
    query: &str,
    project_id: Option<&ProjectId>,
    task_id: Option<&TaskId>,
    opts: &ListOptions,
) -> RepoResult<ListResult<Artifact>> {
    let needle = query.to_lowercase();
    let everything = ListOptions::all();

    let project_ids = match project_id {
        Some(id) => vec![id.clone()],
        None => repo
            .list_projects(&everything)?
            .items
            .into_iter()
            .map(|project| project.id)
            .collect(),
    };

    let mut hits = Vec::new();
    let mut scanned = 0usize;
    for pid in &project_ids {
        let task_ids = match (task_id, project_id) {
            (Some(tid), Some(_)) => vec![tid.clone()],
            _ => match repo.list_tasks(pid, &everything) {
                Ok(page) => page.items.into_iter().map(|task| task.id).collect(),
                Err(err) => {
                    debug!(
                        "event=artifact_search module=search status=skipped project_id={} error={}",
                        pid, err
                    );
                    continue;
                }
            },
        };

        for tid in &task_ids {
            let artifacts = match repo.list_artifacts(pid, tid, &everything) {
                Ok(page) => page.items,
                Err(err) => {
                    debug!(
                        "event=artifact_search module=search status=skipped project_id={} \
                         task_id={} error={}",
                        pid, tid, err
                    );
                    continue;
                }
            };
            scanned += artifacts.len();
            hits.extend(
                artifacts
                    .into_iter()
                    .filter(|artifact| artifact.content.to_lowercase().contains(&needle)),
            );
        }
    }

    debug!(
        "event=artifact_search module=search status=ok projects={} scanned={} hits={}",
        project_ids.len(),
        scanned,
        hits.len()
    );
    Ok(paginate(hits, opts))
}
