//! Markdown artifact file codec.
//!
//! # Responsibility
//! - Render an artifact as frontmatter plus verbatim body.
//! - Parse a stored file back into an artifact, taking type and time from
//!   the file name.
//!
//! # Invariants
//! - Body grammar: `---\n` + `key: value\n`* + `---\n\n` + content.
//! - Metadata renders as a nested `metadata:` block with sorted keys.
//! - Frontmatter values never contain line breaks.

use crate::model::{Artifact, ArtifactType, Metadata, ProjectId, TaskId};
use crate::repo::layout::parse_artifact_file_name;
use chrono::{SecondsFormat, TimeZone, Utc};

const FRONTMATTER_DELIMITER: &str = "---\n";
const FRONTMATTER_CLOSE: &str = "\n---\n";
const METADATA_KEY: &str = "metadata:";
const METADATA_INDENT: &str = "  ";

/// Artifact read back from disk, plus identity fields the read model drops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredArtifact {
    pub artifact: Artifact,
    /// Id recorded in the frontmatter at creation time, when present.
    pub recorded_id: Option<String>,
    pub file_name: String,
}

impl StoredArtifact {
    /// Whether `id` names this artifact, by listed id or recorded id.
    pub fn matches_id(&self, id: &str) -> bool {
        self.artifact.id == id || self.recorded_id.as_deref() == Some(id)
    }
}

/// Renders the on-disk representation of `artifact`.
pub fn render_artifact(artifact: &Artifact) -> String {
    let mut out = String::with_capacity(artifact.content.len() + 256);
    out.push_str(FRONTMATTER_DELIMITER);
    push_field(&mut out, "", "id", &artifact.id);
    push_field(&mut out, "", "project_id", artifact.project_id.as_str());
    push_field(&mut out, "", "task_id", artifact.task_id.as_str());
    push_field(&mut out, "", "type", artifact.kind.as_str());
    push_field(
        &mut out,
        "",
        "created_at",
        &artifact
            .created_at
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
    );

    if !artifact.metadata.is_empty() {
        out.push_str(METADATA_KEY);
        out.push('\n');
        for (key, value) in &artifact.metadata {
            push_field(&mut out, METADATA_INDENT, key, value);
        }
    }

    out.push_str(FRONTMATTER_DELIMITER);
    out.push('\n');
    out.push_str(&artifact.content);
    out
}

fn push_field(out: &mut String, indent: &str, key: &str, value: &str) {
    out.push_str(indent);
    out.push_str(&single_line(key));
    out.push_str(": ");
    out.push_str(&single_line(value));
    out.push('\n');
}

fn single_line(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

/// Parses a stored artifact file.
///
/// Returns `None` when the file name does not follow
/// `<type>.<unix-seconds>.md`. The listed id is the seconds part of the name.
pub fn parse_artifact(
    project_id: &ProjectId,
    task_id: &TaskId,
    file_name: &str,
    text: &str,
) -> Option<StoredArtifact> {
    let (kind, seconds) = parse_artifact_file_name(file_name)?;
    let created_at = Utc.timestamp_opt(seconds, 0).single()?;
    let (frontmatter, content) = split_frontmatter(text);
    let header = frontmatter.map(parse_frontmatter).unwrap_or_default();

    Some(StoredArtifact {
        artifact: Artifact {
            id: seconds.to_string(),
            project_id: project_id.clone(),
            task_id: task_id.clone(),
            kind: ArtifactType::parse(kind),
            content,
            metadata: header.metadata,
            created_at,
        },
        recorded_id: header.id,
        file_name: file_name.to_string(),
    })
}

/// Splits `text` into the raw frontmatter block and the trimmed body.
///
/// Files without a well-formed frontmatter are returned whole as the body.
fn split_frontmatter(text: &str) -> (Option<&str>, String) {
    let Some(rest) = text.strip_prefix(FRONTMATTER_DELIMITER) else {
        return (None, text.to_string());
    };

    if let Some(body) = rest.strip_prefix(FRONTMATTER_DELIMITER) {
        return (Some(""), body.trim().to_string());
    }

    match rest.find(FRONTMATTER_CLOSE) {
        Some(end) => {
            let header = &rest[..end];
            let body = &rest[end + FRONTMATTER_CLOSE.len()..];
            (Some(header), body.trim().to_string())
        }
        None => (None, text.to_string()),
    }
}

#[derive(Debug, Default)]
struct Frontmatter {
    id: Option<String>,
    metadata: Metadata,
}

fn parse_frontmatter(block: &str) -> Frontmatter {
    let mut header = Frontmatter::default();
    let mut in_metadata = false;

    for line in block.lines() {
        if in_metadata {
            if let Some(entry) = line.strip_prefix(METADATA_INDENT) {
                if let Some((key, value)) = split_field(entry) {
                    header.metadata.insert(key.to_string(), value.to_string());
                }
                continue;
            }
            in_metadata = false;
        }

        if line.trim_end() == METADATA_KEY {
            in_metadata = true;
            continue;
        }

        if let Some(("id", value)) = split_field(line) {
            header.id = Some(value.to_string());
        }
    }

    header
}

/// Splits `key: value`; a bare `key:` has an empty value.
fn split_field(line: &str) -> Option<(&str, &str)> {
    line.split_once(": ")
        .or_else(|| line.strip_suffix(':').map(|key| (key, "")))
}

/// Whether `key` can be written as a frontmatter key and read back unchanged.
pub fn is_valid_metadata_key(key: &str) -> bool {
    !key.is_empty()
        && key.trim() == key
        && !key.chars().any(|ch| ch == ':' || ch == '\n' || ch == '\r')
}
