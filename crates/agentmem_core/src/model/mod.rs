//! Domain model for the project/task/artifact hierarchy.
//!
//! # Responsibility
//! - Define the value records persisted by the filesystem store.
//! - Own identifier normalization and the status/type vocabularies.
//!
//! # Invariants
//! - Records are plain data; no model type performs I/O.
//! - Every timestamp is UTC.

pub mod artifact;
pub mod ids;
pub mod project;
pub mod task;

pub use artifact::{Artifact, ArtifactType};
pub use ids::{ProjectId, TaskId};
pub use project::{Metadata, Project};
pub use task::{Task, TaskStatus};
