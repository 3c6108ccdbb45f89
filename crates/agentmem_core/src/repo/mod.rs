//! Repository layer abstractions and the filesystem implementation.
//!
//! # Responsibility
//! - Define the project/task/artifact storage contract.
//! - Keep directory layout, file grammars and rename choreography inside
//!   the persistence boundary.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`*NotFound`, `*AlreadyExists`,
//!   invalid ids) separately from storage failures.
//! - Every list operation is paginated by [`pagination::paginate`].

pub mod artifact_file;
pub mod fs_repo;
pub mod layout;
pub mod pagination;
pub mod task_repo;
