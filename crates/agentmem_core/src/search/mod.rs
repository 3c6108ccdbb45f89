//! Artifact search entry points.
//!
//! # Responsibility
//! - Expose content search on top of repository list primitives.
//! - Keep scoping and result shaping inside core.
//!
//! There is no index; every search is a full scan of its scope.

pub mod content;

pub use content::search_artifacts;
