//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into request-level APIs.
//! - Keep CLI and other front ends decoupled from storage details.

pub mod task_service;
