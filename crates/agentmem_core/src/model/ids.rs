//! Slug identifiers for projects and tasks.
//!
//! # Responsibility
//! - Normalize arbitrary user input into filesystem-safe slugs.
//! - Keep normalization and validity as two separate, pure steps.
//!
//! # Invariants
//! - `normalize` never fails and is idempotent.
//! - A valid slug only contains `[a-z0-9-]` and never starts or ends with `-`,
//!   so it is always safe to use as a single path component.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static DISALLOWED_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9-]").expect("slug character class must compile"));
static DASH_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-+").expect("dash run pattern must compile"));
static VALID_SLUG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$|^[a-z0-9]$").expect("slug pattern must compile")
});

/// Normalizes raw input into slug form.
///
/// Lowercases, trims, replaces every character outside `[a-z0-9-]` with `-`,
/// collapses dash runs and strips leading/trailing dashes. The result may be
/// empty; check [`is_valid`] before using it.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let replaced = DISALLOWED_CHARS.replace_all(&lowered, "-");
    let collapsed = DASH_RUNS.replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Returns whether `slug` is a usable identifier.
pub fn is_valid(slug: &str) -> bool {
    !slug.is_empty() && VALID_SLUG.is_match(slug)
}

macro_rules! slug_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Builds an identifier from raw input via [`normalize`].
            pub fn new(raw: &str) -> Self {
                Self(normalize(raw))
            }

            /// Wraps a string that is already in its stored form (directory
            /// names, persisted JSON) without normalizing it again.
            pub(crate) fn from_stored(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_valid(&self) -> bool {
                is_valid(&self.0)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

slug_id!(
    /// Project identifier; one directory under the store base path.
    ProjectId
);

slug_id!(
    /// Task identifier, unique within its project across all statuses.
    TaskId
);
