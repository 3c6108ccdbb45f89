//! Slice-based limit/offset windowing shared by every list operation.
//!
//! # Invariants
//! - `total` is always the length before windowing.
//! - `offset + items.len() <= total`, and `has_more` is true iff
//!   `offset + items.len() < total`.

use crate::repo::task_repo::{ListOptions, ListResult};

/// Page size applied when a caller passes `limit == 0`.
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Windows an already sorted list according to `opts`.
pub fn paginate<T>(items: Vec<T>, opts: &ListOptions) -> ListResult<T> {
    let total = items.len();
    let limit = if opts.limit == 0 {
        DEFAULT_LIST_LIMIT
    } else {
        opts.limit
    };
    let offset = opts.offset;

    if offset >= total {
        return ListResult {
            items: Vec::new(),
            total,
            limit,
            offset,
            has_more: false,
        };
    }

    let remaining = total - offset;
    let has_more = remaining > limit;
    let items = items.into_iter().skip(offset).take(limit).collect();

    ListResult {
        items,
        total,
        limit,
        offset,
        has_more,
    }
}
