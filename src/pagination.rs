//! OFFSET / LIMIT application.

use tracing::debug;

use crate::ast::{PageWindow, Pagination};
use crate::builder::QueryBuilder;

/// Resolves the window to apply; `None` when no pagination was requested.
pub fn page_window(pagination: Option<&Pagination>, default_limit: u64) -> Option<PageWindow> {
    let window = pagination.map(|p| p.window(default_limit));
    if let Some(w) = &window {
        debug!(offset = w.offset, limit = w.limit, "resolved page window");
    }
    window
}

pub fn apply_pagination<B: QueryBuilder>(builder: B, window: Option<PageWindow>) -> B {
    match window {
        Some(PageWindow { offset, limit }) => builder.paginate(offset, limit),
        None => builder,
    }
}
