//! Page selection: mapping caller page numbers onto document pages.

use crate::error::{ExtractError, Result};

/// Map 1-based page numbers onto 0-based indices for a document with
/// `page_count` pages.
///
/// Order and duplicates are kept exactly as requested. Numbers outside
/// `1..=page_count` are dropped without error.
pub fn resolve_pages(requested: &[u32], page_count: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity(requested.len());
    for &number in requested {
        let number = number as usize;
        if number == 0 || number > page_count {
            log::warn!(
                "Skipping page {}: document has {} page(s)",
                number,
                page_count
            );
            continue;
        }
        indices.push(number - 1);
    }
    indices
}

/// Like [`resolve_pages`], but fails when nothing valid was requested.
pub fn resolve_nonempty(requested: &[u32], page_count: usize) -> Result<Vec<usize>> {
    let indices = resolve_pages(requested, page_count);
    if indices.is_empty() {
        return Err(ExtractError::EmptySelection {
            requested: requested.to_vec(),
            available: page_count,
        });
    }
    Ok(indices)
}
