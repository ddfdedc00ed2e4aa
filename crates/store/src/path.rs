//! Slash-delimited path handling.
//!
//! Paths address nodes in the store's hierarchy: `books/dune`,
//! `comments/dune/c1/comments/c2/likes`. Segments are plain non-empty
//! strings; the empty path addresses the root.

use crate::error::{Result, StoreError};

/// Split a path into validated segments. Rejects empty segments, so
/// `books//dune` and trailing slashes are errors rather than silently
/// collapsing onto a different node.
pub fn segments(path: &str) -> Result<Vec<&str>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    path.split('/')
        .map(|seg| {
            if seg.is_empty() {
                Err(StoreError::InvalidPath(path.to_string()))
            } else {
                Ok(seg)
            }
        })
        .collect()
}

/// Validate a single segment for use in a composed path.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() || segment.contains('/') {
        return Err(StoreError::InvalidPath(segment.to_string()));
    }
    Ok(())
}

/// Append a segment to a base path.
pub fn join(base: &str, segment: &str) -> Result<String> {
    validate_segment(segment)?;
    if base.is_empty() {
        Ok(segment.to_string())
    } else {
        Ok(format!("{base}/{segment}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_splits_and_validates() {
        assert_eq!(segments("books/dune").unwrap(), vec!["books", "dune"]);
        assert_eq!(segments("").unwrap(), Vec::<&str>::new());
        assert!(segments("books//dune").is_err());
        assert!(segments("books/").is_err());
    }

    #[test]
    fn join_rejects_embedded_slashes() {
        assert_eq!(join("books", "dune").unwrap(), "books/dune");
        assert_eq!(join("", "books").unwrap(), "books");
        assert!(join("books", "du/ne").is_err());
        assert!(join("books", "").is_err());
    }
}
