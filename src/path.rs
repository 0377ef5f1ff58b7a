//! Folder path handling shared by the catalog and the directory.
//!
//! A normalized path has exactly one leading `/`, no empty segments, no
//! trailing `/` (except the root itself) and never a `..` segment.

use sha2::{Digest, Sha256};

use crate::{Result, StorageError};

pub const ROOT: &str = "/";

/// Trims the whole input once; spaces inside a segment are kept.
/// Segments that are empty or only whitespace are dropped.
pub fn normalize(path: &str) -> Result<String> {
    let mut parts = Vec::new();
    for segment in path.trim().split('/').filter(|s| !s.trim().is_empty()) {
        if segment.trim() == ".." {
            return Err(StorageError::InvalidArgument(format!(
                "path may not contain '..': {}",
                path
            )));
        }
        parts.push(segment);
    }
    let joined = format!("/{}", parts.join("/"));
    Ok(joined.trim_end().to_string())
}

pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Joins a normalized parent with a single child name.
pub fn join(parent: &str, name: &str) -> String {
    if is_root(parent) {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// True when `path` is `ancestor` or lies somewhere beneath it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if is_root(ancestor) {
        return true;
    }
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// Stable identifier for a normalized folder path.
pub fn folder_id(normalized: &str) -> String {
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_messy_paths() {
        assert_eq!(normalize("").unwrap(), "/");
        assert_eq!(normalize("  docs ").unwrap(), "/docs");
        assert_eq!(normalize("//a///b/").unwrap(), "/a/b");
        assert_eq!(normalize("/").unwrap(), "/");
    }

    #[test]
    fn keeps_spaces_inside_segments() {
        assert_eq!(normalize("/a /b").unwrap(), "/a /b");
        assert_eq!(normalize(" /My Docs/ ").unwrap(), "/My Docs");
        assert_eq!(normalize("/a/  /b").unwrap(), "/a/b");
        assert_eq!(normalize("/a/b /  ").unwrap(), "/a/b");
    }

    #[test]
    fn rejects_parent_segments() {
        assert!(normalize("/a/../b").is_err());
        assert!(normalize("..").is_err());
        // only whole segments count
        assert_eq!(normalize("/a..b").unwrap(), "/a..b");
    }

    #[test]
    fn join_handles_root() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }

    #[test]
    fn within_respects_segment_boundaries() {
        assert!(is_within("/a/b", "/a"));
        assert!(is_within("/a", "/a"));
        assert!(!is_within("/ab", "/a"));
        assert!(is_within("/anything", "/"));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(path in "[a-z/ .]{0,40}") {
            if let Ok(once) = normalize(&path) {
                prop_assert_eq!(normalize(&once).unwrap(), once);
            }
        }

        #[test]
        fn dotdot_is_always_rejected(prefix in "[a-z/]{0,10}", suffix in "[a-z/]{0,10}") {
            let path = format!("{}/../{}", prefix, suffix);
            prop_assert!(normalize(&path).is_err());
        }
    }
}
