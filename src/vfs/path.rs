// src/vfs/path.rs

//! Path handling for the virtual file system.
//!
//! All paths stored in the VFS are absolute and use `/` as separator. Trie
//! nodes are keyed by *relative* paths (one or more segments below their
//! parent), so most of the work here is segment-wise comparison that honours
//! the hierarchy's [`CaseSensitivity`].

use std::cmp::Ordering;

use crate::types::CaseSensitivity;

pub const SEPARATOR: char = '/';

/// A suffix of an absolute path, relative to some node of a hierarchy.
///
/// Borrowing the original absolute string keeps descent through the trie
/// allocation free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsRelativePath<'a> {
    absolute: &'a str,
    offset: usize,
}

impl<'a> VfsRelativePath<'a> {
    /// The given absolute path relative to the file-system root.
    ///
    /// Leading and trailing separators are ignored, so `/a/b/` and `/a/b`
    /// address the same node.
    pub fn of(absolute: &'a str) -> Self {
        let trimmed = absolute.trim_end_matches(SEPARATOR);
        let offset = trimmed.len() - trimmed.trim_start_matches(SEPARATOR).len();
        Self {
            absolute: trimmed,
            offset,
        }
    }

    /// The remaining relative part, e.g. `b/c` for `/a/b/c` below `/a`.
    pub fn as_str(&self) -> &'a str {
        &self.absolute[self.offset..]
    }

    /// The full absolute path this relative path was derived from.
    pub fn absolute_path(&self) -> &'a str {
        self.absolute
    }

    pub fn is_empty(&self) -> bool {
        self.offset >= self.absolute.len()
    }

    pub fn len(&self) -> usize {
        self.absolute.len() - self.offset
    }

    pub fn first_segment(&self) -> &'a str {
        first_segment(self.as_str())
    }

    /// Drop the first `len` bytes and the separator following them.
    pub fn suffix_after(&self, len: usize) -> Self {
        let mut offset = (self.offset + len).min(self.absolute.len());
        if self.absolute[offset..].starts_with(SEPARATOR) {
            offset += 1;
        }
        Self {
            absolute: self.absolute,
            offset,
        }
    }
}

pub fn first_segment(path: &str) -> &str {
    match path.find(SEPARATOR) {
        Some(idx) => &path[..idx],
        None => path,
    }
}

/// Last segment of an absolute path (`""` for the root).
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Join a child name onto an absolute parent path.
pub fn join(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches(SEPARATOR);
    let mut out = String::with_capacity(parent.len() + name.len() + 1);
    out.push_str(parent);
    out.push(SEPARATOR);
    out.push_str(name);
    out
}

/// Normalize a platform path string into the VFS form (`/`-separated, no
/// trailing separator).
pub fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let trimmed = replaced.trim_end_matches(SEPARATOR);
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Ordering used to find siblings: two segments that compare `Equal` are the
/// same entry.
pub fn compare_segments(a: &str, b: &str, case_sensitivity: CaseSensitivity) -> Ordering {
    match case_sensitivity {
        CaseSensitivity::CaseSensitive => a.cmp(b),
        CaseSensitivity::CaseInsensitive => a
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase)),
    }
}

pub fn segments_equal(a: &str, b: &str, case_sensitivity: CaseSensitivity) -> bool {
    compare_segments(a, b, case_sensitivity) == Ordering::Equal
}

/// Total order for sorting names of directory children.
///
/// Case-insensitive hierarchies fold case first and break ties bytewise, so
/// sorting is deterministic even when a case-sensitive disk holds both `A`
/// and `a`.
pub fn compare_names(a: &str, b: &str, case_sensitivity: CaseSensitivity) -> Ordering {
    compare_segments(a, b, case_sensitivity).then_with(|| a.cmp(b))
}

/// Longest common prefix of `key` and `path` that ends on a segment boundary.
///
/// Returns the prefix length measured in bytes of `key` and of `path`
/// (they differ only when case folding changes byte lengths).
pub fn common_prefix(
    key: &str,
    path: &str,
    case_sensitivity: CaseSensitivity,
) -> (usize, usize) {
    let mut key_segments = key.split(SEPARATOR);
    let mut path_segments = path.split(SEPARATOR);
    let (mut key_pos, mut path_pos) = (0, 0);
    let mut matched = (0, 0);

    while let (Some(k), Some(p)) = (key_segments.next(), path_segments.next()) {
        if k.is_empty() || !segments_equal(k, p, case_sensitivity) {
            break;
        }
        key_pos += k.len();
        path_pos += p.len();
        matched = (key_pos, path_pos);
        key_pos += 1;
        path_pos += 1;
    }

    matched
}

/// Whether `ancestor` is `path` itself or one of its ancestors.
pub fn is_same_or_ancestor(
    ancestor: &str,
    path: &str,
    case_sensitivity: CaseSensitivity,
) -> bool {
    let ancestor = VfsRelativePath::of(ancestor);
    let path = VfsRelativePath::of(path);
    if ancestor.is_empty() {
        return true;
    }
    let (in_ancestor, _) = common_prefix(ancestor.as_str(), path.as_str(), case_sensitivity);
    in_ancestor == ancestor.len()
}
