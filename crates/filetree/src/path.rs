// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Tree paths are POSIX-style strings relative to the tree root.
//!
//! Leading and trailing slashes are insignificant and the empty string
//! denotes the node a lookup starts from.

/// Strips leading and trailing slashes
#[must_use]
pub fn trim(path: &str) -> &str {
    path.trim_matches('/')
}

/// Splits a path into its non-empty segments
#[must_use]
pub fn split(path: &str) -> Vec<String> {
    trim(path)
        .split('/')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// Appends a child name to a node path (`""` + `a` = `/a`)
#[must_use]
pub fn join(parent: &str, name: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), name)
}

/// Extracts the final segment of a path, if any
#[must_use]
pub fn basename(path: &str) -> Option<String> {
    split(path).pop()
}

/// Everything but the final segment, in node path form (`/a/b/c` -> `/a/b`)
#[must_use]
pub fn dirname(path: &str) -> String {
    let mut parts = split(path);
    _ = parts.pop();
    parts.iter().fold(String::new(), |acc, part| join(&acc, part))
}

/// Is `path` strictly below `dir`; both in canonical node path form
#[must_use]
pub fn is_within(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

/// Re-roots `path` from `from` onto `to` when it is `from` or lies below it
#[must_use]
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    if path == from || is_within(path, from) {
        Some(format!("{to}{}", &path[from.len()..]))
    } else {
        None
    }
}
