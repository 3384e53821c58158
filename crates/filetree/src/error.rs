// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur in tree operations.
///
/// Errors are `Clone` so that every caller awaiting a shared directory read
/// observes the same failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Setting {0} is prohibited")]
    ReservedProperty(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a branch: {0}")]
    NotABranch(String),

    #[error("Cannot move {node} into {target}: target is the node or one of its descendants")]
    MoveIntoSelf { node: String, target: String },

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Node is not attached to a tree: {0}")]
    Detached(String),

    #[error("No storage configured for this tree")]
    NoStorage,

    #[error("Invalid storage: {0}")]
    InvalidStorage(String),

    #[error("Remote {op} failed for {path}: {message}")]
    Remote {
        op: String,
        path: String,
        message: String,
    },
}

impl Error {
    pub fn validation<S: AsRef<str>>(msg: S) -> Self {
        Error::Validation(msg.as_ref().into())
    }

    pub fn reserved_property<S: AsRef<str>>(key: S) -> Self {
        Error::ReservedProperty(key.as_ref().into())
    }

    pub fn already_exists<S: AsRef<str>>(path: S) -> Self {
        Error::AlreadyExists(path.as_ref().into())
    }

    pub fn not_a_branch<S: AsRef<str>>(path: S) -> Self {
        Error::NotABranch(path.as_ref().into())
    }

    pub fn move_into_self<S: AsRef<str>, T: AsRef<str>>(node: S, target: T) -> Self {
        Error::MoveIntoSelf {
            node: node.as_ref().into(),
            target: target.as_ref().into(),
        }
    }

    pub fn not_found<S: AsRef<str>>(path: S) -> Self {
        Error::NotFound(path.as_ref().into())
    }

    pub fn detached<S: AsRef<str>>(path: S) -> Self {
        Error::Detached(path.as_ref().into())
    }

    pub fn invalid_storage<S: AsRef<str>>(msg: S) -> Self {
        Error::InvalidStorage(msg.as_ref().into())
    }

    /// Used by storage implementations to report a rejected operation
    pub fn remote<O, P, M>(op: O, path: P, message: M) -> Self
    where
        O: AsRef<str>,
        P: AsRef<str>,
        M: std::fmt::Display,
    {
        Error::Remote {
            op: op.as_ref().into(),
            path: path.as_ref().into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::ReservedProperty(_) | Error::InvalidStorage(_)
        )
    }

    /// Duplicate names, moves into self or a descendant, and leaf targets.
    #[must_use]
    pub fn is_structural_conflict(&self) -> bool {
        matches!(
            self,
            Error::AlreadyExists(_) | Error::NotABranch(_) | Error::MoveIntoSelf { .. }
        )
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Error::Remote { .. })
    }
}
