// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub basename: String,
    pub is_directory: bool,
}

impl DirEntry {
    pub fn file<S: Into<String>>(basename: S) -> Self {
        Self {
            basename: basename.into(),
            is_directory: false,
        }
    }

    pub fn directory<S: Into<String>>(basename: S) -> Self {
        Self {
            basename: basename.into(),
            is_directory: true,
        }
    }
}

/// Kinds of out-of-band change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchEventKind {
    FileCreated,
    FileRemoved,
    DirectoryCreated,
    DirectoryRemoved,
}

impl WatchEventKind {
    pub const ALL: [WatchEventKind; 4] = [
        WatchEventKind::FileCreated,
        WatchEventKind::FileRemoved,
        WatchEventKind::DirectoryCreated,
        WatchEventKind::DirectoryRemoved,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchEventKind::FileCreated => "file-created",
            WatchEventKind::FileRemoved => "file-removed",
            WatchEventKind::DirectoryCreated => "directory-created",
            WatchEventKind::DirectoryRemoved => "directory-removed",
        }
    }
}

/// A change reported by the storage; `path` is relative to the tree root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: String,
}

impl WatchEvent {
    pub fn new<S: Into<String>>(kind: WatchEventKind, path: S) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

pub type WatchHandler = Rc<dyn Fn(&WatchEvent)>;

/// The remote hierarchical store a tree mirrors.
///
/// All paths are tree paths (`/a/b`, with `""` for the root). Mutating
/// operations report their effect through watch events rather than through
/// their return value.
#[async_trait(?Send)]
pub trait Storage {
    async fn read_directory(&self, path: &str) -> Result<Vec<DirEntry>>;

    async fn create_file(&self, path: &str, contents: &[u8]) -> Result<()>;

    async fn create_directory(&self, path: &str) -> Result<()>;

    async fn remove(&self, path: &str) -> Result<()>;

    async fn move_entry(&self, src: &str, dest: &str) -> Result<()>;

    fn subscribe(&self, kind: WatchEventKind, handler: WatchHandler);

    async fn start_watching(&self, path: &str) -> Result<()>;

    async fn stop_watching(&self, path: &str) -> Result<()>;

    /// Base URL under which leaves are served
    fn project_root_url(&self) -> &str;
}

/// Checks the parts of the contract the type system cannot
pub fn validate_storage(storage: &dyn Storage) -> Result<()> {
    let url = storage.project_root_url();
    if url.is_empty() {
        return Err(Error::invalid_storage("project_root_url must not be empty"));
    }
    _ = url::Url::parse(url)
        .map_err(|e| Error::invalid_storage(format!("project_root_url `{url}`: {e}")))?;
    Ok(())
}
