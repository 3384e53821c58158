// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use diagnostics::*;
use filetree::{DirEntry, Error, Result, Storage, WatchEvent, WatchEventKind, WatchHandler};
use tokio::io::AsyncWriteExt;

/// Storage backed by a host directory.
///
/// Tree paths map to paths below `root`. Each mutation made through this
/// storage is reported to subscribers as a watch event once it completes;
/// changes made by other processes are not observed.
#[derive(Clone)]
pub struct HostStorage(Rc<HostInner>);

struct HostInner {
    root: PathBuf,
    url: String,
    latency: Option<Duration>,
    handlers: RefCell<Vec<(WatchEventKind, WatchHandler)>>,
    watched: RefCell<BTreeSet<String>>,
}

impl HostStorage {
    /// `root` must be an existing directory
    pub fn new(root: &Path, latency: Option<Duration>) -> anyhow::Result<Self> {
        let root = std::fs::canonicalize(root)
            .map_err(|e| anyhow::anyhow!("cannot open {}: {e}", root.display()))?;
        if !root.is_dir() {
            anyhow::bail!("{} is not a directory", root.display());
        }
        let url = url::Url::from_directory_path(&root)
            .map_err(|()| anyhow::anyhow!("cannot express {} as a URL", root.display()))?
            .to_string();
        Ok(Self(Rc::new(HostInner {
            root,
            url,
            latency,
            handlers: RefCell::new(Vec::new()),
            watched: RefCell::new(BTreeSet::new()),
        })))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.0.root
    }

    /// Directories for which watching was requested
    #[must_use]
    pub fn watched(&self) -> Vec<String> {
        self.0.watched.borrow().iter().cloned().collect()
    }

    /// Maps a tree path below the root; `..` and `.` segments are refused
    fn host_path(&self, op: &str, tree_path: &str) -> Result<PathBuf> {
        let mut host = self.0.root.clone();
        for part in filetree::path::split(tree_path) {
            if part == ".." || part == "." {
                return Err(Error::remote(op, tree_path, "path escapes the root"));
            }
            host.push(part);
        }
        Ok(host)
    }

    async fn delay(&self) {
        if let Some(latency) = self.0.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn notify(&self, events: &[WatchEvent]) {
        for event in events {
            let handlers: Vec<WatchHandler> = self
                .0
                .handlers
                .borrow()
                .iter()
                .filter(|(kind, _)| *kind == event.kind)
                .map(|(_, handler)| handler.clone())
                .collect();
            for handler in handlers {
                handler(event);
            }
        }
    }
}

fn canonical(tree_path: &str) -> String {
    filetree::path::split(tree_path)
        .iter()
        .fold(String::new(), |acc, part| filetree::path::join(&acc, part))
}

#[async_trait(?Send)]
impl Storage for HostStorage {
    async fn read_directory(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.delay().await;
        let dir = self.host_path("readDirectory", path)?;
        let remote = |e: std::io::Error| Error::remote("readDirectory", path, e);

        let mut reader = tokio::fs::read_dir(&dir).await.map_err(remote)?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await.map_err(remote)? {
            let file_type = entry.file_type().await.map_err(remote)?;
            let Ok(name) = entry.file_name().into_string() else {
                let shown = entry.path().display().to_string();
                warn!("skipping entry with a non UTF-8 name: {shown}", shown: shown);
                continue;
            };
            entries.push(if file_type.is_dir() {
                DirEntry::directory(name)
            } else {
                DirEntry::file(name)
            });
        }
        entries.sort_by(|a, b| a.basename.cmp(&b.basename));
        Ok(entries)
    }

    async fn create_file(&self, path: &str, contents: &[u8]) -> Result<()> {
        self.delay().await;
        let file_path = self.host_path("createFile", path)?;
        let remote = |e: std::io::Error| Error::remote("createFile", path, e);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .await
            .map_err(remote)?;
        file.write_all(contents).await.map_err(remote)?;
        file.flush().await.map_err(remote)?;

        self.notify(&[WatchEvent::new(WatchEventKind::FileCreated, canonical(path))]);
        Ok(())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        self.delay().await;
        let dir = self.host_path("createDirectory", path)?;
        tokio::fs::create_dir(&dir)
            .await
            .map_err(|e| Error::remote("createDirectory", path, e))?;

        self.notify(&[WatchEvent::new(
            WatchEventKind::DirectoryCreated,
            canonical(path),
        )]);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.delay().await;
        let target = self.host_path("remove", path)?;
        if target == self.0.root {
            return Err(Error::remote("remove", path, "cannot remove the root"));
        }
        let remote = |e: std::io::Error| Error::remote("remove", path, e);

        let metadata = tokio::fs::symlink_metadata(&target).await.map_err(remote)?;
        let kind = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&target).await.map_err(remote)?;
            WatchEventKind::DirectoryRemoved
        } else {
            tokio::fs::remove_file(&target).await.map_err(remote)?;
            WatchEventKind::FileRemoved
        };
        let key = canonical(path);
        self.0
            .watched
            .borrow_mut()
            .retain(|watched| *watched != key && !filetree::path::is_within(watched, &key));

        self.notify(&[WatchEvent::new(kind, key)]);
        Ok(())
    }

    async fn move_entry(&self, src: &str, dest: &str) -> Result<()> {
        self.delay().await;
        let from = self.host_path("move", src)?;
        let to = self.host_path("move", dest)?;
        let remote = |e: std::io::Error| Error::remote("move", src, e);

        if to.starts_with(&from) {
            return Err(Error::remote("move", src, format!("cannot move into {dest}")));
        }
        if tokio::fs::try_exists(&to).await.map_err(remote)? {
            return Err(Error::remote("move", dest, "already exists"));
        }
        let metadata = tokio::fs::symlink_metadata(&from).await.map_err(remote)?;
        tokio::fs::rename(&from, &to).await.map_err(remote)?;

        let (src_key, dest_key) = (canonical(src), canonical(dest));
        {
            let mut watched = self.0.watched.borrow_mut();
            *watched = std::mem::take(&mut *watched)
                .into_iter()
                .map(|dir| filetree::path::rebase(&dir, &src_key, &dest_key).unwrap_or(dir))
                .collect();
        }

        let (removed, created) = if metadata.is_dir() {
            (WatchEventKind::DirectoryRemoved, WatchEventKind::DirectoryCreated)
        } else {
            (WatchEventKind::FileRemoved, WatchEventKind::FileCreated)
        };
        self.notify(&[
            WatchEvent::new(removed, src_key),
            WatchEvent::new(created, dest_key),
        ]);
        Ok(())
    }

    fn subscribe(&self, kind: WatchEventKind, handler: WatchHandler) {
        self.0.handlers.borrow_mut().push((kind, handler));
    }

    async fn start_watching(&self, path: &str) -> Result<()> {
        _ = self.host_path("startWatching", path)?;
        let path = canonical(path);
        debug!("watching '{path}'", path: path);
        _ = self.0.watched.borrow_mut().insert(path);
        Ok(())
    }

    async fn stop_watching(&self, path: &str) -> Result<()> {
        _ = self.0.watched.borrow_mut().remove(&canonical(path));
        Ok(())
    }

    fn project_root_url(&self) -> &str {
        &self.0.url
    }
}
