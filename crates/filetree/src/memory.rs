// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! In-memory storage.
//!
//! Keeps entries in a BTreeMap keyed by tree path and reports its own
//! mutations as watch events, like a watched directory would. It is mainly a
//! test double: calls are recorded, operations can be made to fail, slowed
//! down or paused, and watch events can be held back and released later.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::path;
use crate::storage::{DirEntry, Storage, WatchEvent, WatchEventKind, WatchHandler};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    File(Vec<u8>),
    Directory,
}

/// A storage call as recorded by `MemoryStorage`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCall {
    pub op: &'static str,
    pub path: String,
}

#[derive(Clone)]
pub struct MemoryStorage(Rc<MemoryInner>);

struct MemoryInner {
    project_root_url: String,
    state: RefCell<MemoryState>,
    paused: watch::Sender<bool>,
}

#[derive(Default)]
struct MemoryState {
    entries: BTreeMap<String, Entry>,
    handlers: Vec<(WatchEventKind, WatchHandler)>,
    hold_events: bool,
    held: Vec<WatchEvent>,
    calls: Vec<StorageCall>,
    failures: BTreeMap<&'static str, String>,
    latency: Option<Duration>,
    watched: BTreeSet<String>,
    active: usize,
    peak_active: usize,
}

/// Marks one call as running for the concurrency counters
struct ActiveCall(MemoryStorage);

impl Drop for ActiveCall {
    fn drop(&mut self) {
        self.0.0.state.borrow_mut().active -= 1;
    }
}

impl MemoryStorage {
    pub fn new<S: Into<String>>(project_root_url: S) -> Self {
        let (paused, _) = watch::channel(false);
        Self(Rc::new(MemoryInner {
            project_root_url: project_root_url.into(),
            state: RefCell::new(MemoryState::default()),
            paused,
        }))
    }

    /// Adds a file, creating missing parent directories. No events.
    pub fn seed_file(&self, file_path: &str, contents: &[u8]) {
        self.seed_directory(&path::dirname(file_path));
        let key = normalize(file_path);
        _ = self
            .0
            .state
            .borrow_mut()
            .entries
            .insert(key, Entry::File(contents.to_vec()));
    }

    /// Adds a directory and any missing parents. No events.
    pub fn seed_directory(&self, dir_path: &str) {
        let mut state = self.0.state.borrow_mut();
        let mut current = String::new();
        for part in path::split(dir_path) {
            current = path::join(&current, &part);
            _ = state
                .entries
                .entry(current.clone())
                .or_insert(Entry::Directory);
        }
    }

    #[must_use]
    pub fn exists(&self, entry_path: &str) -> bool {
        let key = normalize(entry_path);
        key.is_empty() || self.0.state.borrow().entries.contains_key(&key)
    }

    #[must_use]
    pub fn is_directory(&self, entry_path: &str) -> bool {
        let key = normalize(entry_path);
        key.is_empty() || self.0.state.borrow().entries.get(&key) == Some(&Entry::Directory)
    }

    #[must_use]
    pub fn contents(&self, file_path: &str) -> Option<Vec<u8>> {
        match self.0.state.borrow().entries.get(&normalize(file_path)) {
            Some(Entry::File(contents)) => Some(contents.clone()),
            _ => None,
        }
    }

    /// Every call made so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<StorageCall> {
        self.0.state.borrow().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self, op: &str) -> usize {
        self.0
            .state
            .borrow()
            .calls
            .iter()
            .filter(|call| call.op == op)
            .count()
    }

    /// Highest number of calls that were running at the same time
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.0.state.borrow().peak_active
    }

    /// Makes every later call of `op` fail with `message`
    pub fn fail(&self, op: &'static str, message: &str) {
        _ = self
            .0
            .state
            .borrow_mut()
            .failures
            .insert(op, message.to_string());
    }

    pub fn clear_failures(&self) {
        self.0.state.borrow_mut().failures.clear();
    }

    /// Delays every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.0.state.borrow_mut().latency = latency;
    }

    /// Calls started while paused wait until `resume`
    pub fn pause(&self) {
        _ = self.0.paused.send_replace(true);
    }

    pub fn resume(&self) {
        _ = self.0.paused.send_replace(false);
    }

    /// Queues watch events instead of delivering them
    pub fn hold_events(&self) {
        self.0.state.borrow_mut().hold_events = true;
    }

    /// Delivers queued watch events and stops queueing
    pub fn flush_events(&self) {
        let held = {
            let mut state = self.0.state.borrow_mut();
            state.hold_events = false;
            std::mem::take(&mut state.held)
        };
        for event in held {
            self.deliver(&event);
        }
    }

    /// Events currently held back
    #[must_use]
    pub fn held_events(&self) -> Vec<WatchEvent> {
        self.0.state.borrow().held.clone()
    }

    /// Delivers an event as if the change happened outside this storage
    pub fn emit(&self, event: WatchEvent) {
        self.deliver(&event);
    }

    #[must_use]
    pub fn is_watching(&self, dir_path: &str) -> bool {
        self.0.state.borrow().watched.contains(&normalize(dir_path))
    }

    fn deliver(&self, event: &WatchEvent) {
        let handlers: Vec<WatchHandler> = self
            .0
            .state
            .borrow()
            .handlers
            .iter()
            .filter(|(kind, _)| *kind == event.kind)
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }

    fn notify(&self, events: Vec<WatchEvent>) {
        {
            let mut state = self.0.state.borrow_mut();
            if state.hold_events {
                state.held.extend(events);
                return;
            }
        }
        for event in events {
            self.deliver(&event);
        }
    }

    async fn enter(&self, op: &'static str, entry_path: &str) -> Result<ActiveCall> {
        let latency = {
            let mut state = self.0.state.borrow_mut();
            state.calls.push(StorageCall {
                op,
                path: entry_path.to_string(),
            });
            state.active += 1;
            state.peak_active = state.peak_active.max(state.active);
            state.latency
        };
        let call = ActiveCall(self.clone());

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let mut paused = self.0.paused.subscribe();
        _ = paused.wait_for(|paused| !*paused).await;

        let failure = self.0.state.borrow().failures.get(op).cloned();
        match failure {
            Some(message) => Err(Error::remote(op, entry_path, message)),
            None => Ok(call),
        }
    }

    /// Fails unless `dir_path` names an existing directory
    fn require_directory(&self, op: &str, dir_path: &str) -> Result<()> {
        if self.is_directory(dir_path) {
            Ok(())
        } else {
            Err(Error::remote(op, dir_path, "not a directory"))
        }
    }

    fn create(&self, op: &str, entry_path: &str, entry: Entry) -> Result<WatchEvent> {
        let key = normalize(entry_path);
        if key.is_empty() {
            return Err(Error::remote(op, entry_path, "invalid path"));
        }
        self.require_directory(op, &path::dirname(&key))?;
        if self.exists(&key) {
            return Err(Error::remote(op, entry_path, "already exists"));
        }
        let kind = match entry {
            Entry::File(_) => WatchEventKind::FileCreated,
            Entry::Directory => WatchEventKind::DirectoryCreated,
        };
        _ = self.0.state.borrow_mut().entries.insert(key.clone(), entry);
        Ok(WatchEvent::new(kind, key))
    }
}

/// Canonical key form: `""` for the root, `/a/b` otherwise
fn normalize(entry_path: &str) -> String {
    path::split(entry_path)
        .iter()
        .fold(String::new(), |acc, part| path::join(&acc, part))
}

#[async_trait(?Send)]
impl Storage for MemoryStorage {
    async fn read_directory(&self, dir_path: &str) -> Result<Vec<DirEntry>> {
        let _call = self.enter("readDirectory", dir_path).await?;
        self.require_directory("readDirectory", dir_path)?;
        let dir = normalize(dir_path);
        let listing = self
            .0
            .state
            .borrow()
            .entries
            .iter()
            .filter(|(key, _)| path::dirname(key) == dir)
            .filter_map(|(key, entry)| {
                let name = path::basename(key)?;
                Some(match entry {
                    Entry::Directory => DirEntry::directory(name),
                    Entry::File(_) => DirEntry::file(name),
                })
            })
            .collect();
        Ok(listing)
    }

    async fn create_file(&self, file_path: &str, contents: &[u8]) -> Result<()> {
        let _call = self.enter("createFile", file_path).await?;
        let event = self.create("createFile", file_path, Entry::File(contents.to_vec()))?;
        self.notify(vec![event]);
        Ok(())
    }

    async fn create_directory(&self, dir_path: &str) -> Result<()> {
        let _call = self.enter("createDirectory", dir_path).await?;
        let event = self.create("createDirectory", dir_path, Entry::Directory)?;
        self.notify(vec![event]);
        Ok(())
    }

    async fn remove(&self, entry_path: &str) -> Result<()> {
        let _call = self.enter("remove", entry_path).await?;
        let key = normalize(entry_path);
        let event = {
            let mut state = self.0.state.borrow_mut();
            let entry = state
                .entries
                .remove(&key)
                .ok_or_else(|| Error::remote("remove", entry_path, "no such entry"))?;
            state.entries.retain(|other, _| !path::is_within(other, &key));
            state
                .watched
                .retain(|watched| *watched != key && !path::is_within(watched, &key));
            let kind = match entry {
                Entry::File(_) => WatchEventKind::FileRemoved,
                Entry::Directory => WatchEventKind::DirectoryRemoved,
            };
            WatchEvent::new(kind, key)
        };
        self.notify(vec![event]);
        Ok(())
    }

    async fn move_entry(&self, src: &str, dest: &str) -> Result<()> {
        let _call = self.enter("move", src).await?;
        let src_key = normalize(src);
        let dest_key = normalize(dest);
        if src_key.is_empty() || dest_key.is_empty() {
            return Err(Error::remote("move", src, "invalid path"));
        }
        if dest_key == src_key || path::is_within(&dest_key, &src_key) {
            return Err(Error::remote("move", src, format!("cannot move into {dest}")));
        }
        self.require_directory("move", &path::dirname(&dest_key))?;
        if self.exists(&dest_key) {
            return Err(Error::remote("move", dest, "already exists"));
        }

        let events = {
            let mut state = self.0.state.borrow_mut();
            let entry = state
                .entries
                .remove(&src_key)
                .ok_or_else(|| Error::remote("move", src, "no such entry"))?;
            let nested: Vec<String> = state
                .entries
                .keys()
                .filter(|key| path::is_within(key, &src_key))
                .cloned()
                .collect();
            for key in nested {
                if let Some(moved) = state.entries.remove(&key) {
                    let renamed = format!("{dest_key}{}", &key[src_key.len()..]);
                    _ = state.entries.insert(renamed, moved);
                }
            }
            let (removed, created) = match entry {
                Entry::File(_) => (WatchEventKind::FileRemoved, WatchEventKind::FileCreated),
                Entry::Directory => (
                    WatchEventKind::DirectoryRemoved,
                    WatchEventKind::DirectoryCreated,
                ),
            };
            _ = state.entries.insert(dest_key.clone(), entry);
            state.watched = std::mem::take(&mut state.watched)
                .into_iter()
                .map(|watched| path::rebase(&watched, &src_key, &dest_key).unwrap_or(watched))
                .collect();
            vec![
                WatchEvent::new(removed, src_key),
                WatchEvent::new(created, dest_key),
            ]
        };
        self.notify(events);
        Ok(())
    }

    fn subscribe(&self, kind: WatchEventKind, handler: WatchHandler) {
        self.0.state.borrow_mut().handlers.push((kind, handler));
    }

    async fn start_watching(&self, dir_path: &str) -> Result<()> {
        let _call = self.enter("startWatching", dir_path).await?;
        self.require_directory("startWatching", dir_path)?;
        _ = self.0.state.borrow_mut().watched.insert(normalize(dir_path));
        Ok(())
    }

    async fn stop_watching(&self, dir_path: &str) -> Result<()> {
        let _call = self.enter("stopWatching", dir_path).await?;
        _ = self.0.state.borrow_mut().watched.remove(&normalize(dir_path));
        Ok(())
    }

    fn project_root_url(&self) -> &str {
        &self.0.project_root_url
    }
}
