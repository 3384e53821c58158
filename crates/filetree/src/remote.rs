// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Operations that go through the tree's storage.
//!
//! Under the default watch-driven policy the structural operations here only
//! call the storage; the tree changes when the corresponding watch event is
//! reconciled. Under the optimistic policy the change is also applied locally
//! once the storage call succeeds, with primitives that make the later watch
//! event a no-op.

use std::rc::Rc;

use diagnostics::*;
use futures::future::{self, FutureExt, LocalBoxFuture, Shared};

use crate::config::MutationPolicy;
use crate::error::{Error, Result};
use crate::node::{Node, NodeKind, Properties, Status};
use crate::path;
use crate::storage::{DirEntry, Storage};

/// A directory read that any number of callers may await
pub type ReadFuture = Shared<LocalBoxFuture<'static, Result<()>>>;

fn ready(result: Result<()>) -> ReadFuture {
    future::ready(result).boxed_local().shared()
}

impl Node {
    pub(crate) fn storage(&self) -> Result<Rc<dyn Storage>> {
        let context = self.context().ok_or_else(|| Error::detached(self.path()))?;
        context.storage.clone().ok_or(Error::NoStorage)
    }

    fn is_optimistic(&self) -> bool {
        self.context()
            .is_some_and(|context| context.config.mutation_policy == MutationPolicy::Optimistic)
    }

    /// Is a directory read outstanding for this branch
    #[must_use]
    pub fn is_reading(&self) -> bool {
        self.0.state.borrow().pending_read.is_some()
    }

    /// Loads this branch's children from storage.
    ///
    /// At most one read per branch is outstanding: while one is pending every
    /// call returns the same shared future. Entries already present as
    /// children are left alone. After a successful listing the branch is
    /// watched; a failure to watch is logged and does not fail the read.
    ///
    /// The status is `Loading` from the moment this is called. A failed read
    /// resets it to `Untouched` so that a later call can retry.
    pub fn fs_read(&self) -> ReadFuture {
        let pending = self.0.state.borrow().pending_read.clone();
        if let Some(pending) = pending {
            return pending;
        }
        if self.is_leaf() {
            return ready(Err(Error::not_a_branch(self.path())));
        }
        let storage = match self.storage() {
            Ok(storage) => storage,
            Err(e) => return ready(Err(e)),
        };

        let weak = self.downgrade();
        let dir_path = self.path();
        let read = async move {
            debug!("reading directory '{dir_path}'", dir_path: dir_path);
            let listing = storage.read_directory(&dir_path).await;

            // The branch may have been dropped while the read was in flight
            let Some(inner) = weak.upgrade() else {
                return listing.map(|_| ());
            };
            let node = Node(inner);

            let entries = match listing {
                Ok(entries) => entries,
                Err(e) => {
                    {
                        let mut state = node.0.state.borrow_mut();
                        state.pending_read = None;
                        state.status = Status::Untouched;
                    }
                    let reason = e.to_string();
                    warn!("reading directory '{dir_path}' failed: {reason}", dir_path: dir_path, reason: reason);
                    return Err(e);
                }
            };

            node.set_status(Status::Loaded);
            let count = entries.len();
            node.merge_listing(entries);
            debug!("read {count} entries from '{dir_path}'", count: count, dir_path: dir_path);

            if let Err(e) = storage.start_watching(&dir_path).await {
                let reason = e.to_string();
                warn!("non-fatal error watching '{dir_path}': {reason}", dir_path: dir_path, reason: reason);
            }
            node.0.state.borrow_mut().pending_read = None;
            Ok(())
        }
        .boxed_local()
        .shared();

        {
            let mut state = self.0.state.borrow_mut();
            state.status = Status::Loading;
            state.pending_read = Some(read.clone());
        }
        read
    }

    fn merge_listing(&self, entries: Vec<DirEntry>) {
        for entry in entries {
            let name = entry.basename;
            if self.get_child(&name).is_some() {
                debug!("ignoring repeated add of '{name}'", name: name);
                continue;
            }
            let kind = if entry.is_directory {
                NodeKind::Branch
            } else {
                NodeKind::Leaf
            };
            if let Err(e) = self.create_child(kind, &name, Properties::new()) {
                let reason = e.to_string();
                warn!("skipping listed entry '{name}': {reason}", name: name, reason: reason);
            }
        }
    }

    /// Removes this node's entry from storage
    pub async fn fs_remove(&self) -> Result<()> {
        if self.is_root() {
            return Err(Error::validation("cannot remove the root"));
        }
        let storage = self.storage()?;
        let root = self.root();
        let node_path = self.path();
        let kind = self.kind();

        storage.remove(&node_path).await?;

        if self.is_optimistic() {
            _ = root.ensure_does_not_exist(kind, &node_path)?;
        }
        Ok(())
    }

    /// Moves `node` into `dest` in storage. Both must belong to this tree.
    pub async fn fs_move(&self, node: &Node, dest: &Node) -> Result<()> {
        if node.is_root() {
            return Err(Error::validation("cannot move the root"));
        }
        if dest.is_leaf() {
            return Err(Error::not_a_branch(dest.path()));
        }
        if dest == node || dest.has_ancestor(node) {
            return Err(Error::move_into_self(node.path(), dest.path()));
        }
        let root = self.root();
        if node.root() != root || dest.root() != root {
            return Err(Error::validation("nodes belong to different trees"));
        }
        let name = node.name();
        let from = node.parent();
        if from.as_ref() != Some(dest) && dest.get_child(&name).is_some() {
            return Err(Error::already_exists(path::join(&dest.path(), &name)));
        }
        let storage = self.storage()?;
        let src_path = node.path();
        let dest_dir = dest.path();
        let dest_path = path::join(&dest_dir, &name);

        storage.move_entry(&src_path, &dest_path).await?;

        // A watch event may already have applied the move
        if self.is_optimistic() && root.get_node_by_path(&src_path).as_ref() == Some(node) {
            root.move_node(&src_path, &dest_dir)?;
        }
        Ok(())
    }

    /// Renames this node's entry in storage, keeping it in the same directory
    pub async fn fs_rename(&self, name: &str) -> Result<()> {
        crate::node::validate_name(name)?;
        let parent = self
            .parent()
            .ok_or_else(|| Error::validation(format!("cannot rename {}", self.path())))?;
        let old_name = self.name();
        if old_name == name {
            return Ok(());
        }
        if parent.get_child(name).is_some() {
            return Err(Error::already_exists(path::join(&parent.path(), name)));
        }
        let storage = self.storage()?;
        let src_path = self.path();
        let dest_path = path::join(&parent.path(), name);

        storage.move_entry(&src_path, &dest_path).await?;

        if self.is_optimistic() && parent.get_child(&old_name).as_ref() == Some(self) {
            parent.rename_child(&old_name, name)?;
        }
        Ok(())
    }

    /// Creates a file named `name` in this branch's directory
    pub async fn fs_create_file(&self, name: &str, contents: &[u8]) -> Result<()> {
        self.fs_create(NodeKind::Leaf, name, contents).await
    }

    /// Creates a directory named `name` in this branch's directory
    pub async fn fs_create_directory(&self, name: &str) -> Result<()> {
        self.fs_create(NodeKind::Branch, name, &[]).await
    }

    async fn fs_create(&self, kind: NodeKind, name: &str, contents: &[u8]) -> Result<()> {
        if self.is_leaf() {
            return Err(Error::not_a_branch(self.path()));
        }
        crate::node::validate_name(name)?;
        let entry_path = path::join(&self.path(), name);
        if self.get_child(name).is_some() {
            return Err(Error::already_exists(entry_path));
        }
        let storage = self.storage()?;
        let root = self.root();

        match kind {
            NodeKind::Leaf => storage.create_file(&entry_path, contents).await?,
            _ => storage.create_directory(&entry_path).await?,
        }

        if self.is_optimistic() {
            _ = root.ensure_exists(kind, &entry_path, Properties::new())?;
        }
        Ok(())
    }

    /// Where the storage serves this leaf: the project root URL, without a
    /// trailing slash, followed by the leaf's path
    pub fn url(&self) -> Result<String> {
        if !self.is_leaf() {
            return Err(Error::validation(format!(
                "only leaves have a URL: {}",
                self.path()
            )));
        }
        let storage = self.storage()?;
        let base = storage.project_root_url();
        let base = base.strip_suffix('/').unwrap_or(base);
        Ok(format!("{base}{}", self.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStorage;
    use crate::tree::Tree;

    #[test]
    fn test_url() {
        let storage = MemoryStorage::new("http://localhost:8080/project/");
        storage.seed_file("/src/index.js", b"");
        let tree = Tree::builder("project").storage(storage).build().unwrap();
        let leaf = tree
            .root()
            .ensure_exists(NodeKind::Leaf, "src/index.js", Properties::new())
            .unwrap();

        assert_eq!(
            leaf.url().unwrap(),
            "http://localhost:8080/project/src/index.js"
        );
        assert!(leaf.parent().unwrap().url().unwrap_err().is_validation());
    }

    #[test]
    fn test_storage_required() {
        let tree = Tree::new("p").unwrap();
        let leaf = tree
            .root()
            .create_child(NodeKind::Leaf, "a", Properties::new())
            .unwrap();
        assert_eq!(leaf.url(), Err(Error::NoStorage));

        let detached = Node::new_leaf("b", Properties::new()).unwrap();
        assert!(matches!(detached.url(), Err(Error::Detached(_))));
    }

    #[tokio::test]
    async fn test_read_without_storage() {
        let tree = Tree::new("p").unwrap();
        assert_eq!(tree.root().fs_read().await, Err(Error::NoStorage));
        assert_eq!(tree.root().status(), Status::Untouched);
    }
}
