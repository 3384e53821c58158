// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use diagnostics::*;

use crate::error::Result;
use crate::node::{Node, NodeKind, Properties};
use crate::storage::{WatchEvent, WatchEventKind};

impl Node {
    /// Brings the tree in line with one storage notification.
    ///
    /// Creation and removal are both idempotent, so a notification for a
    /// change the tree already reflects does nothing.
    pub fn reconcile(&self, event: &WatchEvent) -> Result<()> {
        let path = &event.path;
        let kind = event.kind.as_str();
        debug!("reconciling {kind} at '{path}'", kind: kind, path: path);

        match event.kind {
            WatchEventKind::FileCreated => {
                _ = self.ensure_exists(NodeKind::Leaf, path, Properties::new())?;
            }
            WatchEventKind::DirectoryCreated => {
                _ = self.ensure_exists(NodeKind::Branch, path, Properties::new())?;
            }
            WatchEventKind::FileRemoved => {
                _ = self.ensure_does_not_exist(NodeKind::Leaf, path)?;
            }
            WatchEventKind::DirectoryRemoved => {
                _ = self.ensure_does_not_exist(NodeKind::Branch, path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn test_reconcile_is_idempotent() {
        let tree = Tree::new("p").unwrap();
        let root = tree.root();
        let created = WatchEvent::new(WatchEventKind::FileCreated, "/a/b/c.txt");

        root.reconcile(&created).unwrap();
        root.reconcile(&created).unwrap();
        let leaf = root.get_node_by_path("a/b/c.txt").unwrap();
        assert!(leaf.is_leaf());
        assert!(root.get_node_by_path("a/b").unwrap().is_branch());
        assert_eq!(root.walk().len(), 4);

        let removed = WatchEvent::new(WatchEventKind::FileRemoved, "/a/b/c.txt");
        root.reconcile(&removed).unwrap();
        root.reconcile(&removed).unwrap();
        assert!(root.get_node_by_path("a/b/c.txt").is_none());
        assert_eq!(root.walk().len(), 3);
    }

    #[test]
    fn test_removal_checks_kind() {
        let tree = Tree::new("p").unwrap();
        let root = tree.root();
        root.reconcile(&WatchEvent::new(WatchEventKind::DirectoryCreated, "/dir"))
            .unwrap();

        root.reconcile(&WatchEvent::new(WatchEventKind::FileRemoved, "/dir"))
            .unwrap();
        assert!(root.get_child("dir").is_some());

        root.reconcile(&WatchEvent::new(WatchEventKind::DirectoryRemoved, "/dir"))
            .unwrap();
        assert!(root.get_child("dir").is_none());
    }

    #[test]
    fn test_creation_below_a_leaf_fails() {
        let tree = Tree::new("p").unwrap();
        let root = tree.root();
        root.reconcile(&WatchEvent::new(WatchEventKind::FileCreated, "/f"))
            .unwrap();
        let err = root
            .reconcile(&WatchEvent::new(WatchEventKind::FileCreated, "/f/g"))
            .unwrap_err();
        assert!(err.is_structural_conflict());
    }
}
