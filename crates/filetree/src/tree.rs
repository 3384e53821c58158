// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::rc::{Rc, Weak};

use diagnostics::*;

use crate::config::TreeConfig;
use crate::error::{Error, Result};
use crate::factory::{DirectoryFactory, NodeFactory, PlainFactory};
use crate::node::{Node, NodeInner, Status};
use crate::preload::Preloader;
use crate::storage::{Storage, WatchEvent, WatchEventKind, WatchHandler, validate_storage};

/// State shared by every node of one tree, reachable from the root
pub(crate) struct TreeContext {
    pub(crate) root_path: String,
    pub(crate) storage: Option<Rc<dyn Storage>>,
    pub(crate) factory: Rc<dyn NodeFactory>,
    pub(crate) config: TreeConfig,
}

/// A tree mirroring a storage, owning its root node
pub struct Tree {
    root: Node,
    preloader: Option<Preloader>,
}

pub struct TreeBuilder {
    root_path: String,
    storage: Option<Rc<dyn Storage>>,
    factory: Option<Rc<dyn NodeFactory>>,
    config: TreeConfig,
}

impl TreeBuilder {
    #[must_use]
    pub fn storage<S: Storage + 'static>(mut self, storage: S) -> Self {
        self.storage = Some(Rc::new(storage));
        self
    }

    #[must_use]
    pub fn factory<F: NodeFactory + 'static>(mut self, factory: F) -> Self {
        self.factory = Some(Rc::new(factory));
        self
    }

    #[must_use]
    pub fn config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Tree> {
        if self.root_path.is_empty() {
            return Err(Error::validation("root path is required"));
        }
        if let Some(storage) = &self.storage {
            validate_storage(storage.as_ref())?;
        }
        let preloader = if self.config.enable_preload {
            Some(Preloader::new(self.config.preload)?)
        } else {
            None
        };

        let factory: Rc<dyn NodeFactory> = match (self.factory, &self.storage) {
            (Some(factory), _) => factory,
            (None, Some(_)) => Rc::new(DirectoryFactory),
            (None, None) => Rc::new(PlainFactory),
        };
        let storage = self.storage.clone();
        let root = Node::new_root(Rc::new(TreeContext {
            root_path: self.root_path,
            storage: self.storage,
            factory,
            config: self.config,
        }));

        if let Some(storage) = storage {
            for kind in WatchEventKind::ALL {
                storage.subscribe(kind, watch_handler(root.downgrade()));
            }
        }

        Ok(Tree { root, preloader })
    }
}

/// Reconciles the root with each watch event. Holds the root weakly so the
/// storage's handler list does not keep a dropped tree alive.
fn watch_handler(root: Weak<NodeInner>) -> WatchHandler {
    Rc::new(move |event: &WatchEvent| {
        let Some(inner) = root.upgrade() else {
            return;
        };
        if let Err(e) = Node(inner).reconcile(event) {
            let kind = event.kind.as_str();
            let path = &event.path;
            let reason = e.to_string();
            warn!("failed to apply {kind} for {path}: {reason}", kind: kind, path: path, reason: reason);
        }
    })
}

impl Tree {
    /// A tree without storage, for pure model use
    pub fn new<S: Into<String>>(root_path: S) -> Result<Self> {
        Self::builder(root_path).build()
    }

    pub fn builder<S: Into<String>>(root_path: S) -> TreeBuilder {
        TreeBuilder {
            root_path: root_path.into(),
            storage: None,
            factory: None,
            config: TreeConfig::default(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    #[must_use]
    pub fn root_path(&self) -> String {
        self.root.absolute_path()
    }

    #[must_use]
    pub fn config(&self) -> TreeConfig {
        self.root
            .context()
            .map(|context| context.config.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn preloader(&self) -> Option<&Preloader> {
        self.preloader.as_ref()
    }

    #[must_use]
    pub fn get_node_by_path(&self, path: &str) -> Option<Node> {
        self.root.get_node_by_path(path)
    }

    /// Reads every directory needed to reveal `path`.
    ///
    /// An existing, loaded branch is not read again. Otherwise reading starts
    /// at the deepest node already known and continues one segment at a time.
    /// Returns the paths of the branches that were read.
    pub async fn open_directory(&self, path: &str) -> Result<Vec<String>> {
        let deepest = self.root.get_deepest_node_by_path(path);
        let mut current = deepest.node;
        if current.is_leaf() {
            return Err(Error::not_a_branch(current.path()));
        }

        let mut opened = Vec::new();
        if deepest.remaining.is_empty() {
            if current.status() != Status::Loaded {
                current.fs_read().await?;
                opened.push(current.path());
            }
            return Ok(opened);
        }

        current.fs_read().await?;
        opened.push(current.path());
        for part in deepest.remaining {
            let child = current
                .get_child(&part)
                .ok_or_else(|| Error::not_found(crate::path::join(&current.path(), &part)))?;
            if child.is_leaf() {
                return Err(Error::not_a_branch(child.path()));
            }
            child.fs_read().await?;
            opened.push(child.path());
            current = child;
        }
        Ok(opened)
    }

    /// Speculatively reads a branch the user is likely to open next.
    ///
    /// Returns whether a preload was requested. Must run inside a
    /// `tokio::task::LocalSet`.
    pub fn preload_branch(&self, node: &Node) -> bool {
        let Some(preloader) = &self.preloader else {
            return false;
        };
        if node.is_leaf() || matches!(node.status(), Status::Loading | Status::Loaded) {
            return false;
        }
        let target = node.clone();
        preloader.preload(format!("readDirectory:{}", node.path()), move || {
            target.fs_read()
        });
        true
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tree({:?})", self.root_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PreloadConfig;
    use crate::memory::MemoryStorage;
    use crate::node::{NodeKind, Properties};

    #[test]
    fn test_root_path_required() {
        assert!(Tree::new("").unwrap_err().is_validation());
    }

    #[test]
    fn test_storage_url_is_validated() {
        let err = Tree::builder("p")
            .storage(MemoryStorage::new(""))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStorage(_)));

        let err = Tree::builder("p")
            .storage(MemoryStorage::new("not a url"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidStorage(_)));

        assert!(Tree::builder("p")
            .storage(MemoryStorage::new("file:///srv/project"))
            .build()
            .is_ok());
    }

    #[test]
    fn test_preload_config_is_validated() {
        let config = TreeConfig {
            enable_preload: true,
            preload: PreloadConfig {
                max_concurrent: 0,
                max_enqueued: 1,
            },
            ..Default::default()
        };
        assert!(Tree::builder("p").config(config).build().unwrap_err().is_validation());
    }

    #[test]
    fn test_scenario_project() {
        let tree = Tree::new("project").unwrap();
        let root = tree.root();
        let src = root.create_child(NodeKind::Branch, "src", Properties::new()).unwrap();
        _ = src.create_child(NodeKind::Leaf, "index.js", Properties::new()).unwrap();

        assert_eq!(root.path(), "");
        assert_eq!(src.path(), "/src");
        assert_eq!(
            root.get_node_by_path("src/index.js").map(|n| n.name()),
            Some("index.js".to_string())
        );
        assert_eq!(tree.root_path(), "project");
    }

    #[test]
    fn test_dropped_tree_ignores_watch_events() {
        let storage = MemoryStorage::new("file:///p");
        let tree = Tree::builder("p").storage(storage.clone()).build().unwrap();
        drop(tree);
        storage.emit(WatchEvent::new(WatchEventKind::FileCreated, "/a"));
    }
}
