// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use serde_json::Value;

use crate::error::Result;
use crate::node::{Node, Properties};

/// Constructs the nodes a tree creates through `create_child`.
///
/// A tree is given one factory when it is built; specializing nodes means
/// supplying a different factory, for example one that seeds default
/// properties for the UI projection.
pub trait NodeFactory {
    fn create_branch(&self, name: &str, data: Properties) -> Result<Node> {
        Node::new_branch(name, data)
    }

    fn create_leaf(&self, name: &str, data: Properties) -> Result<Node> {
        Node::new_leaf(name, data)
    }
}

/// Builds nodes exactly as requested
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFactory;

impl NodeFactory for PlainFactory {}

/// Factory for trees that mirror a storage: directories start collapsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryFactory;

impl NodeFactory for DirectoryFactory {
    fn create_branch(&self, name: &str, mut data: Properties) -> Result<Node> {
        _ = data
            .entry("collapsed".to_string())
            .or_insert(Value::Bool(true));
        Node::new_branch(name, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;
    use crate::tree::Tree;
    use serde_json::json;

    struct Tagging;

    impl NodeFactory for Tagging {
        fn create_leaf(&self, name: &str, mut data: Properties) -> Result<Node> {
            _ = data.insert("tag".to_string(), json!(name.len()));
            Node::new_leaf(name, data)
        }
    }

    #[test]
    fn test_injected_factory() {
        let tree = Tree::builder("p").factory(Tagging).build().unwrap();
        let leaf = tree
            .root()
            .create_child(NodeKind::Leaf, "four", Properties::new())
            .unwrap();
        let branch = tree
            .root()
            .create_child(NodeKind::Branch, "dir", Properties::new())
            .unwrap();

        assert_eq!(leaf.get("tag"), Some(json!(4)));
        assert_eq!(branch.get("tag"), None);
    }

    #[test]
    fn test_directory_factory_defaults() {
        let tree = Tree::builder("p").factory(DirectoryFactory).build().unwrap();
        let root = tree.root();
        let open = root
            .create_child(
                NodeKind::Branch,
                "open",
                [("collapsed".to_string(), json!(false))].into_iter().collect(),
            )
            .unwrap();
        let closed = root
            .create_child(NodeKind::Branch, "closed", Properties::new())
            .unwrap();

        assert_eq!(open.get("collapsed"), Some(json!(false)));
        assert_eq!(closed.get("collapsed"), Some(json!(true)));
    }

    struct Wrong;

    impl NodeFactory for Wrong {
        fn create_branch(&self, name: &str, data: Properties) -> Result<Node> {
            Node::new_leaf(name, data)
        }
    }

    #[test]
    fn test_factory_kind_mismatch_is_rejected() {
        let tree = Tree::builder("p").factory(Wrong).build().unwrap();
        let err = tree
            .root()
            .create_child(NodeKind::Branch, "dir", Properties::new())
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(tree.root().child_count(), 0);
    }
}
