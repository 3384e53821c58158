// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Child management and path resolution for branches.
//!
//! Operations that change structure come in two variants: the public
//! operation (`add_child`, `remove_child`, `move_node`) emits an event, while
//! the primitive (`attach_child`, `detach_child`, `relocate_node`) does not.
//! All of them validate before touching anything.

use std::cmp::Ordering;
use std::rc::Weak;

use diagnostics::*;

use crate::error::{Error, Result};
use crate::event::TreeEvent;
use crate::factory::{NodeFactory, PlainFactory};
use crate::node::{Node, NodeKind, Properties, validate_name};
use crate::path;

/// Result of `get_deepest_node_by_path`
#[derive(Debug, Clone, PartialEq)]
pub struct DeepestNode {
    /// The deepest node that exists along the path
    pub node: Node,
    /// Segments below `node` that could not be resolved
    pub remaining: Vec<String>,
}

/// Branches before leaves, then ascending by name
fn sibling_order(a: &Node, b: &Node) -> Ordering {
    a.is_leaf()
        .cmp(&b.is_leaf())
        .then_with(|| a.0.state.borrow().name.cmp(&b.0.state.borrow().name))
}

impl Node {
    fn require_container(&self) -> Result<()> {
        if self.is_leaf() {
            Err(Error::not_a_branch(self.path()))
        } else {
            Ok(())
        }
    }

    fn child_path(&self, name: &str) -> String {
        path::join(&self.path(), name)
    }

    /// Children in sibling order; empty for leaves
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        self.0.state.borrow().children.clone()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.0.state.borrow().children.len()
    }

    #[must_use]
    pub fn get_child(&self, name: &str) -> Option<Node> {
        self.0
            .state
            .borrow()
            .children
            .iter()
            .find(|child| child.0.state.borrow().name == name)
            .cloned()
    }

    #[must_use]
    pub fn get_child_index(&self, name: &str) -> Option<usize> {
        self.0
            .state
            .borrow()
            .children
            .iter()
            .position(|child| child.0.state.borrow().name == name)
    }

    /// This node and everything beneath it, pre-order
    #[must_use]
    pub fn walk(&self) -> Vec<Node> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    fn factory(&self) -> std::rc::Rc<dyn NodeFactory> {
        match self.context() {
            Some(context) => context.factory.clone(),
            None => std::rc::Rc::new(PlainFactory),
        }
    }

    /// Builds a child through the tree's node factory and adds it
    pub fn create_child(&self, kind: NodeKind, name: &str, data: Properties) -> Result<Node> {
        self.require_container()?;
        validate_name(name)?;
        if self.get_child(name).is_some() {
            return Err(Error::already_exists(self.child_path(name)));
        }

        let factory = self.factory();
        let node = match kind {
            NodeKind::Branch => factory.create_branch(name, data)?,
            NodeKind::Leaf => factory.create_leaf(name, data)?,
            NodeKind::Root => {
                return Err(Error::validation("cannot create a root as a child"));
            }
        };
        if node.kind() != kind || node.name() != name {
            return Err(Error::validation(format!(
                "factory produced {} `{}` for {} `{}`",
                node.kind(),
                node.name(),
                kind,
                name
            )));
        }

        self.add_child(node.clone())?;
        Ok(node)
    }

    /// Adds a detached node and emits `node-added`. Returns its index.
    pub fn add_child(&self, node: Node) -> Result<usize> {
        let index = self.attach_child(node.clone())?;
        self.emit(TreeEvent::NodeAdded {
            parent: self.clone(),
            node,
            index,
        });
        Ok(index)
    }

    /// Adds a detached node at its sorted position without emitting.
    pub fn attach_child(&self, node: Node) -> Result<usize> {
        self.require_container()?;
        if node.is_root() {
            return Err(Error::validation("cannot add a root node as a child"));
        }
        if node.parent().is_some() {
            return Err(Error::validation(format!(
                "{} is already attached",
                node.path()
            )));
        }
        if node == *self || self.has_ancestor(&node) {
            return Err(Error::move_into_self(node.path(), self.path()));
        }
        let name = node.name();
        if self.get_child(&name).is_some() {
            return Err(Error::already_exists(self.child_path(&name)));
        }

        node.0.state.borrow_mut().parent = self.downgrade();
        let mut state = self.0.state.borrow_mut();
        let index = state
            .children
            .partition_point(|child| sibling_order(child, &node) == Ordering::Less);
        state.children.insert(index, node);
        Ok(index)
    }

    /// Detaches the named child and emits `node-removed` with the index it
    /// occupied. Returns the detached node.
    pub fn remove_child(&self, name: &str) -> Result<Node> {
        let (node, index) = self.detach_child(name)?;
        let old_path = self.child_path(&node.name());
        self.emit(TreeEvent::NodeRemoved {
            parent: self.clone(),
            node: node.clone(),
            index,
            old_path,
        });
        Ok(node)
    }

    /// Detaches the named child without emitting; returns it and its old index.
    ///
    /// The detached subtree keeps its own children and listeners but no
    /// longer reaches this branch or its ancestors.
    pub fn detach_child(&self, name: &str) -> Result<(Node, usize)> {
        self.require_container()?;
        validate_name(name)?;
        let index = self
            .get_child_index(name)
            .ok_or_else(|| Error::not_found(self.child_path(name)))?;
        let node = self.0.state.borrow_mut().children.remove(index);
        node.0.state.borrow_mut().parent = Weak::new();
        Ok((node, index))
    }

    /// Removes this node from its parent, emitting `node-removed`
    pub fn remove_self(&self) -> Result<()> {
        let parent = self
            .parent()
            .ok_or_else(|| Error::detached(self.path()))?;
        _ = parent.remove_child(&self.name())?;
        Ok(())
    }

    /// Resolves a path relative to this node; `""` is this node.
    #[must_use]
    pub fn get_node_by_path(&self, path: &str) -> Option<Node> {
        let mut current = self.clone();
        for part in path::split(path) {
            current = current.get_child(&part)?;
        }
        Some(current)
    }

    /// Resolves as much of the path as exists.
    #[must_use]
    pub fn get_deepest_node_by_path(&self, path: &str) -> DeepestNode {
        let parts = path::split(path);
        let mut node = self.clone();
        for (i, part) in parts.iter().enumerate() {
            match node.get_child(part) {
                Some(child) => node = child,
                None => {
                    return DeepestNode {
                        node,
                        remaining: parts[i..].to_vec(),
                    };
                }
            }
        }
        DeepestNode {
            node,
            remaining: Vec::new(),
        }
    }

    /// Moves the node at `node_path` into the branch at `to_path`, both
    /// relative to this node, and emits a single `node-moved`.
    pub fn move_node(&self, node_path: &str, to_path: &str) -> Result<()> {
        let (from, to, node, index) = self.relocate_node(node_path, to_path)?;
        let old_path = from.child_path(&node.name());
        self.emit(TreeEvent::NodeMoved {
            from,
            to,
            node,
            index,
            old_path,
        });
        Ok(())
    }

    /// Moves without emitting. Returns the old parent, the new parent, the
    /// node and its index within the new parent.
    pub fn relocate_node(&self, node_path: &str, to_path: &str) -> Result<(Node, Node, Node, usize)> {
        let node = self
            .get_node_by_path(node_path)
            .ok_or_else(|| Error::not_found(path::join(&self.path(), path::trim(node_path))))?;
        if node == *self {
            return Err(Error::validation("the node to move must be a descendant"));
        }
        let to = self
            .get_node_by_path(to_path)
            .ok_or_else(|| Error::not_found(path::join(&self.path(), path::trim(to_path))))?;
        if to.is_leaf() {
            return Err(Error::not_a_branch(to.path()));
        }
        if to == node || to.has_ancestor(&node) {
            return Err(Error::move_into_self(node.path(), to.path()));
        }
        let from = node
            .parent()
            .ok_or_else(|| Error::detached(node.path()))?;
        let name = node.name();
        if to != from && to.get_child(&name).is_some() {
            return Err(Error::already_exists(to.child_path(&name)));
        }

        let (node, old_index) = from.detach_child(&name)?;
        match to.attach_child(node.clone()) {
            Ok(index) => Ok((from, to, node, index)),
            Err(e) => {
                // Put the node back where it was; validation above makes this unreachable
                node.0.state.borrow_mut().parent = from.downgrade();
                from.0.state.borrow_mut().children.insert(old_index, node);
                Err(e)
            }
        }
    }

    /// Renames a child in place, keeping its identity and subtree.
    /// Emits `node-moved` with this branch as both source and destination.
    pub fn rename_child(&self, name: &str, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let node = self
            .get_child(name)
            .ok_or_else(|| Error::not_found(self.child_path(name)))?;
        if name == new_name {
            return Ok(());
        }
        if self.get_child(new_name).is_some() {
            return Err(Error::already_exists(self.child_path(new_name)));
        }

        let (node, _) = self.detach_child(&node.name())?;
        node.set_name(new_name);
        let index = self.attach_child(node.clone())?;
        self.emit(TreeEvent::NodeMoved {
            from: self.clone(),
            to: self.clone(),
            node,
            index,
            old_path: self.child_path(name),
        });
        Ok(())
    }

    /// Creates whatever is missing along `path`: intermediate branches, then
    /// a final node of `kind`. Returns the node at `path`, whether it was
    /// created or already there.
    pub fn ensure_exists(&self, kind: NodeKind, path: &str, data: Properties) -> Result<Node> {
        if kind == NodeKind::Root {
            return Err(Error::validation("cannot ensure a root node"));
        }
        let DeepestNode { node, remaining } = self.get_deepest_node_by_path(path);
        if remaining.is_empty() {
            if node == *self {
                return Err(Error::validation("path must not be empty"));
            }
            if node.kind() != kind {
                let path = node.path();
                let existing = node.kind().as_str();
                debug!("ensure_exists: {path} already exists as {existing}", path: path, existing: existing);
            }
            return Ok(node);
        }

        let last = remaining.len() - 1;
        let mut data = Some(data);
        let mut current = node;
        for (i, part) in remaining.iter().enumerate() {
            current = if i == last {
                current.create_child(kind, part, data.take().unwrap_or_default())?
            } else {
                current.create_child(NodeKind::Branch, part, Properties::new())?
            };
        }
        Ok(current)
    }

    /// Removes the node at `path` if it exists with the given kind.
    /// Returns the removed node.
    pub fn ensure_does_not_exist(&self, kind: NodeKind, path: &str) -> Result<Option<Node>> {
        match self.get_node_by_path(path) {
            Some(node) if node != *self && node.kind() == kind => {
                node.remove_self()?;
                Ok(Some(node))
            }
            _ => Ok(None),
        }
    }
}
