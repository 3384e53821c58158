// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::{Listener, SubscriptionId};
use crate::path;
use crate::remote::ReadFuture;
use crate::tree::TreeContext;

/// Arbitrary per-node data carried for the UI projection.
pub type Properties = BTreeMap<String, Value>;

/// Keys of the property bag that shadow derived or structural state, in
/// both the Rust spelling and the camelCase one used on the wire.
pub const RESERVED_PROPERTIES: &[&str] = &[
    "path",
    "absolute_path",
    "absolutePath",
    "root",
    "is_root",
    "isRoot",
    "is_branch",
    "isBranch",
    "is_leaf",
    "isLeaf",
    "kind",
    "name",
    "parent",
    "set",
    "get",
    "emit",
    "on",
    "subscribe",
    "unsubscribe",
    "addListener",
    "removeListener",
];

/// Type of node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Branch,
    Leaf,
}

impl NodeKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Branch => "branch",
            NodeKind::Leaf => "leaf",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "root" => Ok(NodeKind::Root),
            "branch" => Ok(NodeKind::Branch),
            "leaf" => Ok(NodeKind::Leaf),
            other => Err(Error::validation(format!("invalid kind `{other}`"))),
        }
    }
}

/// Fetch state of a branch listing or of a leaf's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Untouched,
    Loading,
    Loaded,
}

/// A handle to a node of the tree.
///
/// Handles are cheap to clone and compare by identity: two handles are equal
/// only if they refer to the same node instance. A branch owns its children
/// through their handles, while a child refers back to its parent weakly.
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeInner>);

pub(crate) struct NodeInner {
    pub(crate) kind: NodeKind,
    /// Only the root carries the tree context
    pub(crate) context: Option<Rc<TreeContext>>,
    pub(crate) state: RefCell<NodeState>,
}

#[derive(Default)]
pub(crate) struct NodeState {
    pub(crate) name: String,
    pub(crate) parent: Weak<NodeInner>,
    pub(crate) properties: Properties,
    pub(crate) status: Status,
    pub(crate) selected: bool,
    pub(crate) children: Vec<Node>,
    pub(crate) listeners: Vec<(SubscriptionId, Listener)>,
    pub(crate) pending_read: Option<ReadFuture>,
}

/// Rejects names that cannot be addressed by a path segment
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("name must not be empty"));
    }
    if name.contains('/') {
        return Err(Error::validation(format!("name `{name}` must not contain '/'")));
    }
    Ok(())
}

fn validate_key(key: &str) -> Result<()> {
    if RESERVED_PROPERTIES.contains(&key) {
        Err(Error::reserved_property(key))
    } else {
        Ok(())
    }
}

impl Node {
    fn with_kind(kind: NodeKind, name: &str, data: Properties) -> Result<Self> {
        validate_name(name)?;
        for key in data.keys() {
            validate_key(key)?;
        }
        Ok(Node(Rc::new(NodeInner {
            kind,
            context: None,
            state: RefCell::new(NodeState {
                name: name.to_string(),
                properties: data,
                ..Default::default()
            }),
        })))
    }

    /// Creates a detached branch; attach it with `add_child`.
    pub fn new_branch(name: &str, data: Properties) -> Result<Self> {
        Self::with_kind(NodeKind::Branch, name, data)
    }

    /// Creates a detached leaf; attach it with `add_child`.
    pub fn new_leaf(name: &str, data: Properties) -> Result<Self> {
        Self::with_kind(NodeKind::Leaf, name, data)
    }

    pub(crate) fn new_root(context: Rc<TreeContext>) -> Self {
        Node(Rc::new(NodeInner {
            kind: NodeKind::Root,
            context: Some(context),
            state: RefCell::new(NodeState::default()),
        }))
    }

    pub(crate) fn downgrade(&self) -> Weak<NodeInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn context(&self) -> Option<Rc<TreeContext>> {
        self.root().0.context.clone()
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.kind == NodeKind::Root
    }

    #[must_use]
    pub fn is_branch(&self) -> bool {
        self.0.kind == NodeKind::Branch
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.0.kind == NodeKind::Leaf
    }

    /// Can this node hold children (root or branch)
    #[must_use]
    pub fn is_container(&self) -> bool {
        !self.is_leaf()
    }

    /// The node's name; empty for the root
    #[must_use]
    pub fn name(&self) -> String {
        self.0.state.borrow().name.clone()
    }

    pub(crate) fn set_name(&self, name: &str) {
        self.0.state.borrow_mut().name = name.to_string();
    }

    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.0.state.borrow().parent.upgrade().map(Node)
    }

    /// The topmost node reachable by ascent
    #[must_use]
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Path from the root, excluding the root's storage prefix.
    ///
    /// The root's path is the empty string; its children are `/name`.
    #[must_use]
    pub fn path(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.is_root() {
                break;
            }
            names.push(node.name());
            current = node.parent();
        }
        names
            .iter()
            .rev()
            .fold(String::new(), |acc, name| path::join(&acc, name))
    }

    /// Path prefixed by the root path of the tree
    #[must_use]
    pub fn absolute_path(&self) -> String {
        match self.context() {
            Some(context) => format!("{}{}", context.root_path, self.path()),
            None => self.path(),
        }
    }

    /// Is `candidate` a strict ancestor of this node
    #[must_use]
    pub fn has_ancestor(&self, candidate: &Node) -> bool {
        let mut current = self.parent();
        while let Some(node) = current {
            if node == *candidate {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Visits each ancestor, nearest first
    pub fn traverse_ancestors<F>(&self, mut f: F)
    where
        F: FnMut(&Node),
    {
        let mut current = self.parent();
        while let Some(node) = current {
            f(&node);
            current = node.parent();
        }
    }

    /// Number of ancestors (root = 0)
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        self.traverse_ancestors(|_| depth += 1);
        depth
    }

    pub fn set<V: Into<Value>>(&self, key: &str, value: V) -> Result<()> {
        validate_key(key)?;
        _ = self
            .0
            .state
            .borrow_mut()
            .properties
            .insert(key.to_string(), value.into());
        Ok(())
    }

    /// Bulk assignment; nothing is written if any key is reserved
    pub fn set_all<I>(&self, data: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let data: Vec<_> = data.into_iter().collect();
        for (key, _) in &data {
            validate_key(key)?;
        }
        self.0.state.borrow_mut().properties.extend(data);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.state.borrow().properties.get(key).cloned()
    }

    #[must_use]
    pub fn properties(&self) -> Properties {
        self.0.state.borrow().properties.clone()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.0.state.borrow().status
    }

    pub fn set_status(&self, status: Status) {
        self.0.state.borrow_mut().status = status;
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.0.state.borrow().selected
    }

    pub fn set_selected(&self, selected: bool) -> Result<()> {
        if !self.is_leaf() {
            return Err(Error::validation(format!(
                "only leaves can be selected: {}",
                self.path()
            )));
        }
        self.0.state.borrow_mut().selected = selected;
        Ok(())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Node({} {:?})", self.kind(), self.path())
    }
}
