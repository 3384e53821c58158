// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Structural events.
//!
//! Every branch keeps its own list of listeners. An event emitted at a branch
//! is delivered to that branch's listeners and then to each ancestor's, walking
//! the parent back-references. Detaching a subtree clears its parent
//! reference, so nothing emitted inside it reaches the rest of the tree.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::node::Node;

/// A structural change, as consumed by the UI projection
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEvent {
    NodeAdded {
        parent: Node,
        node: Node,
        index: usize,
    },
    /// `index` is the position the node occupied before removal and
    /// `old_path` the path it had there
    NodeRemoved {
        parent: Node,
        node: Node,
        index: usize,
        old_path: String,
    },
    /// `index` is the position within `to`
    NodeMoved {
        from: Node,
        to: Node,
        node: Node,
        index: usize,
        old_path: String,
    },
}

impl TreeEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TreeEvent::NodeAdded { .. } => "node-added",
            TreeEvent::NodeRemoved { .. } => "node-removed",
            TreeEvent::NodeMoved { .. } => "node-moved",
        }
    }

    /// The node the event is about
    #[must_use]
    pub fn node(&self) -> &Node {
        match self {
            TreeEvent::NodeAdded { node, .. }
            | TreeEvent::NodeRemoved { node, .. }
            | TreeEvent::NodeMoved { node, .. } => node,
        }
    }

    /// Where the event leaves the node: its path before a removal, its
    /// current path otherwise
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            TreeEvent::NodeRemoved { old_path, .. } => old_path.clone(),
            TreeEvent::NodeAdded { node, .. } | TreeEvent::NodeMoved { node, .. } => node.path(),
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            TreeEvent::NodeAdded { index, .. }
            | TreeEvent::NodeRemoved { index, .. }
            | TreeEvent::NodeMoved { index, .. } => *index,
        }
    }
}

pub type Listener = Rc<dyn Fn(&TreeEvent)>;

/// Returned by `Node::subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Node {
    /// Listens to events emitted at this branch or anywhere beneath it
    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId>
    where
        F: Fn(&TreeEvent) + 'static,
    {
        if self.is_leaf() {
            return Err(Error::not_a_branch(self.path()));
        }
        let id = SubscriptionId::next();
        self.0
            .state
            .borrow_mut()
            .listeners
            .push((id, Rc::new(listener)));
        Ok(id)
    }

    /// Returns false if the subscription was not registered here
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.0.state.borrow_mut();
        let before = state.listeners.len();
        state.listeners.retain(|(sid, _)| *sid != id);
        state.listeners.len() != before
    }

    /// Delivers the event here and to every ancestor, nearest first.
    ///
    /// Listeners are collected before any is invoked, so a listener may
    /// freely read or mutate the tree.
    pub(crate) fn emit(&self, event: TreeEvent) {
        let mut listeners: Vec<Listener> = Vec::new();
        let mut current = Some(self.clone());
        while let Some(node) = current {
            let state = node.0.state.borrow();
            listeners.extend(state.listeners.iter().map(|(_, l)| l.clone()));
            current = state.parent.upgrade().map(Node);
        }
        for listener in listeners {
            listener(&event);
        }
    }
}
