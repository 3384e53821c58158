// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

mod branch;
mod scenario;

use std::cell::RefCell;
use std::rc::Rc;

use crate::event::TreeEvent;
use crate::memory::MemoryStorage;
use crate::node::{Node, NodeKind, Properties};
use crate::tree::Tree;

/// Records every event reaching `node`, rendered as `name path index`
pub(crate) fn record(node: &Node) -> Rc<RefCell<Vec<String>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    _ = node
        .subscribe(move |event: &TreeEvent| {
            sink.borrow_mut().push(format!(
                "{} {} {}",
                event.name(),
                event.path(),
                event.index()
            ));
        })
        .unwrap();
    seen
}

/// A storage holding a small project:
///
/// ```text
/// /README.md
/// /src/index.js
/// /src/lib/util.js
/// /test/index.test.js
/// ```
pub(crate) fn project_storage() -> MemoryStorage {
    let storage = MemoryStorage::new("http://localhost:8080/project/");
    storage.seed_file("/README.md", b"# project");
    storage.seed_file("/src/index.js", b"console.log('hi')");
    storage.seed_file("/src/lib/util.js", b"");
    storage.seed_file("/test/index.test.js", b"");
    storage
}

pub(crate) fn branch(parent: &Node, name: &str) -> Node {
    parent
        .create_child(NodeKind::Branch, name, Properties::new())
        .unwrap()
}

pub(crate) fn leaf(parent: &Node, name: &str) -> Node {
    parent
        .create_child(NodeKind::Leaf, name, Properties::new())
        .unwrap()
}

/// Names of the children, in order
pub(crate) fn names(node: &Node) -> Vec<String> {
    node.children().iter().map(Node::name).collect()
}

pub(crate) fn model_tree() -> Tree {
    Tree::new("project").unwrap()
}
