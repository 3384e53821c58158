// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use super::{branch, leaf, model_tree, names, record};
use crate::error::Error;
use crate::event::TreeEvent;
use crate::node::{Node, NodeKind, Properties};

use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn test_duplicate_name_rejected() {
    let tree = model_tree();
    let root = tree.root();
    _ = leaf(root, "a");
    let seen = record(root);

    let err = root
        .create_child(NodeKind::Branch, "a", Properties::new())
        .unwrap_err();
    assert_eq!(err, Error::already_exists("/a"));
    assert_eq!(root.child_count(), 1);
    assert!(seen.borrow().is_empty());

    let twin = Node::new_leaf("a", Properties::new()).unwrap();
    assert!(root.add_child(twin).unwrap_err().is_structural_conflict());
    assert_eq!(root.child_count(), 1);
}

#[test]
fn test_sibling_order() {
    let tree = model_tree();
    let root = tree.root();
    let seen = record(root);

    _ = leaf(root, "b.txt");
    _ = leaf(root, "a.txt");
    _ = branch(root, "zeta");
    _ = branch(root, "alpha");

    assert_eq!(names(root), vec!["alpha", "zeta", "a.txt", "b.txt"]);
    // Each node-added carries the index the node was inserted at
    assert_eq!(
        *seen.borrow(),
        vec![
            "node-added /b.txt 0",
            "node-added /a.txt 0",
            "node-added /zeta 0",
            "node-added /alpha 0",
        ]
    );
    assert_eq!(root.get_child_index("a.txt"), Some(2));
}

#[test]
fn test_get_node_by_path_round_trip() {
    let tree = model_tree();
    let root = tree.root();
    let src = branch(root, "src");
    let lib = branch(&src, "lib");
    _ = leaf(&lib, "util.js");
    _ = leaf(&src, "index.js");
    _ = leaf(root, "README.md");

    for node in root.walk() {
        assert_eq!(root.get_node_by_path(&node.path()), Some(node.clone()));
    }
    assert_eq!(root.get_node_by_path(""), Some(root.clone()));
    assert_eq!(root.get_node_by_path("/src/lib/"), Some(lib.clone()));
    assert_eq!(src.get_node_by_path("lib/util.js").map(|n| n.path()), Some("/src/lib/util.js".to_string()));
    assert!(root.get_node_by_path("src/missing").is_none());
    assert!(root.get_node_by_path("README.md/below").is_none());
}

#[test]
fn test_get_deepest_node_by_path() {
    let tree = model_tree();
    let root = tree.root();
    let a = branch(root, "a");
    let b = branch(&a, "b");

    let deepest = root.get_deepest_node_by_path("a/b/x/y/z");
    assert_eq!(deepest.node, b);
    assert_eq!(deepest.remaining, vec!["x", "y", "z"]);

    let deepest = root.get_deepest_node_by_path("/a/b");
    assert_eq!(deepest.node, b);
    assert!(deepest.remaining.is_empty());

    let deepest = root.get_deepest_node_by_path("nothing/here");
    assert_eq!(deepest.node, *root);
    assert_eq!(deepest.remaining, vec!["nothing", "here"]);
}

#[test]
fn test_remove_child() {
    let tree = model_tree();
    let root = tree.root();
    _ = branch(root, "dir");
    _ = leaf(root, "file");
    let seen = record(root);

    let removed = root.remove_child("file").unwrap();
    assert!(removed.parent().is_none());
    assert_eq!(removed.path(), "/file");
    assert_eq!(*seen.borrow(), vec!["node-removed /file 1"]);

    assert_eq!(root.remove_child("file").unwrap_err(), Error::not_found("/file"));
    assert_eq!(root.child_count(), 1);
}

#[test]
fn test_add_child_rejects_invalid_nodes() {
    let tree = model_tree();
    let other = model_tree();
    let root = tree.root();
    let a = branch(root, "a");
    let b = branch(&a, "b");

    assert!(root.add_child(other.root().clone()).unwrap_err().is_validation());
    // Already attached elsewhere
    assert!(root.add_child(b.clone()).unwrap_err().is_validation());

    let file = leaf(root, "file");
    let orphan = Node::new_leaf("x", Properties::new()).unwrap();
    assert!(file.add_child(orphan).unwrap_err().is_structural_conflict());
}

#[test]
fn test_move_emits_one_event() {
    let tree = model_tree();
    let root = tree.root();
    let src = branch(root, "src");
    let dest = branch(root, "dest");
    let file = leaf(&src, "index.js");
    _ = leaf(&dest, "other.js");

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    _ = root
        .subscribe(move |event: &TreeEvent| {
            // The move is already visible while listeners run
            if let TreeEvent::NodeMoved { node, .. } = event {
                assert_eq!(node.path(), "/dest/index.js");
            }
            sink.borrow_mut().push(event.clone());
        })
        .unwrap();

    root.move_node("src/index.js", "dest").unwrap();

    assert_eq!(file.path(), "/dest/index.js");
    assert_eq!(file.parent(), Some(dest.clone()));
    assert_eq!(src.child_count(), 0);
    assert_eq!(names(&dest), vec!["index.js", "other.js"]);

    let events = events.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0],
        TreeEvent::NodeMoved {
            from: src.clone(),
            to: dest.clone(),
            node: file.clone(),
            index: 0,
            old_path: "/src/index.js".to_string(),
        }
    );
}

#[test]
fn test_move_preserves_subtree_and_properties() {
    let tree = model_tree();
    let root = tree.root();
    let a = branch(root, "a");
    let inner = branch(&a, "inner");
    let deep = leaf(&inner, "deep");
    deep.set("color", "red").unwrap();
    let target = branch(root, "target");

    root.move_node("a/inner", "target").unwrap();

    assert_eq!(target.get_child("inner"), Some(inner.clone()));
    assert_eq!(deep.path(), "/target/inner/deep");
    assert_eq!(deep.get("color"), Some(json!("red")));
    assert_eq!(root.get_node_by_path("target/inner/deep"), Some(deep));
}

#[test]
fn test_invalid_moves_change_nothing() {
    let tree = model_tree();
    let root = tree.root();
    let a = branch(root, "a");
    let a1 = branch(&a, "a1");
    _ = branch(&a1, "a11");
    let file = leaf(root, "file");
    let b = branch(root, "b");
    _ = leaf(&b, "file");
    let seen = record(root);

    let counts = |nodes: &[&Node]| nodes.iter().map(|n| n.child_count()).collect::<Vec<_>>();
    let before = counts(&[root, &a, &a1, &b]);

    let err = root.move_node("a", "a").unwrap_err();
    assert!(matches!(err, Error::MoveIntoSelf { .. }));
    let err = root.move_node("a", "a/a1/a11").unwrap_err();
    assert!(matches!(err, Error::MoveIntoSelf { .. }));
    let err = root.move_node("a", "file").unwrap_err();
    assert_eq!(err, Error::not_a_branch("/file"));
    let err = root.move_node("file", "b").unwrap_err();
    assert_eq!(err, Error::already_exists("/b/file"));
    assert!(root.move_node("missing", "b").unwrap_err().is_not_found());
    assert!(root.move_node("a", "missing").unwrap_err().is_not_found());
    assert!(root.move_node("", "b").unwrap_err().is_validation());

    assert_eq!(counts(&[root, &a, &a1, &b]), before);
    assert_eq!(file.parent(), Some(root.clone()));
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_move_within_same_parent() {
    let tree = model_tree();
    let root = tree.root();
    let a = branch(root, "a");
    let file = leaf(&a, "f");
    let seen = record(root);

    root.move_node("a/f", "a").unwrap();
    assert_eq!(file.parent(), Some(a));
    assert_eq!(*seen.borrow(), vec!["node-moved /a/f 0"]);
}

#[test]
fn test_relocate_is_silent() {
    let tree = model_tree();
    let root = tree.root();
    let a = branch(root, "a");
    let b = branch(root, "b");
    let file = leaf(&a, "f");
    let seen = record(root);

    let (from, to, node, index) = root.relocate_node("a/f", "b").unwrap();
    assert_eq!((from, to, node, index), (a, b, file, 0));
    assert!(seen.borrow().is_empty());
}

#[test]
fn test_rename_child() {
    let tree = model_tree();
    let root = tree.root();
    let dir = branch(root, "dir");
    let file = leaf(&dir, "old.txt");
    _ = leaf(&dir, "m.txt");
    let seen = record(root);

    dir.rename_child("old.txt", "a.txt").unwrap();
    assert_eq!(file.name(), "a.txt");
    assert_eq!(names(&dir), vec!["a.txt", "m.txt"]);
    assert_eq!(*seen.borrow(), vec!["node-moved /dir/a.txt 0"]);

    assert!(dir.rename_child("a.txt", "m.txt").unwrap_err().is_structural_conflict());
    assert!(dir.rename_child("gone", "x").unwrap_err().is_not_found());
    assert!(dir.rename_child("a.txt", "a/b").unwrap_err().is_validation());
    assert_eq!(seen.borrow().len(), 1);
}

#[test]
fn test_ensure_exists() {
    let tree = model_tree();
    let root = tree.root();
    let seen = record(root);

    let node = root
        .ensure_exists(NodeKind::Leaf, "/a/b/c.txt", Properties::new())
        .unwrap();
    assert!(node.is_leaf());
    assert_eq!(node.path(), "/a/b/c.txt");
    assert!(root.get_node_by_path("a/b").unwrap().is_branch());
    assert_eq!(
        *seen.borrow(),
        vec!["node-added /a 0", "node-added /a/b 0", "node-added /a/b/c.txt 0"]
    );

    // Present already: same node, no events
    let again = root
        .ensure_exists(NodeKind::Leaf, "a/b/c.txt", Properties::new())
        .unwrap();
    assert_eq!(again, node);
    assert_eq!(seen.borrow().len(), 3);

    assert!(root
        .ensure_exists(NodeKind::Branch, "", Properties::new())
        .unwrap_err()
        .is_validation());
    assert!(root
        .ensure_exists(NodeKind::Root, "x", Properties::new())
        .unwrap_err()
        .is_validation());
}

#[test]
fn test_ensure_exists_with_data() {
    let tree = model_tree();
    let root = tree.root();
    let data: Properties = [("size".to_string(), json!(12))].into_iter().collect();

    let node = root.ensure_exists(NodeKind::Leaf, "d/f", data).unwrap();
    assert_eq!(node.get("size"), Some(json!(12)));
    assert_eq!(node.parent().unwrap().get("size"), None);
}

#[test]
fn test_ensure_does_not_exist() {
    let tree = model_tree();
    let root = tree.root();
    let dir = branch(root, "dir");
    _ = leaf(&dir, "f");

    assert_eq!(root.ensure_does_not_exist(NodeKind::Branch, "dir/f").unwrap(), None);
    assert_eq!(root.ensure_does_not_exist(NodeKind::Leaf, "nope").unwrap(), None);
    assert_eq!(root.ensure_does_not_exist(NodeKind::Root, "").unwrap(), None);
    assert_eq!(dir.child_count(), 1);

    let removed = root.ensure_does_not_exist(NodeKind::Branch, "dir").unwrap();
    assert_eq!(removed, Some(dir));
    assert_eq!(root.child_count(), 0);
}

#[test]
fn test_remove_self() {
    let tree = model_tree();
    let root = tree.root();
    let dir = branch(root, "dir");

    dir.remove_self().unwrap();
    assert_eq!(root.child_count(), 0);
    assert!(matches!(dir.remove_self(), Err(Error::Detached(_))));
    assert!(matches!(root.remove_self(), Err(Error::Detached(_))));
}

#[test]
fn test_detached_subtree_can_be_reattached() {
    let tree = model_tree();
    let root = tree.root();
    let a = branch(root, "a");
    let b = branch(root, "b");
    let inner = leaf(&a, "inner");

    let detached = root.remove_child("a").unwrap();
    assert_eq!(inner.path(), "/a/inner");
    assert_eq!(inner.absolute_path(), "/a/inner");

    _ = b.add_child(detached).unwrap();
    assert_eq!(inner.path(), "/b/a/inner");
    assert_eq!(inner.absolute_path(), "project/b/a/inner");
}

#[test]
fn test_traverse_ancestors() {
    let tree = model_tree();
    let root = tree.root();
    let a = branch(root, "a");
    let b = branch(&a, "b");
    let c = leaf(&b, "c");

    let mut seen = Vec::new();
    c.traverse_ancestors(|node| seen.push(node.path()));
    assert_eq!(seen, vec!["/a/b", "/a", ""]);
}
