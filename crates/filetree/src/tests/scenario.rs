// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end flows over the in-memory storage.

use futures::FutureExt;

use super::{names, project_storage, record};
use crate::error::Error;
use crate::node::{NodeKind, Properties, Status};
use crate::storage::{WatchEvent, WatchEventKind};
use crate::tree::Tree;

#[tokio::test]
async fn test_project_layout() {
    let storage = project_storage();
    let tree = Tree::builder("project")
        .storage(storage.clone())
        .build()
        .unwrap();
    let root = tree.root();

    _ = tree.open_directory("src").await.unwrap();
    let src = root.get_child("src").unwrap();
    let index = root.get_node_by_path("src/index.js").unwrap();

    assert_eq!(root.path(), "");
    assert_eq!(root.absolute_path(), "project");
    assert_eq!(src.path(), "/src");
    assert_eq!(src.absolute_path(), "project/src");
    assert_eq!(index.path(), "/src/index.js");
    assert_eq!(index.parent(), Some(src.clone()));
    assert_eq!(
        index.url().unwrap(),
        "http://localhost:8080/project/src/index.js"
    );
    assert_eq!(names(&src), vec!["lib", "index.js"]);
    assert_eq!(src.get_child("lib").unwrap().status(), Status::Untouched);
}

#[tokio::test]
async fn test_external_changes_are_mirrored() {
    let storage = project_storage();
    let tree = Tree::builder("project")
        .storage(storage.clone())
        .build()
        .unwrap();
    let root = tree.root();
    _ = tree.open_directory("src").await.unwrap();
    let seen = record(root);

    // Another client adds a nested file and removes a directory
    storage.emit(WatchEvent::new(WatchEventKind::FileCreated, "/src/gen/out.js"));
    storage.emit(WatchEvent::new(WatchEventKind::DirectoryRemoved, "/test"));
    // A removal of the wrong kind is ignored
    storage.emit(WatchEvent::new(WatchEventKind::DirectoryRemoved, "/README.md"));

    assert_eq!(
        *seen.borrow(),
        vec![
            "node-added /src/gen 0",
            "node-added /src/gen/out.js 0",
            "node-removed /test 1",
        ]
    );
    assert!(root.get_child("README.md").is_some());
    assert!(root.get_child("test").is_none());
}

#[tokio::test]
async fn test_listener_reacts_by_reading() {
    let storage = project_storage();
    let tree = Tree::builder("project")
        .storage(storage.clone())
        .build()
        .unwrap();
    let root = tree.root();

    // A projection that expands every new directory as it appears
    let expanded = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = expanded.clone();
    _ = root
        .subscribe(move |event| {
            let node = event.node();
            if node.is_branch() {
                node.set("collapsed", false).unwrap();
                sink.borrow_mut().push(node.fs_read());
            }
        })
        .unwrap();

    root.fs_read().await.unwrap();
    let reads: Vec<_> = expanded.borrow_mut().drain(..).collect();
    assert_eq!(reads.len(), 2);
    for read in reads {
        read.await.unwrap();
    }

    // Reading src revealed lib, which the listener started reading too
    let lib = root.get_node_by_path("src/lib").unwrap();
    assert_eq!(lib.status(), Status::Loading);
    let reads: Vec<_> = expanded.borrow_mut().drain(..).collect();
    assert_eq!(reads.len(), 1);
    for read in reads {
        read.await.unwrap();
    }

    assert_eq!(lib.status(), Status::Loaded);
    assert_eq!(names(&lib), vec!["util.js"]);
    assert_eq!(
        root.get_child("src").unwrap().get("collapsed"),
        Some(serde_json::json!(false))
    );
    assert_eq!(
        root.get_node_by_path("test/index.test.js").map(|n| n.kind()),
        Some(NodeKind::Leaf)
    );
}

#[test]
fn test_model_only_tree() {
    let tree = Tree::new("workspace").unwrap();
    let root = tree.root();
    let docs = root
        .ensure_exists(NodeKind::Branch, "docs/guides", Properties::new())
        .unwrap();

    assert_eq!(docs.absolute_path(), "workspace/docs/guides");
    // Without storage, branches carry no defaults
    assert_eq!(docs.get("collapsed"), None);
    assert_eq!(
        docs.fs_create_directory("x").now_or_never(),
        Some(Err(Error::NoStorage))
    );
}
