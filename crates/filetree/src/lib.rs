// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Filetree - an in-memory tree that mirrors a remote hierarchical store
//!
//! The tree is built lazily, one directory read at a time, and kept in step
//! with the store through its watch notifications. Structural changes are
//! announced as events that bubble from the changed branch up to the root.
//!
//! Set FILETREE_LOG to control logging (see the `diagnostics` crate).

// Error types
pub mod error;

// Path strings relative to the root
pub mod path;

/// Nodes and their property bags
pub mod node;

/// Child management, lookup and reconciliation primitives
pub mod branch;

/// Structural events and listeners
pub mod event;

// Node construction hook
pub mod factory;

/// The storage contract
pub mod storage;

// Directory reads and storage-backed mutations
pub mod remote;

// Watch notification handling
pub mod watch;

/// Speculative load queue
pub mod preload;

pub mod config;

pub mod tree;

/// In-memory storage, used by tests and demos
pub mod memory;

pub use branch::DeepestNode;
pub use config::{MutationPolicy, PreloadConfig, TreeConfig};
pub use error::{Error, Result};
pub use event::{SubscriptionId, TreeEvent};
pub use factory::{DirectoryFactory, NodeFactory, PlainFactory};
pub use memory::MemoryStorage;
pub use node::{Node, NodeKind, Properties, Status};
pub use preload::Preloader;
pub use remote::ReadFuture;
pub use storage::{DirEntry, Storage, WatchEvent, WatchEventKind, WatchHandler, validate_storage};
pub use tree::{Tree, TreeBuilder};

#[cfg(test)]
mod tests;
