// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The `filetree` explorer: browses and edits a host directory through a
//! lazily loaded tree.

pub mod commands;
pub mod common;
pub mod host;

pub use commands::{
    ls_command, mkdir_command, mv_command, rm_command, tree_command, touch_command,
};
pub use common::{ExplorerConfig, ExplorerContext, HostConfig};
pub use host::HostStorage;
