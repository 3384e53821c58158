// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};
use diagnostics::log_info;
use filetree::{Node, TreeConfig};

use crate::common::{ExplorerContext, render};

/// Loads `depth` levels below the root, one level at a time through the
/// preloader, and prints the result.
///
/// Must run inside a `tokio::task::LocalSet`.
pub async fn tree_command(
    ctx: &ExplorerContext,
    depth: usize,
    mut handler: impl FnMut(String),
) -> Result<()> {
    let config = TreeConfig {
        enable_preload: true,
        ..ctx.config.tree.clone()
    };
    let tree = ctx.build_tree_with(config)?;
    let preloader = tree
        .preloader()
        .ok_or_else(|| anyhow!("preloading is not available"))?;
    let root = tree.root();
    if depth > 0 {
        root.fs_read().await?;
    }

    let mut level: Vec<Node> = vec![root.clone()];
    for current in 1..depth {
        let branches: Vec<Node> = level
            .iter()
            .flat_map(Node::children)
            .filter(Node::is_branch)
            .collect();
        if branches.is_empty() {
            break;
        }
        for branch in &branches {
            _ = tree.preload_branch(branch);
        }
        preloader.idle().await;
        let count = branches.len();
        log_info!("loaded level {current}: {count} directories", current: current, count: count);
        level = branches;
    }

    for line in render(root, Some(depth)) {
        handler(line);
    }
    Ok(())
}
