// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use diagnostics::log_debug;

use crate::common::{ExplorerContext, open, render};

/// Opens `path` and prints the loaded tree below it
pub async fn ls_command(
    ctx: &ExplorerContext,
    path: &str,
    mut handler: impl FnMut(String),
) -> Result<()> {
    let tree = ctx.build_tree()?;
    let node = open(&tree, path).await?;
    let count = node.child_count();
    log_debug!("ls {path}: {count} entries", path: path, count: count);

    for line in render(&node, None) {
        handler(line);
    }
    Ok(())
}
