// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};

use crate::common::{ExplorerContext, render, resolve};

pub async fn rm_command(
    ctx: &ExplorerContext,
    path: &str,
    mut handler: impl FnMut(String),
) -> Result<()> {
    let tree = ctx.build_tree()?;
    let node = resolve(&tree, path).await?;
    let parent = node
        .parent()
        .ok_or_else(|| anyhow!("cannot remove the root"))?;

    node.fs_remove().await?;

    for line in render(&parent, None) {
        handler(line);
    }
    Ok(())
}
