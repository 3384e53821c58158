// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;

use crate::common::{ExplorerContext, open, render, resolve};

/// Moves `src` into the directory `dest_dir`
pub async fn mv_command(
    ctx: &ExplorerContext,
    src: &str,
    dest_dir: &str,
    mut handler: impl FnMut(String),
) -> Result<()> {
    let tree = ctx.build_tree()?;
    let node = resolve(&tree, src).await?;
    let dest = open(&tree, dest_dir).await?;

    tree.root().fs_move(&node, &dest).await?;

    for line in render(tree.root(), None) {
        handler(line);
    }
    Ok(())
}
