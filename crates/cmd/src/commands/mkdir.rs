// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};
use diagnostics::log_info;

use crate::common::{ExplorerContext, open, render};

pub async fn mkdir_command(
    ctx: &ExplorerContext,
    path: &str,
    mut handler: impl FnMut(String),
) -> Result<()> {
    let tree = ctx.build_tree()?;
    let name = filetree::path::basename(path).ok_or_else(|| anyhow!("missing directory name"))?;
    let parent = open(&tree, &filetree::path::dirname(path)).await?;

    parent.fs_create_directory(&name).await?;
    log_info!("Directory created: {path}", path: path);

    for line in render(&parent, None) {
        handler(line);
    }
    Ok(())
}
