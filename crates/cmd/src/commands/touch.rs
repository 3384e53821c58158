// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Result, anyhow};
use diagnostics::log_info;

use crate::common::{ExplorerContext, open, render};

pub async fn touch_command(
    ctx: &ExplorerContext,
    path: &str,
    content: Option<&str>,
    mut handler: impl FnMut(String),
) -> Result<()> {
    let tree = ctx.build_tree()?;
    let name = filetree::path::basename(path).ok_or_else(|| anyhow!("missing file name"))?;
    let parent = open(&tree, &filetree::path::dirname(path)).await?;

    let bytes = content.unwrap_or_default().as_bytes();
    parent.fs_create_file(&name, bytes).await?;
    let size = bytes.len();
    log_info!("File created: {path} ({size} bytes)", path: path, size: size);

    for line in render(&parent, None) {
        handler(line);
    }
    Ok(())
}
