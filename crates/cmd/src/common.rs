// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use filetree::{Node, Status, Tree, TreeConfig};
use serde::{Deserialize, Serialize};

use crate::host::HostStorage;

/// Settings of the host storage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Artificial delay added to every storage call
    pub latency_ms: u64,
}

/// Contents of the `--config` YAML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplorerConfig {
    pub tree: TreeConfig,
    pub host: HostConfig,
}

impl ExplorerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: ExplorerConfig = serde_yaml_ng::from_str(text)?;
        config.tree.preload.validate()?;
        Ok(config)
    }
}

/// Where and how the explorer runs
pub struct ExplorerContext {
    pub root: PathBuf,
    pub config: ExplorerConfig,
}

impl ExplorerContext {
    pub fn new(root: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let root = root.ok_or_else(|| anyhow!("no root given: pass --root or set FILETREE_ROOT"))?;
        let config = match config_path {
            Some(path) => ExplorerConfig::load(path)?,
            None => ExplorerConfig::default(),
        };
        Ok(Self { root, config })
    }

    pub fn with_config(root: PathBuf, config: ExplorerConfig) -> Self {
        Self { root, config }
    }

    /// A tree over the host root, using the context's configuration
    pub fn build_tree(&self) -> Result<Tree> {
        self.build_tree_with(self.config.tree.clone())
    }

    pub fn build_tree_with(&self, config: TreeConfig) -> Result<Tree> {
        let latency = match self.config.host.latency_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        let storage = HostStorage::new(&self.root, latency)?;
        let label = self
            .root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string());
        Ok(Tree::builder(label).storage(storage).config(config).build()?)
    }
}

/// Reads whatever is needed so that `path` and its parent are loaded, then
/// returns the node at `path`
pub async fn resolve(tree: &Tree, path: &str) -> Result<Node> {
    _ = tree.open_directory(&filetree::path::dirname(path)).await?;
    tree.get_node_by_path(path)
        .ok_or_else(|| anyhow!("no such entry: {path}"))
}

/// Opens the directory at `path`, reading it and every unread ancestor
pub async fn open(tree: &Tree, path: &str) -> Result<Node> {
    _ = tree.open_directory(path).await?;
    tree.get_node_by_path(path)
        .ok_or_else(|| anyhow!("no such directory: {path}"))
}

/// Renders the loaded part of the tree below `node`, one line per node.
///
/// Branches end in `/`; branches whose contents were never read are marked
/// with `...`. `max_depth` limits how far below `node` lines are produced.
pub fn render(node: &Node, max_depth: Option<usize>) -> Vec<String> {
    let mut lines = Vec::new();
    let label = if node.is_root() {
        node.absolute_path()
    } else {
        node.name()
    };
    lines.push(format!("{}{}", label, suffix(node)));
    render_children(node, 1, max_depth, &mut lines);
    lines
}

fn render_children(node: &Node, depth: usize, max_depth: Option<usize>, lines: &mut Vec<String>) {
    if max_depth.is_some_and(|max| depth > max) {
        return;
    }
    for child in node.children() {
        lines.push(format!("{}{}{}", "  ".repeat(depth), child.name(), suffix(&child)));
        render_children(&child, depth + 1, max_depth, lines);
    }
}

fn suffix(node: &Node) -> &'static str {
    if node.is_leaf() {
        ""
    } else if node.status() == Status::Loaded {
        "/"
    } else {
        "/ ..."
    }
}
