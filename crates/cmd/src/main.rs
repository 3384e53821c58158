// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::task::LocalSet;

use cmd::ExplorerContext;
use cmd::commands::{
    ls_command, mkdir_command, mv_command, rm_command, touch_command, tree_command,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "filetree")]
struct Cli {
    /// Host directory to explore
    #[arg(long, env = "FILETREE_ROOT", global = true)]
    root: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a directory and show what was loaded
    Ls {
        /// Directory path relative to the root
        #[arg(default_value = "")]
        path: String,
    },
    /// Load several levels through the preloader and show them
    Tree {
        /// Number of levels to load
        #[arg(short, long, default_value_t = 3)]
        depth: usize,
    },
    /// Create a directory
    Mkdir {
        path: String,
    },
    /// Create a file
    Touch {
        path: String,
        /// Optional content for the file
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Remove a file or directory
    Rm {
        path: String,
    },
    /// Move an entry into another directory
    Mv {
        src: String,
        dest_dir: String,
    },
}

async fn run(ctx: &ExplorerContext, command: &Commands, handler: impl FnMut(String)) -> Result<()> {
    match command {
        Commands::Ls { path } => ls_command(ctx, path, handler).await,
        Commands::Tree { depth } => tree_command(ctx, *depth, handler).await,
        Commands::Mkdir { path } => mkdir_command(ctx, path, handler).await,
        Commands::Touch { path, content } => {
            touch_command(ctx, path, content.as_deref(), handler).await
        }
        Commands::Rm { path } => rm_command(ctx, path, handler).await,
        Commands::Mv { src, dest_dir } => mv_command(ctx, src, dest_dir, handler).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    diagnostics::init();

    let cli = Cli::parse();
    let ctx = ExplorerContext::new(cli.root, cli.config.as_deref())?;

    let mut lines = Vec::new();
    LocalSet::new()
        .run_until(run(&ctx, &cli.command, |line| lines.push(line)))
        .await?;

    let mut stdout = std::io::stdout().lock();
    for line in lines {
        writeln!(stdout, "{line}")?;
    }
    Ok(())
}
