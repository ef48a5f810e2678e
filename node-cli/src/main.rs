// Copyright (c) Chainware
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use node_config::NodeConfig;
use state_store::error::StateStoreError;
use state_store::vm::MockVm;
use state_store::StateStore;
use std::path::PathBuf;
use std::sync::Arc;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(about = "Operator tooling for the node's storage layer")]
struct Opt {
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Truncate the block-root and state-root accumulators, and the
    /// height-keyed state-root index, back to `height`.
    Revert {
        #[structopt(long)]
        height: u64,
    },
    /// Print the current committed height and Merkle roots.
    Status,
}

fn load_config(opt: &Opt) -> Result<NodeConfig> {
    match &opt.config {
        Some(path) => NodeConfig::load(path),
        None => Ok(NodeConfig::default()),
    }
}

/// Runs the requested subcommand. Kept separate from `main` so the exit
/// code can be chosen from the returned error's concrete cause instead
/// of falling back to `Termination`'s blanket exit-1-on-`Err`.
fn run(opt: Opt) -> Result<()> {
    let config = load_config(&opt)?;
    let store = StateStore::open(&config.storage.data_dir, Arc::new(MockVm), config.effective_state_hash_height)
        .with_context(|| format!("failed to open store at {}", config.storage.data_dir.display()))?;

    match opt.cmd {
        Command::Revert { height } => {
            store.revert_to_height(height)?;
            println!("reverted to height {}", height);
        }
        Command::Status => {
            let height = store.current_height()?;
            println!("height: {:?}", height);
            println!("block root: {}", store.block_root());
        }
    }
    Ok(())
}

fn main() {
    node_logger::init();
    let opt = Opt::from_args();
    if let Err(err) = run(opt) {
        eprintln!("error: {:#}", err);
        let exit_code = match err.downcast_ref::<StateStoreError>() {
            Some(StateStoreError::InvalidHeight { .. }) => 2,
            _ => 1,
        };
        std::process::exit(exit_code);
    }
}
