// SPDX-License-Identifier: Apache-2.0

use clap::{Parser, Subcommand};

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Command-line interface to netconfd")]
pub struct Args {
    /// Address of the netconfd server.
    #[arg(short, long, default_value = "127.0.0.1:8830")]
    pub remote: String,

    /// Set verbosity level.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Read a datastore's configuration.
    GetConfig {
        #[arg(default_value = "running")]
        source: String,
    },
    /// Replace a datastore's configuration with a JSON document.
    EditConfig {
        #[arg(default_value = "candidate")]
        target: String,
        /// JSON-encoded configuration tree.
        config: String,
    },
    /// Copy one datastore's configuration into another.
    CopyConfig { source: String, target: String },
    /// Acquire an exclusive lock on a datastore.
    Lock { target: String },
    /// Release a previously acquired lock.
    Unlock { target: String },
    /// Commit `candidate` into `running`.
    Commit {
        #[arg(long)]
        confirmed: bool,
        #[arg(long)]
        confirm_timeout_seconds: Option<u64>,
    },
    /// Discard uncommitted changes in `candidate`.
    DiscardChanges,
    /// Cancel a pending confirmed commit, rolling `running` back.
    CancelCommit,
    /// Gracefully close the current session.
    CloseSession,
}
