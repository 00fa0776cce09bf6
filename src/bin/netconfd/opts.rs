// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "NETCONF-style configuration datastore backend")]
pub struct Opts {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "NETCONFD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen for client connections on.
    #[arg(short, long, env = "NETCONFD_LISTEN")]
    pub listen: Option<String>,

    /// Set verbosity level.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Prepare the persistence layer for first use.
    Init,
}
