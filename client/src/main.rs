// SPDX-License-Identifier: Apache-2.0

//! Command-line interface to netconfd.

#[macro_use]
extern crate log;

mod args;

use clap::Parser;
use loglevel::LogLevel;
use netconf_client::{Client, ClientError};
use netconf_rpc::{Operation, RpcReply};

use crate::args::{Args, Command};

fn main() -> Result<(), ClientError> {
    let args = Args::parse();
    LogLevel::from_verbosity_flag_count(args.verbose).apply();
    trace!("Command-line arguments: {:#?}", &args);

    let mut client = Client::connect(&args.remote)?;
    let operation = match args.command {
        Command::GetConfig { source } => Operation::GetConfig { source, filter: None },
        Command::EditConfig { target, config } => Operation::EditConfig { target, config, default_operation: None },
        Command::CopyConfig { source, target } => Operation::CopyConfig { source, target },
        Command::Lock { target } => Operation::Lock { target },
        Command::Unlock { target } => Operation::Unlock { target },
        Command::Commit { confirmed, confirm_timeout_seconds } => Operation::Commit { confirmed, confirm_timeout_seconds },
        Command::DiscardChanges => Operation::DiscardChanges,
        Command::CancelCommit => Operation::CancelCommit { persist_id: None },
        Command::CloseSession => Operation::CloseSession,
    };

    let reply = client.call(operation)?;
    print_reply(reply);
    Ok(())
}

fn print_reply(reply: RpcReply) {
    match reply {
        RpcReply::Ok => println!("ok"),
        RpcReply::Data(data) => println!("{data}"),
        RpcReply::SessionId(id) => println!("session-id: {id}"),
        RpcReply::Error(err) => eprintln!("error: {err}"),
        RpcReply::Notification { stream, timestamp_millis, payload } => {
            println!("notification[{stream}@{timestamp_millis}]: {payload}")
        }
    }
}
