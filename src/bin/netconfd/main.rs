// SPDX-License-Identifier: Apache-2.0

mod opts;

use std::process::{ExitCode, Termination};
use std::time::{Duration, Instant};

use clap::Parser;
use loglevel::LogLevel;
use netconf_rpc::RpcRequest;
use netconfd::access::AllowAll;
use netconfd::codec::JsonTreeCodec;
use netconfd::config::Config;
use netconfd::dispatch::Dispatcher;
use netconfd::multiplexer::{EventMultiplexer, Incoming, StdMultiplexer};
use netconfd::schema::StaticRegistry;

use crate::opts::{Command, Opts};

struct Status(Result<(), String>);

impl Termination for Status {
    fn report(self) -> ExitCode {
        match self.0 {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("Error: {err}");
                ExitCode::FAILURE
            }
        }
    }
}

/// Placeholder schema (spec §1 Non-goals, "YANG schema compiler"): a
/// real deployment loads a compiled registry here instead. Kept tiny
/// on purpose, just enough to let the daemon serve `system/hostname`
/// out of the box.
fn bootstrap_registry() -> StaticRegistry {
    let mut registry = StaticRegistry::new();
    let module = registry.add_module("urn:netconfd:system", "netconfd-system");
    let sys = registry.add_container(module, None, "system");
    registry.add_leaf(
        module,
        Some(sys),
        "hostname",
        false,
        true,
        Some(netconfd::tree::Value::String("localhost".into())),
        netconfd::schema::TypeDescriptor { base: "string".into(), constraints: vec![] },
    );
    registry
}

fn main() -> Status {
    let opts = Opts::parse();
    LogLevel::from_verbosity_flag_count(opts.verbose).apply();
    log::debug!("Command-line arguments: {opts:#?}");

    match opts.command {
        Some(Command::Init) => {
            eprintln!("netconfd: nothing to initialize for the in-memory reference datastore backend");
            Status(Ok(()))
        }
        None => Status(run(opts)),
    }
}

fn run(opts: Opts) -> Result<(), String> {
    let conf = match &opts.config {
        Some(path) => Config::load(path).map_err(|e| e.to_string())?,
        None => Config::default(),
    };

    let registry = bootstrap_registry();
    let mut dispatcher = Dispatcher::new(conf.failsafe_datastore_name.clone(), Box::new(AllowAll), Box::new(JsonTreeCodec), &registry, "urn:netconfd:system");

    let listen_addr = opts.listen.unwrap_or_else(|| "127.0.0.1:8830".to_string());
    let mut mux = StdMultiplexer::bind_tcp(&listen_addr).map_err(|e| e.to_string())?;
    log::info!("netconfd listening on {listen_addr}");

    let start = Instant::now();
    loop {
        let events = mux.poll().map_err(|e| e.to_string())?;
        for event in events {
            match event {
                Incoming::Connected(session_id, identity) => {
                    dispatcher.sessions.open(identity, start.elapsed().as_millis() as u64);
                    log::info!("session {session_id:?} connected");
                }
                Incoming::Disconnected(session_id) => {
                    dispatcher.datastores.release_all_locks(session_id);
                    dispatcher.sessions.close(session_id);
                }
                Incoming::Frame(session_id, bytes) => {
                    let reply = match serde_json::from_slice::<RpcRequest>(&bytes) {
                        Ok(req) => dispatcher.dispatch(session_id, req),
                        Err(err) => netconf_rpc::RpcReply::Error(netconf_rpc::RpcError::malformed(err.to_string())),
                    };
                    if let Ok(out) = serde_json::to_vec(&reply) {
                        let _ = mux.send(session_id, &out);
                    }
                }
            }
        }
        dispatcher.expire_confirmed_commit_if_due(start.elapsed().as_secs());
        std::thread::sleep(Duration::from_millis(20));
    }
}
