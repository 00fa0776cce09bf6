// SPDX-License-Identifier: Apache-2.0

//! Direct datastore file inspector, grounded on clixon's `dbctrl`: a
//! low-level tool that reads and edits a datastore's on-disk encoding
//! directly, bypassing sessions, locks and the commit pipeline
//! entirely. Useful for recovering from a corrupt `candidate` or for
//! offline inspection when the daemon is not running.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use netconfd::codec::{JsonTreeCodec, TreeCodec};
use netconfd::tree::{NodePath, Tree};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and edit a netconfd datastore file directly")]
struct Opts {
    /// Path to the datastore file.
    #[arg(short = 'd', long)]
    datastore: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an empty datastore.
    Init,
    /// Print every leaf path and value.
    Dump {
        /// Print only paths, not values.
        #[arg(short, long)]
        brief: bool,
    },
    /// Print leaf paths matching a substring.
    Match { pattern: String },
    /// Delete the datastore file.
    Zap,
}

fn main() -> ExitCode {
    let opts = Opts::parse();
    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("dbctrl: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(opts: Opts) -> Result<(), String> {
    match opts.command {
        Command::Init => {
            let tree = Tree::empty();
            write_tree(&opts.datastore, &tree)
        }
        Command::Zap => fs::remove_file(&opts.datastore).map_err(|e| e.to_string()),
        Command::Dump { brief } => {
            let tree = read_tree(&opts.datastore)?;
            for (path, value) in leaves(&tree) {
                match (&value, brief) {
                    (_, true) => println!("{path}"),
                    (Some(v), false) => println!("{path} = {v}"),
                    (None, false) => println!("{path}"),
                }
            }
            Ok(())
        }
        Command::Match { pattern } => {
            let tree = read_tree(&opts.datastore)?;
            for (path, _) in leaves(&tree).into_iter().filter(|(p, _)| p.to_string().contains(&pattern)) {
                println!("{path}");
            }
            Ok(())
        }
    }
}

fn read_tree(path: &PathBuf) -> Result<Tree, String> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    JsonTreeCodec.decode(&bytes).map_err(|e| e.to_string())
}

fn write_tree(path: &PathBuf, tree: &Tree) -> Result<(), String> {
    let bytes = JsonTreeCodec.encode(tree).map_err(|e| e.to_string())?;
    fs::write(path, bytes).map_err(|e| format!("cannot write {}: {e}", path.display()))
}

fn leaves(tree: &Tree) -> Vec<(NodePath, Option<netconfd::tree::Value>)> {
    let mut out = Vec::new();
    for root in &tree.roots {
        walk(root, NodePath::root(), &mut out);
    }
    out
}

fn walk(node: &netconfd::tree::Node, at: NodePath, out: &mut Vec<(NodePath, Option<netconfd::tree::Value>)>) {
    let path = at.child(&node.name.local);
    if node.is_leaf() {
        out.push((path, node.value.clone()));
        return;
    }
    for child in &node.children {
        walk(child, path.clone(), out);
    }
}
