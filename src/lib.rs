// SPDX-License-Identifier: Apache-2.0

//! `netconfd`: a NETCONF-style configuration datastore backend.
//!
//! The core model is a labelled configuration [`tree`] bound against a
//! [`schema`] registry, held in named [`datastore`]s (`running`,
//! `candidate`, `startup`, plus any operator-defined failsafe store)
//! and moved between them through a [`transaction`] engine whose
//! ordered plugin callbacks mirror a two-phase commit. [`differ`]
//! computes the change vectors the commit engine and [`notify`]
//! subsystem both need. [`dispatch`] is the RPC entry point tying all
//! of the above to a [`session`] and an [`access`] control decision,
//! additionally merging in [`state`] data and applying a [`filter`] on
//! the way out for `get`/`get-config`.

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate serde;

pub mod access;
pub mod binder;
pub mod codec;
pub mod config;
pub mod datastore;
pub mod differ;
pub mod dispatch;
pub mod filter;
pub mod multiplexer;
pub mod notify;
pub mod schema;
pub mod session;
pub mod state;
pub mod transaction;
pub mod tree;

pub use config::Config;
pub use datastore::SessionId;
