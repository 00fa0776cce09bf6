// SPDX-License-Identifier: Apache-2.0

//! Wire-level types shared between `netconfd` and its clients: the RPC
//! request/reply envelope and the error vocabulary (spec §4.6). The
//! actual byte encoding of these types is out of scope (spec §1
//! Non-goals, "low-level serialization format") — this crate only
//! fixes their Rust shape and `serde` derives, leaving the choice of
//! encoder to whatever transport wraps a session.

#[macro_use]
extern crate amplify;
#[macro_use]
extern crate serde;

mod error;
mod reply;
mod request;

pub use error::{Category, Kind, RpcError};
pub use reply::RpcReply;
pub use request::{Operation, RpcRequest};
