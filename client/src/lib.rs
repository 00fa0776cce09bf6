// SPDX-License-Identifier: Apache-2.0

//! Thin synchronous client for a `netconfd` server: opens one TCP
//! connection, writes a length-prefixed JSON-encoded
//! [`netconf_rpc::RpcRequest`] and reads back the matching
//! [`netconf_rpc::RpcReply`]. One request in flight at a time, mirroring
//! the teacher's blocking `RgbClient` rather than its async variant,
//! since `netconf-cli` is a one-shot command-line tool, not a
//! long-lived agent.

use std::io::{self, Read, Write};
use std::net::TcpStream;

use amplify::{Display, Error, From};
use netconf_rpc::{RpcReply, RpcRequest};

pub struct Client {
    stream: TcpStream,
    next_id: u64,
}

impl Client {
    pub fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        Ok(Self { stream, next_id: 1 })
    }

    pub fn call(&mut self, operation: netconf_rpc::Operation) -> Result<RpcReply, ClientError> {
        let id = self.next_id;
        self.next_id += 1;
        let request = RpcRequest { id, operation };
        let body = serde_json::to_vec(&request)?;
        let len = (body.len() as u32).to_be_bytes();
        self.stream.write_all(&len)?;
        self.stream.write_all(&body)?;

        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        self.stream.read_exact(&mut buf)?;
        Ok(serde_json::from_slice(&buf)?)
    }
}

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum ClientError {
    #[from]
    Io(io::Error),
    #[from]
    Json(serde_json::Error),
}
