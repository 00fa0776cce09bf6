// SPDX-License-Identifier: Apache-2.0

use crate::RpcError;

#[derive(Clone, Debug, Display)]
#[derive(Serialize, Deserialize)]
pub enum RpcReply {
    #[display("ok")]
    Ok,

    #[display("data(...)")]
    Data(String),

    #[display("session-id({0})")]
    SessionId(u64),

    #[display("error({0})")]
    Error(RpcError),

    #[display("notification({stream}, ...)")]
    Notification { stream: String, timestamp_millis: u64, payload: String },
}

impl RpcReply {
    pub fn is_ok(&self) -> bool { matches!(self, RpcReply::Ok | RpcReply::Data(_) | RpcReply::SessionId(_)) }
}
