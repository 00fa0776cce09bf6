// SPDX-License-Identifier: Apache-2.0

//! RPC request envelope (spec §2, §4.6). `Operation` enumerates the
//! base protocol operations this backend dispatches (spec §4.6
//! "Built-in operations"); `anydata`-carrying input/output for
//! extension RPCs is represented by [`Operation::Custom`].

#[derive(Clone, Debug, Display)]
#[derive(Serialize, Deserialize)]
pub enum Operation {
    #[display("get-config({source})")]
    GetConfig { source: String, filter: Option<String> },

    #[display("edit-config({target})")]
    EditConfig { target: String, config: String, default_operation: Option<String> },

    #[display("copy-config({source} -> {target})")]
    CopyConfig { source: String, target: String },

    #[display("delete-config({target})")]
    DeleteConfig { target: String },

    #[display("lock({target})")]
    Lock { target: String },

    #[display("unlock({target})")]
    Unlock { target: String },

    #[display("get")]
    Get { filter: Option<String> },

    #[display("close-session")]
    CloseSession,

    #[display("kill-session({session_id})")]
    KillSession { session_id: u64 },

    #[display("commit")]
    Commit { confirmed: bool, confirm_timeout_seconds: Option<u64> },

    #[display("discard-changes")]
    DiscardChanges,

    #[display("cancel-commit")]
    CancelCommit { persist_id: Option<u64> },

    #[display("validate({source})")]
    Validate { source: String },

    #[display("create-subscription({stream})")]
    CreateSubscription { stream: String, start_time_millis: Option<u64> },

    #[display("custom({name})")]
    Custom { name: String, payload: String },
}

#[derive(Clone, Debug, Display)]
#[display("rpc #{id}: {operation}")]
#[derive(Serialize, Deserialize)]
pub struct RpcRequest {
    pub id: u64,
    pub operation: Operation,
}
