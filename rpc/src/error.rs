// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;

/// RPC-level failure categories, paralleling the `<rpc-error>`
/// `error-type`/`error-tag` split of the protocol this crate models
/// without depending on its wire encoding (spec §1 Non-goals).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display(doc_comments)]
#[derive(Serialize, Deserialize)]
#[repr(u8)]
pub enum Category {
    /// transport layer
    Transport = 0,
    /// rpc layer
    Rpc = 1,
    /// protocol layer
    Protocol = 2,
    /// application layer
    Application = 3,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
#[display(doc_comments)]
#[derive(Serialize, Deserialize)]
#[repr(u8)]
pub enum Kind {
    /// in-use
    InUse = 1,
    /// invalid-value
    InvalidValue = 2,
    /// access-denied
    AccessDenied = 3,
    /// lock-denied
    LockDenied = 4,
    /// resource-denied
    ResourceDenied = 5,
    /// rollback-failed
    RollbackFailed = 6,
    /// data-exists
    DataExists = 7,
    /// data-missing
    DataMissing = 8,
    /// operation-not-supported
    OperationNotSupported = 9,
    /// operation-failed
    OperationFailed = 10,
    /// malformed-message
    MalformedMessage = 11,
    /// unknown-session
    UnknownSession = 12,
    /// internal-error (not part of the protocol's own vocabulary, used
    /// for defects on this side of the interface)
    InternalError = 0xFF,
}

#[derive(Clone, Eq, PartialEq, Debug)]
#[derive(Serialize, Deserialize)]
pub struct RpcError {
    pub category: Category,
    pub kind: Kind,
    pub message: String,
    pub info: BTreeMap<String, String>,
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.category, self.kind, self.message)
    }
}

impl std::error::Error for RpcError {}

impl RpcError {
    pub fn new(category: Category, kind: Kind, message: impl Into<String>) -> Self {
        Self { category, kind, message: message.into(), info: BTreeMap::new() }
    }

    pub fn with_info(mut self, key: &str, value: impl ToString) -> Self {
        let _ = self.info.insert(key.to_string(), value.to_string());
        self
    }

    pub fn lock_denied(datastore: &str, holder: u64) -> Self {
        Self::new(Category::Protocol, Kind::LockDenied, format!("datastore `{datastore}` is locked"))
            .with_info("datastore", datastore)
            .with_info("session-id", holder)
    }

    pub fn invalid_value(message: impl Into<String>) -> Self { Self::new(Category::Protocol, Kind::InvalidValue, message) }

    pub fn data_missing(path: impl fmt::Display) -> Self {
        Self::new(Category::Application, Kind::DataMissing, format!("no data at {path}")).with_info("path", path)
    }

    pub fn unknown_session(id: u64) -> Self {
        Self::new(Category::Rpc, Kind::UnknownSession, format!("session {id} does not exist"))
    }

    pub fn operation_not_supported(operation: &str) -> Self {
        Self::new(Category::Application, Kind::OperationNotSupported, format!("operation `{operation}` is not supported"))
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(Category::Protocol, Kind::MalformedMessage, message)
    }

    pub fn internal(message: impl Into<String>) -> Self { Self::new(Category::Application, Kind::InternalError, message) }
}
