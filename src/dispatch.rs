// SPDX-License-Identifier: Apache-2.0

//! RPC dispatch (spec §4.6): routes a bound [`netconf_rpc::RpcRequest`]
//! to the datastore manager, transaction engine, binder, session
//! manager and notification bus. Plays the role the teacher's
//! `Dispatcher`/`Broker` pair plays together — request in, reply out —
//! collapsed into one synchronous call per spec §5's single-threaded
//! event loop instead of a cross-thread request/response handoff.

use netconf_rpc::{Category, Kind, Operation, RpcError, RpcReply, RpcRequest};

use crate::access::{AccessControl, Decision};
use crate::binder::{BindError, bind_tree, validate_constraints};
use crate::codec::TreeCodec;
use crate::datastore::{DatastoreError, DatastoreManager, EditOperation, SessionId};
use crate::filter::{PrefixFilter, TreeFilter};
use crate::notify::NotificationBus;
use crate::schema::SchemaRegistry;
use crate::session::SessionManager;
use crate::state::{StateDataProvider, assemble_state};
use crate::transaction::{CommitError, PendingConfirmation, Transaction, TransactionEngine};

const NAME: &str = "dispatch";

pub struct Dispatcher<'a> {
    pub datastores: DatastoreManager,
    pub sessions: SessionManager,
    pub engine: TransactionEngine,
    pub notifications: NotificationBus,
    pub access: Box<dyn AccessControl>,
    pub codec: Box<dyn TreeCodec>,
    pub registry: &'a dyn SchemaRegistry,
    pub namespace: String,
    pub pending_confirmation: Option<PendingConfirmation>,
    state_providers: Vec<Box<dyn StateDataProvider>>,
    filter: Box<dyn TreeFilter>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        failsafe_name: impl Into<String>,
        access: Box<dyn AccessControl>,
        codec: Box<dyn TreeCodec>,
        registry: &'a dyn SchemaRegistry,
        namespace: impl Into<String>,
    ) -> Self {
        let mut notifications = NotificationBus::new();
        notifications.add_stream("NETCONF", 256);
        Self {
            datastores: DatastoreManager::new(failsafe_name),
            sessions: SessionManager::new(),
            engine: TransactionEngine::new(),
            notifications,
            access,
            codec,
            registry,
            namespace: namespace.into(),
            pending_confirmation: None,
            state_providers: Vec::new(),
            filter: Box::new(PrefixFilter),
        }
    }

    /// Registers a state-data plugin (spec §6 "State data plugins")
    /// whose contributions are merged into every `get` reply.
    pub fn register_state_provider(&mut self, provider: Box<dyn StateDataProvider>) { self.state_providers.push(provider); }

    pub fn dispatch(&mut self, session: SessionId, req: RpcRequest) -> RpcReply {
        let operation_name = req.operation.to_string();
        if self.access.authorize(session, &operation_name, None) != Decision::Permit {
            return RpcReply::Error(RpcError::new(Category::Application, Kind::AccessDenied, format!("`{operation_name}` denied")));
        }
        log::debug!(target: NAME, "session {session:?}: {req}");
        match self.handle(session, req.operation) {
            Ok(reply) => reply,
            Err(err) => RpcReply::Error(err),
        }
    }

    fn handle(&mut self, session: SessionId, op: Operation) -> Result<RpcReply, RpcError> {
        match op {
            Operation::GetConfig { source, filter } => {
                let store = self.datastores.get(&source).map_err(to_rpc_error)?;
                let selected = self.filter.select(&store.tree, filter.as_deref());
                let bytes = self.codec.encode(&selected).map_err(|e| RpcError::internal(e.to_string()))?;
                Ok(RpcReply::Data(String::from_utf8_lossy(&bytes).into_owned()))
            }

            // get = get-config on running merged with state data
            // assembled by every registered plugin (spec §4.6).
            Operation::Get { filter } => {
                let store = self.datastores.get("running").map_err(to_rpc_error)?;
                let assembled = assemble_state(&store.tree, &self.state_providers);
                let selected = self.filter.select(&assembled, filter.as_deref());
                let bytes = self.codec.encode(&selected).map_err(|e| RpcError::internal(e.to_string()))?;
                Ok(RpcReply::Data(String::from_utf8_lossy(&bytes).into_owned()))
            }

            Operation::EditConfig { target, config, default_operation } => {
                let op = EditOperation::parse(default_operation.as_deref());
                let mut tree = self.codec.decode(config.as_bytes()).map_err(|e| RpcError::malformed(e.to_string()))?;
                bind_tree(&mut tree, &self.namespace, self.registry).map_err(to_bind_error)?;
                tree.canonicalize(self.registry);
                let store = self.datastores.get_mut(&target).map_err(to_rpc_error)?;
                store.require_unlocked_or_owned(session).map_err(to_rpc_error)?;
                store.put(tree, op, self.registry).map_err(to_rpc_error)?;
                Ok(RpcReply::Ok)
            }

            Operation::CopyConfig { source, target } => {
                let source_tree = self.datastores.get(&source).map_err(to_rpc_error)?.tree.clone();
                let target_store = self.datastores.get_mut(&target).map_err(to_rpc_error)?;
                target_store.require_unlocked_or_owned(session).map_err(to_rpc_error)?;
                target_store.tree = source_tree;
                target_store.dirty = true;
                Ok(RpcReply::Ok)
            }

            Operation::DeleteConfig { target } => {
                let store = self.datastores.get_mut(&target).map_err(to_rpc_error)?;
                if store.name == "running" {
                    return Err(RpcError::invalid_value("running cannot be deleted"));
                }
                store.require_unlocked_or_owned(session).map_err(to_rpc_error)?;
                store.tree = crate::tree::Tree::empty();
                store.dirty = false;
                Ok(RpcReply::Ok)
            }

            Operation::Lock { target } => {
                self.datastores.get_mut(&target).map_err(to_rpc_error)?.lock(session).map_err(to_rpc_error)?;
                Ok(RpcReply::Ok)
            }

            Operation::Unlock { target } => {
                self.datastores.get_mut(&target).map_err(to_rpc_error)?.unlock(session).map_err(to_rpc_error)?;
                Ok(RpcReply::Ok)
            }

            Operation::Validate { source } => {
                let store = self.datastores.get(&source).map_err(to_rpc_error)?;
                validate_constraints(&store.tree, &self.namespace, self.registry).map_err(to_bind_error)?;
                Ok(RpcReply::Ok)
            }

            Operation::Commit { confirmed, confirm_timeout_seconds } => self.commit(session, confirmed, confirm_timeout_seconds),

            Operation::DiscardChanges => {
                let running_tree = self.datastores.get("running").map_err(to_rpc_error)?.tree.clone();
                let candidate = self.datastores.get_mut("candidate").map_err(to_rpc_error)?;
                candidate.tree = running_tree;
                candidate.dirty = false;
                Ok(RpcReply::Ok)
            }

            Operation::CancelCommit { persist_id: _ } => self.cancel_commit(),

            Operation::CreateSubscription { stream, start_time_millis } => {
                let replay = self.notifications.subscribe(session, &stream, start_time_millis).map_err(|e| RpcError::internal(e.to_string()))?;
                for event in replay {
                    log::trace!(target: NAME, "replaying {event:?} to {session:?}");
                }
                Ok(RpcReply::Ok)
            }

            Operation::CloseSession => {
                self.datastores.release_all_locks(session);
                self.notifications.unsubscribe_session(session);
                self.sessions.close(session);
                Ok(RpcReply::Ok)
            }

            // Always replies `ok`, even for an already-absent session id,
            // since the caller's desired end state (that session no
            // longer exists) already holds — see SPEC_FULL.md §9.
            Operation::KillSession { session_id } => {
                let target = SessionId(session_id);
                self.datastores.release_all_locks(target);
                self.notifications.unsubscribe_session(target);
                self.sessions.close(target);
                Ok(RpcReply::Ok)
            }

            Operation::Custom { name, payload: _ } => Err(RpcError::operation_not_supported(&name)),
        }
    }

    fn commit(&mut self, session: SessionId, confirmed: bool, confirm_timeout_seconds: Option<u64>) -> Result<RpcReply, RpcError> {
        let candidate = self.datastores.get("candidate").map_err(to_rpc_error)?;
        if !candidate.dirty && self.pending_confirmation.is_none() {
            return Err(map_commit_error(CommitError::NothingToCommit));
        }
        let before = self.datastores.get("running").map_err(to_rpc_error)?.tree.clone();
        let after = candidate.tree.clone();
        let txn = Transaction::new(session, "candidate", "running", &self.namespace, before.clone(), after, self.registry);

        let running = self.datastores.get_mut("running").map_err(to_rpc_error)?;
        self.engine.run(&txn, running, self.registry).map_err(map_commit_error)?;

        if confirmed {
            self.pending_confirmation = Some(PendingConfirmation {
                token: self.sessions.len() as u64 + 1,
                rollback: before,
                deadline_secs: confirm_timeout_seconds.unwrap_or(600),
            });
        } else {
            self.pending_confirmation = None;
            let candidate = self.datastores.get_mut("candidate").map_err(to_rpc_error)?;
            candidate.dirty = false;
        }
        Ok(RpcReply::Ok)
    }

    fn cancel_commit(&mut self) -> Result<RpcReply, RpcError> {
        let pending = self.pending_confirmation.take().ok_or_else(|| map_commit_error(CommitError::NoPendingConfirmedCommit))?;
        let running = self.datastores.get_mut("running").map_err(to_rpc_error)?;
        running.tree = pending.rollback;
        Ok(RpcReply::Ok)
    }

    /// Called by the event loop on every tick (spec §5) to expire an
    /// unconfirmed confirmed-commit, rolling `running` back to its
    /// pre-commit snapshot.
    pub fn expire_confirmed_commit_if_due(&mut self, elapsed_secs: u64) {
        if let Some(pending) = &self.pending_confirmation {
            if elapsed_secs >= pending.deadline_secs {
                log::warn!(target: NAME, "confirmed commit timed out, rolling back");
                if let Ok(running) = self.datastores.get_mut("running") {
                    running.tree = pending.rollback.clone();
                }
                self.pending_confirmation = None;
            }
        }
    }
}

fn to_rpc_error(err: DatastoreError) -> RpcError {
    match err {
        DatastoreError::UnknownDatastore(name) => RpcError::invalid_value(format!("unknown datastore `{name}`")),
        DatastoreError::LockDenied(name, holder) => RpcError::lock_denied(&name, holder.0),
        DatastoreError::NotLocked(name) => RpcError::new(Category::Application, Kind::OperationFailed, format!("`{name}` is not locked")),
        DatastoreError::Unsupported(name) => RpcError::operation_not_supported(&name),
        DatastoreError::AlreadyExists(name) => RpcError::new(Category::Application, Kind::DataExists, format!("node `{name}` already exists")),
        DatastoreError::Missing(name) => RpcError::data_missing(format!("/{name}")),
    }
}

/// Constraint violations surface as the protocol's own `invalid-value`
/// (spec §8 Scenario 3); structural problems with the submitted tree
/// itself (unknown element, config=false in a writable datastore) are
/// `malformed-message`.
fn to_bind_error(err: BindError) -> RpcError {
    match err {
        BindError::ConstraintViolation(path, reason) => RpcError::invalid_value(format!("{path} {reason}")),
        BindError::MissingMandatory(path, leaf) => RpcError::invalid_value(format!("{path} is missing mandatory leaf `{leaf}`")),
        BindError::DuplicateKey(path, key) => RpcError::invalid_value(format!("{path} has a duplicate `{key}` key")),
        BindError::UnknownNode(path) => RpcError::malformed(format!("{path} has no matching schema node")),
        BindError::NotConfig(path) => RpcError::malformed(format!("{path} is config=false")),
    }
}

fn map_commit_error(err: CommitError) -> RpcError {
    match err {
        CommitError::Plugin(p) => RpcError::new(Category::Application, Kind::OperationFailed, p.to_string()),
        CommitError::Datastore(d) => to_rpc_error(d),
        CommitError::SchemaValidation(e) => to_bind_error(e),
        CommitError::NothingToCommit => RpcError::new(Category::Application, Kind::OperationFailed, "candidate has no pending changes"),
        CommitError::ConfirmationTimedOut => RpcError::new(Category::Application, Kind::OperationFailed, "confirmed commit timed out"),
        CommitError::NoPendingConfirmedCommit => {
            RpcError::new(Category::Application, Kind::OperationFailed, "no confirmed commit is pending cancellation")
        }
    }
}
