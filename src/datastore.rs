// SPDX-License-Identifier: Apache-2.0

//! Named configuration datastores (spec §2, §4.3): `running`,
//! `candidate`, `startup` and operator-defined extras, each holding one
//! [`Tree`] plus an optional session lock.

use amplify::{Display, Error, From};

use crate::schema::SchemaRegistry;
use crate::tree::{Node, NodeKind, Tree};

/// `default-operation`/per-node `operation` values a `put` accepts
/// (spec §4.3 "put(op)"). Unset or unrecognized values fall back to
/// `merge`, mirroring NETCONF's own default-operation default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditOperation {
    Merge,
    Replace,
    Create,
    Delete,
    Remove,
    None,
}

impl EditOperation {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("replace") => EditOperation::Replace,
            Some("create") => EditOperation::Create,
            Some("delete") => EditOperation::Delete,
            Some("remove") => EditOperation::Remove,
            Some("none") => EditOperation::None,
            Some("merge") | None | Some(_) => EditOperation::Merge,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub u64);

/// `none` means unlocked; `default` means "operate against whatever is
/// the system's failsafe". Left as a plain `Option` rather than a
/// richer lock-mode enum since spec §4.3 only ever grants exclusive
/// locks, not shared/read locks.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lock(pub Option<SessionId>);

impl Lock {
    pub fn is_held_by(&self, session: SessionId) -> bool { self.0 == Some(session) }
    pub fn is_locked(&self) -> bool { self.0.is_some() }
}

pub struct Datastore {
    pub name: String,
    pub tree: Tree,
    pub lock: Lock,
    /// Set for `candidate`: true once `edit-config` or `copy-config`
    /// has touched it since the last commit or discard (spec §4.3
    /// "Candidate dirty flag").
    pub dirty: bool,
}

impl Datastore {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), tree: Tree::empty(), lock: Lock::default(), dirty: false } }

    pub fn lock(&mut self, session: SessionId) -> Result<(), DatastoreError> {
        match self.lock.0 {
            Some(holder) if holder != session => Err(DatastoreError::LockDenied(self.name.clone(), holder)),
            _ => {
                self.lock.0 = Some(session);
                Ok(())
            }
        }
    }

    pub fn unlock(&mut self, session: SessionId) -> Result<(), DatastoreError> {
        match self.lock.0 {
            Some(holder) if holder == session => {
                self.lock.0 = None;
                Ok(())
            }
            Some(holder) => Err(DatastoreError::LockDenied(self.name.clone(), holder)),
            None => Err(DatastoreError::NotLocked(self.name.clone())),
        }
    }

    /// Releases a lock unconditionally, regardless of holder. Used when
    /// a session closes or is killed (spec §2 "close-session",
    /// "kill-session").
    pub fn force_unlock(&mut self) { self.lock.0 = None; }

    pub fn require_unlocked_or_owned(&self, session: SessionId) -> Result<(), DatastoreError> {
        match self.lock.0 {
            Some(holder) if holder != session => Err(DatastoreError::LockDenied(self.name.clone(), holder)),
            _ => Ok(()),
        }
    }

    /// Applies `incoming` under `op` (spec §4.3 "put"). `replace` swaps
    /// the whole tree; `none` leaves it untouched; `merge`/`create`/
    /// `delete`/`remove` recurse sibling-by-sibling so an edit that only
    /// touches one subtree doesn't discard the rest of the tree.
    pub fn put(&mut self, incoming: Tree, op: EditOperation, registry: &dyn SchemaRegistry) -> Result<(), DatastoreError> {
        match op {
            EditOperation::Replace => {
                self.tree = incoming;
                self.dirty = true;
            }
            EditOperation::None => {}
            EditOperation::Merge | EditOperation::Create | EditOperation::Delete | EditOperation::Remove => {
                merge_siblings(&mut self.tree.roots, incoming.roots, op, registry)?;
                self.dirty = true;
            }
        }
        Ok(())
    }
}

fn identity_matches(a: &Node, b: &Node, registry: &dyn SchemaRegistry) -> bool {
    if a.name != b.name {
        return false;
    }
    if a.kind == NodeKind::List {
        if let Some(schema_id) = a.schema.or(b.schema) {
            if let Some(keys) = registry.key_names(schema_id) {
                return a.key_tuple(&keys) == b.key_tuple(&keys);
            }
        }
    }
    true
}

fn merge_siblings(existing: &mut Vec<Node>, incoming: Vec<Node>, op: EditOperation, registry: &dyn SchemaRegistry) -> Result<(), DatastoreError> {
    for node in incoming {
        let found = existing.iter().position(|e| identity_matches(e, &node, registry));
        match op {
            EditOperation::Delete => {
                let idx = found.ok_or_else(|| DatastoreError::Missing(node.name.local.clone()))?;
                existing.remove(idx);
            }
            EditOperation::Remove => {
                if let Some(idx) = found {
                    existing.remove(idx);
                }
            }
            EditOperation::Create => {
                if found.is_some() {
                    return Err(DatastoreError::AlreadyExists(node.name.local.clone()));
                }
                existing.push(node);
            }
            EditOperation::Merge => match found {
                Some(idx) if node.is_leaf() => existing[idx].value = node.value,
                Some(idx) => merge_siblings(&mut existing[idx].children, node.children, op, registry)?,
                None => existing.push(node),
            },
            EditOperation::Replace | EditOperation::None => unreachable!("handled by Datastore::put"),
        }
    }
    Ok(())
}

#[derive(Clone, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum DatastoreError {
    /// datastore `{0}` is unknown
    UnknownDatastore(String),
    /// datastore `{0}` is locked by session {1:?}
    LockDenied(String, SessionId),
    /// datastore `{0}` is not locked
    NotLocked(String),
    /// datastore `{0}` does not support this operation
    Unsupported(String),
    /// node `{0}` already exists
    AlreadyExists(String),
    /// node `{0}` does not exist
    Missing(String),
}

/// Registry of well-known and operator-defined datastores plus the
/// failsafe fallback named by configuration (spec §4.3 "Failsafe
/// datastore").
pub struct DatastoreManager {
    stores: Vec<Datastore>,
    failsafe_name: String,
}

impl DatastoreManager {
    pub fn new(failsafe_name: impl Into<String>) -> Self {
        let failsafe_name = failsafe_name.into();
        let mut stores = vec![Datastore::new("running"), Datastore::new("candidate"), Datastore::new("startup")];
        if !stores.iter().any(|d| d.name == failsafe_name) {
            stores.push(Datastore::new(failsafe_name.clone()));
        }
        Self { stores, failsafe_name }
    }

    pub fn get(&self, name: &str) -> Result<&Datastore, DatastoreError> {
        self.stores.iter().find(|d| d.name == name).ok_or_else(|| DatastoreError::UnknownDatastore(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Datastore, DatastoreError> {
        self.stores.iter_mut().find(|d| d.name == name).ok_or_else(|| DatastoreError::UnknownDatastore(name.to_string()))
    }

    pub fn failsafe(&self) -> &Datastore { self.get(&self.failsafe_name).expect("failsafe datastore always present") }

    pub fn failsafe_mut(&mut self) -> &mut Datastore {
        self.get_mut(&self.failsafe_name.clone()).expect("failsafe datastore always present")
    }

    pub fn release_all_locks(&mut self, session: SessionId) {
        for store in &mut self.stores {
            if store.lock.is_held_by(session) {
                store.force_unlock();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_session_cannot_lock_while_held() {
        let mut mgr = DatastoreManager::new("failsafe");
        mgr.get_mut("candidate").unwrap().lock(SessionId(1)).unwrap();
        let err = mgr.get_mut("candidate").unwrap().lock(SessionId(2)).unwrap_err();
        assert!(matches!(err, DatastoreError::LockDenied(name, SessionId(1)) if name == "candidate"));
    }

    #[test]
    fn releasing_all_locks_on_session_close_unlocks_only_that_sessions_stores() {
        let mut mgr = DatastoreManager::new("failsafe");
        mgr.get_mut("candidate").unwrap().lock(SessionId(1)).unwrap();
        mgr.get_mut("running").unwrap().lock(SessionId(2)).unwrap();
        mgr.release_all_locks(SessionId(1));
        assert!(!mgr.get("candidate").unwrap().lock.is_locked());
        assert!(mgr.get("running").unwrap().lock.is_held_by(SessionId(2)));
    }

    fn leaf(name: &str, v: i64) -> Node { Node::leaf(crate::tree::QName::new("urn:test", name), crate::tree::Value::Int(v)) }

    #[test]
    fn merge_adds_new_leaf_without_disturbing_existing_ones() {
        let registry = crate::schema::StaticRegistry::new();
        let mut store = Datastore::new("candidate");
        store.tree = Tree { roots: vec![leaf("a", 1)] };
        store.put(Tree { roots: vec![leaf("b", 2)] }, EditOperation::Merge, &registry).unwrap();
        assert_eq!(store.tree.roots.len(), 2);
    }

    #[test]
    fn merge_overwrites_existing_leaf_value() {
        let registry = crate::schema::StaticRegistry::new();
        let mut store = Datastore::new("candidate");
        store.tree = Tree { roots: vec![leaf("a", 1)] };
        store.put(Tree { roots: vec![leaf("a", 9)] }, EditOperation::Merge, &registry).unwrap();
        assert_eq!(store.tree.roots[0].value, Some(crate::tree::Value::Int(9)));
    }

    #[test]
    fn create_on_existing_node_fails() {
        let registry = crate::schema::StaticRegistry::new();
        let mut store = Datastore::new("candidate");
        store.tree = Tree { roots: vec![leaf("a", 1)] };
        let err = store.put(Tree { roots: vec![leaf("a", 2)] }, EditOperation::Create, &registry).unwrap_err();
        assert!(matches!(err, DatastoreError::AlreadyExists(name) if name == "a"));
    }

    #[test]
    fn delete_on_missing_node_fails_but_remove_does_not() {
        let registry = crate::schema::StaticRegistry::new();
        let mut store = Datastore::new("candidate");
        assert!(matches!(store.put(Tree { roots: vec![leaf("a", 1)] }, EditOperation::Delete, &registry), Err(DatastoreError::Missing(_))));
        store.put(Tree { roots: vec![leaf("a", 1)] }, EditOperation::Remove, &registry).unwrap();
        assert!(store.tree.roots.is_empty());
    }

    proptest::proptest! {
        /// Lock exclusivity (spec §8): a second session can never
        /// displace the first session's held lock.
        #[test]
        fn second_session_never_displaces_first_holder(a in 0u64..50, b in 0u64..50) {
            proptest::prop_assume!(a != b);
            let mut store = Datastore::new("candidate");
            store.lock(SessionId(a)).unwrap();
            let _ = store.lock(SessionId(b));
            proptest::prop_assert!(store.lock.is_held_by(SessionId(a)));
        }

        /// Lock exclusivity (spec §8): once a session's locks are all
        /// released, every datastore it held reports unlocked.
        #[test]
        fn release_all_locks_leaves_every_held_datastore_unlocked(session_raw in 0u64..50) {
            let mut mgr = DatastoreManager::new("failsafe");
            let session = SessionId(session_raw);
            mgr.get_mut("candidate").unwrap().lock(session).unwrap();
            mgr.get_mut("running").unwrap().lock(session).unwrap();
            mgr.release_all_locks(session);
            proptest::prop_assert!(!mgr.get("candidate").unwrap().lock.is_locked());
            proptest::prop_assert!(!mgr.get("running").unwrap().lock.is_locked());
        }
    }
}
