// SPDX-License-Identifier: Apache-2.0

//! Session bookkeeping (spec §2): one [`Session`] per connected
//! transport peer, tracked by [`SessionManager`]. Mirrors the teacher's
//! `ClientInfo`/connection-table shape but keyed by the session-id
//! space the RPC layer hands out rather than a socket address, since a
//! session here outlives any one transport frame.

use std::collections::BTreeMap;

use crate::datastore::SessionId;

#[derive(Clone, Debug)]
pub struct Session {
    pub id: SessionId,
    /// Free-form peer identity string (spec §6: populated from a Unix
    /// peer-credential lookup or a transport-level username, never
    /// parsed by this crate).
    pub identity: String,
    pub established_at_millis: u64,
    pub last_seen_millis: u64,
}

impl Session {
    pub fn touch(&mut self, now_millis: u64) { self.last_seen_millis = now_millis; }
}

/// Emits session-scoped events to the transport layer (spec §5.6);
/// implemented by whatever multiplexer owns the actual socket, kept
/// separate from [`SessionManager`] so session bookkeeping stays
/// transport-agnostic and testable without a socket.
pub trait EventSink {
    fn notify(&mut self, session: SessionId, event: String);
    fn disconnect(&mut self, session: SessionId);
}

#[derive(Default)]
pub struct SessionManager {
    sessions: BTreeMap<SessionId, Session>,
    next_id: u64,
}

impl SessionManager {
    pub fn new() -> Self { Self { sessions: BTreeMap::new(), next_id: 1 } }

    pub fn open(&mut self, identity: impl Into<String>, now_millis: u64) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.sessions.insert(
            id,
            Session { id, identity: identity.into(), established_at_millis: now_millis, last_seen_millis: now_millis },
        );
        id
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> { self.sessions.get(&id) }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> { self.sessions.get_mut(&id) }

    /// Closes a session, as either `close-session` (the owner closing
    /// its own session) or `kill-session` (a privileged session closing
    /// another). Per SPEC_FULL.md's resolved ambiguity, `kill-session`
    /// against an already-absent session id still replies `ok` rather
    /// than raising an error, since the end state the caller wanted is
    /// already true.
    pub fn close(&mut self, id: SessionId) { self.sessions.remove(&id); }

    pub fn all_ids(&self) -> Vec<SessionId> { self.sessions.keys().copied().collect() }

    pub fn len(&self) -> usize { self.sessions.len() }
    pub fn is_empty(&self) -> bool { self.sessions.is_empty() }
}
