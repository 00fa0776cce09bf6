// SPDX-License-Identifier: Apache-2.0

//! Access control (spec §1 Non-goals, "access-control policy"):
//! modeled only at its interface. [`AccessControl`] is the consumed
//! collaborator the dispatcher calls before executing an operation;
//! [`AllowAll`] is the reference implementation used when no policy
//! engine is configured.

use crate::datastore::SessionId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
}

impl Decision {
    pub fn is_permit(&self) -> bool { *self == Decision::Permit }
}

pub trait AccessControl {
    /// Called once per RPC before dispatch, given the session, the
    /// operation's qualified name, and (for datastore-targeted
    /// operations) the target datastore.
    fn authorize(&self, session: SessionId, operation: &str, target: Option<&str>) -> Decision;
}

pub struct AllowAll;

impl AccessControl for AllowAll {
    fn authorize(&self, _session: SessionId, _operation: &str, _target: Option<&str>) -> Decision { Decision::Permit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_permits_everything() {
        let ac = AllowAll;
        assert_eq!(ac.authorize(SessionId(1), "edit-config", Some("candidate")), Decision::Permit);
    }
}
