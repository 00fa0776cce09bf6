// SPDX-License-Identifier: Apache-2.0

//! Tree differ (spec §4.2): a lock-step walk over two canonicalized
//! trees producing the `added` / `deleted` / `changed` vectors the
//! transaction engine and notification subsystem consume.

use crate::schema::SchemaRegistry;
use crate::tree::{Node, NodePath, Tree, compare_canonical};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Diff {
    pub added: Vec<NodePath>,
    pub deleted: Vec<NodePath>,
    pub changed: Vec<NodePath>,
}

impl Diff {
    pub fn is_empty(&self) -> bool { self.added.is_empty() && self.deleted.is_empty() && self.changed.is_empty() }
}

/// Computes the diff between `from` and `to`. Both trees must already
/// be canonicalized (spec §4.2 "Precondition"); the differ does not
/// canonicalize on the caller's behalf since it is usually invoked
/// back-to-back with a commit pipeline that already did so.
pub fn diff(from: &Tree, to: &Tree, registry: &dyn SchemaRegistry) -> Diff {
    let mut out = Diff::default();
    diff_siblings(&from.roots, &to.roots, NodePath::root(), registry, &mut out);
    out
}

fn diff_siblings(a: &[Node], b: &[Node], at: NodePath, registry: &dyn SchemaRegistry, out: &mut Diff) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match compare_canonical(&a[i], &b[j], registry) {
            std::cmp::Ordering::Equal => {
                diff_node(&a[i], &b[j], at.child(&a[i].name.local), registry, out);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                out.deleted.push(at.child(&a[i].name.local));
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.added.push(at.child(&b[j].name.local));
                j += 1;
            }
        }
    }
    for node in &a[i..] {
        out.deleted.push(at.child(&node.name.local));
    }
    for node in &b[j..] {
        out.added.push(at.child(&node.name.local));
    }
}

/// Two nodes the canonical comparator considers equal (same identity:
/// same name, and for list entries the same key tuple) are compared
/// structurally. A leaf reports `changed` on value mismatch; a
/// container/list entry recurses and, per spec §4.2 "Ancestor
/// tagging", is itself reported `changed` whenever any descendant is,
/// so observers watching a subtree see the edit without walking it.
fn diff_node(a: &Node, b: &Node, at: NodePath, registry: &dyn SchemaRegistry, out: &mut Diff) {
    if a.is_leaf() {
        if a.value != b.value {
            out.changed.push(at);
        }
        return;
    }
    let before = out.added.len() + out.deleted.len() + out.changed.len();
    diff_siblings(&a.children, &b.children, at.clone(), registry, out);
    let after = out.added.len() + out.deleted.len() + out.changed.len();
    if after != before {
        out.changed.push(at);
    }
}
