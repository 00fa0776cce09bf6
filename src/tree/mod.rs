//! Configuration tree: the ordered labelled tree described in spec §3.
//!
//! Interior nodes are containers or keyed lists; leaves carry scalar
//! values. Canonical sibling order is by key tuple for list entries and
//! by schema declaration order otherwise, re-established after every
//! mutation (see [`Tree::canonicalize`]).

mod path;
mod value;

pub use path::NodePath;
pub use value::Value;

use std::cmp::Ordering;

use crate::schema::{SchemaNodeId, SchemaRegistry};

/// Qualified element name: local name plus the module namespace it was
/// bound against. Unbound nodes (pre-binding) carry an empty namespace.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self { namespace: namespace.into(), local: local.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
}

/// A single node in a configuration tree.
///
/// `schema` is an index into the registry that bound this node, not a
/// pointer into the schema tree itself — see the "ownership of trees"
/// design note: diff vectors and schema back-references are index
/// pairs, never borrows, so trees stay freely movable.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: QName,
    pub kind: NodeKind,
    pub schema: Option<SchemaNodeId>,
    pub value: Option<Value>,
    pub children: Vec<Node>,
    /// Set by the binder when a leaf was materialized from its schema
    /// default rather than supplied by the caller (spec §4.1 "Defaults").
    pub defaulted: bool,
}

impl Node {
    pub fn leaf(name: QName, value: Value) -> Self {
        Self { name, kind: NodeKind::Leaf, schema: None, value: Some(value), children: vec![], defaulted: false }
    }

    pub fn container(name: QName, children: Vec<Node>) -> Self {
        Self { name, kind: NodeKind::Container, schema: None, value: None, children, defaulted: false }
    }

    pub fn list_entry(name: QName, children: Vec<Node>) -> Self {
        Self { name, kind: NodeKind::List, schema: None, value: None, children, defaulted: false }
    }

    pub fn is_leaf(&self) -> bool { matches!(self.kind, NodeKind::Leaf | NodeKind::LeafList) }

    /// Key tuple for a list entry, computed from the schema's declared
    /// key name order. Returns `None` for non-list nodes or when a key
    /// leaf is missing.
    pub fn key_tuple(&self, key_names: &[String]) -> Option<Vec<Value>> {
        if self.kind != NodeKind::List {
            return None;
        }
        key_names
            .iter()
            .map(|k| self.children.iter().find(|c| c.name.local == *k).and_then(|c| c.value.clone()))
            .collect()
    }

    pub fn child_named(&self, local: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name.local == local)
    }
}

/// A full configuration tree rooted at an implicit document node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tree {
    pub roots: Vec<Node>,
}

impl Tree {
    pub fn empty() -> Self { Self { roots: vec![] } }

    pub fn is_empty(&self) -> bool { self.roots.is_empty() }

    /// Re-establishes canonical sibling order everywhere in the tree:
    /// keyed lists by key tuple comparison, everything else by schema
    /// declaration order (falling back to name order when no schema is
    /// bound, e.g. before the binder has run).
    pub fn canonicalize(&mut self, registry: &dyn SchemaRegistry) {
        canonicalize_siblings(&mut self.roots, registry);
        for root in &mut self.roots {
            canonicalize_subtree(root, registry);
        }
    }
}

fn canonicalize_subtree(node: &mut Node, registry: &dyn SchemaRegistry) {
    canonicalize_siblings(&mut node.children, registry);
    for child in &mut node.children {
        canonicalize_subtree(child, registry);
    }
}

fn canonicalize_siblings(children: &mut [Node], registry: &dyn SchemaRegistry) {
    children.sort_by(|a, b| compare_canonical(a, b, registry));
}

/// Canonical comparator used both for sorting and for the differ's
/// lock-step walk (spec §4.2 "Algorithm").
pub fn compare_canonical(a: &Node, b: &Node, registry: &dyn SchemaRegistry) -> Ordering {
    if a.kind == NodeKind::List && b.kind == NodeKind::List && a.name == b.name {
        if let Some(schema_id) = a.schema.or(b.schema) {
            if let Some(keys) = registry.key_names(schema_id) {
                let ka = a.key_tuple(&keys);
                let kb = b.key_tuple(&keys);
                if let (Some(ka), Some(kb)) = (ka, kb) {
                    return ka.cmp(&kb);
                }
            }
        }
    }
    match (a.schema, b.schema) {
        (Some(sa), Some(sb)) => {
            let oa = registry.declaration_order(sa);
            let ob = registry.declaration_order(sb);
            oa.cmp(&ob).then_with(|| a.name.cmp(&b.name))
        }
        _ => a.name.cmp(&b.name),
    }
}
