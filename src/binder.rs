// SPDX-License-Identifier: Apache-2.0

//! Schema binder and constraint validator (spec §4.1), grounded on the
//! binding pass `clixon_xml_bind.c` performs before a tree is trusted
//! anywhere else in the pipeline: every node is matched to a schema
//! node by qualified name, defaults are materialized for missing
//! optional leaves, and `mandatory`/type constraints are checked.

use amplify::{Display, Error, From};

use crate::schema::{Constraint, NodeKind as SchemaKind, SchemaNodeId, SchemaRegistry, TypeDescriptor};
use crate::tree::{Node, NodeKind, NodePath, Tree, Value};

#[derive(Clone, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum BindError {
    /// `{0}` has no matching schema node under its parent
    UnknownNode(NodePath),
    /// `{0}` is missing mandatory leaf `{1}`
    MissingMandatory(NodePath, String),
    /// `{0}` violates its type constraint: {1}
    ConstraintViolation(NodePath, String),
    /// `{0}` is a config=false node and cannot appear in a writable datastore
    NotConfig(NodePath),
    /// `{0}` has two `{1}` entries with the same key
    DuplicateKey(NodePath, String),
}

/// Binds every node of `tree` to `registry`, materializing schema
/// defaults for absent optional leaves and validating constraints.
/// Mutates in place; on error the tree is left partially bound.
pub fn bind_tree(tree: &mut Tree, namespace: &str, registry: &dyn SchemaRegistry) -> Result<(), BindError> {
    let module = registry.module_by_namespace(namespace).ok_or_else(|| BindError::UnknownNode(NodePath::root()))?;
    let module_children = registry.module_children(module);
    bind_siblings(&mut tree.roots, &module_children, NodePath::root(), registry)
}

fn bind_siblings(
    nodes: &mut Vec<Node>,
    candidates: &[SchemaNodeId],
    at: NodePath,
    registry: &dyn SchemaRegistry,
) -> Result<(), BindError> {
    for node in nodes.iter_mut() {
        let path = at.child(&node.name.local);
        // An empty incoming namespace means "unbound" (the codec that
        // produced this node doesn't carry namespace info, e.g. the
        // JSON stand-in codec); such a node binds by local name alone.
        // A node that already carries a namespace (e.g. a previously
        // bound tree, or one a caller built by hand) must match the
        // candidate's own module namespace, so a same-named node from a
        // foreign module is rejected rather than silently bound.
        let schema_id = candidates
            .iter()
            .copied()
            .find(|id| {
                registry.node(*id).is_some_and(|n| {
                    n.local_name == node.name.local
                        && (node.name.namespace.is_empty() || registry.module_namespace(n.module) == Some(node.name.namespace.as_str()))
                })
            })
            .ok_or_else(|| BindError::UnknownNode(path.clone()))?;
        bind_node(node, schema_id, path, registry)?;
    }
    materialize_defaults(nodes, candidates, registry);
    check_list_key_uniqueness(nodes, at, registry)?;
    Ok(())
}

/// List keys must be present and unique across siblings (spec §4.1).
/// Groups siblings by schema node (so distinct list schemas under the
/// same parent are checked independently) and compares key tuples
/// pairwise within each group.
fn check_list_key_uniqueness(nodes: &[Node], at: NodePath, registry: &dyn SchemaRegistry) -> Result<(), BindError> {
    let mut checked_schemas = Vec::new();
    for node in nodes {
        let Some(schema_id) = node.schema else { continue };
        if node.kind != NodeKind::List || checked_schemas.contains(&schema_id) {
            continue;
        }
        checked_schemas.push(schema_id);
        let Some(keys) = registry.key_names(schema_id) else { continue };
        let mut seen = Vec::new();
        for sibling in nodes.iter().filter(|s| s.schema == Some(schema_id)) {
            let Some(tuple) = sibling.key_tuple(&keys) else { continue };
            if seen.contains(&tuple) {
                return Err(BindError::DuplicateKey(at.child(&sibling.name.local), sibling.name.local.clone()));
            }
            seen.push(tuple);
        }
    }
    Ok(())
}

fn bind_node(node: &mut Node, schema_id: SchemaNodeId, path: NodePath, registry: &dyn SchemaRegistry) -> Result<(), BindError> {
    let schema = registry.node(schema_id).expect("schema_id came from the registry");
    node.schema = Some(schema_id);
    // Stamp the schema's own namespace onto the node now that it's
    // bound, so downstream code (diff, canonical ordering, list-key
    // comparisons) sees a fully-qualified name rather than whatever
    // namespace (possibly empty) the source codec produced.
    node.name.namespace = registry.module_namespace(schema.module).unwrap_or("").to_string();
    if !schema.config {
        return Err(BindError::NotConfig(path));
    }
    match node.kind {
        NodeKind::Leaf | NodeKind::LeafList => {
            if let (Some(ty), Some(value)) = (&schema.ty, &node.value) {
                check_constraints(value, ty).map_err(|reason| BindError::ConstraintViolation(path.clone(), reason))?;
            }
        }
        NodeKind::Container | NodeKind::List => {
            let children = registry.children(schema_id);
            bind_siblings(&mut node.children, &children, path, registry)?;
        }
    }
    Ok(())
}

/// Fills in schema-declared defaults for optional leaves absent from
/// the tree and raises an error for any missing mandatory leaf (spec
/// §4.1 "Defaults and mandatory nodes").
fn materialize_defaults(nodes: &mut Vec<Node>, candidates: &[SchemaNodeId], registry: &dyn SchemaRegistry) {
    for &id in candidates {
        let schema = match registry.node(id) {
            Some(s) => s,
            None => continue,
        };
        if schema.kind != SchemaKind::Leaf {
            continue;
        }
        let present = nodes.iter().any(|n| n.name.local == schema.local_name);
        if present {
            continue;
        }
        if let Some(default) = &schema.default {
            let mut leaf = Node::leaf(crate::tree::QName::new(registry.module_namespace(schema.module).unwrap_or(""), &schema.local_name), default.clone());
            leaf.schema = Some(id);
            leaf.defaulted = true;
            nodes.push(leaf);
        }
    }
}

/// Validates that every mandatory descendant is present, walked after
/// binding and default materialization so optional-with-default leaves
/// never spuriously fail this check.
pub fn validate_constraints(tree: &Tree, namespace: &str, registry: &dyn SchemaRegistry) -> Result<(), BindError> {
    let module = registry.module_by_namespace(namespace).ok_or_else(|| BindError::UnknownNode(NodePath::root()))?;
    let module_children = registry.module_children(module);
    check_mandatory(&tree.roots, &module_children, NodePath::root(), registry)
}

fn check_mandatory(nodes: &[Node], candidates: &[SchemaNodeId], at: NodePath, registry: &dyn SchemaRegistry) -> Result<(), BindError> {
    for &id in candidates {
        let schema = match registry.node(id) {
            Some(s) => s,
            None => continue,
        };
        if !schema.mandatory {
            continue;
        }
        let found = nodes.iter().find(|n| n.name.local == schema.local_name);
        if found.is_none() {
            return Err(BindError::MissingMandatory(at.clone(), schema.local_name.clone()));
        }
    }
    for node in nodes {
        if let Some(schema_id) = node.schema {
            let children = registry.children(schema_id);
            check_mandatory(&node.children, &children, at.child(&node.name.local), registry)?;
        }
    }
    Ok(())
}

fn check_constraints(value: &Value, ty: &TypeDescriptor) -> Result<(), String> {
    for constraint in &ty.constraints {
        match constraint {
            Constraint::Range(lo, hi) => {
                if let Some(n) = value.as_int() {
                    if n < *lo || n > *hi {
                        return Err(format!("{n} outside range {lo}..={hi}"));
                    }
                }
            }
            Constraint::Length(lo, hi) => {
                if let Some(s) = value.as_str() {
                    if s.len() < *lo || s.len() > *hi {
                        return Err(format!("length {} outside {lo}..={hi}", s.len()));
                    }
                }
            }
            Constraint::Pattern(_) | Constraint::Leafref(_) => {
                // Regex and cross-tree reference resolution are left to a
                // CommitPlugin with access to the full candidate tree
                // (spec §4.1 "Deferred constraints").
            }
            Constraint::Enum(values) | Constraint::Bits(values) => {
                if let Some(s) = value.as_str() {
                    if !values.iter().any(|v| v == s) {
                        return Err(format!("`{s}` is not one of {values:?}"));
                    }
                }
            }
            Constraint::IdentityBase(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StaticRegistry;
    use crate::tree::QName;

    fn registry_with_hostname(mandatory: bool, default: Option<Value>) -> (StaticRegistry, &'static str) {
        let mut r = StaticRegistry::new();
        let module = r.add_module("urn:test", "test");
        let sys = r.add_container(module, None, "sys");
        r.add_leaf(module, Some(sys), "hostname", mandatory, true, default, TypeDescriptor { base: "string".into(), constraints: vec![] });
        (r, "urn:test")
    }

    #[test]
    fn binds_known_nodes_and_rejects_unknown() {
        let (registry, ns) = registry_with_hostname(true, None);
        let mut tree = Tree {
            roots: vec![Node::container(QName::new(ns, "sys"), vec![Node::leaf(QName::new(ns, "hostname"), Value::String("a".into()))])],
        };
        bind_tree(&mut tree, ns, &registry).unwrap();
        assert!(tree.roots[0].schema.is_some());

        let mut bad = Tree { roots: vec![Node::container(QName::new(ns, "bogus"), vec![])] };
        assert!(matches!(bind_tree(&mut bad, ns, &registry), Err(BindError::UnknownNode(_))));
    }

    #[test]
    fn materializes_default_for_missing_optional_leaf() {
        let (registry, ns) = registry_with_hostname(false, Some(Value::String("localhost".into())));
        let mut tree = Tree { roots: vec![Node::container(QName::new(ns, "sys"), vec![])] };
        bind_tree(&mut tree, ns, &registry).unwrap();
        let hostname = tree.roots[0].child_named("hostname").unwrap();
        assert!(hostname.defaulted);
        assert_eq!(hostname.value, Some(Value::String("localhost".into())));
    }

    #[test]
    fn missing_mandatory_leaf_without_default_fails_validation() {
        let (registry, ns) = registry_with_hostname(true, None);
        let mut tree = Tree { roots: vec![Node::container(QName::new(ns, "sys"), vec![])] };
        bind_tree(&mut tree, ns, &registry).unwrap();
        assert!(matches!(validate_constraints(&tree, ns, &registry), Err(BindError::MissingMandatory(_, _))));
    }

    fn registry_with_iface_list() -> (StaticRegistry, &'static str) {
        let mut r = StaticRegistry::new();
        let module = r.add_module("urn:test", "test");
        let iface = r.add_list(module, None, "iface", vec!["name".into()]);
        r.add_leaf(module, Some(iface), "name", true, true, None, TypeDescriptor { base: "string".into(), constraints: vec![] });
        (r, "urn:test")
    }

    fn iface_entry(ns: &str, name: &str) -> Node {
        Node::list_entry(QName::new(ns, "iface"), vec![Node::leaf(QName::new(ns, "name"), Value::String(name.into()))])
    }

    #[test]
    fn duplicate_list_key_across_siblings_is_rejected() {
        let (registry, ns) = registry_with_iface_list();
        let mut tree = Tree { roots: vec![iface_entry(ns, "eth0"), iface_entry(ns, "eth0")] };
        assert!(matches!(bind_tree(&mut tree, ns, &registry), Err(BindError::DuplicateKey(_, _))));
    }

    #[test]
    fn distinct_list_keys_across_siblings_are_accepted() {
        let (registry, ns) = registry_with_iface_list();
        let mut tree = Tree { roots: vec![iface_entry(ns, "eth0"), iface_entry(ns, "eth1")] };
        bind_tree(&mut tree, ns, &registry).unwrap();
    }

    #[test]
    fn node_with_matching_local_name_but_foreign_namespace_is_unknown() {
        let (registry, ns) = registry_with_hostname(true, None);
        let mut tree = Tree {
            roots: vec![Node::container(QName::new(ns, "sys"), vec![Node::leaf(QName::new("urn:other", "hostname"), Value::String("a".into()))])],
        };
        assert!(matches!(bind_tree(&mut tree, ns, &registry), Err(BindError::UnknownNode(_))));
    }
}
