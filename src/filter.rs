// SPDX-License-Identifier: Apache-2.0

//! Reply filtering (spec §1 Non-goals names "the XML parser and XPath
//! evaluator" as an external collaborator out of scope). Modeled only
//! at its interface plus a reference implementation that understands
//! `/`-separated path prefixes over local names — not a real XPath
//! evaluator, the way `SchemaRegistry`/`TreeCodec` stand in for their
//! own out-of-scope collaborators.

use crate::tree::{Node, Tree};

pub trait TreeFilter {
    /// Narrows `tree` to the subtree(s) selected by `expr`. `None`
    /// (no filter given in the request) returns the whole tree.
    fn select(&self, tree: &Tree, expr: Option<&str>) -> Tree;
}

/// Selects by `/`-separated path prefix over qualified local names,
/// e.g. `/sys/hostname`. No predicates, no wildcards — the reference
/// stand-in for the XPath evaluator spec §1 puts out of scope.
pub struct PrefixFilter;

impl TreeFilter for PrefixFilter {
    fn select(&self, tree: &Tree, expr: Option<&str>) -> Tree {
        let Some(expr) = expr else { return tree.clone() };
        let segments: Vec<&str> = expr.split('/').filter(|s| !s.is_empty()).collect();
        Tree { roots: select_siblings(&tree.roots, &segments) }
    }
}

fn select_siblings(nodes: &[Node], segments: &[&str]) -> Vec<Node> {
    let Some((head, rest)) = segments.split_first() else { return nodes.to_vec() };
    nodes
        .iter()
        .filter(|n| n.name.local == *head)
        .cloned()
        .map(|mut n| {
            if !rest.is_empty() {
                n.children = select_siblings(&n.children, rest);
            }
            n
        })
        .collect()
}
