// SPDX-License-Identifier: Apache-2.0

//! State-data plugins (spec §6 "State data plugins"): operational data
//! that `get` assembles alongside `running`'s configuration but that
//! never lives in a writable datastore. Modeled only at its interface
//! plus a trivial reference implementation, the way `SchemaRegistry`/
//! `TreeCodec` are — a real provider talks to a kernel or a daemon this
//! crate does not have.

use crate::tree::{Node, Tree};

/// A single state-data contributor (spec §6 "collect(xpath) ->
/// tree-fragment"). `state` should be cheap and side-effect free.
pub trait StateDataProvider {
    fn name(&self) -> &str;
    fn state(&self) -> Vec<Node>;
}

/// Merges `config`'s roots with every provider's state-data roots for
/// `get` (spec §4.6 "get = get-config on running merged with state
/// data assembled by plugins"). Provider roots are appended after the
/// config roots; a provider contributing a root name that collides
/// with a config root wins, since providers are expected to own
/// disjoint top-level subtrees.
pub fn assemble_state(config: &Tree, providers: &[Box<dyn StateDataProvider>]) -> Tree {
    let mut roots = config.roots.clone();
    for provider in providers {
        for node in provider.state() {
            match roots.iter_mut().find(|r| r.name == node.name) {
                Some(existing) => *existing = node,
                None => roots.push(node),
            }
        }
    }
    Tree { roots }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{QName, Value};

    struct Uptime;
    impl StateDataProvider for Uptime {
        fn name(&self) -> &str { "uptime" }
        fn state(&self) -> Vec<Node> { vec![Node::leaf(QName::new("urn:test", "uptime-seconds"), Value::UInt(42))] }
    }

    #[test]
    fn assembled_state_includes_both_config_and_provider_roots() {
        let config = Tree { roots: vec![Node::leaf(QName::new("urn:test", "hostname"), Value::String("r1".into()))] };
        let providers: Vec<Box<dyn StateDataProvider>> = vec![Box::new(Uptime)];
        let merged = assemble_state(&config, &providers);
        assert_eq!(merged.roots.len(), 2);
        assert!(merged.roots.iter().any(|n| n.name.local == "uptime-seconds"));
    }

    #[test]
    fn no_providers_leaves_config_untouched() {
        let config = Tree { roots: vec![Node::leaf(QName::new("urn:test", "hostname"), Value::String("r1".into()))] };
        let merged = assemble_state(&config, &[]);
        assert_eq!(merged, config);
    }
}
