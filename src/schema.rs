//! Schema registry: the external collaborator spec §6 describes as
//! "compiled schema registry exposing module/datanode lookup, type
//! descriptors, identity sets, key name lists". The YANG compiler that
//! produces a real registry is out of scope (spec §1); this module
//! defines the trait boundary the core consumes plus an in-memory
//! [`StaticRegistry`] reference implementation used by tests and the
//! CLI tool, built with a small builder API rather than a YANG parser.

use std::collections::BTreeMap;

/// Opaque handle into a [`SchemaRegistry`]. Index-based, per the
/// "avoid back-pointers" design note — nodes carry this instead of a
/// reference into the schema tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaNodeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleId(pub u32);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
    Rpc,
    RpcInput,
    RpcOutput,
    Notification,
    Anydata,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    Range(i64, i64),
    Length(usize, usize),
    Pattern(String),
    Enum(Vec<String>),
    Bits(Vec<String>),
    IdentityBase(String),
    Leafref(String),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeDescriptor {
    pub base: String,
    pub constraints: Vec<Constraint>,
}

#[derive(Clone, Debug)]
pub struct SchemaNode {
    pub id: SchemaNodeId,
    pub module: ModuleId,
    pub local_name: String,
    pub kind: NodeKind,
    pub parent: Option<SchemaNodeId>,
    pub default: Option<crate::tree::Value>,
    pub mandatory: bool,
    pub config: bool,
    pub key_names: Vec<String>,
    pub ty: Option<TypeDescriptor>,
    /// Declaration order among this node's siblings under its parent.
    pub order: u32,
}

/// The trait boundary the binder, differ and dispatcher are written
/// against (spec §6 "Schema registry").
pub trait SchemaRegistry {
    fn module_by_namespace(&self, namespace: &str) -> Option<ModuleId>;
    fn module_namespace(&self, module: ModuleId) -> Option<&str>;
    /// Root-level data nodes (and rpc/notification symbols) declared
    /// directly under a module.
    fn module_children(&self, module: ModuleId) -> Vec<SchemaNodeId>;
    fn node(&self, id: SchemaNodeId) -> Option<&SchemaNode>;
    /// Child lookup by local name under a parent schema node (spec
    /// §4.1 "Binding algorithm").
    fn child_by_name(&self, parent: SchemaNodeId, local_name: &str) -> Option<SchemaNodeId>;
    fn children(&self, parent: SchemaNodeId) -> Vec<SchemaNodeId>;
    fn key_names(&self, list: SchemaNodeId) -> Option<Vec<String>> {
        self.node(list).map(|n| n.key_names.clone())
    }
    fn declaration_order(&self, id: SchemaNodeId) -> u32 { self.node(id).map(|n| n.order).unwrap_or(0) }
    /// RPC operation lookup by local name within a module, returning
    /// the rpc node itself (its `input`/`output` children carry the
    /// envelope schema per spec §4.1 "RPC binding variants").
    fn rpc_by_name(&self, module: ModuleId, local_name: &str) -> Option<SchemaNodeId> {
        self.module_children(module)
            .into_iter()
            .find(|id| self.node(*id).is_some_and(|n| n.kind == NodeKind::Rpc && n.local_name == local_name))
    }
    fn rpc_input(&self, rpc: SchemaNodeId) -> Option<SchemaNodeId> {
        self.children(rpc)
            .into_iter()
            .find(|id| self.node(*id).is_some_and(|n| n.kind == NodeKind::RpcInput))
    }
    fn rpc_output(&self, rpc: SchemaNodeId) -> Option<SchemaNodeId> {
        self.children(rpc)
            .into_iter()
            .find(|id| self.node(*id).is_some_and(|n| n.kind == NodeKind::RpcOutput))
    }
}

/// In-memory registry built by hand (or by a test) rather than
/// compiled from YANG source.
#[derive(Default)]
pub struct StaticRegistry {
    modules: Vec<String>,
    nodes: Vec<SchemaNode>,
    module_children: BTreeMap<u32, Vec<SchemaNodeId>>,
    children: BTreeMap<u32, Vec<SchemaNodeId>>,
}

impl StaticRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn add_module(&mut self, namespace: &str, _name: &str) -> ModuleId {
        self.modules.push(namespace.to_string());
        ModuleId(self.modules.len() as u32 - 1)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_node(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        local_name: &str,
        kind: NodeKind,
        mandatory: bool,
        config: bool,
        default: Option<crate::tree::Value>,
        key_names: Vec<String>,
        ty: Option<TypeDescriptor>,
    ) -> SchemaNodeId {
        let order = match parent {
            Some(p) => self.children.get(&p.0).map(|v| v.len() as u32).unwrap_or(0),
            None => self.module_children.get(&module.0).map(|v| v.len() as u32).unwrap_or(0),
        };
        let id = SchemaNodeId(self.nodes.len() as u32);
        self.nodes.push(SchemaNode {
            id,
            module,
            local_name: local_name.to_string(),
            kind,
            parent,
            default,
            mandatory,
            config,
            key_names,
            ty,
            order,
        });
        match parent {
            Some(p) => self.children.entry(p.0).or_default().push(id),
            None => self.module_children.entry(module.0).or_default().push(id),
        }
        id
    }

    pub fn add_container(&mut self, module: ModuleId, parent: Option<SchemaNodeId>, local_name: &str) -> SchemaNodeId {
        self.push_node(module, parent, local_name, NodeKind::Container, false, true, None, vec![], None)
    }

    pub fn add_list(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        local_name: &str,
        key_names: Vec<String>,
    ) -> SchemaNodeId {
        self.push_node(module, parent, local_name, NodeKind::List, false, true, None, key_names, None)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_leaf(
        &mut self,
        module: ModuleId,
        parent: Option<SchemaNodeId>,
        local_name: &str,
        mandatory: bool,
        config: bool,
        default: Option<crate::tree::Value>,
        ty: TypeDescriptor,
    ) -> SchemaNodeId {
        self.push_node(module, parent, local_name, NodeKind::Leaf, mandatory, config, default, vec![], Some(ty))
    }

    pub fn add_rpc(&mut self, module: ModuleId, local_name: &str) -> SchemaNodeId {
        let rpc = self.push_node(module, None, local_name, NodeKind::Rpc, false, true, None, vec![], None);
        self.push_node(module, Some(rpc), "input", NodeKind::RpcInput, false, true, None, vec![], None);
        self.push_node(module, Some(rpc), "output", NodeKind::RpcOutput, false, true, None, vec![], None);
        rpc
    }
}

impl SchemaRegistry for StaticRegistry {
    fn module_by_namespace(&self, namespace: &str) -> Option<ModuleId> {
        self.modules.iter().position(|m| m == namespace).map(|i| ModuleId(i as u32))
    }

    fn module_namespace(&self, module: ModuleId) -> Option<&str> { self.modules.get(module.0 as usize).map(String::as_str) }

    fn module_children(&self, module: ModuleId) -> Vec<SchemaNodeId> {
        self.module_children.get(&module.0).cloned().unwrap_or_default()
    }

    fn node(&self, id: SchemaNodeId) -> Option<&SchemaNode> { self.nodes.get(id.0 as usize) }

    fn child_by_name(&self, parent: SchemaNodeId, local_name: &str) -> Option<SchemaNodeId> {
        self.children
            .get(&parent.0)?
            .iter()
            .find(|id| self.node(**id).is_some_and(|n| n.local_name == local_name))
            .copied()
    }

    fn children(&self, parent: SchemaNodeId) -> Vec<SchemaNodeId> {
        self.children.get(&parent.0).cloned().unwrap_or_default()
    }
}
