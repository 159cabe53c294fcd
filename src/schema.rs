//! Compiled YANG schema model
//!
//! Schema trees are built once through [`ModuleBuilder`] (the textual parser
//! is an external collaborator), frozen into an arena-backed
//! [`SchemaModule`] and shared via `Arc`. Navigation goes through
//! [`SchemaNodeRef`], a cheap cloneable handle that keeps its module alive.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Arena index of a schema node within its module
pub type NodeId = usize;

/// Name + namespace identity of a schema node
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SchemaId {
    pub name: String,
    pub namespace: String,
}

impl SchemaId {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Kind of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Module,
    Container,
    List,
    Leaf,
    LeafList,
    Choice,
    Case,
    Augment,
    Rpc,
    RpcInput,
    RpcOutput,
    Notification,
    Anydata,
}

impl SchemaKind {
    /// Kinds that carry a leaf value in the data tree
    pub fn is_leaf(self) -> bool {
        matches!(self, SchemaKind::Leaf | SchemaKind::LeafList)
    }

    /// Kinds that never appear as themselves in the data-node tree
    pub fn is_non_data(self) -> bool {
        matches!(
            self,
            SchemaKind::Choice | SchemaKind::Case | SchemaKind::Augment
        )
    }
}

/// Restriction/type descriptor for leaf and leaf-list nodes
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal64,
    Boolean,
    Binary,
    Empty,
    Identityref,
    InstanceIdentifier,
    /// Named bit positions, declaration order
    Bits(Vec<String>),
    /// Enum constant names, declaration order
    Enumeration(Vec<String>),
    /// Referred leaf's type
    Leafref(Box<DataType>),
    /// Member types, tried in order
    Union(Vec<DataType>),
}

/// Target of an augment node: namespace plus node-name path from the
/// target module's root
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentTarget {
    pub namespace: String,
    pub path: Vec<String>,
}

#[derive(Debug)]
struct SchemaNodeData {
    id: SchemaId,
    kind: SchemaKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    key_leaves: Vec<String>,
    data_type: Option<DataType>,
    augment_target: Option<AugmentTarget>,
}

/// An immutable compiled schema module
#[derive(Debug)]
pub struct SchemaModule {
    name: String,
    namespace: String,
    nodes: Vec<SchemaNodeData>,
}

impl SchemaModule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Handle to the module root node
    pub fn root(self: &Arc<Self>) -> SchemaNodeRef {
        SchemaNodeRef {
            module: Arc::clone(self),
            node: 0,
        }
    }

    fn node(&self, id: NodeId) -> &SchemaNodeData {
        &self.nodes[id]
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Cheap cloneable handle to one node of a compiled module
#[derive(Clone)]
pub struct SchemaNodeRef {
    module: Arc<SchemaModule>,
    node: NodeId,
}

impl PartialEq for SchemaNodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node && Arc::ptr_eq(&self.module, &other.module)
    }
}

impl Eq for SchemaNodeRef {}

impl fmt::Debug for SchemaNodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SchemaNodeRef({}, {:?})", self.schema_id(), self.kind())
    }
}

impl SchemaNodeRef {
    pub(crate) fn new(module: Arc<SchemaModule>, node: NodeId) -> Self {
        Self { module, node }
    }

    fn data(&self) -> &SchemaNodeData {
        self.module.node(self.node)
    }

    pub fn module(&self) -> &Arc<SchemaModule> {
        &self.module
    }

    pub(crate) fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn schema_id(&self) -> &SchemaId {
        &self.data().id
    }

    pub fn name(&self) -> &str {
        &self.data().id.name
    }

    pub fn namespace(&self) -> &str {
        &self.data().id.namespace
    }

    pub fn kind(&self) -> SchemaKind {
        self.data().kind
    }

    /// Ordered key leaf names (List nodes only, never empty there)
    pub fn key_leaves(&self) -> &[String] {
        &self.data().key_leaves
    }

    /// Declared type (Leaf/LeafList nodes only)
    pub fn data_type(&self) -> Option<&DataType> {
        self.data().data_type.as_ref()
    }

    pub(crate) fn augment_target(&self) -> Option<&AugmentTarget> {
        self.data().augment_target.as_ref()
    }

    pub fn parent(&self) -> Option<SchemaNodeRef> {
        self.data().parent.map(|id| SchemaNodeRef {
            module: Arc::clone(&self.module),
            node: id,
        })
    }

    pub fn first_child(&self) -> Option<SchemaNodeRef> {
        self.data().first_child.map(|id| SchemaNodeRef {
            module: Arc::clone(&self.module),
            node: id,
        })
    }

    pub fn next_sibling(&self) -> Option<SchemaNodeRef> {
        self.data().next_sibling.map(|id| SchemaNodeRef {
            module: Arc::clone(&self.module),
            node: id,
        })
    }

    /// Iterate direct children in declaration order
    pub fn children(&self) -> Children {
        Children {
            next: self.first_child(),
        }
    }

    /// Direct child by name (no choice/case recursion, no augments)
    pub fn find_child(&self, name: &str, namespace: &str) -> Option<SchemaNodeRef> {
        self.children()
            .find(|c| c.name() == name && c.namespace() == namespace)
    }

    /// Node names from the module root (exclusive) down to this node
    pub fn path_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut cur = Some(self.clone());
        while let Some(n) = cur {
            if n.kind() == SchemaKind::Module {
                break;
            }
            names.push(n.name().to_string());
            cur = n.parent();
        }
        names.reverse();
        names
    }
}

/// Iterator over sibling schema nodes
pub struct Children {
    next: Option<SchemaNodeRef>,
}

impl Iterator for Children {
    type Item = SchemaNodeRef;

    fn next(&mut self) -> Option<SchemaNodeRef> {
        let cur = self.next.take()?;
        self.next = cur.next_sibling();
        Some(cur)
    }
}

/// Programmatic schema construction, the compiled-tree entry point
///
/// Nodes are appended under a parent id; sibling order is insertion order.
/// `build` freezes the module.
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    namespace: String,
    nodes: Vec<SchemaNodeData>,
    last_child: Vec<Option<NodeId>>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let name = name.into();
        let namespace = namespace.into();
        let root = SchemaNodeData {
            id: SchemaId::new(name.clone(), namespace.clone()),
            kind: SchemaKind::Module,
            parent: None,
            first_child: None,
            next_sibling: None,
            key_leaves: Vec::new(),
            data_type: None,
            augment_target: None,
        };
        Self {
            name,
            namespace,
            nodes: vec![root],
            last_child: vec![None],
        }
    }

    /// Id of the module root node
    pub fn root(&self) -> NodeId {
        0
    }

    fn add(&mut self, parent: NodeId, kind: SchemaKind, name: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(SchemaNodeData {
            id: SchemaId::new(name, self.namespace.clone()),
            kind,
            parent: Some(parent),
            first_child: None,
            next_sibling: None,
            key_leaves: Vec::new(),
            data_type: None,
            augment_target: None,
        });
        self.last_child.push(None);
        match self.last_child[parent] {
            Some(prev) => self.nodes[prev].next_sibling = Some(id),
            None => self.nodes[parent].first_child = Some(id),
        }
        self.last_child[parent] = Some(id);
        id
    }

    pub fn container(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, SchemaKind::Container, name)
    }

    pub fn list(&mut self, parent: NodeId, name: &str, keys: &[&str]) -> NodeId {
        assert!(!keys.is_empty(), "list '{name}' must declare key leaves");
        let id = self.add(parent, SchemaKind::List, name);
        self.nodes[id].key_leaves = keys.iter().map(|k| k.to_string()).collect();
        id
    }

    pub fn leaf(&mut self, parent: NodeId, name: &str, ty: DataType) -> NodeId {
        let id = self.add(parent, SchemaKind::Leaf, name);
        self.nodes[id].data_type = Some(ty);
        id
    }

    pub fn leaf_list(&mut self, parent: NodeId, name: &str, ty: DataType) -> NodeId {
        let id = self.add(parent, SchemaKind::LeafList, name);
        self.nodes[id].data_type = Some(ty);
        id
    }

    pub fn choice(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, SchemaKind::Choice, name)
    }

    pub fn case(&mut self, choice: NodeId, name: &str) -> NodeId {
        assert!(
            matches!(
                self.nodes[choice].kind,
                SchemaKind::Choice | SchemaKind::Augment
            ),
            "case '{name}' must be added under a choice or a choice augment"
        );
        self.add(choice, SchemaKind::Case, name)
    }

    pub fn rpc(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, SchemaKind::Rpc, name)
    }

    pub fn rpc_input(&mut self, rpc: NodeId) -> NodeId {
        self.add(rpc, SchemaKind::RpcInput, "input")
    }

    pub fn rpc_output(&mut self, rpc: NodeId) -> NodeId {
        self.add(rpc, SchemaKind::RpcOutput, "output")
    }

    pub fn notification(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, SchemaKind::Notification, name)
    }

    pub fn anydata(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, SchemaKind::Anydata, name)
    }

    /// Declare an augment of another node, addressed by namespace plus
    /// node-name path from that module's root. Children added under the
    /// returned id are the augmenting nodes.
    pub fn augment(&mut self, target_namespace: &str, target_path: &[&str]) -> NodeId {
        let name = format!("augment-{}", target_path.join("-"));
        let id = self.add(0, SchemaKind::Augment, &name);
        self.nodes[id].augment_target = Some(AugmentTarget {
            namespace: target_namespace.to_string(),
            path: target_path.iter().map(|p| p.to_string()).collect(),
        });
        id
    }

    pub fn build(self) -> Arc<SchemaModule> {
        Arc::new(SchemaModule {
            name: self.name,
            namespace: self.namespace,
            nodes: self.nodes,
        })
    }
}
