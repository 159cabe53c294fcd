//! Generic, schema-agnostic data-node tree
//!
//! Data nodes are what protocol and serializer layers exchange: each node
//! carries only its schema identity, an instance key and (for leaves) a raw
//! string value. Trees are assembled through [`DataNodeBuilder`] with
//! enter/exit discipline and are immutable once built.

use serde::Serialize;

use crate::error::{BindError, Result};
use crate::schema::SchemaId;

/// Kind of a data node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataNodeKind {
    SingleInstance,
    MultiInstance,
    SingleInstanceLeaf,
    MultiInstanceLeaf,
}

impl DataNodeKind {
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            DataNodeKind::SingleInstanceLeaf | DataNodeKind::MultiInstanceLeaf
        )
    }
}

/// One key leaf of a multi-instance node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KeyLeaf {
    pub name: String,
    pub namespace: String,
    pub value: String,
}

/// Instance discriminator of a node among its siblings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum KeyDetail {
    /// Single-instance node or single-instance leaf
    Node,
    /// List entry, ordered key leaf values
    List(Vec<KeyLeaf>),
    /// Leaf-list entry, the entry value itself
    LeafList(String),
}

/// Identifies a data node among its siblings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NodeKey {
    pub id: SchemaId,
    pub detail: KeyDetail,
}

impl NodeKey {
    pub fn node(id: SchemaId) -> Self {
        Self {
            id,
            detail: KeyDetail::Node,
        }
    }

    pub fn list(id: SchemaId, keys: Vec<KeyLeaf>) -> Self {
        Self {
            id,
            detail: KeyDetail::List(keys),
        }
    }

    pub fn leaf_list(id: SchemaId, value: impl Into<String>) -> Self {
        Self {
            id,
            detail: KeyDetail::LeafList(value.into()),
        }
    }

    /// Sentinel "/" key rooting every resource identifier
    pub fn root() -> Self {
        Self::node(SchemaId::new("/", ""))
    }

    pub fn is_root(&self) -> bool {
        self.id.name == "/" && self.id.namespace.is_empty()
    }
}

/// A node in the generic data tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataNode {
    key: NodeKey,
    kind: DataNodeKind,
    value: Option<String>,
    value_namespace: Option<String>,
    children: Vec<DataNode>,
}

impl DataNode {
    fn inner(key: NodeKey, kind: DataNodeKind) -> Self {
        Self {
            key,
            kind,
            value: None,
            value_namespace: None,
            children: Vec::new(),
        }
    }

    /// A standalone leaf node (no children, by construction)
    pub fn leaf(
        key: NodeKey,
        kind: DataNodeKind,
        value: Option<String>,
        value_namespace: Option<String>,
    ) -> Self {
        Self {
            key,
            kind,
            value,
            value_namespace,
            children: Vec::new(),
        }
    }

    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn schema_id(&self) -> &SchemaId {
        &self.key.id
    }

    pub fn kind(&self) -> DataNodeKind {
        self.kind
    }

    /// Raw leaf value; `None` on a leaf means presence-only (empty type)
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Namespace of the value, set only for identityref-typed leaves
    pub fn value_namespace(&self) -> Option<&str> {
        self.value_namespace.as_deref()
    }

    /// Ordered children (always empty for leaf nodes)
    pub fn children(&self) -> &[DataNode] {
        &self.children
    }

    /// Child lookup by instance key
    pub fn child(&self, key: &NodeKey) -> Option<&DataNode> {
        self.children.iter().find(|c| &c.key == key)
    }
}

/// Incremental data tree construction with acquire/release semantics
///
/// `enter` opens a nested inner node, `leaf` appends a leaf child to the
/// innermost open node, `exit` closes it. `build` fails unless every
/// `enter` was matched by an `exit`.
#[derive(Debug)]
pub struct DataNodeBuilder {
    stack: Vec<DataNode>,
}

impl DataNodeBuilder {
    pub fn new(key: NodeKey, kind: DataNodeKind) -> Self {
        Self {
            stack: vec![DataNode::inner(key, kind)],
        }
    }

    pub fn enter(&mut self, key: NodeKey, kind: DataNodeKind) {
        self.stack.push(DataNode::inner(key, kind));
    }

    pub fn leaf(
        &mut self,
        key: NodeKey,
        kind: DataNodeKind,
        value: Option<String>,
        value_namespace: Option<String>,
    ) {
        let node = DataNode::leaf(key, kind, value, value_namespace);
        // stack is never empty between new() and build()
        self.stack.last_mut().unwrap().children.push(node);
    }

    pub fn exit(&mut self) -> Result<()> {
        if self.stack.len() < 2 {
            return Err(BindError::BuilderState(
                "exit without matching enter".into(),
            ));
        }
        let done = self.stack.pop().unwrap();
        self.stack.last_mut().unwrap().children.push(done);
        Ok(())
    }

    pub fn build(mut self) -> Result<DataNode> {
        match self.stack.len() {
            1 => Ok(self.stack.pop().unwrap()),
            n => Err(BindError::BuilderState(format!(
                "{} node(s) left open at build",
                n - 1
            ))),
        }
    }
}

/// Ordered branch points addressing a location in the data-node space,
/// always rooted by the sentinel "/" key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceId {
    keys: Vec<NodeKey>,
}

impl ResourceId {
    /// The root "/" resource identifier
    pub fn root() -> Self {
        Self {
            keys: vec![NodeKey::root()],
        }
    }

    pub fn push(&mut self, key: NodeKey) {
        self.keys.push(key);
    }

    pub fn keys(&self) -> &[NodeKey] {
        &self.keys
    }

    /// Branch points below the sentinel root
    pub fn branch_keys(&self) -> &[NodeKey] {
        &self.keys[1..]
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::root()
    }
}

/// Conversion-boundary bundle: an optional anchor plus data-node trees
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceData {
    id: Option<ResourceId>,
    nodes: Vec<DataNode>,
}

impl ResourceData {
    pub fn new(id: Option<ResourceId>, nodes: Vec<DataNode>) -> Self {
        Self { id, nodes }
    }

    pub fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }

    pub fn nodes(&self) -> &[DataNode] {
        &self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> SchemaId {
        SchemaId::new(name, "urn:test")
    }

    #[test]
    fn test_builder_nesting() {
        let mut b = DataNodeBuilder::new(NodeKey::node(id("device")), DataNodeKind::SingleInstance);
        b.enter(NodeKey::node(id("config")), DataNodeKind::SingleInstance);
        b.leaf(
            NodeKey::node(id("hostname")),
            DataNodeKind::SingleInstanceLeaf,
            Some("router1".into()),
            None,
        );
        b.exit().unwrap();
        let tree = b.build().unwrap();

        assert_eq!(tree.children().len(), 1);
        let config = tree.child(&NodeKey::node(id("config"))).unwrap();
        let hostname = config.child(&NodeKey::node(id("hostname"))).unwrap();
        assert_eq!(hostname.value(), Some("router1"));
        assert!(hostname.children().is_empty());
    }

    #[test]
    fn test_builder_unbalanced_exit() {
        let mut b = DataNodeBuilder::new(NodeKey::node(id("device")), DataNodeKind::SingleInstance);
        assert!(matches!(b.exit(), Err(BindError::BuilderState(_))));
    }

    #[test]
    fn test_builder_open_node_at_build() {
        let mut b = DataNodeBuilder::new(NodeKey::node(id("device")), DataNodeKind::SingleInstance);
        b.enter(NodeKey::node(id("config")), DataNodeKind::SingleInstance);
        assert!(matches!(b.build(), Err(BindError::BuilderState(_))));
    }

    #[test]
    fn test_resource_id_root_sentinel() {
        let rid = ResourceId::root();
        assert!(rid.keys()[0].is_root());
        assert!(rid.branch_keys().is_empty());
    }

    #[test]
    fn test_list_key_identity() {
        let k1 = NodeKey::list(
            id("interface"),
            vec![KeyLeaf {
                name: "name".into(),
                namespace: "urn:test".into(),
                value: "eth0".into(),
            }],
        );
        let k2 = NodeKey::list(
            id("interface"),
            vec![KeyLeaf {
                name: "name".into(),
                namespace: "urn:test".into(),
                value: "eth1".into(),
            }],
        );
        assert_ne!(k1, k2);
    }
}
