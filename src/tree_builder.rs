//! Model-object tree to data-node tree conversion
//!
//! A schema-driven depth-first traversal with explicit direction state
//! (root/child/sibling/parent) instead of recursion: the same List schema
//! node is re-entered once per object entry, and Choice/Case/Augment nodes
//! are walked without emitting data nodes of their own. Each call owns a
//! fresh frame stack; nothing is shared between conversions.
//!
//! A data node is emitted only if the corresponding object field is
//! populated; an absent field prunes the whole subtree silently.

use crate::data::{DataNode, DataNodeBuilder, DataNodeKind, KeyLeaf, NodeKey, ResourceData};
use crate::error::{BindError, Result};
use crate::ids::resource_id_from_model_id;
use crate::model::{ModelObject, ModelObjectData};
use crate::registry::SchemaRegistry;
use crate::schema::{SchemaKind, SchemaNodeRef};
use crate::types::{RawLeaf, leaf_to_raw};

/// Convert typed model objects into generic data-node trees
pub fn object_to_data(registry: &SchemaRegistry, data: &ModelObjectData) -> Result<ResourceData> {
    let id = match data.id() {
        Some(mid) => Some(resource_id_from_model_id(registry, mid)?),
        None => None,
    };
    let mut nodes = Vec::with_capacity(data.objects().len());
    for obj in data.objects() {
        let schema = registry.node_for_class(obj.class_name()).ok_or_else(|| {
            BindError::ClassResolution(format!("class {} not registered", obj.class_name()))
        })?;
        nodes.push(TreeWalker::convert(registry, schema, obj)?);
    }
    Ok(ResourceData::new(id, nodes))
}

/// Traversal direction of the walk state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dir {
    Root,
    Child,
    Sibling,
    Parent,
}

/// What the parent-direction handler decided to do next
enum Step {
    Descend(SchemaNodeRef),
    Continue(SchemaNodeRef),
    Climb(SchemaNodeRef),
    Done,
}

/// One traversal frame; owned by a single conversion call
struct Frame<'a> {
    schema: SchemaNodeRef,
    /// Current object supplying fields at this schema level
    obj: &'a ModelObject,
    /// Whether this frame emitted a data node (Choice/Case/Augment do not)
    emits: bool,
    list_iter: Option<std::slice::Iter<'a, ModelObject>>,
    augments: Vec<SchemaNodeRef>,
    next_augment: usize,
    /// Populated case object, Choice frames (and forwarding augments) only
    case_obj: Option<&'a ModelObject>,
}

struct TreeWalker<'a, 'r> {
    registry: &'r SchemaRegistry,
    frames: Vec<Frame<'a>>,
    builder: DataNodeBuilder,
}

impl<'a, 'r> TreeWalker<'a, 'r> {
    fn convert(
        registry: &'r SchemaRegistry,
        start: SchemaNodeRef,
        root: &'a ModelObject,
    ) -> Result<DataNode> {
        let (key, kind) = match start.kind() {
            SchemaKind::List => (list_entry_key(&start, root)?, DataNodeKind::MultiInstance),
            SchemaKind::Container
            | SchemaKind::RpcInput
            | SchemaKind::RpcOutput
            | SchemaKind::Notification
            | SchemaKind::Anydata => (
                NodeKey::node(start.schema_id().clone()),
                DataNodeKind::SingleInstance,
            ),
            other => {
                return Err(BindError::ShapeMismatch(format!(
                    "object {} is bound to non-convertible {other:?} node {}",
                    root.class_name(),
                    start.schema_id()
                )));
            }
        };

        let mut walker = TreeWalker {
            registry,
            frames: Vec::new(),
            builder: DataNodeBuilder::new(key, kind),
        };
        walker.emit_leaves(&start, root)?;
        walker.push_frame(&start, root, true, None, None);
        walker.run(start)?;
        walker.builder.build()
    }

    fn run(&mut self, start: SchemaNodeRef) -> Result<()> {
        let mut curr = start;
        let mut dir = Dir::Root;
        loop {
            match dir {
                Dir::Root => match first_processable_child(&curr) {
                    Some(child) => {
                        curr = child;
                        dir = Dir::Child;
                    }
                    None => dir = Dir::Parent,
                },
                Dir::Child | Dir::Sibling => {
                    if self.enter(&curr)? {
                        match first_processable_child(&curr) {
                            Some(child) => {
                                curr = child;
                                dir = Dir::Child;
                            }
                            None => dir = Dir::Parent,
                        }
                    } else {
                        // pruned subtree
                        match next_processable_sibling(&curr) {
                            Some(sib) => {
                                curr = sib;
                                dir = Dir::Sibling;
                            }
                            None => {
                                curr = self.top_schema();
                                dir = Dir::Parent;
                            }
                        }
                    }
                }
                Dir::Parent => match self.finish()? {
                    Step::Descend(child) => {
                        curr = child;
                        dir = Dir::Child;
                    }
                    Step::Continue(sib) => {
                        curr = sib;
                        dir = Dir::Sibling;
                    }
                    Step::Climb(parent) => {
                        curr = parent;
                        dir = Dir::Parent;
                    }
                    Step::Done => return Ok(()),
                },
            }
        }
    }

    fn push_frame(
        &mut self,
        schema: &SchemaNodeRef,
        obj: &'a ModelObject,
        emits: bool,
        list_iter: Option<std::slice::Iter<'a, ModelObject>>,
        case_obj: Option<&'a ModelObject>,
    ) {
        self.frames.push(Frame {
            schema: schema.clone(),
            obj,
            emits,
            list_iter,
            augments: self.registry.augments_of(schema),
            next_augment: 0,
            case_obj,
        });
    }

    fn top(&self) -> &Frame<'a> {
        // frames are non-empty for the whole run
        self.frames.last().unwrap()
    }

    fn top_schema(&self) -> SchemaNodeRef {
        self.top().schema.clone()
    }

    /// Try to enter `node`. Returns false when the corresponding object
    /// content is absent (presence pruning) or a case does not match.
    fn enter(&mut self, node: &SchemaNodeRef) -> Result<bool> {
        match node.kind() {
            SchemaKind::Container | SchemaKind::Anydata => {
                let Some(obj) = self.top().obj.container(node.name()) else {
                    return Ok(false);
                };
                self.builder.enter(
                    NodeKey::node(node.schema_id().clone()),
                    DataNodeKind::SingleInstance,
                );
                self.emit_leaves(node, obj)?;
                self.push_frame(node, obj, true, None, None);
                Ok(true)
            }
            SchemaKind::List => {
                let Some(entries) = self.top().obj.list(node.name()) else {
                    return Ok(false);
                };
                let mut iter = entries.iter();
                let Some(first) = iter.next() else {
                    return Ok(false);
                };
                let key = list_entry_key(node, first)?;
                self.builder.enter(key, DataNodeKind::MultiInstance);
                self.emit_leaves(node, first)?;
                self.push_frame(node, first, true, Some(iter), None);
                Ok(true)
            }
            SchemaKind::Choice => {
                // never a data node itself; stash the populated case object
                let Some(case_obj) = self.top().obj.case(node.name()) else {
                    return Ok(false);
                };
                let obj = self.top().obj;
                self.push_frame(node, obj, false, None, Some(case_obj));
                Ok(true)
            }
            SchemaKind::Case => {
                let Some(case_obj) = self.top().case_obj else {
                    return Err(BindError::ShapeMismatch(format!(
                        "case {} reached without choice context",
                        node.schema_id()
                    )));
                };
                let expected = self.registry.class_for(node)?;
                if case_obj.class_name() != expected.interface
                    && case_obj.class_name() != expected.default_class
                {
                    // some other case is populated
                    return Ok(false);
                }
                self.emit_leaves(node, case_obj)?;
                self.push_frame(node, case_obj, false, None, None);
                Ok(true)
            }
            SchemaKind::Augment => {
                let top = self.top();
                if top.schema.kind() == SchemaKind::Choice {
                    // augment adds cases: keep following the choice-case path
                    let (obj, case_obj) = (top.obj, top.case_obj);
                    self.push_frame(node, obj, false, None, case_obj);
                    return Ok(true);
                }
                let class = self.registry.class_for(node)?;
                let Some(aug_obj) = top.obj.augmentation(&class.interface) else {
                    return Ok(false);
                };
                self.emit_leaves(node, aug_obj)?;
                self.push_frame(node, aug_obj, false, None, None);
                Ok(true)
            }
            // leaves are handled by emit_leaves; rpc/notification have
            // their own invocation path
            _ => Ok(false),
        }
    }

    /// Parent-direction handling for the top frame: run the pending
    /// augmentations of the current entry, then pull the next list entry,
    /// then exit the frame.
    fn finish(&mut self) -> Result<Step> {
        loop {
            // augmentations apply to the entry currently on the frame, so
            // they must run before the list iterator advances past it
            let pending_augment = {
                // frames are non-empty while the walk is running
                let frame = self.frames.last_mut().unwrap();
                if frame.next_augment < frame.augments.len() {
                    let a = frame.augments[frame.next_augment].clone();
                    frame.next_augment += 1;
                    Some(a)
                } else {
                    None
                }
            };
            if let Some(aug) = pending_augment {
                if self.enter(&aug)? {
                    return Ok(match first_processable_child(&aug) {
                        Some(child) => Step::Descend(child),
                        None => Step::Climb(aug),
                    });
                }
                continue;
            }

            let next_entry = {
                let frame = self.frames.last_mut().unwrap();
                frame.list_iter.as_mut().and_then(|it| it.next())
            };
            if let Some(entry) = next_entry {
                let schema = self.top_schema();
                {
                    let frame = self.frames.last_mut().unwrap();
                    frame.obj = entry;
                    frame.next_augment = 0;
                }
                let key = list_entry_key(&schema, entry)?;
                self.builder.exit()?;
                self.builder.enter(key, DataNodeKind::MultiInstance);
                self.emit_leaves(&schema, entry)?;
                match first_processable_child(&schema) {
                    Some(child) => return Ok(Step::Descend(child)),
                    None => continue,
                }
            }

            let frame = self.frames.pop().unwrap();
            if self.frames.is_empty() {
                // back at the node the walk started from
                return Ok(Step::Done);
            }
            if frame.emits {
                self.builder.exit()?;
            }
            return Ok(match frame.schema.kind() {
                // a finished case skips its sibling cases; a finished
                // augment returns to the target to try the next one
                SchemaKind::Case | SchemaKind::Augment => Step::Climb(self.top_schema()),
                _ => match next_processable_sibling(&frame.schema) {
                    Some(sib) => Step::Continue(sib),
                    None => Step::Climb(self.top_schema()),
                },
            });
        }
    }

    /// Emit leaf and leaf-list children of `holder` from `obj`, in schema
    /// order, onto the current builder cursor.
    fn emit_leaves(&mut self, holder: &SchemaNodeRef, obj: &ModelObject) -> Result<()> {
        for child in holder.children() {
            match child.kind() {
                SchemaKind::Leaf => {
                    let Some(value) = obj.leaf(child.name()) else {
                        continue;
                    };
                    let ty = leaf_type(&child)?;
                    match leaf_to_raw(value, ty, child.namespace())? {
                        RawLeaf::Omitted => {}
                        RawLeaf::Present { value, namespace } => self.builder.leaf(
                            NodeKey::node(child.schema_id().clone()),
                            DataNodeKind::SingleInstanceLeaf,
                            value,
                            namespace,
                        ),
                    }
                }
                SchemaKind::LeafList => {
                    let Some(values) = obj.leaf_list(child.name()) else {
                        continue;
                    };
                    let ty = leaf_type(&child)?;
                    for v in values {
                        if let RawLeaf::Present { value, namespace } =
                            leaf_to_raw(v, ty, child.namespace())?
                        {
                            let entry = value.clone().unwrap_or_default();
                            self.builder.leaf(
                                NodeKey::leaf_list(child.schema_id().clone(), entry),
                                DataNodeKind::MultiInstanceLeaf,
                                value,
                                namespace,
                            );
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn leaf_type(leaf: &SchemaNodeRef) -> Result<&crate::schema::DataType> {
    leaf.data_type().ok_or_else(|| {
        BindError::ShapeMismatch(format!("leaf {} carries no data type", leaf.schema_id()))
    })
}

/// Key for one list entry, built from the entry's key leaf values
fn list_entry_key(list: &SchemaNodeRef, entry: &ModelObject) -> Result<NodeKey> {
    let mut leaves = Vec::with_capacity(list.key_leaves().len());
    for key_name in list.key_leaves() {
        let leaf = list
            .children()
            .find(|c| c.kind().is_leaf() && c.name() == key_name)
            .ok_or_else(|| {
                BindError::ShapeMismatch(format!(
                    "list {} declares key leaf {key_name} with no schema node",
                    list.schema_id()
                ))
            })?;
        let value = entry.leaf(key_name).ok_or_else(|| {
            BindError::ShapeMismatch(format!(
                "list {} entry is missing key leaf {key_name}",
                list.schema_id()
            ))
        })?;
        match leaf_to_raw(value, leaf_type(&leaf)?, leaf.namespace())? {
            RawLeaf::Present {
                value: Some(v),
                namespace: _,
            } => leaves.push(KeyLeaf {
                name: key_name.clone(),
                namespace: leaf.namespace().to_string(),
                value: v,
            }),
            _ => {
                return Err(BindError::ShapeMismatch(format!(
                    "key leaf {key_name} of {} must carry a value",
                    list.schema_id()
                )));
            }
        }
    }
    Ok(NodeKey::list(list.schema_id().clone(), leaves))
}

/// Whether the walk may enter this node from the child/sibling direction
fn processable(node: &SchemaNodeRef) -> bool {
    matches!(
        node.kind(),
        SchemaKind::Container
            | SchemaKind::List
            | SchemaKind::Choice
            | SchemaKind::Case
            | SchemaKind::Anydata
    )
}

fn first_processable_child(node: &SchemaNodeRef) -> Option<SchemaNodeRef> {
    let mut next = node.first_child();
    while let Some(n) = next {
        if processable(&n) {
            return Some(n);
        }
        next = n.next_sibling();
    }
    None
}

fn next_processable_sibling(node: &SchemaNodeRef) -> Option<SchemaNodeRef> {
    let mut next = node.next_sibling();
    while let Some(n) = next {
        if processable(&n) {
            return Some(n);
        }
        next = n.next_sibling();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::KeyDetail;
    use crate::schema::{DataType, ModuleBuilder, SchemaId};
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        let mut b = ModuleBuilder::new("net", "urn:net");
        let root = b.root();
        let device = b.container(root, "device");
        b.leaf(device, "hostname", DataType::String);
        b.leaf(device, "enabled", DataType::Empty);
        let iface = b.list(device, "interface", &["name"]);
        b.leaf(iface, "name", DataType::String);
        b.leaf(iface, "mtu", DataType::Uint16);
        b.rpc(root, "reboot");
        registry.register(b.build());
        registry
    }

    fn nid(name: &str) -> NodeKey {
        NodeKey::node(SchemaId::new(name, "urn:net"))
    }

    #[test]
    fn test_container_with_leaves() {
        let registry = registry();
        let device = ModelObject::new("net.Device").with_leaf("hostname", json!("r1"));
        let out = object_to_data(&registry, &ModelObjectData::of(vec![device])).unwrap();

        let tree = &out.nodes()[0];
        assert_eq!(tree.schema_id().name, "device");
        let hostname = tree.child(&nid("hostname")).unwrap();
        assert_eq!(hostname.value(), Some("r1"));
    }

    #[test]
    fn test_presence_pruning_emits_nothing() {
        let registry = registry();
        // hostname left unset: no child node, no error
        let device = ModelObject::new("net.Device");
        let out = object_to_data(&registry, &ModelObjectData::of(vec![device])).unwrap();
        assert!(out.nodes()[0].children().is_empty());
    }

    #[test]
    fn test_empty_type_flag_controls_emission() {
        let registry = registry();
        let device = ModelObject::new("net.Device").with_leaf("enabled", json!(true));
        let out = object_to_data(&registry, &ModelObjectData::of(vec![device])).unwrap();
        let enabled = out.nodes()[0].child(&nid("enabled")).unwrap();
        assert_eq!(enabled.value(), None);

        let device = ModelObject::new("net.Device").with_leaf("enabled", json!(false));
        let out = object_to_data(&registry, &ModelObjectData::of(vec![device])).unwrap();
        assert!(out.nodes()[0].child(&nid("enabled")).is_none());
    }

    #[test]
    fn test_list_entries_in_insertion_order() {
        let registry = registry();
        let mut device = ModelObject::new("net.Device");
        for name in ["eth0", "eth1", "eth2"] {
            device.add_list_entry(
                "interface",
                ModelObject::new("net.device.Interface").with_leaf("name", json!(name)),
            );
        }
        let out = object_to_data(&registry, &ModelObjectData::of(vec![device])).unwrap();

        let entries: Vec<&str> = out.nodes()[0]
            .children()
            .iter()
            .map(|c| match &c.key().detail {
                KeyDetail::List(leaves) => leaves[0].value.as_str(),
                other => panic!("expected list entries, got {other:?}"),
            })
            .collect();
        assert_eq!(entries, ["eth0", "eth1", "eth2"]);
    }

    #[test]
    fn test_each_list_entry_keeps_augmentation_content() {
        let registry = registry();
        let mut ext = ModuleBuilder::new("ext", "urn:ext");
        let aug = ext.augment("urn:net", &["device", "interface"]);
        ext.leaf(aug, "speed", DataType::Uint32);
        registry.register(ext.build());

        let mut device = ModelObject::new("net.Device");
        for name in ["eth0", "eth1"] {
            device.add_list_entry(
                "interface",
                ModelObject::new("net.device.Interface")
                    .with_leaf("name", json!(name))
                    .with_augmentation(
                        "ext.AugmentDeviceInterface",
                        ModelObject::new("ext.AugmentDeviceInterface")
                            .with_leaf("speed", json!(1000)),
                    ),
            );
        }
        let out = object_to_data(&registry, &ModelObjectData::of(vec![device])).unwrap();

        let entries = out.nodes()[0].children();
        assert_eq!(entries.len(), 2);
        let speed_key = NodeKey::node(SchemaId::new("speed", "urn:ext"));
        for entry in entries {
            let speed = entry.child(&speed_key);
            assert_eq!(
                speed.and_then(|n| n.value()),
                Some("1000"),
                "entry {:?} lost its augmentation content",
                entry.key()
            );
        }
    }

    #[test]
    fn test_missing_key_leaf_is_shape_mismatch() {
        let registry = registry();
        let device = ModelObject::new("net.Device")
            .with_list_entry("interface", ModelObject::new("net.device.Interface"));
        let err = object_to_data(&registry, &ModelObjectData::of(vec![device])).unwrap_err();
        assert!(matches!(err, BindError::ShapeMismatch(_)));
    }

    #[test]
    fn test_unregistered_class_fails() {
        let registry = registry();
        let stranger = ModelObject::new("other.Thing");
        let err = object_to_data(&registry, &ModelObjectData::of(vec![stranger])).unwrap_err();
        assert!(matches!(err, BindError::ClassResolution(_)));
    }
}
