//! Identifier conversion between addressing schemes
//!
//! A [`ModelObjectId`] addresses a location with generated-class steps; a
//! [`ResourceId`] addresses the same location with schema-id branch
//! points. Both converters are driven by the registry and are exact
//! inverses of each other for every valid identifier.

use crate::data::{KeyLeaf, NodeKey, ResourceId};
use crate::error::{BindError, Result};
use crate::model::{AtomicPath, ModelObjectId};
use crate::registry::SchemaRegistry;
use crate::schema::{SchemaId, SchemaKind, SchemaNodeRef};

/// Convert a typed model-object identifier into a resource identifier
pub fn resource_id_from_model_id(
    registry: &SchemaRegistry,
    id: &ModelObjectId,
) -> Result<ResourceId> {
    let mut rid = ResourceId::root();
    let mut ctx: Option<SchemaNodeRef> = None;
    let last = id.steps().len().saturating_sub(1);

    for (i, step) in id.steps().iter().enumerate() {
        match step {
            AtomicPath::SingleInstanceNode { class } => {
                let node = resolve_step_class(registry, ctx.as_ref(), class)?;
                rid.push(NodeKey::node(node.schema_id().clone()));
                ctx = Some(node);
            }
            AtomicPath::MultiInstanceNode { class, key } => {
                let node = resolve_step_class(registry, ctx.as_ref(), class)?;
                if node.kind() != SchemaKind::List {
                    return Err(BindError::InvalidModelId(format!(
                        "{class} is not a list class"
                    )));
                }
                let key_leaves = node.key_leaves();
                if key.len() != key_leaves.len() {
                    return Err(BindError::InvalidModelId(format!(
                        "list {} expects {} key value(s), got {}",
                        node.schema_id(),
                        key_leaves.len(),
                        key.len()
                    )));
                }
                let leaves = key_leaves
                    .iter()
                    .zip(key)
                    .map(|(name, value)| KeyLeaf {
                        name: name.clone(),
                        namespace: node.namespace().to_string(),
                        value: value.clone(),
                    })
                    .collect();
                rid.push(NodeKey::list(node.schema_id().clone(), leaves));
                ctx = Some(node);
            }
            AtomicPath::SingleInstanceLeaf { class, leaf } => {
                // nothing nests under a leaf
                if i != last {
                    return Err(BindError::InvalidModelId(format!(
                        "leaf step {leaf} must terminate the identifier"
                    )));
                }
                let node = resolve_leaf_step(registry, ctx.as_ref(), class, leaf, i == 0)?;
                rid.push(NodeKey::node(node.schema_id().clone()));
            }
            AtomicPath::MultiInstanceLeaf { class, leaf, value } => {
                if i != last {
                    return Err(BindError::InvalidModelId(format!(
                        "leaf-list step {leaf} must terminate the identifier"
                    )));
                }
                let node = resolve_leaf_step(registry, ctx.as_ref(), class, leaf, i == 0)?;
                rid.push(NodeKey::leaf_list(node.schema_id().clone(), value.clone()));
            }
        }
    }

    Ok(rid)
}

/// Convert a resource identifier into a typed model-object identifier
pub fn model_id_from_resource_id(
    registry: &SchemaRegistry,
    id: &ResourceId,
) -> Result<ModelObjectId> {
    let mut mid = ModelObjectId::new();
    let mut ctx: Option<SchemaNodeRef> = None;
    let mut at_leaf = false;

    for key in id.branch_keys() {
        // nothing nests under a leaf
        if at_leaf {
            return Err(BindError::SchemaResolution(format!(
                "key {} follows a leaf key, which terminates the identifier",
                key.id
            )));
        }
        let node = registry.resolve_child(ctx.as_ref(), &key.id)?;
        match &key.detail {
            crate::data::KeyDetail::List(leaves) => {
                let class = registry.class_for(&node)?.interface;
                let values = leaves.iter().map(|l| l.value.clone()).collect();
                mid = mid.list_node(class, values);
                ctx = Some(node);
            }
            crate::data::KeyDetail::LeafList(value) => {
                let owner = leaf_owner_class(registry, &node)?;
                mid = mid.leaf_list(owner, node.name(), value.clone());
                at_leaf = true;
            }
            crate::data::KeyDetail::Node => {
                if node.kind().is_leaf() {
                    let owner = leaf_owner_class(registry, &node)?;
                    mid = mid.leaf(owner, node.name());
                    at_leaf = true;
                } else {
                    mid = mid.node(registry.class_for(&node)?.interface);
                    ctx = Some(node);
                }
            }
        }
    }

    Ok(mid)
}

/// Schema context a resource identifier is anchored at (`None` for "/")
pub(crate) fn schema_context_of(
    registry: &SchemaRegistry,
    id: &ResourceId,
) -> Result<Option<SchemaNodeRef>> {
    let mut ctx: Option<SchemaNodeRef> = None;
    for key in id.branch_keys() {
        ctx = Some(registry.resolve_child(ctx.as_ref(), &key.id)?);
    }
    Ok(ctx)
}

/// Resolve a node step's class against the current context. Augment search
/// precedes plain-child search; first match wins.
fn resolve_step_class(
    registry: &SchemaRegistry,
    ctx: Option<&SchemaNodeRef>,
    class: &str,
) -> Result<SchemaNodeRef> {
    match ctx {
        None => registry.node_for_class(class).ok_or_else(|| {
            BindError::InvalidModelId(format!("class {class} not registered"))
        }),
        Some(ctx) => {
            for aug in registry.augments_of(ctx) {
                if let Some(found) = child_with_class(registry, &aug, class) {
                    return Ok(found);
                }
            }
            child_with_class(registry, ctx, class).ok_or_else(|| {
                BindError::InvalidModelId(format!(
                    "class {class} not resolvable under {}",
                    ctx.schema_id()
                ))
            })
        }
    }
}

fn resolve_leaf_step(
    registry: &SchemaRegistry,
    ctx: Option<&SchemaNodeRef>,
    class: &str,
    leaf: &str,
    first: bool,
) -> Result<SchemaNodeRef> {
    let holder = if first {
        // module-level leaf: the step's class names the module itself
        let node = registry.node_for_class(class).ok_or_else(|| {
            BindError::InvalidModelId(format!("class {class} not registered"))
        })?;
        if node.kind() != SchemaKind::Module {
            return Err(BindError::InvalidModelId(format!(
                "first-position leaf step expects a module class, got {class}"
            )));
        }
        node
    } else {
        let ctx = ctx.ok_or_else(|| {
            BindError::InvalidModelId(format!("leaf step {leaf} has no holder context"))
        })?;
        let ctx_class = registry.class_for(ctx)?;
        if ctx_class.interface == class || ctx_class.default_class == class {
            ctx.clone()
        } else {
            // leaf added by an augmentation carries the augmentation's class
            registry
                .augments_of(ctx)
                .into_iter()
                .find(|aug| {
                    registry
                        .class_for(aug)
                        .map(|c| c.interface == class || c.default_class == class)
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    BindError::InvalidModelId(format!(
                        "class {class} does not hold a leaf under {}",
                        ctx.schema_id()
                    ))
                })?
        }
    };

    child_leaf_by_name(&holder, leaf).ok_or_else(|| {
        BindError::InvalidModelId(format!(
            "leaf {leaf} not found under {}",
            holder.schema_id()
        ))
    })
}

/// The class a leaf step references: the nearest enclosing holder's class,
/// or the augmentation's class for augment-added leaves, or the module
/// class for module-level leaves.
fn leaf_owner_class(registry: &SchemaRegistry, leaf: &SchemaNodeRef) -> Result<String> {
    let mut cur = leaf.parent();
    while let Some(node) = cur {
        match node.kind() {
            SchemaKind::Choice | SchemaKind::Case => cur = node.parent(),
            _ => return Ok(registry.class_for(&node)?.interface),
        }
    }
    Err(BindError::SchemaResolution(format!(
        "leaf {} has no holder",
        leaf.schema_id()
    )))
}

/// Deep child scan by registered class name, through choice/case
fn child_with_class(
    registry: &SchemaRegistry,
    base: &SchemaNodeRef,
    class: &str,
) -> Option<SchemaNodeRef> {
    for c in base.children() {
        match c.kind() {
            SchemaKind::Choice | SchemaKind::Case => {
                if let Some(found) = child_with_class(registry, &c, class) {
                    return Some(found);
                }
            }
            SchemaKind::Augment => {}
            _ => {
                if let Ok(bound) = registry.class_for(&c)
                    && (bound.interface == class || bound.default_class == class)
                {
                    return Some(c);
                }
            }
        }
    }
    None
}

/// Deep leaf scan by name, through choice/case
fn child_leaf_by_name(base: &SchemaNodeRef, leaf: &str) -> Option<SchemaNodeRef> {
    for c in base.children() {
        match c.kind() {
            SchemaKind::Choice | SchemaKind::Case => {
                if let Some(found) = child_leaf_by_name(&c, leaf) {
                    return Some(found);
                }
            }
            k if k.is_leaf() => {
                if c.name() == leaf {
                    return Some(c);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::KeyDetail;
    use crate::model::ModelObjectId;
    use crate::schema::{DataType, ModuleBuilder};

    fn registry() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        let mut b = ModuleBuilder::new("net", "urn:net");
        let root = b.root();
        b.leaf(root, "hostname", DataType::String);
        let ifs = b.container(root, "interfaces");
        let iface = b.list(ifs, "interface", &["name"]);
        b.leaf(iface, "name", DataType::String);
        b.leaf(iface, "mtu", DataType::Uint16);
        b.leaf_list(iface, "address", DataType::String);
        registry.register(b.build());

        let mut e = ModuleBuilder::new("ext", "urn:ext");
        let aug = e.augment("urn:net", &["interfaces"]);
        let stats = e.container(aug, "stats");
        e.leaf(stats, "in-octets", DataType::Uint64);
        registry.register(e.build());

        registry
    }

    #[test]
    fn test_container_list_leaf_conversion() {
        let registry = registry();
        let mid = ModelObjectId::new()
            .node("net.Interfaces")
            .list_node("net.interfaces.Interface", vec!["eth0".into()])
            .leaf("net.interfaces.Interface", "mtu");

        let rid = resource_id_from_model_id(&registry, &mid).unwrap();
        let keys = rid.branch_keys();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].id.name, "interfaces");
        match &keys[1].detail {
            KeyDetail::List(leaves) => {
                assert_eq!(leaves[0].name, "name");
                assert_eq!(leaves[0].value, "eth0");
            }
            other => panic!("expected list key, got {other:?}"),
        }
        assert_eq!(keys[2].id.name, "mtu");
    }

    #[test]
    fn test_identifier_roundtrip() {
        let registry = registry();
        let mid = ModelObjectId::new()
            .node("net.Interfaces")
            .list_node("net.interfaces.Interface", vec!["eth0".into()])
            .leaf_list("net.interfaces.Interface", "address", "10.0.0.1");

        let rid = resource_id_from_model_id(&registry, &mid).unwrap();
        let back = model_id_from_resource_id(&registry, &rid).unwrap();
        assert_eq!(back, mid);
    }

    #[test]
    fn test_keys_after_leaf_key_fail() {
        let registry = registry();
        let mut rid = ResourceId::root();
        rid.push(NodeKey::node(SchemaId::new("hostname", "urn:net")));
        rid.push(NodeKey::node(SchemaId::new("interfaces", "urn:net")));

        assert!(matches!(
            model_id_from_resource_id(&registry, &rid),
            Err(BindError::SchemaResolution(_))
        ));
    }

    #[test]
    fn test_module_level_leaf_addressing() {
        let registry = registry();
        let mid = ModelObjectId::new().leaf("net.Net", "hostname");

        let rid = resource_id_from_model_id(&registry, &mid).unwrap();
        assert_eq!(rid.branch_keys().len(), 1);
        assert_eq!(rid.branch_keys()[0].id.name, "hostname");

        let back = model_id_from_resource_id(&registry, &rid).unwrap();
        assert_eq!(back, mid);
    }

    #[test]
    fn test_leaf_step_must_be_last() {
        let registry = registry();
        let mid = ModelObjectId::new()
            .leaf("net.Net", "hostname")
            .node("net.Interfaces");
        assert!(matches!(
            resource_id_from_model_id(&registry, &mid),
            Err(BindError::InvalidModelId(_))
        ));
    }

    #[test]
    fn test_augmented_step_resolution() {
        let registry = registry();
        // stats was added to interfaces by the ext module's augment
        let mid = ModelObjectId::new()
            .node("net.Interfaces")
            .node("ext.augmentinterfaces.Stats");

        let rid = resource_id_from_model_id(&registry, &mid).unwrap();
        assert_eq!(rid.branch_keys()[1].id.namespace, "urn:ext");

        let back = model_id_from_resource_id(&registry, &rid).unwrap();
        assert_eq!(back, mid);
    }

    #[test]
    fn test_unresolvable_class_fails() {
        let registry = registry();
        let mid = ModelObjectId::new().node("net.Nonexistent");
        assert!(matches!(
            resource_id_from_model_id(&registry, &mid),
            Err(BindError::InvalidModelId(_))
        ));
    }

    #[test]
    fn test_list_key_arity_check() {
        let registry = registry();
        let mid = ModelObjectId::new()
            .node("net.Interfaces")
            .list_node("net.interfaces.Interface", vec!["eth0".into(), "extra".into()]);
        assert!(matches!(
            resource_id_from_model_id(&registry, &mid),
            Err(BindError::InvalidModelId(_))
        ));
    }
}
