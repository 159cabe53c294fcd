//! Process-wide schema registry
//!
//! Maps schema identities and generated-class identities to schema nodes.
//! Registration derives a [`ModelClass`] binding for every node of the
//! module (the compile-time class registry replacing runtime classloader
//! lookups) and resolves the module's augment declarations against their
//! target modules.
//!
//! Lookups take the read lock only long enough to clone out `Arc`-backed
//! handles; register/unregister of the same module must be serialized by
//! the caller.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::warn;

use crate::error::{BindError, Result};
use crate::schema::{NodeId, SchemaId, SchemaKind, SchemaModule, SchemaNodeRef};

/// Deterministic generated-class naming for one schema node
///
/// The naming convention (Default-prefixed implementation class,
/// Keys-suffixed key class, $LeafIdentifier-suffixed leaf enum) is a fixed
/// contract with the generated-code world; changing it breaks lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelClass {
    /// Fully qualified public interface class name
    pub interface: String,
    /// Fully qualified default/builder class name
    pub default_class: String,
    /// Key class name, list nodes only
    pub key_class: Option<String>,
    /// Leaf identifier enum name, leaf/leaf-list nodes only
    pub leaf_identifier: Option<String>,
}

impl ModelClass {
    fn derive(module_name: &str, path: &[String], kind: SchemaKind) -> Self {
        let type_source = path.last().map(|s| s.as_str()).unwrap_or(module_name);
        let mut pkg = vec![segment(module_name)];
        if path.len() > 1 {
            pkg.extend(path[..path.len() - 1].iter().map(|p| segment(p)));
        }
        let pkg = pkg.join(".");
        let ty = pascal(type_source);

        let key_class = (kind == SchemaKind::List).then(|| format!("{pkg}.{ty}Keys"));
        let leaf_identifier = kind.is_leaf().then(|| {
            let owner = Self::derive(module_name, &path[..path.len() - 1], SchemaKind::Container);
            format!("{}$LeafIdentifier", owner.interface)
        });

        Self {
            interface: format!("{pkg}.{ty}"),
            default_class: format!("{pkg}.Default{ty}"),
            key_class,
            leaf_identifier,
        }
    }
}

fn pascal(name: &str) -> String {
    name.split(['-', '_', '.'])
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut chars = p.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn segment(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

type NodeRefKey = (String, NodeId);

#[derive(Debug, Default)]
struct Inner {
    /// namespace -> compiled module
    modules: HashMap<String, Arc<SchemaModule>>,
    /// schema node -> class binding
    bindings: HashMap<NodeRefKey, ModelClass>,
    /// interface or default class name -> schema node
    class_index: HashMap<String, NodeRefKey>,
    /// target node -> augment nodes, registration order
    augments: HashMap<NodeRefKey, Vec<NodeRefKey>>,
    /// augment node -> its resolved target
    augment_targets: HashMap<NodeRefKey, NodeRefKey>,
}

impl Inner {
    fn node_ref(&self, key: &NodeRefKey) -> Option<SchemaNodeRef> {
        self.modules
            .get(&key.0)
            .map(|m| SchemaNodeRef::new(Arc::clone(m), key.1))
    }
}

/// Shared lookup table over all registered schema modules
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    inner: RwLock<Inner>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled module: indexes its nodes, derives class
    /// bindings and resolves its augment declarations.
    ///
    /// Re-registering an already-registered namespace is a logged no-op.
    pub fn register(&self, module: Arc<SchemaModule>) {
        let mut inner = self.inner.write().unwrap();
        let ns = module.namespace().to_string();
        if inner.modules.contains_key(&ns) {
            warn!("module namespace {ns} already registered, keeping first registration");
            return;
        }
        inner.modules.insert(ns.clone(), Arc::clone(&module));

        for id in 0..module.node_count() {
            let node = SchemaNodeRef::new(Arc::clone(&module), id);
            let class = ModelClass::derive(module.name(), &node.path_names(), node.kind());
            if inner.class_index.contains_key(&class.interface) {
                warn!(
                    "class {} already registered, skipping binding for {}",
                    class.interface,
                    node.schema_id()
                );
                continue;
            }
            inner
                .class_index
                .insert(class.interface.clone(), (ns.clone(), id));
            inner
                .class_index
                .insert(class.default_class.clone(), (ns.clone(), id));
            inner.bindings.insert((ns.clone(), id), class);

            if node.kind() == SchemaKind::Augment {
                match resolve_augment_target(&inner, &node) {
                    Some(target) => {
                        let target_key = (target.namespace().to_string(), target.node_id());
                        inner
                            .augments
                            .entry(target_key.clone())
                            .or_default()
                            .push((ns.clone(), id));
                        inner.augment_targets.insert((ns.clone(), id), target_key);
                    }
                    None => warn!(
                        "augment target of {} not resolvable, skipping",
                        node.schema_id()
                    ),
                }
            }
        }
    }

    /// Remove all lookup entries for a namespace; unknown namespaces are a
    /// logged no-op.
    pub fn unregister(&self, namespace: &str) {
        let mut inner = self.inner.write().unwrap();
        if inner.modules.remove(namespace).is_none() {
            warn!("module namespace {namespace} not registered, nothing to unregister");
            return;
        }
        inner.bindings.retain(|(ns, _), _| ns != namespace);
        inner.class_index.retain(|_, (ns, _)| ns != namespace);
        inner.augments.retain(|(ns, _), _| ns != namespace);
        for augs in inner.augments.values_mut() {
            augs.retain(|(ns, _)| ns != namespace);
        }
        inner.augment_targets.retain(|(ns, _), _| ns != namespace);
    }

    /// Registered module for a namespace
    pub fn module(&self, namespace: &str) -> Option<Arc<SchemaModule>> {
        self.inner.read().unwrap().modules.get(namespace).cloned()
    }

    /// Resolve a child schema node by identity, recursing transparently
    /// through Choice/Case and searching registered augmentations.
    ///
    /// A `None` parent addresses the top level of the child's module.
    pub fn resolve_child(
        &self,
        parent: Option<&SchemaNodeRef>,
        child: &SchemaId,
    ) -> Result<SchemaNodeRef> {
        let inner = self.inner.read().unwrap();
        let base = match parent {
            Some(p) => p.clone(),
            None => {
                let module = inner.modules.get(&child.namespace).ok_or_else(|| {
                    BindError::SchemaResolution(format!(
                        "namespace {} not registered",
                        child.namespace
                    ))
                })?;
                module.root()
            }
        };

        find_data_child(&inner, &base, child).ok_or_else(|| {
            BindError::SchemaResolution(format!(
                "child {child} not found under {}",
                base.schema_id()
            ))
        })
    }

    /// Registered class binding for a schema node
    pub fn class_for(&self, node: &SchemaNodeRef) -> Result<ModelClass> {
        self.inner
            .read()
            .unwrap()
            .bindings
            .get(&(node.namespace().to_string(), node.node_id()))
            .cloned()
            .ok_or_else(|| {
                BindError::ClassResolution(format!("no class registered for {}", node.schema_id()))
            })
    }

    /// Reverse lookup from an interface or default class name
    pub fn node_for_class(&self, class: &str) -> Option<SchemaNodeRef> {
        let inner = self.inner.read().unwrap();
        let key = inner.class_index.get(class)?.clone();
        inner.node_ref(&key)
    }

    /// Augment nodes registered against a target node, in registration order
    pub fn augments_of(&self, node: &SchemaNodeRef) -> Vec<SchemaNodeRef> {
        let inner = self.inner.read().unwrap();
        inner
            .augments
            .get(&(node.namespace().to_string(), node.node_id()))
            .map(|keys| keys.iter().filter_map(|k| inner.node_ref(k)).collect())
            .unwrap_or_default()
    }

    /// Resolved target of an augment node
    pub fn augment_target(&self, augment: &SchemaNodeRef) -> Option<SchemaNodeRef> {
        let inner = self.inner.read().unwrap();
        let key = inner
            .augment_targets
            .get(&(augment.namespace().to_string(), augment.node_id()))?
            .clone();
        inner.node_ref(&key)
    }
}

/// Scan `base`'s children for `child`, descending through Choice and Case
/// (they are invisible in the data-node address space) and through
/// augmentations registered against any node of the scanned subtree
/// (augment content is addressed as if native to its target). Augment
/// declarations hanging off a module root are not data children.
fn find_data_child(inner: &Inner, base: &SchemaNodeRef, child: &SchemaId) -> Option<SchemaNodeRef> {
    for c in base.children() {
        match c.kind() {
            SchemaKind::Choice | SchemaKind::Case => {
                if let Some(found) = find_data_child(inner, &c, child) {
                    return Some(found);
                }
            }
            SchemaKind::Augment => {}
            _ => {
                if c.schema_id() == child {
                    return Some(c);
                }
            }
        }
    }
    let base_key = (base.namespace().to_string(), base.node_id());
    if let Some(augs) = inner.augments.get(&base_key) {
        for aug_key in augs {
            if let Some(aug) = inner.node_ref(aug_key)
                && let Some(found) = find_data_child(inner, &aug, child)
            {
                return Some(found);
            }
        }
    }
    None
}

fn resolve_augment_target(inner: &Inner, augment: &SchemaNodeRef) -> Option<SchemaNodeRef> {
    let target = augment.augment_target()?;
    let module = inner.modules.get(&target.namespace)?;
    let mut cur = module.root();
    for name in &target.path {
        cur = cur.children().find(|c| c.name() == name)?;
    }
    Some(cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataType, ModuleBuilder};

    fn sample_module() -> Arc<SchemaModule> {
        let mut b = ModuleBuilder::new("example-net", "urn:example:net");
        let root = b.root();
        let ifs = b.container(root, "interfaces");
        let iface = b.list(ifs, "interface", &["name"]);
        b.leaf(iface, "name", DataType::String);
        let transport = b.choice(iface, "transport");
        let tcp = b.case(transport, "tcp");
        b.leaf(tcp, "port", DataType::Uint16);
        let udp = b.case(transport, "udp");
        b.leaf(udp, "datagram-size", DataType::Uint16);
        b.build()
    }

    #[test]
    fn test_class_naming_contract() {
        let class = ModelClass::derive(
            "example-net",
            &["interfaces".into(), "interface".into()],
            SchemaKind::List,
        );
        assert_eq!(class.interface, "examplenet.interfaces.Interface");
        assert_eq!(class.default_class, "examplenet.interfaces.DefaultInterface");
        assert_eq!(
            class.key_class.as_deref(),
            Some("examplenet.interfaces.InterfaceKeys")
        );
    }

    #[test]
    fn test_leaf_identifier_naming() {
        let class = ModelClass::derive(
            "example-net",
            &["interfaces".into(), "interface".into(), "name".into()],
            SchemaKind::Leaf,
        );
        assert_eq!(
            class.leaf_identifier.as_deref(),
            Some("examplenet.interfaces.Interface$LeafIdentifier")
        );
    }

    #[test]
    fn test_resolve_child_through_choice_case() {
        let registry = SchemaRegistry::new();
        registry.register(sample_module());

        let ifs = registry
            .resolve_child(None, &SchemaId::new("interfaces", "urn:example:net"))
            .unwrap();
        let iface = registry
            .resolve_child(Some(&ifs), &SchemaId::new("interface", "urn:example:net"))
            .unwrap();
        // port lives two schema levels deeper, under choice then case
        let port = registry
            .resolve_child(Some(&iface), &SchemaId::new("port", "urn:example:net"))
            .unwrap();
        assert_eq!(port.kind(), SchemaKind::Leaf);
        assert_eq!(port.parent().unwrap().name(), "tcp");
    }

    #[test]
    fn test_resolve_child_through_augmented_choice() {
        let registry = SchemaRegistry::new();
        registry.register(sample_module());

        let mut b = ModuleBuilder::new("example-ext", "urn:example:ext");
        let aug = b.augment("urn:example:net", &["interfaces", "interface", "transport"]);
        let sctp = b.case(aug, "sctp");
        b.leaf(sctp, "streams", DataType::Uint16);
        registry.register(b.build());

        let ifs = registry
            .resolve_child(None, &SchemaId::new("interfaces", "urn:example:net"))
            .unwrap();
        let iface = registry
            .resolve_child(Some(&ifs), &SchemaId::new("interface", "urn:example:net"))
            .unwrap();
        // streams sits under a case another module added to the choice
        let streams = registry
            .resolve_child(Some(&iface), &SchemaId::new("streams", "urn:example:ext"))
            .unwrap();
        assert_eq!(streams.kind(), SchemaKind::Leaf);
        assert_eq!(streams.parent().unwrap().name(), "sctp");
    }

    #[test]
    fn test_unregistered_namespace_fails() {
        let registry = SchemaRegistry::new();
        let err = registry
            .resolve_child(None, &SchemaId::new("interfaces", "urn:missing"))
            .unwrap_err();
        assert!(matches!(err, BindError::SchemaResolution(_)));
    }

    #[test]
    fn test_class_for_unregistered_module() {
        let registry = SchemaRegistry::new();
        let module = sample_module();
        let root = module.root();
        assert!(matches!(
            registry.class_for(&root),
            Err(BindError::ClassResolution(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = SchemaRegistry::new();
        let m1 = sample_module();
        registry.register(Arc::clone(&m1));
        registry.register(sample_module());
        // first registration still resolvable
        assert!(registry.module("urn:example:net").is_some());
    }

    #[test]
    fn test_unregister_removes_lookups() {
        let registry = SchemaRegistry::new();
        registry.register(sample_module());
        registry.unregister("urn:example:net");

        assert!(registry.module("urn:example:net").is_none());
        assert!(registry
            .resolve_child(None, &SchemaId::new("interfaces", "urn:example:net"))
            .is_err());
        // second unregister is a logged no-op
        registry.unregister("urn:example:net");
    }

    #[test]
    fn test_cross_module_augment_resolution() {
        let registry = SchemaRegistry::new();
        registry.register(sample_module());

        let mut b = ModuleBuilder::new("example-ext", "urn:example:ext");
        let aug = b.augment("urn:example:net", &["interfaces"]);
        b.leaf(aug, "description", DataType::String);
        registry.register(b.build());

        let ifs = registry
            .resolve_child(None, &SchemaId::new("interfaces", "urn:example:net"))
            .unwrap();
        assert_eq!(registry.augments_of(&ifs).len(), 1);

        // augmented child resolves as if native to the target
        let desc = registry
            .resolve_child(Some(&ifs), &SchemaId::new("description", "urn:example:ext"))
            .unwrap();
        assert_eq!(desc.kind(), SchemaKind::Leaf);

        registry.unregister("urn:example:ext");
        assert!(registry.augments_of(&ifs).is_empty());
    }

    #[test]
    fn test_node_for_class_roundtrip() {
        let registry = SchemaRegistry::new();
        registry.register(sample_module());

        let ifs = registry
            .resolve_child(None, &SchemaId::new("interfaces", "urn:example:net"))
            .unwrap();
        let class = registry.class_for(&ifs).unwrap();
        let back = registry.node_for_class(&class.interface).unwrap();
        assert_eq!(back, ifs);
        let back = registry.node_for_class(&class.default_class).unwrap();
        assert_eq!(back, ifs);
    }
}
