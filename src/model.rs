//! Schema-bound model objects and typed path addressing
//!
//! A [`ModelObject`] is the runtime stand-in for a generated typed class:
//! a field-accessor table keyed by schema names, bound to its registered
//! class name. Choice content is a tagged slot keyed by choice name (the
//! stored object's class is the case discriminant); augmentations are
//! slots keyed by the augmentation's registered class name.

use std::collections::BTreeMap;

use serde_json::Value;

/// A typed object instance corresponding to one schema holder node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelObject {
    class_name: String,
    leaves: BTreeMap<String, Value>,
    leaf_lists: BTreeMap<String, Vec<Value>>,
    containers: BTreeMap<String, ModelObject>,
    lists: BTreeMap<String, Vec<ModelObject>>,
    cases: BTreeMap<String, ModelObject>,
    augmentations: BTreeMap<String, ModelObject>,
}

impl ModelObject {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    /// Registered class this object is an instance of
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn leaf(&self, name: &str) -> Option<&Value> {
        self.leaves.get(name)
    }

    pub fn set_leaf(&mut self, name: impl Into<String>, value: Value) {
        self.leaves.insert(name.into(), value);
    }

    pub fn leaf_list(&self, name: &str) -> Option<&[Value]> {
        self.leaf_lists.get(name).map(|v| v.as_slice())
    }

    pub fn push_leaf_list(&mut self, name: &str, value: Value) {
        self.leaf_lists.entry(name.to_string()).or_default().push(value);
    }

    pub fn container(&self, name: &str) -> Option<&ModelObject> {
        self.containers.get(name)
    }

    pub fn set_container(&mut self, name: impl Into<String>, child: ModelObject) {
        self.containers.insert(name.into(), child);
    }

    /// Entries of a multi-instance child, insertion order
    pub fn list(&self, name: &str) -> Option<&[ModelObject]> {
        self.lists.get(name).map(|v| v.as_slice())
    }

    pub fn add_list_entry(&mut self, name: &str, entry: ModelObject) {
        self.lists.entry(name.to_string()).or_default().push(entry);
    }

    /// The populated case object of a choice, if any
    pub fn case(&self, choice: &str) -> Option<&ModelObject> {
        self.cases.get(choice)
    }

    pub fn set_case(&mut self, choice: impl Into<String>, case: ModelObject) {
        self.cases.insert(choice.into(), case);
    }

    pub fn augmentation(&self, class_name: &str) -> Option<&ModelObject> {
        self.augmentations.get(class_name)
    }

    pub fn set_augmentation(&mut self, class_name: impl Into<String>, aug: ModelObject) {
        self.augmentations.insert(class_name.into(), aug);
    }

    pub fn augmentations(&self) -> impl Iterator<Item = (&str, &ModelObject)> {
        self.augmentations.iter().map(|(k, v)| (k.as_str(), v))
    }

    // Chaining helpers for building fixture/object trees by hand.

    pub fn with_leaf(mut self, name: &str, value: Value) -> Self {
        self.set_leaf(name, value);
        self
    }

    pub fn with_leaf_list_entry(mut self, name: &str, value: Value) -> Self {
        self.push_leaf_list(name, value);
        self
    }

    pub fn with_container(mut self, name: &str, child: ModelObject) -> Self {
        self.set_container(name, child);
        self
    }

    pub fn with_list_entry(mut self, name: &str, entry: ModelObject) -> Self {
        self.add_list_entry(name, entry);
        self
    }

    pub fn with_case(mut self, choice: &str, case: ModelObject) -> Self {
        self.set_case(choice, case);
        self
    }

    pub fn with_augmentation(mut self, class_name: &str, aug: ModelObject) -> Self {
        self.set_augmentation(class_name, aug);
        self
    }
}

/// One step of a typed object-space path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomicPath {
    /// Container step referencing its class
    SingleInstanceNode { class: String },
    /// List step referencing its class plus ordered key leaf values
    MultiInstanceNode { class: String, key: Vec<String> },
    /// Leaf step: owning holder class plus leaf name
    SingleInstanceLeaf { class: String, leaf: String },
    /// Leaf-list step: owning holder class, leaf name and entry value
    MultiInstanceLeaf {
        class: String,
        leaf: String,
        value: String,
    },
}

/// Ordered typed path identifying a location in the model-object space
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModelObjectId {
    steps: Vec<AtomicPath>,
}

impl ModelObjectId {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[AtomicPath] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn node(mut self, class: impl Into<String>) -> Self {
        self.steps.push(AtomicPath::SingleInstanceNode {
            class: class.into(),
        });
        self
    }

    pub fn list_node(mut self, class: impl Into<String>, key: Vec<String>) -> Self {
        self.steps.push(AtomicPath::MultiInstanceNode {
            class: class.into(),
            key,
        });
        self
    }

    pub fn leaf(mut self, class: impl Into<String>, leaf: impl Into<String>) -> Self {
        self.steps.push(AtomicPath::SingleInstanceLeaf {
            class: class.into(),
            leaf: leaf.into(),
        });
        self
    }

    pub fn leaf_list(
        mut self,
        class: impl Into<String>,
        leaf: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.steps.push(AtomicPath::MultiInstanceLeaf {
            class: class.into(),
            leaf: leaf.into(),
            value: value.into(),
        });
        self
    }
}

/// Conversion-boundary bundle: an optional typed anchor plus objects
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelObjectData {
    id: Option<ModelObjectId>,
    objects: Vec<ModelObject>,
}

impl ModelObjectData {
    pub fn new(id: Option<ModelObjectId>, objects: Vec<ModelObject>) -> Self {
        Self { id, objects }
    }

    pub fn of(objects: Vec<ModelObject>) -> Self {
        Self::new(None, objects)
    }

    pub fn id(&self) -> Option<&ModelObjectId> {
        self.id.as_ref()
    }

    pub fn objects(&self) -> &[ModelObject] {
        &self.objects
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_access() {
        let mut obj = ModelObject::new("net.Interfaces");
        obj.set_leaf("mtu", json!(1500));
        obj.push_leaf_list("search", json!("a"));
        obj.push_leaf_list("search", json!("b"));

        assert_eq!(obj.leaf("mtu"), Some(&json!(1500)));
        assert_eq!(obj.leaf("missing"), None);
        assert_eq!(obj.leaf_list("search").unwrap().len(), 2);
    }

    #[test]
    fn test_list_entries_keep_insertion_order() {
        let obj = ModelObject::new("net.Interfaces")
            .with_list_entry("interface", ModelObject::new("net.Interface").with_leaf("name", json!("eth0")))
            .with_list_entry("interface", ModelObject::new("net.Interface").with_leaf("name", json!("eth1")));

        let entries = obj.list("interface").unwrap();
        assert_eq!(entries[0].leaf("name"), Some(&json!("eth0")));
        assert_eq!(entries[1].leaf("name"), Some(&json!("eth1")));
    }

    #[test]
    fn test_absent_augmentation_is_none() {
        let obj = ModelObject::new("net.Device");
        assert!(obj.augmentation("ext.DeviceExt").is_none());
    }

    #[test]
    fn test_model_id_builder() {
        let id = ModelObjectId::new()
            .node("net.Interfaces")
            .list_node("net.Interface", vec!["eth0".into()])
            .leaf("net.Interface", "mtu");
        assert_eq!(id.steps().len(), 3);
    }
}
