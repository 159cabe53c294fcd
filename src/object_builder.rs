//! Data-node tree to model-object tree conversion
//!
//! Data trees nest choice cases and augmentation content directly under
//! the data parent, while model objects hold them in dedicated case and
//! augmentation slots. The assembler keeps one workbench per open data
//! node and a side bench per case/augmentation switch the leaves route
//! through; benches are flushed into their slots, deepest chain first,
//! when the workbench closes.

use std::collections::BTreeMap;

use crate::data::{DataNode, DataNodeKind, ResourceData};
use crate::error::{BindError, Result};
use crate::ids::{model_id_from_resource_id, schema_context_of};
use crate::model::{ModelObject, ModelObjectData};
use crate::registry::SchemaRegistry;
use crate::schema::{SchemaKind, SchemaNodeRef};
use crate::types::raw_to_leaf;

/// Convert generic data-node trees into typed model objects
pub fn data_to_object(registry: &SchemaRegistry, data: &ResourceData) -> Result<ModelObjectData> {
    let (id, anchor) = match data.id() {
        Some(rid) => (
            Some(model_id_from_resource_id(registry, rid)?),
            schema_context_of(registry, rid)?,
        ),
        None => (None, None),
    };

    let mut assembler = ObjectAssembler {
        registry,
        anchor,
        stack: Vec::new(),
        out: Vec::new(),
    };
    for node in data.nodes() {
        assembler.convert(node)?;
    }
    Ok(ModelObjectData::new(id, assembler.out))
}

/// Side object collecting content routed through one case/augment chain
struct Bench {
    chain: Vec<SchemaNodeRef>,
    obj: ModelObject,
}

/// Assembly state for one open data node
struct Workbench {
    schema: SchemaNodeRef,
    /// Chain of case/augment switches between this node and its holder
    chain: Vec<SchemaNodeRef>,
    obj: ModelObject,
    benches: BTreeMap<String, Bench>,
}

struct ObjectAssembler<'r> {
    registry: &'r SchemaRegistry,
    anchor: Option<SchemaNodeRef>,
    stack: Vec<Workbench>,
    out: Vec<ModelObject>,
}

impl ObjectAssembler<'_> {
    fn convert(&mut self, node: &DataNode) -> Result<()> {
        let parent_schema = match self.stack.last() {
            Some(wb) => Some(wb.schema.clone()),
            None => self.anchor.clone(),
        };
        let schema = self
            .registry
            .resolve_child(parent_schema.as_ref(), &node.key().id)?;

        if node.kind().is_leaf() {
            return self.place_leaf(node, &schema);
        }
        if !matches!(
            node.kind(),
            DataNodeKind::SingleInstance | DataNodeKind::MultiInstance
        ) {
            return Err(BindError::ShapeMismatch(format!(
                "inner node {} carries leaf kind {:?}",
                node.schema_id(),
                node.kind()
            )));
        }
        if schema.kind().is_leaf() {
            return Err(BindError::ShapeMismatch(format!(
                "data node {} is {:?} but its schema node is a leaf",
                node.schema_id(),
                node.kind()
            )));
        }

        let class = self.registry.class_for(&schema)?;
        self.stack.push(Workbench {
            chain: self.switch_chain(&schema)?,
            schema,
            obj: ModelObject::new(class.interface),
            benches: BTreeMap::new(),
        });
        for child in node.children() {
            self.convert(child)?;
        }
        self.close()
    }

    /// Coerce a leaf data node and set it on the object the chain routes to
    fn place_leaf(&mut self, node: &DataNode, schema: &SchemaNodeRef) -> Result<()> {
        let ty = schema.data_type().ok_or_else(|| {
            BindError::ShapeMismatch(format!("leaf {} carries no data type", schema.schema_id()))
        })?;
        let value = raw_to_leaf(node.value(), node.value_namespace(), ty)?;

        if self.stack.is_empty() {
            // leaf addressed directly by the resource identifier: wrap it
            // in its holder's object
            let holder = data_holder_of(self.registry, schema)?;
            let class = self.registry.class_for(&holder)?;
            let mut obj = ModelObject::new(class.interface);
            set_leaf_value(&mut obj, schema, node.kind(), value);
            self.out.push(obj);
            return Ok(());
        }

        let chain = self.switch_chain(schema)?;
        // stack is non-empty here
        let wb = self.stack.last_mut().unwrap();
        let target = ensure_bench(self.registry, wb, &chain)?;
        set_leaf_value(target, schema, node.kind(), value);
        Ok(())
    }

    /// Close the top workbench and attach its object to the enclosing one
    fn close(&mut self) -> Result<()> {
        // callers push before calling close
        let mut wb = self.stack.pop().unwrap();
        self.flush_benches(&mut wb)?;

        match self.stack.last_mut() {
            None => self.out.push(wb.obj),
            Some(parent) => {
                let target = ensure_bench(self.registry, parent, &wb.chain)?;
                match wb.schema.kind() {
                    SchemaKind::List => target.add_list_entry(wb.schema.name(), wb.obj),
                    _ => target.set_container(wb.schema.name(), wb.obj),
                }
            }
        }
        Ok(())
    }

    /// Move every bench into its case/augmentation slot, deepest first so
    /// nested switches land inside their enclosing bench.
    fn flush_benches(&self, wb: &mut Workbench) -> Result<()> {
        let chains: Vec<Vec<SchemaNodeRef>> =
            wb.benches.values().map(|b| b.chain.clone()).collect();
        for chain in &chains {
            for i in 1..chain.len() {
                ensure_bench(self.registry, wb, &chain[..i])?;
            }
        }

        while let Some(key) = wb
            .benches
            .iter()
            .max_by_key(|(_, b)| b.chain.len())
            .map(|(k, _)| k.clone())
        {
            // non-empty chains by construction
            let bench = wb.benches.remove(&key).unwrap();
            let (last, prefix) = bench.chain.split_last().unwrap();
            match last.kind() {
                SchemaKind::Case => {
                    let choice = choice_of_case(self.registry, last)?;
                    let target = ensure_bench(self.registry, wb, prefix)?;
                    target.set_case(choice.name(), bench.obj);
                }
                SchemaKind::Augment => {
                    let class = self.registry.class_for(last)?;
                    let target = ensure_bench(self.registry, wb, prefix)?;
                    target.set_augmentation(class.interface, bench.obj);
                }
                other => {
                    return Err(BindError::ShapeMismatch(format!(
                        "{other:?} node {} cannot route object content",
                        last.schema_id()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Case and augment switches between `schema` and its data holder,
    /// outermost first. Choices and augments that add cases to a choice
    /// are transparent in the object model.
    fn switch_chain(&self, schema: &SchemaNodeRef) -> Result<Vec<SchemaNodeRef>> {
        let mut chain = Vec::new();
        let mut cur = self.logical_parent(schema);
        while let Some(node) = cur {
            match node.kind() {
                SchemaKind::Case => chain.push(node.clone()),
                SchemaKind::Choice => {}
                SchemaKind::Augment => {
                    let target_kind = self.registry.augment_target(&node).map(|t| t.kind());
                    if target_kind != Some(SchemaKind::Choice) {
                        chain.push(node.clone());
                    }
                }
                _ => break,
            }
            cur = self.logical_parent(&node);
        }
        chain.reverse();
        Ok(chain)
    }

    fn logical_parent(&self, node: &SchemaNodeRef) -> Option<SchemaNodeRef> {
        if node.kind() == SchemaKind::Augment {
            self.registry.augment_target(node)
        } else {
            node.parent()
        }
    }
}

fn set_leaf_value(
    obj: &mut ModelObject,
    schema: &SchemaNodeRef,
    kind: DataNodeKind,
    value: serde_json::Value,
) {
    match kind {
        DataNodeKind::MultiInstanceLeaf => obj.push_leaf_list(schema.name(), value),
        _ => obj.set_leaf(schema.name(), value),
    }
}

/// Nearest ancestor that owns object fields (skips choice/case/augment)
fn data_holder_of(registry: &SchemaRegistry, leaf: &SchemaNodeRef) -> Result<SchemaNodeRef> {
    let mut cur = leaf.parent();
    while let Some(node) = cur {
        match node.kind() {
            SchemaKind::Choice | SchemaKind::Case => cur = node.parent(),
            SchemaKind::Augment => cur = registry.augment_target(&node),
            _ => return Ok(node),
        }
    }
    Err(BindError::SchemaResolution(format!(
        "leaf {} has no data holder",
        leaf.schema_id()
    )))
}

/// Choice a case belongs to, looking through case-adding augments
fn choice_of_case(registry: &SchemaRegistry, case: &SchemaNodeRef) -> Result<SchemaNodeRef> {
    let parent = match case.parent() {
        Some(p) if p.kind() == SchemaKind::Augment => registry.augment_target(&p),
        other => other,
    };
    match parent {
        Some(p) if p.kind() == SchemaKind::Choice => Ok(p),
        _ => Err(BindError::SchemaResolution(format!(
            "case {} has no enclosing choice",
            case.schema_id()
        ))),
    }
}

/// Bench object for `chain` (the workbench object itself when empty),
/// creating missing benches classed by the chain's last switch.
fn ensure_bench<'w>(
    registry: &SchemaRegistry,
    wb: &'w mut Workbench,
    chain: &[SchemaNodeRef],
) -> Result<&'w mut ModelObject> {
    let Some(last) = chain.last() else {
        return Ok(&mut wb.obj);
    };
    let key = chain_key(chain);
    if !wb.benches.contains_key(&key) {
        let class = registry.class_for(last)?;
        wb.benches.insert(
            key.clone(),
            Bench {
                chain: chain.to_vec(),
                obj: ModelObject::new(class.interface),
            },
        );
    }
    // just inserted if absent
    Ok(&mut wb.benches.get_mut(&key).unwrap().obj)
}

fn chain_key(chain: &[SchemaNodeRef]) -> String {
    let mut key = String::new();
    for node in chain {
        key.push_str(&node.schema_id().to_string());
        key.push('/');
    }
    key
}
