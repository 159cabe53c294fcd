//! yang-bind - schema-directed conversion between YANG data trees and model objects
//!
//! This library converts bidirectionally between generic data-node trees
//! (schema-identified nodes carrying canonical string values) and typed
//! model objects, driven by compiled YANG schema modules held in a
//! registry. Choice/case and augmentation structure is translated between
//! the two representations on the way through.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use yang_bind::{
//!     DataType, ModelObject, ModelObjectData, ModuleBuilder, SchemaRegistry, object_to_data,
//! };
//!
//! // Compile a schema module and register it
//! let mut builder = ModuleBuilder::new("net", "urn:net");
//! let root = builder.root();
//! let device = builder.container(root, "device");
//! builder.leaf(device, "hostname", DataType::String);
//!
//! let registry = SchemaRegistry::new();
//! registry.register(builder.build());
//!
//! // Convert a model object into a data-node tree
//! let device = ModelObject::new("net.Device").with_leaf("hostname", json!("r1"));
//! let data = object_to_data(&registry, &ModelObjectData::of(vec![device])).unwrap();
//! assert_eq!(data.nodes()[0].schema_id().name, "device");
//! ```

pub mod data;
mod error;
mod ids;
pub mod model;
mod object_builder;
pub mod registry;
pub mod schema;
mod tree_builder;
pub mod types;

pub use data::{
    DataNode, DataNodeBuilder, DataNodeKind, KeyDetail, KeyLeaf, NodeKey, ResourceData, ResourceId,
};
pub use error::{BindError, Result};
pub use ids::{model_id_from_resource_id, resource_id_from_model_id};
pub use model::{AtomicPath, ModelObject, ModelObjectData, ModelObjectId};
pub use object_builder::data_to_object;
pub use registry::{ModelClass, SchemaRegistry};
pub use schema::{
    DataType, ModuleBuilder, SchemaId, SchemaKind, SchemaModule, SchemaNodeRef,
};
pub use tree_builder::object_to_data;
pub use types::{RawLeaf, leaf_to_raw, raw_to_leaf};
