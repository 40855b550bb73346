//! Raw records exchanged with the submission interface

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::PropertyValue;

/// A vertex reference as returned by a traversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVertex {
    pub id: PropertyValue,
    pub label: String,
}

/// An edge reference with its endpoint references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    pub id: PropertyValue,
    pub label: String,
    pub out_v: RawVertex,
    pub in_v: RawVertex,
}

/// A single property as returned by `properties()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProperty {
    pub id: PropertyValue,
    pub key: String,
    pub value: PropertyValue,
}

/// One traversal result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RawResult {
    Value(PropertyValue),
    Vertex(RawVertex),
    Edge(RawEdge),
    Property(RawProperty),
    List(Vec<RawResult>),
    Map(IndexMap<String, RawResult>),
}

/// A vertex property carrying its id and metaproperties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaPropertyRecord {
    pub id: PropertyValue,
    pub key: String,
    pub value: PropertyValue,
    pub properties: IndexMap<String, PropertyValue>,
}

/// An entry of a vertex property group: bare value, or a record when the
/// vertex property has metaproperties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPropertyValue {
    Meta(MetaPropertyRecord),
    Bare(PropertyValue),
}

/// Full property set of a vertex, grouped by wire name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VertexPropertyMap {
    pub id: PropertyValue,
    pub label: String,
    pub properties: IndexMap<String, Vec<RawPropertyValue>>,
}

/// Full property set of an edge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeValueMap {
    pub id: PropertyValue,
    pub label: String,
    pub properties: IndexMap<String, PropertyValue>,
}
