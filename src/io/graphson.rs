//! GraphSON adjacency-list export
//!
//! Each `AdjList` becomes one JSON object per line: the vertex with its
//! vertex properties plus its incoming and outgoing edges grouped by label.
//! Scalars use the GraphSON 3 typed-value encoding.

use serde_json::{json, Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::element::{Edge, EdgeRef, Element, Slot, Vertex, VertexProperty, VertexPropertySlot, VertexRef};
use crate::error::OgmResult;
use crate::graph::PropertyValue;

/// First id handed out to exported vertex properties
const FIRST_VP_ID: i64 = 10;

/// A vertex with its incident edges
#[derive(Debug, Clone)]
pub struct AdjList {
    pub vertex: VertexRef,
    pub in_e: Vec<EdgeRef>,
    pub out_e: Vec<EdgeRef>,
}

impl AdjList {
    pub fn new(vertex: VertexRef) -> Self {
        Self {
            vertex,
            in_e: Vec::new(),
            out_e: Vec::new(),
        }
    }
}

/// GraphSON 3 typed value
pub fn to_graphson(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Null => Value::Null,
        PropertyValue::Boolean(b) => Value::Bool(*b),
        PropertyValue::String(s) => Value::String(s.clone()),
        PropertyValue::Integer(n) => typed("g:Int32", json!(n)),
        PropertyValue::Long(n) => typed("g:Int64", json!(n)),
        PropertyValue::Float(f) => typed("g:Double", json!(f)),
        PropertyValue::List(items) => {
            typed("g:List", Value::Array(items.iter().map(to_graphson).collect()))
        }
        PropertyValue::Map(entries) => {
            let flat = entries
                .iter()
                .flat_map(|(k, v)| [Value::String(k.clone()), to_graphson(v)])
                .collect();
            typed("g:Map", Value::Array(flat))
        }
    }
}

fn typed(kind: &str, value: Value) -> Value {
    json!({ "@type": kind, "@value": value })
}

fn element_id(id: Option<&PropertyValue>) -> Value {
    typed("g:Int32", id.map(PropertyValue::to_json).unwrap_or(Value::Null))
}

#[derive(Clone, Copy)]
enum Direction {
    In,
    Out,
}

/// Serializes adjacency lists, numbering vertex properties as it goes
#[derive(Debug)]
pub struct GraphsonWriter {
    next_vp_id: i64,
}

impl GraphsonWriter {
    pub fn new() -> Self {
        Self {
            next_vp_id: FIRST_VP_ID,
        }
    }

    /// One adjacency list as a single-line JSON document
    pub fn dumps(&mut self, adj_list: &AdjList) -> OgmResult<String> {
        let mut vertex = self.prep_vertex(&adj_list.vertex.read());
        for (edges, direction, key) in [
            (&adj_list.in_e, Direction::In, "inE"),
            (&adj_list.out_e, Direction::Out, "outE"),
        ] {
            for edge in edges {
                let edge = edge.read();
                let prepped = prep_edge(&edge, direction);
                if let Some(Value::Object(groups)) = vertex.get_mut(key) {
                    if let Value::Array(list) = groups
                        .entry(edge.label().to_string())
                        .or_insert_with(|| Value::Array(Vec::new()))
                    {
                        list.push(prepped);
                    }
                }
            }
        }
        Ok(serde_json::to_string(&vertex)?)
    }

    /// Write one line per adjacency list to `path`
    pub fn dump(&mut self, path: impl AsRef<Path>, adj_lists: &[AdjList]) -> OgmResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for adj_list in adj_lists {
            writeln!(out, "{}", self.dumps(adj_list)?)?;
        }
        out.flush()?;
        Ok(())
    }

    fn prep_vertex(&mut self, v: &Vertex) -> Value {
        let mut properties = Map::new();
        for (db_name, (ogm_name, _)) in v.mapping().db_properties() {
            let entries = match v.slot(ogm_name) {
                Some(Slot::VertexProperty(Some(VertexPropertySlot::Single(vp)))) => {
                    vec![self.prep_vp(Some(vp), vp.value())]
                }
                Some(Slot::VertexProperty(Some(slot))) => slot
                    .members()
                    .iter()
                    .map(|vp| self.prep_vp(Some(vp), vp.value()))
                    .collect(),
                Some(Slot::Scalar(value)) => vec![self.prep_vp(None, value)],
                _ => vec![self.prep_vp(None, &PropertyValue::Null)],
            };
            properties.insert(db_name.clone(), Value::Array(entries));
        }

        json!({
            "id": element_id(v.id()),
            "label": v.schema().label(),
            "properties": properties,
            "outE": {},
            "inE": {},
        })
    }

    fn prep_vp(&mut self, vp: Option<&VertexProperty>, value: &PropertyValue) -> Value {
        let mut meta = Map::new();
        if let Some(vp) = vp {
            for (db_name, (ogm_name, _)) in vp.mapping().db_properties() {
                let value = vp.get(ogm_name).map(to_graphson).unwrap_or(Value::Null);
                meta.insert(db_name.clone(), value);
            }
        }
        let id = self.next_vp_id;
        self.next_vp_id += 1;
        json!({
            "id": typed("g:Int64", json!(id)),
            "value": to_graphson(value),
            "properties": meta,
        })
    }
}

impl Default for GraphsonWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Incoming edges name their source as `outV`, outgoing edges their target
/// as `inV`
fn prep_edge(e: &Edge, direction: Direction) -> Value {
    let (other, endpoint) = match direction {
        Direction::In => ("outV", e.source()),
        Direction::Out => ("inV", e.target()),
    };
    let other_id = endpoint.and_then(|v| v.read().id().cloned());

    let mut properties = Map::new();
    for (db_name, (ogm_name, _)) in e.mapping().db_properties() {
        let value = e.get(ogm_name).map(to_graphson).unwrap_or(Value::Null);
        properties.insert(db_name.clone(), value);
    }

    let mut edge = Map::new();
    edge.insert("id".to_string(), element_id(e.id()));
    edge.insert(other.to_string(), element_id(other_id.as_ref()));
    edge.insert("properties".to_string(), Value::Object(properties));
    Value::Object(edge)
}
