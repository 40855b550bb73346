//! Edges

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::element::{Element, ElementState, Slot, Vertex, VertexRef};
use crate::error::{OgmError, OgmResult};
use crate::graph::PropertyValue;
use crate::schema::ElementSchema;

/// Shared handle to a live edge
pub type EdgeRef = Arc<RwLock<Edge>>;

/// An edge instance. Source and target are shared handles to vertices the
/// edge does not own.
#[derive(Debug, Clone)]
pub struct Edge {
    state: ElementState,
    source: Option<VertexRef>,
    target: Option<VertexRef>,
}

impl Edge {
    pub fn new(schema: &Arc<ElementSchema>) -> OgmResult<Self> {
        if !schema.is_edge() {
            return Err(OgmError::element(format!(
                "{} is not an edge schema",
                schema.name()
            )));
        }
        Ok(Self {
            state: ElementState::new(schema)?,
            source: None,
            target: None,
        })
    }

    /// New edge from `source` to `target`
    pub fn between(
        schema: &Arc<ElementSchema>,
        source: &VertexRef,
        target: &VertexRef,
    ) -> OgmResult<Self> {
        let mut edge = Self::new(schema)?;
        edge.source = Some(source.clone());
        edge.target = Some(target.clone());
        Ok(edge)
    }

    pub fn generic() -> Self {
        Self {
            state: ElementState::bare(&ElementSchema::generic_edge()),
            source: None,
            target: None,
        }
    }

    pub fn into_ref(self) -> EdgeRef {
        Arc::new(RwLock::new(self))
    }

    pub fn source(&self) -> Option<&VertexRef> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, vertex: Option<VertexRef>) {
        self.source = vertex;
    }

    pub fn target(&self) -> Option<&VertexRef> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, vertex: Option<VertexRef>) {
        self.target = vertex;
    }

    /// Render as `{label, source, target, <property>...}`. Missing endpoints
    /// render as generic vertices.
    pub fn to_dict(&self) -> Value {
        let endpoint = |v: Option<&VertexRef>| match v {
            Some(v) => v.read().to_dict(),
            None => Vertex::generic().to_dict(),
        };
        let mut out = Map::new();
        out.insert("label".to_string(), Value::String(self.label().to_string()));
        out.insert("source".to_string(), endpoint(self.source.as_ref()));
        out.insert("target".to_string(), endpoint(self.target.as_ref()));
        for (name, slot) in &self.state.slots {
            if let Slot::Scalar(v) = slot {
                out.insert(name.clone(), v.to_json());
            }
        }
        Value::Object(out)
    }

    /// Rebuild an edge's properties from a `to_dict` rendering. Endpoints are
    /// left unset; callers attach the live vertices.
    pub fn from_dict(schema: &Arc<ElementSchema>, dict: &Value) -> OgmResult<Self> {
        let mut edge = Self::new(schema)?;
        let map = dict
            .as_object()
            .ok_or_else(|| OgmError::element("edge dict must be an object"))?;
        for (key, value) in map {
            if matches!(key.as_str(), "label" | "source" | "target") {
                continue;
            }
            edge.set(key, PropertyValue::from_json(value))?;
        }
        Ok(edge)
    }
}

impl Element for Edge {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DataType, Property};

    fn knows() -> Arc<ElementSchema> {
        ElementSchema::edge("Knows")
            .label("knows")
            .property("notes", Property::new(DataType::String).default("N/A"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_applied() {
        let edge = Edge::new(&knows()).unwrap();
        assert_eq!(edge.get("notes"), Some(&"N/A".into()));
        assert!(edge.source().is_none());
    }

    #[test]
    fn test_between() {
        let a = Vertex::generic().into_ref();
        let b = Vertex::generic().into_ref();
        let edge = Edge::between(&knows(), &a, &b).unwrap();
        assert!(Arc::ptr_eq(edge.source().unwrap(), &a));
        assert!(Arc::ptr_eq(edge.target().unwrap(), &b));
    }

    #[test]
    fn test_dict_round_trip() {
        let mut edge = Edge::new(&knows()).unwrap();
        edge.set("notes", "married").unwrap();
        let dict = edge.to_dict();
        assert_eq!(dict["label"], "knows");
        assert_eq!(dict["source"]["label"], "generic_vertex");

        let restored = Edge::from_dict(&knows(), &dict).unwrap();
        assert_eq!(restored.get("notes"), Some(&"married".into()));
    }

    #[test]
    fn test_rejects_vertex_schema() {
        let schema = ElementSchema::vertex("Person").build().unwrap();
        assert!(Edge::new(&schema).is_err());
    }
}
