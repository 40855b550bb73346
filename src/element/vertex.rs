//! Vertices

use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::element::{
    Element, ElementState, Slot, SlotValue, VertexPropertyManager, VertexPropertySlot,
};
use crate::error::{OgmError, OgmResult};
use crate::graph::PropertyValue;
use crate::schema::ElementSchema;

/// Shared handle to a live vertex
pub type VertexRef = Arc<RwLock<Vertex>>;

/// A vertex instance of a registered (or generic) vertex schema
#[derive(Debug, Clone)]
pub struct Vertex {
    state: ElementState,
}

impl Vertex {
    pub fn new(schema: &Arc<ElementSchema>) -> OgmResult<Self> {
        if !schema.is_vertex() {
            return Err(OgmError::element(format!(
                "{} is not a vertex schema",
                schema.name()
            )));
        }
        Ok(Self {
            state: ElementState::new(schema)?,
        })
    }

    /// Placeholder vertex of the generic schema, used for edge endpoints
    pub fn generic() -> Self {
        Self {
            state: ElementState::bare(&ElementSchema::generic_vertex()),
        }
    }

    pub fn into_ref(self) -> VertexRef {
        Arc::new(RwLock::new(self))
    }

    /// Render as `{label, type, <property>...}`; vertex property slots become
    /// their member dicts
    pub fn to_dict(&self) -> Value {
        let mut out = Map::new();
        out.insert("label".to_string(), Value::String(self.label().to_string()));
        out.insert("type".to_string(), Value::String("vertex".to_string()));
        for (name, slot) in &self.state.slots {
            let value = match slot {
                Slot::Scalar(v) => v.to_json(),
                Slot::VertexProperty(None) => Value::Null,
                Slot::VertexProperty(Some(VertexPropertySlot::Single(vp))) => vp.to_dict(),
                Slot::VertexProperty(Some(slot)) => {
                    Value::Array(slot.members().iter().map(|vp| vp.to_dict()).collect())
                }
            };
            out.insert(name.clone(), value);
        }
        Value::Object(out)
    }

    /// Rebuild a vertex from a `to_dict` rendering
    pub fn from_dict(schema: &Arc<ElementSchema>, dict: &Value) -> OgmResult<Self> {
        let mut vertex = Self::new(schema)?;
        let map = dict
            .as_object()
            .ok_or_else(|| OgmError::element("vertex dict must be an object"))?;

        for (key, value) in map {
            if matches!(key.as_str(), "label" | "type") {
                continue;
            }
            let is_vertex_property = schema
                .property(key)
                .map(|p| p.is_vertex_property())
                .unwrap_or(false);

            match value {
                Value::Array(entries) if is_vertex_property => {
                    let values: Vec<PropertyValue> = entries
                        .iter()
                        .map(|entry| PropertyValue::from_json(&entry["value"]))
                        .collect();
                    vertex.set(key, SlotValue::from(values))?;
                    let slot = vertex.vertex_property_mut(key).ok_or_else(|| {
                        OgmError::element(format!("{} is not a list or set property", key))
                    })?;
                    match slot {
                        VertexPropertySlot::List(list) => {
                            for (member, entry) in list.members_mut().iter_mut().zip(entries) {
                                member.from_dict(entry)?;
                            }
                        }
                        VertexPropertySlot::Set(set) => {
                            for entry in entries {
                                let value = PropertyValue::from_json(&entry["value"]);
                                let value = set.data_type().validate(value)?;
                                if let Some(member) = set.member_mut(&value) {
                                    member.from_dict(entry)?;
                                }
                            }
                        }
                        VertexPropertySlot::Single(_) => {
                            return Err(OgmError::element(format!(
                                "{} is not a list or set property",
                                key
                            )))
                        }
                    }
                }
                Value::Object(entry) if is_vertex_property => {
                    let inner = entry.get("value").cloned().unwrap_or(Value::Null);
                    vertex.set(key, PropertyValue::from_json(&inner))?;
                    if let Some(VertexPropertySlot::Single(vp)) = vertex.vertex_property_mut(key) {
                        vp.from_dict(value)?;
                    }
                }
                other => vertex.set(key, PropertyValue::from_json(other))?,
            }
        }
        Ok(vertex)
    }
}

impl Element for Vertex {
    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }
}
