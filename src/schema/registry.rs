//! Element schemas registered with an application, keyed by label

use indexmap::IndexMap;
use std::sync::Arc;

use crate::graph::ElementRole;
use crate::schema::ElementSchema;

/// Registered vertex, edge and vertex property schemas.
///
/// Lookups of unregistered vertex and edge labels fall back to the generic
/// schemas so that any record the database returns can be materialized.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    vertices: IndexMap<String, Arc<ElementSchema>>,
    edges: IndexMap<String, Arc<ElementSchema>>,
    vertex_properties: IndexMap<String, Arc<ElementSchema>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, schema: Arc<ElementSchema>) {
        let label = schema.label().to_string();
        match schema.role() {
            ElementRole::Vertex => self.vertices.insert(label, schema),
            ElementRole::Edge => self.edges.insert(label, schema),
            ElementRole::VertexProperty => self.vertex_properties.insert(label, schema),
        };
    }

    /// Vertex schema for a label, generic when unregistered
    pub fn vertex(&self, label: &str) -> Arc<ElementSchema> {
        self.vertices
            .get(label)
            .cloned()
            .unwrap_or_else(ElementSchema::generic_vertex)
    }

    /// Edge schema for a label, generic when unregistered
    pub fn edge(&self, label: &str) -> Arc<ElementSchema> {
        self.edges
            .get(label)
            .cloned()
            .unwrap_or_else(ElementSchema::generic_edge)
    }

    pub fn vertex_property(&self, label: &str) -> Option<Arc<ElementSchema>> {
        self.vertex_properties.get(label).cloned()
    }

    pub fn vertices(&self) -> &IndexMap<String, Arc<ElementSchema>> {
        &self.vertices
    }

    pub fn edges(&self) -> &IndexMap<String, Arc<ElementSchema>> {
        &self.edges
    }

    pub fn vertex_properties(&self) -> &IndexMap<String, Arc<ElementSchema>> {
        &self.vertex_properties
    }
}
