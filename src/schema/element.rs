//! Element type declarations
//!
//! An `ElementSchema` is the registered description of one vertex, edge or
//! vertex property type: its declared properties, its id policy, its
//! immutable/locking modes and the `Mapping` derived from them. Schemas are
//! built once through `ElementSchemaBuilder` and shared behind `Arc`.
//!
//! ```rust
//! use samyama_ogm::schema::{DataType, ElementSchema, Property};
//!
//! let person = ElementSchema::vertex("Person")
//!     .property("name", Property::new(DataType::String))
//!     .build()
//!     .unwrap();
//! assert_eq!(person.label(), "person");
//! assert_eq!(person.attribute("name").unwrap(), "name");
//! ```

use indexmap::IndexMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::error::{OgmError, OgmResult};
use crate::graph::{underscore, ElementRole, ImmutableMode, LockingMode};
use crate::schema::{DataType, IdProperty, Mapping, Property};

/// Name of the implicit transaction-tag property
pub const DIRTY: &str = "dirty";

static GENERIC_VERTEX: OnceLock<Arc<ElementSchema>> = OnceLock::new();
static GENERIC_EDGE: OnceLock<Arc<ElementSchema>> = OnceLock::new();
static GENERIC_VERTEX_PROPERTY: OnceLock<Arc<ElementSchema>> = OnceLock::new();

/// Registered description of an element type
#[derive(Debug)]
pub struct ElementSchema {
    name: String,
    role: ElementRole,
    properties: IndexMap<String, Property>,
    id: IdProperty,
    mapping: Mapping,
    immutable: ImmutableMode,
    locking: LockingMode,
}

impl ElementSchema {
    pub fn vertex(name: impl Into<String>) -> ElementSchemaBuilder {
        ElementSchemaBuilder::new(name, ElementRole::Vertex)
    }

    pub fn edge(name: impl Into<String>) -> ElementSchemaBuilder {
        ElementSchemaBuilder::new(name, ElementRole::Edge)
    }

    pub fn vertex_property(name: impl Into<String>) -> ElementSchemaBuilder {
        ElementSchemaBuilder::new(name, ElementRole::VertexProperty)
    }

    /// Schema used for vertices whose label is not registered
    pub fn generic_vertex() -> Arc<ElementSchema> {
        GENERIC_VERTEX
            .get_or_init(|| Arc::new(Self::bare("GenericVertex", ElementRole::Vertex)))
            .clone()
    }

    /// Schema used for edges whose label is not registered
    pub fn generic_edge() -> Arc<ElementSchema> {
        GENERIC_EDGE
            .get_or_init(|| Arc::new(Self::bare("GenericEdge", ElementRole::Edge)))
            .clone()
    }

    /// Schema of vertex properties declared without metaproperties
    pub fn generic_vertex_property() -> Arc<ElementSchema> {
        GENERIC_VERTEX_PROPERTY
            .get_or_init(|| {
                Arc::new(Self::bare("VertexProperty", ElementRole::VertexProperty))
            })
            .clone()
    }

    fn bare(name: &str, role: ElementRole) -> Self {
        let label = underscore(name);
        let mut properties = IndexMap::new();
        let mut mapping = Mapping::new(label, role);
        if role != ElementRole::VertexProperty {
            properties.insert(DIRTY.to_string(), Property::new(DataType::String).db_name(DIRTY));
            mapping.insert_unchecked(DIRTY, DIRTY, DataType::String);
        }
        Self {
            name: name.to_string(),
            role,
            properties,
            id: IdProperty::default(),
            mapping,
            immutable: ImmutableMode::Off,
            locking: LockingMode::Off,
        }
    }

    /// Declared type name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> ElementRole {
        self.role
    }

    pub fn label(&self) -> &str {
        self.mapping.label()
    }

    pub fn properties(&self) -> &IndexMap<String, Property> {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn id_property(&self) -> &IdProperty {
        &self.id
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn immutable(&self) -> ImmutableMode {
        self.immutable
    }

    pub fn locking(&self) -> LockingMode {
        self.locking
    }

    pub fn is_vertex(&self) -> bool {
        self.role == ElementRole::Vertex
    }

    pub fn is_edge(&self) -> bool {
        self.role == ElementRole::Edge
    }

    pub fn is_vertex_property(&self) -> bool {
        self.role == ElementRole::VertexProperty
    }

    /// Type-level property access: the wire name of a declared property.
    ///
    /// Only element instances carry an id, so asking for `id` here is an
    /// element error.
    pub fn attribute(&self, name: &str) -> OgmResult<&str> {
        if name == "id" {
            return Err(OgmError::element("Only instantiated elements have ID property"));
        }
        self.mapping.db_name(name)
    }
}

/// Builder for `ElementSchema`
pub struct ElementSchemaBuilder {
    name: String,
    role: ElementRole,
    label: Option<String>,
    bases: Vec<Arc<ElementSchema>>,
    properties: Vec<(String, Property)>,
    id: Option<IdProperty>,
    immutable: ImmutableMode,
    locking: LockingMode,
}

impl ElementSchemaBuilder {
    fn new(name: impl Into<String>, role: ElementRole) -> Self {
        Self {
            name: name.into(),
            role,
            label: None,
            bases: Vec::new(),
            properties: Vec::new(),
            id: None,
            immutable: ImmutableMode::Off,
            locking: LockingMode::Off,
        }
    }

    /// Explicit label; derived from the type name otherwise
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Inherit the declarations of a base type. Later bases override earlier ones.
    pub fn extends(mut self, base: &Arc<ElementSchema>) -> Self {
        self.bases.push(base.clone());
        self
    }

    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.push((name.into(), property));
        self
    }

    pub fn id_property(mut self, id: IdProperty) -> Self {
        self.id = Some(id);
        self
    }

    pub fn immutable(mut self, mode: ImmutableMode) -> Self {
        self.immutable = mode;
        self
    }

    pub fn locking(mut self, mode: LockingMode) -> Self {
        self.locking = mode;
        self
    }

    pub fn build(self) -> OgmResult<Arc<ElementSchema>> {
        let label = self.label.unwrap_or_else(|| underscore(&self.name));
        let mut properties: IndexMap<String, Property> = IndexMap::new();

        if self.role != ElementRole::VertexProperty {
            properties.insert(DIRTY.to_string(), Property::new(DataType::String));
        }

        for base in &self.bases {
            if base.role() != self.role {
                return Err(OgmError::mapping(format!(
                    "{} ({}) cannot extend {} ({})",
                    self.name,
                    self.role,
                    base.name(),
                    base.role()
                )));
            }
            for (name, prop) in base.properties() {
                properties.insert(name.clone(), prop.clone());
            }
        }
        properties.shift_remove("id");

        for (name, prop) in self.properties {
            if name == "id" {
                return Err(OgmError::mapping(
                    "the id property is declared with id_property",
                ));
            }
            prop.check(&name)?;
            if let Some(vp_schema) = prop.vertex_property_schema() {
                match self.role {
                    ElementRole::Edge => {
                        return Err(OgmError::mapping(
                            "Edge property cannot have set/list cardinality",
                        ))
                    }
                    ElementRole::VertexProperty => {
                        return Err(OgmError::mapping(format!(
                            "vertex property {} cannot nest vertex property {}",
                            self.name, name
                        )))
                    }
                    ElementRole::Vertex => {}
                }
                if !vp_schema.is_vertex_property() {
                    return Err(OgmError::mapping(format!(
                        "{} is not a vertex property schema",
                        vp_schema.name()
                    )));
                }
            }
            properties.insert(name, prop);
        }

        let mut mapping = Mapping::new(label.clone(), self.role);
        for (name, prop) in properties.iter_mut() {
            let db_name = prop.resolve_db_name(name, &label);
            debug!("Processing {} -> {} ({})", name, db_name, prop.data_type().type_name());
            mapping.insert(name, &db_name, prop.data_type())?;
        }
        debug!("Built mapping for {}: {}", self.name, mapping);

        Ok(Arc::new(ElementSchema {
            name: self.name,
            role: self.role,
            properties,
            id: self.id.unwrap_or_default(),
            mapping,
            immutable: self.immutable,
            locking: self.locking,
        }))
    }
}
