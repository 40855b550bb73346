//! Property declarations
//!
//! A `Property` is created once when an element type is declared and is
//! shared read-only by every instance of that type. It carries the data
//! type, the wire-name policy and the default. Declarations made with
//! `Property::vertex_property` describe multi-valued slots whose members are
//! `VertexProperty` elements of their own schema.

use std::fmt;
use std::sync::Arc;

use crate::error::{OgmError, OgmResult};
use crate::graph::{Cardinality, PropertyValue};
use crate::schema::{DataType, ElementSchema};

/// Maps (declared name, owning label) to a wire name
pub type DbNameFactory = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Produces a default value for a slot
pub type DefaultFactory = Arc<dyn Fn() -> PropertyValue + Send + Sync>;

/// Transforms an id before it is validated
pub type IdSerializer = Arc<dyn Fn(PropertyValue) -> PropertyValue + Send + Sync>;

/// Wire name equals the declared name
pub fn default_db_name_factory(name: &str, _label: &str) -> String {
    name.to_string()
}

/// Widens 32-bit integer ids to 64-bit
pub fn default_id_serializer(val: PropertyValue) -> PropertyValue {
    match val {
        PropertyValue::Integer(i) => PropertyValue::Long(i64::from(i)),
        other => other,
    }
}

/// A declared property of an element type
#[derive(Clone)]
pub struct Property {
    data_type: DataType,
    db_name: Option<String>,
    db_name_factory: DbNameFactory,
    default: Option<PropertyValue>,
    default_factory: Option<DefaultFactory>,
    vertex_property: Option<Arc<ElementSchema>>,
    cardinality: Option<Cardinality>,
}

impl Property {
    /// Declare a scalar property
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            db_name: None,
            db_name_factory: Arc::new(default_db_name_factory),
            default: None,
            default_factory: None,
            vertex_property: None,
            cardinality: None,
        }
    }

    /// Declare a vertex property slot using the generic vertex property schema
    pub fn vertex_property(data_type: DataType) -> Self {
        let mut prop = Self::new(data_type);
        prop.vertex_property = Some(ElementSchema::generic_vertex_property());
        prop
    }

    /// Use a user-declared vertex property schema for the members of this slot
    pub fn with_schema(mut self, schema: Arc<ElementSchema>) -> Self {
        self.vertex_property = Some(schema);
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    /// Fixed wire name
    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = Some(name.into());
        self
    }

    pub fn db_name_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        self.db_name_factory = Arc::new(factory);
        self
    }

    pub fn default(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> PropertyValue + Send + Sync + 'static,
    {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// The wire name, once assigned
    pub fn wire_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }

    /// Whether this declaration describes a vertex property slot
    pub fn is_vertex_property(&self) -> bool {
        self.vertex_property.is_some()
    }

    /// Schema of the members of a vertex property slot
    pub fn vertex_property_schema(&self) -> Option<&Arc<ElementSchema>> {
        self.vertex_property.as_ref()
    }

    /// Declared cardinality, `Single` when none was given
    pub fn card(&self) -> Cardinality {
        self.cardinality.unwrap_or_default()
    }

    pub(crate) fn has_explicit_cardinality(&self) -> bool {
        self.cardinality.is_some()
    }

    /// Resolve the default for a fresh slot, calling the factory if there is one
    pub fn default_value(&self) -> PropertyValue {
        match (&self.default, &self.default_factory) {
            (Some(value), _) => value.clone(),
            (None, Some(factory)) => factory(),
            (None, None) => PropertyValue::Null,
        }
    }

    /// Assign the wire name from the factory unless one was declared
    pub(crate) fn resolve_db_name(&mut self, name: &str, label: &str) -> String {
        match &self.db_name {
            Some(db_name) => db_name.clone(),
            None => {
                let db_name = (self.db_name_factory)(name, label);
                self.db_name = Some(db_name.clone());
                db_name
            }
        }
    }

    pub(crate) fn check(&self, name: &str) -> OgmResult<()> {
        if self.default.is_some() && self.default_factory.is_some() {
            return Err(OgmError::mapping(format!(
                "property {} declares both a default and a default factory",
                name
            )));
        }
        if self.vertex_property.is_none() && self.cardinality.is_some() {
            return Err(OgmError::mapping(format!(
                "scalar property {} cannot declare a cardinality",
                name
            )));
        }
        if let (Some(value), None) = (&self.default, &self.vertex_property) {
            self.data_type.validate(value.clone())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("data_type", &self.data_type)
            .field("db_name", &self.db_name)
            .field("default", &self.default)
            .field("has_default_factory", &self.default_factory.is_some())
            .field(
                "vertex_property",
                &self.vertex_property.as_ref().map(|s| s.name().to_string()),
            )
            .field("cardinality", &self.cardinality)
            .finish()
    }
}

/// The identity property
///
/// Ids are assigned by the database. The serializer runs before the data
/// type validates the value.
#[derive(Clone)]
pub struct IdProperty {
    data_type: DataType,
    serializer: IdSerializer,
}

impl IdProperty {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            serializer: Arc::new(default_id_serializer),
        }
    }

    pub fn with_serializer<F>(mut self, serializer: F) -> Self
    where
        F: Fn(PropertyValue) -> PropertyValue + Send + Sync + 'static,
    {
        self.serializer = Arc::new(serializer);
        self
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Serialize then validate an incoming id
    pub fn prepare(&self, val: PropertyValue) -> OgmResult<PropertyValue> {
        self.data_type.validate((self.serializer)(val))
    }
}

impl Default for IdProperty {
    fn default() -> Self {
        Self::new(DataType::Generic)
    }
}

impl fmt::Debug for IdProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdProperty")
            .field("data_type", &self.data_type)
            .finish()
    }
}
