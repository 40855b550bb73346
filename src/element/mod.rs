//! In-memory graph elements
//!
//! - `Vertex`: node with declared scalar and vertex property slots
//! - `Edge`: directed relation between a source and target vertex
//! - `VertexProperty`: value holder attached to a vertex slot, itself an
//!   element whose slots are its metaproperties
//!
//! All three share `ElementState` (schema, id, label, slots) and the
//! `Element` trait, which validates every assignment against the declared
//! data type before the slot is replaced.

pub mod edge;
pub mod manager;
pub mod vertex;
pub mod vertex_property;

pub use edge::{Edge, EdgeRef};
pub use manager::{
    ListVertexPropertyManager, MemberMut, SetVertexPropertyManager, VertexPropertyManager,
    VertexPropertySlot,
};
pub use vertex::{Vertex, VertexRef};
pub use vertex_property::VertexProperty;

use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{OgmError, OgmResult};
use crate::graph::{ElementRole, PropertyValue};
use crate::schema::{ElementSchema, Mapping, DIRTY};

/// Contents of one declared slot
#[derive(Debug, Clone)]
pub enum Slot {
    Scalar(PropertyValue),
    VertexProperty(Option<VertexPropertySlot>),
}

/// A value being assigned to a slot
#[derive(Debug, Clone)]
pub enum SlotValue {
    Scalar(PropertyValue),
    /// Ordered collection
    List(Vec<SlotItem>),
    /// Unordered collection; duplicates collapse in set slots
    Set(Vec<SlotItem>),
}

/// One element of a collection assignment
#[derive(Debug, Clone)]
pub enum SlotItem {
    Value(PropertyValue),
    /// An existing vertex property, reused as-is by set slots
    Member(VertexProperty),
}

impl SlotItem {
    pub fn value(&self) -> &PropertyValue {
        match self {
            SlotItem::Value(v) => v,
            SlotItem::Member(vp) => vp.value(),
        }
    }
}

impl SlotValue {
    pub fn list<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PropertyValue>,
    {
        SlotValue::List(values.into_iter().map(|v| SlotItem::Value(v.into())).collect())
    }

    pub fn set<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PropertyValue>,
    {
        SlotValue::Set(values.into_iter().map(|v| SlotItem::Value(v.into())).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SlotValue::Scalar(PropertyValue::Null))
    }

    /// Collapse into a single scalar; collections become lists
    pub fn into_scalar(self) -> PropertyValue {
        match self {
            SlotValue::Scalar(v) => v,
            SlotValue::List(items) | SlotValue::Set(items) => PropertyValue::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        SlotItem::Value(v) => v,
                        SlotItem::Member(vp) => vp.value().clone(),
                    })
                    .collect(),
            ),
        }
    }
}

macro_rules! slot_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for SlotValue {
                fn from(value: $t) -> Self {
                    SlotValue::Scalar(value.into())
                }
            }
        )*
    };
}

slot_value_from!(PropertyValue, String, &str, i32, i64, f64, bool);

impl From<Vec<PropertyValue>> for SlotValue {
    fn from(values: Vec<PropertyValue>) -> Self {
        SlotValue::List(values.into_iter().map(SlotItem::Value).collect())
    }
}

impl From<BTreeMap<String, PropertyValue>> for SlotValue {
    fn from(map: BTreeMap<String, PropertyValue>) -> Self {
        SlotValue::Scalar(PropertyValue::Map(map))
    }
}

/// State shared by every element kind
#[derive(Debug, Clone)]
pub struct ElementState {
    pub(crate) schema: Arc<ElementSchema>,
    pub(crate) id: Option<PropertyValue>,
    pub(crate) label: Option<String>,
    pub(crate) slots: IndexMap<String, Slot>,
    pub(crate) undeclared: IndexMap<String, PropertyValue>,
}

impl ElementState {
    /// Fresh state with every declared default applied
    pub(crate) fn new(schema: &Arc<ElementSchema>) -> OgmResult<Self> {
        let mut state = Self::bare(schema);
        for (name, prop) in schema.properties() {
            let default = prop.default_value();
            if !default.is_null() {
                state.assign(name, SlotValue::Scalar(default))?;
            }
        }
        Ok(state)
    }

    /// Fresh state with every slot unset
    pub(crate) fn bare(schema: &Arc<ElementSchema>) -> Self {
        let slots = schema
            .properties()
            .iter()
            .map(|(name, prop)| {
                let slot = if prop.is_vertex_property() {
                    Slot::VertexProperty(None)
                } else {
                    Slot::Scalar(PropertyValue::Null)
                };
                (name.clone(), slot)
            })
            .collect();
        Self {
            schema: schema.clone(),
            id: None,
            label: None,
            slots,
            undeclared: IndexMap::new(),
        }
    }

    /// Validate and store a value in a declared slot
    pub(crate) fn assign(&mut self, name: &str, value: SlotValue) -> OgmResult<()> {
        let schema = self.schema.clone();
        let prop = schema.property(name).ok_or_else(|| {
            OgmError::mapping(format!(
                "No such property: {} for element {}",
                name,
                schema.name()
            ))
        })?;

        let slot = match prop.vertex_property_schema() {
            Some(_) if value.is_null() => Slot::VertexProperty(None),
            Some(vp_schema) => Slot::VertexProperty(Some(prop.data_type().validate_vertex_prop(
                value,
                prop.card(),
                vp_schema,
            )?)),
            None => Slot::Scalar(prop.data_type().validate(value.into_scalar())?),
        };
        self.slots.insert(name.to_string(), slot);
        Ok(())
    }

    pub(crate) fn set_undeclared(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.undeclared.insert(name.into(), value);
    }
}

/// Common interface of vertices, edges and vertex properties
pub trait Element {
    fn state(&self) -> &ElementState;
    fn state_mut(&mut self) -> &mut ElementState;

    fn schema(&self) -> &Arc<ElementSchema> {
        &self.state().schema
    }

    fn mapping(&self) -> &Mapping {
        self.state().schema.mapping()
    }

    fn role(&self) -> ElementRole {
        self.state().schema.role()
    }

    /// Database id, absent until the element has been saved
    fn id(&self) -> Option<&PropertyValue> {
        self.state().id.as_ref()
    }

    /// Assign the id through the schema's id serializer and data type.
    ///
    /// A saved vertex or edge keeps its id: assigning a different one fails.
    /// Vertex property ids are reassigned whenever their owner is rewritten.
    fn set_id(&mut self, id: PropertyValue) -> OgmResult<()> {
        let id = self.schema().id_property().prepare(id)?;
        if self.role() != ElementRole::VertexProperty {
            if let Some(current) = self.id() {
                if !id.is_null() && current != &id {
                    return Err(OgmError::element(format!(
                        "Element id cannot change from {} to {}",
                        current, id
                    )));
                }
            }
        }
        self.state_mut().id = if id.is_null() { None } else { Some(id) };
        Ok(())
    }

    /// Label read from the database, or the schema label
    fn label(&self) -> &str {
        let state = self.state();
        state
            .label
            .as_deref()
            .unwrap_or_else(|| state.schema.label())
    }

    fn set_label(&mut self, label: impl Into<String>)
    where
        Self: Sized,
    {
        self.state_mut().label = Some(label.into());
    }

    /// Scalar value of a slot. Single vertex properties yield their value;
    /// list and set slots yield nothing (see `vertex_property`).
    fn get(&self, name: &str) -> Option<&PropertyValue> {
        let state = self.state();
        let value = match state.slots.get(name) {
            Some(Slot::Scalar(v)) => Some(v),
            Some(Slot::VertexProperty(Some(VertexPropertySlot::Single(vp)))) => Some(vp.value()),
            Some(Slot::VertexProperty(_)) => None,
            None => state.undeclared.get(name),
        };
        value.filter(|v| !v.is_null())
    }

    /// Assign a declared slot, validating before anything is replaced
    fn set(&mut self, name: &str, value: impl Into<SlotValue>) -> OgmResult<()>
    where
        Self: Sized,
    {
        self.state_mut().assign(name, value.into())
    }

    fn slot(&self, name: &str) -> Option<&Slot> {
        self.state().slots.get(name)
    }

    fn vertex_property(&self, name: &str) -> Option<&VertexPropertySlot> {
        match self.state().slots.get(name) {
            Some(Slot::VertexProperty(Some(slot))) => Some(slot),
            _ => None,
        }
    }

    fn vertex_property_mut(&mut self, name: &str) -> Option<&mut VertexPropertySlot> {
        match self.state_mut().slots.get_mut(name) {
            Some(Slot::VertexProperty(Some(slot))) => Some(slot),
            _ => None,
        }
    }

    /// Values read from the database under wire names the schema does not map
    fn undeclared(&self) -> &IndexMap<String, PropertyValue> {
        &self.state().undeclared
    }

    /// Current transaction tag
    fn dirty(&self) -> Option<&str> {
        match self.state().slots.get(DIRTY) {
            Some(Slot::Scalar(PropertyValue::String(tag))) => Some(tag.as_str()),
            _ => None,
        }
    }

    fn set_dirty(&mut self, tag: Option<String>) {
        if let Some(slot) = self.state_mut().slots.get_mut(DIRTY) {
            *slot = Slot::Scalar(PropertyValue::from(tag));
        }
    }
}

/// Shared handle to a live element
#[derive(Debug, Clone)]
pub enum ElementRef {
    Vertex(VertexRef),
    Edge(EdgeRef),
    VertexProperty(Arc<RwLock<VertexProperty>>),
}

impl ElementRef {
    pub fn role(&self) -> ElementRole {
        match self {
            ElementRef::Vertex(_) => ElementRole::Vertex,
            ElementRef::Edge(_) => ElementRole::Edge,
            ElementRef::VertexProperty(_) => ElementRole::VertexProperty,
        }
    }

    pub fn id(&self) -> Option<PropertyValue> {
        match self {
            ElementRef::Vertex(v) => v.read().id().cloned(),
            ElementRef::Edge(e) => e.read().id().cloned(),
            ElementRef::VertexProperty(vp) => vp.read().id().cloned(),
        }
    }

    pub fn schema(&self) -> Arc<ElementSchema> {
        match self {
            ElementRef::Vertex(v) => v.read().schema().clone(),
            ElementRef::Edge(e) => e.read().schema().clone(),
            ElementRef::VertexProperty(vp) => vp.read().schema().clone(),
        }
    }

    pub fn dirty(&self) -> Option<String> {
        match self {
            ElementRef::Vertex(v) => v.read().dirty().map(str::to_string),
            ElementRef::Edge(e) => e.read().dirty().map(str::to_string),
            ElementRef::VertexProperty(_) => None,
        }
    }

    pub(crate) fn set_dirty(&self, tag: Option<String>) {
        match self {
            ElementRef::Vertex(v) => v.write().set_dirty(tag),
            ElementRef::Edge(e) => e.write().set_dirty(tag),
            ElementRef::VertexProperty(_) => {}
        }
    }

    /// Forget the database id, used when a create is rolled back
    pub(crate) fn clear_id(&self) {
        match self {
            ElementRef::Vertex(v) => v.write().state_mut().id = None,
            ElementRef::Edge(e) => e.write().state_mut().id = None,
            ElementRef::VertexProperty(vp) => vp.write().state_mut().id = None,
        }
    }

    pub fn as_vertex(&self) -> Option<&VertexRef> {
        match self {
            ElementRef::Vertex(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeRef> {
        match self {
            ElementRef::Edge(e) => Some(e),
            _ => None,
        }
    }

    /// Whether both handles point at the same live object
    pub fn ptr_eq(&self, other: &ElementRef) -> bool {
        match (self, other) {
            (ElementRef::Vertex(a), ElementRef::Vertex(b)) => Arc::ptr_eq(a, b),
            (ElementRef::Edge(a), ElementRef::Edge(b)) => Arc::ptr_eq(a, b),
            (ElementRef::VertexProperty(a), ElementRef::VertexProperty(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<VertexRef> for ElementRef {
    fn from(vertex: VertexRef) -> Self {
        ElementRef::Vertex(vertex)
    }
}

impl From<EdgeRef> for ElementRef {
    fn from(edge: EdgeRef) -> Self {
        ElementRef::Edge(edge)
    }
}

impl From<&VertexRef> for ElementRef {
    fn from(vertex: &VertexRef) -> Self {
        ElementRef::Vertex(vertex.clone())
    }
}

impl From<&EdgeRef> for ElementRef {
    fn from(edge: &EdgeRef) -> Self {
        ElementRef::Edge(edge.clone())
    }
}
