//! Managers for multi cardinality vertex properties
//!
//! A list slot keeps its members in insertion order and may hold the same
//! value more than once. A set slot holds each value once. Both validate
//! every value they accept through the slot's data type.
//!
//! The list manager also keeps `vp_map`, an index from the database id of a
//! vertex property to its position in the list. Re-reading the same vertex
//! from the database resolves each upstream vertex property through this
//! index instead of allocating a second member. The list itself remains the
//! source of truth; the index is rebuilt whenever positions shift.
//!
//! Set members are only reachable mutably through [`MemberMut`], which edits
//! metaproperties but never the value a member is keyed by.

use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::{Deref, Index, IndexMut};
use std::sync::Arc;

use crate::element::{Element, SlotItem, SlotValue, VertexProperty};
use crate::error::{OgmError, OgmResult};
use crate::graph::{Cardinality, PropertyValue};
use crate::schema::{DataType, ElementSchema};

/// Lookup and inspection shared by list and set slots
pub trait VertexPropertyManager {
    fn members(&self) -> &[VertexProperty];
    fn data_type(&self) -> DataType;
    fn cardinality(&self) -> Cardinality;
    fn vertex_property_schema(&self) -> &Arc<ElementSchema>;

    fn len(&self) -> usize {
        self.members().len()
    }

    fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    fn iter(&self) -> std::slice::Iter<'_, VertexProperty> {
        self.members().iter()
    }

    /// First member holding `value`
    fn by_value(&self, value: &PropertyValue) -> Option<&VertexProperty> {
        self.members().iter().find(|vp| vp.value() == value)
    }

    /// Every member holding `value`
    fn all_by_value(&self, value: &PropertyValue) -> Vec<&VertexProperty> {
        self.members().iter().filter(|vp| vp.value() == value).collect()
    }

    fn values(&self) -> Vec<PropertyValue> {
        self.members().iter().map(|vp| vp.value().clone()).collect()
    }
}

/// Ordered list of vertex properties
#[derive(Debug, Clone)]
pub struct ListVertexPropertyManager {
    data_type: DataType,
    vertex_property: Arc<ElementSchema>,
    items: Vec<VertexProperty>,
    vp_map: FxHashMap<PropertyValue, usize>,
}

impl ListVertexPropertyManager {
    pub(crate) fn new(
        data_type: DataType,
        vertex_property: Arc<ElementSchema>,
        items: Vec<VertexProperty>,
    ) -> Self {
        Self {
            data_type,
            vertex_property,
            items,
            vp_map: FxHashMap::default(),
        }
    }

    /// Validate `value` and append a new member
    pub fn append(&mut self, value: impl Into<PropertyValue>) -> OgmResult<()> {
        let vp = self
            .data_type
            .new_member(value.into(), Cardinality::List, &self.vertex_property)?;
        self.items.push(vp);
        Ok(())
    }

    /// Remove the member at `index`, shifting later members down
    pub fn remove(&mut self, index: usize) -> Option<VertexProperty> {
        if index >= self.items.len() {
            return None;
        }
        let removed = self.items.remove(index);
        self.vp_map.retain(|_, pos| *pos != index);
        for pos in self.vp_map.values_mut() {
            if *pos > index {
                *pos -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, index: usize) -> Option<&VertexProperty> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut VertexProperty> {
        self.items.get_mut(index)
    }

    pub fn members_mut(&mut self) -> &mut [VertexProperty] {
        &mut self.items
    }

    /// First member holding `value`
    pub fn by_value_mut(&mut self, value: &PropertyValue) -> Option<&mut VertexProperty> {
        self.items.iter_mut().find(|vp| vp.value() == value)
    }

    pub fn vp_map(&self) -> &FxHashMap<PropertyValue, usize> {
        &self.vp_map
    }

    /// Position of the member standing for an upstream vertex property.
    ///
    /// Known upstream ids resolve through `vp_map`. Otherwise the first
    /// member with an equal value that has no id and is not claimed by
    /// another upstream id is taken; failing that a new member is appended.
    pub(crate) fn resolve_upstream(
        &mut self,
        upstream: PropertyValue,
        value: &PropertyValue,
    ) -> OgmResult<usize> {
        if let Some(&pos) = self.vp_map.get(&upstream) {
            if pos < self.items.len() {
                return Ok(pos);
            }
        }

        let claimed: FxHashSet<usize> = self.vp_map.values().copied().collect();
        let found = self
            .items
            .iter()
            .enumerate()
            .find(|(pos, vp)| vp.value() == value && vp.id().is_none() && !claimed.contains(pos))
            .map(|(pos, _)| pos);

        let pos = match found {
            Some(pos) => pos,
            None => {
                self.append(value.clone())?;
                self.items.len() - 1
            }
        };
        self.vp_map.insert(upstream, pos);
        Ok(pos)
    }
}

impl VertexPropertyManager for ListVertexPropertyManager {
    fn members(&self) -> &[VertexProperty] {
        &self.items
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn cardinality(&self) -> Cardinality {
        Cardinality::List
    }

    fn vertex_property_schema(&self) -> &Arc<ElementSchema> {
        &self.vertex_property
    }
}

impl Index<usize> for ListVertexPropertyManager {
    type Output = VertexProperty;

    fn index(&self, index: usize) -> &VertexProperty {
        &self.items[index]
    }
}

impl IndexMut<usize> for ListVertexPropertyManager {
    fn index_mut(&mut self, index: usize) -> &mut VertexProperty {
        &mut self.items[index]
    }
}

impl<'a> IntoIterator for &'a ListVertexPropertyManager {
    type Item = &'a VertexProperty;
    type IntoIter = std::slice::Iter<'a, VertexProperty>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Unique set of vertex properties, keyed by value
#[derive(Debug, Clone)]
pub struct SetVertexPropertyManager {
    data_type: DataType,
    vertex_property: Arc<ElementSchema>,
    items: Vec<VertexProperty>,
}

impl SetVertexPropertyManager {
    pub(crate) fn new(
        data_type: DataType,
        vertex_property: Arc<ElementSchema>,
        items: Vec<VertexProperty>,
    ) -> Self {
        Self {
            data_type,
            vertex_property,
            items,
        }
    }

    /// Validate `value` and add it unless an equal member exists.
    /// Returns whether a member was added.
    pub fn add(&mut self, value: impl Into<PropertyValue>) -> OgmResult<bool> {
        let value = self.data_type.validate(value.into())?;
        if self.contains(&value) {
            return Ok(false);
        }
        let vp = self
            .data_type
            .new_member(value, Cardinality::Set, &self.vertex_property)?;
        self.items.push(vp);
        Ok(true)
    }

    pub fn contains(&self, value: &PropertyValue) -> bool {
        self.items.iter().any(|vp| vp.value() == value)
    }

    pub fn remove(&mut self, value: &PropertyValue) -> Option<VertexProperty> {
        let pos = self.items.iter().position(|vp| vp.value() == value)?;
        Some(self.items.remove(pos))
    }

    /// Member holding `value`, with its metaproperties open for editing
    pub fn by_value_mut(&mut self, value: &PropertyValue) -> Option<MemberMut<'_>> {
        self.member_mut(value).map(MemberMut::new)
    }

    /// Raw access for readers that never touch the member value
    pub(crate) fn member_mut(&mut self, value: &PropertyValue) -> Option<&mut VertexProperty> {
        self.items.iter_mut().find(|vp| vp.value() == value)
    }

    /// Current members plus `values`, ready to assign back to the slot
    pub fn union<I, T>(&self, values: I) -> SlotValue
    where
        I: IntoIterator<Item = T>,
        T: Into<PropertyValue>,
    {
        let mut items: Vec<SlotItem> = self.items.iter().cloned().map(SlotItem::Member).collect();
        items.extend(values.into_iter().map(|v| SlotItem::Value(v.into())));
        SlotValue::Set(items)
    }
}

impl VertexPropertyManager for SetVertexPropertyManager {
    fn members(&self) -> &[VertexProperty] {
        &self.items
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn cardinality(&self) -> Cardinality {
        Cardinality::Set
    }

    fn vertex_property_schema(&self) -> &Arc<ElementSchema> {
        &self.vertex_property
    }
}

impl<'a> IntoIterator for &'a SetVertexPropertyManager {
    type Item = &'a VertexProperty;
    type IntoIter = std::slice::Iter<'a, VertexProperty>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Contents of an assigned vertex property slot
#[derive(Debug, Clone)]
pub enum VertexPropertySlot {
    Single(VertexProperty),
    List(ListVertexPropertyManager),
    Set(SetVertexPropertyManager),
}

impl VertexPropertySlot {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            VertexPropertySlot::Single(_) => Cardinality::Single,
            VertexPropertySlot::List(_) => Cardinality::List,
            VertexPropertySlot::Set(_) => Cardinality::Set,
        }
    }

    pub fn members(&self) -> &[VertexProperty] {
        match self {
            VertexPropertySlot::Single(vp) => std::slice::from_ref(vp),
            VertexPropertySlot::List(m) => m.members(),
            VertexPropertySlot::Set(m) => m.members(),
        }
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    pub fn by_value(&self, value: &PropertyValue) -> Option<&VertexProperty> {
        self.members().iter().find(|vp| vp.value() == value)
    }

    pub fn by_value_mut(&mut self, value: &PropertyValue) -> Option<MemberMut<'_>> {
        match self {
            VertexPropertySlot::Single(vp) => (vp.value() == value).then(|| MemberMut::new(vp)),
            VertexPropertySlot::List(m) => m.by_value_mut(value).map(MemberMut::new),
            VertexPropertySlot::Set(m) => m.by_value_mut(value),
        }
    }

    pub fn values(&self) -> Vec<PropertyValue> {
        self.members().iter().map(|vp| vp.value().clone()).collect()
    }

    pub fn as_single(&self) -> Option<&VertexProperty> {
        match self {
            VertexPropertySlot::Single(vp) => Some(vp),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListVertexPropertyManager> {
        match self {
            VertexPropertySlot::List(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListVertexPropertyManager> {
        match self {
            VertexPropertySlot::List(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetVertexPropertyManager> {
        match self {
            VertexPropertySlot::Set(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_set_mut(&mut self) -> Option<&mut SetVertexPropertyManager> {
        match self {
            VertexPropertySlot::Set(m) => Some(m),
            _ => None,
        }
    }
}

/// Mutable handle on one slot member
#[derive(Debug)]
pub struct MemberMut<'a> {
    member: &'a mut VertexProperty,
}

impl<'a> MemberMut<'a> {
    fn new(member: &'a mut VertexProperty) -> Self {
        Self { member }
    }

    /// Assign a metaproperty
    pub fn set(&mut self, name: &str, value: impl Into<SlotValue>) -> OgmResult<()> {
        self.member.set(name, value)
    }

    /// Replace the member value. Set members are keyed by their value and
    /// must be removed and re-added instead.
    pub fn set_value(&mut self, value: impl Into<PropertyValue>) -> OgmResult<()> {
        if self.member.cardinality() == Cardinality::Set {
            return Err(OgmError::element(
                "Set members cannot change value; remove and add instead",
            ));
        }
        self.member.set_value(value)
    }
}

impl Deref for MemberMut<'_> {
    type Target = VertexProperty;

    fn deref(&self) -> &VertexProperty {
        self.member
    }
}
