//! Typed scalar converters
//!
//! Every declared property carries a `DataType`. Assignments run through
//! `validate`, writes to the database through `to_db`, and values read back
//! through `to_ogm`. `validate_vertex_prop` fans a scalar (or collection) out
//! into the vertex property container matching a slot's cardinality.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::element::{
    ListVertexPropertyManager, SetVertexPropertyManager, SlotItem, SlotValue, VertexProperty,
    VertexPropertySlot,
};
use crate::error::{OgmError, OgmResult};
use crate::graph::{Cardinality, PropertyValue};
use crate::schema::ElementSchema;

/// Scalar data type of a declared property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataType {
    /// No conversion at all
    #[default]
    Generic,
    String,
    Integer,
    Float,
    Boolean,
}

impl DataType {
    /// Name of the type values are converted to
    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Generic => "Generic",
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Float => "Float",
            DataType::Boolean => "Boolean",
        }
    }

    /// Validate (and coerce) a value for this type.
    ///
    /// `Null` passes through every type unchanged and means "unset".
    pub fn validate(&self, val: PropertyValue) -> OgmResult<PropertyValue> {
        if val.is_null() {
            return Ok(val);
        }
        match self {
            DataType::Generic => Ok(val),
            DataType::String => validate_string(val),
            DataType::Integer => validate_integer(val),
            DataType::Float => validate_float(val),
            DataType::Boolean => validate_boolean(val),
        }
    }

    /// Convert a value to its database representation
    pub fn to_db(&self, val: &PropertyValue) -> PropertyValue {
        val.clone()
    }

    /// Convert a database value to its in-memory representation
    pub fn to_ogm(&self, val: PropertyValue) -> PropertyValue {
        val
    }

    /// Validate a value and keep it bound to this type
    pub fn bind(&self, val: impl Into<PropertyValue>) -> OgmResult<BoundValue> {
        Ok(BoundValue {
            data_type: *self,
            value: self.validate(val.into())?,
        })
    }

    /// Fan a slot assignment out into the container its cardinality requires.
    ///
    /// - `List`: one vertex property per input element, input order preserved
    /// - `Set`: one vertex property per distinct validated value; existing
    ///   vertex properties in the input are reused as-is
    /// - `Single`: exactly one vertex property, returned unwrapped
    ///
    /// Nothing is built unless every element validates.
    pub fn validate_vertex_prop(
        &self,
        value: SlotValue,
        cardinality: Cardinality,
        vp_schema: &Arc<ElementSchema>,
    ) -> OgmResult<VertexPropertySlot> {
        match cardinality {
            Cardinality::List => {
                let items = match value {
                    SlotValue::Scalar(PropertyValue::List(values)) => {
                        values.into_iter().map(SlotItem::Value).collect()
                    }
                    SlotValue::Scalar(v) => vec![SlotItem::Value(v)],
                    SlotValue::List(items) => items,
                    SlotValue::Set(items) => dedup_items(items),
                };
                let mut members = Vec::with_capacity(items.len());
                for item in items {
                    members.push(self.member_from_item(item, cardinality, vp_schema)?);
                }
                Ok(VertexPropertySlot::List(ListVertexPropertyManager::new(
                    *self,
                    vp_schema.clone(),
                    members,
                )))
            }
            Cardinality::Set => {
                let items = match value {
                    SlotValue::Scalar(PropertyValue::List(values)) => {
                        values.into_iter().map(SlotItem::Value).collect()
                    }
                    SlotValue::Scalar(v) => vec![SlotItem::Value(v)],
                    SlotValue::List(items) | SlotValue::Set(items) => items,
                };
                let mut members: Vec<VertexProperty> = Vec::with_capacity(items.len());
                for item in items {
                    let member = match item {
                        SlotItem::Member(vp) => vp,
                        SlotItem::Value(v) => self.new_member(v, cardinality, vp_schema)?,
                    };
                    if !members.iter().any(|m| m.value() == member.value()) {
                        members.push(member);
                    }
                }
                Ok(VertexPropertySlot::Set(SetVertexPropertyManager::new(
                    *self,
                    vp_schema.clone(),
                    members,
                )))
            }
            Cardinality::Single => {
                let item = match value {
                    SlotValue::Scalar(v) => SlotItem::Value(v),
                    SlotValue::List(mut items) | SlotValue::Set(mut items) if items.len() == 1 => {
                        items.remove(0)
                    }
                    SlotValue::List(items) | SlotValue::Set(items) => {
                        return Err(OgmError::validation(format!(
                            "single cardinality expects one value, got {}",
                            items.len()
                        )))
                    }
                };
                let member = self.member_from_item(item, cardinality, vp_schema)?;
                Ok(VertexPropertySlot::Single(member))
            }
        }
    }

    fn member_from_item(
        &self,
        item: SlotItem,
        cardinality: Cardinality,
        vp_schema: &Arc<ElementSchema>,
    ) -> OgmResult<VertexProperty> {
        match item {
            SlotItem::Value(v) => self.new_member(v, cardinality, vp_schema),
            SlotItem::Member(mut vp) => {
                let value = self.validate(vp.value().clone())?;
                vp.set_value_unchecked(value);
                vp.set_cardinality(cardinality);
                Ok(vp)
            }
        }
    }

    pub(crate) fn new_member(
        &self,
        value: PropertyValue,
        cardinality: Cardinality,
        vp_schema: &Arc<ElementSchema>,
    ) -> OgmResult<VertexProperty> {
        let mut vp = VertexProperty::new(vp_schema, *self, cardinality)?;
        vp.set_value(value)?;
        Ok(vp)
    }
}

/// A validated value bound to its data type
#[derive(Debug, Clone, PartialEq)]
pub struct BoundValue {
    data_type: DataType,
    value: PropertyValue,
}

impl BoundValue {
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Convert `val`, or the bound value when none is given, to the database format
    pub fn to_db(&self, val: Option<&PropertyValue>) -> PropertyValue {
        self.data_type.to_db(val.unwrap_or(&self.value))
    }
}

fn dedup_items(items: Vec<SlotItem>) -> Vec<SlotItem> {
    let mut out: Vec<SlotItem> = Vec::with_capacity(items.len());
    for item in items {
        let duplicate = out.iter().any(|seen| seen.value() == item.value());
        if !duplicate {
            out.push(item);
        }
    }
    out
}

fn validate_string(val: PropertyValue) -> OgmResult<PropertyValue> {
    match val {
        PropertyValue::String(_) => Ok(val),
        PropertyValue::Integer(i) => Ok(PropertyValue::String(i.to_string())),
        PropertyValue::Long(l) => Ok(PropertyValue::String(l.to_string())),
        PropertyValue::Float(f) => Ok(PropertyValue::String(format_float(f))),
        PropertyValue::Boolean(b) => Ok(PropertyValue::String(b.to_string())),
        other => Err(OgmError::validation(format!("Not a valid string: {}", other))),
    }
}

fn validate_integer(val: PropertyValue) -> OgmResult<PropertyValue> {
    match val {
        PropertyValue::Integer(_) | PropertyValue::Long(_) => Ok(val),
        PropertyValue::Boolean(b) => Ok(PropertyValue::Integer(i32::from(b))),
        PropertyValue::Float(f) => {
            let whole = f.trunc();
            // NaN fails both comparisons; 2^63 is the first float past i64::MAX
            if whole >= i64::MIN as f64 && whole < i64::MAX as f64 {
                Ok(narrow(whole as i64))
            } else {
                Err(OgmError::validation(format!("Integer out of range: {}", f)))
            }
        }
        PropertyValue::String(ref s) => s
            .trim()
            .parse::<i64>()
            .map(narrow)
            .map_err(|_| OgmError::validation(format!("Not a valid integer: {}", val))),
        other => Err(OgmError::validation(format!("Not a valid integer: {}", other))),
    }
}

fn validate_float(val: PropertyValue) -> OgmResult<PropertyValue> {
    match val {
        PropertyValue::Float(_) => Ok(val),
        PropertyValue::Integer(i) => Ok(PropertyValue::Float(f64::from(i))),
        PropertyValue::Long(l) => Ok(PropertyValue::Float(l as f64)),
        PropertyValue::Boolean(b) => Ok(PropertyValue::Float(if b { 1.0 } else { 0.0 })),
        PropertyValue::String(ref s) => s
            .trim()
            .parse::<f64>()
            .map(PropertyValue::Float)
            .map_err(|_| OgmError::validation(format!("Not a valid float: {}", val))),
        other => Err(OgmError::validation(format!("Not a valid float: {}", other))),
    }
}

fn validate_boolean(val: PropertyValue) -> OgmResult<PropertyValue> {
    match val {
        PropertyValue::Boolean(_) => Ok(val),
        PropertyValue::Integer(_) | PropertyValue::Long(_) => {
            Ok(PropertyValue::Boolean(val.as_i64() != Some(0)))
        }
        PropertyValue::Float(f) => Ok(PropertyValue::Boolean(f != 0.0)),
        PropertyValue::String(ref s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(PropertyValue::Boolean(true)),
            "false" | "0" => Ok(PropertyValue::Boolean(false)),
            _ => Err(OgmError::validation(format!("Not a valid boolean: {}", val))),
        },
        other => Err(OgmError::validation(format!("Not a valid boolean: {}", other))),
    }
}

/// Keep small integers 32-bit, widen the rest
fn narrow(i: i64) -> PropertyValue {
    match i32::try_from(i) {
        Ok(small) => PropertyValue::Integer(small),
        Err(_) => PropertyValue::Long(i),
    }
}

/// Whole floats keep a trailing ".0" so they stay distinguishable from integers
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}
