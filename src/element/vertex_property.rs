//! Vertex properties: value holders that carry metaproperties

use serde_json::{Map, Value};
use std::sync::Arc;

use crate::element::{Element, ElementState, Slot};
use crate::error::{OgmError, OgmResult};
use crate::graph::{Cardinality, PropertyValue};
use crate::schema::{DataType, ElementSchema};

/// A single value of a vertex property slot.
///
/// Its own slots are its metaproperties, declared by its schema.
#[derive(Debug, Clone)]
pub struct VertexProperty {
    state: ElementState,
    value: PropertyValue,
    data_type: DataType,
    cardinality: Cardinality,
}

impl VertexProperty {
    pub fn new(
        schema: &Arc<ElementSchema>,
        data_type: DataType,
        cardinality: Cardinality,
    ) -> OgmResult<Self> {
        if !schema.is_vertex_property() {
            return Err(OgmError::element(format!(
                "{} is not a vertex property schema",
                schema.name()
            )));
        }
        Ok(Self {
            state: ElementState::new(schema)?,
            value: PropertyValue::Null,
            data_type,
            cardinality,
        })
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Validate and replace the held value
    pub fn set_value(&mut self, value: impl Into<PropertyValue>) -> OgmResult<()> {
        self.value = self.data_type.validate(value.into())?;
        Ok(())
    }

    pub(crate) fn set_value_unchecked(&mut self, value: PropertyValue) {
        self.value = value;
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub(crate) fn set_cardinality(&mut self, cardinality: Cardinality) {
        self.cardinality = cardinality;
    }

    /// `{label, value, <metaproperty>...}`
    pub fn to_dict(&self) -> Value {
        let mut out = Map::new();
        out.insert("label".to_string(), Value::String(self.label().to_string()));
        out.insert("value".to_string(), self.value.to_json());
        for (name, slot) in &self.state.slots {
            let value = match slot {
                Slot::Scalar(v) => v.to_json(),
                Slot::VertexProperty(_) => Value::Null,
            };
            out.insert(name.clone(), value);
        }
        Value::Object(out)
    }

    /// Restore metaproperties from a `to_dict` rendering. The value itself is
    /// owned by the slot and is not read here.
    pub fn from_dict(&mut self, dict: &Value) -> OgmResult<()> {
        let map = dict
            .as_object()
            .ok_or_else(|| OgmError::element("vertex property dict must be an object"))?;
        for (key, value) in map {
            if matches!(key.as_str(), "label" | "type" | "value") {
                continue;
            }
            self.set(key, PropertyValue::from_json(value))?;
        }
        Ok(())
    }
}

impl Element for VertexProperty {
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
    use crate::schema::Property;

    fn location() -> Arc<ElementSchema> {
        ElementSchema::vertex_property("Location")
            .property("year", Property::new(DataType::Integer))
            .build()
            .unwrap()
    }

    #[test]
    fn test_value_is_validated() {
        let mut vp = VertexProperty::new(&location(), DataType::String, Cardinality::List).unwrap();
        vp.set_value(12).unwrap();
        assert_eq!(vp.value(), &"12".into());
        assert_eq!(vp.cardinality(), Cardinality::List);
    }

    #[test]
    fn test_metaproperties() {
        let mut vp = VertexProperty::new(&location(), DataType::String, Cardinality::List).unwrap();
        vp.set("year", 2010).unwrap();
        assert!(vp.set("year", "soon").is_err());
        assert_eq!(vp.get("year"), Some(&PropertyValue::Integer(2010)));
        assert!(vp.dirty().is_none());
    }

    #[test]
    fn test_dict_round_trip() {
        let mut vp = VertexProperty::new(&location(), DataType::String, Cardinality::List).unwrap();
        vp.set_value("London, ON").unwrap();
        vp.set("year", 2010).unwrap();

        let dict = vp.to_dict();
        assert_eq!(dict["label"], "location");
        assert_eq!(dict["value"], "London, ON");
        assert_eq!(dict["year"], 2010);

        let mut restored = VertexProperty::new(&location(), DataType::String, Cardinality::List).unwrap();
        restored.from_dict(&dict).unwrap();
        assert_eq!(restored.get("year"), Some(&PropertyValue::Integer(2010)));
    }

    #[test]
    fn test_rejects_non_vertex_property_schema() {
        let schema = ElementSchema::vertex("Person").build().unwrap();
        assert!(VertexProperty::new(&schema, DataType::String, Cardinality::Single).is_err());
    }
}
