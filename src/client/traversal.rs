//! Traversal steps
//!
//! A `Traversal` is a plain list of steps. It expresses the primitives the
//! session needs for create, update, delete and transaction-tag cleanup and
//! is interpreted by the `GraphClient` it is submitted to.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::graph::{Cardinality, PropertyValue};

/// A single traversal step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Vertices by id, or all vertices when `ids` is empty
    V { ids: Vec<PropertyValue> },
    /// Edges by id, or all edges when `ids` is empty
    E { ids: Vec<PropertyValue> },
    AddV { label: String },
    /// Edge from the current vertex; the following `To` names the target
    AddE { label: String },
    To { vertex: Traversal },
    /// `None` cardinality replaces existing values of the key
    Property {
        cardinality: Option<Cardinality>,
        key: String,
        value: PropertyValue,
        meta: IndexMap<String, PropertyValue>,
    },
    Has { key: String, value: PropertyValue },
    HasLabel { label: String },
    /// Properties of the current element, all keys when `keys` is empty
    Properties { keys: Vec<String> },
    Drop,
    Id,
    Label,
    Count,
    Aggregate { key: String },
    Fold,
    Unfold,
    Select { key: String },
    /// Run `then` on traversers for which `condition` yields anything
    Choose { condition: Traversal, then: Traversal },
}

/// Composable list of steps
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Traversal {
    steps: Vec<Step>,
}

impl Traversal {
    /// Empty traversal, used both as a source and as an anonymous fragment
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn v(self, id: impl Into<PropertyValue>) -> Self {
        self.step(Step::V { ids: vec![id.into()] })
    }

    pub fn v_all(self) -> Self {
        self.step(Step::V { ids: Vec::new() })
    }

    pub fn e(self, id: impl Into<PropertyValue>) -> Self {
        self.step(Step::E { ids: vec![id.into()] })
    }

    pub fn e_all(self) -> Self {
        self.step(Step::E { ids: Vec::new() })
    }

    pub fn add_v(self, label: impl Into<String>) -> Self {
        self.step(Step::AddV { label: label.into() })
    }

    pub fn add_e(self, label: impl Into<String>) -> Self {
        self.step(Step::AddE { label: label.into() })
    }

    pub fn to(self, vertex: Traversal) -> Self {
        self.step(Step::To { vertex })
    }

    pub fn property(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.property_with(None, key, value, IndexMap::new())
    }

    pub fn property_with(
        self,
        cardinality: Option<Cardinality>,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
        meta: IndexMap<String, PropertyValue>,
    ) -> Self {
        self.step(Step::Property {
            cardinality,
            key: key.into(),
            value: value.into(),
            meta,
        })
    }

    pub fn has(self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.step(Step::Has {
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn has_label(self, label: impl Into<String>) -> Self {
        self.step(Step::HasLabel { label: label.into() })
    }

    pub fn properties<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step(Step::Properties {
            keys: keys.into_iter().map(Into::into).collect(),
        })
    }

    pub fn drop(self) -> Self {
        self.step(Step::Drop)
    }

    pub fn id(self) -> Self {
        self.step(Step::Id)
    }

    pub fn label(self) -> Self {
        self.step(Step::Label)
    }

    pub fn count(self) -> Self {
        self.step(Step::Count)
    }

    pub fn aggregate(self, key: impl Into<String>) -> Self {
        self.step(Step::Aggregate { key: key.into() })
    }

    pub fn fold(self) -> Self {
        self.step(Step::Fold)
    }

    pub fn unfold(self) -> Self {
        self.step(Step::Unfold)
    }

    pub fn select(self, key: impl Into<String>) -> Self {
        self.step(Step::Select { key: key.into() })
    }

    pub fn choose(self, condition: Traversal, then: Traversal) -> Self {
        self.step(Step::Choose { condition, then })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_appends_steps() {
        let t = Traversal::new()
            .v(1)
            .add_e("knows")
            .to(Traversal::new().v(2))
            .property("notes", "married");
        assert_eq!(t.steps().len(), 4);
        assert_eq!(t.steps()[1], Step::AddE { label: "knows".into() });
    }

    #[test]
    fn test_serializes_as_tagged_steps() {
        let t = Traversal::new().v_all().has_label("person").drop();
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["steps"][0]["op"], "v");
        assert_eq!(json["steps"][1]["op"], "has_label");
        assert_eq!(json["steps"][2]["op"], "drop");

        let back: Traversal = serde_json::from_value(json).unwrap();
        assert_eq!(back, t);
    }
}
