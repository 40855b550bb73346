//! Bidirectional name/type translation tables

use indexmap::IndexMap;
use std::fmt;

use crate::error::{OgmError, OgmResult};
use crate::graph::ElementRole;
use crate::schema::DataType;

/// Which translation function converts database records into this element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperFunc {
    Vertex,
    Edge,
    VertexProperty,
}

/// Immutable per-type mapping between declared names and wire names.
///
/// `db_properties` and `ogm_properties` are exact inverses of each other.
#[derive(Debug, Clone)]
pub struct Mapping {
    label: String,
    role: ElementRole,
    db_properties: IndexMap<String, (String, DataType)>,
    ogm_properties: IndexMap<String, (String, DataType)>,
}

impl Mapping {
    pub(crate) fn new(label: impl Into<String>, role: ElementRole) -> Self {
        Self {
            label: label.into(),
            role,
            db_properties: IndexMap::new(),
            ogm_properties: IndexMap::new(),
        }
    }

    /// Add a translation entry; a wire name may only be claimed once
    pub(crate) fn insert(&mut self, ogm_name: &str, db_name: &str, data_type: DataType) -> OgmResult<()> {
        if let Some((other, _)) = self.db_properties.get(db_name) {
            if other != ogm_name {
                return Err(OgmError::mapping(format!(
                    "wire name {} of {} is already used by {}",
                    db_name, ogm_name, other
                )));
            }
        }
        self.insert_unchecked(ogm_name, db_name, data_type);
        Ok(())
    }

    pub(crate) fn insert_unchecked(&mut self, ogm_name: &str, db_name: &str, data_type: DataType) {
        self.db_properties
            .insert(db_name.to_string(), (ogm_name.to_string(), data_type));
        self.ogm_properties
            .insert(ogm_name.to_string(), (db_name.to_string(), data_type));
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn role(&self) -> ElementRole {
        self.role
    }

    /// Wire name -> (declared name, data type)
    pub fn db_properties(&self) -> &IndexMap<String, (String, DataType)> {
        &self.db_properties
    }

    /// Declared name -> (wire name, data type)
    pub fn ogm_properties(&self) -> &IndexMap<String, (String, DataType)> {
        &self.ogm_properties
    }

    /// Wire name of a declared property
    pub fn db_name(&self, ogm_name: &str) -> OgmResult<&str> {
        self.ogm_properties
            .get(ogm_name)
            .map(|(db_name, _)| db_name.as_str())
            .ok_or_else(|| OgmError::mapping(format!("unrecognized property {}", ogm_name)))
    }

    /// Wire name and data type of a declared property
    pub fn ogm_property(&self, ogm_name: &str) -> OgmResult<(&str, DataType)> {
        self.ogm_properties
            .get(ogm_name)
            .map(|(db_name, data_type)| (db_name.as_str(), *data_type))
            .ok_or_else(|| OgmError::mapping(format!("unrecognized property {}", ogm_name)))
    }

    /// Declared name and data type for a wire name, if it is mapped
    pub fn resolve_db(&self, db_name: &str) -> Option<(&str, DataType)> {
        self.db_properties
            .get(db_name)
            .map(|(ogm_name, data_type)| (ogm_name.as_str(), *data_type))
    }

    pub fn mapper_func(&self) -> MapperFunc {
        match self.role {
            ElementRole::Vertex => MapperFunc::Vertex,
            ElementRole::Edge => MapperFunc::Edge,
            ElementRole::VertexProperty => MapperFunc::VertexProperty,
        }
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Mapping(label={}, properties={{", self.label)?;
        for (i, (ogm, (db, dt))) in self.ogm_properties.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: ({}, {})", ogm, db, dt.type_name())?;
        }
        write!(f, "}})>")
    }
}
