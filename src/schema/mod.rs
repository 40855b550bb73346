//! Schema layer: data types, property declarations, element schemas and mappings

pub mod datatypes;
pub mod element;
pub mod mapping;
pub mod property;
pub mod registry;

pub use datatypes::{BoundValue, DataType};
pub use element::{ElementSchema, ElementSchemaBuilder, DIRTY};
pub use mapping::{Mapping, MapperFunc};
pub use property::{
    default_db_name_factory, default_id_serializer, DbNameFactory, DefaultFactory, IdProperty,
    IdSerializer, Property,
};
pub use registry::Registry;
