//! Value and type vocabulary shared across the mapping layer
//!
//! - `PropertyValue`: scalar and composite values held by element slots
//! - `Cardinality`, `ElementRole`, `ImmutableMode`, `LockingMode`: schema tags

pub mod property;
pub mod types;

pub use property::PropertyValue;
pub use types::{underscore, Cardinality, ElementRole, ImmutableMode, LockingMode};
