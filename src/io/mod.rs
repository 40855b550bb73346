//! Bulk export formats

pub mod graphson;

pub use graphson::{to_graphson, AdjList, GraphsonWriter};
