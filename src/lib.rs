//! Samyama OGM
//!
//! An object-graph mapping layer for property graph databases. Element types
//! are declared once as schemas; instances validate every assignment against
//! their declared data types, and a `Session` writes them through a
//! traversal-submitting client while keeping one live object per database id.
//!
//! # Architecture
//!
//! - `graph`: value vocabulary (`PropertyValue`, cardinalities, element roles)
//! - `schema`: data types, property declarations, element schemas, mappings
//! - `element`: live vertices, edges and vertex properties with their
//!   list/set managers
//! - `mapper`: translation between database records and elements
//! - `client`: the `GraphClient` seam, traversal builder and the in-process
//!   `EmbeddedClient`
//! - `session`: identity map, pending writes, transaction tags
//! - `io`: GraphSON adjacency-list export
//!
//! ## Example Usage
//!
//! ```rust
//! use samyama_ogm::element::{Element, SlotValue, Vertex};
//! use samyama_ogm::graph::{Cardinality, PropertyValue};
//! use samyama_ogm::schema::{DataType, ElementSchema, Property};
//!
//! let person = ElementSchema::vertex("Person")
//!     .property("name", Property::new(DataType::String))
//!     .property(
//!         "nicknames",
//!         Property::vertex_property(DataType::String).cardinality(Cardinality::List),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let mut dave = Vertex::new(&person).unwrap();
//! dave.set("name", "dave").unwrap();
//! dave.set("nicknames", SlotValue::list(["sly", "guy"])).unwrap();
//!
//! assert_eq!(dave.get("name"), Some(&PropertyValue::from("dave")));
//! assert_eq!(dave.vertex_property("nicknames").unwrap().len(), 2);
//! assert!(dave.set("name", vec![PropertyValue::from(1)]).is_err());
//! ```

pub mod app;
pub mod client;
pub mod config;
pub mod element;
pub mod error;
pub mod graph;
pub mod io;
pub mod logging;
pub mod mapper;
pub mod provider;
pub mod schema;
pub mod session;

pub use app::Ogm;
pub use client::{EmbeddedClient, GraphClient, RawResult, Traversal};
pub use config::OgmConfig;
pub use element::{Edge, EdgeRef, Element, ElementRef, SlotValue, Vertex, VertexProperty, VertexRef};
pub use error::{OgmError, OgmResult};
pub use graph::{Cardinality, ElementRole, ImmutableMode, LockingMode, PropertyValue};
pub use provider::{JanusGraph, Provider, ProviderKind, TinkerGraph};
pub use schema::{DataType, ElementSchema, IdProperty, Property, Registry};
pub use session::{bind_prop, ResultItem, Session};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
