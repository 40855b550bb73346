//! Graph database provider quirks
//!
//! Providers differ in the shape of the ids they return. The session's
//! identity map and the list manager's dedup index need a hashable,
//! comparable key, so each provider reduces its ids to one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::graph::PropertyValue;

const RELATION_IDENTIFIER: &str = "janusgraph:RelationIdentifier";

/// Provider kinds selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    TinkerGraph,
    JanusGraph,
}

impl ProviderKind {
    pub fn provider(&self) -> Arc<dyn Provider> {
        match self {
            ProviderKind::TinkerGraph => Arc::new(TinkerGraph),
            ProviderKind::JanusGraph => Arc::new(JanusGraph),
        }
    }
}

pub trait Provider: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Reduce a database id to the key used by identity maps
    fn hashable_id(&self, id: &PropertyValue) -> PropertyValue;
}

/// Default provider; ids are used as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct TinkerGraph;

impl Provider for TinkerGraph {
    fn name(&self) -> &'static str {
        "tinkergraph"
    }

    fn hashable_id(&self, id: &PropertyValue) -> PropertyValue {
        id.clone()
    }
}

/// JanusGraph edge ids arrive as typed relation identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct JanusGraph;

impl Provider for JanusGraph {
    fn name(&self) -> &'static str {
        "janusgraph"
    }

    fn hashable_id(&self, id: &PropertyValue) -> PropertyValue {
        relation_identifier(id).unwrap_or_else(|| id.clone())
    }
}

/// `{"@type": "janusgraph:RelationIdentifier", "@value": {...}}` -> inner
/// `value`, falling back to `relationId`
fn relation_identifier(id: &PropertyValue) -> Option<PropertyValue> {
    let map = id.as_map()?;
    if map.get("@type")?.as_str()? != RELATION_IDENTIFIER {
        return None;
    }
    let inner = map.get("@value")?.as_map()?;
    inner
        .get("value")
        .or_else(|| inner.get("relationId"))
        .cloned()
}
