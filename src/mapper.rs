//! Translation between database records and in-memory elements
//!
//! One translation function per element role:
//! - `map_vertex_to_ogm`: property groups by wire name, metaproperty
//!   reconciliation for vertex property slots
//! - `map_edge_to_ogm`: single-valued properties plus endpoint stubs
//! - `map_vertex_property_to_ogm`: metaproperties onto the members of a slot
//!
//! `map_props_to_db` goes the other way and produces the property writes
//! for a create or update.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::client::{
    EdgeValueMap, MetaPropertyRecord, RawEdge, RawPropertyValue, RawVertex, VertexPropertyMap,
};
use crate::element::{
    Edge, Element, Slot, Vertex, VertexProperty, VertexPropertyManager, VertexPropertySlot,
    VertexRef,
};
use crate::error::OgmResult;
use crate::graph::{Cardinality, PropertyValue};
use crate::provider::Provider;

/// Key under which a metaproperty map carries the vertex property's own id
const META_ID: &str = "id";

/// One property write: `property([cardinality,] key, value, *meta)`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTuple {
    /// `None` replaces existing values of the key
    pub cardinality: Option<Cardinality>,
    pub db_name: String,
    pub value: PropertyValue,
    pub metaprops: Option<IndexMap<String, PropertyValue>>,
}

impl PropertyTuple {
    fn scalar(db_name: &str, value: PropertyValue) -> Self {
        Self {
            cardinality: None,
            db_name: db_name.to_string(),
            value,
            metaprops: None,
        }
    }
}

/// Encode every declared property of `element` as property writes.
///
/// Members of list and set slots produce one tuple each. The first member
/// carries no cardinality so that it replaces what is stored; the rest carry
/// the member's own cardinality and accumulate.
pub fn map_props_to_db<E: Element + ?Sized>(element: &E) -> Vec<PropertyTuple> {
    let mut tuples = Vec::new();
    for (ogm_name, (db_name, data_type)) in element.mapping().ogm_properties() {
        match element.slot(ogm_name) {
            Some(Slot::Scalar(value)) => {
                tuples.push(PropertyTuple::scalar(db_name, data_type.to_db(value)));
            }
            Some(Slot::VertexProperty(Some(VertexPropertySlot::Single(vp)))) => {
                tuples.push(PropertyTuple {
                    cardinality: None,
                    db_name: db_name.clone(),
                    value: data_type.to_db(vp.value()),
                    metaprops: Some(get_metaprops(vp)),
                });
            }
            Some(Slot::VertexProperty(Some(slot))) if !slot.is_empty() => {
                let mut cardinality = None;
                for vp in slot.members() {
                    tuples.push(PropertyTuple {
                        cardinality,
                        db_name: db_name.clone(),
                        value: data_type.to_db(vp.value()),
                        metaprops: Some(get_metaprops(vp)),
                    });
                    cardinality = Some(vp.cardinality());
                }
            }
            _ => tuples.push(PropertyTuple::scalar(db_name, PropertyValue::Null)),
        }
    }
    tuples
}

/// Metaproperties of a vertex property keyed by wire name; unset ones are null
pub fn get_metaprops(vp: &VertexProperty) -> IndexMap<String, PropertyValue> {
    vp.mapping()
        .ogm_properties()
        .iter()
        .map(|(ogm_name, (db_name, data_type))| {
            let value = vp
                .get(ogm_name)
                .map(|v| data_type.to_db(v))
                .unwrap_or_default();
            (db_name.clone(), value)
        })
        .collect()
}

/// Populate `vertex` from a vertex record and its full property map.
///
/// Groups holding one value are unwrapped, larger groups are assigned as a
/// list. Wire names the mapping does not know land in the undeclared map.
/// Label and id are set last.
pub fn map_vertex_to_ogm(
    raw: &RawVertex,
    props: VertexPropertyMap,
    vertex: &mut Vertex,
    provider: &dyn Provider,
) -> OgmResult<()> {
    for (db_name, entries) in props.properties {
        let mut values = Vec::with_capacity(entries.len());
        let mut metaprops = Vec::new();
        for entry in entries {
            match entry {
                RawPropertyValue::Bare(value) => values.push(value),
                RawPropertyValue::Meta(MetaPropertyRecord {
                    id,
                    value,
                    mut properties,
                    ..
                }) => {
                    if !properties.is_empty() {
                        properties.insert(META_ID.to_string(), id);
                        metaprops.push((value.clone(), properties));
                    }
                    values.push(value);
                }
            }
        }

        let value = match values.len() {
            0 => PropertyValue::Null,
            1 => values.swap_remove(0),
            _ => PropertyValue::List(values),
        };

        let resolved = vertex
            .mapping()
            .resolve_db(&db_name)
            .map(|(name, data_type)| (name.to_string(), data_type));
        let Some((name, data_type)) = resolved else {
            debug!("Unmapped vertex property {} kept as undeclared", db_name);
            vertex.state_mut().set_undeclared(db_name, value);
            continue;
        };
        vertex.set(&name, data_type.to_ogm(value))?;

        if !metaprops.is_empty() {
            if let Some(slot) = vertex.vertex_property_mut(&name) {
                map_vertex_property_to_ogm(metaprops, slot, provider)?;
            }
        }
    }

    vertex.set_label(props.label);
    vertex.set_id(raw.id.clone())?;
    Ok(())
}

/// Apply `(value, metaproperties)` pairs to the members of a slot.
///
/// List members are resolved through the upstream vertex property id, set
/// members by value; a single slot is its own member.
pub fn map_vertex_property_to_ogm(
    entries: Vec<(PropertyValue, IndexMap<String, PropertyValue>)>,
    slot: &mut VertexPropertySlot,
    provider: &dyn Provider,
) -> OgmResult<()> {
    for (value, metaprops) in entries {
        let current: &mut VertexProperty = match slot {
            VertexPropertySlot::List(list) => {
                let upstream = metaprops
                    .get(META_ID)
                    .map(|id| provider.hashable_id(id))
                    .unwrap_or_default();
                let pos = list.resolve_upstream(upstream, &value)?;
                &mut list[pos]
            }
            VertexPropertySlot::Set(set) => match set.member_mut(&value) {
                Some(vp) => vp,
                None => continue,
            },
            VertexPropertySlot::Single(vp) => vp,
        };
        apply_metaprops(current, metaprops)?;
    }
    Ok(())
}

fn apply_metaprops(
    vp: &mut VertexProperty,
    metaprops: IndexMap<String, PropertyValue>,
) -> OgmResult<()> {
    for (db_name, value) in metaprops {
        if db_name == META_ID {
            vp.set_id(value)?;
            continue;
        }
        let resolved = vp
            .mapping()
            .resolve_db(&db_name)
            .map(|(name, data_type)| (name.to_string(), data_type));
        match resolved {
            Some((name, data_type)) => vp.set(&name, data_type.to_ogm(value))?,
            None => vp.state_mut().set_undeclared(db_name, value),
        }
    }
    Ok(())
}

/// Populate `edge` from an edge record and its value map, then reconcile
/// the cached endpoint vertices with the ids in the record.
pub fn map_edge_to_ogm(raw: &RawEdge, props: EdgeValueMap, edge: &mut Edge) -> OgmResult<()> {
    for (db_name, value) in props.properties {
        let resolved = edge
            .mapping()
            .resolve_db(&db_name)
            .map(|(name, data_type)| (name.to_string(), data_type));
        match resolved {
            Some((name, data_type)) => edge.set(&name, data_type.to_ogm(value))?,
            None => edge.state_mut().set_undeclared(db_name, value),
        }
    }
    edge.set_label(props.label);
    edge.set_id(raw.id.clone())?;

    let source = reconcile_endpoint(edge.source(), &raw.out_v.id)?;
    let target = reconcile_endpoint(edge.target(), &raw.in_v.id)?;
    edge.set_source(Some(source));
    edge.set_target(Some(target));
    Ok(())
}

/// Keep the cached endpoint when its id agrees with `rid`, otherwise replace
/// it with a generic stub. The result is stamped with `rid`.
fn reconcile_endpoint(current: Option<&VertexRef>, rid: &PropertyValue) -> OgmResult<VertexRef> {
    let endpoint = match current {
        Some(vertex) => {
            let cached = vertex.read().id().cloned();
            if id_changed(rid, cached.as_ref()) {
                Vertex::generic().into_ref()
            } else {
                vertex.clone()
            }
        }
        None => Vertex::generic().into_ref(),
    };
    endpoint.write().set_id(rid.clone())?;
    Ok(endpoint)
}

fn id_changed(rid: &PropertyValue, cached: Option<&PropertyValue>) -> bool {
    match cached {
        Some(eid) if eid != rid => {
            warn!("Edge vertex id has changed: {} -> {}", eid, rid);
            true
        }
        _ => false,
    }
}
