//! EmbeddedClient: in-process property graph
//!
//! Interprets `Traversal` steps against an in-memory graph, no network
//! needed. Vertices carry multi-valued properties with metaproperties, edges
//! carry single-valued properties. Vertices, edges and vertex properties
//! draw their ids from one counter.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::{
    EdgeValueMap, GraphClient, MetaPropertyRecord, RawEdge, RawProperty, RawPropertyValue,
    RawResult, RawVertex, ResultStream, Step, Traversal, VertexPropertyMap,
};
use crate::error::{OgmError, OgmResult};
use crate::graph::{Cardinality, PropertyValue};

type FailurePredicate = Box<dyn Fn(&Traversal) -> bool + Send + Sync>;

#[derive(Debug, Clone)]
struct StoredVertexProperty {
    id: i64,
    key: String,
    value: PropertyValue,
    meta: IndexMap<String, PropertyValue>,
}

#[derive(Debug, Clone)]
struct StoredVertex {
    label: String,
    properties: Vec<StoredVertexProperty>,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    label: String,
    out_v: i64,
    in_v: i64,
    properties: IndexMap<String, PropertyValue>,
}

/// The in-memory graph behind an `EmbeddedClient`
#[derive(Debug, Default)]
pub struct GraphData {
    vertices: IndexMap<i64, StoredVertex>,
    edges: IndexMap<i64, StoredEdge>,
    last_id: i64,
}

impl GraphData {
    fn allocate_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Values stored under `key` on a vertex, in insertion order
    pub fn vertex_values(&self, id: &PropertyValue, key: &str) -> Vec<PropertyValue> {
        id.as_i64()
            .and_then(|id| self.vertices.get(&id))
            .map(|v| {
                v.properties
                    .iter()
                    .filter(|p| p.key == key)
                    .map(|p| p.value.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Value stored under `key` on an edge
    pub fn edge_value(&self, id: &PropertyValue, key: &str) -> Option<PropertyValue> {
        id.as_i64()
            .and_then(|id| self.edges.get(&id))
            .and_then(|e| e.properties.get(key).cloned())
    }

    fn remove_vertex(&mut self, id: i64) {
        if self.vertices.shift_remove(&id).is_some() {
            self.edges.retain(|_, e| e.out_v != id && e.in_v != id);
        }
    }

    fn raw_vertex(&self, id: i64) -> Option<RawVertex> {
        self.vertices.get(&id).map(|v| RawVertex {
            id: PropertyValue::Long(id),
            label: v.label.clone(),
        })
    }

    fn to_raw(&self, traverser: &Traverser) -> Option<RawResult> {
        match traverser {
            Traverser::Vertex(id) => self.raw_vertex(*id).map(RawResult::Vertex),
            Traverser::Edge(id) => {
                let e = self.edges.get(id)?;
                Some(RawResult::Edge(RawEdge {
                    id: PropertyValue::Long(*id),
                    label: e.label.clone(),
                    out_v: self.raw_vertex(e.out_v)?,
                    in_v: self.raw_vertex(e.in_v)?,
                }))
            }
            Traverser::VertexProperty { vertex, id } => {
                let p = self
                    .vertices
                    .get(vertex)?
                    .properties
                    .iter()
                    .find(|p| p.id == *id)?;
                Some(RawResult::Property(RawProperty {
                    id: PropertyValue::Long(p.id),
                    key: p.key.clone(),
                    value: p.value.clone(),
                }))
            }
            Traverser::EdgeProperty { edge, key } => {
                let value = self.edges.get(edge)?.properties.get(key)?;
                Some(RawResult::Property(RawProperty {
                    id: PropertyValue::Null,
                    key: key.clone(),
                    value: value.clone(),
                }))
            }
            Traverser::Value(v) => Some(RawResult::Value(v.clone())),
            Traverser::List(items) => Some(RawResult::List(
                items.iter().filter_map(|t| self.to_raw(t)).collect(),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Traverser {
    Vertex(i64),
    Edge(i64),
    VertexProperty { vertex: i64, id: i64 },
    EdgeProperty { edge: i64, key: String },
    Value(PropertyValue),
    List(Vec<Traverser>),
}

fn ids_of(ids: &[PropertyValue]) -> Vec<i64> {
    ids.iter().filter_map(PropertyValue::as_i64).collect()
}

/// One traversal run: the graph plus the side-effect buckets of `aggregate`
struct Execution<'g> {
    graph: &'g mut GraphData,
    side_effects: HashMap<String, Vec<Traverser>>,
}

impl<'g> Execution<'g> {
    fn new(graph: &'g mut GraphData) -> Self {
        Self {
            graph,
            side_effects: HashMap::new(),
        }
    }

    /// Run `steps`. `input` is `None` at a traversal source.
    fn run(&mut self, steps: &[Step], input: Option<Vec<Traverser>>) -> OgmResult<Vec<Traverser>> {
        let mut current = input;
        let mut i = 0;
        while i < steps.len() {
            let incoming = current.take();
            let out = match &steps[i] {
                Step::V { ids } => {
                    let matched: Vec<i64> = if ids.is_empty() {
                        self.graph.vertices.keys().copied().collect()
                    } else {
                        ids_of(ids)
                            .into_iter()
                            .filter(|id| self.graph.vertices.contains_key(id))
                            .collect()
                    };
                    let repeat = incoming.map(|t| t.len()).unwrap_or(1);
                    (0..repeat)
                        .flat_map(|_| matched.iter().map(|id| Traverser::Vertex(*id)))
                        .collect()
                }
                Step::E { ids } => {
                    let matched: Vec<i64> = if ids.is_empty() {
                        self.graph.edges.keys().copied().collect()
                    } else {
                        ids_of(ids)
                            .into_iter()
                            .filter(|id| self.graph.edges.contains_key(id))
                            .collect()
                    };
                    let repeat = incoming.map(|t| t.len()).unwrap_or(1);
                    (0..repeat)
                        .flat_map(|_| matched.iter().map(|id| Traverser::Edge(*id)))
                        .collect()
                }
                Step::AddV { label } => {
                    let repeat = incoming.map(|t| t.len()).unwrap_or(1);
                    (0..repeat)
                        .map(|_| {
                            let id = self.graph.allocate_id();
                            self.graph.vertices.insert(
                                id,
                                StoredVertex {
                                    label: label.clone(),
                                    properties: Vec::new(),
                                },
                            );
                            Traverser::Vertex(id)
                        })
                        .collect()
                }
                Step::AddE { label } => {
                    let target = match steps.get(i + 1) {
                        Some(Step::To { vertex }) => {
                            i += 1;
                            let found = self.run(vertex.steps(), None)?;
                            match found.first() {
                                Some(Traverser::Vertex(id)) => *id,
                                _ => return Err(OgmError::backend("addE target vertex not found")),
                            }
                        }
                        _ => return Err(OgmError::backend("addE requires a to() step")),
                    };
                    let mut out = Vec::new();
                    for t in incoming.unwrap_or_default() {
                        let source = match t {
                            Traverser::Vertex(id) => id,
                            other => {
                                return Err(OgmError::backend(format!(
                                    "addE requires a vertex, got {:?}",
                                    other
                                )))
                            }
                        };
                        let id = self.graph.allocate_id();
                        self.graph.edges.insert(
                            id,
                            StoredEdge {
                                label: label.clone(),
                                out_v: source,
                                in_v: target,
                                properties: IndexMap::new(),
                            },
                        );
                        out.push(Traverser::Edge(id));
                    }
                    out
                }
                Step::To { .. } => return Err(OgmError::backend("to() must follow addE()")),
                Step::Property {
                    cardinality,
                    key,
                    value,
                    meta,
                } => {
                    let incoming = incoming.unwrap_or_default();
                    if !value.is_null() {
                        for t in &incoming {
                            self.set_property(t, *cardinality, key, value, meta)?;
                        }
                    }
                    incoming
                }
                Step::Has { key, value } => incoming
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|t| self.has(t, key, value))
                    .collect(),
                Step::HasLabel { label } => incoming
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|t| self.label_of(t).as_deref() == Some(label.as_str()))
                    .collect(),
                Step::Properties { keys } => {
                    let wanted = |k: &str| keys.is_empty() || keys.iter().any(|w| w == k);
                    let mut out = Vec::new();
                    for t in incoming.unwrap_or_default() {
                        match t {
                            Traverser::Vertex(vid) => {
                                if let Some(v) = self.graph.vertices.get(&vid) {
                                    out.extend(v.properties.iter().filter(|p| wanted(&p.key)).map(
                                        |p| Traverser::VertexProperty { vertex: vid, id: p.id },
                                    ));
                                }
                            }
                            Traverser::Edge(eid) => {
                                if let Some(e) = self.graph.edges.get(&eid) {
                                    out.extend(e.properties.keys().filter(|k| wanted(k)).map(
                                        |k| Traverser::EdgeProperty {
                                            edge: eid,
                                            key: k.clone(),
                                        },
                                    ));
                                }
                            }
                            _ => {}
                        }
                    }
                    out
                }
                Step::Drop => {
                    for t in incoming.unwrap_or_default() {
                        self.drop_traverser(t);
                    }
                    Vec::new()
                }
                Step::Id => incoming
                    .unwrap_or_default()
                    .into_iter()
                    .map(|t| Traverser::Value(self.id_of(&t)))
                    .collect(),
                Step::Label => incoming
                    .unwrap_or_default()
                    .into_iter()
                    .map(|t| Traverser::Value(self.label_of(&t).map(PropertyValue::String).unwrap_or_default()))
                    .collect(),
                Step::Count => {
                    let n = incoming.map(|t| t.len()).unwrap_or(0);
                    vec![Traverser::Value(PropertyValue::Long(n as i64))]
                }
                Step::Aggregate { key } => {
                    let incoming = incoming.unwrap_or_default();
                    self.side_effects
                        .entry(key.clone())
                        .or_default()
                        .extend(incoming.iter().cloned());
                    incoming
                }
                Step::Fold => vec![Traverser::List(incoming.unwrap_or_default())],
                Step::Unfold => incoming
                    .unwrap_or_default()
                    .into_iter()
                    .flat_map(|t| match t {
                        Traverser::List(items) => items,
                        other => vec![other],
                    })
                    .collect(),
                Step::Select { key } => {
                    let bucket = self.side_effects.get(key).cloned().unwrap_or_default();
                    incoming
                        .unwrap_or_default()
                        .iter()
                        .map(|_| Traverser::List(bucket.clone()))
                        .collect()
                }
                Step::Choose { condition, then } => {
                    let mut out = Vec::new();
                    for t in incoming.unwrap_or_default() {
                        let matched = self.run(condition.steps(), Some(vec![t.clone()]))?;
                        if matched.is_empty() {
                            out.push(t);
                        } else {
                            out.extend(self.run(then.steps(), Some(vec![t]))?);
                        }
                    }
                    out
                }
            };
            current = Some(out);
            i += 1;
        }
        Ok(current.unwrap_or_default())
    }

    fn set_property(
        &mut self,
        target: &Traverser,
        cardinality: Option<Cardinality>,
        key: &str,
        value: &PropertyValue,
        meta: &IndexMap<String, PropertyValue>,
    ) -> OgmResult<()> {
        match target {
            Traverser::Vertex(vid) => {
                let id = self.graph.allocate_id();
                let vertex = self
                    .graph
                    .vertices
                    .get_mut(vid)
                    .ok_or_else(|| OgmError::backend(format!("vertex {} does not exist", vid)))?;
                let meta: IndexMap<String, PropertyValue> = meta
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                match cardinality {
                    None | Some(Cardinality::Single) => vertex.properties.retain(|p| p.key != key),
                    Some(Cardinality::List) => {}
                    Some(Cardinality::Set) => {
                        if vertex.properties.iter().any(|p| p.key == key && &p.value == value) {
                            return Ok(());
                        }
                    }
                }
                vertex.properties.push(StoredVertexProperty {
                    id,
                    key: key.to_string(),
                    value: value.clone(),
                    meta,
                });
                Ok(())
            }
            Traverser::Edge(eid) => {
                let edge = self
                    .graph
                    .edges
                    .get_mut(eid)
                    .ok_or_else(|| OgmError::backend(format!("edge {} does not exist", eid)))?;
                edge.properties.insert(key.to_string(), value.clone());
                Ok(())
            }
            Traverser::VertexProperty { vertex, id } => {
                if let Some(p) = self
                    .graph
                    .vertices
                    .get_mut(vertex)
                    .and_then(|v| v.properties.iter_mut().find(|p| p.id == *id))
                {
                    p.meta.insert(key.to_string(), value.clone());
                }
                Ok(())
            }
            other => Err(OgmError::backend(format!(
                "property() requires an element, got {:?}",
                other
            ))),
        }
    }

    fn has(&self, t: &Traverser, key: &str, value: &PropertyValue) -> bool {
        match t {
            Traverser::Vertex(id) => self
                .graph
                .vertices
                .get(id)
                .map(|v| v.properties.iter().any(|p| p.key == key && &p.value == value))
                .unwrap_or(false),
            Traverser::Edge(id) => self
                .graph
                .edges
                .get(id)
                .and_then(|e| e.properties.get(key))
                .map(|v| v == value)
                .unwrap_or(false),
            _ => false,
        }
    }

    fn label_of(&self, t: &Traverser) -> Option<String> {
        match t {
            Traverser::Vertex(id) => self.graph.vertices.get(id).map(|v| v.label.clone()),
            Traverser::Edge(id) => self.graph.edges.get(id).map(|e| e.label.clone()),
            Traverser::VertexProperty { vertex, id } => self
                .graph
                .vertices
                .get(vertex)
                .and_then(|v| v.properties.iter().find(|p| p.id == *id))
                .map(|p| p.key.clone()),
            Traverser::EdgeProperty { key, .. } => Some(key.clone()),
            _ => None,
        }
    }

    fn id_of(&self, t: &Traverser) -> PropertyValue {
        match t {
            Traverser::Vertex(id) | Traverser::Edge(id) | Traverser::VertexProperty { id, .. } => {
                PropertyValue::Long(*id)
            }
            _ => PropertyValue::Null,
        }
    }

    fn drop_traverser(&mut self, t: Traverser) {
        match t {
            Traverser::Vertex(id) => self.graph.remove_vertex(id),
            Traverser::Edge(id) => {
                self.graph.edges.shift_remove(&id);
            }
            Traverser::VertexProperty { vertex, id } => {
                if let Some(v) = self.graph.vertices.get_mut(&vertex) {
                    v.properties.retain(|p| p.id != id);
                }
            }
            Traverser::EdgeProperty { edge, key } => {
                if let Some(e) = self.graph.edges.get_mut(&edge) {
                    e.properties.shift_remove(&key);
                }
            }
            Traverser::Value(_) | Traverser::List(_) => {}
        }
    }
}

/// In-process client that interprets traversals directly.
///
/// Ideal for tests and embedded applications. Every submission is recorded
/// and a failure predicate can be installed to make matching submissions
/// fail, which exercises the session's rollback path.
pub struct EmbeddedClient {
    graph: Arc<RwLock<GraphData>>,
    submissions: Mutex<Vec<Traversal>>,
    lookups: AtomicUsize,
    failure: Mutex<Option<FailurePredicate>>,
}

impl EmbeddedClient {
    /// Create a new EmbeddedClient with a fresh empty graph
    pub fn new() -> Self {
        Self {
            graph: Arc::new(RwLock::new(GraphData::default())),
            submissions: Mutex::new(Vec::new()),
            lookups: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Acquire a read lock on the graph for direct inspection
    pub async fn graph_read(&self) -> tokio::sync::RwLockReadGuard<'_, GraphData> {
        self.graph.read().await
    }

    /// Every traversal submitted so far
    pub fn submissions(&self) -> Vec<Traversal> {
        self.submissions.lock().clone()
    }

    /// Submissions plus property lookups
    pub fn operation_count(&self) -> usize {
        self.submissions.lock().len() + self.lookups.load(Ordering::Relaxed)
    }

    /// Fail every submission matching `predicate` with a backend error
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&Traversal) -> bool + Send + Sync + 'static,
    {
        *self.failure.lock() = Some(Box::new(predicate));
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }
}

impl Default for EmbeddedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphClient for EmbeddedClient {
    async fn submit(&self, traversal: &Traversal) -> OgmResult<ResultStream> {
        self.submissions.lock().push(traversal.clone());
        let rejected = self
            .failure
            .lock()
            .as_ref()
            .map(|predicate| predicate(traversal))
            .unwrap_or(false);
        if rejected {
            return Err(OgmError::backend("submission rejected by embedded graph"));
        }

        let mut graph = self.graph.write().await;
        let mut execution = Execution::new(&mut graph);
        let traversers = execution.run(traversal.steps(), None)?;
        let results: Vec<RawResult> = traversers
            .iter()
            .filter_map(|t| execution.graph.to_raw(t))
            .collect();
        debug!("Embedded traversal produced {} results", results.len());
        Ok(stream::iter(results.into_iter().map(Ok)).boxed())
    }

    async fn vertex_properties(
        &self,
        id: &PropertyValue,
        label: &str,
    ) -> OgmResult<VertexPropertyMap> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let graph = self.graph.read().await;
        let mut map = VertexPropertyMap {
            id: id.clone(),
            label: label.to_string(),
            properties: IndexMap::new(),
        };
        if let Some(vertex) = id.as_i64().and_then(|vid| graph.vertices.get(&vid)) {
            for p in &vertex.properties {
                let entry = if p.meta.is_empty() {
                    RawPropertyValue::Bare(p.value.clone())
                } else {
                    RawPropertyValue::Meta(MetaPropertyRecord {
                        id: PropertyValue::Long(p.id),
                        key: p.key.clone(),
                        value: p.value.clone(),
                        properties: p.meta.clone(),
                    })
                };
                map.properties.entry(p.key.clone()).or_default().push(entry);
            }
        }
        Ok(map)
    }

    async fn edge_properties(&self, id: &PropertyValue) -> OgmResult<Option<EdgeValueMap>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let graph = self.graph.read().await;
        Ok(id.as_i64().and_then(|eid| graph.edges.get(&eid)).map(|e| EdgeValueMap {
            id: id.clone(),
            label: e.label.clone(),
            properties: e.properties.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn add_person(client: &EmbeddedClient, name: &str) -> PropertyValue {
        let created = client
            .next(&Traversal::new().add_v("person").property("name", name))
            .await
            .unwrap();
        match created {
            Some(RawResult::Vertex(v)) => v.id,
            other => panic!("expected vertex, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_and_lookup_vertex() {
        let client = EmbeddedClient::new();
        let id = add_person(&client, "dave").await;

        let props = client.vertex_properties(&id, "person").await.unwrap();
        assert_eq!(
            props.properties["name"],
            vec![RawPropertyValue::Bare(PropertyValue::from("dave"))]
        );
        assert_eq!(client.graph_read().await.vertex_count(), 1);
    }

    #[tokio::test]
    async fn test_property_cardinalities() {
        let client = EmbeddedClient::new();
        let id = add_person(&client, "dave").await;
        let mut meta = IndexMap::new();
        meta.insert("year".to_string(), PropertyValue::Integer(2010));

        let t = Traversal::new()
            .v(id.clone())
            .property_with(None, "nick", "a", IndexMap::new())
            .property_with(Some(Cardinality::List), "nick", "b", meta)
            .property_with(Some(Cardinality::List), "nick", "b", IndexMap::new())
            .property_with(None, "num", 1, IndexMap::new())
            .property_with(Some(Cardinality::Set), "num", 1, IndexMap::new())
            .property_with(Some(Cardinality::Set), "num", 2, IndexMap::new());
        client.iterate(&t).await.unwrap();

        let graph = client.graph_read().await;
        let nicks: Vec<PropertyValue> = vec!["a".into(), "b".into(), "b".into()];
        assert_eq!(graph.vertex_values(&id, "nick"), nicks);
        let nums: Vec<PropertyValue> = vec![1.into(), 2.into()];
        assert_eq!(graph.vertex_values(&id, "num"), nums);
        drop(graph);

        let props = client.vertex_properties(&id, "person").await.unwrap();
        assert!(matches!(props.properties["nick"][1], RawPropertyValue::Meta(_)));
    }

    #[tokio::test]
    async fn test_add_edge_and_drop_vertex() {
        let client = EmbeddedClient::new();
        let a = add_person(&client, "a").await;
        let b = add_person(&client, "b").await;

        let edge = client
            .next(
                &Traversal::new()
                    .v(a.clone())
                    .add_e("knows")
                    .to(Traversal::new().v(b.clone()))
                    .property("notes", "friends"),
            )
            .await
            .unwrap();
        let edge = match edge {
            Some(RawResult::Edge(e)) => e,
            other => panic!("expected edge, got {:?}", other),
        };
        assert_eq!(edge.out_v.id, a);
        assert_eq!(edge.in_v.id, b);

        let props = client.edge_properties(&edge.id).await.unwrap().unwrap();
        assert_eq!(props.properties["notes"], PropertyValue::from("friends"));

        client.iterate(&Traversal::new().v(a).drop()).await.unwrap();
        let graph = client.graph_read().await;
        assert_eq!(graph.vertex_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[tokio::test]
    async fn test_aggregate_select_drop() {
        let client = EmbeddedClient::new();
        let a = add_person(&client, "a").await;
        let b = add_person(&client, "b").await;
        client
            .iterate(&Traversal::new().v(a.clone()).property("dirty", "tx"))
            .await
            .unwrap();

        let strip = Traversal::new()
            .e_all()
            .has("dirty", "tx")
            .aggregate("x")
            .fold()
            .v_all()
            .has("dirty", "tx")
            .aggregate("x")
            .fold()
            .select("x")
            .unfold()
            .properties(["dirty"])
            .drop();
        client.iterate(&strip).await.unwrap();

        let graph = client.graph_read().await;
        assert!(graph.vertex_values(&a, "dirty").is_empty());
        assert_eq!(graph.vertex_values(&b, "name"), vec![PropertyValue::from("b")]);
    }

    #[tokio::test]
    async fn test_choose() {
        let client = EmbeddedClient::new();
        let a = add_person(&client, "a").await;

        let t = Traversal::new().v(a.clone()).choose(
            Traversal::new().has("name", "a"),
            Traversal::new().property("seen", true),
        );
        client.iterate(&t).await.unwrap();

        let t = Traversal::new().v(a.clone()).choose(
            Traversal::new().has("name", "zzz"),
            Traversal::new().property("other", true),
        );
        client.iterate(&t).await.unwrap();

        let graph = client.graph_read().await;
        assert_eq!(graph.vertex_values(&a, "seen"), vec![PropertyValue::from(true)]);
        assert!(graph.vertex_values(&a, "other").is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let client = EmbeddedClient::new();
        client.fail_when(|t| matches!(t.steps().first(), Some(Step::AddV { .. })));
        let result = client.next(&Traversal::new().add_v("person")).await;
        assert!(matches!(result, Err(OgmError::Backend(_))));

        client.clear_failure();
        assert!(client.next(&Traversal::new().add_v("person")).await.unwrap().is_some());
        assert_eq!(client.submissions().len(), 2);
    }
}
