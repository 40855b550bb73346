//! Session: identity map, pending writes and save orchestration
//!
//! A session is one logical unit of work. It owns a FIFO queue of elements
//! waiting to be written and an identity map from element role and hashable
//! database id to the live element representing it, so repeated reads of the
//! same id update one object in place. Vertices and edges are keyed apart.
//!
//! Every method takes `&self`; the queue and the identity map sit behind
//! short-lived locks that are never held across a database call. Concurrent
//! `save`/`flush` calls on one session are not coordinated beyond that and
//! should be serialized by the caller.

pub mod transaction;

pub use transaction::{Transaction, TransactionState};

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{BoxStream, StreamExt};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::client::{GraphClient, RawEdge, RawProperty, RawResult, RawVertex, Traversal};
use crate::element::{Edge, EdgeRef, Element, ElementRef, Vertex, VertexRef};
use crate::error::{OgmError, OgmResult};
use crate::graph::{ElementRole, ImmutableMode, PropertyValue};
use crate::mapper::{self, PropertyTuple};
use crate::provider::Provider;
use crate::schema::{ElementSchema, MapperFunc, Registry};

/// A deserialized traversal result
#[derive(Debug, Clone)]
pub enum ResultItem {
    Value(PropertyValue),
    Vertex(VertexRef),
    Edge(EdgeRef),
    Property(RawProperty),
    List(Vec<ResultItem>),
    Map(IndexMap<String, ResultItem>),
}

impl ResultItem {
    pub fn as_vertex(&self) -> Option<&VertexRef> {
        match self {
            ResultItem::Vertex(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeRef> {
        match self {
            ResultItem::Edge(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&PropertyValue> {
        match self {
            ResultItem::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ResultItem]> {
        match self {
            ResultItem::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Wire name and wire value of a declared property, for hand-written
/// traversals: `traversal.has(name, value)`.
pub fn bind_prop(
    schema: &ElementSchema,
    ogm_name: &str,
    value: impl Into<PropertyValue>,
) -> OgmResult<(String, PropertyValue)> {
    let (db_name, data_type) = schema.mapping().ogm_property(ogm_name)?;
    Ok((db_name.to_string(), data_type.to_db(&value.into())))
}

pub struct Session {
    client: Arc<dyn GraphClient>,
    registry: Arc<Registry>,
    provider: Arc<dyn Provider>,
    pending: Mutex<VecDeque<ElementRef>>,
    current: Mutex<FxHashMap<IdentityKey, ElementRef>>,
}

/// Identity map key
type IdentityKey = (ElementRole, PropertyValue);

impl Session {
    pub fn new(
        client: Arc<dyn GraphClient>,
        registry: Arc<Registry>,
        provider: Arc<dyn Provider>,
    ) -> Self {
        Self {
            client,
            registry,
            provider,
            pending: Mutex::new(VecDeque::new()),
            current: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn client(&self) -> &Arc<dyn GraphClient> {
        &self.client
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ===== Identity map =====

    /// Live vertex or edge tracked under `id`
    pub fn current(&self, role: ElementRole, id: &PropertyValue) -> Option<ElementRef> {
        let key = self.key(role, id);
        self.current.lock().get(&key).cloned()
    }

    fn key(&self, role: ElementRole, id: &PropertyValue) -> IdentityKey {
        (role, self.provider.hashable_id(id))
    }

    pub fn current_len(&self) -> usize {
        self.current.lock().len()
    }

    fn register(&self, element: &ElementRef) {
        if let Some(id) = element.id() {
            let key = self.key(element.role(), &id);
            self.current.lock().insert(key, element.clone());
        }
    }

    fn evict(&self, role: ElementRole, id: &PropertyValue) {
        let key = self.key(role, id);
        let removed = self.current.lock().remove(&key);
        if removed.is_none() {
            warn!("Element {} does not belong to this session", id);
        }
    }

    fn evict_all(&self, discarded: &[ElementRef]) {
        if discarded.is_empty() {
            return;
        }
        self.current
            .lock()
            .retain(|_, live| !discarded.iter().any(|d| d.ptr_eq(live)));
    }

    // ===== Pending writes =====

    /// Queue elements for the next flush
    pub fn add<I>(&self, elements: I)
    where
        I: IntoIterator,
        I::Item: Into<ElementRef>,
    {
        let mut pending = self.pending.lock();
        pending.extend(elements.into_iter().map(Into::into));
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Write every pending element, oldest first.
    ///
    /// Each element gets its own transaction: locking elements are tagged
    /// before the write, then committed, or resolved through
    /// `conflict_check` when one is given. On failure the current
    /// transaction is rolled back and the error returned; elements still
    /// queued stay queued.
    pub async fn flush(&self, conflict_check: Option<&Traversal>) -> OgmResult<()> {
        loop {
            let Some(element) = self.pending.lock().pop_front() else {
                break;
            };
            let mut tx = Transaction::new();
            tx.enroll(&element);

            let outcome = async {
                self.save(&element).await?;
                match conflict_check {
                    None => tx.commit(self.client.as_ref()).await.map(|_| Vec::new()),
                    Some(check) => tx.resolve(self.client.as_ref(), check).await,
                }
            }
            .await;

            match outcome {
                Ok(discarded) => self.evict_all(&discarded),
                Err(e) => {
                    error!("Encountered error during flush; rolling back: {}", e);
                    let discarded = tx.rollback(self.client.as_ref()).await?;
                    self.evict_all(&discarded);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    // ===== Save =====

    /// Create or update a vertex or edge and track it in the identity map
    pub async fn save(&self, element: &ElementRef) -> OgmResult<ElementRef> {
        match element {
            ElementRef::Vertex(v) => self.save_vertex(v).await.map(ElementRef::Vertex),
            ElementRef::Edge(e) => self.save_edge(e).await.map(ElementRef::Edge),
            ElementRef::VertexProperty(_) => Err(OgmError::element(
                "Unknown element type: VertexProperty cannot be saved on its own",
            )),
        }
    }

    pub async fn save_vertex(&self, vertex: &VertexRef) -> OgmResult<VertexRef> {
        self.save_element(&ElementRef::Vertex(vertex.clone())).await?;
        Ok(vertex.clone())
    }

    pub async fn save_edge(&self, edge: &EdgeRef) -> OgmResult<EdgeRef> {
        let complete = {
            let e = edge.read();
            e.source().is_some() && e.target().is_some()
        };
        if !complete {
            return Err(OgmError::element(
                "Edges require both source and target vertices",
            ));
        }
        self.save_element(&ElementRef::Edge(edge.clone())).await?;
        Ok(edge.clone())
    }

    async fn save_element(&self, element: &ElementRef) -> OgmResult<()> {
        match element.id() {
            None => self.handle_create(element).await?,
            Some(id) => {
                let lookup = match element {
                    ElementRef::Edge(_) => Traversal::new().e(id.clone()),
                    _ => Traversal::new().v(id.clone()),
                };
                let exists = self.client.next(&lookup).await?.is_some();
                if !exists {
                    // The stale id goes before the database assigns a new one
                    self.current.lock().remove(&self.key(element.role(), &id));
                    element.clear_id();
                    self.handle_create(element).await?;
                } else {
                    let schema = element.schema();
                    if schema.immutable() != ImmutableMode::Off {
                        return Err(OgmError::Immutable(format!(
                            "Trying to update an immutable element: {}",
                            schema.name()
                        )));
                    }
                    self.update(element).await?;
                }
            }
        }
        self.register(element);
        Ok(())
    }

    /// Create, wrapping the write in its own transaction when the element
    /// uses locking and is not already part of one
    async fn handle_create(&self, element: &ElementRef) -> OgmResult<()> {
        if element.dirty().is_none() {
            let mut tx = Transaction::new();
            if tx.enroll(element) {
                return match self.create(element).await {
                    Ok(()) => tx.commit(self.client.as_ref()).await,
                    Err(e) => {
                        let discarded = tx.rollback(self.client.as_ref()).await?;
                        self.evict_all(&discarded);
                        Err(e)
                    }
                };
            }
        }
        self.create(element).await
    }

    async fn create(&self, element: &ElementRef) -> OgmResult<()> {
        match element {
            ElementRef::Vertex(v) => self.add_vertex(v).await,
            ElementRef::Edge(e) => self.add_edge(e).await,
            ElementRef::VertexProperty(_) => Err(OgmError::element(
                "VertexProperty cannot be created on its own",
            )),
        }
    }

    async fn add_vertex(&self, vertex: &VertexRef) -> OgmResult<()> {
        let (label, props) = {
            let v = vertex.read();
            (v.label().to_string(), mapper::map_props_to_db(&*v))
        };
        debug!("Creating vertex {}", label);
        let traversal = add_properties(Traversal::new().add_v(label), props);
        self.simple_traversal(&traversal, &ElementRef::Vertex(vertex.clone()))
            .await
    }

    async fn add_edge(&self, edge: &EdgeRef) -> OgmResult<()> {
        let (label, source, target, props) = {
            let e = edge.read();
            let endpoint = |v: Option<&VertexRef>| v.and_then(|v| v.read().id().cloned());
            (
                e.label().to_string(),
                endpoint(e.source()),
                endpoint(e.target()),
                mapper::map_props_to_db(&*e),
            )
        };
        let (Some(source), Some(target)) = (source, target) else {
            return Err(OgmError::element(
                "Edge source and target must be saved before the edge",
            ));
        };
        debug!("Creating edge {} from {} to {}", label, source, target);
        let traversal = Traversal::new()
            .v(source)
            .add_e(label)
            .to(Traversal::new().v(target));
        let traversal = add_properties(traversal, props);
        self.simple_traversal(&traversal, &ElementRef::Edge(edge.clone()))
            .await
    }

    /// Full overwrite: drop every stored property, then write the current set
    async fn update(&self, element: &ElementRef) -> OgmResult<()> {
        let (source, props) = match element {
            ElementRef::Vertex(v) => {
                let v = v.read();
                (source_of(v.id(), false)?, mapper::map_props_to_db(&*v))
            }
            ElementRef::Edge(e) => {
                let e = e.read();
                (source_of(e.id(), true)?, mapper::map_props_to_db(&*e))
            }
            ElementRef::VertexProperty(_) => {
                return Err(OgmError::element("VertexProperty cannot be updated on its own"))
            }
        };
        self.client
            .iterate(&source.clone().properties(Vec::<String>::new()).drop())
            .await?;
        self.simple_traversal(&add_properties(source, props), element)
            .await
    }

    /// Run a write and fold the element it returns back into `element`
    async fn simple_traversal(&self, traversal: &Traversal, element: &ElementRef) -> OgmResult<()> {
        let result = self
            .client
            .next(traversal)
            .await?
            .ok_or_else(|| OgmError::backend("write returned no element"))?;
        match (result, element) {
            (RawResult::Vertex(raw), ElementRef::Vertex(vertex)) => {
                let props = self.client.vertex_properties(&raw.id, &raw.label).await?;
                mapper::map_vertex_to_ogm(&raw, props, &mut vertex.write(), self.provider.as_ref())
            }
            (RawResult::Edge(raw), ElementRef::Edge(edge)) => {
                let props = self.fetch_edge_properties(&raw).await?;
                mapper::map_edge_to_ogm(&raw, props, &mut edge.write())
            }
            (other, _) => Err(OgmError::backend(format!(
                "write returned an unexpected result: {:?}",
                other
            ))),
        }
    }

    async fn fetch_edge_properties(&self, raw: &RawEdge) -> OgmResult<crate::client::EdgeValueMap> {
        self.client
            .edge_properties(&raw.id)
            .await?
            .ok_or_else(|| OgmError::backend(format!("edge {} not found", raw.id)))
    }

    // ===== Remove / get =====

    pub async fn remove_vertex(&self, vertex: &VertexRef) -> OgmResult<()> {
        let id = source_id(vertex.read().id())?;
        self.client
            .iterate(&Traversal::new().v(id.clone()).drop())
            .await?;
        self.evict(ElementRole::Vertex, &id);
        Ok(())
    }

    pub async fn remove_edge(&self, edge: &EdgeRef) -> OgmResult<()> {
        let id = source_id(edge.read().id())?;
        self.client
            .iterate(&Traversal::new().e(id.clone()).drop())
            .await?;
        self.evict(ElementRole::Edge, &id);
        Ok(())
    }

    /// Raw lookup by id, bypassing the identity map
    pub async fn get_vertex(&self, vertex: &VertexRef) -> OgmResult<Option<RawVertex>> {
        let id = source_id(vertex.read().id())?;
        match self.client.next(&Traversal::new().v(id)).await? {
            Some(RawResult::Vertex(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    /// Raw lookup by id, bypassing the identity map
    pub async fn get_edge(&self, edge: &EdgeRef) -> OgmResult<Option<RawEdge>> {
        let id = source_id(edge.read().id())?;
        match self.client.next(&Traversal::new().e(id)).await? {
            Some(RawResult::Edge(e)) => Ok(Some(e)),
            _ => Ok(None),
        }
    }

    // ===== Queries =====

    /// Empty traversal, or `V().hasLabel(..)` / `E().hasLabel(..)` for a schema
    pub fn traversal(&self, schema: Option<&ElementSchema>) -> Traversal {
        match schema {
            None => Traversal::new(),
            Some(schema) if schema.is_edge() => Traversal::new().e_all().has_label(schema.label()),
            Some(schema) => Traversal::new().v_all().has_label(schema.label()),
        }
    }

    /// Flush, then stream the results of `traversal` through the identity
    /// map. The stream ends after the first error.
    pub async fn submit(
        &self,
        traversal: &Traversal,
    ) -> OgmResult<BoxStream<'_, OgmResult<ResultItem>>> {
        self.flush(None).await?;
        let raw = self.client.submit(traversal).await?;
        let stream = raw
            .then(move |item| async move {
                match item {
                    Ok(result) => self.deserialize_result(result).await,
                    Err(e) => Err(e),
                }
            })
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            });
        Ok(stream.boxed())
    }

    pub async fn next(&self, traversal: &Traversal) -> OgmResult<Option<ResultItem>> {
        let mut stream = self.submit(traversal).await?;
        stream.next().await.transpose()
    }

    pub async fn to_list(&self, traversal: &Traversal) -> OgmResult<Vec<ResultItem>> {
        let mut stream = self.submit(traversal).await?;
        let mut items = Vec::new();
        while let Some(item) = stream.next().await {
            items.push(item?);
        }
        Ok(items)
    }

    fn deserialize_result(&self, result: RawResult) -> BoxFuture<'_, OgmResult<ResultItem>> {
        async move {
            match result {
                RawResult::Value(v) => Ok(ResultItem::Value(v)),
                RawResult::Property(p) => Ok(ResultItem::Property(p)),
                RawResult::Vertex(raw) => self.resolve_vertex(raw).await.map(ResultItem::Vertex),
                RawResult::Edge(raw) => self.resolve_edge(raw).await.map(ResultItem::Edge),
                RawResult::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        out.push(self.deserialize_result(item).await?);
                    }
                    Ok(ResultItem::List(out))
                }
                RawResult::Map(entries) => {
                    let mut out = IndexMap::with_capacity(entries.len());
                    for (key, item) in entries {
                        out.insert(key, self.deserialize_result(item).await?);
                    }
                    Ok(ResultItem::Map(out))
                }
            }
        }
        .boxed()
    }

    /// Live vertex for `raw`, refreshed from its full property map
    async fn resolve_vertex(&self, raw: RawVertex) -> OgmResult<VertexRef> {
        let key = self.key(ElementRole::Vertex, &raw.id);
        let live = self
            .current
            .lock()
            .get(&key)
            .and_then(|e| e.as_vertex().cloned());
        let vertex = match live {
            Some(v) => v,
            None => {
                let schema = self.registry.vertex(&raw.label);
                ensure_mapper(&schema, MapperFunc::Vertex)?;
                Vertex::new(&schema)?.into_ref()
            }
        };
        let props = self.client.vertex_properties(&raw.id, &raw.label).await?;
        mapper::map_vertex_to_ogm(&raw, props, &mut vertex.write(), self.provider.as_ref())?;
        self.current.lock().insert(key, ElementRef::Vertex(vertex.clone()));
        Ok(vertex)
    }

    /// Live edge for `raw`, refreshed from its value map
    async fn resolve_edge(&self, raw: RawEdge) -> OgmResult<EdgeRef> {
        let key = self.key(ElementRole::Edge, &raw.id);
        let live = self
            .current
            .lock()
            .get(&key)
            .and_then(|e| e.as_edge().cloned());
        let edge = match live {
            Some(e) => e,
            None => {
                let schema = self.registry.edge(&raw.label);
                ensure_mapper(&schema, MapperFunc::Edge)?;
                Edge::new(&schema)?.into_ref()
            }
        };
        let props = self.fetch_edge_properties(&raw).await?;
        mapper::map_edge_to_ogm(&raw, props, &mut edge.write())?;
        self.current.lock().insert(key, ElementRef::Edge(edge.clone()));
        Ok(edge)
    }
}

fn ensure_mapper(schema: &ElementSchema, expected: MapperFunc) -> OgmResult<()> {
    if schema.mapping().mapper_func() != expected {
        return Err(OgmError::mapping(format!(
            "{} cannot be built from a {:?} record",
            schema.name(),
            expected
        )));
    }
    Ok(())
}

fn source_id(id: Option<&PropertyValue>) -> OgmResult<PropertyValue> {
    id.cloned()
        .ok_or_else(|| OgmError::element("Element has no id; save it first"))
}

fn source_of(id: Option<&PropertyValue>, edge: bool) -> OgmResult<Traversal> {
    let id = source_id(id)?;
    Ok(if edge {
        Traversal::new().e(id)
    } else {
        Traversal::new().v(id)
    })
}

/// Append a property step per non-null tuple; null metaproperties are dropped
fn add_properties(traversal: Traversal, props: Vec<PropertyTuple>) -> Traversal {
    props.into_iter().fold(traversal, |traversal, prop| {
        if prop.value.is_null() {
            return traversal;
        }
        let meta = prop
            .metaprops
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .collect();
        traversal.property_with(prop.cardinality, prop.db_name, prop.value, meta)
    })
}
