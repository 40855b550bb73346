//! Submission interface to the graph database
//!
//! `GraphClient` is the seam between the mapping layer and whatever
//! executes traversals. Transport, connection pooling, retries and
//! response timeouts all live below it.
//!
//! Implemented by:
//! - `EmbeddedClient`: in-process property graph (tests, embedded use)

pub mod embedded;
pub mod records;
pub mod traversal;

pub use embedded::EmbeddedClient;
pub use records::{
    EdgeValueMap, MetaPropertyRecord, RawEdge, RawProperty, RawPropertyValue, RawResult,
    RawVertex, VertexPropertyMap,
};
pub use traversal::{Step, Traversal};

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use crate::error::OgmResult;
use crate::graph::PropertyValue;

/// Lazily produced, forward-only stream of traversal results.
/// An error item ends the stream.
pub type ResultStream = BoxStream<'static, OgmResult<RawResult>>;

#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Submit a traversal
    async fn submit(&self, traversal: &Traversal) -> OgmResult<ResultStream>;

    /// Every property of a vertex with ids and metaproperties, grouped by key
    async fn vertex_properties(
        &self,
        id: &PropertyValue,
        label: &str,
    ) -> OgmResult<VertexPropertyMap>;

    /// Every property of an edge, `None` when the edge does not exist
    async fn edge_properties(&self, id: &PropertyValue) -> OgmResult<Option<EdgeValueMap>>;

    /// First result of a traversal
    async fn next(&self, traversal: &Traversal) -> OgmResult<Option<RawResult>> {
        let mut stream = self.submit(traversal).await?;
        stream.next().await.transpose()
    }

    /// Run a traversal for its side effects
    async fn iterate(&self, traversal: &Traversal) -> OgmResult<()> {
        let mut stream = self.submit(traversal).await?;
        while let Some(item) = stream.next().await {
            item?;
        }
        Ok(())
    }

    async fn to_list(&self, traversal: &Traversal) -> OgmResult<Vec<RawResult>> {
        let mut stream = self.submit(traversal).await?;
        let mut results = Vec::new();
        while let Some(item) = stream.next().await {
            results.push(item?);
        }
        Ok(results)
    }
}
