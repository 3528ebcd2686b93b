//! Seam between the proxy and the upstream orchestrator.
//!
//! The cache and the query tools only depend on [`TopologyFetch`], so tests
//! and alternate transports can stand in for the real HTTP client.

use crate::error::Result;
use crate::fabric::{Record, ResourceKind};
use crate::query::FilterExpr;
use async_trait::async_trait;

/// Parameters for one page of an upstream topology fetch.
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    /// Bearer token; `None` selects the public data path upstream.
    pub credential: Option<String>,
    /// Optional predicate applied upstream (or client-side by the adapter).
    pub filters: Option<FilterExpr>,
    pub limit: usize,
    pub offset: usize,
}

impl PageQuery {
    #[must_use]
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            credential: None,
            filters: None,
            limit,
            offset,
        }
    }

    #[must_use]
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Option<FilterExpr>) -> Self {
        self.filters = filters;
        self
    }
}

/// Paged retrieval of the four advertised topology collections.
///
/// An empty or short page signals end-of-data.
#[async_trait]
pub trait TopologyFetch: Send + Sync {
    /// Fetch one page of records for a resource kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream request fails; callers decide whether
    /// that is fatal (live tool path) or discardable (background refresh).
    async fn fetch_page(&self, kind: ResourceKind, query: &PageQuery) -> Result<Vec<Record>>;
}
