//! Topology query tools: sites, hosts, facility ports, links.
//!
//! Each query is served from the resource cache when the relevant collection
//! holds data; otherwise the tool falls back to a live fetch with the
//! caller's credential. Filtering uses the same predicate semantics on both
//! paths, then sorting and pagination are applied locally.

use crate::error::Result;
use crate::fabric::cache::ResourceCache;
use crate::fabric::fetch::{PageQuery, TopologyFetch};
use crate::fabric::{Record, ResourceKind};
use crate::query::{apply_sort, paginate, FilterExpr, SortSpec};
use std::sync::Arc;
use tracing::debug;

/// Default page size when the caller does not specify a limit.
pub const DEFAULT_QUERY_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct QueryParams {
    pub filters: Option<FilterExpr>,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            filters: None,
            sort: None,
            limit: Some(DEFAULT_QUERY_LIMIT),
            offset: 0,
        }
    }
}

type FetchFactory = Arc<dyn Fn() -> Result<Arc<dyn TopologyFetch>> + Send + Sync>;

pub struct TopologyTools {
    cache: Arc<ResourceCache>,
    clients: FetchFactory,
    /// Live-path fetch ceiling when an explicit sort is requested: sorting a
    /// remote result is only meaningful over a materialized bounded superset.
    max_fetch_for_sort: usize,
}

impl TopologyTools {
    pub fn new<F>(cache: Arc<ResourceCache>, clients: F, max_fetch_for_sort: usize) -> Self
    where
        F: Fn() -> Result<Arc<dyn TopologyFetch>> + Send + Sync + 'static,
    {
        Self {
            cache,
            clients: Arc::new(clients),
            max_fetch_for_sort,
        }
    }

    /// Query one topology collection.
    ///
    /// # Errors
    ///
    /// Fails on a cache miss when no credential is supplied or the live fetch
    /// fails; cache hits never error.
    pub async fn query(
        &self,
        kind: ResourceKind,
        params: &QueryParams,
        credential: Option<&str>,
    ) -> Result<Vec<Record>> {
        // Let the cache learn the credential for future refreshes.
        self.cache.note_credential(credential).await;

        let snapshot = self.cache.snapshot().await;
        let collection = snapshot.collection(kind);

        let mut items = if collection.is_empty() {
            debug!(%kind, "cache miss, falling back to live fetch");
            let token = crate::auth::require_token(credential.map(str::to_string))?;
            let fetch_limit = if params.sort.is_some() {
                self.max_fetch_for_sort
            } else {
                params.limit.unwrap_or(DEFAULT_QUERY_LIMIT)
            };
            let query = PageQuery::page(fetch_limit, 0)
                .with_credential(Some(token))
                .with_filters(params.filters.clone());
            (self.clients)()?.fetch_page(kind, &query).await?
        } else {
            match &params.filters {
                Some(filters) => collection.iter().filter(|r| filters.matches(r)).cloned().collect(),
                None => collection.to_vec(),
            }
        };

        apply_sort(&mut items, params.sort.as_ref());
        Ok(paginate(items, params.limit, params.offset))
    }

    /// # Errors
    ///
    /// See [`Self::query`].
    pub async fn query_sites(
        &self,
        params: &QueryParams,
        credential: Option<&str>,
    ) -> Result<Vec<Record>> {
        self.query(ResourceKind::Sites, params, credential).await
    }

    /// # Errors
    ///
    /// See [`Self::query`].
    pub async fn query_hosts(
        &self,
        params: &QueryParams,
        credential: Option<&str>,
    ) -> Result<Vec<Record>> {
        self.query(ResourceKind::Hosts, params, credential).await
    }

    /// # Errors
    ///
    /// See [`Self::query`].
    pub async fn query_facility_ports(
        &self,
        params: &QueryParams,
        credential: Option<&str>,
    ) -> Result<Vec<Record>> {
        self.query(ResourceKind::FacilityPorts, params, credential)
            .await
    }

    /// # Errors
    ///
    /// See [`Self::query`].
    pub async fn query_links(
        &self,
        params: &QueryParams,
        credential: Option<&str>,
    ) -> Result<Vec<Record>> {
        self.query(ResourceKind::Links, params, credential).await
    }
}
