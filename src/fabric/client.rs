//! HTTP client for the orchestrator and core API.
//!
//! A fresh client is constructed per refresh and per tool call (handles are
//! never reused across refreshes), so factories are passed around instead of
//! client instances.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::fabric::fetch::{PageQuery, TopologyFetch};
use crate::fabric::{Record, ResourceKind};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Produces a fresh upstream client per use; decouples the cache and tools
/// from authentication and transport wiring.
pub type ClientFactory = Arc<dyn Fn() -> Result<Arc<dyn FabricApi>> + Send + Sync>;

/// Slice and operational-action surface of the orchestrator, consumed by the
/// tool layer. Topology paging lives on [`TopologyFetch`].
#[async_trait]
pub trait FabricApi: TopologyFetch {
    async fn list_slices(&self, token: &str, query: &ListSlicesQuery) -> Result<Vec<Record>>;
    async fn get_slice(&self, token: &str, slice_id: &str, as_self: bool) -> Result<Record>;
    async fn list_slivers(&self, token: &str, slice_id: &str, as_self: bool)
        -> Result<Vec<Record>>;
    async fn create_slice(&self, token: &str, request: &CreateSliceRequest)
        -> Result<Vec<Record>>;
    async fn modify_slice(
        &self,
        token: &str,
        slice_id: &str,
        graph_model: &str,
    ) -> Result<Vec<Record>>;
    async fn accept_modify(&self, token: &str, slice_id: &str) -> Result<Record>;
    async fn renew_slice(&self, token: &str, slice_id: &str, lease_end_time: &str) -> Result<()>;
    async fn delete_slice(&self, token: &str, slice_id: Option<&str>) -> Result<()>;
    async fn poa_create(&self, token: &str, request: &PoaRequest) -> Result<Vec<Record>>;
    async fn poa_get(&self, token: &str, query: &PoaStatusQuery) -> Result<Vec<Record>>;
    async fn get_projects(&self, token: &str, query: &ProjectsQuery) -> Result<Vec<Record>>;
    async fn get_project(&self, token: &str, project_uuid: &str) -> Result<Record>;
    async fn get_user_keys(&self, token: &str, person_uuid: &str) -> Result<Vec<Record>>;
}

#[derive(Debug, Clone, Default)]
pub struct ListSlicesQuery {
    pub name: Option<String>,
    pub states: Option<Vec<String>>,
    pub as_self: bool,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSliceRequest {
    pub name: String,
    pub graph_model: String,
    pub ssh_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_end_time: Option<String>,
}

/// Operational action on a sliver (reboot, cpuinfo, addkey, ...).
#[derive(Debug, Clone, Serialize)]
pub struct PoaRequest {
    pub sliver_id: String,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcpu_cpu_map: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_set: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bdf: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct PoaStatusQuery {
    pub sliver_id: Option<String>,
    pub poa_id: Option<String>,
    pub states: Option<Vec<String>>,
    pub limit: usize,
    pub offset: usize,
}

/// Core API project lookup. `project_id` takes precedence over the
/// name/person filters when set.
#[derive(Debug, Clone, Default)]
pub struct ProjectsQuery {
    pub name: Option<String>,
    pub project_id: Option<String>,
    pub person_uuid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FabricApiClient {
    http: reqwest::Client,
    orchestrator_base: String,
    core_api_base: String,
}

impl FabricApiClient {
    /// Build a client from server configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("fabric-proxy/", env!("CARGO_PKG_VERSION")))
            .connection_verbose(config.http_debug)
            .build()?;
        Ok(Self {
            http,
            orchestrator_base: format!("https://{}", config.orchestrator_host),
            core_api_base: format!("https://{}", config.core_api_host),
        })
    }

    fn with_auth(req: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
        match token {
            Some(t) => req.bearer_auth(t),
            None => req,
        }
    }

    async fn get_records(
        &self,
        url: String,
        token: Option<&str>,
        params: &[(&str, String)],
    ) -> Result<Vec<Record>> {
        let resp = Self::with_auth(self.http.get(&url), token)
            .query(params)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        Ok(unwrap_records(body))
    }

    async fn post_records(
        &self,
        url: String,
        token: &str,
        params: &[(&str, String)],
        body: &impl Serialize,
    ) -> Result<Vec<Record>> {
        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .query(params)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        let body: Value = resp.json().await?;
        Ok(unwrap_records(body))
    }
}

#[async_trait]
impl TopologyFetch for FabricApiClient {
    async fn fetch_page(&self, kind: ResourceKind, query: &PageQuery) -> Result<Vec<Record>> {
        let url = format!("{}/topology/{}", self.orchestrator_base, kind.api_path());
        debug!(%kind, limit = query.limit, offset = query.offset, "fetching topology page");

        let params = [
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        let records = self
            .get_records(url, query.credential.as_deref(), &params)
            .await?;

        // The orchestrator has no predicate language; filters run client-side.
        let Some(filters) = &query.filters else {
            return Ok(records);
        };
        Ok(records.into_iter().filter(|r| filters.matches(r)).collect())
    }
}

#[async_trait]
impl FabricApi for FabricApiClient {
    async fn list_slices(&self, token: &str, query: &ListSlicesQuery) -> Result<Vec<Record>> {
        let url = format!("{}/slices", self.orchestrator_base);
        let mut params = vec![
            ("as_self", query.as_self.to_string()),
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(name) = &query.name {
            params.push(("name", name.clone()));
        }
        if let Some(states) = &query.states {
            for state in states {
                params.push(("states", state.clone()));
            }
        }
        self.get_records(url, Some(token), &params).await
    }

    async fn get_slice(&self, token: &str, slice_id: &str, as_self: bool) -> Result<Record> {
        let url = format!("{}/slices/{slice_id}", self.orchestrator_base);
        let params = [
            ("as_self", as_self.to_string()),
            ("graph_format", "GRAPHML".to_string()),
        ];
        let mut records = self.get_records(url, Some(token), &params).await?;
        if records.is_empty() {
            return Err(Error::Upstream(format!("slice {slice_id} not found")));
        }
        Ok(records.remove(0))
    }

    async fn list_slivers(
        &self,
        token: &str,
        slice_id: &str,
        as_self: bool,
    ) -> Result<Vec<Record>> {
        let url = format!("{}/slivers", self.orchestrator_base);
        let params = [
            ("slice_id", slice_id.to_string()),
            ("as_self", as_self.to_string()),
        ];
        self.get_records(url, Some(token), &params).await
    }

    async fn create_slice(
        &self,
        token: &str,
        request: &CreateSliceRequest,
    ) -> Result<Vec<Record>> {
        let url = format!("{}/slices/create", self.orchestrator_base);
        let params = [("name", request.name.clone())];
        self.post_records(url, token, &params, request).await
    }

    async fn modify_slice(
        &self,
        token: &str,
        slice_id: &str,
        graph_model: &str,
    ) -> Result<Vec<Record>> {
        let url = format!("{}/slices/modify/{slice_id}", self.orchestrator_base);
        self.post_records(url, token, &[], &graph_model).await
    }

    async fn accept_modify(&self, token: &str, slice_id: &str) -> Result<Record> {
        let url = format!("{}/slices/modify/{slice_id}/accept", self.orchestrator_base);
        let mut records = self.post_records(url, token, &[], &Value::Null).await?;
        if records.is_empty() {
            return Err(Error::Upstream(format!(
                "no accepted model returned for slice {slice_id}"
            )));
        }
        Ok(records.remove(0))
    }

    async fn renew_slice(&self, token: &str, slice_id: &str, lease_end_time: &str) -> Result<()> {
        let url = format!("{}/slices/renew/{slice_id}", self.orchestrator_base);
        self.http
            .post(&url)
            .bearer_auth(token)
            .query(&[("lease_end_time", lease_end_time)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn delete_slice(&self, token: &str, slice_id: Option<&str>) -> Result<()> {
        let url = match slice_id {
            Some(id) => format!("{}/slices/delete/{id}", self.orchestrator_base),
            None => format!("{}/slices/delete", self.orchestrator_base),
        };
        self.http
            .delete(&url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn poa_create(&self, token: &str, request: &PoaRequest) -> Result<Vec<Record>> {
        let url = format!("{}/poas/create/{}", self.orchestrator_base, request.sliver_id);
        self.post_records(url, token, &[], request).await
    }

    async fn poa_get(&self, token: &str, query: &PoaStatusQuery) -> Result<Vec<Record>> {
        let url = format!("{}/poas", self.orchestrator_base);
        let mut params = vec![
            ("limit", query.limit.to_string()),
            ("offset", query.offset.to_string()),
        ];
        if let Some(sliver_id) = &query.sliver_id {
            params.push(("sliver_id", sliver_id.clone()));
        }
        if let Some(poa_id) = &query.poa_id {
            params.push(("poa_id", poa_id.clone()));
        }
        if let Some(states) = &query.states {
            for state in states {
                params.push(("states", state.clone()));
            }
        }
        self.get_records(url, Some(token), &params).await
    }

    async fn get_projects(&self, token: &str, query: &ProjectsQuery) -> Result<Vec<Record>> {
        if let Some(project_id) = &query.project_id {
            let url = format!("{}/projects/{project_id}", self.core_api_base);
            return self.get_records(url, Some(token), &[]).await;
        }
        let url = format!("{}/projects", self.core_api_base);
        let mut params = Vec::new();
        if let Some(name) = &query.name {
            params.push(("search", name.clone()));
        }
        if let Some(person_uuid) = &query.person_uuid {
            params.push(("person_uuid", person_uuid.clone()));
        }
        self.get_records(url, Some(token), &params).await
    }

    async fn get_project(&self, token: &str, project_uuid: &str) -> Result<Record> {
        let url = format!("{}/projects/{project_uuid}", self.core_api_base);
        let mut records = self.get_records(url, Some(token), &[]).await?;
        if records.is_empty() {
            return Err(Error::Upstream(format!("project {project_uuid} not found")));
        }
        Ok(records.remove(0))
    }

    async fn get_user_keys(&self, token: &str, person_uuid: &str) -> Result<Vec<Record>> {
        let url = format!("{}/sshkeys", self.core_api_base);
        let params = [("person_uuid", person_uuid.to_string())];
        self.get_records(url, Some(token), &params).await
    }
}

/// Responses come back as a bare array or wrapped in a `data` (orchestrator)
/// or `results` (Core API) envelope.
fn unwrap_records(body: Value) -> Vec<Record> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data").or_else(|| map.remove("results")) {
            Some(Value::Array(items)) => items,
            _ => vec![Value::Object(map)],
        },
        _ => vec![],
    };
    items
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}
