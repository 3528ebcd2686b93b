//! Slice listing and lifecycle tools.
//!
//! Pass-throughs to the orchestrator; all of these require the caller's
//! credential. Listing drains pages upstream and keys the result map by slice
//! name, disambiguating duplicates with a slice-id prefix.

use crate::error::{Error, Result};
use crate::fabric::client::{ClientFactory, CreateSliceRequest, ListSlicesQuery};
use crate::fabric::Record;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct SliceQuery {
    pub slice_id: Option<String>,
    pub slice_name: Option<String>,
    pub slice_state: Option<Vec<String>>,
    pub exclude_slice_state: Option<Vec<String>>,
    pub as_self: bool,
    pub limit: usize,
    pub offset: usize,
    /// When true, keep paging until the upstream returns a short page.
    pub fetch_all: bool,
}

impl Default for SliceQuery {
    fn default() -> Self {
        Self {
            slice_id: None,
            slice_name: None,
            slice_state: None,
            exclude_slice_state: None,
            as_self: true,
            limit: 200,
            offset: 0,
            fetch_all: true,
        }
    }
}

pub struct SliceTools {
    clients: ClientFactory,
}

impl SliceTools {
    #[must_use]
    pub fn new(clients: ClientFactory) -> Self {
        Self { clients }
    }

    /// List slices (or look one up by id), keyed by slice name.
    ///
    /// # Errors
    ///
    /// Propagates upstream failures.
    pub async fn query_slices(&self, token: &str, query: &SliceQuery) -> Result<Record> {
        let client = (self.clients)()?;

        if let Some(slice_id) = &query.slice_id {
            let item = client.get_slice(token, slice_id, query.as_self).await?;
            let key = record_key(&item);
            let mut out = Record::new();
            out.insert(key, Value::Object(item));
            return Ok(out);
        }

        let mut results: Vec<Record> = Vec::new();
        let mut cur_offset = query.offset;
        loop {
            let page = client
                .list_slices(
                    token,
                    &ListSlicesQuery {
                        name: query.slice_name.clone(),
                        states: query.slice_state.clone(),
                        as_self: query.as_self,
                        limit: query.limit,
                        offset: cur_offset,
                    },
                )
                .await?;
            if page.is_empty() {
                break;
            }
            let page_len = page.len();
            results.extend(page.into_iter().filter(|s| !is_excluded(s, query)));
            if !query.fetch_all || page_len < query.limit {
                break;
            }
            cur_offset += query.limit;
        }

        let mut out = Record::new();
        for slice in results {
            let mut key = record_key(&slice);
            if out.contains_key(&key) {
                if let Some(id) = slice.get("slice_id").and_then(Value::as_str) {
                    // Byte index 8 may not be a char boundary; fall back to
                    // the whole id rather than slicing blind.
                    key = format!("{key}-{}", id.get(..8).unwrap_or(id));
                }
            }
            out.insert(key, Value::Object(slice));
        }
        Ok(out)
    }

    /// # Errors
    ///
    /// Propagates upstream failures.
    pub async fn get_slivers(
        &self,
        token: &str,
        slice_id: &str,
        as_self: bool,
    ) -> Result<Vec<Record>> {
        (self.clients)()?.list_slivers(token, slice_id, as_self).await
    }

    /// # Errors
    ///
    /// Propagates upstream failures.
    pub async fn create_slice(
        &self,
        token: &str,
        request: &CreateSliceRequest,
    ) -> Result<Vec<Record>> {
        (self.clients)()?.create_slice(token, request).await
    }

    /// # Errors
    ///
    /// Propagates upstream failures.
    pub async fn modify_slice(
        &self,
        token: &str,
        slice_id: &str,
        graph_model: &str,
    ) -> Result<Vec<Record>> {
        (self.clients)()?.modify_slice(token, slice_id, graph_model).await
    }

    /// # Errors
    ///
    /// Propagates upstream failures.
    pub async fn accept_modify(&self, token: &str, slice_id: &str) -> Result<Record> {
        (self.clients)()?.accept_modify(token, slice_id).await
    }

    /// Extend a slice's lease. `lease_end_time` format:
    /// `"YYYY-MM-DD HH:MM:SS +0000"`.
    ///
    /// # Errors
    ///
    /// Propagates upstream failures.
    pub async fn renew_slice(
        &self,
        token: &str,
        slice_id: &str,
        lease_end_time: &str,
    ) -> Result<Record> {
        if slice_id.is_empty() {
            return Err(Error::Custom("slice_id is required".to_string()));
        }
        (self.clients)()?.renew_slice(token, slice_id, lease_end_time).await?;
        Ok(status_record(&[
            ("status", "ok"),
            ("slice_id", slice_id),
            ("lease_end_time", lease_end_time),
        ]))
    }

    /// Delete one slice, or all of the caller's slices when `slice_id` is
    /// omitted.
    ///
    /// # Errors
    ///
    /// Propagates upstream failures.
    pub async fn delete_slice(&self, token: &str, slice_id: Option<&str>) -> Result<Record> {
        (self.clients)()?.delete_slice(token, slice_id).await?;
        Ok(status_record(&[
            ("status", "ok"),
            ("slice_id", slice_id.unwrap_or("all")),
        ]))
    }
}

fn record_key(record: &Record) -> String {
    record
        .get("name")
        .and_then(Value::as_str)
        .or_else(|| record.get("slice_id").and_then(Value::as_str))
        .unwrap_or("slice")
        .to_string()
}

fn is_excluded(slice: &Record, query: &SliceQuery) -> bool {
    let Some(excluded) = &query.exclude_slice_state else {
        return false;
    };
    slice
        .get("state")
        .and_then(Value::as_str)
        .is_some_and(|state| excluded.iter().any(|e| e == state))
}

fn status_record(fields: &[(&str, &str)]) -> Record {
    fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
        .collect()
}
