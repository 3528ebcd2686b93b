//! Operational actions (POA) on slivers: reboot, cpu/numa inspection and
//! pinning, key management, device rescan.

use crate::error::{Error, Result};
use crate::fabric::client::{ClientFactory, PoaRequest, PoaStatusQuery};
use crate::fabric::Record;

/// Default page size for POA status listings.
pub const DEFAULT_POA_LIMIT: usize = 20;

pub struct ActionTools {
    clients: ClientFactory,
}

impl ActionTools {
    #[must_use]
    pub fn new(clients: ClientFactory) -> Self {
        Self { clients }
    }

    /// Issue an operational action against a sliver.
    ///
    /// # Errors
    ///
    /// Fails on an empty sliver id or operation, or on upstream failure.
    pub async fn poa_create(&self, token: &str, request: &PoaRequest) -> Result<Vec<Record>> {
        if request.sliver_id.is_empty() {
            return Err(Error::Custom("sliver_id is required".to_string()));
        }
        if request.operation.is_empty() {
            return Err(Error::Custom("operation is required".to_string()));
        }
        (self.clients)()?.poa_create(token, request).await
    }

    /// Fetch POA statuses by sliver id or POA id.
    ///
    /// # Errors
    ///
    /// Fails when neither id is given, or on upstream failure.
    pub async fn poa_get(&self, token: &str, query: &PoaStatusQuery) -> Result<Vec<Record>> {
        if query.sliver_id.is_none() && query.poa_id.is_none() {
            return Err(Error::Custom(
                "sliver_id or poa_id is required".to_string(),
            ));
        }
        let mut query = query.clone();
        if query.limit == 0 {
            query.limit = DEFAULT_POA_LIMIT;
        }
        (self.clients)()?.poa_get(token, &query).await
    }

    /// Convenience wrapper for the reboot action.
    ///
    /// # Errors
    ///
    /// See [`Self::poa_create`].
    pub async fn os_reboot(&self, token: &str, sliver_id: &str) -> Result<Vec<Record>> {
        self.poa_create(
            token,
            &PoaRequest {
                sliver_id: sliver_id.to_string(),
                operation: "reboot".to_string(),
                vcpu_cpu_map: None,
                node_set: None,
                keys: None,
                bdf: None,
            },
        )
        .await
    }
}
