pub mod cache;
pub mod client;
pub mod fetch;

pub use client::{ClientFactory, FabricApiClient};
pub use fetch::{PageQuery, TopologyFetch};

/// Opaque upstream resource record. The proxy never interprets record contents;
/// it only filters, sorts, and paginates them.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The four advertised topology collections served by the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Sites,
    Hosts,
    FacilityPorts,
    Links,
}

impl ResourceKind {
    pub const ALL: [Self; 4] = [Self::Sites, Self::Hosts, Self::FacilityPorts, Self::Links];

    /// Path segment used by the orchestrator REST API.
    #[must_use]
    pub const fn api_path(self) -> &'static str {
        match self {
            Self::Sites => "sites",
            Self::Hosts => "hosts",
            Self::FacilityPorts => "facility_ports",
            Self::Links => "links",
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::fmt::Result {
        fmt.write_str(self.api_path())
    }
}
