//! Immutable bundle of the four cached topology collections.

use crate::fabric::{Record, ResourceKind};
use chrono::{DateTime, Utc};

/// One complete capture of the advertised topology. Never mutated after
/// construction; every refresh publishes a brand-new snapshot.
#[derive(Debug, Clone, Default)]
pub struct ResourceSnapshot {
    /// Capture time; `UNIX_EPOCH` marks the never-refreshed sentinel.
    pub captured_at: DateTime<Utc>,
    pub sites: Vec<Record>,
    pub hosts: Vec<Record>,
    pub facility_ports: Vec<Record>,
    pub links: Vec<Record>,
}

impl ResourceSnapshot {
    /// The empty pre-refresh snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            captured_at: DateTime::UNIX_EPOCH,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn new(
        sites: Vec<Record>,
        hosts: Vec<Record>,
        facility_ports: Vec<Record>,
        links: Vec<Record>,
    ) -> Self {
        Self {
            captured_at: Utc::now(),
            sites,
            hosts,
            facility_ports,
            links,
        }
    }

    #[must_use]
    pub fn collection(&self, kind: ResourceKind) -> &[Record] {
        match kind {
            ResourceKind::Sites => &self.sites,
            ResourceKind::Hosts => &self.hosts,
            ResourceKind::FacilityPorts => &self.facility_ports,
            ResourceKind::Links => &self.links,
        }
    }

    /// True iff any collection is non-empty.
    ///
    /// Note this conflates "never refreshed" with "refreshed to empty"; use
    /// [`Self::is_captured`] to tell them apart.
    #[must_use]
    pub fn has_data(&self) -> bool {
        ResourceKind::ALL.iter().any(|k| !self.collection(*k).is_empty())
    }

    /// True iff at least one refresh has completed, even if it found nothing.
    #[must_use]
    pub fn is_captured(&self) -> bool {
        self.captured_at > DateTime::UNIX_EPOCH
    }
}
