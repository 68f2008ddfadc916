use serde::Serialize;

/// Health of both cache tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub distributed_healthy: bool,
    pub local_healthy: bool,
    /// True when at least one tier can serve reads
    pub overall_healthy: bool,
}

impl HealthReport {
    pub fn new(distributed_healthy: bool, local_healthy: bool) -> Self {
        Self {
            distributed_healthy,
            local_healthy,
            overall_healthy: distributed_healthy || local_healthy,
        }
    }
}
