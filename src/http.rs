//! HTTP adapter for the planning backend: fetches snapshots and posts
//! finalized plans.

use tracing::debug;

use crate::error::SnapshotError;
use crate::finalize::WavePlan;
use crate::snapshot::PlanningSnapshot;
use crate::traits::{PlanSink, SnapshotSource};

#[derive(Debug, Clone)]
pub struct HttpPlanningConfig {
    pub base_url: String,
    pub tenant: String,
    pub timeout_secs: u64,
}

impl Default for HttpPlanningConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            tenant: "default".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpPlanningClient {
    config: HttpPlanningConfig,
    client: reqwest::blocking::Client,
}

impl HttpPlanningClient {
    pub fn new(config: HttpPlanningConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn tenant_url(&self, resource: &str) -> String {
        format!(
            "{}/tenants/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.tenant,
            resource
        )
    }

    pub fn snapshot_url(&self) -> String {
        self.tenant_url("snapshot")
    }

    pub fn plans_url(&self) -> String {
        self.tenant_url("plans")
    }
}

impl SnapshotSource for HttpPlanningClient {
    fn load(&self) -> Result<PlanningSnapshot, SnapshotError> {
        let url = self.snapshot_url();
        debug!(%url, "fetching planning snapshot");

        let snapshot = self
            .client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<PlanningSnapshot>())?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl PlanSink for HttpPlanningClient {
    type Error = reqwest::Error;

    fn persist(&self, plan: &WavePlan) -> Result<(), Self::Error> {
        self.client
            .post(self.plans_url())
            .json(plan)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map(|_| ())
    }
}
