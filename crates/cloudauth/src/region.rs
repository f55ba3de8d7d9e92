//! Fleet-management API: regions and their SQL endpoints

use crate::client::AuthClient;
use crate::error::{Error, Result};
use crate::token::{Clock, SystemClock, TokenSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A region offered by the cloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudRegion {
    /// `provider/name`, e.g. `aws/us-east-1`
    pub id: String,
    pub name: String,
    pub cloud_provider: String,
    /// Base URL of the region API
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct RegionList {
    data: Vec<CloudRegion>,
}

/// Connection details of an enabled region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionEndpoint {
    /// `host:port` of the SQL interface
    pub sql_address: String,
    pub http_address: String,
    /// Whether DNS for the addresses has propagated
    pub resolvable: bool,
    #[serde(default)]
    pub enabled_at: Option<DateTime<Utc>>,
}

impl RegionEndpoint {
    /// Split `sql_address` into host and port
    pub fn sql_host_port(&self) -> Result<(String, u16)> {
        let (host, port) = self
            .sql_address
            .rsplit_once(':')
            .ok_or_else(|| Error::InvalidResponse(format!("bad SQL address {}", self.sql_address)))?;
        let port = port
            .parse()
            .map_err(|_| Error::InvalidResponse(format!("bad SQL port in {}", self.sql_address)))?;
        Ok((host.to_string(), port))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegionState {
    region_info: Option<RegionEndpoint>,
}

/// Authenticated client for the region API
pub struct RegionClient<S, C = SystemClock> {
    agent: ureq::Agent,
    endpoint: String,
    auth: AuthClient<S, C>,
}

impl<S: TokenSource, C: Clock> RegionClient<S, C> {
    pub fn new(cloud_endpoint: &str, auth: AuthClient<S, C>, timeout: Duration) -> Self {
        Self {
            agent: crate::http::agent(timeout),
            endpoint: cloud_endpoint.trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn auth(&self) -> &AuthClient<S, C> {
        &self.auth
    }

    /// All regions the organization can use
    pub fn list_regions(&self) -> Result<Vec<CloudRegion>> {
        let url = format!("{}/api/cloud-regions", self.endpoint);
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(&url)
            .header("Authorization", self.auth.bearer()?)
            .header("Content-Type", "application/json")
            .call()?;
        let list: RegionList = crate::http::read_json(response)?;
        Ok(list.data)
    }

    /// Look a region up by id
    pub fn region(&self, id: &str) -> Result<CloudRegion> {
        self.list_regions()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| Error::RegionNotFound(id.to_string()))
    }

    /// Endpoint of a region, `None` when it is not enabled
    pub fn region_info(&self, region: &CloudRegion) -> Result<Option<RegionEndpoint>> {
        let url = format!("{}/api/region", region.url.trim_end_matches('/'));
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(&url)
            .header("Authorization", self.auth.bearer()?)
            .header("Content-Type", "application/json")
            .call()?;
        let state: RegionState = crate::http::read_json(response)?;
        Ok(state.region_info)
    }

    /// Endpoint of an enabled region by id
    pub fn endpoint(&self, id: &str) -> Result<RegionEndpoint> {
        let region = self.region(id)?;
        let info = self
            .region_info(&region)?
            .ok_or_else(|| Error::RegionNotEnabled(id.to_string()))?;
        if !info.resolvable {
            log::warn!("Region {id} endpoint {} is not resolvable yet", info.sql_address);
        }
        Ok(info)
    }

    /// Enable a region; enabling an enabled region is accepted by the API
    pub fn enable_region(&self, region: &CloudRegion) -> Result<()> {
        let url = format!("{}/api/region", region.url.trim_end_matches('/'));
        log::info!("Enabling region {}", region.id);
        let response = self
            .agent
            .patch(&url)
            .header("Authorization", self.auth.bearer()?)
            .header("Content-Type", "application/json")
            .send_json(serde_json::json!({}))?;
        crate::http::check(response)
    }
}
