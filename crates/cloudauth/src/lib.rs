//! # Cloudauth
//!
//! Token lifecycle and region discovery for the managed cloud.
//!
//! An [`AppPassword`] is exchanged for a short-lived bearer token at the
//! identity provider. [`AuthClient`] caches that token, refreshes it once half
//! of its lifetime has passed, and lets any number of threads share it.
//! [`RegionClient`] uses the token to find the SQL endpoint of a region.
//!
//! ## Example
//!
//! ```ignore
//! use cloudauth::{AppPassword, connect};
//!
//! let password = AppPassword::parse(&std::env::var("MZ_APP_PASSWORD")?)?;
//! let regions = connect(password, &cloudauth::CloudEndpoints::default());
//! let endpoint = regions.endpoint("aws/us-east-1")?;
//! let (host, port) = endpoint.sql_host_port()?;
//! ```

pub mod app_password;
pub mod client;
pub mod error;
mod http;
pub mod region;
pub mod token;

pub use app_password::AppPassword;
pub use client::AuthClient;
pub use error::{Error, ErrorCategory, Result};
pub use region::{CloudRegion, RegionClient, RegionEndpoint};
pub use token::{
    AuthToken, Clock, HttpTokenSource, REFRESH_FRACTION, SystemClock, TokenResponse, TokenSource,
    decode_email,
};

use std::time::Duration;

/// Production identity provider
pub const DEFAULT_ADMIN_ENDPOINT: &str = "https://admin.cloud.materialize.com";
/// Production fleet API
pub const DEFAULT_CLOUD_ENDPOINT: &str = "https://api.cloud.materialize.com";

/// Where the cloud APIs live, and how long a request may take
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEndpoints {
    pub admin: String,
    pub cloud: String,
    pub timeout: Duration,
}

impl Default for CloudEndpoints {
    fn default() -> Self {
        Self {
            admin: DEFAULT_ADMIN_ENDPOINT.to_string(),
            cloud: DEFAULT_CLOUD_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Region client authenticated with an app password over HTTP
pub type HttpRegionClient = RegionClient<HttpTokenSource>;

/// Build a region client for an app password
pub fn connect(password: AppPassword, endpoints: &CloudEndpoints) -> HttpRegionClient {
    let source = HttpTokenSource::new(&endpoints.admin, password, endpoints.timeout);
    RegionClient::new(&endpoints.cloud, AuthClient::new(source), endpoints.timeout)
}
