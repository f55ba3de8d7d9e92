//! Provider configuration
//!
//! Settings come from `~/.config/mzform/config.toml` and are overridden by
//! command-line flags and their environment variables:
//!
//! ```toml
//! [connection]
//! host = "localhost"
//! port = 6875
//! user = "materialize"
//! password = "${MZ_PASSWORD}"
//! sslmode = "disable"
//!
//! [cloud]
//! app_password = "${MZ_APP_PASSWORD}"
//! region = "aws/us-east-1"
//! ```
//!
//! A configured app password switches to cloud mode: host and port are
//! looked up through the region API and TLS is required.

use anyhow::{Context, Result};
use cloudauth::{AppPassword, CloudEndpoints};
use reconcile::{ConnectionConfig, SslMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cli::ConnectionArgs;
use crate::paths;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub cloud: CloudSection,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
    pub sslmode: Option<SslMode>,
    pub application_name_suffix: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloudSection {
    pub app_password: Option<String>,
    pub region: Option<String>,
    pub admin_endpoint: Option<String>,
    pub cloud_endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Cloud-mode settings after merging
#[derive(Debug, Clone)]
pub struct CloudSettings {
    pub app_password: AppPassword,
    /// Explicit SQL user; the token's email otherwise
    pub user: Option<String>,
    pub region: Option<String>,
    pub endpoints: CloudEndpoints,
}

/// Everything needed to reach the catalog
#[derive(Debug, Clone)]
pub struct Settings {
    pub connection: ConnectionConfig,
    pub cloud: Option<CloudSettings>,
}

impl Config {
    /// Load an explicit config file, or the default one when it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = paths::config_file()?;
                if !path.exists() {
                    log::debug!("No config file at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                path
            }
        };
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Merge with command-line overrides
    pub fn resolve(&self, args: &ConnectionArgs) -> Result<Settings> {
        let file = &self.connection;
        let defaults = ConnectionConfig::default();

        let password = args
            .password
            .clone()
            .or_else(|| file.password.clone())
            .map(|p| expand_value(&p))
            .transpose()?;

        let mut connection = ConnectionConfig {
            host: args.host.clone().or_else(|| file.host.clone()).unwrap_or(defaults.host),
            port: args.port.or(file.port).unwrap_or(defaults.port),
            user: args.user.clone().or_else(|| file.user.clone()).unwrap_or(defaults.user),
            password,
            database: args
                .database
                .clone()
                .or_else(|| file.database.clone())
                .unwrap_or(defaults.database),
            sslmode: args.sslmode.or(file.sslmode).unwrap_or(defaults.sslmode),
            application_name_suffix: args
                .application_name_suffix
                .clone()
                .or_else(|| file.application_name_suffix.clone()),
            connect_timeout: file
                .connect_timeout_secs
                .map_or(defaults.connect_timeout, Duration::from_secs),
            max_connections: file.max_connections.unwrap_or(defaults.max_connections),
        };

        let cloud = match args
            .app_password
            .clone()
            .or_else(|| self.cloud.app_password.clone())
        {
            None => None,
            Some(raw) => {
                let app_password = AppPassword::parse(&expand_value(&raw)?)
                    .context("Invalid app password")?;
                // The region endpoint only accepts TLS
                connection.sslmode = SslMode::Require;
                connection.password = Some(app_password.to_string());
                let defaults = CloudEndpoints::default();
                Some(CloudSettings {
                    app_password,
                    user: args.user.clone().or_else(|| file.user.clone()),
                    region: args.region.clone().or_else(|| self.cloud.region.clone()),
                    endpoints: CloudEndpoints {
                        admin: self.cloud.admin_endpoint.clone().unwrap_or(defaults.admin),
                        cloud: self.cloud.cloud_endpoint.clone().unwrap_or(defaults.cloud),
                        timeout: self
                            .cloud
                            .timeout_secs
                            .map_or(defaults.timeout, Duration::from_secs),
                    },
                })
            }
        };

        Ok(Settings { connection, cloud })
    }
}

/// Expand `$VAR` / `${VAR}` references in a configured value
fn expand_value(value: &str) -> Result<String> {
    shellexpand::env(value)
        .map(|v| v.into_owned())
        .with_context(|| format!("Failed to expand '{value}'"))
}
