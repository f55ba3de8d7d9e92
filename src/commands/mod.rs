//! Command implementations

pub mod declarative;
pub mod import;
pub mod region;

use anyhow::{Context as AnyhowContext, Result};
use reconcile::PgPool;
use std::path::PathBuf;

use crate::Context;
use crate::cli::ManifestArgs;
use crate::config::{CloudSettings, Config, Settings};
use crate::paths;

/// Merge the config file with flags and environment
pub fn settings(ctx: &Context) -> Result<Settings> {
    Config::load(ctx.connection.config.as_deref())?.resolve(&ctx.connection)
}

/// Region client for cloud commands
pub fn region_client(cloud: &CloudSettings) -> cloudauth::HttpRegionClient {
    cloudauth::connect(cloud.app_password, &cloud.endpoints)
}

/// Open a pool against the configured catalog
///
/// In cloud mode the SQL endpoint of the region is looked up first, and the
/// token's email is the user unless one is configured.
pub fn open_pool(settings: &Settings) -> Result<PgPool> {
    let mut connection = settings.connection.clone();
    if let Some(cloud) = &settings.cloud {
        let region = cloud
            .region
            .as_deref()
            .context("Cloud mode needs a region: pass --region or set [cloud] region")?;
        let client = region_client(cloud);
        let endpoint = client
            .endpoint(region)
            .with_context(|| format!("Failed to resolve region {region}"))?;
        let (host, port) = endpoint.sql_host_port()?;
        connection.host = host;
        connection.port = port;
        connection.user = match &cloud.user {
            Some(user) => user.clone(),
            None => client
                .auth()
                .email()?
                .context("Token has no email claim; set the SQL user explicitly")?,
        };
    }

    let pool = PgPool::new(connection)?;
    pool.ping()
        .with_context(|| format!("Failed to connect to {}", pool.config().host))?;
    log::info!(
        "Connected to {}:{} as {}",
        pool.config().host,
        pool.config().port,
        pool.config().user
    );
    Ok(pool)
}

/// State file for a manifest, unless given explicitly
pub fn state_path(args: &ManifestArgs) -> PathBuf {
    args.state
        .clone()
        .unwrap_or_else(|| paths::state_file_for(&args.manifest))
}
