//! Cloud region commands
//!
//! - `region list` - Regions the organization can use
//! - `region show` - Endpoint of one region
//! - `region enable` - Turn a region on

use anyhow::{Context as AnyhowContext, Result};
use cloudauth::HttpRegionClient;
use colored::Colorize;

use crate::Context;
use crate::cli::RegionCommand;
use crate::config::CloudSettings;
use crate::ui;

pub fn run(ctx: &Context, command: RegionCommand) -> Result<()> {
    let settings = super::settings(ctx)?;
    let cloud = settings
        .cloud
        .context("Region commands need an app password: pass --app-password or set MZ_APP_PASSWORD")?;
    let client = super::region_client(&cloud);

    match command {
        RegionCommand::List => list(&client, &cloud),
        RegionCommand::Show { id } => show(&client, &region_id(id, &cloud)?),
        RegionCommand::Enable { id } => enable(&client, &region_id(id, &cloud)?),
    }
}

fn region_id(explicit: Option<String>, cloud: &CloudSettings) -> Result<String> {
    explicit
        .or_else(|| cloud.region.clone())
        .context("No region given: pass an id, --region, or set [cloud] region")
}

fn list(client: &HttpRegionClient, cloud: &CloudSettings) -> Result<()> {
    let regions = client.list_regions()?;
    if regions.is_empty() {
        ui::info("No regions available");
        return Ok(());
    }

    ui::header("Regions");
    for region in &regions {
        let marker = if cloud.region.as_deref() == Some(region.id.as_str()) {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "  {} {:<24} {}",
            marker,
            region.id,
            format!("{} ({})", region.name, region.cloud_provider).dimmed()
        );
    }
    Ok(())
}

fn show(client: &HttpRegionClient, id: &str) -> Result<()> {
    let region = client.region(id)?;
    ui::header(&format!("Region {}", region.id));
    ui::kv("name", &region.name);
    ui::kv("provider", &region.cloud_provider);
    ui::kv("api", &region.url);

    match client.region_info(&region)? {
        None => ui::warn("Not enabled; run `mzform region enable` first"),
        Some(endpoint) => {
            ui::kv("sql", &endpoint.sql_address);
            ui::kv("http", &endpoint.http_address);
            ui::kv("resolvable", &endpoint.resolvable.to_string());
            if let Some(enabled_at) = endpoint.enabled_at {
                ui::kv("enabled", &enabled_at.to_rfc3339());
            }
        }
    }
    Ok(())
}

fn enable(client: &HttpRegionClient, id: &str) -> Result<()> {
    let region = client.region(id)?;
    if client.region_info(&region)?.is_some() {
        ui::success(&format!("Region {id} is already enabled"));
        return Ok(());
    }
    client
        .enable_region(&region)
        .with_context(|| format!("Failed to enable region {id}"))?;
    ui::success(&format!("Enabled region {id}"));
    ui::dim("The SQL endpoint may take a few minutes to become resolvable");
    Ok(())
}
