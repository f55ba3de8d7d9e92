//! Commands that only touch identities: `import` and `refresh`

use anyhow::{Context as AnyhowContext, Result, bail};
use colored::Colorize;
use reconcile::{Binding, ObjectIdentity, ReadOutcome, Reconciler};

use crate::Context;
use crate::cli::{ImportArgs, ManifestArgs};
use crate::manifest::{Manifest, parse_address};
use crate::state::StateFile;
use crate::ui;

/// Bind an object that already exists to a manifest address
///
/// The recorded attributes start empty, so write-only values (secret
/// contents) are taken as in sync until the manifest changes them.
pub fn import(ctx: &Context, args: ImportArgs) -> Result<()> {
    let (object_type, _) = parse_address(&args.address)?;
    let declared = Manifest::load(&args.manifest.manifest)?.into_declared()?;
    let spec = declared
        .into_iter()
        .find(|d| d.address == args.address)
        .with_context(|| {
            format!(
                "{} is not declared in {}",
                args.address,
                args.manifest.manifest.display()
            )
        })?
        .spec;

    let state_path = super::state_path(&args.manifest);
    let mut state = StateFile::load(&state_path)?;
    if let Some(existing) = state.binding(&args.address) {
        bail!(
            "{} is already bound to {}; destroy or remove it from the state first",
            args.address,
            existing.id
        );
    }

    let settings = super::settings(ctx)?;
    let pool = super::open_pool(&settings)?;
    let reconciler = Reconciler::new(&pool);
    let observed = reconciler
        .import(object_type, &ObjectIdentity::new(args.id.as_str()))
        .with_context(|| format!("Failed to import {} {}", object_type, args.id))?;

    ui::header(&format!("Imported {}", args.address));
    ui::kv("id", observed.id.as_str());
    ui::kv("name", &observed.name.to_string());
    for (column, value) in &observed.columns {
        if let Some(value) = value {
            ui::kv(column, value);
        }
    }
    if observed.name != spec.object_name() {
        ui::warn(&format!(
            "Manifest names it {}; the next apply will rename or replace it",
            spec.object_name()
        ));
    }

    let mut binding = Binding::new(object_type, observed.id);
    binding.drop_behavior = spec.drop_behavior();
    state.set(&args.address, binding);
    state.save(&state_path)?;
    ui::success(&format!("Recorded in {}", state_path.display()));
    Ok(())
}

/// Re-read every recorded object; forget the ones that no longer exist
pub fn refresh(ctx: &Context, args: ManifestArgs) -> Result<()> {
    let state_path = super::state_path(&args);
    let mut state = StateFile::load(&state_path)?;
    if state.resources.is_empty() {
        ui::info("State is empty");
        return Ok(());
    }

    let settings = super::settings(ctx)?;
    let pool = super::open_pool(&settings)?;
    let reconciler = Reconciler::new(&pool);

    let mut gone = Vec::new();
    for (address, binding) in state.bindings() {
        match reconciler.read(binding.object_type, &binding.id)? {
            ReadOutcome::Found(observed) => {
                if !ctx.quiet {
                    println!(
                        "  {} {:<40} {}",
                        "✓".green(),
                        address,
                        format!("{} ({})", observed.name, observed.id).dimmed()
                    );
                }
            }
            ReadOutcome::Gone => {
                println!("  {} {:<40} {}", "-".red(), address, "gone".dimmed());
                gone.push(address);
            }
        }
    }

    if gone.is_empty() {
        ui::success("All recorded objects exist");
        return Ok(());
    }
    for address in &gone {
        state.remove(address);
    }
    state.save(&state_path)?;
    ui::warn(&format!(
        "Forgot {} objects that no longer exist; the next apply creates them again",
        gone.len()
    ));
    Ok(())
}
