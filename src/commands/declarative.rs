//! Declarative commands
//!
//! - `plan` - Show what apply would change
//! - `apply` - Make the catalog match the manifest
//! - `destroy` - Drop everything the state file records

use anyhow::{Result, bail};
use colored::Colorize;
use reconcile::{
    AutoConfirm, DiffSummary, ExecuteOptions, ExecuteReport, ExecutionPlan, ManagedObject,
    Reconciler,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use crate::Context;
use crate::cli::{ApplyArgs, DestroyArgs, ManifestArgs, PlanArgs};
use crate::manifest::Manifest;
use crate::progress::{PromptConfirm, TierProgress};
use crate::state::StateFile;
use crate::ui;

/// A plan plus the pending objects that turned out never to exist
struct Planned {
    plan: ExecutionPlan,
    absent: Vec<String>,
}

/// Plan every declared object plus the deletion of undeclared ones
///
/// Undeclared objects whose id was never resolved are looked up by name;
/// the ones found are dropped like any other undeclared object.
fn build_plan(
    reconciler: &Reconciler<'_>,
    manifest: &Path,
    state: &StateFile,
) -> Result<Planned> {
    let declared = Manifest::load(manifest)?.into_declared()?;
    let (mut undeclared, pending) = {
        let addresses: HashSet<&str> = declared.iter().map(|d| d.address.as_str()).collect();
        (
            state.undeclared(&addresses),
            state.undeclared_pending(&addresses),
        )
    };
    let (found, absent) = ExecutionPlan::recover_undeclared(reconciler, pending)?;
    undeclared.extend(found);

    let objects = declared
        .into_iter()
        .map(|d| ManagedObject {
            binding: state.binding(&d.address),
            pending: state.pending_identity(&d.address),
            address: d.address,
            spec: d.spec,
        })
        .collect();
    Ok(Planned {
        plan: ExecutionPlan::build(reconciler, objects, undeclared)?,
        absent,
    })
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    summary: DiffSummary,
    changes: Vec<&'a reconcile::ObjectDiff>,
}

pub fn plan(ctx: &Context, args: PlanArgs) -> Result<()> {
    let settings = super::settings(ctx)?;
    let pool = super::open_pool(&settings)?;
    let reconciler = Reconciler::new(&pool);
    let state = StateFile::load(&super::state_path(&args.manifest))?;

    let planned = build_plan(&reconciler, &args.manifest.manifest, &state)?;
    for address in &planned.absent {
        log::info!("{address} was never created; apply forgets it");
    }
    let plan = planned.plan.filter_by_target(args.target.as_deref());
    let diffs = plan.diffs();

    if args.json {
        let output = PlanOutput {
            summary: DiffSummary::from_diffs(&diffs),
            changes: diffs.iter().filter(|d| d.action.is_change()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        ui::display_plan(&diffs, ctx.verbose > 0);
    }
    Ok(())
}

pub fn apply(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let settings = super::settings(ctx)?;
    let pool = super::open_pool(&settings)?;
    let reconciler = Reconciler::new(&pool);
    let state_path = super::state_path(&args.manifest);
    let mut state = StateFile::load(&state_path)?;

    let planned = build_plan(&reconciler, &args.manifest.manifest, &state)?;
    let plan = planned.plan.filter_by_target(args.target.as_deref());
    ui::display_plan(&plan.diffs(), ctx.verbose > 0);

    if args.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(());
    }

    let opts = ExecuteOptions {
        jobs: args.jobs,
        allow_replace: !args.no_replace,
        ..ExecuteOptions::default()
    };
    let forgotten = forget_absent(&mut state, &planned.absent);
    let pending = plan.pending();
    let report = run(ctx, &reconciler, &plan, &opts, args.yes)?;
    finish(&mut state, &state_path, &report, pending, forgotten)
}

/// Drop pending markers for objects the catalog does not have
fn forget_absent(state: &mut StateFile, absent: &[String]) -> usize {
    absent
        .iter()
        .filter(|address| state.forget_pending(address))
        .count()
}

pub fn destroy(ctx: &Context, args: DestroyArgs) -> Result<()> {
    let state_path = super::state_path(&args.manifest);
    let mut state = StateFile::load(&state_path)?;
    if state.resources.is_empty() && state.pending.is_empty() {
        ui::success("Nothing to destroy");
        return Ok(());
    }

    let settings = super::settings(ctx)?;
    let pool = super::open_pool(&settings)?;
    let reconciler = Reconciler::new(&pool);

    let pending = state.undeclared_pending(&HashSet::new());
    let (found, absent) = ExecutionPlan::recover_undeclared(&reconciler, pending)?;
    let forgotten = forget_absent(&mut state, &absent);
    let mut bindings = state.bindings();
    bindings.extend(found);

    let plan = ExecutionPlan::destroy(bindings).filter_by_target(args.target.as_deref());
    if plan.is_empty() {
        if forgotten > 0 {
            state.save(&state_path)?;
        }
        ui::success("Nothing to destroy");
        return Ok(());
    }
    ui::display_plan(&plan.diffs(), ctx.verbose > 0);

    let opts = ExecuteOptions {
        jobs: args.jobs,
        ..ExecuteOptions::default()
    };
    let pending = plan.pending();
    let report = run(ctx, &reconciler, &plan, &opts, args.yes)?;
    finish(&mut state, &state_path, &report, pending, forgotten)
}

fn run(
    ctx: &Context,
    reconciler: &Reconciler<'_>,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    yes: bool,
) -> Result<ExecuteReport> {
    let mut progress = TierProgress::new(ctx.quiet);
    if yes {
        reconcile::execute(reconciler, plan, opts, &mut progress, &mut AutoConfirm)
    } else {
        reconcile::execute(reconciler, plan, opts, &mut progress, &mut PromptConfirm)
    }
}

/// Persist what happened, then report it
///
/// The state is saved even when some objects failed, so identities of the
/// objects that were created are never lost.
fn finish(
    state: &mut StateFile,
    state_path: &Path,
    report: &ExecuteReport,
    pending: usize,
    forgotten: usize,
) -> Result<()> {
    if state.apply_outcomes(&report.outcomes) + forgotten > 0 {
        state.save(state_path)?;
    }

    if pending == 0 {
        return Ok(());
    }
    if report.summary.skipped == pending && report.summary.total_changes() == 0 {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    ui::print_summary(&report.summary);
    if !report.summary.is_success() {
        bail!("{} objects failed to apply", report.summary.failed);
    }
    Ok(())
}
