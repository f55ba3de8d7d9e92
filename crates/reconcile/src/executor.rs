//! Execution engine - applies a plan tier by tier, in parallel within a tier

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::diff::{Action, Change};
use crate::error::ReconcileError;
use crate::planner::{ExecutionPlan, PlannedChange};
use crate::reconciler::Reconciler;
use crate::types::{
    ApplyResult, Binding, ExecuteOptions, ExecuteSummary, ObjectIdentity, PendingIdentity,
};
use anyhow::Result;
use ddl::Ddl;
use rayon::ThreadPool;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// What the caller should do with its stored binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingUpdate {
    Keep,
    Set(Binding),
    Clear,
    /// The CREATE ran but the id is unknown; remember the name instead
    Pending(PendingIdentity),
}

/// Result for one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub address: String,
    pub result: ApplyResult,
    pub binding: BindingUpdate,
}

#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub summary: ExecuteSummary,
    pub outcomes: Vec<Outcome>,
}

impl ExecuteReport {
    fn record(&mut self, outcome: Outcome) {
        self.summary.add_result(&outcome.result);
        self.outcomes.push(outcome);
    }
}

/// Execute a plan with the given options and callbacks
///
/// Deletions run first, dependents before their dependencies. Creates,
/// updates and replacements follow in ascending tier order. Within a tier,
/// objects that allow it run on a pool of `opts.jobs` threads; the rest run
/// one at a time in declaration order.
pub fn execute<P, C>(
    reconciler: &Reconciler<'_>,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &mut P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let total_changes = plan.pending();
    let mut report = ExecuteReport::default();

    if opts.dry_run {
        return Ok(report);
    }

    // In-sync objects only refresh their recorded attributes
    for change in plan.changes.iter().filter(|c| !c.action.is_change()) {
        report.record(apply_change(reconciler, change, opts));
    }

    if total_changes == 0 {
        return Ok(report);
    }

    if !confirm.confirm(&format!("Apply {total_changes} changes?"))? {
        report.summary.skipped += total_changes;
        return Ok(report);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {}", e))?;

    for (tier, changes) in plan.delete_tiers().into_iter().chain(plan.apply_tiers()) {
        progress.on_batch_start(changes.len(), tier);
        for outcome in execute_tier(reconciler, &changes, opts, &pool, progress) {
            report.record(outcome);
        }
        progress.on_batch_complete();
    }

    Ok(report)
}

/// Execute one dependency tier
fn execute_tier<P: ProgressCallback>(
    reconciler: &Reconciler<'_>,
    changes: &[&PlannedChange],
    opts: &ExecuteOptions,
    pool: &ThreadPool,
    progress: &mut P,
) -> Vec<Outcome> {
    let (parallel, serial): (Vec<&PlannedChange>, Vec<&PlannedChange>) =
        changes.iter().copied().partition(|c| c.can_parallelize());
    let mut outcomes = Vec::with_capacity(changes.len());

    if opts.jobs > 1 && parallel.len() > 1 {
        // Progress is not thread-safe; report once the batch is done
        let results: Vec<Outcome> = pool.install(|| {
            parallel
                .par_iter()
                .map(|change| apply_change(reconciler, change, opts))
                .collect()
        });
        for outcome in results {
            progress.on_resource_complete(&outcome.address, &outcome.result);
            outcomes.push(outcome);
        }
    } else {
        outcomes.extend(apply_serial(reconciler, &parallel, opts, progress));
    }
    outcomes.extend(apply_serial(reconciler, &serial, opts, progress));
    outcomes
}

fn apply_serial<P: ProgressCallback>(
    reconciler: &Reconciler<'_>,
    changes: &[&PlannedChange],
    opts: &ExecuteOptions,
    progress: &mut P,
) -> Vec<Outcome> {
    let mut outcomes = Vec::with_capacity(changes.len());
    for change in changes {
        progress.on_resource_start(&change.address, &change.description());
        let outcome = apply_change(reconciler, change, opts);
        progress.on_resource_complete(&outcome.address, &outcome.result);
        outcomes.push(outcome);
    }
    outcomes
}

/// Apply a single planned change
fn apply_change(reconciler: &Reconciler<'_>, change: &PlannedChange, opts: &ExecuteOptions) -> Outcome {
    let (result, binding) = match (&change.action, change.spec.as_deref(), &change.binding) {
        (Action::NoChange, Some(spec), Some(binding)) => (
            ApplyResult::NoChange,
            BindingUpdate::Set(refreshed(binding, spec)),
        ),
        (Action::Create, Some(spec), _) => {
            create(reconciler, spec, opts, ApplyResult::Created, BindingUpdate::Keep)
        }
        (Action::Recreate, Some(spec), _) => {
            create(reconciler, spec, opts, ApplyResult::Created, BindingUpdate::Clear)
        }
        (Action::Update { changes }, Some(spec), Some(binding)) => {
            update(reconciler, spec, binding, changes)
        }
        (Action::Replace { attributes }, Some(spec), Some(binding)) => {
            if opts.allow_replace {
                replace(reconciler, spec, binding, opts)
            } else {
                (
                    ApplyResult::Skipped {
                        reason: format!("changing [{}] requires replacement", attributes.join(", ")),
                    },
                    BindingUpdate::Keep,
                )
            }
        }
        (Action::Delete, _, Some(binding)) => match reconciler.delete(
            binding.object_type,
            &binding.id,
            binding.drop_behavior,
        ) {
            Ok(_) => (ApplyResult::Removed, BindingUpdate::Clear),
            Err(e) => (failed(&e), BindingUpdate::Keep),
        },
        (action, _, _) => (
            ApplyResult::Failed {
                error: format!("cannot {} {}: incomplete plan entry", action.verb(), change.address),
            },
            BindingUpdate::Keep,
        ),
    };
    if let ApplyResult::Failed { error } = &result {
        log::warn!("{}: {error}", change.address);
    }
    Outcome {
        address: change.address.clone(),
        result,
        binding,
    }
}

fn failed(error: &ReconcileError) -> ApplyResult {
    ApplyResult::Failed {
        error: error.to_string(),
    }
}

fn desired_applied(spec: &dyn Ddl, fallback: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    spec.applied_attributes().unwrap_or_else(|_| fallback.clone())
}

fn refreshed(binding: &Binding, spec: &dyn Ddl) -> Binding {
    Binding {
        applied: desired_applied(spec, &binding.applied),
        drop_behavior: spec.drop_behavior(),
        ..binding.clone()
    }
}

fn create(
    reconciler: &Reconciler<'_>,
    spec: &dyn Ddl,
    opts: &ExecuteOptions,
    success: ApplyResult,
    on_failure: BindingUpdate,
) -> (ApplyResult, BindingUpdate) {
    let created = match reconciler.create(spec) {
        Err(e) if e.is_orphan() => match retry_identity(reconciler, spec, opts) {
            Some(id) => reconciler.finish_create(spec, id),
            None => return (failed(&e), BindingUpdate::Pending(PendingIdentity::of(spec))),
        },
        other => other,
    };
    match created {
        Ok(created) => (success, BindingUpdate::Set(created.into_binding(spec))),
        Err(e) => {
            let update = match &e {
                // The object exists; keep its identity so the next run finishes it
                ReconcileError::PartialUpdate { id, .. } => BindingUpdate::Set(Binding {
                    object_type: spec.object_type(),
                    id: id.clone(),
                    applied: desired_applied(spec, &BTreeMap::new()),
                    drop_behavior: spec.drop_behavior(),
                }),
                _ => on_failure,
            };
            (failed(&e), update)
        }
    }
}

/// Look the orphaned object up again; the CREATE itself is never repeated
fn retry_identity(
    reconciler: &Reconciler<'_>,
    spec: &dyn Ddl,
    opts: &ExecuteOptions,
) -> Option<ObjectIdentity> {
    for attempt in 1..=opts.identity_retries {
        std::thread::sleep(opts.identity_retry_delay * attempt as u32);
        log::warn!(
            "resolving identity of {} {} (attempt {attempt})",
            spec.object_type(),
            spec.object_name()
        );
        match reconciler.resolve_identity(spec) {
            Ok(id) => return Some(id),
            Err(e) if e.is_orphan() => {}
            Err(_) => return None,
        }
    }
    None
}

fn update(
    reconciler: &Reconciler<'_>,
    spec: &dyn Ddl,
    binding: &Binding,
    changes: &[Change],
) -> (ApplyResult, BindingUpdate) {
    match reconciler.apply_changes(&binding.id, changes) {
        Ok(_) => (
            ApplyResult::Modified,
            BindingUpdate::Set(refreshed(binding, spec)),
        ),
        Err(e) => {
            let update = match &e {
                // Record what did change so it is not applied twice
                ReconcileError::PartialUpdate { applied, .. } if !applied.is_empty() => {
                    let desired = desired_applied(spec, &binding.applied);
                    let mut merged = binding.clone();
                    for key in applied {
                        if let Some(value) = desired.get(key) {
                            merged.applied.insert(key.clone(), value.clone());
                        }
                    }
                    BindingUpdate::Set(merged)
                }
                _ => BindingUpdate::Keep,
            };
            (failed(&e), update)
        }
    }
}

fn replace(
    reconciler: &Reconciler<'_>,
    spec: &dyn Ddl,
    binding: &Binding,
    opts: &ExecuteOptions,
) -> (ApplyResult, BindingUpdate) {
    if let Err(e) = reconciler.delete(binding.object_type, &binding.id, binding.drop_behavior) {
        return (failed(&e), BindingUpdate::Keep);
    }
    create(reconciler, spec, opts, ApplyResult::Replaced, BindingUpdate::Clear)
}

/// Execute without progress reporting or confirmation
pub fn execute_simple(
    reconciler: &Reconciler<'_>,
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(reconciler, plan, opts, &mut NoProgress, &mut AutoConfirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fake::{FakeConnection, id_row, row};
    use crate::context::{AutoConfirm, AutoDecline, NoProgress};
    use crate::planner::ManagedObject;
    use ddl::{ClusterSpec, DatabaseSpec, ObjectType, ViewSpec, fingerprint};
    use std::time::Duration;

    fn opts() -> ExecuteOptions {
        ExecuteOptions {
            identity_retry_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    fn managed(address: &str, spec: Box<dyn Ddl>, binding: Option<Binding>) -> ManagedObject {
        ManagedObject {
            address: address.into(),
            spec,
            binding,
            pending: None,
        }
    }

    fn outcome<'r>(report: &'r ExecuteReport, address: &str) -> &'r Outcome {
        report
            .outcomes
            .iter()
            .find(|o| o.address == address)
            .unwrap()
    }

    #[test]
    fn test_execute_empty_plan() {
        let conn = FakeConnection::new();
        let reconciler = Reconciler::new(&conn);
        let report = execute(
            &reconciler,
            &ExecutionPlan::new(),
            &opts(),
            &mut NoProgress,
            &mut AutoConfirm,
        )
        .unwrap();
        assert_eq!(report.summary.total(), 0);
    }

    #[test]
    fn test_creates_run_in_tier_order() {
        let conn = FakeConnection::new();
        conn.rows("SELECT o.id FROM", id_row("u1"));
        let reconciler = Reconciler::new(&conn);
        let objects = vec![
            managed("view.v", Box::new(ViewSpec::new("v", "SELECT 1")), None),
            managed("database.d", Box::new(DatabaseSpec::new("d")), None),
            managed("cluster.c", Box::new(ClusterSpec::new("c", "25cc")), None),
        ];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();
        assert_eq!(report.summary.created, 3);

        let creates: Vec<String> = conn
            .statements()
            .into_iter()
            .filter(|s| s.starts_with("CREATE"))
            .collect();
        assert!(creates[0].starts_with("CREATE CLUSTER"));
        assert!(creates[1].starts_with("CREATE DATABASE"));
        assert!(creates[2].starts_with("CREATE VIEW"));

        let BindingUpdate::Set(binding) = &outcome(&report, "view.v").binding else {
            panic!("expected a binding");
        };
        assert_eq!(binding.id, ObjectIdentity::new("u1"));
        assert_eq!(binding.applied["definition"], fingerprint("SELECT 1"));
    }

    #[test]
    fn test_declined_confirmation_skips() {
        let conn = FakeConnection::new();
        let reconciler = Reconciler::new(&conn);
        let objects = vec![managed("database.d", Box::new(DatabaseSpec::new("d")), None)];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        let report = execute(&reconciler, &plan, &opts(), &mut NoProgress, &mut AutoDecline).unwrap();
        assert_eq!(report.summary.skipped, 1);
        assert!(conn.statements().is_empty());
    }

    #[test]
    fn test_dry_run_executes_nothing() {
        let conn = FakeConnection::new();
        let reconciler = Reconciler::new(&conn);
        let objects = vec![managed("database.d", Box::new(DatabaseSpec::new("d")), None)];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        let dry = ExecuteOptions {
            dry_run: true,
            ..opts()
        };
        let report = execute_simple(&reconciler, &plan, &dry).unwrap();
        assert_eq!(report.summary.total(), 0);
        assert!(conn.statements().is_empty());
    }

    #[test]
    fn test_orphan_retries_lookup_not_create() {
        let conn = FakeConnection::new();
        conn.rows_once("SELECT o.id FROM", Vec::new());
        conn.rows("SELECT o.id FROM", id_row("u42"));
        let reconciler = Reconciler::new(&conn);
        let objects = vec![managed("database.d", Box::new(DatabaseSpec::new("d")), None)];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();

        assert_eq!(report.summary.created, 1);
        assert_eq!(conn.count("CREATE "), 1);
        assert_eq!(conn.count("SELECT o.id FROM"), 2);
        let BindingUpdate::Set(binding) = &report.outcomes[0].binding else {
            panic!("expected a binding");
        };
        assert_eq!(binding.id, ObjectIdentity::new("u42"));
    }

    #[test]
    fn test_unresolved_orphan_is_remembered_by_name() {
        let conn = FakeConnection::new();
        let reconciler = Reconciler::new(&conn);
        let objects = vec![managed("database.d", Box::new(DatabaseSpec::new("d")), None)];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();
        assert_eq!(report.summary.failed, 1);
        assert_eq!(
            report.outcomes[0].binding,
            BindingUpdate::Pending(PendingIdentity::of(&DatabaseSpec::new("d")))
        );
        assert_eq!(conn.count("CREATE "), 1);
        // One lookup from create, then two retries
        assert_eq!(conn.count("SELECT o.id FROM"), 3);
    }

    #[test]
    fn test_orphan_is_not_created_again_on_next_run() {
        let conn = FakeConnection::new();
        // The catalog only shows the object after the first run gave up
        for _ in 0..3 {
            conn.rows_once("SELECT o.id FROM", Vec::new());
        }
        conn.rows("SELECT o.id FROM", id_row("u7"));
        conn.rows(
            "WHERE o.id = 'u7'",
            vec![row(&[("id", Some("u7")), ("name", Some("d"))])],
        );
        let reconciler = Reconciler::new(&conn);

        let first = ExecutionPlan::build(
            &reconciler,
            vec![managed("database.d", Box::new(DatabaseSpec::new("d")), None)],
            Vec::new(),
        )
        .unwrap();
        let report = execute_simple(&reconciler, &first, &opts()).unwrap();
        let BindingUpdate::Pending(pending) = report.outcomes[0].binding.clone() else {
            panic!("expected a pending identity");
        };

        let second = ExecutionPlan::build(
            &reconciler,
            vec![ManagedObject {
                address: "database.d".into(),
                spec: Box::new(DatabaseSpec::new("d")),
                binding: None,
                pending: Some(pending),
            }],
            Vec::new(),
        )
        .unwrap();
        assert_eq!(second.changes[0].action, Action::NoChange);
        let report = execute_simple(&reconciler, &second, &opts()).unwrap();
        let BindingUpdate::Set(binding) = &report.outcomes[0].binding else {
            panic!("expected a binding");
        };
        assert_eq!(binding.id, ObjectIdentity::new("u7"));
        assert_eq!(conn.count("CREATE "), 1);
    }

    #[test]
    fn test_resolved_orphan_still_gets_owner_and_comment() {
        let conn = FakeConnection::new();
        conn.rows_once("SELECT o.id FROM", Vec::new());
        conn.rows("SELECT o.id FROM", id_row("u3"));
        let reconciler = Reconciler::new(&conn);
        let spec = ClusterSpec {
            owner: Some("ops".into()),
            comment: Some("serving".into()),
            ..ClusterSpec::new("c", "25cc")
        };
        let plan = ExecutionPlan::build(
            &reconciler,
            vec![managed("cluster.c", Box::new(spec), None)],
            Vec::new(),
        )
        .unwrap();
        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();

        assert_eq!(report.summary.created, 1);
        assert_eq!(conn.count("CREATE CLUSTER"), 1);
        assert_eq!(conn.count("ALTER CLUSTER"), 1);
        assert_eq!(conn.count("COMMENT ON CLUSTER"), 1);
    }

    #[test]
    fn test_resolved_orphan_with_failed_comment_keeps_binding() {
        let conn = FakeConnection::new();
        conn.rows_once("SELECT o.id FROM", Vec::new());
        conn.rows("SELECT o.id FROM", id_row("u3"));
        conn.fail("COMMENT ON", "permission denied");
        let reconciler = Reconciler::new(&conn);
        let spec = ClusterSpec {
            comment: Some("serving".into()),
            ..ClusterSpec::new("c", "25cc")
        };
        let plan = ExecutionPlan::build(
            &reconciler,
            vec![managed("cluster.c", Box::new(spec), None)],
            Vec::new(),
        )
        .unwrap();
        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();

        assert_eq!(report.summary.failed, 1);
        let BindingUpdate::Set(binding) = &report.outcomes[0].binding else {
            panic!("expected a binding");
        };
        assert_eq!(binding.id, ObjectIdentity::new("u3"));
    }

    #[test]
    fn test_deletes_run_before_creates_and_clear_binding() {
        let conn = FakeConnection::new();
        conn.rows("SELECT o.id FROM", id_row("u2"));
        conn.rows(
            "WHERE o.id = 'u1'",
            vec![row(&[("id", Some("u1")), ("name", Some("old_db"))])],
        );
        let reconciler = Reconciler::new(&conn);
        let objects = vec![managed("database.new", Box::new(DatabaseSpec::new("new_db")), None)];
        let undeclared = vec![(
            "database.old".to_string(),
            Binding::new(ObjectType::Database, ObjectIdentity::new("u1")),
        )];
        let plan = ExecutionPlan::build(&reconciler, objects, undeclared).unwrap();
        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();

        assert_eq!(report.summary.removed, 1);
        assert_eq!(report.summary.created, 1);
        assert_eq!(outcome(&report, "database.old").binding, BindingUpdate::Clear);
        let statements = conn.statements();
        let drop_at = statements.iter().position(|s| s.starts_with("DROP")).unwrap();
        let create_at = statements.iter().position(|s| s.starts_with("CREATE")).unwrap();
        assert!(drop_at < create_at);
    }

    #[test]
    fn test_replace_drops_then_creates() {
        let conn = FakeConnection::new();
        conn.rows(
            "WHERE o.id = 'u1'",
            vec![row(&[
                ("id", Some("u1")),
                ("name", Some("v")),
                ("schema_name", Some("public")),
                ("database_name", Some("materialize")),
            ])],
        );
        conn.rows("SELECT o.id FROM", id_row("u2"));
        let reconciler = Reconciler::new(&conn);
        let mut binding = Binding::new(ObjectType::View, ObjectIdentity::new("u1"));
        binding
            .applied
            .insert("definition".into(), fingerprint("SELECT 1"));
        let objects = vec![managed(
            "view.v",
            Box::new(ViewSpec::new("v", "SELECT 2")),
            Some(binding),
        )];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        assert!(matches!(plan.changes[0].action, Action::Replace { .. }));

        let no_replace = ExecuteOptions {
            allow_replace: false,
            ..opts()
        };
        let report = execute_simple(&reconciler, &plan, &no_replace).unwrap();
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(conn.count("DROP"), 0);

        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();
        assert_eq!(report.summary.replaced, 1);
        let BindingUpdate::Set(binding) = &report.outcomes[0].binding else {
            panic!("expected a binding");
        };
        assert_eq!(binding.id, ObjectIdentity::new("u2"));
        assert_eq!(binding.applied["definition"], fingerprint("SELECT 2"));
        assert_eq!(conn.count("DROP VIEW"), 1);
        assert_eq!(conn.count("CREATE VIEW"), 1);
    }

    #[test]
    fn test_partial_update_records_applied_keys() {
        let conn = FakeConnection::new();
        conn.rows(
            "WHERE o.id = 'u1'",
            vec![row(&[
                ("id", Some("u1")),
                ("name", Some("c")),
                ("size", Some("25cc")),
                ("replication_factor", Some("1")),
            ])],
        );
        conn.fail("REPLICATION FACTOR", "replica limit reached");
        let reconciler = Reconciler::new(&conn);
        let spec = ClusterSpec {
            replication_factor: Some(2),
            introspection_interval: Some("2s".into()),
            ..ClusterSpec::new("c", "50cc")
        };
        let mut binding = Binding::new(ObjectType::Cluster, ObjectIdentity::new("u1"));
        binding
            .applied
            .insert("introspection_interval".into(), "1s".into());
        let objects = vec![managed("cluster.c", Box::new(spec), Some(binding))];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();

        assert_eq!(report.summary.failed, 1);
        let BindingUpdate::Set(binding) = &report.outcomes[0].binding else {
            panic!("expected a binding");
        };
        assert_eq!(binding.applied["size"], "50cc");
        // Never reached; still holds the old value
        assert_eq!(binding.applied["introspection_interval"], "1s");
    }

    #[test]
    fn test_parallel_tier_with_jobs() {
        let conn = FakeConnection::new();
        conn.rows("SELECT o.id FROM", id_row("u1"));
        let reconciler = Reconciler::new(&conn);
        let objects = (0..8)
            .map(|i| {
                let name = format!("db{i}");
                managed(
                    &format!("database.{name}"),
                    Box::new(DatabaseSpec::new(name.as_str())) as Box<dyn Ddl>,
                    None,
                )
            })
            .collect();
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        let report = execute_simple(&reconciler, &plan, &opts()).unwrap();
        assert_eq!(report.summary.created, 8);
        assert_eq!(conn.count("CREATE DATABASE"), 8);
    }
}
