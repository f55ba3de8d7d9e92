//! Execution planner - decides an action per object and orders them by tier

use crate::diff::{Action, ObjectDiff};
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::types::{Binding, PendingIdentity};
use ddl::{Ddl, ObjectType};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Boxed object spec
pub type BoxedSpec = Box<dyn Ddl>;

/// A declared object and what is known about it from the last apply
#[derive(Debug)]
pub struct ManagedObject {
    /// Stable key in the manifest, `type.key`
    pub address: String,
    pub spec: BoxedSpec,
    pub binding: Option<Binding>,
    /// Left by a CREATE whose id was never resolved
    pub pending: Option<PendingIdentity>,
}

/// One object with its decided action
#[derive(Debug)]
pub struct PlannedChange {
    pub address: String,
    pub object_type: ObjectType,
    /// Display name: the qualified name, or the address for pure deletions
    pub name: String,
    pub action: Action,
    pub spec: Option<BoxedSpec>,
    pub binding: Option<Binding>,
}

impl PlannedChange {
    pub fn tier(&self) -> u8 {
        self.object_type.tier()
    }

    pub fn description(&self) -> String {
        format!("{} {}", self.object_type, self.name)
    }

    /// Objects whose spec opts out are applied one at a time
    pub fn can_parallelize(&self) -> bool {
        self.spec.as_ref().is_none_or(|s| s.can_parallelize())
    }

    pub fn diff(&self) -> ObjectDiff {
        ObjectDiff {
            address: self.address.clone(),
            object_type: self.object_type,
            name: self.name.clone(),
            action: self.action.clone(),
        }
    }
}

/// All planned changes of one run
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<PlannedChange>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan every declared object, and a deletion for every binding that is
    /// no longer declared
    ///
    /// Each declared object costs one catalog read; reads run in parallel.
    pub fn build(
        reconciler: &Reconciler<'_>,
        objects: Vec<ManagedObject>,
        undeclared: Vec<(String, Binding)>,
    ) -> Result<Self> {
        let mut changes = objects
            .into_par_iter()
            .map(|object| -> Result<PlannedChange> {
                let binding = match (object.binding, &object.pending) {
                    (None, Some(pending)) => recover(reconciler, &object.address, pending)?,
                    (binding, _) => binding,
                };
                let action = reconciler.plan(object.spec.as_ref(), binding.as_ref())?;
                Ok(PlannedChange {
                    object_type: object.spec.object_type(),
                    name: object.spec.object_name().to_string(),
                    address: object.address,
                    action,
                    spec: Some(object.spec),
                    binding,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        changes.extend(Self::destroy(undeclared).changes);
        Ok(Self { changes })
    }

    /// Look up objects left behind by unresolved CREATEs that the manifest
    /// no longer declares
    ///
    /// Found objects come back as bindings to drop; the addresses of the
    /// ones that never appeared are returned separately so the caller can
    /// forget them.
    pub fn recover_undeclared(
        reconciler: &Reconciler<'_>,
        pending: Vec<(String, PendingIdentity)>,
    ) -> Result<(Vec<(String, Binding)>, Vec<String>)> {
        let mut found = Vec::new();
        let mut absent = Vec::new();
        for (address, pending) in pending {
            match recover(reconciler, &address, &pending)? {
                Some(binding) => found.push((address, binding)),
                None => absent.push(address),
            }
        }
        Ok((found, absent))
    }

    /// A plan that drops every bound object
    pub fn destroy(bindings: Vec<(String, Binding)>) -> Self {
        let changes = bindings
            .into_iter()
            .map(|(address, binding)| PlannedChange {
                object_type: binding.object_type,
                name: address.clone(),
                address,
                action: Action::Delete,
                spec: None,
                binding: Some(binding),
            })
            .collect();
        Self { changes }
    }

    /// Filter plan to only include objects matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&PlannedChange) -> bool,
    {
        Self {
            changes: self.changes.into_iter().filter(|c| predicate(c)).collect(),
        }
    }

    /// Filter plan to only include objects matching a target
    ///
    /// Target format: "type" or "type.key"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (object_type, key) = parse_target(t);
                self.filter(|c| matches_filter(c, object_type.as_deref(), key.as_deref()))
            }
        }
    }

    pub fn diffs(&self) -> Vec<ObjectDiff> {
        self.changes.iter().map(PlannedChange::diff).collect()
    }

    /// Number of objects that will change
    pub fn pending(&self) -> usize {
        self.changes.iter().filter(|c| c.action.is_change()).count()
    }

    /// Check if plan changes nothing
    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Deletions, dependents first
    pub fn delete_tiers(&self) -> Vec<(u8, Vec<&PlannedChange>)> {
        let mut tiers = self.tiers(|a| matches!(a, Action::Delete));
        tiers.reverse();
        tiers
    }

    /// Creates, updates and replacements, dependencies first
    pub fn apply_tiers(&self) -> Vec<(u8, Vec<&PlannedChange>)> {
        self.tiers(|a| a.is_change() && !matches!(a, Action::Delete))
    }

    fn tiers(&self, include: impl Fn(&Action) -> bool) -> Vec<(u8, Vec<&PlannedChange>)> {
        let mut tiers: BTreeMap<u8, Vec<&PlannedChange>> = BTreeMap::new();
        for change in self.changes.iter().filter(|c| include(&c.action)) {
            tiers.entry(change.tier()).or_default().push(change);
        }
        tiers.into_iter().collect()
    }
}

/// Parse a target string like "type.key" into (type, key)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    match target.split_once('.') {
        None => (Some(target.to_string()), None),
        Some((object_type, key)) => (Some(object_type.to_string()), Some(key.to_string())),
    }
}

/// Check if a change matches the filter criteria
fn matches_filter(change: &PlannedChange, object_type: Option<&str>, key: Option<&str>) -> bool {
    if let Some(ty) = object_type {
        // Plural forms read naturally on the command line
        let ty = ty.strip_suffix('s').filter(|t| ObjectType::parse(t).is_some()).unwrap_or(ty);
        if change.object_type.as_str() != ty {
            return false;
        }
    }
    match key {
        None => true,
        Some(key) => change
            .address
            .split_once('.')
            .is_some_and(|(_, k)| k == key),
    }
}

/// Bind a pending object by its recorded name before anything plans a CREATE
fn recover(
    reconciler: &Reconciler<'_>,
    address: &str,
    pending: &PendingIdentity,
) -> Result<Option<Binding>> {
    Ok(match reconciler.recover(pending)? {
        Some(id) => {
            log::info!("{address}: found {} {} as {id}", pending.object_type, pending.name);
            Some(pending.bind(id))
        }
        None => {
            log::warn!(
                "{address}: {} {} was never found after its CREATE",
                pending.object_type,
                pending.name
            );
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fake::{FakeConnection, id_row, row};
    use crate::types::ObjectIdentity;
    use ddl::{ClusterSpec, DatabaseSpec, IndexSpec, ObjectRef, ViewSpec};

    fn object(address: &str, spec: BoxedSpec) -> ManagedObject {
        ManagedObject {
            address: address.into(),
            spec,
            binding: None,
            pending: None,
        }
    }

    fn sample_plan() -> ExecutionPlan {
        let conn = FakeConnection::new();
        let reconciler = Reconciler::new(&conn);
        let objects = vec![
            object(
                "index.orders_by_id",
                Box::new(IndexSpec::new("orders_by_id", ObjectRef::new("orders"), vec!["id".into()])),
            ),
            object("view.orders", Box::new(ViewSpec::new("orders", "SELECT 1"))),
            object("cluster.serving", Box::new(ClusterSpec::new("serving", "25cc"))),
            object("database.analytics", Box::new(DatabaseSpec::new("analytics"))),
        ];
        let undeclared = vec![
            (
                "database.old".to_string(),
                Binding::new(ObjectType::Database, ObjectIdentity::new("u1")),
            ),
            (
                "view.stale".to_string(),
                Binding::new(ObjectType::View, ObjectIdentity::new("u2")),
            ),
        ];
        ExecutionPlan::build(&reconciler, objects, undeclared).unwrap()
    }

    #[test]
    fn test_apply_tiers_are_ascending() {
        let plan = sample_plan();
        let order: Vec<&str> = plan
            .apply_tiers()
            .iter()
            .flat_map(|(_, changes)| changes.iter().map(|c| c.address.as_str()))
            .collect();
        assert_eq!(
            order,
            [
                "cluster.serving",
                "database.analytics",
                "view.orders",
                "index.orders_by_id"
            ]
        );
    }

    #[test]
    fn test_delete_tiers_are_descending() {
        let plan = sample_plan();
        let order: Vec<&str> = plan
            .delete_tiers()
            .iter()
            .flat_map(|(_, changes)| changes.iter().map(|c| c.address.as_str()))
            .collect();
        assert_eq!(order, ["view.stale", "database.old"]);
        assert_eq!(plan.pending(), 6);
    }

    #[test]
    fn test_views_are_serial() {
        let plan = sample_plan();
        let view = plan
            .changes
            .iter()
            .find(|c| c.address == "view.orders")
            .unwrap();
        assert!(!view.can_parallelize());
        let delete = plan
            .changes
            .iter()
            .find(|c| c.address == "view.stale")
            .unwrap();
        assert!(delete.can_parallelize());
    }

    #[test]
    fn test_filter_by_target() {
        let plan = sample_plan().filter_by_target(Some("view"));
        assert_eq!(plan.changes.len(), 2);

        let plan = sample_plan().filter_by_target(Some("databases"));
        assert_eq!(plan.changes.len(), 2);

        let plan = sample_plan().filter_by_target(Some("cluster.serving"));
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].name, "serving");

        let plan = sample_plan().filter_by_target(Some("cluster.other"));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(parse_target("view"), (Some("view".into()), None));
        assert_eq!(
            parse_target("view.orders"),
            (Some("view".into()), Some("orders".into()))
        );
    }

    #[test]
    fn test_in_sync_object_is_not_pending() {
        let conn = FakeConnection::new();
        conn.rows(
            "WHERE o.id = 'u3'",
            vec![row(&[("id", Some("u3")), ("name", Some("analytics"))])],
        );
        let reconciler = Reconciler::new(&conn);
        let objects = vec![ManagedObject {
            address: "database.analytics".into(),
            spec: Box::new(DatabaseSpec::new("analytics")),
            binding: Some(Binding::new(ObjectType::Database, ObjectIdentity::new("u3"))),
            pending: None,
        }];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        assert_eq!(plan.changes[0].action, Action::NoChange);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_pending_object_is_bound_instead_of_created() {
        let conn = FakeConnection::new();
        conn.rows("SELECT o.id FROM", id_row("u8"));
        conn.rows(
            "WHERE o.id = 'u8'",
            vec![row(&[("id", Some("u8")), ("name", Some("analytics"))])],
        );
        let reconciler = Reconciler::new(&conn);
        let spec = DatabaseSpec::new("analytics");
        let objects = vec![ManagedObject {
            address: "database.analytics".into(),
            pending: Some(PendingIdentity::of(&spec)),
            spec: Box::new(spec),
            binding: None,
        }];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        assert_eq!(plan.changes[0].action, Action::NoChange);
        assert_eq!(
            plan.changes[0].binding.as_ref().unwrap().id,
            ObjectIdentity::new("u8")
        );
    }

    #[test]
    fn test_pending_object_never_found_is_created() {
        let conn = FakeConnection::new();
        let reconciler = Reconciler::new(&conn);
        let spec = DatabaseSpec::new("analytics");
        let objects = vec![ManagedObject {
            address: "database.analytics".into(),
            pending: Some(PendingIdentity::of(&spec)),
            spec: Box::new(spec),
            binding: None,
        }];
        let plan = ExecutionPlan::build(&reconciler, objects, Vec::new()).unwrap();
        assert_eq!(plan.changes[0].action, Action::Create);
        // Looked up by name first
        assert_eq!(conn.count("SELECT o.id FROM"), 1);
    }

    #[test]
    fn test_recover_undeclared() {
        let conn = FakeConnection::new();
        conn.rows("o.name = 'old'", id_row("u4"));
        let reconciler = Reconciler::new(&conn);
        let pending = vec![
            (
                "database.old".to_string(),
                PendingIdentity::of(&DatabaseSpec::new("old")),
            ),
            (
                "database.never".to_string(),
                PendingIdentity::of(&DatabaseSpec::new("never")),
            ),
        ];
        let (found, absent) = ExecutionPlan::recover_undeclared(&reconciler, pending).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "database.old");
        assert_eq!(found[0].1.id, ObjectIdentity::new("u4"));
        assert_eq!(absent, ["database.never"]);
    }
}
