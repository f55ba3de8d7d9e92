//! Drift detection - desired spec against observed catalog state

use crate::error::Result;
use crate::types::CanonicalAttributes;
use ddl::{AttributeSource, Ddl, ObjectType, rename_statement};
use serde::Serialize;
use std::collections::BTreeMap;

/// One in-place corrective statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Attribute key, or `name` for a rename
    pub attribute: String,
    #[serde(skip)]
    pub statement: String,
    /// The statement carries a secret value
    pub sensitive: bool,
}

impl Change {
    /// Statement text safe to print or log
    pub fn display_statement(&self) -> String {
        if self.sensitive {
            redact(&self.statement)
        } else {
            self.statement.clone()
        }
    }
}

/// Minimal set of changes that brings an object to its spec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Executed in order; a rename always comes first
    pub changes: Vec<Change>,
    /// Attributes that differ and cannot be altered in place
    pub replace: Vec<String>,
}

impl UpdatePlan {
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty() && self.replace.is_empty()
    }

    pub fn requires_replacement(&self) -> bool {
        !self.replace.is_empty()
    }
}

/// Compare a spec with what the catalog reports and what was last applied
///
/// Attributes the spec leaves unset are unmanaged and never compared.
/// A write-only attribute with no recorded value is adopted as in sync.
pub fn plan_update(
    spec: &dyn Ddl,
    observed: &CanonicalAttributes,
    applied: &BTreeMap<String, String>,
) -> Result<UpdatePlan> {
    spec.validate()?;
    let ty = spec.object_type();
    let desired = spec.object_name();
    let mut plan = UpdatePlan::default();

    if ty != observed.object_type {
        plan.replace.push("object_type".into());
        return Ok(plan);
    }
    if desired.namespace != observed.name.namespace {
        plan.replace.push("namespace".into());
    }
    if desired.name != observed.name.name {
        if ty.supports_rename() {
            plan.changes.push(Change {
                attribute: "name".into(),
                statement: rename_statement(ty, &observed.name, &desired.name)?,
                sensitive: false,
            });
        } else {
            plan.replace.push("name".into());
        }
    }

    for attr in spec.attributes()? {
        let Some(want) = attr.desired.as_deref() else {
            continue;
        };
        let have = match attr.source {
            AttributeSource::Observed(column) => observed.get(column),
            AttributeSource::Applied => match applied.get(attr.key) {
                Some(value) => Some(value.as_str()),
                None => continue,
            },
        };
        if have == Some(want) {
            continue;
        }
        log::debug!(
            "{ty} {desired}: `{}` drifted",
            attr.key
        );
        match attr.alter {
            Some(statement) => plan.changes.push(Change {
                attribute: attr.key.to_string(),
                statement,
                sensitive: attr.sensitive,
            }),
            None => plan.replace.push(attr.key.to_string()),
        }
    }
    Ok(plan)
}

/// Hide the value of a statement that carries a secret
pub fn redact(statement: &str) -> String {
    match statement.find(" AS '") {
        Some(at) => format!("{} AS '<redacted>';", &statement[..at]),
        None => "<redacted>".to_string(),
    }
}

/// What a plan does with one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    NoChange,
    Create,
    /// The bound object no longer exists and will be created again
    Recreate,
    Update { changes: Vec<Change> },
    Replace { attributes: Vec<String> },
    Delete,
}

impl Action {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }

    /// Marker used when printing a plan
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::NoChange => " ",
            Self::Create | Self::Recreate => "+",
            Self::Update { .. } => "~",
            Self::Replace { .. } => "-/+",
            Self::Delete => "-",
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::NoChange => "unchanged",
            Self::Create => "create",
            Self::Recreate => "create (gone)",
            Self::Update { .. } => "update in place",
            Self::Replace { .. } => "replace",
            Self::Delete => "destroy",
        }
    }
}

/// One line of a printed plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectDiff {
    pub address: String,
    pub object_type: ObjectType,
    pub name: String,
    pub action: Action,
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub additions: usize,
    pub modifications: usize,
    pub replacements: usize,
    pub removals: usize,
}

impl DiffSummary {
    pub fn from_diffs(diffs: &[ObjectDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::NoChange => {}
                Action::Create | Action::Recreate => summary.additions += 1,
                Action::Update { .. } => summary.modifications += 1,
                Action::Replace { .. } => summary.replacements += 1,
                Action::Delete => summary.removals += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.additions + self.modifications + self.replacements + self.removals
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Group diffs by object type
pub fn group_by_type(diffs: &[ObjectDiff]) -> BTreeMap<ObjectType, Vec<&ObjectDiff>> {
    let mut groups: BTreeMap<ObjectType, Vec<&ObjectDiff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(diff.object_type).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::fake::row;
    use crate::types::ObjectIdentity;
    use ddl::{ClusterSpec, ObjectName, RoleSpec, SecretSpec, ViewSpec, fingerprint, relation_for};

    fn observed(ty: ObjectType, pairs: &[(&str, Option<&str>)]) -> CanonicalAttributes {
        let columns = row(pairs);
        CanonicalAttributes {
            id: ObjectIdentity::new("u1"),
            object_type: ty,
            name: relation_for(ty).name_from_row(&columns).unwrap(),
            columns,
        }
    }

    fn cluster_row(name: &str, size: &str, factor: &str) -> CanonicalAttributes {
        observed(
            ObjectType::Cluster,
            &[
                ("id", Some("u1")),
                ("name", Some(name)),
                ("owner_name", Some("admin")),
                ("comment", None),
                ("size", Some(size)),
                ("replication_factor", Some(factor)),
            ],
        )
    }

    #[test]
    fn test_in_sync_is_noop() {
        let spec = ClusterSpec {
            replication_factor: Some(1),
            ..ClusterSpec::new("c", "25cc")
        };
        let plan = plan_update(&spec, &cluster_row("c", "25cc", "1"), &BTreeMap::new()).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn test_rename_comes_first() {
        let spec = ClusterSpec::new("new", "50cc");
        let plan = plan_update(&spec, &cluster_row("old", "25cc", "1"), &BTreeMap::new()).unwrap();
        let attrs: Vec<&str> = plan.changes.iter().map(|c| c.attribute.as_str()).collect();
        assert_eq!(attrs, ["name", "size"]);
        assert_eq!(
            plan.changes[0].statement,
            "ALTER CLUSTER \"old\" RENAME TO \"new\";"
        );
        assert_eq!(
            plan.changes[1].statement,
            "ALTER CLUSTER \"new\" SET (SIZE = '50cc');"
        );
        assert!(!plan.requires_replacement());
    }

    #[test]
    fn test_unmanaged_attributes_are_ignored() {
        // Spec sets no replication factor, the catalog reports 3
        let spec = ClusterSpec::new("c", "25cc");
        let plan = plan_update(&spec, &cluster_row("c", "25cc", "3"), &BTreeMap::new()).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn test_comment_drift_is_altered() {
        let spec = ClusterSpec {
            comment: Some("serving".into()),
            ..ClusterSpec::new("c", "25cc")
        };
        let plan = plan_update(&spec, &cluster_row("c", "25cc", "1"), &BTreeMap::new()).unwrap();
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(
            plan.changes[0].statement,
            "COMMENT ON CLUSTER \"c\" IS 'serving';"
        );
    }

    #[test]
    fn test_definition_change_requires_replacement() {
        let spec = ViewSpec::new("v", "SELECT 2");
        let observed = observed(
            ObjectType::View,
            &[
                ("id", Some("u2")),
                ("name", Some("v")),
                ("schema_name", Some("public")),
                ("database_name", Some("materialize")),
            ],
        );
        let mut applied = BTreeMap::new();
        applied.insert("definition".to_string(), fingerprint("SELECT 1"));
        let plan = plan_update(&spec, &observed, &applied).unwrap();
        assert_eq!(plan.replace, vec!["definition".to_string()]);

        // Nothing recorded yet: adopted as in sync
        let plan = plan_update(&spec, &observed, &BTreeMap::new()).unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn test_namespace_change_requires_replacement() {
        let spec = ViewSpec {
            schema_name: "analytics".into(),
            ..ViewSpec::new("v", "SELECT 1")
        };
        let observed = observed(
            ObjectType::View,
            &[
                ("id", Some("u2")),
                ("name", Some("v")),
                ("schema_name", Some("public")),
                ("database_name", Some("materialize")),
            ],
        );
        let plan = plan_update(&spec, &observed, &BTreeMap::new()).unwrap();
        assert_eq!(plan.replace, vec!["namespace".to_string()]);
    }

    #[test]
    fn test_role_rename_requires_replacement() {
        let spec = RoleSpec::new("writer");
        let observed = observed(
            ObjectType::Role,
            &[("id", Some("u3")), ("name", Some("reader")), ("inherit", Some("true"))],
        );
        let plan = plan_update(&spec, &observed, &BTreeMap::new()).unwrap();
        assert_eq!(plan.replace, vec!["name".to_string()]);
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn test_secret_value_change_is_redacted() {
        let spec = SecretSpec::new("pw", "s3cret-2");
        let observed = observed(
            ObjectType::Secret,
            &[
                ("id", Some("u4")),
                ("name", Some("pw")),
                ("schema_name", Some("public")),
                ("database_name", Some("materialize")),
            ],
        );
        let mut applied = BTreeMap::new();
        applied.insert("value".to_string(), fingerprint("s3cret-1"));
        let plan = plan_update(&spec, &observed, &applied).unwrap();
        assert_eq!(plan.changes.len(), 1);
        let change = &plan.changes[0];
        assert!(change.sensitive);
        assert!(change.statement.contains("s3cret-2"));
        assert!(!change.display_statement().contains("s3cret-2"));
        assert_eq!(
            change.display_statement(),
            "ALTER SECRET \"materialize\".\"public\".\"pw\" AS '<redacted>';"
        );
    }

    #[test]
    fn test_summary_and_grouping() {
        let diff = |address: &str, ty, action| ObjectDiff {
            address: address.into(),
            object_type: ty,
            name: ObjectName::global(address).to_string(),
            action,
        };
        let diffs = vec![
            diff("cluster.a", ObjectType::Cluster, Action::Create),
            diff("cluster.b", ObjectType::Cluster, Action::NoChange),
            diff("role.r", ObjectType::Role, Action::Delete),
            diff(
                "view.v",
                ObjectType::View,
                Action::Replace {
                    attributes: vec!["definition".into()],
                },
            ),
        ];
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.removals, 1);
        assert_eq!(summary.replacements, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(group_by_type(&diffs)[&ObjectType::Cluster].len(), 2);
    }
}
