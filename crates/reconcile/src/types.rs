//! Core types for reconciliation

use ddl::{Ddl, DropBehavior, ObjectName, ObjectType, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Server-assigned object id
///
/// Opaque: never parsed and never compared with names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectIdentity(String);

impl ObjectIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observed state of one object, as returned by the reverse lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalAttributes {
    pub id: ObjectIdentity,
    pub object_type: ObjectType,
    pub name: ObjectName,
    pub columns: Row,
}

impl CanonicalAttributes {
    /// Value of a catalog column; `None` for NULL and for unknown columns
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).and_then(|v| v.as_deref())
    }
}

/// Result of reading an object back by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Found(CanonicalAttributes),
    /// No row for the id; the caller forgets the identity
    Gone,
}

impl ReadOutcome {
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone)
    }
}

/// What the orchestrator persists for one managed object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub object_type: ObjectType,
    pub id: ObjectIdentity,
    /// Last-applied desired attributes; write-only values are fingerprints
    #[serde(default)]
    pub applied: BTreeMap<String, String>,
    /// Drop behavior the object was created with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_behavior: Option<DropBehavior>,
}

impl Binding {
    pub fn new(object_type: ObjectType, id: ObjectIdentity) -> Self {
        Self {
            object_type,
            id,
            applied: BTreeMap::new(),
            drop_behavior: None,
        }
    }
}

/// A CREATE that ran but whose object could not be found afterwards
///
/// The object most likely exists. Its name is kept so the next plan can look
/// it up instead of issuing the CREATE again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingIdentity {
    pub object_type: ObjectType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop_behavior: Option<DropBehavior>,
    pub name: ObjectName,
}

impl PendingIdentity {
    pub fn of(spec: &dyn Ddl) -> Self {
        Self {
            object_type: spec.object_type(),
            drop_behavior: spec.drop_behavior(),
            name: spec.object_name(),
        }
    }

    /// Binding for the object once its id is known; nothing recorded as applied
    pub fn bind(&self, id: ObjectIdentity) -> Binding {
        Binding {
            drop_behavior: self.drop_behavior,
            ..Binding::new(self.object_type, id)
        }
    }
}

/// Result of applying one planned change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// No changes needed
    NoChange,
    Created,
    Modified,
    /// Dropped and created again
    Replaced,
    Removed,
    /// Apply failed
    Failed { error: String },
    /// Apply was skipped
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Modified | Self::Replaced | Self::Removed
        )
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub modified: usize,
    pub replaced: usize,
    pub removed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub no_change: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.replaced + self.removed
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of objects processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &ExecuteSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.replaced += other.replaced;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Replaced => self.replaced += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of objects reconciled concurrently within a tier
    pub jobs: usize,
    /// Drop and recreate objects whose changes have no in-place path
    pub allow_replace: bool,
    /// How many times identity resolution is retried after an orphaning CREATE
    pub identity_retries: usize,
    /// Pause before each identity retry, multiplied by the attempt number
    pub identity_retry_delay: Duration,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: 4,
            allow_replace: true,
            identity_retries: 2,
            identity_retry_delay: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created);
        summary.add_result(&ApplyResult::Replaced);
        summary.add_result(&ApplyResult::NoChange);
        summary.add_result(&ApplyResult::Failed {
            error: "x".into(),
        });
        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());

        let mut other = ExecuteSummary::default();
        other.merge(&summary);
        assert_eq!(other.replaced, 1);
    }

    #[test]
    fn test_binding_toml_shape() {
        let mut binding = Binding::new(ObjectType::Secret, ObjectIdentity::new("u7"));
        binding
            .applied
            .insert("value".into(), "blake3:abcd".into());
        let text = toml::to_string(&binding).unwrap();
        assert!(text.contains("object_type = \"secret\""));
        assert!(text.contains("id = \"u7\""));
        assert!(!text.contains("drop_behavior"));
        let back: Binding = toml::from_str(&text).unwrap();
        assert_eq!(back, binding);
    }

    #[test]
    fn test_pending_identity_keeps_name_triple() {
        let pending = PendingIdentity {
            object_type: ObjectType::Source,
            drop_behavior: Some(DropBehavior::Cascade),
            name: ObjectName::in_schema("materialize", "public", "pg_src"),
        };
        let text = toml::to_string(&pending).unwrap();
        let back: PendingIdentity = toml::from_str(&text).unwrap();
        assert_eq!(back, pending);

        let binding = pending.bind(ObjectIdentity::new("u5"));
        assert_eq!(binding.object_type, ObjectType::Source);
        assert_eq!(binding.drop_behavior, Some(DropBehavior::Cascade));
        assert!(binding.applied.is_empty());
    }

    #[test]
    fn test_canonical_get_treats_null_as_absent() {
        let mut columns = Row::new();
        columns.insert("comment".into(), None);
        columns.insert("owner_name".into(), Some("admin".into()));
        let attrs = CanonicalAttributes {
            id: ObjectIdentity::new("u1"),
            object_type: ObjectType::Table,
            name: ObjectName::in_schema("materialize", "public", "t"),
            columns,
        };
        assert_eq!(attrs.get("comment"), None);
        assert_eq!(attrs.get("owner_name"), Some("admin"));
        assert_eq!(attrs.get("missing"), None);
    }
}
