//! Catalog object types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Every kind of catalog object the engine manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Database,
    Schema,
    Cluster,
    ClusterReplica,
    Role,
    Secret,
    Connection,
    Source,
    Sink,
    Table,
    View,
    MaterializedView,
    Index,
}

impl ObjectType {
    /// All object types, in declaration order
    pub const ALL: [ObjectType; 13] = [
        Self::Database,
        Self::Schema,
        Self::Cluster,
        Self::ClusterReplica,
        Self::Role,
        Self::Secret,
        Self::Connection,
        Self::Source,
        Self::Sink,
        Self::Table,
        Self::View,
        Self::MaterializedView,
        Self::Index,
    ];

    /// SQL keyword used in CREATE/ALTER/DROP
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Database => "DATABASE",
            Self::Schema => "SCHEMA",
            Self::Cluster => "CLUSTER",
            Self::ClusterReplica => "CLUSTER REPLICA",
            Self::Role => "ROLE",
            Self::Secret => "SECRET",
            Self::Connection => "CONNECTION",
            Self::Source => "SOURCE",
            Self::Sink => "SINK",
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::MaterializedView => "MATERIALIZED VIEW",
            Self::Index => "INDEX",
        }
    }

    /// Snake-case name, as used in manifests and state files
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Schema => "schema",
            Self::Cluster => "cluster",
            Self::ClusterReplica => "cluster_replica",
            Self::Role => "role",
            Self::Secret => "secret",
            Self::Connection => "connection",
            Self::Source => "source",
            Self::Sink => "sink",
            Self::Table => "table",
            Self::View => "view",
            Self::MaterializedView => "materialized_view",
            Self::Index => "index",
        }
    }

    /// Parse the snake-case name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Dependency tier: objects in a lower tier never depend on a higher one
    pub fn tier(self) -> u8 {
        match self {
            Self::Role | Self::Cluster => 0,
            Self::Database => 1,
            Self::Schema | Self::ClusterReplica => 2,
            Self::Secret => 3,
            Self::Connection => 5,
            Self::Source | Self::Table => 6,
            Self::View => 7,
            Self::MaterializedView => 8,
            Self::Index => 9,
            Self::Sink => 10,
        }
    }

    /// Drop qualifier used when none is requested explicitly
    pub fn default_drop_behavior(self) -> Option<DropBehavior> {
        match self {
            Self::Index => Some(DropBehavior::Restrict),
            _ => None,
        }
    }

    /// Whether `ALTER ... RENAME TO` exists for this type
    pub fn supports_rename(self) -> bool {
        !matches!(self, Self::Role)
    }

    /// Whether `ALTER ... OWNER TO` exists for this type
    pub fn supports_owner(self) -> bool {
        !matches!(self, Self::Role | Self::Index)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualifier appended to a DROP statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropBehavior {
    Restrict,
    Cascade,
}

impl DropBehavior {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
        }
    }
}
