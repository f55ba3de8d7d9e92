//! Managed clusters and their replicas

use crate::clause::{Clause, render_clauses};
use crate::error::{Error, Result};
use crate::name::ObjectName;
use crate::object::ObjectType;
use crate::quote::quote_literal;
use crate::statement::{Attribute, Ddl};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterSpec {
    #[serde(default)]
    pub name: String,
    pub size: Option<String>,
    pub replication_factor: Option<u32>,
    pub disk: Option<bool>,
    pub introspection_interval: Option<String>,
    pub introspection_debugging: Option<bool>,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

const CLUSTER_OPTIONS: &[Clause<ClusterSpec>] = &[
    Clause {
        keyword: "SIZE",
        render: |c| c.size.as_deref().map(|s| format!("SIZE = {}", quote_literal(s))),
    },
    Clause {
        keyword: "REPLICATION FACTOR",
        render: |c| c.replication_factor.map(|n| format!("REPLICATION FACTOR = {n}")),
    },
    Clause {
        keyword: "DISK",
        render: |c| c.disk.map(|d| format!("DISK = {d}")),
    },
    Clause {
        keyword: "INTROSPECTION INTERVAL",
        render: |c| {
            c.introspection_interval
                .as_deref()
                .map(|i| format!("INTROSPECTION INTERVAL = {}", quote_literal(i)))
        },
    },
    Clause {
        keyword: "INTROSPECTION DEBUGGING",
        render: |c| {
            c.introspection_debugging
                .map(|d| format!("INTROSPECTION DEBUGGING = {d}"))
        },
    },
];

impl ClusterSpec {
    pub fn new(name: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: Some(size.into()),
            ..Default::default()
        }
    }

    fn set_option(&self, option: &str) -> String {
        format!(
            "ALTER CLUSTER {} SET ({option});",
            self.object_name().qualified()
        )
    }

    /// `ALTER CLUSTER <name> SET (SIZE = '<size>');`
    pub fn update_size_sql(&self, size: &str) -> String {
        self.set_option(&format!("SIZE = {}", quote_literal(size)))
    }

    pub fn set_replication_factor_sql(&self, factor: u32) -> String {
        self.set_option(&format!("REPLICATION FACTOR = {factor}"))
    }

    pub fn set_disk_sql(&self, disk: bool) -> String {
        self.set_option(&format!("DISK = {disk}"))
    }

    pub fn set_introspection_interval_sql(&self, interval: &str) -> String {
        self.set_option(&format!(
            "INTROSPECTION INTERVAL = {}",
            quote_literal(interval)
        ))
    }

    pub fn set_introspection_debugging_sql(&self, debugging: bool) -> String {
        self.set_option(&format!("INTROSPECTION DEBUGGING = {debugging}"))
    }
}

impl Ddl for ClusterSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Cluster
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::global(&self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("cluster")?;
        match self.size.as_deref() {
            None | Some("") => Err(Error::missing("cluster", "size")),
            Some(_) => Ok(()),
        }
    }

    fn create_body(&self) -> Result<String> {
        Ok(format!(" ({})", render_clauses(self, CLUSTER_OPTIONS).join(", ")))
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn type_attributes(&self) -> Result<Vec<Attribute>> {
        let mut attrs = Vec::new();
        if let Some(size) = &self.size {
            attrs.push(
                Attribute::observed("size", "size", Some(size.clone()))
                    .with_alter(self.update_size_sql(size)),
            );
        }
        if let Some(factor) = self.replication_factor {
            attrs.push(
                Attribute::observed("replication_factor", "replication_factor", Some(factor.to_string()))
                    .with_alter(self.set_replication_factor_sql(factor)),
            );
        }
        if let Some(disk) = self.disk {
            attrs.push(
                Attribute::observed("disk", "disk", Some(disk.to_string()))
                    .with_alter(self.set_disk_sql(disk)),
            );
        }
        // The catalog renders intervals in its own canonical form
        if let Some(interval) = &self.introspection_interval {
            attrs.push(
                Attribute::applied("introspection_interval", Some(interval.clone()))
                    .with_alter(self.set_introspection_interval_sql(interval)),
            );
        }
        if let Some(debugging) = self.introspection_debugging {
            attrs.push(
                Attribute::observed(
                    "introspection_debugging",
                    "introspection_debugging",
                    Some(debugging.to_string()),
                )
                .with_alter(self.set_introspection_debugging_sql(debugging)),
            );
        }
        Ok(attrs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterReplicaSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cluster_name: String,
    pub size: Option<String>,
    pub availability_zone: Option<String>,
    pub disk: Option<bool>,
    pub introspection_interval: Option<String>,
    pub introspection_debugging: Option<bool>,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

const REPLICA_OPTIONS: &[Clause<ClusterReplicaSpec>] = &[
    Clause {
        keyword: "SIZE",
        render: |r| r.size.as_deref().map(|s| format!("SIZE = {}", quote_literal(s))),
    },
    Clause {
        keyword: "AVAILABILITY ZONE",
        render: |r| {
            r.availability_zone
                .as_deref()
                .map(|z| format!("AVAILABILITY ZONE = {}", quote_literal(z)))
        },
    },
    Clause {
        keyword: "DISK",
        render: |r| r.disk.map(|d| format!("DISK = {d}")),
    },
    Clause {
        keyword: "INTROSPECTION INTERVAL",
        render: |r| {
            r.introspection_interval
                .as_deref()
                .map(|i| format!("INTROSPECTION INTERVAL = {}", quote_literal(i)))
        },
    },
    Clause {
        keyword: "INTROSPECTION DEBUGGING",
        render: |r| {
            r.introspection_debugging
                .map(|d| format!("INTROSPECTION DEBUGGING = {d}"))
        },
    },
];

impl ClusterReplicaSpec {
    pub fn new(
        cluster_name: impl Into<String>,
        name: impl Into<String>,
        size: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cluster_name: cluster_name.into(),
            size: Some(size.into()),
            ..Default::default()
        }
    }
}

impl Ddl for ClusterReplicaSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::ClusterReplica
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_cluster(&self.cluster_name, &self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("cluster_replica")?;
        match self.size.as_deref() {
            None | Some("") => Err(Error::missing("cluster_replica", "size")),
            Some(_) => Ok(()),
        }
    }

    fn create_body(&self) -> Result<String> {
        Ok(format!(" ({})", render_clauses(self, REPLICA_OPTIONS).join(", ")))
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn type_attributes(&self) -> Result<Vec<Attribute>> {
        Ok(vec![
            Attribute::observed("size", "size", self.size.clone()),
            Attribute::observed(
                "availability_zone",
                "availability_zone",
                self.availability_zone.clone(),
            ),
            Attribute::observed("disk", "disk", self.disk.map(|d| d.to_string())),
            Attribute::applied(
                "introspection",
                Some(format!(
                    "{}/{}",
                    self.introspection_interval.as_deref().unwrap_or_default(),
                    self.introspection_debugging.unwrap_or_default()
                )),
            ),
        ])
    }
}
