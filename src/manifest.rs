//! Desired-state manifest
//!
//! One table per object type, one entry per object, keyed by a stable
//! address key:
//!
//! ```toml
//! [secret.kafka_password]
//! value = "${KAFKA_PASSWORD}"
//!
//! [connection.kafka_conn]
//! kind = "kafka"
//! brokers = ["broker:9092"]
//! sasl_mechanisms = "PLAIN"
//! sasl_username = "svc"
//! sasl_password = { name = "kafka_password" }
//! ```
//!
//! The object name defaults to the key. Secret values may reference
//! environment variables so the manifest itself holds no credentials.

use anyhow::{Context, Result, bail};
use ddl::{
    ClusterReplicaSpec, ClusterSpec, ConnectionSpec, DatabaseSpec, Ddl, IndexSpec,
    MaterializedViewSpec, ObjectType, RoleSpec, SchemaSpec, SecretSpec, SinkSpec, SourceSpec,
    TableSpec, ViewSpec,
};
use reconcile::BoxedSpec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub database: BTreeMap<String, DatabaseSpec>,
    #[serde(default)]
    pub schema: BTreeMap<String, SchemaSpec>,
    #[serde(default)]
    pub cluster: BTreeMap<String, ClusterSpec>,
    #[serde(default)]
    pub cluster_replica: BTreeMap<String, ClusterReplicaSpec>,
    #[serde(default)]
    pub role: BTreeMap<String, RoleSpec>,
    #[serde(default)]
    pub secret: BTreeMap<String, SecretSpec>,
    #[serde(default)]
    pub connection: BTreeMap<String, ConnectionSpec>,
    #[serde(default)]
    pub source: BTreeMap<String, SourceSpec>,
    #[serde(default)]
    pub sink: BTreeMap<String, SinkSpec>,
    #[serde(default)]
    pub table: BTreeMap<String, TableSpec>,
    #[serde(default)]
    pub view: BTreeMap<String, ViewSpec>,
    #[serde(default)]
    pub materialized_view: BTreeMap<String, MaterializedViewSpec>,
    #[serde(default)]
    pub index: BTreeMap<String, IndexSpec>,
}

/// A declared object with its address
#[derive(Debug)]
pub struct Declared {
    pub address: String,
    pub spec: BoxedSpec,
}

/// Manifest address of an object: `type.key`
pub fn address(object_type: ObjectType, key: &str) -> String {
    format!("{}.{key}", object_type.as_str())
}

/// Split an address into its type and key
pub fn parse_address(address: &str) -> Result<(ObjectType, &str)> {
    let Some((ty, key)) = address.split_once('.') else {
        bail!("Invalid address '{address}': expected <type>.<key>");
    };
    let object_type = ObjectType::parse(ty)
        .with_context(|| format!("Invalid address '{address}': unknown object type '{ty}'"))?;
    if key.is_empty() {
        bail!("Invalid address '{address}': empty key");
    }
    Ok((object_type, key))
}

/// Move every entry of one table into `out`, naming unnamed specs after their key
macro_rules! declare {
    ($out:ident, $table:expr, $ty:expr) => {
        for (key, mut spec) in $table {
            if spec.name.is_empty() {
                spec.name = key.clone();
            }
            $out.push(Declared {
                address: address($ty, &key),
                spec: Box::new(spec),
            });
        }
    };
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        log::debug!("Loaded manifest from {}", path.display());
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Every declared object, dependencies first, each one validated
    pub fn into_declared(mut self) -> Result<Vec<Declared>> {
        for (key, secret) in &mut self.secret {
            secret.value = shellexpand::env(&secret.value)
                .map(|v| v.into_owned())
                .with_context(|| {
                    format!("Failed to expand value of {}", address(ObjectType::Secret, key))
                })?;
        }

        let mut out = Vec::new();
        declare!(out, self.database, ObjectType::Database);
        declare!(out, self.schema, ObjectType::Schema);
        declare!(out, self.cluster, ObjectType::Cluster);
        declare!(out, self.cluster_replica, ObjectType::ClusterReplica);
        declare!(out, self.role, ObjectType::Role);
        declare!(out, self.secret, ObjectType::Secret);
        declare!(out, self.connection, ObjectType::Connection);
        declare!(out, self.source, ObjectType::Source);
        declare!(out, self.sink, ObjectType::Sink);
        declare!(out, self.table, ObjectType::Table);
        declare!(out, self.view, ObjectType::View);
        declare!(out, self.materialized_view, ObjectType::MaterializedView);
        declare!(out, self.index, ObjectType::Index);

        for declared in &out {
            declared
                .spec
                .validate()
                .with_context(|| format!("Invalid {}", declared.address))?;
        }
        out.sort_by_key(|d| d.spec.object_type().tier());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
        [cluster.serving]
        size = "25cc"

        [secret.kafka_password]
        value = "hunter2"

        [connection.kafka_conn]
        kind = "kafka"
        brokers = ["localhost:9092"]
        sasl_mechanisms = "PLAIN"
        sasl_username = "user"
        sasl_password = { name = "kafka_password" }

        [view.active_orders]
        name = "orders_active"
        definition = "SELECT * FROM orders WHERE active"
    "#;

    #[test]
    fn test_manifest_objects() {
        let declared = Manifest::parse(MANIFEST).unwrap().into_declared().unwrap();
        let addresses: Vec<&str> = declared.iter().map(|d| d.address.as_str()).collect();
        assert_eq!(addresses.len(), 4);
        assert!(addresses.contains(&"connection.kafka_conn"));
        assert!(addresses.contains(&"view.active_orders"));

        // Dependencies come before dependents
        let pos = |a: &str| addresses.iter().position(|x| *x == a).unwrap();
        assert!(pos("secret.kafka_password") < pos("connection.kafka_conn"));
        assert!(pos("connection.kafka_conn") < pos("view.active_orders"));
    }

    #[test]
    fn test_name_defaults_to_key() {
        let declared = Manifest::parse(MANIFEST).unwrap().into_declared().unwrap();
        let conn = declared
            .iter()
            .find(|d| d.address == "connection.kafka_conn")
            .unwrap();
        assert_eq!(conn.spec.object_name().name, "kafka_conn");
        assert_eq!(
            conn.spec.create_sql().unwrap(),
            "CREATE CONNECTION \"materialize\".\"public\".\"kafka_conn\" TO KAFKA \
             (BROKERS ('localhost:9092'), SASL MECHANISMS = 'PLAIN', \
             SASL USERNAME = 'user', SASL PASSWORD = SECRET \"kafka_password\");"
        );

        let view = declared
            .iter()
            .find(|d| d.address == "view.active_orders")
            .unwrap();
        assert_eq!(view.spec.object_name().name, "orders_active");
    }

    #[test]
    fn test_unknown_table_is_rejected() {
        assert!(Manifest::parse("[warehouse.x]\nsize = \"1\"").is_err());
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        assert!(Manifest::parse("[cluster.x]\nsise = \"25cc\"").is_err());
    }

    #[test]
    fn test_invalid_spec_names_its_address() {
        let manifest = Manifest::parse("[view.empty]\ndefinition = \"\"").unwrap();
        let err = manifest.into_declared().unwrap_err();
        assert!(format!("{err:#}").contains("view.empty"));
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address("materialized_view.totals").unwrap(),
            (ObjectType::MaterializedView, "totals")
        );
        assert!(parse_address("totals").is_err());
        assert!(parse_address("warehouse.x").is_err());
        assert!(parse_address("view.").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mzform.toml");
        fs::write(&path, "[database.analytics]\n").unwrap();
        let declared = Manifest::load(&path).unwrap().into_declared().unwrap();
        assert_eq!(declared[0].address, "database.analytics");
        assert_eq!(declared[0].spec.object_type(), ObjectType::Database);
    }
}
