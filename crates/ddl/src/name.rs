//! Object names and references

use crate::error::{Error, Result};
use crate::quote::{join_quoted, quote_literal};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema applied when a spec does not name one
pub const DEFAULT_SCHEMA: &str = "public";

/// Database applied when a spec does not name one
pub const DEFAULT_DATABASE: &str = "materialize";

pub(crate) fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

pub(crate) fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

/// Where an object's name lives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    /// Databases, clusters, roles
    Global,
    /// Schemas
    Database(String),
    /// Most relations and connections
    Schema { database: String, schema: String },
    /// Cluster replicas
    Cluster(String),
}

/// The name triple of one object
///
/// Equality is syntactic: two names are equal when their parts are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectName {
    pub name: String,
    pub namespace: Namespace,
}

impl ObjectName {
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Global,
            name: name.into(),
        }
    }

    pub fn in_database(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Database(database.into()),
            name: name.into(),
        }
    }

    pub fn in_schema(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Namespace::Schema {
                database: database.into(),
                schema: schema.into(),
            },
            name: name.into(),
        }
    }

    pub fn in_cluster(cluster: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Cluster(cluster.into()),
            name: name.into(),
        }
    }

    /// Name parts, outermost first
    pub fn parts(&self) -> Vec<&str> {
        match &self.namespace {
            Namespace::Global => vec![self.name.as_str()],
            Namespace::Database(db) | Namespace::Cluster(db) => {
                vec![db.as_str(), self.name.as_str()]
            }
            Namespace::Schema { database, schema } => {
                vec![database.as_str(), schema.as_str(), self.name.as_str()]
            }
        }
    }

    /// Dotted, individually quoted reference
    pub fn qualified(&self) -> String {
        join_quoted(&self.parts())
    }

    /// Same namespace, different object name
    pub fn renamed(&self, new_name: impl Into<String>) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: new_name.into(),
        }
    }

    pub fn database(&self) -> Option<&str> {
        match &self.namespace {
            Namespace::Database(db) => Some(db),
            Namespace::Schema { database, .. } => Some(database),
            _ => None,
        }
    }

    pub fn schema(&self) -> Option<&str> {
        match &self.namespace {
            Namespace::Schema { schema, .. } => Some(schema),
            _ => None,
        }
    }

    pub fn cluster(&self) -> Option<&str> {
        match &self.namespace {
            Namespace::Cluster(cluster) => Some(cluster),
            _ => None,
        }
    }

    /// Reject empty parts
    pub fn validate(&self, object: &'static str) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::missing(object, "name"));
        }
        match &self.namespace {
            Namespace::Global => Ok(()),
            Namespace::Database(db) if db.is_empty() => Err(Error::missing(object, "database_name")),
            Namespace::Cluster(c) if c.is_empty() => Err(Error::missing(object, "cluster_name")),
            Namespace::Schema { database, .. } if database.is_empty() => {
                Err(Error::missing(object, "database_name"))
            }
            Namespace::Schema { schema, .. } if schema.is_empty() => {
                Err(Error::missing(object, "schema_name"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts().join("."))
    }
}

/// A reference to another catalog object from inside a clause
///
/// Omitted schema/database parts are resolved by the control plane's
/// search path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectRef {
    pub name: String,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub database_name: Option<String>,
}

impl ObjectRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_name: None,
            database_name: None,
        }
    }

    pub fn qualified_in(
        database: impl Into<String>,
        schema: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            schema_name: Some(schema.into()),
            database_name: Some(database.into()),
        }
    }

    /// Quoted reference with whichever parts are present
    pub fn qualified(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        if let Some(db) = &self.database_name {
            parts.push(db.as_str());
        }
        if let Some(schema) = &self.schema_name {
            parts.push(schema.as_str());
        }
        parts.push(self.name.as_str());
        join_quoted(&parts)
    }

    /// Resolve to a full name, filling defaults for the missing parts
    pub fn resolve(&self) -> ObjectName {
        ObjectName::in_schema(
            self.database_name.clone().unwrap_or_else(default_database),
            self.schema_name.clone().unwrap_or_else(default_schema),
            self.name.clone(),
        )
    }

    pub(crate) fn validate(&self, object: &'static str, field: &'static str) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::missing(object, field));
        }
        Ok(())
    }
}

/// A clause value given either inline or through a secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueOrSecret {
    Text(String),
    Secret { secret: ObjectRef },
}

impl ValueOrSecret {
    /// `'text'` or `SECRET "db"."schema"."name"`
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => quote_literal(text),
            Self::Secret { secret } => format!("SECRET {}", secret.qualified()),
        }
    }
}

impl From<&str> for ValueOrSecret {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<ObjectRef> for ValueOrSecret {
    fn from(secret: ObjectRef) -> Self {
        Self::Secret { secret }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_qualified() {
        let name = ObjectName::in_schema("materialize", "public", "kafka_conn");
        assert_eq!(
            name.qualified(),
            "\"materialize\".\"public\".\"kafka_conn\""
        );
        assert_eq!(name.to_string(), "materialize.public.kafka_conn");
        assert_eq!(ObjectName::global("quickstart").qualified(), "\"quickstart\"");
        assert_eq!(
            ObjectName::in_cluster("c", "r1").qualified(),
            "\"c\".\"r1\""
        );
    }

    #[test]
    fn test_renamed_keeps_namespace() {
        let name = ObjectName::in_schema("d", "s", "old");
        let renamed = name.renamed("new");
        assert_eq!(renamed, ObjectName::in_schema("d", "s", "new"));
        assert_eq!(renamed.schema(), Some("s"));
        assert_eq!(renamed.database(), Some("d"));
    }

    #[test]
    fn test_validate_rejects_empty_parts() {
        assert!(ObjectName::global("").validate("cluster").is_err());
        assert_eq!(
            ObjectName::in_schema("d", "", "x").validate("view"),
            Err(Error::missing("view", "schema_name"))
        );
        assert!(ObjectName::in_schema("d", "s", "x").validate("view").is_ok());
    }

    #[test]
    fn test_object_ref_renders_present_parts() {
        assert_eq!(ObjectRef::new("pw").qualified(), "\"pw\"");
        assert_eq!(
            ObjectRef::qualified_in("materialize", "public", "pw").qualified(),
            "\"materialize\".\"public\".\"pw\""
        );
        assert_eq!(
            ObjectRef::new("pw").resolve(),
            ObjectName::in_schema(DEFAULT_DATABASE, DEFAULT_SCHEMA, "pw")
        );
    }

    #[test]
    fn test_value_or_secret_render() {
        assert_eq!(ValueOrSecret::from("user").render(), "'user'");
        assert_eq!(
            ValueOrSecret::from(ObjectRef::new("pg_user")).render(),
            "SECRET \"pg_user\""
        );
    }

    #[test]
    fn test_value_or_secret_deserializes_both_shapes() {
        #[derive(Deserialize)]
        struct Holder {
            a: ValueOrSecret,
            b: ValueOrSecret,
        }
        let holder: Holder = toml::from_str(
            r#"
            a = "plain"
            b = { secret = { name = "s", schema_name = "private" } }
            "#,
        )
        .unwrap();
        assert_eq!(holder.a, ValueOrSecret::Text("plain".into()));
        assert_eq!(
            holder.b.render(),
            "SECRET \"private\".\"s\""
        );
    }
}
