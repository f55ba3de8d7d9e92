//! Views and materialized views
//!
//! The defining query is SQL written by the operator and is emitted as-is.
//! Views may depend on each other, so they are never created in parallel.

use crate::error::{Error, Result};
use crate::name::{ObjectName, default_database, default_schema};
use crate::object::ObjectType;
use crate::quote::quote_identifier;
use crate::statement::{Attribute, Ddl, fingerprint};
use serde::{Deserialize, Serialize};

fn query_text(definition: &str) -> &str {
    definition.trim().trim_end_matches(';').trim_end()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    #[serde(default)]
    pub definition: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

impl ViewSpec {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_name: default_schema(),
            database_name: default_database(),
            definition: definition.into(),
            ..Default::default()
        }
    }
}

impl Ddl for ViewSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::View
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_schema(&self.database_name, &self.schema_name, &self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("view")?;
        if query_text(&self.definition).is_empty() {
            return Err(Error::missing("view", "definition"));
        }
        Ok(())
    }

    fn create_body(&self) -> Result<String> {
        Ok(format!(" AS {}", query_text(&self.definition)))
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn type_attributes(&self) -> Result<Vec<Attribute>> {
        Ok(vec![Attribute::applied(
            "definition",
            Some(fingerprint(query_text(&self.definition))),
        )])
    }

    fn can_parallelize(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaterializedViewSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    pub cluster_name: Option<String>,
    /// Columns asserted to never be null
    #[serde(default)]
    pub not_null_assertions: Vec<String>,
    #[serde(default)]
    pub definition: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

impl MaterializedViewSpec {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_name: default_schema(),
            database_name: default_database(),
            definition: definition.into(),
            ..Default::default()
        }
    }
}

impl Ddl for MaterializedViewSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::MaterializedView
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_schema(&self.database_name, &self.schema_name, &self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("materialized_view")?;
        if query_text(&self.definition).is_empty() {
            return Err(Error::missing("materialized_view", "definition"));
        }
        Ok(())
    }

    fn create_body(&self) -> Result<String> {
        let mut body = String::new();
        if let Some(cluster) = &self.cluster_name {
            body.push_str(&format!(" IN CLUSTER {}", quote_identifier(cluster)));
        }
        if !self.not_null_assertions.is_empty() {
            let assertions: Vec<String> = self
                .not_null_assertions
                .iter()
                .map(|c| format!("ASSERT NOT NULL {}", quote_identifier(c)))
                .collect();
            body.push_str(&format!(" WITH ({})", assertions.join(", ")));
        }
        body.push_str(&format!(" AS {}", query_text(&self.definition)));
        Ok(body)
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn type_attributes(&self) -> Result<Vec<Attribute>> {
        Ok(vec![
            Attribute::observed("cluster_name", "cluster_name", self.cluster_name.clone()),
            Attribute::applied("definition", Some(fingerprint(&self.create_body()?))),
        ])
    }

    fn can_parallelize(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_view_strips_terminator() {
        let view = ViewSpec::new("v", "  SELECT 1 AS one;\n");
        assert_eq!(
            view.create_sql().unwrap(),
            "CREATE VIEW \"materialize\".\"public\".\"v\" AS SELECT 1 AS one;"
        );
        assert!(!view.can_parallelize());
    }

    #[test]
    fn test_view_requires_definition() {
        assert_eq!(
            ViewSpec::new("v", " ; ").create_sql(),
            Err(Error::missing("view", "definition"))
        );
    }

    #[test]
    fn test_create_materialized_view() {
        let mv = MaterializedViewSpec {
            cluster_name: Some("compute".into()),
            not_null_assertions: vec!["id".into(), "total".into()],
            ..MaterializedViewSpec::new("totals", "SELECT id, sum(amount) AS total FROM orders GROUP BY id")
        };
        assert_eq!(
            mv.create_sql().unwrap(),
            "CREATE MATERIALIZED VIEW \"materialize\".\"public\".\"totals\" IN CLUSTER \"compute\" \
             WITH (ASSERT NOT NULL \"id\", ASSERT NOT NULL \"total\") \
             AS SELECT id, sum(amount) AS total FROM orders GROUP BY id;"
        );
        assert_eq!(
            mv.rename_sql("order_totals").unwrap(),
            "ALTER MATERIALIZED VIEW \"materialize\".\"public\".\"totals\" RENAME TO \"order_totals\";"
        );
    }

    #[test]
    fn test_definition_change_forces_replacement() {
        let view = ViewSpec::new("v", "SELECT 1");
        let attrs = view.type_attributes().unwrap();
        assert_eq!(attrs[0].key, "definition");
        assert!(!attrs[0].is_in_place());
        let other = ViewSpec::new("v", "SELECT 2").type_attributes().unwrap();
        assert_ne!(attrs[0].desired, other[0].desired);
    }
}
