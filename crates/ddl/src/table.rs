//! Tables

use crate::error::{Error, Result};
use crate::name::{ObjectName, default_database, default_schema};
use crate::object::ObjectType;
use crate::quote::quote_identifier;
use crate::statement::{Attribute, Ddl, fingerprint};
use serde::{Deserialize, Serialize};

const fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Default expression, emitted as written
    pub default: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::missing("table", "columns.name"));
        }
        // Type names are spliced in unquoted (`numeric(10, 2)`, `text[]`)
        let allowed = |c: char| c.is_ascii_alphanumeric() || " _(),[].".contains(c);
        if self.type_name.trim().is_empty() || !self.type_name.chars().all(allowed) {
            return Err(Error::invalid(
                "columns.type",
                format!("`{}` is not a valid type name", self.type_name),
            ));
        }
        Ok(())
    }

    fn render(&self) -> String {
        let mut column = format!("{} {}", quote_identifier(&self.name), self.type_name.trim());
        if !self.nullable {
            column.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default {
            column.push_str(&format!(" DEFAULT {default}"));
        }
        column
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            schema_name: default_schema(),
            database_name: default_database(),
            columns,
            ..Default::default()
        }
    }
}

impl Ddl for TableSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Table
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_schema(&self.database_name, &self.schema_name, &self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("table")?;
        for column in &self.columns {
            column.validate()?;
        }
        Ok(())
    }

    fn create_body(&self) -> Result<String> {
        let columns: Vec<String> = self.columns.iter().map(Column::render).collect();
        Ok(format!(" ({})", columns.join(", ")))
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn type_attributes(&self) -> Result<Vec<Attribute>> {
        Ok(vec![Attribute::applied(
            "columns",
            Some(fingerprint(&self.create_body()?)),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table() {
        let table = TableSpec::new(
            "orders",
            vec![
                Column::new("id", "bigint").not_null(),
                Column::new("amount", "numeric(10, 2)"),
                Column {
                    default: Some("'new'".into()),
                    ..Column::new("status", "text")
                },
            ],
        );
        assert_eq!(
            table.create_sql().unwrap(),
            "CREATE TABLE \"materialize\".\"public\".\"orders\" (\"id\" bigint NOT NULL, \
             \"amount\" numeric(10, 2), \"status\" text DEFAULT 'new');"
        );
    }

    #[test]
    fn test_rejects_injected_type_name() {
        let table = TableSpec::new("t", vec![Column::new("a", "int); DROP TABLE x; --")]);
        assert!(matches!(
            table.create_sql(),
            Err(Error::InvalidValue { field: "columns.type", .. })
        ));
    }

    #[test]
    fn test_columns_from_toml() {
        let table: TableSpec = toml::from_str(
            r#"
            name = "t"
            columns = [
                { name = "id", type = "int", nullable = false },
                { name = "tags", type = "text[]" },
            ]
            "#,
        )
        .unwrap();
        assert!(!table.columns[0].nullable);
        assert!(table.columns[1].nullable);
        assert_eq!(
            table.create_sql().unwrap(),
            "CREATE TABLE \"materialize\".\"public\".\"t\" (\"id\" int NOT NULL, \"tags\" text[]);"
        );
    }
}
