//! Secrets
//!
//! The value never leaves this module in clear text except inside the
//! CREATE/ALTER statements, which are flagged sensitive. Persisted state
//! only ever sees its fingerprint.

use crate::error::{Error, Result};
use crate::name::{ObjectName, default_database, default_schema};
use crate::object::ObjectType;
use crate::quote::quote_literal;
use crate::statement::{Attribute, Ddl, fingerprint};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    #[serde(default)]
    pub value: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

impl fmt::Debug for SecretSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSpec")
            .field("name", &self.name)
            .field("schema_name", &self.schema_name)
            .field("database_name", &self.database_name)
            .field("value", &"<redacted>")
            .field("owner", &self.owner)
            .field("comment", &self.comment)
            .finish()
    }
}

impl SecretSpec {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema_name: default_schema(),
            database_name: default_database(),
            value: value.into(),
            owner: None,
            comment: None,
        }
    }

    /// `ALTER SECRET <name> AS '<value>';`
    pub fn update_value_sql(&self, value: &str) -> String {
        format!(
            "ALTER SECRET {} AS {};",
            self.object_name().qualified(),
            quote_literal(value)
        )
    }
}

impl Ddl for SecretSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Secret
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_schema(&self.database_name, &self.schema_name, &self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("secret")?;
        if self.value.is_empty() {
            return Err(Error::missing("secret", "value"));
        }
        Ok(())
    }

    fn create_body(&self) -> Result<String> {
        Ok(format!(" AS {}", quote_literal(&self.value)))
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn type_attributes(&self) -> Result<Vec<Attribute>> {
        Ok(vec![
            Attribute::applied("value", Some(fingerprint(&self.value)))
                .with_alter(self.update_value_sql(&self.value))
                .sensitive(),
        ])
    }

    fn is_sensitive(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_secret() {
        let secret = SecretSpec::new("pw", "it's");
        assert_eq!(
            secret.create_sql().unwrap(),
            "CREATE SECRET \"materialize\".\"public\".\"pw\" AS 'it''s';"
        );
        assert!(secret.is_sensitive());
    }

    #[test]
    fn test_secret_requires_value() {
        assert_eq!(
            SecretSpec::new("pw", "").create_sql(),
            Err(Error::missing("secret", "value"))
        );
    }

    #[test]
    fn test_applied_attributes_hold_fingerprint_only() {
        let secret = SecretSpec::new("pw", "hunter2");
        let applied = secret.applied_attributes().unwrap();
        let value = applied.get("value").unwrap();
        assert!(value.starts_with("blake3:"));
        assert!(!value.contains("hunter2"));
    }

    #[test]
    fn test_value_change_is_sensitive_alter() {
        let secret = SecretSpec::new("pw", "new");
        let attrs = secret.type_attributes().unwrap();
        assert!(attrs[0].sensitive);
        assert_eq!(
            attrs[0].alter.as_deref(),
            Some("ALTER SECRET \"materialize\".\"public\".\"pw\" AS 'new';")
        );
    }

    #[test]
    fn test_debug_redacts_value() {
        let rendered = format!("{:?}", SecretSpec::new("pw", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
