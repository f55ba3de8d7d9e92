//! Databases and schemas

use crate::name::{ObjectName, default_database};
use crate::object::ObjectType;
use crate::statement::Ddl;
use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSpec {
    #[serde(default)]
    pub name: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

impl DatabaseSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Ddl for DatabaseSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Database
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::global(&self.name)
    }

    fn create_body(&self) -> Result<String> {
        Ok(String::new())
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    pub owner: Option<String>,
    pub comment: Option<String>,
}

impl SchemaSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database_name: default_database(),
            owner: None,
            comment: None,
        }
    }
}

impl Ddl for SchemaSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Schema
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_database(&self.database_name, &self.name)
    }

    fn create_body(&self) -> Result<String> {
        Ok(String::new())
    }

    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}
