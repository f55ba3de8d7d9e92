//! Indexes
//!
//! An index lives in the schema of the relation it is built on, so its name
//! is derived from `on` rather than carried by the spec.

use crate::error::{Error, Result};
use crate::name::{ObjectName, ObjectRef};
use crate::object::ObjectType;
use crate::quote::{identifier_list, quote_identifier};
use crate::statement::{Attribute, Ddl, fingerprint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub on: ObjectRef,
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    pub comment: Option<String>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, on: ObjectRef, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            on,
            columns,
            ..Default::default()
        }
    }
}

impl Ddl for IndexSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Index
    }

    fn object_name(&self) -> ObjectName {
        self.on.resolve().renamed(&self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("index")?;
        self.on.validate("index", "on")?;
        if self.columns.is_empty() {
            return Err(Error::missing("index", "columns"));
        }
        Ok(())
    }

    fn create_body(&self) -> Result<String> {
        let mut body = String::new();
        if let Some(cluster) = &self.cluster_name {
            body.push_str(&format!(" IN CLUSTER {}", quote_identifier(cluster)));
        }
        body.push_str(&format!(
            " ON {} USING ARRANGEMENT ({})",
            self.on.qualified(),
            identifier_list(&self.columns)
        ));
        Ok(body)
    }

    /// Index names cannot be qualified at creation
    fn create_sql(&self) -> Result<String> {
        self.validate()?;
        Ok(format!(
            "CREATE INDEX {}{};",
            quote_identifier(&self.name),
            self.create_body()?
        ))
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
}
