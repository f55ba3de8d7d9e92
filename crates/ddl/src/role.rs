//! Roles

use crate::error::Result;
use crate::name::ObjectName;
use crate::object::ObjectType;
use crate::statement::{Attribute, Ddl};
use serde::{Deserialize, Serialize};

const fn default_inherit() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_inherit")]
    pub inherit: bool,
    pub comment: Option<String>,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherit: true,
            comment: None,
        }
    }

    fn inherit_keyword(&self) -> &'static str {
        if self.inherit { "INHERIT" } else { "NOINHERIT" }
    }
}

impl Ddl for RoleSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Role
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::global(&self.name)
    }

    fn create_body(&self) -> Result<String> {
        Ok(format!(" {}", self.inherit_keyword()))
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    fn type_attributes(&self) -> Result<Vec<Attribute>> {
        Ok(vec![
            Attribute::observed("inherit", "inherit", Some(self.inherit.to_string())).with_alter(
                format!(
                    "ALTER ROLE {} {};",
                    self.object_name().qualified(),
                    self.inherit_keyword()
                ),
            ),
        ])
    }
}
