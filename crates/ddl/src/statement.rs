//! The statement builder contract shared by every object type

use crate::error::{Error, Result};
use crate::name::ObjectName;
use crate::object::{DropBehavior, ObjectType};
use crate::quote::{quote_identifier, quote_literal};
use std::collections::BTreeMap;
use std::fmt;

/// Where the observed value of an attribute comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeSource {
    /// A column of the reverse catalog lookup
    Observed(&'static str),
    /// The value recorded at the last apply (write-only attributes)
    Applied,
}

/// One managed attribute of an object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub key: &'static str,
    /// Canonical text of the desired value; `None` leaves the attribute unmanaged
    pub desired: Option<String>,
    pub source: AttributeSource,
    /// Statement that moves the object to `desired` in place.
    /// `None` means a change forces replacement.
    pub alter: Option<String>,
    /// The alter statement carries a secret value
    pub sensitive: bool,
}

impl Attribute {
    pub fn observed(key: &'static str, column: &'static str, desired: Option<String>) -> Self {
        Self {
            key,
            desired,
            source: AttributeSource::Observed(column),
            alter: None,
            sensitive: false,
        }
    }

    pub fn applied(key: &'static str, desired: Option<String>) -> Self {
        Self {
            key,
            desired,
            source: AttributeSource::Applied,
            alter: None,
            sensitive: false,
        }
    }

    pub fn with_alter(mut self, statement: String) -> Self {
        self.alter = Some(statement);
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn is_in_place(&self) -> bool {
        self.alter.is_some()
    }
}

/// Statement rendering for one object type
///
/// Implementations are pure: they turn an immutable spec into SQL text and
/// never execute anything.
pub trait Ddl: fmt::Debug + Send + Sync {
    fn object_type(&self) -> ObjectType;

    fn object_name(&self) -> ObjectName;

    /// Check required fields and kind ownership
    fn validate(&self) -> Result<()> {
        self.object_name().validate(self.object_type().as_str())
    }

    /// Everything after `CREATE <TYPE> <name>`, without the terminator
    fn create_body(&self) -> Result<String>;

    fn create_sql(&self) -> Result<String> {
        self.validate()?;
        let body = self.create_body()?;
        Ok(format!(
            "CREATE {} {}{};",
            self.object_type().keyword(),
            self.object_name().qualified(),
            body
        ))
    }

    fn rename_sql(&self, new_name: &str) -> Result<String> {
        rename_statement(self.object_type(), &self.object_name(), new_name)
    }

    fn drop_sql(&self) -> String {
        drop_statement(
            self.object_type(),
            &self.object_name(),
            self.drop_behavior(),
        )
    }

    fn drop_behavior(&self) -> Option<DropBehavior> {
        self.object_type().default_drop_behavior()
    }

    fn owner(&self) -> Option<&str> {
        None
    }

    fn comment(&self) -> Option<&str> {
        None
    }

    /// Attributes specific to this object type
    fn type_attributes(&self) -> Result<Vec<Attribute>> {
        Ok(Vec::new())
    }

    /// Every managed attribute, ownership and comment included
    fn attributes(&self) -> Result<Vec<Attribute>> {
        let ty = self.object_type();
        let name = self.object_name();
        let mut attrs = Vec::new();
        if ty.supports_owner() {
            let owner = self.owner().map(str::to_string);
            let alter = owner.as_deref().map(|role| owner_statement(ty, &name, role));
            attrs.push(Attribute {
                alter,
                ..Attribute::observed("owner", "owner_name", owner)
            });
        }
        let comment = self.comment().map(str::to_string);
        attrs.push(
            Attribute::observed("comment", "comment", comment.clone())
                .with_alter(comment_statement(ty, &name, comment.as_deref())),
        );
        attrs.extend(self.type_attributes()?);
        Ok(attrs)
    }

    /// Statements that run right after CREATE, keyed by attribute: ownership and comment
    fn post_create_sql(&self) -> Vec<(&'static str, String)> {
        let ty = self.object_type();
        let name = self.object_name();
        let mut statements = Vec::new();
        if let Some(owner) = self.owner().filter(|_| ty.supports_owner()) {
            statements.push(("owner", owner_statement(ty, &name, owner)));
        }
        if let Some(comment) = self.comment() {
            statements.push(("comment", comment_statement(ty, &name, Some(comment))));
        }
        statements
    }

    /// Desired attribute values as persisted after an apply
    fn applied_attributes(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .attributes()?
            .into_iter()
            .filter_map(|a| a.desired.map(|d| (a.key.to_string(), d)))
            .collect())
    }

    /// The CREATE statement carries a secret value
    fn is_sensitive(&self) -> bool {
        false
    }

    /// Whether this object may be reconciled alongside others of its tier
    fn can_parallelize(&self) -> bool {
        true
    }
}

/// `ALTER <TYPE> <name> RENAME TO "<new>";`
pub fn rename_statement(ty: ObjectType, name: &ObjectName, new_name: &str) -> Result<String> {
    if !ty.supports_rename() {
        return Err(Error::invalid("name", format!("a {ty} cannot be renamed")));
    }
    if new_name.is_empty() {
        return Err(Error::missing(ty.as_str(), "name"));
    }
    Ok(format!(
        "ALTER {} {} RENAME TO {};",
        ty.keyword(),
        name.qualified(),
        quote_identifier(new_name)
    ))
}

/// `DROP <TYPE> <name>[ RESTRICT| CASCADE];`
pub fn drop_statement(ty: ObjectType, name: &ObjectName, behavior: Option<DropBehavior>) -> String {
    match behavior {
        Some(b) => format!("DROP {} {} {};", ty.keyword(), name.qualified(), b.keyword()),
        None => format!("DROP {} {};", ty.keyword(), name.qualified()),
    }
}

/// `ALTER <TYPE> <name> OWNER TO "<role>";`
pub fn owner_statement(ty: ObjectType, name: &ObjectName, role: &str) -> String {
    format!(
        "ALTER {} {} OWNER TO {};",
        ty.keyword(),
        name.qualified(),
        quote_identifier(role)
    )
}

/// `COMMENT ON <TYPE> <name> IS '<text>';`, or `IS NULL` to clear
pub fn comment_statement(ty: ObjectType, name: &ObjectName, comment: Option<&str>) -> String {
    let value = comment.map_or_else(|| "NULL".to_string(), quote_literal);
    format!("COMMENT ON {} {} IS {};", ty.keyword(), name.qualified(), value)
}

/// Stable digest of a write-only value, safe to persist
pub fn fingerprint(value: &str) -> String {
    format!("blake3:{}", blake3::hash(value.as_bytes()).to_hex())
}
