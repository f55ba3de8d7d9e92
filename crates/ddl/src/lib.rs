//! # DDL
//!
//! Statement builders for the objects of a Materialize-style catalog.
//!
//! Every object type has a spec struct (deserializable from a manifest) that
//! implements [`Ddl`]: a pure mapping from desired state to `CREATE`,
//! `ALTER ... RENAME TO`, `DROP` and the narrow in-place `ALTER`s. Nothing in
//! this crate talks to a database.
//!
//! ## Quoting
//!
//! Names go through [`quote_identifier`] and values through
//! [`quote_literal`]. References to other objects are typed
//! ([`ObjectRef`]) and always rendered as quoted, dotted names.
//!
//! ## Example
//!
//! ```
//! use ddl::{ConnectionKind, ConnectionSpec, Ddl, ObjectRef};
//!
//! let conn = ConnectionSpec {
//!     brokers: vec!["localhost:9092".into()],
//!     sasl_mechanisms: Some("PLAIN".into()),
//!     sasl_username: Some("user".into()),
//!     sasl_password: Some(ObjectRef::new("pw")),
//!     ..ConnectionSpec::new("kafka_conn", ConnectionKind::Kafka)
//! };
//! assert_eq!(
//!     conn.create_sql().unwrap(),
//!     "CREATE CONNECTION \"materialize\".\"public\".\"kafka_conn\" TO KAFKA \
//!      (BROKERS ('localhost:9092'), SASL MECHANISMS = 'PLAIN', \
//!      SASL USERNAME = 'user', SASL PASSWORD = SECRET \"pw\");"
//! );
//! ```

pub mod catalog;
pub mod clause;
pub mod cluster;
pub mod connection;
pub mod database;
pub mod error;
pub mod format;
pub mod index;
pub mod name;
pub mod object;
pub mod quote;
pub mod role;
pub mod secret;
pub mod sink;
pub mod source;
pub mod statement;
pub mod table;
pub mod view;

pub use catalog::{CatalogRelation, Row, Scope, relation_for};
pub use cluster::{ClusterReplicaSpec, ClusterSpec};
pub use connection::{ConnectionKind, ConnectionSpec};
pub use database::{DatabaseSpec, SchemaSpec};
pub use error::{Error, Result};
pub use format::{Envelope, Format};
pub use index::IndexSpec;
pub use name::{
    DEFAULT_DATABASE, DEFAULT_SCHEMA, Namespace, ObjectName, ObjectRef, ValueOrSecret,
};
pub use object::{DropBehavior, ObjectType};
pub use quote::{identifier_list, literal_list, qualified_name, quote_identifier, quote_literal};
pub use role::RoleSpec;
pub use secret::SecretSpec;
pub use sink::{SinkKind, SinkSpec};
pub use source::{LoadGenerator, SourceKind, SourceSpec, SourceTable};
pub use statement::{
    Attribute, AttributeSource, Ddl, comment_statement, drop_statement, fingerprint,
    owner_statement, rename_statement,
};
pub use table::{Column, TableSpec};
pub use view::{MaterializedViewSpec, ViewSpec};
