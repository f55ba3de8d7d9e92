//! Connections
//!
//! A connection is a composite type: the kind picks the clause list, and
//! fields belonging to another kind are rejected rather than ignored.

use crate::clause::{Clause, Kind, KindField, check_kind_fields, render_clauses};
use crate::error::{Error, Result};
use crate::name::{ObjectName, ObjectRef, ValueOrSecret, default_database, default_schema};
use crate::object::ObjectType;
use crate::quote::{literal_list, quote_literal};
use crate::statement::{Attribute, Ddl, fingerprint};
use serde::{Deserialize, Serialize};

const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_SSH_PORT: u16 = 22;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    #[default]
    Kafka,
    Postgres,
    SshTunnel,
    AwsPrivatelink,
    ConfluentSchemaRegistry,
}

impl ConnectionKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Kafka => "KAFKA",
            Self::Postgres => "POSTGRES",
            Self::SshTunnel => "SSH TUNNEL",
            Self::AwsPrivatelink => "AWS PRIVATELINK",
            Self::ConfluentSchemaRegistry => "CONFLUENT SCHEMA REGISTRY",
        }
    }

    /// Value of `mz_connections.type`
    pub fn catalog_type(self) -> &'static str {
        match self {
            Self::Kafka => "kafka",
            Self::Postgres => "postgres",
            Self::SshTunnel => "ssh-tunnel",
            Self::AwsPrivatelink => "aws-privatelink",
            Self::ConfluentSchemaRegistry => "confluent-schema-registry",
        }
    }

    fn clauses(self) -> &'static [Clause<ConnectionSpec>] {
        match self {
            Self::Kafka => KAFKA,
            Self::Postgres => POSTGRES,
            Self::SshTunnel => SSH_TUNNEL,
            Self::AwsPrivatelink => AWS_PRIVATELINK,
            Self::ConfluentSchemaRegistry => CONFLUENT_SCHEMA_REGISTRY,
        }
    }
}

impl Kind for ConnectionKind {
    fn name(self) -> &'static str {
        match self {
            Self::Kafka => "kafka",
            Self::Postgres => "postgres",
            Self::SshTunnel => "ssh_tunnel",
            Self::AwsPrivatelink => "aws_privatelink",
            Self::ConfluentSchemaRegistry => "confluent_schema_registry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    pub kind: ConnectionKind,
    pub owner: Option<String>,
    pub comment: Option<String>,
    /// `WITH (VALIDATE = ...)`
    pub validate: Option<bool>,

    // Kafka
    #[serde(default)]
    pub brokers: Vec<String>,
    pub progress_topic: Option<String>,
    pub sasl_mechanisms: Option<String>,
    pub sasl_username: Option<ValueOrSecret>,
    pub sasl_password: Option<ObjectRef>,

    // Postgres, SSH tunnel
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<ValueOrSecret>,
    pub database: Option<String>,
    pub ssl_mode: Option<String>,

    // Postgres, schema registry
    pub password: Option<ObjectRef>,
    pub aws_privatelink: Option<ObjectRef>,

    // Kafka, Postgres, schema registry
    pub ssl_certificate_authority: Option<ValueOrSecret>,
    pub ssl_certificate: Option<ValueOrSecret>,
    pub ssl_key: Option<ObjectRef>,
    pub ssh_tunnel: Option<ObjectRef>,

    // Schema registry
    pub url: Option<String>,
    pub username: Option<ValueOrSecret>,

    // AWS PrivateLink
    pub service_name: Option<String>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
}

fn secret_of(value: &Option<ValueOrSecret>) -> Option<&ObjectRef> {
    match value {
        Some(ValueOrSecret::Secret { secret }) => Some(secret),
        _ => None,
    }
}

fn secret(r: &ObjectRef) -> String {
    format!("SECRET {}", r.qualified())
}

const KAFKA: &[Clause<ConnectionSpec>] = &[
    Clause {
        keyword: "BROKERS",
        render: |c| (!c.brokers.is_empty()).then(|| format!("BROKERS ({})", literal_list(&c.brokers))),
    },
    Clause {
        keyword: "PROGRESS TOPIC",
        render: |c| {
            c.progress_topic
                .as_deref()
                .map(|t| format!("PROGRESS TOPIC = {}", quote_literal(t)))
        },
    },
    Clause {
        keyword: "SSL CERTIFICATE AUTHORITY",
        render: |c| {
            c.ssl_certificate_authority
                .as_ref()
                .map(|v| format!("SSL CERTIFICATE AUTHORITY = {}", v.render()))
        },
    },
    Clause {
        keyword: "SSL CERTIFICATE",
        render: |c| {
            c.ssl_certificate
                .as_ref()
                .map(|v| format!("SSL CERTIFICATE = {}", v.render()))
        },
    },
    Clause {
        keyword: "SSL KEY",
        render: |c| c.ssl_key.as_ref().map(|k| format!("SSL KEY = {}", secret(k))),
    },
    Clause {
        keyword: "SASL MECHANISMS",
        render: |c| {
            c.sasl_mechanisms
                .as_deref()
                .map(|m| format!("SASL MECHANISMS = {}", quote_literal(m)))
        },
    },
    Clause {
        keyword: "SASL USERNAME",
        render: |c| {
            c.sasl_username
                .as_ref()
                .map(|u| format!("SASL USERNAME = {}", u.render()))
        },
    },
    Clause {
        keyword: "SASL PASSWORD",
        render: |c| {
            c.sasl_password
                .as_ref()
                .map(|p| format!("SASL PASSWORD = {}", secret(p)))
        },
    },
    Clause {
        keyword: "SSH TUNNEL",
        render: |c| c.ssh_tunnel.as_ref().map(|t| format!("SSH TUNNEL {}", t.qualified())),
    },
];

const POSTGRES: &[Clause<ConnectionSpec>] = &[
    Clause {
        keyword: "HOST",
        render: |c| c.host.as_deref().map(|h| format!("HOST {}", quote_literal(h))),
    },
    Clause {
        keyword: "PORT",
        render: |c| Some(format!("PORT {}", c.port.unwrap_or(DEFAULT_POSTGRES_PORT))),
    },
    Clause {
        keyword: "USER",
        render: |c| c.user.as_ref().map(|u| format!("USER {}", u.render())),
    },
    Clause {
        keyword: "PASSWORD",
        render: |c| c.password.as_ref().map(|p| format!("PASSWORD {}", secret(p))),
    },
    Clause {
        keyword: "SSL MODE",
        render: |c| c.ssl_mode.as_deref().map(|m| format!("SSL MODE {}", quote_literal(m))),
    },
    Clause {
        keyword: "SSH TUNNEL",
        render: |c| c.ssh_tunnel.as_ref().map(|t| format!("SSH TUNNEL {}", t.qualified())),
    },
    Clause {
        keyword: "SSL CERTIFICATE AUTHORITY",
        render: |c| {
            c.ssl_certificate_authority
                .as_ref()
                .map(|v| format!("SSL CERTIFICATE AUTHORITY {}", v.render()))
        },
    },
    Clause {
        keyword: "SSL CERTIFICATE",
        render: |c| {
            c.ssl_certificate
                .as_ref()
                .map(|v| format!("SSL CERTIFICATE {}", v.render()))
        },
    },
    Clause {
        keyword: "SSL KEY",
        render: |c| c.ssl_key.as_ref().map(|k| format!("SSL KEY {}", secret(k))),
    },
    Clause {
        keyword: "AWS PRIVATELINK",
        render: |c| {
            c.aws_privatelink
                .as_ref()
                .map(|p| format!("AWS PRIVATELINK {}", p.qualified()))
        },
    },
    Clause {
        keyword: "DATABASE",
        render: |c| c.database.as_deref().map(|d| format!("DATABASE {}", quote_literal(d))),
    },
];

const SSH_TUNNEL: &[Clause<ConnectionSpec>] = &[
    Clause {
        keyword: "HOST",
        render: |c| c.host.as_deref().map(|h| format!("HOST {}", quote_literal(h))),
    },
    Clause {
        keyword: "USER",
        render: |c| c.user.as_ref().map(|u| format!("USER {}", u.render())),
    },
    Clause {
        keyword: "PORT",
        render: |c| Some(format!("PORT {}", c.port.unwrap_or(DEFAULT_SSH_PORT))),
    },
];

const AWS_PRIVATELINK: &[Clause<ConnectionSpec>] = &[
    Clause {
        keyword: "SERVICE NAME",
        render: |c| {
            c.service_name
                .as_deref()
                .map(|s| format!("SERVICE NAME {}", quote_literal(s)))
        },
    },
    Clause {
        keyword: "AVAILABILITY ZONES",
        render: |c| {
            (!c.availability_zones.is_empty())
                .then(|| format!("AVAILABILITY ZONES ({})", literal_list(&c.availability_zones)))
        },
    },
];

const CONFLUENT_SCHEMA_REGISTRY: &[Clause<ConnectionSpec>] = &[
    Clause {
        keyword: "URL",
        render: |c| c.url.as_deref().map(|u| format!("URL {}", quote_literal(u))),
    },
    Clause {
        keyword: "USERNAME",
        render: |c| c.username.as_ref().map(|u| format!("USERNAME = {}", u.render())),
    },
    Clause {
        keyword: "PASSWORD",
        render: |c| c.password.as_ref().map(|p| format!("PASSWORD = {}", secret(p))),
    },
    Clause {
        keyword: "SSL CERTIFICATE AUTHORITY",
        render: |c| {
            c.ssl_certificate_authority
                .as_ref()
                .map(|v| format!("SSL CERTIFICATE AUTHORITY = {}", v.render()))
        },
    },
    Clause {
        keyword: "SSL CERTIFICATE",
        render: |c| {
            c.ssl_certificate
                .as_ref()
                .map(|v| format!("SSL CERTIFICATE = {}", v.render()))
        },
    },
    Clause {
        keyword: "SSL KEY",
        render: |c| c.ssl_key.as_ref().map(|k| format!("SSL KEY = {}", secret(k))),
    },
    Clause {
        keyword: "SSH TUNNEL",
        render: |c| c.ssh_tunnel.as_ref().map(|t| format!("SSH TUNNEL {}", t.qualified())),
    },
    Clause {
        keyword: "AWS PRIVATELINK",
        render: |c| {
            c.aws_privatelink
                .as_ref()
                .map(|p| format!("AWS PRIVATELINK {}", p.qualified()))
        },
    },
];

use ConnectionKind::{AwsPrivatelink, ConfluentSchemaRegistry, Kafka, Postgres, SshTunnel};

const KIND_FIELDS: &[KindField<ConnectionSpec, ConnectionKind>] = &[
    KindField {
        field: "brokers",
        kinds: &[Kafka],
        is_set: |c| !c.brokers.is_empty(),
    },
    KindField {
        field: "progress_topic",
        kinds: &[Kafka],
        is_set: |c| c.progress_topic.is_some(),
    },
    KindField {
        field: "sasl_mechanisms",
        kinds: &[Kafka],
        is_set: |c| c.sasl_mechanisms.is_some(),
    },
    KindField {
        field: "sasl_username",
        kinds: &[Kafka],
        is_set: |c| c.sasl_username.is_some(),
    },
    KindField {
        field: "sasl_password",
        kinds: &[Kafka],
        is_set: |c| c.sasl_password.is_some(),
    },
    KindField {
        field: "host",
        kinds: &[Postgres, SshTunnel],
        is_set: |c| c.host.is_some(),
    },
    KindField {
        field: "port",
        kinds: &[Postgres, SshTunnel],
        is_set: |c| c.port.is_some(),
    },
    KindField {
        field: "user",
        kinds: &[Postgres, SshTunnel],
        is_set: |c| c.user.is_some(),
    },
    KindField {
        field: "database",
        kinds: &[Postgres],
        is_set: |c| c.database.is_some(),
    },
    KindField {
        field: "ssl_mode",
        kinds: &[Postgres],
        is_set: |c| c.ssl_mode.is_some(),
    },
    KindField {
        field: "password",
        kinds: &[Postgres, ConfluentSchemaRegistry],
        is_set: |c| c.password.is_some(),
    },
    KindField {
        field: "aws_privatelink",
        kinds: &[Postgres, ConfluentSchemaRegistry],
        is_set: |c| c.aws_privatelink.is_some(),
    },
    KindField {
        field: "ssl_certificate_authority",
        kinds: &[Kafka, Postgres, ConfluentSchemaRegistry],
        is_set: |c| c.ssl_certificate_authority.is_some(),
    },
    KindField {
        field: "ssl_certificate",
        kinds: &[Kafka, Postgres, ConfluentSchemaRegistry],
        is_set: |c| c.ssl_certificate.is_some(),
    },
    KindField {
        field: "ssl_key",
        kinds: &[Kafka, Postgres, ConfluentSchemaRegistry],
        is_set: |c| c.ssl_key.is_some(),
    },
    KindField {
        field: "ssh_tunnel",
        kinds: &[Kafka, Postgres, ConfluentSchemaRegistry],
        is_set: |c| c.ssh_tunnel.is_some(),
    },
    KindField {
        field: "url",
        kinds: &[ConfluentSchemaRegistry],
        is_set: |c| c.url.is_some(),
    },
    KindField {
        field: "username",
        kinds: &[ConfluentSchemaRegistry],
        is_set: |c| c.username.is_some(),
    },
    KindField {
        field: "service_name",
        kinds: &[AwsPrivatelink],
        is_set: |c| c.service_name.is_some(),
    },
    KindField {
        field: "availability_zones",
        kinds: &[AwsPrivatelink],
        is_set: |c| !c.availability_zones.is_empty(),
    },
];

impl ConnectionSpec {
    pub fn new(name: impl Into<String>, kind: ConnectionKind) -> Self {
        Self {
            name: name.into(),
            schema_name: default_schema(),
            database_name: default_database(),
            kind,
            ..Default::default()
        }
    }

    pub fn in_schema(mut self, database: impl Into<String>, schema: impl Into<String>) -> Self {
        self.database_name = database.into();
        self.schema_name = schema.into();
        self
    }

    /// Keywords of the clauses this spec renders
    pub fn clause_keywords(&self) -> Vec<&'static str> {
        crate::clause::populated_keywords(self, self.kind.clauses())
    }

    fn require_present(&self) -> Result<()> {
        let missing = |field| Err(Error::missing("connection", field));
        match self.kind {
            Kafka if self.brokers.is_empty() => missing("brokers"),
            Postgres if self.host.is_none() => missing("host"),
            Postgres if self.user.is_none() => missing("user"),
            Postgres if self.database.is_none() => missing("database"),
            SshTunnel if self.host.is_none() => missing("host"),
            SshTunnel if self.user.is_none() => missing("user"),
            AwsPrivatelink if self.service_name.is_none() => missing("service_name"),
            AwsPrivatelink if self.availability_zones.is_empty() => missing("availability_zones"),
            ConfluentSchemaRegistry if self.url.is_none() => missing("url"),
            _ => Ok(()),
        }
    }

    fn references(&self) -> impl Iterator<Item = (&'static str, &ObjectRef)> {
        [
            ("sasl_password", self.sasl_password.as_ref()),
            ("password", self.password.as_ref()),
            ("ssl_key", self.ssl_key.as_ref()),
            ("ssh_tunnel", self.ssh_tunnel.as_ref()),
            ("aws_privatelink", self.aws_privatelink.as_ref()),
            ("sasl_username", secret_of(&self.sasl_username)),
            ("user", secret_of(&self.user)),
            ("username", secret_of(&self.username)),
            ("ssl_certificate_authority", secret_of(&self.ssl_certificate_authority)),
            ("ssl_certificate", secret_of(&self.ssl_certificate)),
        ]
        .into_iter()
        .filter_map(|(field, r)| r.map(|r| (field, r)))
    }
}

impl Ddl for ConnectionSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Connection
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_schema(&self.database_name, &self.schema_name, &self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("connection")?;
        check_kind_fields(self, self.kind, "connection", KIND_FIELDS)?;
        self.require_present()?;
        if self.kind == SshTunnel && matches!(self.user, Some(ValueOrSecret::Secret { .. })) {
            return Err(Error::invalid("user", "an SSH tunnel user must be plain text"));
        }
        for (field, r) in self.references() {
            r.validate("connection", field)?;
        }
        Ok(())
    }

    fn create_body(&self) -> Result<String> {
        let clauses = render_clauses(self, self.kind.clauses());
        let mut body = format!(" TO {} ({})", self.kind.keyword(), clauses.join(", "));
        if let Some(validate) = self.validate {
            body.push_str(&format!(" WITH (VALIDATE = {validate})"));
        }
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
            Attribute::observed(
                "kind",
                "connection_type",
                Some(self.kind.catalog_type().to_string()),
            ),
            Attribute::applied("definition", Some(fingerprint(&self.create_body()?))),
        ])
    }
}
