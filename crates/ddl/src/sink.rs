//! Sinks

use crate::clause::{Clause, render_clauses};
use crate::error::{Error, Result};
use crate::format::{Envelope, Format};
use crate::name::{ObjectName, ObjectRef, default_database, default_schema};
use crate::object::ObjectType;
use crate::quote::{identifier_list, quote_identifier, quote_literal};
use crate::statement::{Attribute, Ddl, fingerprint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Kafka,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SinkSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    pub kind: SinkKind,
    pub cluster_name: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,
    /// Relation the sink reads from
    #[serde(default)]
    pub from: ObjectRef,
    pub kafka_connection: Option<ObjectRef>,
    pub topic: Option<String>,
    #[serde(default)]
    pub key: Vec<String>,
    #[serde(default)]
    pub key_not_enforced: bool,
    pub format: Option<Format>,
    pub envelope: Option<Envelope>,
    pub snapshot: Option<bool>,
}

const SINK_CLAUSES: &[Clause<SinkSpec>] = &[
    Clause {
        keyword: "IN CLUSTER",
        render: |s| {
            s.cluster_name
                .as_deref()
                .map(|c| format!("IN CLUSTER {}", quote_identifier(c)))
        },
    },
    Clause {
        keyword: "FROM",
        render: |s| Some(format!("FROM {}", s.from.qualified())),
    },
    Clause {
        keyword: "INTO KAFKA CONNECTION",
        render: |s| {
            s.kafka_connection.as_ref().map(|c| match &s.topic {
                Some(topic) => format!(
                    "INTO KAFKA CONNECTION {} (TOPIC {})",
                    c.qualified(),
                    quote_literal(topic)
                ),
                None => format!("INTO KAFKA CONNECTION {}", c.qualified()),
            })
        },
    },
    Clause {
        keyword: "KEY",
        render: |s| {
            (!s.key.is_empty()).then(|| {
                let key = format!("KEY ({})", identifier_list(&s.key));
                if s.key_not_enforced {
                    format!("{key} NOT ENFORCED")
                } else {
                    key
                }
            })
        },
    },
    Clause {
        keyword: "FORMAT",
        render: |s| s.format.as_ref().map(Format::render),
    },
    Clause {
        keyword: "ENVELOPE",
        render: |s| s.envelope.map(Envelope::render),
    },
    Clause {
        keyword: "WITH",
        render: |s| s.snapshot.map(|snap| format!("WITH (SNAPSHOT = {snap})")),
    },
];

impl SinkSpec {
    pub fn new(name: impl Into<String>, from: ObjectRef) -> Self {
        Self {
            name: name.into(),
            schema_name: default_schema(),
            database_name: default_database(),
            from,
            ..Default::default()
        }
    }
}

impl Ddl for SinkSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Sink
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_schema(&self.database_name, &self.schema_name, &self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("sink")?;
        if let Some(csr) = self.format.as_ref().and_then(Format::connection) {
            csr.validate("sink", "format")?;
        }
        self.from.validate("sink", "from")?;
        if self.kafka_connection.is_none() {
            return Err(Error::missing("sink", "kafka_connection"));
        }
        if self.topic.is_none() {
            return Err(Error::missing("sink", "topic"));
        }
        if self.format.is_none() {
            return Err(Error::missing("sink", "format"));
        }
        match self.envelope {
            None => Err(Error::missing("sink", "envelope")),
            Some(Envelope::None) => Err(Error::invalid(
                "envelope",
                "a Kafka sink needs an UPSERT or DEBEZIUM envelope",
            )),
            Some(Envelope::Upsert) if self.key.is_empty() => Err(Error::missing("sink", "key")),
            _ if self.key_not_enforced && self.key.is_empty() => {
                Err(Error::missing("sink", "key"))
            }
            _ => Ok(()),
        }
    }

    fn create_body(&self) -> Result<String> {
        Ok(format!(" {}", render_clauses(self, SINK_CLAUSES).join(" ")))
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> SinkSpec {
        SinkSpec {
            cluster_name: Some("egress".into()),
            kafka_connection: Some(ObjectRef::new("kafka_conn")),
            topic: Some("orders-out".into()),
            key: vec!["id".into()],
            key_not_enforced: true,
            format: Some(Format::Json),
            envelope: Some(Envelope::Upsert),
            snapshot: Some(false),
            ..SinkSpec::new("orders_sink", ObjectRef::qualified_in("materialize", "public", "orders"))
        }
    }

    #[test]
    fn test_create_kafka_sink() {
        assert_eq!(
            sink().create_sql().unwrap(),
            "CREATE SINK \"materialize\".\"public\".\"orders_sink\" IN CLUSTER \"egress\" \
             FROM \"materialize\".\"public\".\"orders\" \
             INTO KAFKA CONNECTION \"kafka_conn\" (TOPIC 'orders-out') \
             KEY (\"id\") NOT ENFORCED FORMAT JSON ENVELOPE UPSERT WITH (SNAPSHOT = false);"
        );
    }

    #[test]
    fn test_upsert_needs_key() {
        let spec = SinkSpec {
            key: Vec::new(),
            key_not_enforced: false,
            ..sink()
        };
        assert_eq!(spec.create_sql(), Err(Error::missing("sink", "key")));
    }

    #[test]
    fn test_envelope_none_rejected() {
        let spec = SinkSpec {
            envelope: Some(Envelope::None),
            ..sink()
        };
        assert!(matches!(
            spec.create_sql(),
            Err(Error::InvalidValue { field: "envelope", .. })
        ));
    }

    #[test]
    fn test_debezium_without_key() {
        let spec = SinkSpec {
            key: Vec::new(),
            key_not_enforced: false,
            envelope: Some(Envelope::Debezium),
            snapshot: None,
            cluster_name: None,
            ..sink()
        };
        assert_eq!(
            spec.create_sql().unwrap(),
            "CREATE SINK \"materialize\".\"public\".\"orders_sink\" \
             FROM \"materialize\".\"public\".\"orders\" \
             INTO KAFKA CONNECTION \"kafka_conn\" (TOPIC 'orders-out') FORMAT JSON ENVELOPE DEBEZIUM;"
        );
    }
}
