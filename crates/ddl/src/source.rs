//! Sources

use crate::clause::{Clause, Kind, KindField, check_kind_fields, render_clauses};
use crate::error::{Error, Result};
use crate::format::{Envelope, Format};
use crate::name::{ObjectName, ObjectRef, default_database, default_schema};
use crate::object::{DropBehavior, ObjectType};
use crate::quote::{join_quoted, quote_identifier, quote_literal};
use crate::statement::{Attribute, Ddl, fingerprint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    LoadGenerator,
    Postgres,
    Kafka,
}

impl SourceKind {
    /// Value of `mz_sources.type`
    pub fn catalog_type(self) -> &'static str {
        match self {
            Self::LoadGenerator => "load-generator",
            Self::Postgres => "postgres",
            Self::Kafka => "kafka",
        }
    }
}

impl Kind for SourceKind {
    fn name(self) -> &'static str {
        match self {
            Self::LoadGenerator => "load_generator",
            Self::Postgres => "postgres",
            Self::Kafka => "kafka",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadGenerator {
    Auction,
    Counter,
    Marketing,
    Tpch,
}

impl LoadGenerator {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Auction => "AUCTION",
            Self::Counter => "COUNTER",
            Self::Marketing => "MARKETING",
            Self::Tpch => "TPCH",
        }
    }
}

/// An upstream table exposed as a subsource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceTable {
    pub name: String,
    pub schema_name: Option<String>,
    pub alias: Option<String>,
}

impl SourceTable {
    fn render(&self) -> String {
        let mut parts = Vec::with_capacity(2);
        if let Some(schema) = &self.schema_name {
            parts.push(schema.as_str());
        }
        parts.push(self.name.as_str());
        match &self.alias {
            Some(alias) => format!("{} AS {}", join_quoted(&parts), quote_identifier(alias)),
            None => join_quoted(&parts),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema_name: String,
    #[serde(default = "default_database")]
    pub database_name: String,
    pub kind: SourceKind,
    pub cluster_name: Option<String>,
    pub owner: Option<String>,
    pub comment: Option<String>,

    // Load generator
    pub load_generator: Option<LoadGenerator>,
    pub tick_interval: Option<String>,

    // Postgres
    pub postgres_connection: Option<ObjectRef>,
    pub publication: Option<String>,
    /// Upstream columns ingested as text, as `schema.table.column`
    #[serde(default)]
    pub text_columns: Vec<String>,

    // Load generator, Postgres
    #[serde(default)]
    pub for_all_tables: bool,
    #[serde(default)]
    pub tables: Vec<SourceTable>,

    // Kafka
    pub kafka_connection: Option<ObjectRef>,
    pub topic: Option<String>,
    pub format: Option<Format>,
    #[serde(default)]
    pub include_key: bool,
    pub envelope: Option<Envelope>,
}

fn postgres_options(s: &SourceSpec) -> String {
    let mut options = Vec::new();
    if let Some(publication) = &s.publication {
        options.push(format!("PUBLICATION {}", quote_literal(publication)));
    }
    if !s.text_columns.is_empty() {
        let columns: Vec<String> = s
            .text_columns
            .iter()
            .map(|c| join_quoted(&c.split('.').collect::<Vec<_>>()))
            .collect();
        options.push(format!("TEXT COLUMNS ({})", columns.join(", ")));
    }
    if options.is_empty() {
        String::new()
    } else {
        format!(" ({})", options.join(", "))
    }
}

const SOURCE_CLAUSES: &[Clause<SourceSpec>] = &[
    Clause {
        keyword: "IN CLUSTER",
        render: |s| {
            s.cluster_name
                .as_deref()
                .map(|c| format!("IN CLUSTER {}", quote_identifier(c)))
        },
    },
    Clause {
        keyword: "FROM LOAD GENERATOR",
        render: |s| {
            s.load_generator.map(|g| match &s.tick_interval {
                Some(tick) => format!(
                    "FROM LOAD GENERATOR {} (TICK INTERVAL {})",
                    g.keyword(),
                    quote_literal(tick)
                ),
                None => format!("FROM LOAD GENERATOR {}", g.keyword()),
            })
        },
    },
    Clause {
        keyword: "FROM POSTGRES CONNECTION",
        render: |s| {
            s.postgres_connection.as_ref().map(|c| {
                format!(
                    "FROM POSTGRES CONNECTION {}{}",
                    c.qualified(),
                    postgres_options(s)
                )
            })
        },
    },
    Clause {
        keyword: "FROM KAFKA CONNECTION",
        render: |s| {
            s.kafka_connection.as_ref().map(|c| match &s.topic {
                Some(topic) => format!(
                    "FROM KAFKA CONNECTION {} (TOPIC {})",
                    c.qualified(),
                    quote_literal(topic)
                ),
                None => format!("FROM KAFKA CONNECTION {}", c.qualified()),
            })
        },
    },
    Clause {
        keyword: "FORMAT",
        render: |s| s.format.as_ref().map(Format::render),
    },
    Clause {
        keyword: "INCLUDE KEY",
        render: |s| s.include_key.then(|| "INCLUDE KEY".to_string()),
    },
    Clause {
        keyword: "ENVELOPE",
        render: |s| s.envelope.map(Envelope::render),
    },
    Clause {
        keyword: "FOR ALL TABLES",
        render: |s| s.for_all_tables.then(|| "FOR ALL TABLES".to_string()),
    },
    Clause {
        keyword: "FOR TABLES",
        render: |s| {
            (!s.tables.is_empty()).then(|| {
                let tables: Vec<String> = s.tables.iter().map(SourceTable::render).collect();
                format!("FOR TABLES ({})", tables.join(", "))
            })
        },
    },
];

use SourceKind::{Kafka, LoadGenerator as Generator, Postgres};

const KIND_FIELDS: &[KindField<SourceSpec, SourceKind>] = &[
    KindField {
        field: "load_generator",
        kinds: &[Generator],
        is_set: |s| s.load_generator.is_some(),
    },
    KindField {
        field: "tick_interval",
        kinds: &[Generator],
        is_set: |s| s.tick_interval.is_some(),
    },
    KindField {
        field: "postgres_connection",
        kinds: &[Postgres],
        is_set: |s| s.postgres_connection.is_some(),
    },
    KindField {
        field: "publication",
        kinds: &[Postgres],
        is_set: |s| s.publication.is_some(),
    },
    KindField {
        field: "text_columns",
        kinds: &[Postgres],
        is_set: |s| !s.text_columns.is_empty(),
    },
    KindField {
        field: "for_all_tables",
        kinds: &[Generator, Postgres],
        is_set: |s| s.for_all_tables,
    },
    KindField {
        field: "tables",
        kinds: &[Generator, Postgres],
        is_set: |s| !s.tables.is_empty(),
    },
    KindField {
        field: "kafka_connection",
        kinds: &[Kafka],
        is_set: |s| s.kafka_connection.is_some(),
    },
    KindField {
        field: "topic",
        kinds: &[Kafka],
        is_set: |s| s.topic.is_some(),
    },
    KindField {
        field: "format",
        kinds: &[Kafka],
        is_set: |s| s.format.is_some(),
    },
    KindField {
        field: "include_key",
        kinds: &[Kafka],
        is_set: |s| s.include_key,
    },
    KindField {
        field: "envelope",
        kinds: &[Kafka],
        is_set: |s| s.envelope.is_some(),
    },
];

impl SourceSpec {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            name: name.into(),
            schema_name: default_schema(),
            database_name: default_database(),
            kind,
            ..Default::default()
        }
    }

    fn has_subsources(&self) -> bool {
        self.for_all_tables || !self.tables.is_empty()
    }
}

impl Ddl for SourceSpec {
    fn object_type(&self) -> ObjectType {
        ObjectType::Source
    }

    fn object_name(&self) -> ObjectName {
        ObjectName::in_schema(&self.database_name, &self.schema_name, &self.name)
    }

    fn validate(&self) -> Result<()> {
        self.object_name().validate("source")?;
        if let Some(csr) = self.format.as_ref().and_then(Format::connection) {
            csr.validate("source", "format")?;
        }
        check_kind_fields(self, self.kind, "source", KIND_FIELDS)?;
        if self.for_all_tables && !self.tables.is_empty() {
            return Err(Error::invalid(
                "tables",
                "`for_all_tables` and `tables` are mutually exclusive",
            ));
        }
        match self.kind {
            Generator if self.load_generator.is_none() => {
                Err(Error::missing("source", "load_generator"))
            }
            Postgres if self.postgres_connection.is_none() => {
                Err(Error::missing("source", "postgres_connection"))
            }
            Postgres if self.publication.is_none() => Err(Error::missing("source", "publication")),
            Postgres if !self.has_subsources() => Err(Error::missing("source", "tables")),
            Kafka if self.kafka_connection.is_none() => {
                Err(Error::missing("source", "kafka_connection"))
            }
            Kafka if self.topic.is_none() => Err(Error::missing("source", "topic")),
            _ => Ok(()),
        }
    }

    fn create_body(&self) -> Result<String> {
        Ok(format!(" {}", render_clauses(self, SOURCE_CLAUSES).join(" ")))
    }

    /// Subsources depend on the source, so the drop must cascade
    fn drop_behavior(&self) -> Option<DropBehavior> {
        self.has_subsources().then_some(DropBehavior::Cascade)
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
                "source_type",
                Some(self.kind.catalog_type().to_string()),
            ),
            Attribute::observed("cluster_name", "cluster_name", self.cluster_name.clone()),
            Attribute::applied("definition", Some(fingerprint(&self.create_body()?))),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_generator_source() {
        let source = SourceSpec {
            cluster_name: Some("quickstart".into()),
            load_generator: Some(LoadGenerator::Auction),
            tick_interval: Some("1s".into()),
            for_all_tables: true,
            ..SourceSpec::new("auction", Generator)
        };
        assert_eq!(
            source.create_sql().unwrap(),
            "CREATE SOURCE \"materialize\".\"public\".\"auction\" IN CLUSTER \"quickstart\" \
             FROM LOAD GENERATOR AUCTION (TICK INTERVAL '1s') FOR ALL TABLES;"
        );
        assert_eq!(
            source.drop_sql(),
            "DROP SOURCE \"materialize\".\"public\".\"auction\" CASCADE;"
        );
    }

    #[test]
    fn test_counter_source_drops_without_cascade() {
        let source = SourceSpec {
            load_generator: Some(LoadGenerator::Counter),
            ..SourceSpec::new("ticks", Generator)
        };
        assert_eq!(
            source.create_sql().unwrap(),
            "CREATE SOURCE \"materialize\".\"public\".\"ticks\" FROM LOAD GENERATOR COUNTER;"
        );
        assert_eq!(
            source.drop_sql(),
            "DROP SOURCE \"materialize\".\"public\".\"ticks\";"
        );
    }

    #[test]
    fn test_postgres_source_with_tables() {
        let source = SourceSpec {
            cluster_name: Some("ingest".into()),
            postgres_connection: Some(ObjectRef::new("pg")),
            publication: Some("mz_source".into()),
            text_columns: vec!["public.orders.status".into()],
            tables: vec![
                SourceTable {
                    name: "orders".into(),
                    schema_name: Some("public".into()),
                    alias: Some("pg_orders".into()),
                },
                SourceTable {
                    name: "items".into(),
                    schema_name: None,
                    alias: None,
                },
            ],
            ..SourceSpec::new("pg_src", Postgres)
        };
        assert_eq!(
            source.create_sql().unwrap(),
            "CREATE SOURCE \"materialize\".\"public\".\"pg_src\" IN CLUSTER \"ingest\" \
             FROM POSTGRES CONNECTION \"pg\" (PUBLICATION 'mz_source', \
             TEXT COLUMNS (\"public\".\"orders\".\"status\")) \
             FOR TABLES (\"public\".\"orders\" AS \"pg_orders\", \"items\");"
        );
    }

    #[test]
    fn test_postgres_source_requires_tables() {
        let source = SourceSpec {
            postgres_connection: Some(ObjectRef::new("pg")),
            publication: Some("p".into()),
            ..SourceSpec::new("pg_src", Postgres)
        };
        assert_eq!(source.create_sql(), Err(Error::missing("source", "tables")));
    }

    #[test]
    fn test_kafka_source() {
        let source = SourceSpec {
            kafka_connection: Some(ObjectRef::new("kafka_conn")),
            topic: Some("events".into()),
            format: Some(Format::Json),
            include_key: true,
            envelope: Some(Envelope::Upsert),
            ..SourceSpec::new("events", Kafka)
        };
        assert_eq!(
            source.create_sql().unwrap(),
            "CREATE SOURCE \"materialize\".\"public\".\"events\" \
             FROM KAFKA CONNECTION \"kafka_conn\" (TOPIC 'events') FORMAT JSON INCLUDE KEY ENVELOPE UPSERT;"
        );
    }

    #[test]
    fn test_kafka_source_rejects_generator_fields() {
        let source = SourceSpec {
            kafka_connection: Some(ObjectRef::new("k")),
            topic: Some("t".into()),
            for_all_tables: true,
            ..SourceSpec::new("s", Kafka)
        };
        assert_eq!(
            source.create_sql(),
            Err(Error::KindMismatch {
                object: "source",
                kind: "kafka",
                field: "for_all_tables",
            })
        );
    }

    #[test]
    fn test_exclusive_table_selection() {
        let source = SourceSpec {
            load_generator: Some(LoadGenerator::Tpch),
            for_all_tables: true,
            tables: vec![SourceTable {
                name: "lineitem".into(),
                schema_name: None,
                alias: None,
            }],
            ..SourceSpec::new("tpch", Generator)
        };
        assert!(matches!(
            source.create_sql(),
            Err(Error::InvalidValue { field: "tables", .. })
        ));
    }
}
