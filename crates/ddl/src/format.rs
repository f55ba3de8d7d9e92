//! Data formats and envelopes shared by sources and sinks

use crate::name::ObjectRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Json,
    Text,
    Bytes,
    Avro { csr_connection: ObjectRef },
    Csv { columns: u32 },
}

impl Format {
    pub fn render(&self) -> String {
        match self {
            Self::Json => "FORMAT JSON".into(),
            Self::Text => "FORMAT TEXT".into(),
            Self::Bytes => "FORMAT BYTES".into(),
            Self::Avro { csr_connection } => format!(
                "FORMAT AVRO USING CONFLUENT SCHEMA REGISTRY CONNECTION {}",
                csr_connection.qualified()
            ),
            Self::Csv { columns } => format!("FORMAT CSV WITH {columns} COLUMNS"),
        }
    }

    pub(crate) fn connection(&self) -> Option<&ObjectRef> {
        match self {
            Self::Avro { csr_connection } => Some(csr_connection),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    None,
    Upsert,
    Debezium,
}

impl Envelope {
    pub fn render(self) -> String {
        let keyword = match self {
            Self::None => "NONE",
            Self::Upsert => "UPSERT",
            Self::Debezium => "DEBEZIUM",
        };
        format!("ENVELOPE {keyword}")
    }
}
