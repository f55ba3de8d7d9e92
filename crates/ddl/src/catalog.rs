//! Identity lookups against the catalog introspection relations
//!
//! Every object type maps to one catalog relation. The forward query turns a
//! name into the server-assigned id; the reverse query turns an id back into
//! the current name plus the computed columns drift detection compares.

use crate::error::{Error, Result};
use crate::name::{Namespace, ObjectName};
use crate::object::ObjectType;
use crate::quote::quote_literal;
use std::collections::BTreeMap;

/// One result row, column name to text value (`None` for SQL NULL)
pub type Row = BTreeMap<String, Option<String>>;

const DATABASES: &str = "mz_catalog.mz_databases";
const SCHEMAS: &str = "mz_catalog.mz_schemas";
const CLUSTERS: &str = "mz_catalog.mz_clusters";
const CONNECTIONS: &str = "mz_catalog.mz_connections";
const RELATIONS: &str = "mz_catalog.mz_relations";
const ROLES: &str = "mz_catalog.mz_roles";
const COMMENTS: &str = "mz_internal.mz_comments";

/// How an object's name is scoped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Database,
    Schema,
    /// Indexes: named in the schema of the relation they are built on
    Relation,
    Cluster,
}

/// A column computed for the reverse lookup
#[derive(Debug, Clone, Copy)]
pub struct Computed {
    pub column: &'static str,
    pub expr: &'static str,
    /// Optional relationship, so always a LEFT JOIN
    pub join: Option<&'static str>,
}

const fn col(column: &'static str, expr: &'static str) -> Computed {
    Computed {
        column,
        expr,
        join: None,
    }
}

const IN_CLUSTER: Computed = Computed {
    column: "cluster_name",
    expr: "cl.name",
    join: Some("LEFT JOIN mz_catalog.mz_clusters cl ON cl.id = o.cluster_id"),
};

const VIA_CONNECTION: Computed = Computed {
    column: "connection_name",
    expr: "cn.name",
    join: Some("LEFT JOIN mz_catalog.mz_connections cn ON cn.id = o.connection_id"),
};

/// Catalog relation backing one object type
#[derive(Debug, Clone, Copy)]
pub struct CatalogRelation {
    pub object_type: ObjectType,
    pub relation: &'static str,
    pub scope: Scope,
    /// Has an `owner_id` column
    pub owned: bool,
    pub computed: &'static [Computed],
}

const RELATIONS_BY_TYPE: &[CatalogRelation] = &[
    CatalogRelation {
        object_type: ObjectType::Database,
        relation: DATABASES,
        scope: Scope::Global,
        owned: true,
        computed: &[],
    },
    CatalogRelation {
        object_type: ObjectType::Schema,
        relation: SCHEMAS,
        scope: Scope::Database,
        owned: true,
        computed: &[],
    },
    CatalogRelation {
        object_type: ObjectType::Cluster,
        relation: CLUSTERS,
        scope: Scope::Global,
        owned: true,
        computed: &[
            col("managed", "o.managed::text"),
            col("size", "o.size"),
            col("replication_factor", "o.replication_factor::text"),
            col("disk", "o.disk::text"),
            col("introspection_debugging", "o.introspection_debugging::text"),
        ],
    },
    CatalogRelation {
        object_type: ObjectType::ClusterReplica,
        relation: "mz_catalog.mz_cluster_replicas",
        scope: Scope::Cluster,
        owned: true,
        computed: &[
            col("size", "o.size"),
            col("availability_zone", "o.availability_zone"),
            col("disk", "o.disk::text"),
        ],
    },
    CatalogRelation {
        object_type: ObjectType::Role,
        relation: ROLES,
        scope: Scope::Global,
        owned: false,
        computed: &[col("inherit", "o.inherit::text")],
    },
    CatalogRelation {
        object_type: ObjectType::Secret,
        relation: "mz_catalog.mz_secrets",
        scope: Scope::Schema,
        owned: true,
        computed: &[],
    },
    CatalogRelation {
        object_type: ObjectType::Connection,
        relation: CONNECTIONS,
        scope: Scope::Schema,
        owned: true,
        computed: &[col("connection_type", "o.type")],
    },
    CatalogRelation {
        object_type: ObjectType::Source,
        relation: "mz_catalog.mz_sources",
        scope: Scope::Schema,
        owned: true,
        computed: &[
            col("source_type", "o.type"),
            col("envelope_type", "o.envelope_type"),
            IN_CLUSTER,
            VIA_CONNECTION,
        ],
    },
    CatalogRelation {
        object_type: ObjectType::Sink,
        relation: "mz_catalog.mz_sinks",
        scope: Scope::Schema,
        owned: true,
        computed: &[
            col("sink_type", "o.type"),
            col("envelope_type", "o.envelope_type"),
            IN_CLUSTER,
            VIA_CONNECTION,
        ],
    },
    CatalogRelation {
        object_type: ObjectType::Table,
        relation: "mz_catalog.mz_tables",
        scope: Scope::Schema,
        owned: true,
        computed: &[],
    },
    CatalogRelation {
        object_type: ObjectType::View,
        relation: "mz_catalog.mz_views",
        scope: Scope::Schema,
        owned: true,
        computed: &[],
    },
    CatalogRelation {
        object_type: ObjectType::MaterializedView,
        relation: "mz_catalog.mz_materialized_views",
        scope: Scope::Schema,
        owned: true,
        computed: &[IN_CLUSTER],
    },
    CatalogRelation {
        object_type: ObjectType::Index,
        relation: "mz_catalog.mz_indexes",
        scope: Scope::Relation,
        owned: true,
        computed: &[
            IN_CLUSTER,
            Computed {
                column: "on_name",
                expr: "r.name",
                join: None,
            },
        ],
    },
];

/// Catalog relation for an object type
pub fn relation_for(ty: ObjectType) -> &'static CatalogRelation {
    RELATIONS_BY_TYPE
        .iter()
        .find(|r| r.object_type == ty)
        .unwrap_or_else(|| unreachable!("every object type has a catalog relation"))
}

impl CatalogRelation {
    fn scope_joins(&self) -> String {
        match self.scope {
            Scope::Global => String::new(),
            Scope::Database => format!(" JOIN {DATABASES} d ON o.database_id = d.id"),
            Scope::Schema => format!(
                " JOIN {SCHEMAS} s ON o.schema_id = s.id JOIN {DATABASES} d ON s.database_id = d.id"
            ),
            Scope::Relation => format!(
                " JOIN {RELATIONS} r ON o.on_id = r.id JOIN {SCHEMAS} s ON r.schema_id = s.id JOIN {DATABASES} d ON s.database_id = d.id"
            ),
            Scope::Cluster => format!(" JOIN {CLUSTERS} p ON o.cluster_id = p.id"),
        }
    }

    /// Name -> id. Must match exactly one row.
    pub fn forward_query(&self, name: &ObjectName) -> Result<String> {
        let mut filters = vec![format!("o.name = {}", quote_literal(&name.name))];
        match (self.scope, &name.namespace) {
            (Scope::Global, Namespace::Global) => {}
            (Scope::Database, Namespace::Database(db)) => {
                filters.push(format!("d.name = {}", quote_literal(db)));
            }
            (Scope::Schema | Scope::Relation, Namespace::Schema { database, schema }) => {
                filters.push(format!("s.name = {}", quote_literal(schema)));
                filters.push(format!("d.name = {}", quote_literal(database)));
            }
            (Scope::Cluster, Namespace::Cluster(cluster)) => {
                filters.push(format!("p.name = {}", quote_literal(cluster)));
            }
            _ => {
                return Err(Error::invalid(
                    "name",
                    format!("`{name}` is not a valid {} name", self.object_type),
                ));
            }
        }
        Ok(format!(
            "SELECT o.id FROM {} o{} WHERE {};",
            self.relation,
            self.scope_joins(),
            filters.join(" AND ")
        ))
    }

    /// Id -> current name and computed columns
    pub fn reverse_query(&self, id: &str) -> String {
        let mut columns = vec!["o.id".to_string(), "o.name".to_string()];
        match self.scope {
            Scope::Global => {}
            Scope::Database => columns.push("d.name AS database_name".into()),
            Scope::Schema | Scope::Relation => {
                columns.push("s.name AS schema_name".into());
                columns.push("d.name AS database_name".into());
            }
            Scope::Cluster => columns.push("p.name AS cluster_name".into()),
        }

        let mut joins: Vec<String> = Vec::new();
        if self.owned {
            columns.push("own.name AS owner_name".into());
            joins.push(format!("LEFT JOIN {ROLES} own ON own.id = o.owner_id"));
        }
        columns.push("cm.comment AS comment".into());
        joins.push(format!(
            "LEFT JOIN {COMMENTS} cm ON cm.id = o.id AND cm.object_sub_id IS NULL"
        ));
        for computed in self.computed {
            columns.push(format!("{} AS {}", computed.expr, computed.column));
            if let Some(join) = computed.join
                && !joins.iter().any(|j| j == join)
            {
                joins.push(join.to_string());
            }
        }

        format!(
            "SELECT {} FROM {} o{} {} WHERE o.id = {};",
            columns.join(", "),
            self.relation,
            self.scope_joins(),
            joins.join(" "),
            quote_literal(id)
        )
    }

    /// Rebuild the current name from a reverse lookup row
    pub fn name_from_row(&self, row: &Row) -> Result<ObjectName> {
        let get = |column: &'static str| -> Result<String> {
            row.get(column)
                .cloned()
                .flatten()
                .ok_or_else(|| Error::invalid("row", format!("catalog row has no `{column}`")))
        };
        let name = get("name")?;
        Ok(match self.scope {
            Scope::Global => ObjectName::global(name),
            Scope::Database => ObjectName::in_database(get("database_name")?, name),
            Scope::Schema | Scope::Relation => {
                ObjectName::in_schema(get("database_name")?, get("schema_name")?, name)
            }
            Scope::Cluster => ObjectName::in_cluster(get("cluster_name")?, name),
        })
    }
}
