//! The per-object state machine
//!
//! `Absent -> Created -> Synced -> (Updated -> Synced)* -> Absent`. Each call
//! handles one object, builds its statements from an immutable spec and runs
//! them over the shared connection.

use crate::connection::{SqlConnection, SqlError};
use crate::diff::{Action, Change, plan_update, redact};
use crate::error::{ReconcileError, Result};
use crate::types::{Binding, CanonicalAttributes, ObjectIdentity, PendingIdentity, ReadOutcome};
use ddl::{Ddl, DropBehavior, ObjectType, Row, drop_statement, relation_for};
use std::collections::BTreeMap;

/// A freshly created object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: ObjectIdentity,
    pub applied: BTreeMap<String, String>,
}

impl Created {
    pub fn into_binding(self, spec: &dyn Ddl) -> Binding {
        Binding {
            object_type: spec.object_type(),
            id: self.id,
            applied: self.applied,
            drop_behavior: spec.drop_behavior(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Dropped,
    /// Nothing to drop; the identity can be forgotten all the same
    AlreadyGone,
}

pub struct Reconciler<'a> {
    conn: &'a dyn SqlConnection,
}

impl<'a> Reconciler<'a> {
    pub fn new(conn: &'a dyn SqlConnection) -> Self {
        Self { conn }
    }

    fn execute(&self, statement: &str, sensitive: bool) -> Result<()> {
        let shown = if sensitive {
            redact(statement)
        } else {
            statement.to_string()
        };
        log::debug!("executing: {shown}");
        self.conn
            .execute(statement)
            .map_err(|e| statement_error(shown, e))
    }

    fn query(&self, statement: &str) -> std::result::Result<Vec<Row>, SqlError> {
        log::debug!("querying: {statement}");
        self.conn.query(statement)
    }

    /// Run CREATE, then resolve the new object's identity
    ///
    /// A failed CREATE leaves nothing behind. A CREATE whose object cannot be
    /// found afterwards yields [`ReconcileError::Orphaned`]; the CREATE is never
    /// repeated, only [`Self::resolve_identity`] may be retried.
    pub fn create(&self, spec: &dyn Ddl) -> Result<Created> {
        let statement = spec.create_sql()?;
        // Rendering errors surface before anything runs
        spec.applied_attributes()?;
        self.execute(&statement, spec.is_sensitive())?;
        log::info!("created {} {}", spec.object_type(), spec.object_name());

        let id = self.resolve_identity(spec)?;
        self.finish_create(spec, id)
    }

    /// Run the statements that follow a CREATE once the id is known
    ///
    /// Ownership and comments are set here, whether the id came straight
    /// from [`Self::create`] or from a later identity retry.
    pub fn finish_create(&self, spec: &dyn Ddl, id: ObjectIdentity) -> Result<Created> {
        let applied = spec.applied_attributes()?;
        let mut done = Vec::new();
        for (attribute, statement) in spec.post_create_sql() {
            if let Err(e) = self.execute(&statement, false) {
                return Err(ReconcileError::PartialUpdate {
                    id,
                    applied: done,
                    failed: attribute.to_string(),
                    message: e.to_string(),
                });
            }
            done.push(attribute.to_string());
        }
        Ok(Created { id, applied })
    }

    /// Look up an object left behind by an unresolved CREATE
    ///
    /// `None` when no object carries the recorded name.
    pub fn recover(&self, pending: &PendingIdentity) -> Result<Option<ObjectIdentity>> {
        let ty = pending.object_type;
        let query = relation_for(ty).forward_query(&pending.name)?;
        let rows = self.query(&query).map_err(|e| statement_error(query, e))?;
        match rows.as_slice() {
            [] => Ok(None),
            [row] => row
                .get("id")
                .cloned()
                .flatten()
                .map(|id| Some(ObjectIdentity::new(id)))
                .ok_or_else(|| ReconcileError::Orphaned {
                    object_type: ty,
                    name: pending.name.to_string(),
                    reason: "catalog row has no id".into(),
                }),
            _ => Err(ReconcileError::AmbiguousIdentity {
                object_type: ty,
                name: pending.name.to_string(),
                rows: rows.len(),
            }),
        }
    }

    /// Look an object up by its desired name; exactly one row is required
    pub fn resolve_identity(&self, spec: &dyn Ddl) -> Result<ObjectIdentity> {
        let ty = spec.object_type();
        let name = spec.object_name();
        let orphaned = |reason: String| ReconcileError::Orphaned {
            object_type: ty,
            name: name.to_string(),
            reason,
        };
        let query = relation_for(ty).forward_query(&name)?;
        let rows = self.query(&query).map_err(|e| orphaned(e.to_string()))?;
        match rows.as_slice() {
            [] => Err(orphaned("no catalog row matches the name".into())),
            [row] => row
                .get("id")
                .cloned()
                .flatten()
                .map(ObjectIdentity::new)
                .ok_or_else(|| orphaned("catalog row has no id".into())),
            _ => Err(ReconcileError::AmbiguousIdentity {
                object_type: ty,
                name: name.to_string(),
                rows: rows.len(),
            }),
        }
    }

    /// Read an object back by id
    pub fn read(&self, object_type: ObjectType, id: &ObjectIdentity) -> Result<ReadOutcome> {
        let relation = relation_for(object_type);
        let query = relation.reverse_query(id.as_str());
        let rows = self.query(&query).map_err(|e| statement_error(query, e))?;
        match rows.len() {
            0 => {
                log::info!("{object_type} {id} no longer exists");
                Ok(ReadOutcome::Gone)
            }
            1 => {
                let columns = rows.into_iter().next().unwrap_or_default();
                Ok(ReadOutcome::Found(CanonicalAttributes {
                    id: id.clone(),
                    object_type,
                    name: relation.name_from_row(&columns)?,
                    columns,
                }))
            }
            n => Err(ReconcileError::AmbiguousIdentity {
                object_type,
                name: id.to_string(),
                rows: n,
            }),
        }
    }

    /// Canonical attributes of an existing object, for adoption
    pub fn import(&self, object_type: ObjectType, id: &ObjectIdentity) -> Result<CanonicalAttributes> {
        match self.read(object_type, id)? {
            ReadOutcome::Found(attrs) => Ok(attrs),
            ReadOutcome::Gone => Err(ReconcileError::NotFound {
                object_type,
                id: id.clone(),
            }),
        }
    }

    /// Decide what to do with an object, without changing anything
    pub fn plan(&self, spec: &dyn Ddl, binding: Option<&Binding>) -> Result<Action> {
        spec.validate()?;
        let Some(binding) = binding else {
            return Ok(Action::Create);
        };
        let observed = match self.read(binding.object_type, &binding.id)? {
            ReadOutcome::Found(observed) => observed,
            ReadOutcome::Gone => return Ok(Action::Recreate),
        };
        let plan = plan_update(spec, &observed, &binding.applied)?;
        Ok(if plan.requires_replacement() {
            Action::Replace {
                attributes: plan.replace,
            }
        } else if plan.changes.is_empty() {
            Action::NoChange
        } else {
            Action::Update {
                changes: plan.changes,
            }
        })
    }

    /// Bring an existing object to its spec in place
    ///
    /// Returns the attribute keys that changed. Fails without executing
    /// anything when some difference has no in-place path.
    pub fn update(
        &self,
        spec: &dyn Ddl,
        observed: &CanonicalAttributes,
        applied: &BTreeMap<String, String>,
    ) -> Result<Vec<String>> {
        let plan = plan_update(spec, observed, applied)?;
        if plan.requires_replacement() {
            return Err(ReconcileError::ReplacementRequired {
                attributes: plan.replace,
            });
        }
        self.apply_changes(&observed.id, &plan.changes)
    }

    /// Execute planned changes in order, one statement each
    pub fn apply_changes(&self, id: &ObjectIdentity, changes: &[Change]) -> Result<Vec<String>> {
        let mut done = Vec::with_capacity(changes.len());
        for change in changes {
            if let Err(e) = self.execute(&change.statement, change.sensitive) {
                return Err(ReconcileError::PartialUpdate {
                    id: id.clone(),
                    applied: done,
                    failed: change.attribute.clone(),
                    message: e.to_string(),
                });
            }
            done.push(change.attribute.clone());
        }
        Ok(done)
    }

    /// Drop an object by id, under whatever name it currently has
    pub fn delete(
        &self,
        object_type: ObjectType,
        id: &ObjectIdentity,
        behavior: Option<DropBehavior>,
    ) -> Result<DeleteOutcome> {
        let observed = match self.read(object_type, id)? {
            ReadOutcome::Found(observed) => observed,
            ReadOutcome::Gone => return Ok(DeleteOutcome::AlreadyGone),
        };
        let behavior = behavior.or_else(|| object_type.default_drop_behavior());
        self.execute(&drop_statement(object_type, &observed.name, behavior), false)?;
        log::info!("dropped {object_type} {}", observed.name);
        Ok(DeleteOutcome::Dropped)
    }
}

fn statement_error(statement: String, error: SqlError) -> ReconcileError {
    match error {
        SqlError::Database { message, code } => ReconcileError::Sql {
            statement,
            message,
            code,
        },
        SqlError::Connection(message) => ReconcileError::Connection(message),
    }
}
