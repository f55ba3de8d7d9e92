//! # Reconcile
//!
//! Converges catalog objects on their declared state.
//!
//! ## Overview
//!
//! For every object the engine:
//! 1. Renders the spec to SQL with the [`ddl`] builders
//! 2. Executes it over a [`SqlConnection`]
//! 3. Resolves the server-assigned [`ObjectIdentity`] by name
//! 4. Later reads the object back by id to detect drift
//! 5. Emits the minimal corrective statements, or a drop and recreate
//!
//! The engine never stores anything itself: callers persist the returned
//! [`Binding`]s and hand them back on the next run.
//!
//! ## Example
//!
//! ```ignore
//! use reconcile::{ConnectionConfig, ExecutionPlan, ExecuteOptions, PgPool, Reconciler};
//!
//! let pool = PgPool::new(ConnectionConfig::default())?;
//! let reconciler = Reconciler::new(&pool);
//! let plan = ExecutionPlan::build(&reconciler, objects, undeclared)?;
//! let report = reconcile::execute_simple(&reconciler, &plan, &ExecuteOptions::default())?;
//! ```

pub mod connection;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod pool;
pub mod reconciler;
pub mod types;

pub use connection::{SqlConnection, SqlError};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{Action, Change, DiffSummary, ObjectDiff, UpdatePlan, group_by_type, plan_update};
pub use error::{ErrorCategory, ReconcileError, Result};
pub use executor::{BindingUpdate, ExecuteReport, Outcome, execute, execute_simple};
pub use planner::{BoxedSpec, ExecutionPlan, ManagedObject, PlannedChange};
pub use pool::{APPLICATION_NAME, ConnectionConfig, PgPool, SslMode};
pub use reconciler::{Created, DeleteOutcome, Reconciler};
pub use types::{
    ApplyResult, Binding, CanonicalAttributes, ExecuteOptions, ExecuteSummary, ObjectIdentity,
    PendingIdentity, ReadOutcome,
};
