//! Specification generation from PostgreSQL introspection
//!
//! Walks role-membership graphs and table/column grants to decide, per
//! entity and per field, which operations are publicly visible versus which
//! require elevated authentication, assigns REST paths, and serializes the
//! result as the specification document the server consumes.

pub mod derive;
pub mod introspect;
pub mod naming;

pub use derive::generate;
pub use introspect::{introspect, ColumnMetadata, ColumnGrant, Introspection, TableGrant};

/// Inputs for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Database schema to introspect.
    pub schema: String,
    /// Restricts generation to these tables; all tables when absent.
    pub tables: Option<Vec<String>>,
    pub name: String,
    pub description: String,
    pub version: String,
    /// Role identifying publicly available database objects.
    pub pub_role: String,
    /// Role identifying protected objects; tables granted to its group
    /// require authentication. No table is protected when absent.
    pub auth_role: Option<String>,
}
