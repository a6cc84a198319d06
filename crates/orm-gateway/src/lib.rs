//! SQL compilation and execution for resolved queries
//!
//! The compiler is a pure function from a resolved [`Query`] to parameterized
//! SQL text and a positional parameter list. The executor runs compiled
//! statements against PostgreSQL, handling connection-scoped authentication
//! for protected entities and converting rows to JSON.

mod compiler;
mod executor;
mod query;

pub use compiler::{compile, unfold, CompiledQuery};
pub use executor::{ExecutorConfig, QueryExecutor};
pub use query::{AuthContext, Query, QueryLimits};
