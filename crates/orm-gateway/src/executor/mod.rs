//! Query execution against PostgreSQL

mod execute;
mod utils;

use sqlx::PgPool;

use crate::query::QueryLimits;

/// Statements and bounds for executing compiled queries.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Opens an authenticated session; bound to (token, device).
    pub auth_query: String,
    /// Closes the authenticated session on the same connection.
    pub end_auth_query: String,
    /// Per-statement timeout in seconds.
    pub query_timeout: u64,
}

/// Executes compiled queries: public entities against the public pool,
/// protected entities on a dedicated elevated connection wrapped in the
/// authentication session statements.
pub struct QueryExecutor {
    public_pool: PgPool,
    auth_pool: Option<PgPool>,
    limits: QueryLimits,
    config: ExecutorConfig,
}

impl QueryExecutor {
    pub fn new(
        public_pool: PgPool,
        auth_pool: Option<PgPool>,
        limits: QueryLimits,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            public_pool,
            auth_pool,
            limits,
            config,
        }
    }
}
