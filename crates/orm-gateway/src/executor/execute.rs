//! Main query execution dispatcher

use serde_json::Value;
use tracing::{debug, info, warn};

use table_api_models::{ApiError, ApiResult};

use crate::compiler::{compile, unfold, CompiledQuery};
use crate::query::Query;

use super::QueryExecutor;

impl QueryExecutor {
    /// Compiles and executes a resolved query. `None` means an empty
    /// mutation result (no response body).
    pub async fn execute(&self, query: &Query) -> ApiResult<Option<Value>> {
        let compiled = compile(query, self.limits)?;
        debug!(sql = %compiled.sql, params = compiled.params.len(), "compiled statement");

        let rows = if query.entity.auth {
            self.execute_protected(query, compiled).await?
        } else {
            self.fetch_rows(&self.public_pool, compiled).await?
        };
        Ok(unfold(rows, query))
    }

    /// Runs the compiled statement on a dedicated elevated connection,
    /// bracketed by the authentication session statements. The end statement
    /// is issued on the same connection on every exit path, so an elevated
    /// session never leaks back into the pool.
    async fn execute_protected(
        &self,
        query: &Query,
        compiled: CompiledQuery,
    ) -> ApiResult<Vec<Value>> {
        let auth = query.auth.as_ref().ok_or(ApiError::Unauthorized)?;
        let pool = self
            .auth_pool
            .as_ref()
            .ok_or_else(|| ApiError::Upstream("no auth database configured".to_string()))?;
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| ApiError::Upstream(e.to_string()))?;

        let authenticated: Option<String> = sqlx::query_scalar(&self.config.auth_query)
            .bind(&auth.token)
            .bind(&auth.device)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| ApiError::Upstream(format!("authentication error: {e}")))?
            .flatten();
        let Some(user) = authenticated else {
            return Err(ApiError::Unauthorized);
        };
        info!(user = %user, entity = %query.entity.name, "authenticated session opened");

        let result = self.fetch_rows(&mut *conn, compiled).await;

        if let Err(e) = sqlx::query(&self.config.end_auth_query)
            .execute(&mut *conn)
            .await
        {
            warn!(error = %e, "failed to end authenticated session");
        }

        result
    }
}
