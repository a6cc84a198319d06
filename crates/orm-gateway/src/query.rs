use serde_json::{Map, Value};

use table_api_filters::FilterClause;
use table_api_models::{Entity, Operation};

/// A resolved query: one per request, discarded after the response.
#[derive(Debug, Clone)]
pub struct Query {
    pub operation: Operation,
    pub entity: Entity,
    /// Parsed filter clauses, in request order.
    pub filters: Vec<FilterClause>,
    /// JSON body for create/update.
    pub payload: Option<Map<String, Value>>,
    /// Credentials, present iff the entity is protected.
    pub auth: Option<AuthContext>,
}

/// Credentials for a protected entity.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub token: String,
    pub device: String,
}

/// Pagination bounds applied to reads.
#[derive(Debug, Clone, Copy)]
pub struct QueryLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}
