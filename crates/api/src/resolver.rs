//! Query resolution: path segments to an entity-scoped query
//!
//! Walks a request's path against the mounted specifications, enforces
//! authentication gating for protected entities before any filter handling,
//! injects the identifier filter from a trailing path segment, and checks
//! the operation against the entity's permitted CRUD letters.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::header::USER_AGENT;
use axum::http::HeaderMap;
use tracing::debug;

use table_api_config::Config;
use table_api_filters::{append_filter, FilterRegistry, ParserLimits};
use table_api_models::{ApiError, ApiResult, Operation, Specification, ID_FIELD};
use table_api_orm_gateway::{AuthContext, Query};

use crate::device::device_fingerprint;

/// Resolves a request path to a query against one entity. Consumes the
/// configured auth query parameter from `params` for protected entities, so
/// it never reaches filter parsing. The returned query carries the injected
/// identifier filter when a trailing path segment was present.
pub fn resolve(
    specs: &BTreeMap<String, Arc<Specification>>,
    registry: &FilterRegistry,
    config: &Config,
    operation: Operation,
    path: &str,
    headers: &HeaderMap,
    params: &mut Vec<(String, String)>,
) -> ApiResult<Query> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(ApiError::NotFound);
    }

    // locate mount: a matching first segment is consumed, otherwise the
    // whole path belongs to the root mount
    let (spec, mut next) = match specs.get(segments[0]) {
        Some(spec) => (spec, 1),
        None => (specs.get("/").ok_or(ApiError::NotFound)?, 0),
    };

    // locate entity
    let entity = spec
        .entity(segments.get(next).copied().unwrap_or_default())
        .ok_or(ApiError::NotFound)?
        .clone();
    next += 1;

    // protected entities require credentials before anything else
    let auth = if entity.auth {
        let token = headers
            .get(config.api.auth_header.as_str())
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .filter(|t| !t.is_empty())
            .or_else(|| take_param(params, &config.api.auth_param));
        let device = device_fingerprint(
            headers.get(USER_AGENT).and_then(|v| v.to_str().ok()),
        );
        match (token, device) {
            (Some(token), Some(device)) => Some(AuthContext { token, device }),
            _ => return Err(ApiError::Unauthorized),
        }
    } else {
        None
    };

    // a trailing segment becomes an identifier filter when the entity
    // declares one
    let mut filters = Vec::new();
    if let Some(id) = segments.get(next) {
        next += 1;
        if entity.has_field(ID_FIELD) {
            let limits = ParserLimits {
                max_filters: config.api.max_filters,
                max_limit: config.api.max_limit,
            };
            append_filter(
                registry,
                operation,
                &entity,
                ID_FIELD,
                id,
                Some(ID_FIELD),
                limits,
                &mut filters,
            )?;
        }
    }
    if next != segments.len() {
        return Err(ApiError::NotFound);
    }

    // a disallowed operation is indistinguishable from a missing path
    if !entity.allows(operation) {
        return Err(ApiError::NotFound);
    }

    debug!(entity = %entity.name, operation = %operation, "resolved query target");

    Ok(Query {
        operation,
        entity,
        filters,
        payload: None,
        auth,
    })
}

fn take_param(params: &mut Vec<(String, String)>, name: &str) -> Option<String> {
    let at = params.iter().position(|(n, _)| n == name)?;
    let (_, value) = params.remove(at);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
