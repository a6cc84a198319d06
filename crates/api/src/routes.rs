//! HTTP route handlers

use axum::extract::{Path, Query as QueryParams, State};
use axum::http::header::CACHE_CONTROL;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use table_api_filters::parse_params;
use table_api_models::{ApiError, ApiResult, ErrorBody, Operation};

use crate::state::AppState;
use crate::{resolver, validators};

/// Builds the API router: the specification document at the root, CRUD
/// dispatch everywhere below it.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(spec_document))
        .route(
            "/*path",
            get(dispatch).post(dispatch).patch(dispatch).delete(dispatch),
        )
        .with_state(state)
}

/// Returns the mounted specification document(s) verbatim.
async fn spec_document(State(state): State<AppState>) -> Response {
    let mut document = Map::new();
    for (mount, spec) in state.specs.iter() {
        match serde_json::to_value(spec.as_ref()) {
            Ok(value) => {
                document.insert(mount.clone(), value);
            }
            Err(e) => return error_response(&ApiError::Upstream(e.to_string())),
        }
    }
    Json(Value::Object(document)).into_response()
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    Path(path): Path<String>,
    headers: HeaderMap,
    QueryParams(params): QueryParams<Vec<(String, String)>>,
    body: Option<Json<Value>>,
) -> Response {
    let Some(operation) = operation_for(&method) else {
        warn!(method = %method, "method reached dispatch without an operation mapping");
        return error_response(&ApiError::Upstream(format!(
            "request method {method} has no mapping to api operation"
        )));
    };
    let payload = body.and_then(|Json(value)| match value {
        Value::Object(map) => Some(map),
        _ => None,
    });

    match handle(&state, operation, &path, &headers, params, payload).await {
        Ok((no_store, data)) => {
            let mut response = match data {
                Some(data) => (StatusCode::OK, Json(data)).into_response(),
                None => StatusCode::NO_CONTENT.into_response(),
            };
            if no_store {
                response
                    .headers_mut()
                    .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
            }
            response
        }
        Err(err) => {
            debug!(error = %err, path = %path, operation = %operation, "request rejected");
            error_response(&err)
        }
    }
}

/// Resolve, parse, validate, execute.
async fn handle(
    state: &AppState,
    operation: Operation,
    path: &str,
    headers: &HeaderMap,
    mut params: Vec<(String, String)>,
    payload: Option<Map<String, Value>>,
) -> ApiResult<(bool, Option<Value>)> {
    if params.len() > state.config.server.max_params {
        return Err(ApiError::Validation(
            "Query exceeded max allowed parameters number".to_string(),
        ));
    }

    let mut query = resolver::resolve(
        &state.specs,
        &state.registry,
        &state.config,
        operation,
        path,
        headers,
        &mut params,
    )?;
    query.payload = payload;

    parse_params(
        &state.registry,
        operation,
        &query.entity,
        &params,
        state.parser_limits(),
        &mut query.filters,
    )?;
    validators::validate(&query)?;

    let no_store = query.entity.auth;
    let data = state.executor.execute(&query).await?;
    Ok((no_store, data))
}

/// POST→C, GET→R, PATCH→U, DELETE→D. The router registers exactly these
/// four methods; anything else answers 405 before reaching dispatch.
fn operation_for(method: &Method) -> Option<Operation> {
    match method.as_str() {
        "POST" => Some(Operation::Create),
        "GET" => Some(Operation::Read),
        "PATCH" => Some(Operation::Update),
        "DELETE" => Some(Operation::Delete),
        _ => None,
    }
}

/// Uniform error envelope: `{message, status, timestamp}`.
pub(crate) fn error_response(err: &ApiError) -> Response {
    let body = ErrorBody::from(err);
    let status =
        StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}
