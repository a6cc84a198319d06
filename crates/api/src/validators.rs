//! Per-operation structural validation of resolved queries

use serde_json::Value;

use table_api_models::{ApiError, ApiResult, Operation, ID_FIELD};
use table_api_orm_gateway::Query;

/// Runs the structural checks for the query's operation. The filter parser
/// has already run; these rules concern payload and identifier shape.
pub fn validate(query: &Query) -> ApiResult<()> {
    match query.operation {
        Operation::Create => before_create(query),
        Operation::Read => Ok(()),
        Operation::Update => before_update(query),
        Operation::Delete => before_delete(query),
    }
}

fn before_create(query: &Query) -> ApiResult<()> {
    let Some(payload) = query.payload.as_ref() else {
        return Err(ApiError::Validation("json payload is required".to_string()));
    };

    if !query.filters.is_empty() {
        let fields: Vec<&str> = query
            .filters
            .iter()
            .map(|f| f.field.as_deref().unwrap_or(f.op.as_str()))
            .collect();
        return Err(ApiError::Validation(format!(
            "Create object will not accept any filters: {}",
            fields.join(",")
        )));
    }

    let missing = query
        .entity
        .fields
        .iter()
        .filter(|f| f.required && f.name != ID_FIELD)
        .find(|f| value_missing(payload.get(&f.name)));
    if let Some(field) = missing {
        return Err(ApiError::Validation(format!(
            "{} is a required field",
            field.name
        )));
    }
    Ok(())
}

fn before_update(query: &Query) -> ApiResult<()> {
    let id = identifier_value(query)
        .ok_or_else(|| ApiError::Validation("id is a required parameter".to_string()))?;
    let Some(payload) = query.payload.as_ref() else {
        return Err(ApiError::Validation("no data to update".to_string()));
    };
    if let Some(payload_id) = payload.get(ID_FIELD) {
        if scalar_text(payload_id) != id {
            return Err(ApiError::Validation(
                "parameter id should match payload".to_string(),
            ));
        }
    }
    Ok(())
}

fn before_delete(query: &Query) -> ApiResult<()> {
    identifier_value(query)
        .ok_or_else(|| ApiError::Validation("id is a required parameter".to_string()))?;
    if query.payload.is_some() {
        return Err(ApiError::Validation("no payload expected".to_string()));
    }
    Ok(())
}

/// Non-empty value of the identifier filter, when one is present.
fn identifier_value(query: &Query) -> Option<&str> {
    query
        .filters
        .iter()
        .find(|f| f.op == ID_FIELD)
        .and_then(|f| f.value.as_scalar())
        .filter(|v| !v.is_empty())
}

fn value_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Canonical text of a scalar payload value, for identifier comparison.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
