//! INSERT, UPDATE, and DELETE statement compilation

use serde_json::Value;

use table_api_models::{ApiError, ApiResult, ID_FIELD};

use crate::query::Query;

use super::{where_parts, CompiledQuery};

pub(super) fn insert(query: &Query) -> ApiResult<CompiledQuery> {
    let (columns, params) = payload_columns(query, "json payload is required")?;

    let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("${i}")).collect();
    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        query.entity.qualified_table(),
        columns.join(", "),
        placeholders.join(", ")
    );
    if let Some(id) = query.entity.id_field() {
        sql.push_str(&format!(" RETURNING {} AS {ID_FIELD}", id.column));
    }

    Ok(CompiledQuery { sql, params })
}

pub(super) fn update(query: &Query) -> ApiResult<CompiledQuery> {
    let (columns, mut params) = payload_columns(query, "no data to update")?;

    let assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ${}", i + 1))
        .collect();

    let mut sql = format!(
        "UPDATE {} SET {}",
        query.entity.qualified_table(),
        assignments.join(", ")
    );
    let predicates = where_parts(query, &mut params)?;
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    Ok(CompiledQuery { sql, params })
}

pub(super) fn delete(query: &Query) -> ApiResult<CompiledQuery> {
    let mut params = Vec::new();
    let mut sql = format!("DELETE FROM {}", query.entity.qualified_table());
    let predicates = where_parts(query, &mut params)?;
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }
    Ok(CompiledQuery { sql, params })
}

/// Columns and bound values surviving from the payload: system fields and
/// empty values are omitted; composite values are serialized to JSON text.
fn payload_columns(query: &Query, missing: &str) -> ApiResult<(Vec<String>, Vec<Value>)> {
    let payload = query
        .payload
        .as_ref()
        .ok_or_else(|| ApiError::Validation(missing.to_string()))?;

    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (key, value) in payload {
        if key == ID_FIELD || is_empty(value) {
            continue;
        }
        let field = query.entity.field(key).ok_or_else(|| {
            ApiError::Validation(format!("{key} is not a field of {}", query.entity.name))
        })?;
        columns.push(field.column.clone());
        params.push(bound_value(value));
    }
    if columns.is_empty() {
        return Err(ApiError::Validation(missing.to_string()));
    }
    Ok((columns, params))
}

/// A payload value is empty iff it is null, an empty object, or an empty
/// array. Scalars, including `0`, `false`, and `""`, are kept.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn bound_value(value: &Value) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) => {
            Value::String(serde_json::to_string(value).unwrap_or_default())
        }
        other => other.clone(),
    }
}
