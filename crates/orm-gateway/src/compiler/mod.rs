//! Pure compilation of resolved queries into parameterized SQL

mod modify;
mod select;

use serde_json::Value;

use table_api_filters::{FilterClause, FilterValue};
use table_api_models::{ApiError, ApiResult, Field, FieldType, Operation, ID_FIELD};

use crate::query::{Query, QueryLimits};

/// SQL text plus positional parameters, bound left-to-right.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Compiles a resolved query into SQL text and a positional parameter list.
/// No I/O; failures are validation errors on the query's content.
pub fn compile(query: &Query, limits: QueryLimits) -> ApiResult<CompiledQuery> {
    match query.operation {
        Operation::Create => modify::insert(query),
        Operation::Read => select::select(query, limits),
        Operation::Update => modify::update(query),
        Operation::Delete => modify::delete(query),
    }
}

/// Collapses a single-row result set to a bare object when the operation is
/// create/update/delete, or a read filtered by identifier. `None` means an
/// empty mutation result (no response body).
pub fn unfold(rows: Vec<Value>, query: &Query) -> Option<Value> {
    let by_id = query
        .filters
        .iter()
        .any(|f| f.field.as_deref() == Some(ID_FIELD));
    if rows.len() == 1 && (query.operation != Operation::Read || by_id) {
        return rows.into_iter().next();
    }
    if rows.is_empty() && query.operation != Operation::Read {
        return None;
    }
    Some(Value::Array(rows))
}

/// WHERE-contributing SQL for a filter operator. Pagination and ordering
/// operators contribute elsewhere.
fn sql_operator(op: &str) -> Option<&'static str> {
    match op {
        "id" | "eq" => Some("="),
        "ne" => Some("!="),
        "gt" => Some(">"),
        "ge" => Some(">="),
        "lt" => Some("<"),
        "le" => Some("<="),
        "like" => Some("LIKE"),
        "ilike" => Some("ILIKE"),
        _ => None,
    }
}

/// Builds WHERE predicates for the query's filters, appending bound values
/// to `params` in clause order.
fn where_parts(query: &Query, params: &mut Vec<Value>) -> ApiResult<Vec<String>> {
    let mut parts = Vec::new();
    for clause in &query.filters {
        if let Some(op) = sql_operator(&clause.op) {
            let field = clause_field(query, clause)?;
            let raw = scalar_value(clause)?;
            params.push(comparison_value(field, op, raw)?);
            parts.push(format!("{} {} ${}", field.column, op, params.len()));
        } else if clause.op == "in" {
            let field = clause_field(query, clause)?;
            let FilterValue::List(elements) = &clause.value else {
                return Err(ApiError::Validation(format!(
                    "in filter requires a list of values for {}",
                    field.name
                )));
            };
            let mut placeholders = Vec::with_capacity(elements.len());
            for element in elements {
                params.push(typed_value(field, element)?);
                placeholders.push(format!("${}", params.len()));
            }
            parts.push(format!(
                "{} IN ({})",
                field.column,
                placeholders.join(", ")
            ));
        }
    }
    Ok(parts)
}

fn clause_field<'a>(query: &'a Query, clause: &FilterClause) -> ApiResult<&'a Field> {
    let name = clause.field.as_deref().ok_or_else(|| {
        ApiError::Validation(format!("filter {} requires a field", clause.op))
    })?;
    query.entity.field(name).ok_or_else(|| {
        ApiError::Validation(format!(
            "{name} is not a field of {}",
            query.entity.name
        ))
    })
}

fn scalar_value(clause: &FilterClause) -> ApiResult<&str> {
    clause.value.as_scalar().ok_or_else(|| {
        ApiError::Validation(format!("filter {} requires a scalar value", clause.op))
    })
}

/// LIKE operators bind a wrapped pattern; everything else binds a value
/// coerced to the field's declared type.
fn comparison_value(field: &Field, sql_op: &str, raw: &str) -> ApiResult<Value> {
    if matches!(sql_op, "LIKE" | "ILIKE") {
        return Ok(Value::String(format!("%{raw}%")));
    }
    typed_value(field, raw)
}

/// Coerces a raw filter value by the field's semantic type, so parameters
/// reach the driver with the type the column comparison expects.
fn typed_value(field: &Field, raw: &str) -> ApiResult<Value> {
    match field.field_type {
        FieldType::Number => {
            if let Ok(n) = raw.parse::<i64>() {
                Ok(Value::from(n))
            } else if let Ok(f) = raw.parse::<f64>() {
                Ok(Value::from(f))
            } else {
                Err(ApiError::Validation(format!(
                    "Expected number value for {}",
                    field.name
                )))
            }
        }
        FieldType::Boolean => raw.parse::<bool>().map(Value::Bool).map_err(|_| {
            ApiError::Validation(format!("Expected boolean value for {}", field.name))
        }),
        FieldType::String => Ok(Value::String(raw.to_string())),
    }
}
