use serde::Serialize;

use table_api_models::{ApiError, ApiResult, Entity, Operation};

use crate::grammar::{FilterRegistry, HandlerKind};

/// A parsed predicate or query modifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterClause {
    /// Referenced field name; absent for non-field operators.
    pub field: Option<String>,
    pub op: String,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(String),
    List(Vec<String>),
    Number(u64),
}

impl FilterValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FilterValue::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            FilterValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Parser ceilings taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ParserLimits {
    /// Maximum filter clauses per query.
    pub max_filters: usize,
    /// Ceiling any parsed `limit` value is clamped to.
    pub max_limit: u64,
}

/// Parses request query parameters, in request order, into filter clauses.
///
/// A parameter naming an entity field is field-scoped and supports the
/// composite `operator=value` syntax; any other parameter name is taken as a
/// non-field operator. Stops at the first failure.
pub fn parse_params(
    registry: &FilterRegistry,
    operation: Operation,
    entity: &Entity,
    params: &[(String, String)],
    limits: ParserLimits,
    filters: &mut Vec<FilterClause>,
) -> ApiResult<()> {
    for (name, raw) in params {
        match entity.field(name) {
            Some(field) => {
                let (op, value) = match raw.split_once('=') {
                    Some((op, value)) => (op, value),
                    None => ("eq", raw.as_str()),
                };
                append_filter(registry, operation, entity, op, value, Some(&field.name), limits, filters)?;
            }
            None => {
                append_filter(registry, operation, entity, name, raw, None, limits, filters)?;
            }
        }
    }
    Ok(())
}

/// Builds one clause for `op` and appends it, enforcing the operator's
/// occurrence bound and the per-query clause ceiling.
#[allow(clippy::too_many_arguments)]
pub fn append_filter(
    registry: &FilterRegistry,
    operation: Operation,
    entity: &Entity,
    op: &str,
    value: &str,
    field: Option<&str>,
    limits: ParserLimits,
    filters: &mut Vec<FilterClause>,
) -> ApiResult<()> {
    let op = op.to_ascii_lowercase();
    let Some(descriptor) = registry.descriptor(operation, &op) else {
        return Err(ApiError::Validation(format!(
            "filter {op} is not supported by {operation} operation"
        )));
    };

    let clause = match descriptor.handler {
        HandlerKind::Comparison => FilterClause {
            field: Some(required_field(&op, field)?),
            op: op.clone(),
            value: FilterValue::Scalar(value.to_string()),
        },
        HandlerKind::SetMembership => {
            let elements = value.split(',').map(strip_quotes).collect();
            FilterClause {
                field: Some(required_field(&op, field)?),
                op: op.clone(),
                value: FilterValue::List(elements),
            }
        }
        HandlerKind::NumericScalar => {
            let number: u64 = value.parse().map_err(|_| {
                ApiError::Validation(format!("Expected positive number for {op}"))
            })?;
            let number = if op == "limit" {
                number.min(limits.max_limit)
            } else {
                number
            };
            FilterClause {
                field: None,
                op: op.clone(),
                value: FilterValue::Number(number),
            }
        }
        HandlerKind::Ordering => {
            if value.is_empty() {
                return Err(ApiError::Validation(format!("{op} filter requires value")));
            }
            let fields: Vec<String> = value.split(',').map(str::to_string).collect();
            if let Some(mismatch) = fields.iter().find(|f| !entity.has_field(f)) {
                return Err(ApiError::Validation(format!(
                    "{op} filter requires valid fields for the entity: {mismatch}"
                )));
            }
            FilterClause {
                field: None,
                op: op.clone(),
                value: FilterValue::List(fields),
            }
        }
    };

    filters.push(clause);

    let occurrences = filters.iter().filter(|f| f.op == op).count();
    if occurrences > descriptor.max {
        return Err(ApiError::Validation(format!(
            "filter {op} is allowed at most {} times per query",
            descriptor.max
        )));
    }
    if filters.len() > limits.max_filters {
        return Err(ApiError::Validation(
            "Exceeded maximum allowed number of filters".to_string(),
        ));
    }
    Ok(())
}

fn required_field(op: &str, field: Option<&str>) -> ApiResult<String> {
    field.map(str::to_string).ok_or_else(|| {
        ApiError::Validation(format!("filter {op} requires a field"))
    })
}

/// Strips one pair of wrapping double quotes, when both are present.
fn strip_quotes(element: &str) -> String {
    element
        .strip_prefix('"')
        .and_then(|e| e.strip_suffix('"'))
        .unwrap_or(element)
        .to_string()
}
