//! SELECT statement compilation

use table_api_models::ApiResult;

use crate::query::{Query, QueryLimits};

use super::{where_parts, CompiledQuery};

pub(super) fn select(query: &Query, limits: QueryLimits) -> ApiResult<CompiledQuery> {
    let columns: Vec<String> = query
        .entity
        .fields
        .iter()
        .map(|f| {
            if f.column == f.name {
                f.name.clone()
            } else {
                format!("{} AS {}", f.column, f.name)
            }
        })
        .collect();

    let mut params = Vec::new();
    let predicates = where_parts(query, &mut params)?;

    let mut sql = format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        query.entity.qualified_table()
    );
    if !predicates.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }

    let ordering = order_pairs(query);
    if !ordering.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&ordering.join(", "));
    }

    let (limit, offset) = page_bounds(query, limits);
    sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));

    Ok(CompiledQuery { sql, params })
}

/// `column DIRECTION` pairs, in the order the filters specified them.
fn order_pairs(query: &Query) -> Vec<String> {
    let mut pairs = Vec::new();
    for clause in &query.filters {
        let direction = match clause.op.as_str() {
            "order_asc" => "ASC",
            "order_desc" => "DESC",
            _ => continue,
        };
        if let table_api_filters::FilterValue::List(fields) = &clause.value {
            for name in fields {
                if let Some(field) = query.entity.field(name) {
                    pairs.push(format!("{} {direction}", field.column));
                }
            }
        }
    }
    pairs
}

/// Pagination is always present on reads; absent values take the configured
/// default, and the limit is clamped to the ceiling.
fn page_bounds(query: &Query, limits: QueryLimits) -> (u64, u64) {
    let mut limit = limits.default_limit;
    let mut offset = 0;
    for clause in &query.filters {
        match (clause.op.as_str(), clause.value.as_number()) {
            ("limit", Some(n)) => limit = n.min(limits.max_limit),
            ("offset", Some(n)) => offset = n,
            _ => {}
        }
    }
    (limit, offset)
}
