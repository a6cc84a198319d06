//! Statement binding and row conversion

use std::str::FromStr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as base64_engine;
use base64::Engine as _;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{Column, Row, TypeInfo};

use table_api_models::{ApiError, ApiResult};

use crate::compiler::CompiledQuery;

use super::QueryExecutor;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

impl QueryExecutor {
    /// Runs a compiled statement on the given executor and converts the
    /// result rows to JSON objects.
    pub(super) async fn fetch_rows<'a, E>(
        &self,
        executor: E,
        compiled: CompiledQuery,
    ) -> ApiResult<Vec<serde_json::Value>>
    where
        E: sqlx::Executor<'a, Database = sqlx::Postgres>,
    {
        let CompiledQuery { sql, params } = compiled;
        let mut query = sqlx::query(&sql);
        for value in params {
            query = bind_value(query, value)?;
        }
        let query = query.persistent(false);

        let rows = tokio::time::timeout(
            Duration::from_secs(self.config.query_timeout),
            query.fetch_all(executor),
        )
        .await
        .map_err(|_| {
            ApiError::Upstream(format!(
                "timeout after {} seconds",
                self.config.query_timeout
            ))
        })?
        .map_err(|e| ApiError::Upstream(driver_error_text(e)))?;

        Ok(rows.iter().map(convert_row).collect())
    }
}

fn driver_error_text(e: sqlx::Error) -> String {
    match e.as_database_error() {
        Some(db_err) => db_err.message().to_string(),
        None => e.to_string(),
    }
}

fn bind_value(query: PgQuery<'_>, value: serde_json::Value) -> ApiResult<PgQuery<'_>> {
    let query = match value {
        serde_json::Value::Null => query.bind(None::<String>),
        serde_json::Value::Bool(b) => query.bind(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                return Err(ApiError::Upstream("unsupported number type".to_string()));
            }
        }
        serde_json::Value::String(s) => bind_timestamp_or_string(query, s),
        other @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
            query.bind::<serde_json::Value>(other)
        }
    };
    Ok(query)
}

/// Binds a string parameter as a timestamp when it parses as one, so text
/// filter values can compare against timestamp columns.
fn bind_timestamp_or_string(query: PgQuery<'_>, s: String) -> PgQuery<'_> {
    if s.len() >= 19 && (s.contains('T') || s.contains(' ')) {
        for format in [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S",
        ] {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(&s, format) {
                return query.bind(ndt);
            }
        }
        if s.ends_with('Z') || s.contains('+') {
            if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                return query.bind(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = DateTime::<Utc>::from_str(&s) {
                return query.bind(dt);
            }
        }
    }
    query.bind(s)
}

/// Converts one PostgreSQL row to a JSON object keyed by column name.
fn convert_row(row: &PgRow) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = convert_column_value(row, i, column.type_info().name());
        object.insert(column.name().to_string(), value);
    }
    serde_json::Value::Object(object)
}

fn convert_column_value(row: &PgRow, i: usize, type_name: &str) -> serde_json::Value {
    use serde_json::Value;

    match type_name {
        "INT2" => row
            .try_get::<i16, _>(i)
            .map(|v| Value::Number((v as i64).into()))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<i32, _>(i)
            .map(|v| Value::Number((v as i64).into()))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<i64, _>(i)
            .map(|v| Value::Number(v.into()))
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<f32, _>(i)
            .ok()
            .and_then(|v| serde_json::Number::from_f64(v as f64).map(Value::Number))
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<f64, _>(i)
            .ok()
            .and_then(|v| serde_json::Number::from_f64(v).map(Value::Number))
            .unwrap_or(Value::Null),
        "NUMERIC" => {
            if let Ok(v) = row.try_get::<f64, _>(i) {
                serde_json::Number::from_f64(v)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            } else if let Ok(v) = row.try_get::<i64, _>(i) {
                Value::Number(v.into())
            } else {
                Value::Null
            }
        }
        "BOOL" => row
            .try_get::<bool, _>(i)
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
            .try_get::<String, _>(i)
            .map(Value::String)
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(i)
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(i)
            .map(|v| Value::String(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(i)
            .map(|v| Value::String(v.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(i)
            .map(|v| Value::String(v.format("%H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row
            .try_get::<serde_json::Value, _>(i)
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(i)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "BYTEA" => row
            .try_get::<Vec<u8>, _>(i)
            .map(|v| Value::String(base64_engine.encode(&v)))
            .unwrap_or(Value::Null),
        _ => {
            if let Ok(v) = row.try_get::<bool, _>(i) {
                Value::Bool(v)
            } else if let Ok(v) = row.try_get::<i64, _>(i) {
                Value::Number(v.into())
            } else if let Ok(v) = row.try_get::<String, _>(i) {
                Value::String(v)
            } else if let Ok(v) = row.try_get::<serde_json::Value, _>(i) {
                v
            } else {
                tracing::warn!("unhandled PostgreSQL type '{}', returning NULL", type_name);
                Value::Null
            }
        }
    }
}
