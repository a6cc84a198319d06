use std::collections::{BTreeMap, HashMap};

use table_api_models::{ApiError, ApiResult, Entity, Operation};

/// Sentinel maximum for `N+` cardinalities.
pub const UNBOUNDED: usize = usize::MAX;

/// How an operator's clauses are built and later compiled to SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Field/operator/value comparison (`eq`, `gt`, `like`, ...).
    Comparison,
    /// Comma-separated membership list (`in`).
    SetMembership,
    /// Non-negative integer query modifier (`offset`, `limit`).
    NumericScalar,
    /// Comma-separated field list (`order_asc`, `order_desc`).
    Ordering,
}

/// One operator admitted for an operation, with its occurrence bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorDescriptor {
    pub name: String,
    pub min: usize,
    pub max: usize,
    pub handler: HandlerKind,
}

/// Closed operator table. Names outside it are configuration errors.
fn handler_for(name: &str) -> Option<HandlerKind> {
    match name {
        "id" | "eq" | "ne" | "gt" | "ge" | "lt" | "le" | "like" | "ilike" => {
            Some(HandlerKind::Comparison)
        }
        "in" => Some(HandlerKind::SetMembership),
        "offset" | "limit" => Some(HandlerKind::NumericScalar),
        "order_asc" | "order_desc" => Some(HandlerKind::Ordering),
        _ => None,
    }
}

/// Immutable per-operation operator tables, built once at startup from the
/// configured grammar strings and passed explicitly to the parser and the
/// SQL compiler.
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    operations: HashMap<Operation, HashMap<String, OperatorDescriptor>>,
}

impl FilterRegistry {
    /// Compiles the per-operation grammar strings, keyed by CRUD letter.
    /// Operations without a grammar entry accept no filters.
    pub fn compile(grammars: &BTreeMap<String, String>) -> ApiResult<Self> {
        let mut operations: HashMap<Operation, HashMap<String, OperatorDescriptor>> =
            HashMap::new();
        for (key, grammar) in grammars {
            let op = single_letter(key).and_then(Operation::from_letter).ok_or_else(|| {
                ApiError::Grammar(format!("unknown operation key in filter config: {key}"))
            })?;
            operations.insert(op, compile_operation(op, grammar)?);
        }
        for op in Operation::ALL {
            operations.entry(op).or_default();
        }
        Ok(Self { operations })
    }

    pub fn descriptor(&self, op: Operation, name: &str) -> Option<&OperatorDescriptor> {
        self.operations.get(&op).and_then(|table| table.get(name))
    }

    pub fn operators(&self, op: Operation) -> impl Iterator<Item = &OperatorDescriptor> {
        self.operations.get(&op).into_iter().flat_map(|t| t.values())
    }

    /// Entity field names that shadow a configured non-field operator. Such
    /// an operator can never be addressed for this entity, since a
    /// field-name match always wins; surfaced at startup, not silently.
    pub fn field_collisions(&self, entity: &Entity) -> Vec<String> {
        let mut collisions: Vec<String> = self
            .operations
            .values()
            .flat_map(|table| table.values())
            .filter(|desc| {
                !matches!(desc.handler, HandlerKind::Comparison | HandlerKind::SetMembership)
            })
            .filter(|desc| entity.has_field(&desc.name))
            .map(|desc| desc.name.clone())
            .collect();
        collisions.sort();
        collisions.dedup();
        collisions
    }
}

fn single_letter(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn compile_operation(
    op: Operation,
    grammar: &str,
) -> ApiResult<HashMap<String, OperatorDescriptor>> {
    let mut table = HashMap::new();
    for token in grammar.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let parts: Vec<&str> = token.split(':').collect();
        let [name, cardinality] = parts.as_slice() else {
            return Err(ApiError::Grammar(format!(
                "was not able to parse filter expression {token} for operation {op}"
            )));
        };
        let name = name.to_ascii_lowercase();
        let handler = handler_for(&name)
            .ok_or_else(|| ApiError::Grammar(format!("undefined operation {name}")))?;
        let (min, max) = parse_cardinality(&name, cardinality)?;
        if table
            .insert(
                name.clone(),
                OperatorDescriptor {
                    name,
                    min,
                    max,
                    handler,
                },
            )
            .is_some()
        {
            let name = token.split(':').next().unwrap_or(token);
            return Err(ApiError::Grammar(format!(
                "duplicate filter in config for {op}: {name}"
            )));
        }
    }
    Ok(table)
}

fn parse_cardinality(name: &str, spec: &str) -> ApiResult<(usize, usize)> {
    let bad = || ApiError::Grammar(format!("invalid cardinality for {name}: {spec}"));
    let (min, max) = if let Some(min) = spec.strip_suffix('+') {
        (min.parse().map_err(|_| bad())?, UNBOUNDED)
    } else if let Some((min, max)) = spec.split_once('-') {
        (
            min.parse().map_err(|_| bad())?,
            max.parse().map_err(|_| bad())?,
        )
    } else {
        let min = spec.parse().map_err(|_| bad())?;
        (min, min)
    };
    if min > max {
        return Err(ApiError::Grammar(format!(
            "minimum exceeds maximum for {name}: {spec}"
        )));
    }
    Ok((min, max))
}
