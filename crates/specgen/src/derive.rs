//! Authorization derivation: grants and role closures to a specification

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{debug, info};

use table_api_models::{Entity, Field, Specification};

use crate::introspect::{ColumnGrant, ColumnMetadata, TableGrant};
use crate::naming::{to_db_name, to_field_name, to_field_type, to_name, to_path};
use crate::GenerateConfig;

/// Derives the specification from introspected metadata and grants.
///
/// `memberships` is the closure of roles the public role inherits from;
/// `groups` is the closure of roles inheriting the auth role's grants. A
/// table granted to any role in `groups` is protected and judged against
/// `groups`; everything else is judged against `memberships`.
pub fn generate(
    conf: &GenerateConfig,
    memberships: &[String],
    groups: &[String],
    metadata: &[ColumnMetadata],
    table_grants: &[TableGrant],
    column_grants: &[ColumnGrant],
) -> Result<Specification> {
    let mut paths: BTreeMap<String, Entity> = BTreeMap::new();

    for (table, columns) in group_by_table(metadata) {
        let protected = is_protected(table, table_grants, groups);
        let roles = if protected { groups } else { memberships };

        let mut fields = Vec::new();
        for column in &columns {
            let grants = field_grants(table, &column.column_name, column_grants, roles);
            if grants.is_empty() {
                continue;
            }
            let is_pk = column.is_pk == "1";
            let name = if is_pk {
                table_api_models::ID_FIELD.to_string()
            } else {
                to_field_name(&column.column_name)
            };
            fields.push(Field {
                name,
                field_type: to_field_type(&column.data_type)?,
                required: !is_pk
                    && column.is_nullable == "NO"
                    && column.has_default != "1",
                column: to_db_name(&column.column_name),
                grants,
            });
        }
        if fields.is_empty() {
            debug!(table, "skipped: no visible columns");
            continue;
        }

        let grants = table_letters(table, table_grants, roles);
        if grants.is_empty() {
            debug!(table, "skipped: no table grants");
            continue;
        }

        let mut path = to_path(table);
        if paths.contains_key(&path) {
            path = resolve_path_conflict(&mut paths, path, &fields)?;
        }
        paths.insert(
            path.clone(),
            Entity {
                name: to_name(table),
                path,
                auth: protected,
                table: to_db_name(table),
                schema: conf.schema.clone(),
                grants,
                fields,
            },
        );
    }

    info!(entities = paths.len(), "generated specification");
    Ok(Specification {
        name: conf.name.clone(),
        version: conf.version.clone(),
        created: Utc::now(),
        description: conf.description.clone(),
        paths,
    })
}

/// Groups column rows by table, keeping the metadata order within each table
/// (primary key first, then column name).
fn group_by_table(metadata: &[ColumnMetadata]) -> Vec<(&str, Vec<&ColumnMetadata>)> {
    let mut tables: Vec<(&str, Vec<&ColumnMetadata>)> = Vec::new();
    for column in metadata {
        match tables.last_mut() {
            Some((table, columns)) if *table == column.table_name => columns.push(column),
            _ => tables.push((&column.table_name, vec![column])),
        }
    }
    tables
}

fn is_protected(table: &str, table_grants: &[TableGrant], groups: &[String]) -> bool {
    table_grants
        .iter()
        .any(|g| g.table_name == table && groups.contains(&g.grantee))
}

/// Table permission letters for the role set, in fixed C,R,U,D order.
fn table_letters(table: &str, table_grants: &[TableGrant], roles: &[String]) -> String {
    let mut letters: Vec<char> = table_grants
        .iter()
        .filter(|g| g.table_name == table && roles.contains(&g.grantee))
        .filter_map(|g| privilege_letter(&g.privilege_type))
        .collect();
    letters.sort_by_key(|l| letter_weight(*l));
    letters.dedup();
    letters.into_iter().collect()
}

/// Column permission letters for the role set, subset of C,R,U.
fn field_grants(
    table: &str,
    column: &str,
    column_grants: &[ColumnGrant],
    roles: &[String],
) -> String {
    let mut letters: Vec<char> = column_grants
        .iter()
        .filter(|g| {
            g.table_name == table && g.column_name == column && roles.contains(&g.grantee)
        })
        .filter_map(|g| privilege_letter(&g.privilege_type))
        .filter(|l| *l != 'D')
        .collect();
    letters.sort_by_key(|l| letter_weight(*l));
    letters.dedup();
    letters.into_iter().collect()
}

fn privilege_letter(privilege: &str) -> Option<char> {
    match privilege {
        "INSERT" => Some('C'),
        "SELECT" => Some('R'),
        "UPDATE" => Some('U'),
        "DELETE" => Some('D'),
        _ => None,
    }
}

fn letter_weight(letter: char) -> u8 {
    match letter {
        'C' => 0,
        'R' => 1,
        'U' => 2,
        _ => 3,
    }
}

/// Two entities want the same path: the one with fewer fields is renamed by
/// appending an underscore, the richer one keeps the contested path. An
/// already-taken fallback path aborts generation.
fn resolve_path_conflict(
    paths: &mut BTreeMap<String, Entity>,
    path: String,
    fields: &[Field],
) -> Result<String> {
    let fallback = format!("{path}_");
    if paths.contains_key(&fallback) {
        bail!("could not resolve path conflict for {path}: {fallback} already exists");
    }
    let Some(holder) = paths.get(&path) else {
        return Ok(path);
    };
    if holder.fields.len() < fields.len() {
        // move the poorer holder aside; the new entity takes the path
        let Some(mut holder) = paths.remove(&path) else {
            return Ok(path);
        };
        holder.path = fallback.clone();
        paths.insert(fallback, holder);
        Ok(path)
    } else {
        Ok(fallback)
    }
}
