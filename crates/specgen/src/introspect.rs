//! Database introspection: column metadata, grants, and role closures

use anyhow::{bail, Result};
use sqlx::PgConnection;
use tracing::info;

use crate::GenerateConfig;

/// One column row from `information_schema.columns`, with single-column
/// primary key and default detection. Flag columns arrive as `'1'`/`'0'`
/// text, the way the metadata query computes them.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ColumnMetadata {
    pub table_name: String,
    pub column_name: String,
    pub is_nullable: String,
    pub data_type: String,
    pub is_pk: String,
    pub has_default: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TableGrant {
    pub grantee: String,
    pub table_name: String,
    pub privilege_type: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ColumnGrant {
    pub grantee: String,
    pub table_name: String,
    pub column_name: String,
    pub privilege_type: String,
}

/// Everything the derivation needs, fetched in one pass.
#[derive(Debug, Clone)]
pub struct Introspection {
    pub memberships: Vec<String>,
    pub groups: Vec<String>,
    pub metadata: Vec<ColumnMetadata>,
    pub table_grants: Vec<TableGrant>,
    pub column_grants: Vec<ColumnGrant>,
}

/// Roles the given role inherits from, itself included.
const ROLE_MEMBERSHIP_SQL: &str = r#"
    WITH RECURSIVE cte AS (
        SELECT oid FROM pg_roles WHERE rolname = $1
        UNION ALL
        SELECT m.roleid
        FROM cte
        JOIN pg_auth_members m ON m.member = cte.oid
    )
    SELECT oid::regrole::text AS rolename FROM cte
"#;

/// Roles that are members of the given role's group, itself included.
const GROUP_MEMBERS_SQL: &str = r#"
    WITH RECURSIVE cte AS (
        SELECT oid FROM pg_roles WHERE rolname = $1
        UNION ALL
        SELECT m.member
        FROM cte
        JOIN pg_auth_members m ON m.roleid = cte.oid
    )
    SELECT oid::regrole::text AS rolename FROM cte
"#;

const COLUMN_METADATA_SQL: &str = r#"
    WITH table_with_pk AS (
        SELECT cu.table_name, cu.constraint_name
        FROM information_schema.constraint_column_usage cu
        JOIN information_schema.table_constraints tc
          ON tc.constraint_name = cu.constraint_name
         AND tc.table_name = cu.table_name
         AND tc.table_schema = cu.table_schema
        WHERE tc.constraint_type = 'PRIMARY KEY'
          AND cu.table_schema = $1
          AND ($2::text[] IS NULL OR cu.table_name = ANY($2))
        GROUP BY cu.table_name, cu.constraint_name
        HAVING count(cu.constraint_name) = 1
    )
    SELECT c.table_name, c.column_name, c.is_nullable, c.data_type,
           (CASE WHEN cu.constraint_name IS NOT NULL THEN '1' ELSE '0' END) AS is_pk,
           (CASE WHEN c.column_default IS NOT NULL THEN '1' ELSE '0' END) AS has_default
    FROM information_schema.columns c
    LEFT JOIN table_with_pk tpk
      ON tpk.table_name = c.table_name
    LEFT JOIN information_schema.constraint_column_usage cu
      ON cu.table_schema = c.table_schema
     AND cu.table_name = c.table_name
     AND cu.column_name = c.column_name
     AND cu.constraint_name = tpk.constraint_name
    WHERE c.table_schema = $1
      AND ($2::text[] IS NULL OR c.table_name = ANY($2))
    ORDER BY c.table_name, is_pk DESC, c.column_name
"#;

const TABLE_GRANTS_SQL: &str = r#"
    SELECT grantee, table_name, privilege_type
    FROM information_schema.role_table_grants
    WHERE table_schema = $1
      AND privilege_type IN ('INSERT', 'SELECT', 'UPDATE', 'DELETE')
      AND ($2::text[] IS NULL OR table_name = ANY($2))
    ORDER BY grantee, table_name, privilege_type
"#;

const COLUMN_GRANTS_SQL: &str = r#"
    SELECT grantee, table_name, column_name, privilege_type
    FROM information_schema.column_privileges
    WHERE table_schema = $1
      AND privilege_type IN ('INSERT', 'SELECT', 'UPDATE')
      AND ($2::text[] IS NULL OR table_name = ANY($2))
    ORDER BY grantee, table_name, column_name, privilege_type
"#;

/// Runs the introspection queries in order, bailing out early when a step
/// yields nothing a specification could be derived from.
pub async fn introspect(
    conn: &mut PgConnection,
    conf: &GenerateConfig,
) -> Result<Introspection> {
    let memberships = role_closure(conn, ROLE_MEMBERSHIP_SQL, &conf.pub_role).await?;
    info!(count = memberships.len(), role = %conf.pub_role, "fetched pub memberships");
    if memberships.is_empty() {
        bail!("no role memberships found for {}", conf.pub_role);
    }

    let groups = match &conf.auth_role {
        Some(role) => {
            let groups = role_closure(conn, GROUP_MEMBERS_SQL, role).await?;
            info!(count = groups.len(), role = %role, "fetched auth groups");
            if groups.is_empty() {
                bail!("no group members found for {role}");
            }
            groups
        }
        None => Vec::new(),
    };

    let tables = conf.tables.as_deref();

    let metadata: Vec<ColumnMetadata> = sqlx::query_as(COLUMN_METADATA_SQL)
        .bind(&conf.schema)
        .bind(tables)
        .fetch_all(&mut *conn)
        .await?;
    info!(count = metadata.len(), "fetched columns");
    if metadata.is_empty() {
        bail!("no columns found in schema {}", conf.schema);
    }

    let table_grants: Vec<TableGrant> = sqlx::query_as(TABLE_GRANTS_SQL)
        .bind(&conf.schema)
        .bind(tables)
        .fetch_all(&mut *conn)
        .await?;
    info!(count = table_grants.len(), "fetched table grants");
    if table_grants.is_empty() {
        bail!("no table grants found in schema {}", conf.schema);
    }

    let column_grants: Vec<ColumnGrant> = sqlx::query_as(COLUMN_GRANTS_SQL)
        .bind(&conf.schema)
        .bind(tables)
        .fetch_all(&mut *conn)
        .await?;
    info!(count = column_grants.len(), "fetched column grants");
    if column_grants.is_empty() {
        bail!("no column grants found in schema {}", conf.schema);
    }

    Ok(Introspection {
        memberships,
        groups,
        metadata,
        table_grants,
        column_grants,
    })
}

async fn role_closure(
    conn: &mut PgConnection,
    sql: &str,
    role: &str,
) -> Result<Vec<String>> {
    let roles = sqlx::query_scalar(sql)
        .bind(role)
        .fetch_all(&mut *conn)
        .await?;
    Ok(roles)
}
