// Generation tests: introspection fixtures to derived specifications.

use table_api_specgen::{generate, ColumnGrant, ColumnMetadata, GenerateConfig, TableGrant};

fn conf() -> GenerateConfig {
    GenerateConfig {
        schema: "public".into(),
        tables: None,
        name: "inventory-public APIs".into(),
        description: "generated".into(),
        version: "0.0.1".into(),
        pub_role: "api_public".into(),
        auth_role: None,
    }
}

fn column(
    table: &str,
    name: &str,
    nullable: bool,
    data_type: &str,
    pk: bool,
    has_default: bool,
) -> ColumnMetadata {
    ColumnMetadata {
        table_name: table.into(),
        column_name: name.into(),
        is_nullable: if nullable { "YES" } else { "NO" }.into(),
        data_type: data_type.into(),
        is_pk: if pk { "1" } else { "0" }.into(),
        has_default: if has_default { "1" } else { "0" }.into(),
    }
}

fn table_grant(grantee: &str, table: &str, privilege: &str) -> TableGrant {
    TableGrant {
        grantee: grantee.into(),
        table_name: table.into(),
        privilege_type: privilege.into(),
    }
}

fn column_grants(grantee: &str, table: &str, column: &str, privileges: &str) -> Vec<ColumnGrant> {
    privileges
        .split(',')
        .map(|p| ColumnGrant {
            grantee: grantee.into(),
            table_name: table.into(),
            column_name: column.into(),
            privilege_type: p.into(),
        })
        .collect()
}

fn product_metadata() -> Vec<ColumnMetadata> {
    vec![
        column("customer", "id", false, "integer", true, false),
        column("customer", "postalcode", true, "character varying", false, true),
        column("product", "id", false, "integer", true, false),
        column("product", "price", false, "character varying", false, false),
        column("product", "product_name", false, "character varying", false, false),
        column("product", "qty", false, "character varying", false, false),
        column("product_transaction", "prod_id", false, "integer", false, false),
        column("product_transaction", "trans_id", false, "integer", false, false),
        column("transactions", "id", false, "integer", true, false),
        column("transactions", "cust_id", true, "integer", false, false),
        column("transactions", "timedate", true, "timestamp without time zone", false, false),
    ]
}

fn product_table_grants() -> Vec<TableGrant> {
    let mut grants = Vec::new();
    for table in ["customer", "product", "product_transaction"] {
        for privilege in ["DELETE", "INSERT", "SELECT", "UPDATE"] {
            grants.push(table_grant("api_public", table, privilege));
        }
    }
    grants.push(table_grant("api_public", "transactions", "INSERT"));
    grants.push(table_grant("api_public", "transactions", "SELECT"));
    grants
}

fn product_column_grants() -> Vec<ColumnGrant> {
    let mut grants = Vec::new();
    grants.extend(column_grants("api_public", "customer", "id", "INSERT,SELECT"));
    grants.extend(column_grants("api_public", "customer", "postalcode", "INSERT,SELECT,UPDATE"));
    grants.extend(column_grants("api_public", "product", "id", "INSERT,SELECT"));
    grants.extend(column_grants("api_public", "product", "price", "INSERT,SELECT,UPDATE"));
    grants.extend(column_grants("api_public", "product", "product_name", "INSERT,SELECT,UPDATE"));
    grants.extend(column_grants("api_public", "product", "qty", "INSERT,SELECT,UPDATE"));
    grants.extend(column_grants("api_public", "product_transaction", "prod_id", "INSERT,SELECT"));
    grants.extend(column_grants("api_public", "product_transaction", "trans_id", "INSERT,SELECT"));
    grants.extend(column_grants("api_public", "transactions", "id", "INSERT,SELECT"));
    grants.extend(column_grants("api_public", "transactions", "cust_id", "INSERT,SELECT,UPDATE"));
    grants.extend(column_grants("api_public", "transactions", "timedate", "INSERT,SELECT,UPDATE"));
    grants
}

#[test]
fn derives_product_schema_entities() {
    let spec = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &product_metadata(),
        &product_table_grants(),
        &product_column_grants(),
    )
    .unwrap();

    assert_eq!(spec.paths.len(), 4);
    let paths: Vec<&str> = spec.paths.keys().map(String::as_str).collect();
    assert_eq!(
        paths,
        vec!["customers", "product_transactions", "products", "transactions"]
    );

    let product = &spec.paths["products"];
    assert_eq!(product.name, "Product");
    assert_eq!(product.grants, "CRUD");
    assert!(!product.auth);
    assert_eq!(product.table, "product");
    assert_eq!(product.schema, "public");

    let names: Vec<&str> = product.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["id", "price", "product_name", "qty"]);

    let id = product.field("id").unwrap();
    assert_eq!(id.grants, "CR");
    assert!(!id.required, "identifier is never required on input");
    let price = product.field("price").unwrap();
    assert_eq!(price.grants, "CRU");
    assert!(price.required);

    // INSERT+SELECT table grants only
    let transactions = &spec.paths["transactions"];
    assert_eq!(transactions.grants, "CR");
    let cust_id = transactions.field("cust_id").unwrap();
    assert!(!cust_id.required, "nullable column is not required");

    // no single-column pk: no field named id
    let junction = &spec.paths["product_transactions"];
    assert!(junction.field("id").is_none());
    assert!(junction.field("prod_id").unwrap().required);
}

#[test]
fn select_only_grant_yields_read_only_entity() {
    let metadata = vec![
        column("report", "id", false, "integer", true, false),
        column("report", "title", false, "text", false, false),
    ];
    let table_grants = vec![table_grant("api_public", "report", "SELECT")];
    let mut grants = column_grants("api_public", "report", "id", "SELECT");
    grants.extend(column_grants("api_public", "report", "title", "SELECT"));

    let spec = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &metadata,
        &table_grants,
        &grants,
    )
    .unwrap();

    let report = &spec.paths["reports"];
    assert_eq!(report.grants, "R");
    assert_eq!(report.field("title").unwrap().grants, "R");
}

#[test]
fn ungranted_table_yields_no_entity() {
    let metadata = vec![column("secret", "id", false, "integer", true, false)];

    // no table grants at all
    let spec = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &metadata,
        &[],
        &column_grants("api_public", "secret", "id", "SELECT"),
    )
    .unwrap();
    assert!(spec.paths.is_empty());

    // table grant but no visible columns
    let spec = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &metadata,
        &[table_grant("api_public", "secret", "SELECT")],
        &[],
    )
    .unwrap();
    assert!(spec.paths.is_empty());

    // grants held by a role outside the closure do not count
    let spec = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &metadata,
        &[table_grant("admin", "secret", "SELECT")],
        &column_grants("admin", "secret", "id", "SELECT"),
    )
    .unwrap();
    assert!(spec.paths.is_empty());
}

#[test]
fn auth_granted_table_is_protected_and_judged_by_group_closure() {
    let metadata = vec![
        column("wallet", "id", false, "integer", true, false),
        column("wallet", "balance", false, "numeric", false, false),
    ];
    let table_grants = vec![
        table_grant("api_high", "wallet", "SELECT"),
        table_grant("api_high", "wallet", "UPDATE"),
    ];
    let mut grants = column_grants("api_high", "wallet", "id", "SELECT");
    grants.extend(column_grants("api_high", "wallet", "balance", "SELECT,UPDATE"));

    let spec = generate(
        &conf(),
        &["api_public".to_string()],
        &["auth".to_string(), "api_high".to_string()],
        &metadata,
        &table_grants,
        &grants,
    )
    .unwrap();

    let wallet = &spec.paths["wallets"];
    assert!(wallet.auth);
    assert_eq!(wallet.grants, "RU");
    assert_eq!(wallet.field("balance").unwrap().grants, "RU");
}

fn conflict_metadata(first: &str, second: &str) -> Vec<ColumnMetadata> {
    // `first` has two columns, `second` has one; both pluralize to the
    // same path
    vec![
        column(first, "id", false, "integer", true, false),
        column(first, "name", false, "text", false, false),
        column(second, "id", false, "integer", true, false),
    ]
}

fn conflict_grants(tables: [&str; 2]) -> (Vec<TableGrant>, Vec<ColumnGrant>) {
    let mut table_grants = Vec::new();
    let mut col_grants = Vec::new();
    for table in tables {
        table_grants.push(table_grant("api_public", table, "SELECT"));
        col_grants.extend(column_grants("api_public", table, "id", "SELECT"));
        col_grants.extend(column_grants("api_public", table, "name", "SELECT"));
    }
    (table_grants, col_grants)
}

#[test]
fn path_conflict_richer_entity_keeps_path() {
    // richer table introspected first: the later, poorer one is renamed
    let (table_grants, col_grants) = conflict_grants(["customer", "customers"]);
    let spec = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &conflict_metadata("customer", "customers"),
        &table_grants,
        &col_grants,
    )
    .unwrap();
    assert_eq!(spec.paths["customers"].table, "customer");
    assert_eq!(spec.paths["customers_"].table, "customers");
    assert_eq!(spec.paths["customers_"].path, "customers_");

    // poorer table introspected first: it yields the path to the richer one
    let reversed = vec![
        column("customers", "id", false, "integer", true, false),
        column("customer", "id", false, "integer", true, false),
        column("customer", "name", false, "text", false, false),
    ];
    let (table_grants, col_grants) = conflict_grants(["customers", "customer"]);
    let spec = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &reversed,
        &table_grants,
        &col_grants,
    )
    .unwrap();
    assert_eq!(spec.paths["customers"].table, "customer");
    assert_eq!(spec.paths["customers_"].table, "customers");
}

#[test]
fn unresolvable_path_conflict_aborts_generation() {
    // three tables all claiming the same path
    let mut metadata = conflict_metadata("customer", "customers");
    metadata.push(column("Customer", "id", false, "integer", true, false));
    let (mut table_grants, mut col_grants) = conflict_grants(["customer", "customers"]);
    table_grants.push(table_grant("api_public", "Customer", "SELECT"));
    col_grants.extend(column_grants("api_public", "Customer", "id", "SELECT"));

    let err = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &metadata,
        &table_grants,
        &col_grants,
    )
    .unwrap_err();
    assert!(err.to_string().contains("could not resolve path conflict"));
}

#[test]
fn unknown_data_type_aborts_generation() {
    let metadata = vec![column("geo", "id", false, "tsrange", true, false)];
    let err = generate(
        &conf(),
        &["api_public".to_string()],
        &[],
        &metadata,
        &[table_grant("api_public", "geo", "SELECT")],
        &column_grants("api_public", "geo", "id", "SELECT"),
    )
    .unwrap_err();
    assert!(err.to_string().contains("tsrange"));
}
