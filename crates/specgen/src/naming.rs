//! Naming rules: database identifiers to entity, field, and path names

use anyhow::{bail, Result};

use table_api_models::FieldType;

/// Quotes an identifier when it is case-sensitive.
pub fn to_db_name(name: &str) -> String {
    if name.chars().any(|c| c.is_ascii_uppercase()) {
        format!("\"{name}\"")
    } else {
        name.to_string()
    }
}

/// Entity display name: capitalized table name.
pub fn to_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Field name: snake_cased column name, uppercase runs collapsing to one
/// underscore-prefixed lowercase run.
pub fn to_field_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_upper = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if !prev_upper {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_upper = true;
        } else {
            out.push(c);
            prev_upper = false;
        }
    }
    out.trim_start_matches('_').to_string()
}

/// REST path: lower-cased, pluralized table name.
pub fn to_path(table: &str) -> String {
    pluralize(&to_field_name(table))
}

/// English pluralization, enough for table naming: nouns already ending in
/// `s` pass through, sibilant endings take `es`, consonant-`y` becomes
/// `ies`, everything else takes `s`.
pub fn pluralize(noun: &str) -> String {
    if noun.is_empty() || noun.ends_with('s') {
        return noun.to_string();
    }
    if noun.ends_with('x')
        || noun.ends_with('z')
        || noun.ends_with("ch")
        || noun.ends_with("sh")
    {
        return format!("{noun}es");
    }
    if let Some(stem) = noun.strip_suffix('y') {
        let before = stem.chars().last();
        if before.map(|c| !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')).unwrap_or(false) {
            return format!("{stem}ies");
        }
    }
    format!("{noun}s")
}

/// Maps a PostgreSQL data type to the semantic field type.
pub fn to_field_type(data_type: &str) -> Result<FieldType> {
    Ok(match data_type.to_ascii_lowercase().as_str() {
        "integer" | "double precision" | "numeric" | "bigint" | "real" | "smallint" => {
            FieldType::Number
        }
        "character varying"
        | "character"
        | "text"
        | "timestamp without time zone"
        | "timestamp with time zone"
        | "date"
        | "json"
        | "jsonb"
        | "point"
        | "uuid" => FieldType::String,
        "boolean" => FieldType::Boolean,
        other => bail!("no field type mapping for {other}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_case_sensitive_identifiers() {
        assert_eq!(to_db_name("accounts"), "accounts");
        assert_eq!(to_db_name("Accounts"), "\"Accounts\"");
    }

    #[test]
    fn snake_cases_camel_names() {
        assert_eq!(to_field_name("postalCode"), "postal_code");
        assert_eq!(to_field_name("PostalCode"), "postal_code");
        assert_eq!(to_field_name("created_on"), "created_on");
        assert_eq!(to_field_name("ID"), "id");
    }

    #[test]
    fn pluralizes_paths() {
        assert_eq!(to_path("customer"), "customers");
        assert_eq!(to_path("product_transaction"), "product_transactions");
        assert_eq!(to_path("transactions"), "transactions");
        assert_eq!(to_path("box"), "boxes");
        assert_eq!(to_path("category"), "categories");
        assert_eq!(to_path("ProductEntry"), "product_entries");
    }

    #[test]
    fn maps_field_types() {
        assert_eq!(to_field_type("integer").unwrap(), FieldType::Number);
        assert_eq!(to_field_type("character varying").unwrap(), FieldType::String);
        assert_eq!(to_field_type("boolean").unwrap(), FieldType::Boolean);
        let err = to_field_type("tsvector").unwrap_err();
        assert!(err.to_string().contains("tsvector"));
    }
}
