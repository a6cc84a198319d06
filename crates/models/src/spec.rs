use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Operation;

/// Name every entity's primary key field is normalized to.
pub const ID_FIELD: &str = "id";

/// A generated API specification: one document per database schema,
/// produced offline by the generator and loaded once at server startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub version: String,
    pub created: DateTime<Utc>,
    pub description: String,
    pub paths: BTreeMap<String, Entity>,
}

impl Specification {
    pub fn entity(&self, path: &str) -> Option<&Entity> {
        self.paths.get(path)
    }
}

/// A REST-exposed projection of one database table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub path: String,
    /// Whether access requires elevated authentication.
    pub auth: bool,
    pub table: String,
    pub schema: String,
    /// Permitted CRUD letters, ordered C,R,U,D.
    pub grants: String,
    /// Fields in document order; the identifier field comes first.
    #[serde(with = "fields_map")]
    pub fields: Vec<Field>,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn id_field(&self) -> Option<&Field> {
        self.field(ID_FIELD)
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.grants.contains(op.letter())
    }

    /// Schema-qualified table reference for SQL text.
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Semantic type of a field, mapped from the column's database type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Boolean,
}

/// One exposed column of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// True iff the column is non-nullable with no default. Never true for
    /// the identifier field.
    pub required: bool,
    /// Backing column identifier, quoted if case-sensitive.
    pub column: String,
    /// Column permission letters granted to the resolved role, subset of CRU.
    pub grants: String,
}

/// Serializes the ordered field list as a JSON object keyed by field name,
/// preserving document order in both directions.
mod fields_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::Field;

    pub fn serialize<S>(fields: &[Field], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for field in fields {
            map.serialize_entry(&field.name, field)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Field>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = Vec<Field>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field name to field definition")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((_, field)) = access.next_entry::<String, Field>()? {
                    fields.push(field);
                }
                Ok(fields)
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity() -> Entity {
        Entity {
            name: "Accounts".into(),
            path: "accounts".into(),
            auth: false,
            table: "accounts".into(),
            schema: "public".into(),
            grants: "CRU".into(),
            fields: vec![
                Field {
                    name: "id".into(),
                    field_type: FieldType::Number,
                    required: false,
                    column: "account_id".into(),
                    grants: "CR".into(),
                },
                Field {
                    name: "name".into(),
                    field_type: FieldType::String,
                    required: true,
                    column: "name".into(),
                    grants: "CRU".into(),
                },
            ],
        }
    }

    #[test]
    fn grants_gate_operations() {
        let e = entity();
        assert!(e.allows(Operation::Create));
        assert!(e.allows(Operation::Read));
        assert!(!e.allows(Operation::Delete));
    }

    #[test]
    fn field_lookup() {
        let e = entity();
        assert_eq!(e.id_field().map(|f| f.column.as_str()), Some("account_id"));
        assert!(e.has_field("name"));
        assert!(!e.has_field("missing"));
    }

    #[test]
    fn fields_serialize_as_object_in_order() {
        let e = entity();
        let json = serde_json::to_string(&e).unwrap();
        let id_at = json.find("\"id\"").unwrap();
        let name_at = json.find("\"name\":{").unwrap();
        assert!(id_at < name_at, "identifier field must serialize first");

        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
        assert_eq!(back.fields[0].name, "id");
    }

    #[test]
    fn field_type_uses_lowercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&FieldType::Number).unwrap(),
            "\"number\""
        );
        let t: FieldType = serde_json::from_str("\"boolean\"").unwrap();
        assert_eq!(t, FieldType::Boolean);
    }
}
