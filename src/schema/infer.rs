//! Field resolution: fills in column name, column type, nullability and
//! empty value from the declared type when the annotation leaves them out.

use std::collections::BTreeMap;

use super::naming::{column_name, table_name};
use super::types::*;
use crate::error::{CompileError, Result};
use crate::parser::{parse_tags, FieldSkeleton, TypeSkeleton};

/// Build a type definition from its skeleton, resolving every field and the
/// indexes declared on them. Embedding and cross-type data are left empty.
pub fn prepare_type(skeleton: &TypeSkeleton) -> Result<TypeDefinition> {
    let fields = skeleton
        .fields
        .iter()
        .map(|field| resolve_field(&skeleton.name, field))
        .collect::<Result<Vec<_>>>()?;

    let indexes = collect_indexes(&skeleton.name, &fields)?;

    Ok(TypeDefinition {
        name: skeleton.name.clone(),
        table_name: skeleton
            .table
            .clone()
            .unwrap_or_else(|| table_name(&skeleton.name)),
        fields,
        embedded: skeleton.embedded.clone(),
        no_table: skeleton.no_table,
        imported: false,
        primary_key: Vec::new(),
        auto_increment: None,
        foreign_keys: Vec::new(),
        indexes,
    })
}

pub fn resolve_field(type_name: &str, field: &FieldSkeleton) -> Result<FieldDefinition> {
    let tags = parse_tags(&field.tags).map_err(|source| CompileError::Annotation {
        type_name: type_name.to_string(),
        field: field.name.clone(),
        source,
    })?;
    let declared_type = DeclaredType::parse(&field.declared_type);

    let column_name = tags
        .column
        .clone()
        .unwrap_or_else(|| column_name(&field.name));

    let column_type = match (tags.column_type, declared_type.scalar) {
        (Some(explicit), _) => explicit,
        (None, Some(kind)) => ColumnType::from(kind),
        (None, None) => {
            return Err(CompileError::ColumnTypeInference {
                type_name: type_name.to_string(),
                field: field.name.clone(),
                declared: declared_type.name.clone(),
            })
        }
    };

    if tags.auto_increment && !column_type.is_integer() {
        return Err(CompileError::AutoIncrementType {
            type_name: type_name.to_string(),
            field: field.name.clone(),
            column_type: column_type.to_string(),
        });
    }

    let nullability = resolve_nullability(&tags, &declared_type);

    let empty_value = if tags.is_primary_key() {
        let value = match &tags.empty_value {
            Some(literal) => Some(EmptyValue::Literal(literal.clone())),
            None => empty_value(&declared_type),
        };
        Some(value.ok_or_else(|| CompileError::EmptyValueInference {
            type_name: type_name.to_string(),
            field: field.name.clone(),
            declared: declared_type.name.clone(),
        })?)
    } else {
        None
    };

    Ok(FieldDefinition {
        name: field.name.clone(),
        declared_type,
        column_name,
        column_type,
        nullability,
        empty_value,
        from_embedded: false,
        tags,
    })
}

fn resolve_nullability(tags: &FieldTags, declared: &DeclaredType) -> Nullability {
    if tags.is_primary_key() || tags.not_null {
        Nullability::NotNull
    } else if tags.nullable || declared.is_nullable() {
        Nullability::Null
    } else {
        Nullability::NotNull
    }
}

/// Canonical zero value of a declared type
fn empty_value(declared: &DeclaredType) -> Option<EmptyValue> {
    let kind = declared.scalar?;
    if declared.is_nullable() {
        return Some(EmptyValue::Null);
    }
    let value = match kind {
        ScalarKind::Int | ScalarKind::Uint | ScalarKind::Int64 | ScalarKind::Uint64 => {
            EmptyValue::Zero
        }
        ScalarKind::String => EmptyValue::EmptyText,
        ScalarKind::Bool => EmptyValue::False,
        ScalarKind::Timestamp => EmptyValue::ZeroTimestamp,
        ScalarKind::Uuid => EmptyValue::NilUuid,
    };
    Some(value)
}

fn collect_indexes(
    type_name: &str,
    fields: &[FieldDefinition],
) -> Result<BTreeMap<String, IndexDefinition>> {
    let mut indexes: BTreeMap<String, IndexDefinition> = BTreeMap::new();

    for (position, field) in fields.iter().enumerate() {
        for tag in &field.tags.indexes {
            let name = tag
                .name
                .clone()
                .unwrap_or_else(|| field.column_name.clone());
            let index = indexes
                .entry(name.clone())
                .or_insert_with(|| IndexDefinition {
                    name: name.clone(),
                    fields: Vec::new(),
                    unique: tag.unique,
                });
            if index.unique != tag.unique {
                return Err(CompileError::ConflictingIndex {
                    type_name: type_name.to_string(),
                    index: name,
                });
            }
            index.fields.push(position);
        }
    }

    Ok(indexes)
}

/// Reject two fields mapped onto the same column
pub fn check_columns(def: &TypeDefinition) -> Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for field in &def.fields {
        if let Some(first) = seen.insert(&field.column_name, &field.name) {
            return Err(CompileError::DuplicateColumn {
                type_name: def.name.clone(),
                column: field.column_name.clone(),
                first: first.to_string(),
                second: field.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, declared: &str, tags: &str) -> Result<FieldDefinition> {
        resolve_field(
            "Person",
            &FieldSkeleton {
                name: name.to_string(),
                declared_type: declared.to_string(),
                tags: tags.to_string(),
            },
        )
    }

    #[test]
    fn test_resolve_defaults() {
        let f = field("CreatedAt", "timestamp", "").unwrap();
        assert_eq!(f.column_name, "created_at");
        assert_eq!(f.column_type, ColumnType::Timestamp);
        assert_eq!(f.nullability, Nullability::NotNull);
        assert_eq!(f.empty_value, None);
        assert!(!f.from_embedded);
    }

    #[test]
    fn test_resolve_explicit_overrides() {
        let f = field("Email", "string", "column=email_address,type=uuid,null").unwrap();
        assert_eq!(f.column_name, "email_address");
        assert_eq!(f.column_type, ColumnType::Uuid);
        assert_eq!(f.nullability, Nullability::Null);
    }

    #[test]
    fn test_nullability_from_declared_type() {
        assert!(field("Email", "?string", "").unwrap().is_nullable());
        assert!(field("Ref", "NullUuid", "").unwrap().is_nullable());
        assert!(!field("Email", "?string", "not_null").unwrap().is_nullable());
    }

    #[test]
    fn test_primary_key_forced_not_null() {
        let f = field("ID", "?int64", "pk").unwrap();
        assert_eq!(f.nullability, Nullability::NotNull);
        assert_eq!(f.empty_value, Some(EmptyValue::Null));
    }

    #[test]
    fn test_empty_values() {
        let cases = [
            ("int", EmptyValue::Zero),
            ("uint64", EmptyValue::Zero),
            ("string", EmptyValue::EmptyText),
            ("bool", EmptyValue::False),
            ("timestamp", EmptyValue::ZeroTimestamp),
            ("uuid", EmptyValue::NilUuid),
            ("*uuid", EmptyValue::Null),
        ];
        for (declared, expected) in cases {
            let f = field("ID", declared, "pk").unwrap();
            assert_eq!(f.empty_value, Some(expected), "{}", declared);
        }

        let f = field("Code", "string", "pk,empty=none").unwrap();
        assert_eq!(f.empty_value, Some(EmptyValue::Literal("none".to_string())));
    }

    #[test]
    fn test_unknown_declared_type() {
        let err = field("Balance", "Money", "").unwrap_err();
        assert!(matches!(
            err,
            CompileError::ColumnTypeInference { ref type_name, ref field, ref declared }
                if type_name == "Person" && field == "Balance" && declared == "Money"
        ));

        // An explicit column type gets past inference, the empty value does not
        let err = field("Balance", "Money", "pk,type=text").unwrap_err();
        assert!(matches!(err, CompileError::EmptyValueInference { .. }));

        assert!(field("Balance", "Money", "type=text").is_ok());
    }

    #[test]
    fn test_conflicting_nullability_rejected_before_inference() {
        let err = field("Nick", "Money", "null,not_null").unwrap_err();
        assert!(matches!(err, CompileError::Annotation { .. }));
    }

    #[test]
    fn test_auto_increment_requires_integer() {
        let err = field("ID", "string", "autoincr").unwrap_err();
        assert!(matches!(err, CompileError::AutoIncrementType { .. }));
    }

    #[test]
    fn test_prepare_type_indexes() {
        let skeleton = TypeSkeleton::new("Slot")
            .field("ID", "int64", "pk")
            .field("Owner", "int64", "index=owner_slot,index")
            .field("Slot", "int", "index=owner_slot")
            .field("Code", "string", "unique");
        let def = prepare_type(&skeleton).unwrap();

        assert_eq!(def.table_name, "slot");
        assert_eq!(def.indexes["owner_slot"].fields, vec![1, 2]);
        assert_eq!(def.indexes["owner"].fields, vec![1]);
        assert!(def.indexes["code"].unique);
    }

    #[test]
    fn test_conflicting_index() {
        let skeleton = TypeSkeleton::new("Slot")
            .field("A", "int", "index=pair")
            .field("B", "int", "unique=pair");
        assert!(matches!(
            prepare_type(&skeleton),
            Err(CompileError::ConflictingIndex { .. })
        ));
    }

    #[test]
    fn test_duplicate_column() {
        let skeleton = TypeSkeleton::new("Person")
            .field("UserID", "int", "")
            .field("UserId", "int", "");
        let def = prepare_type(&skeleton).unwrap();
        assert!(matches!(
            check_columns(&def),
            Err(CompileError::DuplicateColumn { ref column, .. }) if column == "user_id"
        ));
    }
}
