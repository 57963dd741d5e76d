//! Cross-type resolution: primary keys, auto-increment fields and foreign
//! keys, computed over the complete set of known types.
//!
//! The [`TypeIndex`] is only read here. Every resolved type is written to a
//! fresh output list, so the order types were declared in does not matter.

use std::collections::BTreeMap;

use super::embedding::TypeIndex;
use super::types::{ForeignKeyRef, ScalarKind, TypeDefinition};
use crate::error::{CompileError, Result, UnresolvedReason};

/// Output of the resolution passes
#[derive(Debug)]
pub struct Resolution {
    /// Every known type, in the index's order
    pub types: Vec<TypeDefinition>,
    pub needs_uuid_support: bool,
}

#[derive(Debug, Clone, Default)]
struct Keys {
    primary_key: Vec<usize>,
    auto_increment: Option<usize>,
}

pub fn resolve(index: &TypeIndex) -> Result<Resolution> {
    // First pass: keys of every type, so foreign keys can target any of them
    let mut keys: BTreeMap<&str, Keys> = BTreeMap::new();
    for def in index.iter() {
        let type_keys = resolve_keys(def)?;
        if type_keys.primary_key.is_empty() && def.is_table() && !def.imported {
            return Err(CompileError::MissingPrimaryKey {
                type_name: def.name.clone(),
            });
        }
        keys.insert(def.name.as_str(), type_keys);
    }

    // Second pass: foreign keys of the types being compiled
    let mut types = Vec::with_capacity(index.len());
    let mut needs_uuid_support = false;

    for def in index.iter() {
        let type_keys = keys.get(def.name.as_str()).cloned().unwrap_or_default();
        let mut resolved = def.clone();
        resolved.primary_key = type_keys.primary_key;
        resolved.auto_increment = type_keys.auto_increment;

        if !def.imported {
            resolved.foreign_keys = resolve_foreign_keys(def, index, &keys)?;
            needs_uuid_support |= resolved
                .primary_key_fields()
                .any(|f| f.declared_type.scalar == Some(ScalarKind::Uuid));
        }

        tracing::debug!(
            type_name = def.name.as_str(),
            primary_key = resolved.primary_key.len(),
            foreign_keys = resolved.foreign_keys.len(),
            "resolved type"
        );
        types.push(resolved);
    }

    Ok(Resolution {
        types,
        needs_uuid_support,
    })
}

fn resolve_keys(def: &TypeDefinition) -> Result<Keys> {
    let mut keys = Keys::default();

    for (position, field) in def.fields.iter().enumerate() {
        if field.tags.is_primary_key() {
            keys.primary_key.push(position);
        }
        if field.tags.auto_increment {
            if let Some(first) = keys.auto_increment {
                return Err(CompileError::AmbiguousAutoIncrement {
                    type_name: def.name.clone(),
                    first: def.fields[first].name.clone(),
                    second: field.name.clone(),
                });
            }
            keys.auto_increment = Some(position);
        }
    }

    if let Some(position) = keys.auto_increment {
        if keys.primary_key.len() > 1 {
            return Err(CompileError::CompositeAutoIncrement {
                type_name: def.name.clone(),
                field: def.fields[position].name.clone(),
            });
        }
    }

    Ok(keys)
}

fn resolve_foreign_keys(
    def: &TypeDefinition,
    index: &TypeIndex,
    keys: &BTreeMap<&str, Keys>,
) -> Result<Vec<ForeignKeyRef>> {
    let mut foreign_keys = Vec::new();

    for field in &def.fields {
        for directive in &field.tags.foreign_keys {
            let unresolved = |reason| CompileError::UnresolvedForeignKey {
                type_name: def.name.clone(),
                field: field.name.clone(),
                reference: directive.raw.clone(),
                reason,
            };

            let target = index
                .get(&directive.target_type)
                .ok_or_else(|| unresolved(UnresolvedReason::UnknownType(directive.target_type.clone())))?;
            if !target.is_table() {
                return Err(unresolved(UnresolvedReason::NotATable(target.name.clone())));
            }

            let target_field = match &directive.target_field {
                Some(name) => target.field(name).map(|(_, f)| f).ok_or_else(|| {
                    unresolved(UnresolvedReason::UnknownField {
                        type_name: target.name.clone(),
                        field: name.clone(),
                    })
                })?,
                None => keys
                    .get(target.name.as_str())
                    .and_then(|k| k.primary_key.first())
                    .map(|&position| &target.fields[position])
                    .ok_or_else(|| unresolved(UnresolvedReason::NoPrimaryKey(target.name.clone())))?,
            };

            foreign_keys.push(ForeignKeyRef {
                field: field.name.clone(),
                column: field.column_name.clone(),
                target_type: target.name.clone(),
                target_field_name: directive.target_field.clone(),
                target_field: target_field.name.clone(),
                target_table: target.table_name.clone(),
                target_column: target_field.column_name.clone(),
                on_update: directive.on_update.clone(),
                on_delete: directive.on_delete.clone(),
            });
        }
    }

    Ok(foreign_keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TypeSkeleton;
    use crate::schema::embedding::flatten;
    use crate::schema::infer::prepare_type;

    fn resolve_all(skeletons: &[TypeSkeleton]) -> Result<Resolution> {
        let types = skeletons
            .iter()
            .map(prepare_type)
            .collect::<Result<Vec<_>>>()?;
        let (index, _) = flatten(types, false)?;
        resolve(&index)
    }

    fn person() -> TypeSkeleton {
        TypeSkeleton::new("Person")
            .field("ID", "int64", "pk,autoincr")
            .field("Email", "?string", "unique")
    }

    fn find<'a>(resolution: &'a Resolution, name: &str) -> &'a TypeDefinition {
        resolution.types.iter().find(|t| t.name == name).unwrap()
    }

    #[test]
    fn test_primary_key_detection() {
        let resolution = resolve_all(&[TypeSkeleton::new("Pair")
            .field("Left", "int", "pk")
            .field("Label", "string", "")
            .field("Right", "int", "pk")])
        .unwrap();

        let pair = find(&resolution, "Pair");
        assert_eq!(pair.primary_key, vec![0, 2]);
        assert_eq!(pair.auto_increment, None);
    }

    #[test]
    fn test_missing_primary_key() {
        let err = resolve_all(&[TypeSkeleton::new("Loose").field("Name", "string", "")]).unwrap_err();
        assert!(matches!(err, CompileError::MissingPrimaryKey { ref type_name } if type_name == "Loose"));

        // Metadata-only types do not need one
        assert!(resolve_all(&[TypeSkeleton::new("Loose")
            .field("Name", "string", "")
            .no_table()])
        .is_ok());
    }

    #[test]
    fn test_auto_increment() {
        let resolution = resolve_all(&[person()]).unwrap();
        let p = find(&resolution, "Person");
        assert_eq!(p.auto_increment, Some(0));
        assert_eq!(p.auto_increment_field().unwrap().name, "ID");

        let err = resolve_all(&[TypeSkeleton::new("Twice")
            .field("A", "int", "autoincr")
            .field("B", "int", "autoincr")])
        .unwrap_err();
        assert!(matches!(err, CompileError::AmbiguousAutoIncrement { .. }));
    }

    #[test]
    fn test_auto_increment_in_composite_key() {
        let err = resolve_all(&[TypeSkeleton::new("Line")
            .field("OrderID", "int64", "pk")
            .field("No", "int64", "autoincr")
            .field("Label", "string", "")])
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::CompositeAutoIncrement { ref type_name, ref field }
                if type_name == "Line" && field == "No"
        ));
    }

    #[test]
    fn test_fk_to_primary_key() {
        let resolution = resolve_all(&[
            person(),
            TypeSkeleton::new("PhoneNumber")
                .field("ID", "int64", "pk,autoincr")
                .field("PersonID", "int64", "fk=Person"),
        ])
        .unwrap();

        let phone = find(&resolution, "PhoneNumber");
        assert_eq!(phone.foreign_keys.len(), 1);
        let fk = &phone.foreign_keys[0];
        assert_eq!(fk.column, "person_id");
        assert_eq!(fk.target_type, "Person");
        assert_eq!(fk.target_field, "ID");
        assert_eq!(fk.target_column, "id");
        assert_eq!(fk.target_table, "person");
        assert_eq!(fk.on_update, None);
        assert_eq!(fk.on_delete, None);
    }

    #[test]
    fn test_fk_to_explicit_field_with_actions() {
        let resolution = resolve_all(&[
            person(),
            TypeSkeleton::new("Contact")
                .field("ID", "int64", "pk")
                .field(
                    "PersonEmail",
                    "?string",
                    "fk=Person.Email ONUPDATE CASCADE ONDELETE SET NULL",
                ),
        ])
        .unwrap();

        let fk = &find(&resolution, "Contact").foreign_keys[0];
        assert_eq!(fk.target_field, "Email");
        assert_eq!(fk.target_field_name.as_deref(), Some("Email"));
        assert_eq!(fk.target_column, "email");
        assert_eq!(fk.on_update.as_deref(), Some("CASCADE"));
        assert_eq!(fk.on_delete.as_deref(), Some("SET NULL"));
    }

    #[test]
    fn test_forward_reference() {
        let resolution = resolve_all(&[
            TypeSkeleton::new("Order")
                .field("ID", "int64", "pk,autoincr")
                .field("CustomerID", "int64", "fk=Customer"),
            TypeSkeleton::new("Customer").field("ID", "int64", "pk,autoincr"),
        ])
        .unwrap();

        let order = find(&resolution, "Order");
        assert_eq!(order.foreign_keys[0].target_type, "Customer");
        assert_eq!(order.foreign_keys[0].target_column, "id");
    }

    #[test]
    fn test_unresolved_foreign_keys() {
        let err = resolve_all(&[TypeSkeleton::new("Order")
            .field("ID", "int64", "pk")
            .field("CustomerID", "int64", "fk=Customer")])
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedForeignKey { ref field, ref reference, reason: UnresolvedReason::UnknownType(_), .. }
                if field == "CustomerID" && reference == "Customer"
        ));

        let err = resolve_all(&[
            person(),
            TypeSkeleton::new("Order")
                .field("ID", "int64", "pk")
                .field("Contact", "string", "fk=Person.Phone"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedForeignKey { reason: UnresolvedReason::UnknownField { .. }, .. }
        ));

        let err = resolve_all(&[
            TypeSkeleton::new("Tag").field("Label", "string", "").no_table(),
            TypeSkeleton::new("Order")
                .field("ID", "int64", "pk")
                .field("Tag", "string", "fk=Tag"),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedForeignKey { reason: UnresolvedReason::NotATable(_), .. }
        ));
    }

    #[test]
    fn test_fk_to_imported_table_without_primary_key() {
        let mut legacy = prepare_type(
            &TypeSkeleton::new("Legacy").field("Code", "string", ""),
        )
        .unwrap();
        legacy.imported = true;
        let order = prepare_type(
            &TypeSkeleton::new("Order")
                .field("ID", "int64", "pk")
                .field("LegacyCode", "string", "fk=Legacy"),
        )
        .unwrap();
        let (index, _) = flatten(vec![order, legacy], false).unwrap();

        let err = resolve(&index).unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnresolvedForeignKey { ref field, reason: UnresolvedReason::NoPrimaryKey(ref target), .. }
                if field == "LegacyCode" && target == "Legacy"
        ));
    }

    #[test]
    fn test_several_foreign_keys_on_one_field() {
        let resolution = resolve_all(&[
            person(),
            TypeSkeleton::new("Account").field("Owner", "int64", "pk"),
            TypeSkeleton::new("Membership")
                .field("ID", "int64", "pk,autoincr")
                .field("MemberID", "int64", "fk=Person ONDELETE CASCADE,fk=Account.Owner"),
        ])
        .unwrap();

        let fks = &find(&resolution, "Membership").foreign_keys;
        assert_eq!(fks.len(), 2);
        assert!(fks.iter().all(|fk| fk.column == "member_id"));
        assert_eq!(fks[0].target_table, "person");
        assert_eq!(fks[0].target_column, "id");
        assert_eq!(fks[0].on_delete.as_deref(), Some("CASCADE"));
        assert_eq!(fks[1].target_table, "account");
        assert_eq!(fks[1].target_column, "owner");
        assert_eq!(fks[1].on_delete, None);
    }

    #[test]
    fn test_self_reference() {
        let resolution = resolve_all(&[TypeSkeleton::new("Category")
            .field("ID", "int", "pk")
            .field("ParentID", "?int", "fk=Category ONDELETE cascade")])
        .unwrap();
        let fk = &find(&resolution, "Category").foreign_keys[0];
        assert_eq!(fk.target_type, "Category");
        assert_eq!(fk.on_delete.as_deref(), Some("CASCADE"));
    }

    #[test]
    fn test_needs_uuid_support() {
        let resolution = resolve_all(&[person()]).unwrap();
        assert!(!resolution.needs_uuid_support);

        let resolution =
            resolve_all(&[TypeSkeleton::new("Token").field("ID", "uuid", "pk")]).unwrap();
        assert!(resolution.needs_uuid_support);
    }
}
