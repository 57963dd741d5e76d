use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Scalar kinds a field may be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    Int,
    Uint,
    Int64,
    Uint64,
    String,
    Bool,
    Timestamp,
    Uuid,
}

impl ScalarKind {
    fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "int" | "i32" | "integer" => ScalarKind::Int,
            "uint" | "u32" => ScalarKind::Uint,
            "int64" | "i64" => ScalarKind::Int64,
            "uint64" | "u64" => ScalarKind::Uint64,
            "string" | "str" | "text" => ScalarKind::String,
            "bool" | "boolean" => ScalarKind::Bool,
            "timestamp" | "time" | "datetime" => ScalarKind::Timestamp,
            "uuid" => ScalarKind::Uuid,
            _ => return None,
        };
        Some(kind)
    }
}

/// How a declared type signals that it may hold no value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrapper {
    Plain,
    /// `?T`, `*T` or `Option<T>`
    Optional,
    /// A type whose name carries a `null` marker, e.g. `NullUuid`
    NullMarked,
}

/// A field's declared type as written in the type description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    pub name: String,
    /// `None` when the name is not part of the known vocabulary
    pub scalar: Option<ScalarKind>,
    pub wrapper: Wrapper,
}

const NULL_MARKER: &str = "null";

impl DeclaredType {
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();

        let optional_inner = trimmed
            .strip_prefix('?')
            .or_else(|| trimmed.strip_prefix('*'))
            .or_else(|| {
                trimmed
                    .strip_prefix("Option<")
                    .and_then(|rest| rest.strip_suffix('>'))
            });

        if let Some(inner) = optional_inner {
            let inner = DeclaredType::parse(inner);
            return Self {
                name: trimmed.to_string(),
                scalar: inner.scalar,
                wrapper: Wrapper::Optional,
            };
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(pos) = lower.find(NULL_MARKER) {
            let mut base = String::with_capacity(trimmed.len());
            base.push_str(&trimmed[..pos]);
            base.push_str(&trimmed[pos + NULL_MARKER.len()..]);
            let base = base.trim_matches(|c| c == '_' || c == '-');
            return Self {
                name: trimmed.to_string(),
                scalar: ScalarKind::from_name(base),
                wrapper: Wrapper::NullMarked,
            };
        }

        Self {
            name: trimmed.to_string(),
            scalar: ScalarKind::from_name(trimmed),
            wrapper: Wrapper::Plain,
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.wrapper != Wrapper::Plain
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for DeclaredType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

/// Column data type vocabulary shared with the execution layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    UnsignedInteger,
    WideInteger,
    UnsignedWideInteger,
    Text,
    Boolean,
    Timestamp,
    Uuid,
}

impl ColumnType {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ColumnType::Integer
                | ColumnType::UnsignedInteger
                | ColumnType::WideInteger
                | ColumnType::UnsignedWideInteger
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::UnsignedInteger => "unsigned_integer",
            ColumnType::WideInteger => "wide_integer",
            ColumnType::UnsignedWideInteger => "unsigned_wide_integer",
            ColumnType::Text => "text",
            ColumnType::Boolean => "boolean",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Uuid => "uuid",
        }
    }
}

impl From<ScalarKind> for ColumnType {
    fn from(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Int => ColumnType::Integer,
            ScalarKind::Uint => ColumnType::UnsignedInteger,
            ScalarKind::Int64 => ColumnType::WideInteger,
            ScalarKind::Uint64 => ColumnType::UnsignedWideInteger,
            ScalarKind::String => ColumnType::Text,
            ScalarKind::Bool => ColumnType::Boolean,
            ScalarKind::Timestamp => ColumnType::Timestamp,
            ScalarKind::Uuid => ColumnType::Uuid,
        }
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let column_type = match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => ColumnType::Integer,
            "unsigned_integer" | "uint" => ColumnType::UnsignedInteger,
            "wide_integer" | "bigint" => ColumnType::WideInteger,
            "unsigned_wide_integer" | "ubigint" => ColumnType::UnsignedWideInteger,
            "text" | "varchar" => ColumnType::Text,
            "boolean" | "bool" => ColumnType::Boolean,
            "timestamp" => ColumnType::Timestamp,
            "uuid" => ColumnType::Uuid,
            other => return Err(other.to_string()),
        };
        Ok(column_type)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Nullability {
    Null,
    NotNull,
}

/// Value a primary key holds before it is assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyValue {
    Zero,
    False,
    EmptyText,
    ZeroTimestamp,
    NilUuid,
    Null,
    Literal(String),
}

/// Membership of a field in an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexTag {
    /// Defaults to the field's column name
    pub name: Option<String>,
    pub unique: bool,
}

/// A parsed `fk=` directive, before its target is looked up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyDirective {
    pub raw: String,
    pub target_type: String,
    pub target_field: Option<String>,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

/// Structured form of a field's raw annotation string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldTags {
    pub primary_key: bool,
    pub auto_increment: bool,
    pub nullable: bool,
    pub not_null: bool,
    pub column: Option<String>,
    pub column_type: Option<ColumnType>,
    pub empty_value: Option<String>,
    pub indexes: Vec<IndexTag>,
    pub foreign_keys: Vec<ForeignKeyDirective>,
}

impl FieldTags {
    /// Auto-increment fields are always part of the primary key
    pub fn is_primary_key(&self) -> bool {
        self.primary_key || self.auto_increment
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDefinition {
    pub name: String,
    pub declared_type: DeclaredType,
    pub column_name: String,
    pub column_type: ColumnType,
    pub nullability: Nullability,
    /// Only resolved for primary key fields
    pub empty_value: Option<EmptyValue>,
    pub from_embedded: bool,
    pub tags: FieldTags,
}

impl FieldDefinition {
    pub fn is_nullable(&self) -> bool {
        self.nullability == Nullability::Null
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDefinition {
    pub name: String,
    /// Positions in the owning type's field list
    pub fields: Vec<usize>,
    pub unique: bool,
}

/// A foreign key bound to its target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyRef {
    pub field: String,
    pub column: String,
    pub target_type: String,
    /// As written in the directive
    pub target_field_name: Option<String>,
    pub target_field: String,
    pub target_table: String,
    pub target_column: String,
    pub on_update: Option<String>,
    pub on_delete: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDefinition {
    pub name: String,
    pub table_name: String,
    pub fields: Vec<FieldDefinition>,
    pub embedded: Vec<String>,
    pub no_table: bool,
    pub imported: bool,
    /// Positions of the primary key fields, in field order
    pub primary_key: Vec<usize>,
    pub auto_increment: Option<usize>,
    pub foreign_keys: Vec<ForeignKeyRef>,
    pub indexes: BTreeMap<String, IndexDefinition>,
}

impl TypeDefinition {
    pub fn is_table(&self) -> bool {
        !self.no_table
    }

    pub fn field(&self, name: &str) -> Option<(usize, &FieldDefinition)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    pub fn primary_key_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.primary_key.iter().map(|&i| &self.fields[i])
    }

    pub fn auto_increment_field(&self) -> Option<&FieldDefinition> {
        self.auto_increment.map(|i| &self.fields[i])
    }

    /// Get all types this type references through foreign keys
    pub fn dependencies(&self) -> BTreeSet<&str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.target_type.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_declared_type() {
        let t = DeclaredType::parse("int64");
        assert_eq!(t.scalar, Some(ScalarKind::Int64));
        assert_eq!(t.wrapper, Wrapper::Plain);
        assert!(!t.is_nullable());
    }

    #[test]
    fn test_parse_wrapped_declared_types() {
        for name in ["?string", "*string", "Option<string>"] {
            let t = DeclaredType::parse(name);
            assert_eq!(t.scalar, Some(ScalarKind::String), "{}", name);
            assert_eq!(t.wrapper, Wrapper::Optional, "{}", name);
        }
    }

    #[test]
    fn test_parse_null_marked_declared_type() {
        let t = DeclaredType::parse("NullUuid");
        assert_eq!(t.scalar, Some(ScalarKind::Uuid));
        assert_eq!(t.wrapper, Wrapper::NullMarked);
        assert!(t.is_nullable());

        let t = DeclaredType::parse("null_string");
        assert_eq!(t.scalar, Some(ScalarKind::String));
    }

    #[test]
    fn test_parse_unknown_declared_type() {
        let t = DeclaredType::parse("Money");
        assert_eq!(t.scalar, None);
        assert_eq!(t.to_string(), "Money");
    }

    #[test]
    fn test_column_type_from_str() {
        assert_eq!("bigint".parse::<ColumnType>(), Ok(ColumnType::WideInteger));
        assert_eq!("Text".parse::<ColumnType>(), Ok(ColumnType::Text));
        assert!("blob".parse::<ColumnType>().is_err());
    }
}
