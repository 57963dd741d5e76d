use std::fmt;

use thiserror::Error;

use crate::parser::TagError;

pub type Result<T> = std::result::Result<T, CompileError>;

/// Fatal compilation errors. Any of these aborts the whole unit.
#[derive(Debug, Error)]
pub enum CompileError {
    // -------------------------------------------------------------------------
    // Annotation errors
    // -------------------------------------------------------------------------
    #[error("{type_name}.{field}: invalid annotation: {source}")]
    Annotation {
        type_name: String,
        field: String,
        #[source]
        source: TagError,
    },

    // -------------------------------------------------------------------------
    // Inference errors
    // -------------------------------------------------------------------------
    #[error("{type_name}.{field}: cannot infer column type for declared type '{declared}'")]
    ColumnTypeInference {
        type_name: String,
        field: String,
        declared: String,
    },

    #[error("{type_name}.{field}: unknown empty value for declared type '{declared}'")]
    EmptyValueInference {
        type_name: String,
        field: String,
        declared: String,
    },

    #[error("{type_name}.{field}: auto-increment requires an integer column, got {column_type}")]
    AutoIncrementType {
        type_name: String,
        field: String,
        column_type: String,
    },

    #[error("{type_name}: fields '{first}' and '{second}' both map to column '{column}'")]
    DuplicateColumn {
        type_name: String,
        column: String,
        first: String,
        second: String,
    },

    #[error("{type_name}: index '{index}' is declared both unique and non-unique")]
    ConflictingIndex { type_name: String, index: String },

    // -------------------------------------------------------------------------
    // Resolution errors
    // -------------------------------------------------------------------------
    #[error("no primary key found on {type_name}")]
    MissingPrimaryKey { type_name: String },

    #[error("{type_name}: auto-increment field '{field}' cannot be part of a composite primary key")]
    CompositeAutoIncrement { type_name: String, field: String },

    #[error("{type_name}: more than one auto-increment field ('{first}', '{second}')")]
    AmbiguousAutoIncrement {
        type_name: String,
        first: String,
        second: String,
    },

    #[error("{type_name}.{field}: unresolved foreign key '{reference}': {reason}")]
    UnresolvedForeignKey {
        type_name: String,
        field: String,
        reference: String,
        reason: UnresolvedReason,
    },

    #[error("duplicate type definition: {name}")]
    DuplicateType { name: String },

    #[error("{type_name}: embedded type '{embedded}' not found")]
    MissingEmbeddedType { type_name: String, embedded: String },

    #[error("embedding cycle: {}", path.join(" -> "))]
    EmbeddingCycle { path: Vec<String> },

    #[error("circular foreign key dependency detected at: {name}")]
    CircularDependency { name: String },

    #[error("cannot load types from {location}: {message}")]
    ExternalSource { location: String, message: String },
}

/// Why a foreign key directive could not be bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    UnknownType(String),
    UnknownField { type_name: String, field: String },
    NoPrimaryKey(String),
    NotATable(String),
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnresolvedReason::UnknownType(name) => write!(f, "unknown type '{}'", name),
            UnresolvedReason::UnknownField { type_name, field } => {
                write!(f, "type '{}' has no field '{}'", type_name, field)
            }
            UnresolvedReason::NoPrimaryKey(name) => {
                write!(f, "type '{}' has no primary key", name)
            }
            UnresolvedReason::NotATable(name) => write!(f, "type '{}' has no table", name),
        }
    }
}

/// Non-fatal findings reported alongside a successful compilation
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub type_name: String,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    MissingEmbeddedType { embedded: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::MissingEmbeddedType { embedded } => write!(
                f,
                "{}: could not find embedded type definition for '{}'",
                self.type_name, embedded
            ),
        }
    }
}
