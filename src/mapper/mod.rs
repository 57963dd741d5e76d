//! Runtime row mappers built from resolved type definitions.
//!
//! A [`TableMapper`] knows the table, columns and keys of one type and moves
//! values between a [`Record`] and SQLite rows. Every call is parameterized by
//! the concrete record type and checks it against the mapped type name, so a
//! mismatched record is an error value instead of a crash.

mod registry;
mod value;

pub use registry::*;
pub use value::*;

use rusqlite::{params_from_iter, Connection, Row};
use thiserror::Error;

use crate::schema::{EmptyValue, TypeDefinition};
use crate::writer::schema_gen::quote;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("wrong record type passed to the {expected} mapper: {found}")]
    WrongRecordType {
        expected: String,
        found: &'static str,
    },

    #[error("{type_name} has no field '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("{type_name}.{field}: cannot store {value:?}")]
    InvalidValue {
        type_name: String,
        field: String,
        value: SqlValue,
    },

    #[error("{0} has no table")]
    NotATable(String),

    #[error("{0} has no auto-increment primary key")]
    NoAutoIncrement(String),

    #[error("no mapper registered for {0}")]
    Unregistered(String),

    #[error("a mapper for {0} is already registered")]
    AlreadyRegistered(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// An in-memory value that a mapper can read and fill by field name
pub trait Record {
    /// Name of the type definition this record is mapped by
    const TYPE_NAME: &'static str;

    fn value(&self, field: &str) -> Option<SqlValue>;

    fn set_value(&mut self, field: &str, value: SqlValue) -> Result<(), MapperError>;
}

/// A SQL predicate with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Clone)]
struct MappedColumn {
    field: String,
    column: String,
    empty_value: Option<EmptyValue>,
}

#[derive(Debug, Clone)]
pub struct TableMapper {
    type_name: String,
    table: String,
    columns: Vec<MappedColumn>,
    primary_key: Vec<usize>,
    auto_increment: Option<usize>,
}

impl TableMapper {
    pub fn new(def: &TypeDefinition) -> Result<Self, MapperError> {
        if !def.is_table() {
            return Err(MapperError::NotATable(def.name.clone()));
        }

        let columns = def
            .fields
            .iter()
            .map(|f| MappedColumn {
                field: f.name.clone(),
                column: f.column_name.clone(),
                empty_value: f.empty_value.clone(),
            })
            .collect();

        Ok(Self {
            type_name: def.name.clone(),
            table: def.table_name.clone(),
            columns,
            primary_key: def.primary_key.clone(),
            auto_increment: def.auto_increment,
        })
    }

    pub fn name(&self) -> &str {
        &self.type_name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column names in field order
    pub fn field_list(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column.as_str()).collect()
    }

    pub fn has_auto_increment(&self) -> bool {
        self.auto_increment.is_some()
    }

    fn check<R: Record>(&self) -> Result<(), MapperError> {
        if R::TYPE_NAME != self.type_name {
            return Err(MapperError::WrongRecordType {
                expected: self.type_name.clone(),
                found: R::TYPE_NAME,
            });
        }
        Ok(())
    }

    fn read<R: Record>(&self, record: &R, column: &MappedColumn) -> Result<SqlValue, MapperError> {
        record
            .value(&column.field)
            .ok_or_else(|| MapperError::UnknownField {
                type_name: self.type_name.clone(),
                field: column.field.clone(),
            })
    }

    /// Column/value pairs to write.
    ///
    /// Primary key columns are included only when holding an assigned value.
    /// Other columns are included when `fields` is empty or names them.
    pub fn sql_values<R: Record>(
        &self,
        record: &R,
        fields: &[&str],
    ) -> Result<Vec<(String, SqlValue)>, MapperError> {
        self.check::<R>()?;

        for name in fields {
            if !self.columns.iter().any(|c| c.field == *name) {
                return Err(MapperError::UnknownField {
                    type_name: self.type_name.clone(),
                    field: name.to_string(),
                });
            }
        }

        let mut values = Vec::new();
        for (position, column) in self.columns.iter().enumerate() {
            let value = self.read(record, column)?;
            if self.primary_key.contains(&position) {
                let unset = column
                    .empty_value
                    .as_ref()
                    .is_some_and(|empty| value.is_empty_as(empty));
                if !unset {
                    values.push((column.column.clone(), value));
                }
            } else if fields.is_empty() || fields.contains(&column.field.as_str()) {
                values.push((column.column.clone(), value));
            }
        }
        Ok(values)
    }

    /// Fill a record from a row selected with [`TableMapper::select_sql`]
    pub fn scan<R: Record>(&self, row: &Row<'_>, record: &mut R) -> Result<(), MapperError> {
        self.check::<R>()?;
        for (idx, column) in self.columns.iter().enumerate() {
            let value = SqlValue::from(row.get_ref(idx)?);
            record.set_value(&column.field, value)?;
        }
        Ok(())
    }

    /// Predicate matching the record's primary key
    pub fn pk_clause<R: Record>(&self, record: &R) -> Result<Clause, MapperError> {
        self.check::<R>()?;
        let mut parts = Vec::new();
        let mut params = Vec::new();
        for &position in &self.primary_key {
            let column = &self.columns[position];
            parts.push(format!("{} = ?", quote(&column.column)));
            params.push(self.read(record, column)?);
        }
        Ok(Clause {
            sql: parts.join(" AND "),
            params,
        })
    }

    /// Store the value the database assigned to the auto-increment key
    pub fn load_auto_increment<R: Record>(&self, record: &mut R, value: i64) -> Result<(), MapperError> {
        self.check::<R>()?;
        let position = self
            .auto_increment
            .ok_or_else(|| MapperError::NoAutoIncrement(self.type_name.clone()))?;
        record.set_value(&self.columns[position].field, SqlValue::Integer(value))
    }

    pub fn select_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote(&c.column)).collect();
        format!("SELECT {} FROM {}", columns.join(", "), quote(&self.table))
    }

    /// Insert a record, loading the assigned auto-increment key back into it
    pub fn insert<R: Record>(&self, conn: &Connection, record: &mut R) -> Result<(), MapperError> {
        let values = self.sql_values(record, &[])?;
        let columns: Vec<String> = values.iter().map(|(c, _)| quote(c)).collect();
        let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(&self.table),
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare_cached(&sql)?;
        for (idx, (_, value)) in values.iter().enumerate() {
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;

        if self.has_auto_increment() {
            self.load_auto_increment(record, conn.last_insert_rowid())?;
        }
        Ok(())
    }

    /// Load the row matching the record's primary key into the record
    pub fn reload<R: Record>(&self, conn: &Connection, record: &mut R) -> Result<bool, MapperError> {
        let clause = self.pk_clause(record)?;
        let sql = format!("{} WHERE {}", self.select_sql(), clause.sql);
        let mut stmt = conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(clause.params.iter()))?;
        match rows.next()? {
            Some(row) => {
                self.scan(row, record)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
