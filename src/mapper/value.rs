use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};

use crate::schema::EmptyValue;

pub const ZERO_TIMESTAMP: &str = "0001-01-01T00:00:00Z";
pub const NIL_UUID: &str = "00000000-0000-0000-0000-000000000000";

/// A column value as exchanged with the database
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Real(f) => stmt.raw_bind_parameter(idx, f)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether a primary key holding this value counts as unassigned
    pub fn is_empty_as(&self, empty: &EmptyValue) -> bool {
        match (empty, self) {
            (_, SqlValue::Null) => true,
            (EmptyValue::Zero | EmptyValue::False, SqlValue::Integer(i)) => *i == 0,
            (EmptyValue::EmptyText, SqlValue::Text(s)) => s.is_empty(),
            (EmptyValue::ZeroTimestamp, SqlValue::Text(s)) => s == ZERO_TIMESTAMP,
            (EmptyValue::NilUuid, SqlValue::Text(s)) => s == NIL_UUID,
            (EmptyValue::Literal(literal), SqlValue::Text(s)) => s == literal,
            (EmptyValue::Literal(literal), SqlValue::Integer(i)) => {
                literal.parse::<i64>().is_ok_and(|l| l == *i)
            }
            _ => false,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Integer(if value { 1 } else { 0 })
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            SqlValue::Null => return Ok(ToSqlOutput::Owned(Value::Null)),
            SqlValue::Integer(i) => ValueRef::Integer(*i),
            SqlValue::Real(f) => ValueRef::Real(*f),
            SqlValue::Text(s) => ValueRef::Text(s.as_bytes()),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}
