use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::compiler::CompiledUnit;
use super::schema_gen::generate_statements;

pub struct SqliteWriter {
    conn: Connection,
}

impl SqliteWriter {
    /// Open (or create) a database file. With `replace`, an existing file is
    /// removed first.
    pub fn new(db_path: &Path, replace: bool) -> Result<Self> {
        if replace && db_path.exists() {
            std::fs::remove_file(db_path)
                .context("Failed to remove existing database")?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;
        Self::configure(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .context("Failed to open in-memory database")?;
        Self::configure(conn)
    }

    fn configure(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Create the tables and indexes of a unit in one transaction.
    /// Returns the number of tables created.
    pub fn apply_unit(&mut self, unit: &CompiledUnit) -> Result<usize> {
        let statements = generate_statements(unit)?;
        let table_count = unit.tables().count();
        tracing::info!(tables = table_count, statements = statements.len(), "applying schema");

        let tx = self.conn.transaction()?;
        for sql in &statements {
            tx.execute(sql, [])
                .with_context(|| format!("Failed to execute: {}", sql))?;
        }
        tx.commit()?;

        Ok(table_count)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
