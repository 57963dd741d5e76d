pub mod descriptor;
pub mod schema_gen;
pub mod sqlite;

pub use descriptor::{render_descriptor, UnitDescriptor};
pub use schema_gen::{generate_create_table, generate_indexes, generate_statements, render_ddl};
pub use sqlite::SqliteWriter;
