use crate::compiler::CompiledUnit;
use crate::error::Result;
use crate::schema::{creation_order, ColumnType, TypeDefinition};

/// SQLite storage type for a column type
pub fn sql_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer
        | ColumnType::UnsignedInteger
        | ColumnType::WideInteger
        | ColumnType::UnsignedWideInteger
        | ColumnType::Boolean => "INTEGER",
        ColumnType::Text | ColumnType::Timestamp | ColumnType::Uuid => "TEXT",
    }
}

pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column_list(def: &TypeDefinition, positions: &[usize]) -> String {
    positions
        .iter()
        .map(|&i| quote(&def.fields[i].column_name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate CREATE TABLE SQL for a resolved type
pub fn generate_create_table(def: &TypeDefinition) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", quote(&def.table_name));
    let mut lines = Vec::new();
    let single_key = def.primary_key.len() == 1;

    for (position, field) in def.fields.iter().enumerate() {
        let mut line = format!(
            "    {} {}",
            quote(&field.column_name),
            sql_type(field.column_type)
        );

        if single_key && def.primary_key[0] == position {
            line.push_str(" PRIMARY KEY");
            if def.auto_increment == Some(position) {
                line.push_str(" AUTOINCREMENT");
            }
        }
        if !field.is_nullable() {
            line.push_str(" NOT NULL");
        }

        lines.push(line);
    }

    if def.primary_key.len() > 1 {
        lines.push(format!(
            "    PRIMARY KEY ({})",
            column_list(def, &def.primary_key)
        ));
    }

    for index in def.indexes.values().filter(|i| i.unique) {
        lines.push(format!("    UNIQUE ({})", column_list(def, &index.fields)));
    }

    for fk in &def.foreign_keys {
        let mut line = format!(
            "    FOREIGN KEY ({}) REFERENCES {}({})",
            quote(&fk.column),
            quote(&fk.target_table),
            quote(&fk.target_column)
        );
        if let Some(action) = &fk.on_update {
            line.push_str(&format!(" ON UPDATE {}", action));
        }
        if let Some(action) = &fk.on_delete {
            line.push_str(&format!(" ON DELETE {}", action));
        }
        lines.push(line);
    }

    sql.push_str(&lines.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate CREATE INDEX statements for the non-unique indexes
pub fn generate_indexes(def: &TypeDefinition) -> Vec<String> {
    def.indexes
        .values()
        .filter(|index| !index.unique)
        .map(|index| {
            format!(
                "CREATE INDEX {} ON {}({})",
                quote(&format!("idx_{}_{}", def.table_name, index.name)),
                quote(&def.table_name),
                column_list(def, &index.fields)
            )
        })
        .collect()
}

/// All statements needed to create the unit's tables, parents first
pub fn generate_statements(unit: &CompiledUnit) -> Result<Vec<String>> {
    let emitted: Vec<&TypeDefinition> = unit.emitted().collect();
    let mut statements = Vec::new();
    for def in creation_order(emitted.iter().copied())? {
        statements.push(generate_create_table(def));
        statements.extend(generate_indexes(def));
    }
    Ok(statements)
}

/// Render the unit's DDL as a single script
pub fn render_ddl(unit: &CompiledUnit) -> Result<String> {
    let statements = generate_statements(unit)?;
    let mut script = statements.join(";\n\n");
    if !script.is_empty() {
        script.push_str(";\n");
    }
    Ok(script)
}
