use serde::Serialize;

use crate::compiler::CompiledUnit;
use crate::error::Diagnostic;
use crate::schema::TypeDefinition;

/// Serialized view of a compiled unit: only the types it emits
#[derive(Debug, Serialize)]
pub struct UnitDescriptor<'a> {
    pub package: Option<&'a str>,
    pub needs_uuid_support: bool,
    pub has_tables: bool,
    pub types: Vec<&'a TypeDefinition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<&'a Diagnostic>,
}

impl<'a> From<&'a CompiledUnit> for UnitDescriptor<'a> {
    fn from(unit: &'a CompiledUnit) -> Self {
        Self {
            package: unit.package.as_deref(),
            needs_uuid_support: unit.needs_uuid_support,
            has_tables: unit.has_tables,
            types: unit.emitted().collect(),
            diagnostics: unit.diagnostics.iter().collect(),
        }
    }
}

/// Render the schema descriptor of a unit as pretty-printed JSON
pub fn render_descriptor(unit: &CompiledUnit) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&UnitDescriptor::from(unit))
}
