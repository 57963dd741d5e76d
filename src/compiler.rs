//! Compilation of one unit: intake → field resolution → embedding →
//! cross-type resolution.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;

use crate::error::{CompileError, Diagnostic, Result};
use crate::parser::{load_unit, DirectorySource, TypeSkeleton, TypeSource};
use crate::schema::{flatten, prepare_type, resolve, TypeDefinition};

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Look up types missing from the unit in the external source
    pub external_lookup: bool,
    /// Treat a missing embedded type as a fatal error
    pub strict_embedding: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            external_lookup: true,
            strict_embedding: false,
        }
    }
}

/// Fully resolved unit, ready for emission
#[derive(Debug, serde::Serialize)]
pub struct CompiledUnit {
    pub package: Option<String>,
    /// Unit types in declaration order, followed by imported types
    pub types: Vec<TypeDefinition>,
    pub needs_uuid_support: bool,
    pub has_tables: bool,
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

impl CompiledUnit {
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Types compiled for this unit (not imported)
    pub fn emitted(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.iter().filter(|t| !t.imported)
    }

    /// Emitted types that own a table
    pub fn tables(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.emitted().filter(|t| t.is_table())
    }
}

pub struct Compiler<'s> {
    options: CompileOptions,
    source: Option<&'s dyn TypeSource>,
}

impl<'s> Compiler<'s> {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            source: None,
        }
    }

    /// Where to look for embedded and referenced types outside the unit
    pub fn with_source(self, source: &'s dyn TypeSource) -> Self {
        Self {
            source: Some(source),
            ..self
        }
    }

    pub fn compile(&self, package: Option<String>, skeletons: &[TypeSkeleton]) -> Result<CompiledUnit> {
        let mut types = Vec::with_capacity(skeletons.len());
        let mut local_names = BTreeSet::new();

        for skeleton in skeletons {
            if !local_names.insert(skeleton.name.clone()) {
                return Err(CompileError::DuplicateType {
                    name: skeleton.name.clone(),
                });
            }
            types.push(prepare_type(skeleton)?);
        }
        tracing::debug!(count = types.len(), "prepared unit types");

        types.extend(self.load_imported(&local_names)?);

        let (index, diagnostics) = flatten(types, self.options.strict_embedding)?;
        let resolution = resolve(&index)?;

        let has_tables = resolution
            .types
            .iter()
            .any(|t| !t.imported && t.is_table());

        tracing::info!(
            types = local_names.len(),
            imported = resolution.types.len() - local_names.len(),
            diagnostics = diagnostics.len(),
            "compiled unit"
        );

        Ok(CompiledUnit {
            package,
            types: resolution.types,
            needs_uuid_support: resolution.needs_uuid_support,
            has_tables,
            diagnostics,
        })
    }

    /// Types from the external source, minus those the unit defines itself
    fn load_imported(&self, local_names: &BTreeSet<String>) -> Result<Vec<TypeDefinition>> {
        let source = match self.source {
            Some(source) if self.options.external_lookup => source,
            _ => return Ok(Vec::new()),
        };

        let skeletons = source.load().map_err(|err| CompileError::ExternalSource {
            location: source.location(),
            message: format!("{:#}", err),
        })?;

        let mut seen = BTreeSet::new();
        let mut imported = Vec::new();
        for skeleton in &skeletons {
            if local_names.contains(&skeleton.name) {
                tracing::debug!(type_name = skeleton.name.as_str(), "external type shadowed by unit");
                continue;
            }
            if !seen.insert(skeleton.name.clone()) {
                return Err(CompileError::DuplicateType {
                    name: skeleton.name.clone(),
                });
            }
            let mut def = prepare_type(skeleton)?;
            def.imported = true;
            imported.push(def);
        }

        tracing::debug!(
            location = %source.location(),
            count = imported.len(),
            "loaded external types"
        );
        Ok(imported)
    }
}

/// Compile a unit without any external source
pub fn compile(skeletons: &[TypeSkeleton]) -> Result<CompiledUnit> {
    Compiler::new(CompileOptions::default()).compile(None, skeletons)
}

/// Load a unit file and compile it, looking up missing types in the unit
/// files next to it
pub fn compile_file(path: &Path, options: CompileOptions) -> anyhow::Result<CompiledUnit> {
    let unit = load_unit(path)?;
    let siblings = DirectorySource::siblings_of(path);
    Compiler::new(options)
        .with_source(&siblings)
        .compile(unit.package, &unit.types)
        .with_context(|| format!("Failed to compile {:?}", path))
}
