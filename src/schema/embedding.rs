//! Embedding flattener
//!
//! Copies the fields of embedded types into the embedding type and redirects
//! the embedded type's indexes onto the copied positions.

use std::collections::BTreeMap;

use super::infer::check_columns;
use super::types::{IndexDefinition, TypeDefinition};
use crate::error::{CompileError, Diagnostic, DiagnosticKind, Result};

/// Read-only lookup of every type known to a compilation, in declaration order
#[derive(Debug, Default)]
pub struct TypeIndex {
    order: Vec<String>,
    types: BTreeMap<String, TypeDefinition>,
}

impl TypeIndex {
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.order.iter().filter_map(|name| self.types.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Flatten embedded types into their embedders.
///
/// Type names must be unique. A missing embedded type is reported as a
/// diagnostic and skipped, or rejected when `strict` is set.
pub fn flatten(types: Vec<TypeDefinition>, strict: bool) -> Result<(TypeIndex, Vec<Diagnostic>)> {
    let mut flattener = Flattener {
        originals: types.iter().map(|t| (t.name.as_str(), t)).collect(),
        done: BTreeMap::new(),
        visiting: Vec::new(),
        diagnostics: Vec::new(),
        strict,
    };

    for def in &types {
        flattener.visit(&def.name)?;
    }

    let Flattener {
        done, diagnostics, ..
    } = flattener;

    let index = TypeIndex {
        order: types.iter().map(|t| t.name.clone()).collect(),
        types: done,
    };
    Ok((index, diagnostics))
}

struct Flattener<'a> {
    originals: BTreeMap<&'a str, &'a TypeDefinition>,
    done: BTreeMap<String, TypeDefinition>,
    visiting: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    strict: bool,
}

impl<'a> Flattener<'a> {
    fn visit(&mut self, name: &str) -> Result<()> {
        if self.done.contains_key(name) {
            return Ok(());
        }
        let Some(&original) = self.originals.get(name) else {
            return Ok(());
        };

        self.visiting.push(name.to_string());
        let mut def = original.clone();

        for embedded in &original.embedded {
            if !self.originals.contains_key(embedded.as_str()) {
                if self.strict {
                    return Err(CompileError::MissingEmbeddedType {
                        type_name: name.to_string(),
                        embedded: embedded.clone(),
                    });
                }
                tracing::warn!(
                    type_name = name,
                    embedded = embedded.as_str(),
                    "could not find embedded type definition"
                );
                self.diagnostics.push(Diagnostic {
                    type_name: name.to_string(),
                    kind: DiagnosticKind::MissingEmbeddedType {
                        embedded: embedded.clone(),
                    },
                });
                continue;
            }

            if self.visiting.iter().any(|v| v == embedded) {
                let mut path = self.visiting.clone();
                path.push(embedded.clone());
                return Err(CompileError::EmbeddingCycle { path });
            }

            self.visit(embedded)?;
            let source = &self.done[embedded.as_str()];
            merge(&mut def, source)?;
        }

        self.visiting.pop();
        check_columns(&def)?;
        self.done.insert(name.to_string(), def);
        Ok(())
    }
}

fn merge(def: &mut TypeDefinition, embedded: &TypeDefinition) -> Result<()> {
    let offset = def.fields.len();

    for (name, index) in &embedded.indexes {
        let target = def
            .indexes
            .entry(name.clone())
            .or_insert_with(|| IndexDefinition {
                name: name.clone(),
                fields: Vec::new(),
                unique: index.unique,
            });
        if target.unique != index.unique {
            return Err(CompileError::ConflictingIndex {
                type_name: def.name.clone(),
                index: name.clone(),
            });
        }
        target
            .fields
            .extend(index.fields.iter().map(|position| position + offset));
    }

    def.fields.extend(embedded.fields.iter().cloned().map(|mut field| {
        field.from_embedded = true;
        field
    }));

    Ok(())
}
