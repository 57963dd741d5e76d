use super::types::TypeDefinition;
use crate::error::{CompileError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Orders tables so that foreign key parents are created before children
pub struct DependencyResolver<'a> {
    /// Map of type name -> definition
    types: BTreeMap<&'a str, &'a TypeDefinition>,
    /// Map of type name -> types it references
    deps: BTreeMap<&'a str, BTreeSet<&'a str>>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(types: impl IntoIterator<Item = &'a TypeDefinition>) -> Self {
        let mut by_name = BTreeMap::new();
        let mut deps = BTreeMap::new();

        for def in types {
            by_name.insert(def.name.as_str(), def);
            deps.insert(def.name.as_str(), def.dependencies());
        }

        Self {
            types: by_name,
            deps,
        }
    }

    /// Topological sort of `requested`, keeping the requested order where
    /// dependencies allow. References outside the resolver's set are ignored.
    pub fn creation_order(&self, requested: &[&'a str]) -> Result<Vec<&'a TypeDefinition>> {
        let included: HashSet<&str> = requested.iter().copied().collect();
        let mut result = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut temp_visited: HashSet<&str> = HashSet::new();

        for &name in requested {
            if !visited.contains(name) {
                self.visit(
                    name,
                    &included,
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                )?;
            }
        }

        Ok(result)
    }

    fn visit(
        &self,
        name: &'a str,
        included: &HashSet<&str>,
        visited: &mut HashSet<&'a str>,
        temp_visited: &mut HashSet<&'a str>,
        result: &mut Vec<&'a TypeDefinition>,
    ) -> Result<()> {
        if temp_visited.contains(name) {
            return Err(CompileError::CircularDependency {
                name: name.to_string(),
            });
        }
        if visited.contains(name) {
            return Ok(());
        }

        temp_visited.insert(name);

        if let Some(deps) = self.deps.get(name) {
            for &dep in deps {
                // Skip self-references (e.g. category.parent_id -> category)
                if dep != name && included.contains(dep) {
                    self.visit(dep, included, visited, temp_visited, result)?;
                }
            }
        }

        temp_visited.remove(name);
        visited.insert(name);

        if let Some(&def) = self.types.get(name) {
            result.push(def);
        }

        Ok(())
    }
}

/// Table-bearing types in creation order
pub fn creation_order<'a>(
    types: impl IntoIterator<Item = &'a TypeDefinition> + Clone,
) -> Result<Vec<&'a TypeDefinition>> {
    let requested: Vec<&str> = types
        .clone()
        .into_iter()
        .filter(|t| t.is_table())
        .map(|t| t.name.as_str())
        .collect();
    DependencyResolver::new(types).creation_order(&requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::TypeSkeleton;
    use crate::schema::{flatten, prepare_type, resolve};

    fn resolved(skeletons: &[TypeSkeleton]) -> Vec<TypeDefinition> {
        let types = skeletons.iter().map(|s| prepare_type(s).unwrap()).collect();
        let (index, _) = flatten(types, false).unwrap();
        resolve(&index).unwrap().types
    }

    #[test]
    fn test_parents_before_children() {
        let types = resolved(&[
            TypeSkeleton::new("OrderLine")
                .field("ID", "int64", "pk")
                .field("OrderID", "int64", "fk=Order"),
            TypeSkeleton::new("Order")
                .field("ID", "int64", "pk")
                .field("CustomerID", "int64", "fk=Customer"),
            TypeSkeleton::new("Customer").field("ID", "int64", "pk"),
            TypeSkeleton::new("Meta").field("Note", "string", "").no_table(),
        ]);

        let order = creation_order(&types).unwrap();
        let names: Vec<_> = order.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Customer", "Order", "OrderLine"]);
    }

    #[test]
    fn test_self_reference_is_not_a_cycle() {
        let types = resolved(&[TypeSkeleton::new("Category")
            .field("ID", "int", "pk")
            .field("ParentID", "?int", "fk=Category")]);
        assert_eq!(creation_order(&types).unwrap().len(), 1);
    }

    #[test]
    fn test_circular_dependency_error() {
        let types = resolved(&[
            TypeSkeleton::new("A")
                .field("ID", "int", "pk")
                .field("BID", "int", "fk=B"),
            TypeSkeleton::new("B")
                .field("ID", "int", "pk")
                .field("AID", "int", "fk=A"),
        ]);
        assert!(matches!(
            creation_order(&types),
            Err(CompileError::CircularDependency { .. })
        ));
    }
}
