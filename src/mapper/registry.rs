use std::collections::HashMap;

use crate::compiler::CompiledUnit;

use super::{MapperError, Record, TableMapper};

/// Stable handle of a registered mapper, assigned in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MapperId(usize);

impl MapperId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Mappers keyed by type name
#[derive(Debug, Default)]
pub struct MapperRegistry {
    mappers: Vec<TableMapper>,
    by_name: HashMap<String, MapperId>,
}

impl MapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapper for every table-bearing type the unit emits
    pub fn from_unit(unit: &CompiledUnit) -> Result<Self, MapperError> {
        let mut registry = Self::new();
        for def in unit.tables() {
            registry.register(TableMapper::new(def)?)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, mapper: TableMapper) -> Result<MapperId, MapperError> {
        if self.by_name.contains_key(mapper.name()) {
            return Err(MapperError::AlreadyRegistered(mapper.name().to_string()));
        }
        let id = MapperId(self.mappers.len());
        self.by_name.insert(mapper.name().to_string(), id);
        self.mappers.push(mapper);
        Ok(id)
    }

    pub fn get(&self, id: MapperId) -> Option<&TableMapper> {
        self.mappers.get(id.0)
    }

    pub fn lookup(&self, type_name: &str) -> Option<MapperId> {
        self.by_name.get(type_name).copied()
    }

    /// Mapper for a concrete record type
    pub fn for_record<R: Record>(&self) -> Result<&TableMapper, MapperError> {
        self.lookup(R::TYPE_NAME)
            .and_then(|id| self.get(id))
            .ok_or_else(|| MapperError::Unregistered(R::TYPE_NAME.to_string()))
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MapperId, &TableMapper)> {
        self.mappers
            .iter()
            .enumerate()
            .map(|(i, mapper)| (MapperId(i), mapper))
    }
}
