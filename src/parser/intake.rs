//! Type description intake
//!
//! A compilation unit is a JSON document describing the types of one source
//! file:
//!
//! ```json
//! {
//!   "package": "example",
//!   "types": [
//!     {
//!       "name": "Person",
//!       "embed": ["Timestamps"],
//!       "fields": [
//!         { "name": "ID", "type": "int64", "tags": "pk,autoincr" },
//!         { "name": "Email", "type": "?string", "tags": "column=email_address,unique" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitFile {
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub types: Vec<TypeSkeleton>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeSkeleton {
    pub name: String,
    /// Overrides the default table name
    #[serde(default)]
    pub table: Option<String>,
    /// Metadata-only type, never persisted
    #[serde(default)]
    pub no_table: bool,
    #[serde(default, rename = "embed")]
    pub embedded: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSkeleton>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSkeleton {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    /// Raw annotation string
    #[serde(default)]
    pub tags: String,
}

impl TypeSkeleton {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            no_table: false,
            embedded: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, declared_type: &str, tags: &str) -> Self {
        self.fields.push(FieldSkeleton {
            name: name.to_string(),
            declared_type: declared_type.to_string(),
            tags: tags.to_string(),
        });
        self
    }

    pub fn embed(mut self, name: &str) -> Self {
        self.embedded.push(name.to_string());
        self
    }

    pub fn no_table(self) -> Self {
        Self {
            no_table: true,
            ..self
        }
    }
}

/// Parse a unit from its JSON text
pub fn parse_unit(text: &str) -> Result<UnitFile> {
    serde_json::from_str(text).context("Failed to parse unit description")
}

/// Load a unit file from disk
pub fn load_unit(path: &Path) -> Result<UnitFile> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read: {:?}", path))?;
    parse_unit(&text).with_context(|| format!("Invalid unit file: {:?}", path))
}

/// Suffix of generated descriptor files, which are never read back as units
pub const DESCRIPTOR_SUFFIX: &str = ".schema.json";

/// Somewhere other type definitions can be found, used for embedded and
/// referenced types that the unit does not define itself
pub trait TypeSource {
    fn location(&self) -> String;
    fn load(&self) -> Result<Vec<TypeSkeleton>>;
}

/// Reads every `*.json` unit file in a directory, except the unit being
/// compiled
pub struct DirectorySource {
    dir: PathBuf,
    skip: Option<PathBuf>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            skip: None,
        }
    }

    /// Source for the siblings of a unit file
    pub fn siblings_of(unit_path: &Path) -> Self {
        let dir = match unit_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Self {
            dir,
            skip: Some(unit_path.to_path_buf()),
        }
    }

    fn unit_paths(&self) -> Result<Vec<PathBuf>> {
        let skip = self.skip.as_ref().and_then(|p| p.canonicalize().ok());
        let mut paths = Vec::new();

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {:?}", self.dir))?
        {
            let path = entry?.path();
            let is_unit = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".json") && !n.ends_with(DESCRIPTOR_SUFFIX));
            if !is_unit {
                continue;
            }
            if skip.is_some() && path.canonicalize().ok() == skip {
                continue;
            }
            paths.push(path);
        }

        // read_dir order is platform dependent
        paths.sort();
        Ok(paths)
    }
}

impl TypeSource for DirectorySource {
    fn location(&self) -> String {
        self.dir.display().to_string()
    }

    fn load(&self) -> Result<Vec<TypeSkeleton>> {
        let mut types = Vec::new();
        for path in self.unit_paths()? {
            tracing::debug!(path = %path.display(), "loading external unit");
            types.extend(load_unit(&path)?.types);
        }
        Ok(types)
    }
}

/// In-memory source, mostly for tests and embedding callers
pub struct StaticSource {
    name: String,
    types: Vec<TypeSkeleton>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, types: Vec<TypeSkeleton>) -> Self {
        Self {
            name: name.into(),
            types,
        }
    }
}

impl TypeSource for StaticSource {
    fn location(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<Vec<TypeSkeleton>> {
        Ok(self.types.clone())
    }
}
