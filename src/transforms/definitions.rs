//! Named datum definitions
//!
//! Catalogs resolve their fallback name through a [`DefinitionSource`].
//! The dictionary store behind it is not part of this crate; the
//! in-memory source below is loaded from YAML:
//!
//! ```yaml
//! datums:
//!   NAD27:
//!     description: North American 1927
//!     ellipsoid: { semi_major_axis: 6378206.4, inverse_flattening: 294.9786982 }
//!     translation: [-8.0, 160.0, 176.0]
//! ```

use crate::core::io::read_text;
use crate::core::{DescriptionError, DescriptionResult};
use crate::transforms::geodetic::DatumDefinition;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Lookup service returning named datum definitions
pub trait DefinitionSource {
    /// Definition for `name`, or `None` when unknown
    fn datum(&self, name: &str) -> Option<DatumDefinition>;
}

/// Definitions held in a map keyed by name
#[derive(Debug, Clone, Default)]
pub struct InMemoryDefinitions {
    datums: HashMap<String, DatumDefinition>,
}

#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    #[serde(default)]
    datums: HashMap<String, DatumDefinition>,
}

impl InMemoryDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition; its key is `definition.name`
    pub fn insert(&mut self, definition: DatumDefinition) {
        self.datums.insert(definition.name.clone(), definition);
    }

    pub fn len(&self) -> usize {
        self.datums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datums.is_empty()
    }

    pub fn from_yaml_str(yaml: &str) -> DescriptionResult<Self> {
        let file: DefinitionsFile = serde_yaml::from_str(yaml)?;
        let datums = file
            .datums
            .into_iter()
            .map(|(name, mut definition)| {
                definition.name = name.clone();
                (name, definition)
            })
            .collect();
        Ok(Self { datums })
    }

    pub fn from_file(path: impl AsRef<Path>) -> DescriptionResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DescriptionError::FileNotFound(path.to_path_buf()));
        }
        let text = read_text(path).map_err(|source| DescriptionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }
}

impl DefinitionSource for InMemoryDefinitions {
    fn datum(&self, name: &str) -> Option<DatumDefinition> {
        self.datums.get(name).cloned()
    }
}
