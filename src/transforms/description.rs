//! Catalog and chain descriptions
//!
//! # Catalog Format
//!
//! ```yaml
//! fallback: NAD27            # optional, resolved through a DefinitionSource
//! cache_capacity: 32         # optional
//! inverse:                   # optional
//!   max_iterations: 10
//!   convergence: 1.0e-9
//!   error_tolerance: 1.0e-6
//! datasets:                  # ordered
//!   - path: geoid/HT2_0.byn
//!     buffer_size: 65536
//!     density: 0.0           # 0 = derive from the grid spacing
//!   - path: shift/lat.byn
//!     longitude_path: shift/lng.byn
//!   - path: chains/nad27_to_wgs84.yaml
//! ```
//!
//! A dataset whose path names a `.yaml`/`.yml` file (optionally gzip or
//! bzip2 compressed) is a chain manifest with `first` and `second` catalog
//! descriptions and an optional `density`. Relative paths resolve against
//! the directory of the file that names them.

use crate::core::io::{logical_file_name, read_text};
use crate::core::{DescriptionError, DescriptionResult, InverseSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of cached grid cells
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// One dataset of a catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Grid file, or chain manifest
    pub path: PathBuf,
    /// Longitude grid; when set, `path` is the latitude grid of a
    /// horizontal shift pair
    #[serde(default)]
    pub longitude_path: Option<PathBuf>,
    /// Requested buffer size in bytes
    #[serde(default)]
    pub buffer_size: usize,
    #[serde(default)]
    pub flags: u32,
    /// Density override; 0 derives it from the dataset
    #[serde(default)]
    pub density: f64,
}

impl DatasetDescriptor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            longitude_path: None,
            buffer_size: 0,
            flags: 0,
            density: 0.0,
        }
    }

    pub fn with_longitude_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.longitude_path = Some(path.into());
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// True when `path` names a chain manifest
    ///
    /// # Examples
    /// ```
    /// use datum_shift::transforms::DatasetDescriptor;
    /// assert!(DatasetDescriptor::new("a/nad27_to_wgs84.yaml.gz").is_chain_manifest());
    /// assert!(!DatasetDescriptor::new("a/geoid.byn").is_chain_manifest());
    /// ```
    pub fn is_chain_manifest(&self) -> bool {
        logical_file_name(&self.path)
            .map(|name| {
                let name = name.to_ascii_lowercase();
                name.ends_with(".yaml") || name.ends_with(".yml")
            })
            .unwrap_or(false)
    }

    fn resolve_paths(&mut self, base: &Path) {
        self.path = resolve(base, &self.path);
        if let Some(lng) = &self.longitude_path {
            self.longitude_path = Some(resolve(base, lng));
        }
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn base_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn load_text(path: &Path) -> DescriptionResult<String> {
    if !path.exists() {
        return Err(DescriptionError::FileNotFound(path.to_path_buf()));
    }
    read_text(path).map_err(|source| DescriptionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parsed catalog description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDescription {
    /// Name of the fallback datum definition
    #[serde(default)]
    pub fallback: Option<String>,
    /// Datasets in catalog order
    #[serde(default)]
    pub datasets: Vec<DatasetDescriptor>,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub inverse: InverseSettings,
}

impl Default for CatalogDescription {
    fn default() -> Self {
        Self {
            fallback: None,
            datasets: Vec::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            inverse: InverseSettings::default(),
        }
    }
}

impl CatalogDescription {
    pub fn new(datasets: Vec<DatasetDescriptor>) -> Self {
        Self {
            datasets,
            ..Self::default()
        }
    }

    pub fn with_fallback(mut self, name: impl Into<String>) -> Self {
        self.fallback = Some(name.into());
        self
    }

    /// Parse YAML; relative paths are kept as written
    pub fn from_yaml_str(yaml: &str) -> DescriptionResult<Self> {
        let description: Self = serde_yaml::from_str(yaml)?;
        description.validate()?;
        Ok(description)
    }

    /// Load a (possibly compressed) YAML file, resolving relative paths
    /// against its directory
    pub fn from_file(path: impl AsRef<Path>) -> DescriptionResult<Self> {
        let path = path.as_ref();
        let mut description = Self::from_yaml_str(&load_text(path)?)?;
        description.resolve_paths(&base_dir(path));
        Ok(description)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        for dataset in &mut self.datasets {
            dataset.resolve_paths(base);
        }
    }

    pub fn validate(&self) -> DescriptionResult<()> {
        for dataset in &self.datasets {
            if !(dataset.density >= 0.0) {
                return Err(DescriptionError::Invalid(format!(
                    "dataset {} has negative density {}",
                    dataset.path.display(),
                    dataset.density
                )));
            }
        }
        let inverse = &self.inverse;
        if inverse.max_iterations == 0 {
            return Err(DescriptionError::Invalid("max_iterations must be positive".to_string()));
        }
        if !(inverse.convergence > 0.0) || !(inverse.error_tolerance >= inverse.convergence) {
            return Err(DescriptionError::Invalid(format!(
                "convergence {} must be positive and no larger than error tolerance {}",
                inverse.convergence, inverse.error_tolerance
            )));
        }
        Ok(())
    }
}

/// Two catalogs applied in sequence through an intermediate datum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainManifest {
    #[serde(default)]
    pub density: f64,
    pub first: CatalogDescription,
    pub second: CatalogDescription,
}

impl ChainManifest {
    pub fn from_yaml_str(yaml: &str) -> DescriptionResult<Self> {
        let manifest: Self = serde_yaml::from_str(yaml)?;
        if !(manifest.density >= 0.0) {
            return Err(DescriptionError::Invalid(format!(
                "chain density {}",
                manifest.density
            )));
        }
        manifest.first.validate()?;
        manifest.second.validate()?;
        Ok(manifest)
    }

    pub fn from_file(path: impl AsRef<Path>) -> DescriptionResult<Self> {
        let path = path.as_ref();
        let mut manifest = Self::from_yaml_str(&load_text(path)?)?;
        let base = base_dir(path);
        manifest.first.resolve_paths(&base);
        manifest.second.resolve_paths(&base);
        Ok(manifest)
    }
}
