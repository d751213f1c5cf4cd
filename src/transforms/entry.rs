//! Catalog entries
//!
//! Every entry answers the same three questions: how well does it cover a
//! point, what is the shifted point, and where did the shift come from.

use crate::core::{
    CatalogError, CatalogResult, DescriptionError, GeoPoint, GridCell, GridCoverage, GridError,
    GridFileReader, GridValue, ShiftResult, ShiftStatus, SEC_TO_DEG,
};
use crate::transforms::catalog::TransformCatalog;
use crate::transforms::definitions::DefinitionSource;
use crate::transforms::description::{ChainManifest, DatasetDescriptor};
use log::error;
use std::path::{Path, PathBuf};

/// One dataset of a catalog
#[derive(Debug)]
pub enum TransformEntry {
    GridShift(GridShiftEntry),
    Chained(ChainedEntry),
}

impl TransformEntry {
    /// Build the entry a descriptor names
    pub fn new(descriptor: &DatasetDescriptor, definitions: &dyn DefinitionSource) -> CatalogResult<Self> {
        Self::build(descriptor, definitions, 0)
    }

    pub(crate) fn build(
        descriptor: &DatasetDescriptor,
        definitions: &dyn DefinitionSource,
        depth: usize,
    ) -> CatalogResult<Self> {
        if descriptor.is_chain_manifest() {
            ChainedEntry::new(descriptor, definitions, depth).map(TransformEntry::Chained)
        } else {
            GridShiftEntry::new(descriptor).map(TransformEntry::GridShift)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            TransformEntry::GridShift(entry) => &entry.descriptor.path,
            TransformEntry::Chained(entry) => &entry.path,
        }
    }

    /// Density when the entry can shift `p`, 0.0 otherwise
    pub fn coverage_test(&mut self, p: &GeoPoint) -> f64 {
        match self {
            TransformEntry::GridShift(entry) => entry.coverage_test(p),
            TransformEntry::Chained(entry) => entry.coverage_test(p),
        }
    }

    pub fn compute(&mut self, p: &GeoPoint) -> ShiftResult {
        match self {
            TransformEntry::GridShift(entry) => entry.compute(p),
            TransformEntry::Chained(entry) => entry.compute(p),
        }
    }

    /// Provenance of a shift at `p`
    pub fn describe(&mut self, p: &GeoPoint) -> String {
        match self {
            TransformEntry::GridShift(entry) => entry.describe(),
            TransformEntry::Chained(entry) => entry.describe(p),
        }
    }

    pub fn release(&mut self) {
        match self {
            TransformEntry::GridShift(entry) => entry.release(),
            TransformEntry::Chained(entry) => entry.release(),
        }
    }
}

/// A vertical correction grid, or a latitude/longitude grid pair
#[derive(Debug)]
pub struct GridShiftEntry {
    descriptor: DatasetDescriptor,
    latitude: GridFileReader,
    longitude: Option<GridFileReader>,
    coverage: GridCoverage,
}

impl GridShiftEntry {
    pub fn new(descriptor: &DatasetDescriptor) -> CatalogResult<Self> {
        let open = |path: &Path| {
            GridFileReader::new(path, descriptor.buffer_size, descriptor.density, descriptor.flags)
                .map_err(|source| CatalogError::Dataset {
                    path: path.to_path_buf(),
                    source,
                })
        };
        let latitude = open(&descriptor.path)?;
        let longitude = match &descriptor.longitude_path {
            Some(path) => Some(open(path)?),
            None => None,
        };

        let mut coverage = *latitude.coverage();
        if let Some(lng) = &longitude {
            let other = lng.coverage();
            coverage.south_west.0 = coverage.south_west.0.max(other.south_west.0);
            coverage.south_west.1 = coverage.south_west.1.max(other.south_west.1);
            coverage.north_east.0 = coverage.north_east.0.min(other.north_east.0);
            coverage.north_east.1 = coverage.north_east.1.min(other.north_east.1);
            coverage.density = coverage.density.max(other.density);
        }
        if descriptor.density != 0.0 {
            coverage.density = descriptor.density;
        }

        Ok(Self {
            descriptor: descriptor.clone(),
            latitude,
            longitude,
            coverage,
        })
    }

    pub fn descriptor(&self) -> &DatasetDescriptor {
        &self.descriptor
    }

    /// Box covered by every component grid, with the entry density
    pub fn coverage(&self) -> &GridCoverage {
        &self.coverage
    }

    pub fn density(&self) -> f64 {
        self.coverage.density
    }

    /// True for a latitude/longitude pair, false for a vertical grid
    pub fn is_horizontal(&self) -> bool {
        self.longitude.is_some()
    }

    pub fn readers(&self) -> impl Iterator<Item = &GridFileReader> {
        std::iter::once(&self.latitude).chain(self.longitude.as_ref())
    }

    /// Cell of the primary grid containing `p`
    pub fn grid_cell(&self, p: &GeoPoint) -> Option<GridCell> {
        self.latitude.grid_cell(p)
    }

    pub fn coverage_test(&mut self, p: &GeoPoint) -> f64 {
        if self.latitude.coverage_test(p) == 0.0 {
            return 0.0;
        }
        if let Some(lng) = self.longitude.as_mut() {
            if lng.coverage_test(p) == 0.0 {
                return 0.0;
            }
        }
        self.coverage.density
    }

    pub fn compute(&mut self, p: &GeoPoint) -> ShiftResult {
        let lat_value = match Self::value(&mut self.latitude, p) {
            Ok(Some(v)) => v,
            Ok(None) => return ShiftResult::degraded(*p),
            Err(_) => return ShiftResult::fatal(*p),
        };
        let Some(lng_reader) = self.longitude.as_mut() else {
            return ShiftResult::success(p.with_height(p.hgt + lat_value));
        };
        match Self::value(lng_reader, p) {
            Ok(Some(lng_value)) => ShiftResult::success(GeoPoint::new(
                p.lng + lng_value * SEC_TO_DEG,
                p.lat + lat_value * SEC_TO_DEG,
                p.hgt,
            )),
            Ok(None) => ShiftResult::degraded(*p),
            Err(_) => ShiftResult::fatal(*p),
        }
    }

    /// `None` for no data or a point off the grid
    fn value(reader: &mut GridFileReader, p: &GeoPoint) -> Result<Option<f64>, GridError> {
        match reader.lookup(p) {
            Ok(GridValue::Value(v)) => Ok(Some(v)),
            Ok(GridValue::NoData) | Err(GridError::OutsideCoverage { .. }) => Ok(None),
            Err(e) => {
                error!("grid lookup failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn describe(&self) -> String {
        match &self.longitude {
            Some(lng) => format!("{} + {}", self.latitude.path().display(), lng.path().display()),
            None => self.latitude.path().display().to_string(),
        }
    }

    pub fn release(&mut self) {
        self.latitude.release();
        if let Some(lng) = self.longitude.as_mut() {
            lng.release();
        }
    }
}

/// Nesting limit for chain manifests
const MAX_CHAIN_DEPTH: usize = 8;

/// Two catalogs applied in sequence through an intermediate datum
#[derive(Debug)]
pub struct ChainedEntry {
    path: PathBuf,
    density: f64,
    first: TransformCatalog,
    second: TransformCatalog,
}

impl ChainedEntry {
    fn new(
        descriptor: &DatasetDescriptor,
        definitions: &dyn DefinitionSource,
        depth: usize,
    ) -> CatalogResult<Self> {
        let path = descriptor.path.clone();
        let chain_error = |source: CatalogError| CatalogError::Chain {
            path: path.clone(),
            source: Box::new(source),
        };
        if depth >= MAX_CHAIN_DEPTH {
            return Err(chain_error(CatalogError::Description(DescriptionError::Invalid(
                format!("chains nested deeper than {}", MAX_CHAIN_DEPTH),
            ))));
        }

        let manifest = ChainManifest::from_file(&path).map_err(|e| chain_error(e.into()))?;
        let first = TransformCatalog::build(&manifest.first, definitions, depth + 1).map_err(chain_error)?;
        let second = TransformCatalog::build(&manifest.second, definitions, depth + 1).map_err(chain_error)?;
        let density = if descriptor.density != 0.0 {
            descriptor.density
        } else {
            manifest.density
        };

        Ok(Self {
            path,
            density,
            first,
            second,
        })
    }

    /// Fixed density, or 0.0 when it depends on the point
    pub fn fixed_density(&self) -> f64 {
        self.density
    }

    pub fn first(&self) -> &TransformCatalog {
        &self.first
    }

    pub fn second(&self) -> &TransformCatalog {
        &self.second
    }

    pub fn coverage_test(&mut self, p: &GeoPoint) -> f64 {
        let Some(first) = self.first.best_density(p) else {
            return 0.0;
        };
        let Some(second) = self.second.best_density(p) else {
            return 0.0;
        };
        if self.density != 0.0 {
            self.density
        } else {
            first.max(second)
        }
    }

    pub fn compute(&mut self, p: &GeoPoint) -> ShiftResult {
        let intermediate = self.first.compute_forward(p);
        if !intermediate.status.is_success() {
            return Self::failed(p, intermediate.status);
        }
        let result = self.second.compute_forward(&intermediate.point);
        if !result.status.is_success() {
            return Self::failed(p, result.status);
        }
        result
    }

    fn failed(p: &GeoPoint, status: ShiftStatus) -> ShiftResult {
        if status.is_fatal() {
            ShiftResult::fatal(*p)
        } else {
            ShiftResult::degraded(*p)
        }
    }

    pub fn describe(&mut self, p: &GeoPoint) -> String {
        let fallback = || "none".to_string();
        let first = self.first.describe_source(p).unwrap_or_else(fallback);
        let second = self.second.describe_source(p).unwrap_or_else(fallback);
        format!("{} -> {}", first, second)
    }

    pub fn release(&mut self) {
        self.first.release();
        self.second.release();
    }
}
