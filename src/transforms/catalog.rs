//! Dataset selection and shift orchestration
//!
//! A [`TransformCatalog`] owns its entries in description order, an
//! optional whole-domain [`Fallback`] and a [`GridCellCache`]. For each
//! point it picks the covering entry with the smallest density; ties go to
//! the entry listed first.

use crate::core::{
    solve_inverse, CatalogError, CatalogResult, GeoPoint, GridCell, InverseSettings, ShiftResult,
    TransformError,
};
use crate::transforms::cache::GridCellCache;
use crate::transforms::definitions::DefinitionSource;
use crate::transforms::description::CatalogDescription;
use crate::transforms::entry::TransformEntry;
use crate::transforms::geodetic::{DatumDefinition, Ellipsoid, FallbackMethod};
use log::{debug, error, info};
use std::path::Path;

/// Whole-domain parametric transform used when no entry covers a point
#[derive(Debug, Clone)]
pub struct Fallback {
    name: String,
    description: String,
    method: FallbackMethod,
}

impl Fallback {
    /// Fallback to WGS-84 for a datum definition
    pub fn from_definition(definition: &DatumDefinition) -> CatalogResult<Self> {
        let method = FallbackMethod::select(definition, Ellipsoid::WGS84);
        if method.is_none() {
            return Err(CatalogError::InvalidFallback(definition.name.clone()));
        }
        Ok(Self {
            name: definition.name.clone(),
            description: definition.description.clone(),
            method,
        })
    }

    /// Look up `name` and build its fallback
    pub fn resolve(name: &str, definitions: &dyn DefinitionSource) -> CatalogResult<Self> {
        let mut definition = definitions
            .datum(name)
            .ok_or_else(|| CatalogError::UnknownFallback(name.to_string()))?;
        if definition.name.is_empty() {
            definition.name = name.to_string();
        }
        Self::from_definition(&definition)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &FallbackMethod {
        &self.method
    }

    pub fn apply(&self, p: &GeoPoint) -> Result<GeoPoint, TransformError> {
        self.method.apply(p)
    }

    pub fn describe(&self) -> String {
        if self.description.is_empty() {
            format!("{} ({})", self.name, self.method.name())
        } else {
            format!("{} ({}, {})", self.name, self.description, self.method.name())
        }
    }
}

/// Ordered set of correction datasets with selection and caching
#[derive(Debug)]
pub struct TransformCatalog {
    entries: Vec<TransformEntry>,
    fallback: Option<Fallback>,
    cache: GridCellCache,
    inverse: InverseSettings,
}

impl TransformCatalog {
    /// Build every entry of `description`
    ///
    /// The first entry or fallback that fails aborts construction; entries
    /// already built are dropped with it.
    pub fn new(description: &CatalogDescription, definitions: &dyn DefinitionSource) -> CatalogResult<Self> {
        let catalog = Self::build(description, definitions, 0)?;
        info!(
            "transform catalog with {} datasets, fallback {}",
            catalog.entries.len(),
            catalog.fallback.as_ref().map(Fallback::name).unwrap_or("none")
        );
        Ok(catalog)
    }

    /// Load a description file and build its catalog
    pub fn from_file(path: impl AsRef<Path>, definitions: &dyn DefinitionSource) -> CatalogResult<Self> {
        let description = CatalogDescription::from_file(path)?;
        Self::new(&description, definitions)
    }

    pub(crate) fn build(
        description: &CatalogDescription,
        definitions: &dyn DefinitionSource,
        depth: usize,
    ) -> CatalogResult<Self> {
        let entries = description
            .datasets
            .iter()
            .map(|descriptor| TransformEntry::build(descriptor, definitions, depth))
            .collect::<CatalogResult<Vec<_>>>()?;
        let fallback = description
            .fallback
            .as_deref()
            .map(|name| Fallback::resolve(name, definitions))
            .transpose()?;

        Ok(Self {
            entries,
            fallback,
            cache: GridCellCache::new(description.cache_capacity),
            inverse: description.inverse,
        })
    }

    pub fn entries(&self) -> &[TransformEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        self.fallback.as_ref()
    }

    pub fn inverse_settings(&self) -> &InverseSettings {
        &self.inverse
    }

    pub fn cache(&self) -> &GridCellCache {
        &self.cache
    }

    /// Index of the covering entry with the smallest density
    pub fn select_best(&mut self, p: &GeoPoint) -> Option<usize> {
        self.select(p).map(|(index, _)| index)
    }

    /// Density of the best covering entry
    pub fn best_density(&mut self, p: &GeoPoint) -> Option<f64> {
        self.select(p).map(|(_, density)| density)
    }

    fn select(&mut self, p: &GeoPoint) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let density = entry.coverage_test(p);
            if density <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_density)) if density >= best_density => {}
                _ => best = Some((index, density)),
            }
        }
        best
    }

    /// Entry remembered for the cell containing `p`, if it still applies
    fn cached_entry(&mut self, p: &GeoPoint) -> Option<usize> {
        let index = self.cache.lookup(p)?;
        match self.entries.get(index) {
            Some(TransformEntry::GridShift(entry)) if entry.coverage().strictly_contains(p) => Some(index),
            _ => None,
        }
    }

    /// Cell to remember for a selection, when no other entry could win there
    fn cacheable_cell(&self, selected: usize, density: f64, p: &GeoPoint) -> Option<GridCell> {
        let TransformEntry::GridShift(chosen) = self.entries.get(selected)? else {
            return None;
        };
        let cell = chosen.grid_cell(p)?;

        for (index, entry) in self.entries.iter().enumerate() {
            if index == selected {
                continue;
            }
            let could_win = |other: f64| other < density || (other == density && index < selected);
            match entry {
                TransformEntry::GridShift(other) => {
                    if could_win(other.density()) && other.coverage().reaches_into(&cell) {
                        return None;
                    }
                }
                TransformEntry::Chained(chain) => {
                    if chain.fixed_density() == 0.0 || could_win(chain.fixed_density()) {
                        return None;
                    }
                }
            }
        }
        Some(cell)
    }

    /// Shift `p` with the best dataset, else the fallback
    ///
    /// Status is `Success` from a dataset, `FallbackUsed` from the
    /// fallback, `Degraded` with `p` unchanged when nothing applies and
    /// `Fatal` with `p` unchanged on I/O or internal failure.
    pub fn compute_forward(&mut self, p: &GeoPoint) -> ShiftResult {
        if let Some(index) = self.cached_entry(p) {
            let result = self.entries[index].compute(p);
            if result.status.is_success() {
                return result;
            }
            debug!("cached dataset {} did not apply at ({}, {})", index, p.lng, p.lat);
        }

        if let Some((index, density)) = self.select(p) {
            let result = self.entries[index].compute(p);
            if result.status.is_success() {
                if let Some(cell) = self.cacheable_cell(index, density, p) {
                    debug!("caching dataset {} for cell {:?}", index, cell);
                    self.cache.record(cell, index);
                }
            }
            return result;
        }

        match &self.fallback {
            Some(fallback) => match fallback.apply(p) {
                Ok(shifted) => ShiftResult::fallback(shifted),
                Err(e) => {
                    error!("fallback {} failed at ({}, {}): {}", fallback.name(), p.lng, p.lat, e);
                    ShiftResult::fatal(*p)
                }
            },
            None => ShiftResult::degraded(*p),
        }
    }

    /// Source point whose forward shift is `p`
    pub fn compute_inverse(&mut self, p: &GeoPoint) -> ShiftResult {
        let settings = self.inverse;
        solve_inverse(*p, &settings, |guess| self.compute_forward(&guess))
    }

    /// Name of the dataset or fallback that would shift `p`
    pub fn describe_source(&mut self, p: &GeoPoint) -> Option<String> {
        if let Some(index) = self.cached_entry(p) {
            return Some(self.entries[index].describe(p));
        }
        if let Some(index) = self.select_best(p) {
            return Some(self.entries[index].describe(p));
        }
        self.fallback.as_ref().map(Fallback::describe)
    }

    /// Release every grid buffer and file handle and forget cached cells
    pub fn release(&mut self) {
        for entry in &mut self.entries {
            entry.release();
        }
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(translation: [f64; 3]) -> DatumDefinition {
        DatumDefinition {
            name: "LOCAL".to_string(),
            description: String::new(),
            ellipsoid: Ellipsoid::WGS84,
            translation,
            rotation: [0.0; 3],
            scale_ppm: 0.0,
        }
    }

    #[test]
    fn test_fallback_describe() {
        let fallback = Fallback::from_definition(&definition([1.0, 2.0, 3.0])).unwrap();
        assert_eq!(fallback.describe(), "LOCAL (Molodensky)");
        assert!(fallback.apply(&GeoPoint::from_lng_lat(10.0, 50.0)).is_ok());
    }

    #[test]
    fn test_empty_definition_is_invalid() {
        assert!(matches!(
            Fallback::from_definition(&definition([0.0; 3])),
            Err(CatalogError::InvalidFallback(name)) if name == "LOCAL"
        ));
    }

    #[test]
    fn test_empty_catalog_degrades() {
        let mut catalog = TransformCatalog::build(&CatalogDescription::default(), &NoSource, 0).unwrap();
        let p = GeoPoint::new(1.0, 2.0, 3.0);
        assert!(catalog.is_empty());
        assert_eq!(catalog.compute_forward(&p), ShiftResult::degraded(p));
        assert_eq!(catalog.select_best(&p), None);
    }

    struct NoSource;

    impl DefinitionSource for NoSource {
        fn datum(&self, _name: &str) -> Option<DatumDefinition> {
            None
        }
    }
}
