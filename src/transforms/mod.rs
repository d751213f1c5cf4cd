//! Datum transforms built on the core grid machinery
//!
//! Catalog selection and caching, chained and grid shift entries, the
//! multiple regression transform and the parametric fallbacks.

mod cache;
mod catalog;
pub mod definitions;
pub mod description;
mod entry;
pub mod geodetic;
pub mod regression;

pub use cache::GridCellCache;
pub use catalog::{Fallback, TransformCatalog};
pub use definitions::{DefinitionSource, InMemoryDefinitions};
pub use description::{CatalogDescription, ChainManifest, DatasetDescriptor, DEFAULT_CACHE_CAPACITY};
pub use entry::{ChainedEntry, GridShiftEntry, TransformEntry};
pub use geodetic::{DatumDefinition, DatumShift, Ellipsoid, FallbackMethod};
pub use regression::{CoefficientMask, RegressionParameters, RegressionTerm, RegressionTransform};
