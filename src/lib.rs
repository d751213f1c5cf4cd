//! DatumShift - Geodetic datum shifts from correction grids and regressions
//!
//! Converts geographic coordinates between reference datums using
//! externally supplied correction datasets.
//!
//! # Features
//!
//! - Buffered reader for large binary correction grids (`.byn`) with
//!   biquadratic interpolation
//! - Catalogs of overlapping datasets with best-density selection,
//!   a grid cell cache and parametric fallbacks
//! - Chained transforms through an intermediate datum
//! - Multiple regression polynomial transforms
//! - Iterative inverse for every forward-only transform
//! - Compressed description files (gzip, bzip2)
//!
//! # Example
//!
//! ```ignore
//! use datum_shift::{GeoPoint, InMemoryDefinitions, TransformCatalog};
//!
//! // Load catalog and fallback definitions
//! let definitions = InMemoryDefinitions::from_file("datums.yaml")?;
//! let mut catalog = TransformCatalog::from_file("nad27_to_nad83.yaml", &definitions)?;
//!
//! // Shift a point
//! let result = catalog.compute_forward(&GeoPoint::from_lng_lat(-75.5, 45.25));
//! println!("{:?} ({})", result.point, result.status);
//! ```

pub mod core;
pub mod transforms;

// Re-export commonly used types
pub use crate::core::{
    solve_inverse, CatalogError, DatumShiftError, GeoPoint, GridCoverage, GridError,
    GridFileReader, GridFormatError, GridValue, InverseSettings, Result, ShiftResult,
    ShiftStatus, TransformError,
};
pub use transforms::{
    CatalogDescription, DatasetDescriptor, DefinitionSource, Fallback, FallbackMethod,
    InMemoryDefinitions, RegressionParameters, RegressionTransform, TransformCatalog,
};
