//! Core datum-shift machinery
//!
//! This module contains the grid file reader, interpolation kernels,
//! the inverse solver, and the point/status types shared by every
//! transform.

mod coverage;
mod error;
pub mod grid;
pub mod interpolate;
pub mod io;
mod point;
mod solver;

pub use coverage::{GridCell, GridCoverage};
pub use error::{
    CatalogError, CatalogResult, DatumShiftError, DescriptionError, DescriptionResult,
    GridError, GridFormatError, GridFormatResult, GridResult, Result, TransformError,
};
pub use grid::{GridFileReader, GridHeader, GridValue, HEADER_SIZE, NO_DATA_VALUE};
pub use io::{detect_compression, CompressionFormat, DEFAULT_BUFFER_SIZE};
pub use point::{GeoPoint, ShiftResult, ShiftStatus, SEC_TO_DEG};
pub use solver::{solve_inverse, InverseSettings};
