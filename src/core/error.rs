//! Error types for datum-shift
//!
//! Defines all error types used throughout the library. Construction
//! failures surface as these errors; compute entry points translate them
//! into a [`ShiftStatus`](crate::core::ShiftStatus) instead.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for datum-shift operations
#[derive(Debug, Error)]
pub enum DatumShiftError {
    /// Grid file format errors
    #[error("Grid format error: {0}")]
    GridFormat(#[from] GridFormatError),

    /// Grid lookup errors
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),

    /// Transform evaluation errors
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Catalog construction errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Description file errors
    #[error("Description error: {0}")]
    Description(#[from] DescriptionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while opening and validating a grid file
///
/// These are fatal at construction and never retried.
#[derive(Debug, Error)]
pub enum GridFormatError {
    /// Grid file does not exist
    #[error("Grid file not found: {0}")]
    FileNotFound(PathBuf),

    /// Grid file does not carry the `.byn` extension
    #[error("Unsupported grid file extension: {0}")]
    UnsupportedExtension(PathBuf),

    /// File is shorter than the fixed header
    #[error("Truncated grid header in {path}: {len} bytes")]
    TruncatedHeader { path: PathBuf, len: u64 },

    /// A header field carries an unusable value
    #[error("Invalid grid header in {path}: {message}")]
    InvalidHeader { path: PathBuf, message: String },

    /// Data region does not match the dimensions in the header
    #[error("Grid file size mismatch in {path}: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// I/O error while reading the header
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a grid lookup after construction
#[derive(Debug, Error)]
pub enum GridError {
    /// Point is outside the grid bounding box
    #[error("Point ({lng}, {lat}) is outside the grid coverage")]
    OutsideCoverage { lng: f64, lat: f64 },

    /// Seek/read failure; the reader has been released
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Internal consistency check failed
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while evaluating a closed-form transform
#[derive(Debug, Error)]
pub enum TransformError {
    /// Normalized coordinates exceed the regression validation radius
    #[error("Point outside regression domain: |uu| = {uu}, |vv| = {vv}, radius {radius}")]
    OutOfDomain { uu: f64, vv: f64, radius: f64 },

    /// Out-of-domain point and no fallback configured
    #[error("No fallback transformation is available")]
    NoFallback,

    /// A formula produced NaN or infinity (e.g. at a pole)
    #[error("Transformation produced a non-finite result")]
    NonFinite,

    /// Transform parameters cannot be used
    #[error("Invalid transform parameters: {0}")]
    InvalidParameters(String),
}

/// Errors raised while building a transform catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A dataset could not be opened
    #[error("Failed to open dataset {path}: {source}")]
    Dataset {
        path: PathBuf,
        #[source]
        source: GridFormatError,
    },

    /// A chain manifest could not be built
    #[error("Failed to build chained transform {path}: {source}")]
    Chain {
        path: PathBuf,
        #[source]
        source: Box<CatalogError>,
    },

    /// The named fallback is not known to the definition source
    #[error("Unknown fallback definition: {0}")]
    UnknownFallback(String),

    /// The named fallback carries no usable parameters
    #[error("Fallback definition {0} has no transformation parameters")]
    InvalidFallback(String),

    /// Description could not be read
    #[error("Description error: {0}")]
    Description(#[from] DescriptionError),
}

/// Errors raised while reading catalog or definition descriptions
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// Description file not found
    #[error("Description file not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed YAML
    #[error("Failed to parse description: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Well-formed YAML with an unusable value
    #[error("Invalid description: {0}")]
    Invalid(String),
}

/// Result type alias for datum-shift operations
pub type Result<T> = std::result::Result<T, DatumShiftError>;

/// Result type alias for grid construction
pub type GridFormatResult<T> = std::result::Result<T, GridFormatError>;

/// Result type alias for grid lookups
pub type GridResult<T> = std::result::Result<T, GridError>;

/// Result type alias for catalog construction
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Result type alias for description loading
pub type DescriptionResult<T> = std::result::Result<T, DescriptionError>;
