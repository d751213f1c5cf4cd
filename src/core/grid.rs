//! Buffered reader for binary correction grids
//!
//! # Grid File Format
//!
//! ```text
//! +----------------------+  offset 0
//! | header (80 bytes)    |  bounds and spacing in arc-seconds, little-endian
//! +----------------------+  offset 80
//! | record 0 (north)     |  element_count signed integers, west to east
//! | record 1             |
//! | ...                  |
//! | record n-1 (south)   |
//! +----------------------+  offset 80 + record_count * record_size
//! ```
//!
//! - Elements are 2 or 4 byte signed integers in the byte order named by
//!   the header; real value = stored value / factor
//! - For 2 byte grids the stored value 32767 marks a cell without data
//!
//! The reader never holds more than its configured buffer: lookups need a
//! three record window and the reader refills it on demand, extending the
//! window by whole records up to the buffer size.

use crate::core::error::{GridError, GridFormatError, GridFormatResult, GridResult};
use crate::core::interpolate::{biquadratic, read_element};
use crate::core::io::read_exact_at;
use crate::core::{GeoPoint, GridCell, GridCoverage};
use log::debug;
use std::fs::File;
use std::io::Read;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Size of the fixed header in bytes
pub const HEADER_SIZE: u64 = 80;

/// Value reported for cells without data
pub const NO_DATA_VALUE: f64 = 9999.0;

/// Stored 2 byte value marking a cell without data
const NO_DATA_RAW: i64 = 32767;

/// Records in an interpolation stencil
const STENCIL_RECORDS: usize = 3;

/// Fixed grid header, decoded from its little-endian on-disk layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHeader {
    pub south: i32,
    pub north: i32,
    pub west: i32,
    pub east: i32,
    pub ns_spacing: i16,
    pub ew_spacing: i16,
    pub global: i16,
    pub data_type: i16,
    /// Stored value = real value * factor
    pub factor: f64,
    pub element_size: i16,
    /// 0 = big-endian data, 1 = little-endian data
    pub byte_order: i16,
    /// 1 = bounds and spacing stored in milli-arc-seconds
    pub boundary_scale: i16,
}

impl GridHeader {
    pub fn parse(bytes: &[u8; HEADER_SIZE as usize]) -> Self {
        let i32_at = |at: usize| i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let i16_at = |at: usize| i16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let mut factor = [0u8; 8];
        factor.copy_from_slice(&bytes[24..32]);

        Self {
            south: i32_at(0),
            north: i32_at(4),
            west: i32_at(8),
            east: i32_at(12),
            ns_spacing: i16_at(16),
            ew_spacing: i16_at(18),
            global: i16_at(20),
            data_type: i16_at(22),
            factor: f64::from_le_bytes(factor),
            element_size: i16_at(32),
            byte_order: i16_at(48),
            boundary_scale: i16_at(50),
        }
    }

    /// Convert a raw bound or spacing value to degrees
    pub fn to_degrees(&self, raw: i64) -> f64 {
        let seconds = if self.boundary_scale == 1 {
            raw as f64 / 1000.0
        } else {
            raw as f64
        };
        seconds / 3600.0
    }

    pub fn data_is_little_endian(&self) -> bool {
        self.byte_order == 1
    }

    fn validate(&self, path: &Path) -> GridFormatResult<()> {
        let invalid = |message: String| GridFormatError::InvalidHeader {
            path: path.to_path_buf(),
            message,
        };

        if self.element_size != 2 && self.element_size != 4 {
            return Err(invalid(format!("element size {}", self.element_size)));
        }
        if self.ns_spacing <= 0 || self.ew_spacing <= 0 {
            return Err(invalid(format!(
                "spacing {} x {}",
                self.ns_spacing, self.ew_spacing
            )));
        }
        if !self.factor.is_finite() || self.factor == 0.0 {
            return Err(invalid(format!("storage factor {}", self.factor)));
        }
        if self.east <= self.west || self.north <= self.south {
            return Err(invalid(format!(
                "bounds west {} east {} south {} north {}",
                self.west, self.east, self.south, self.north
            )));
        }
        Ok(())
    }
}

/// Outcome of an in-coverage lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridValue {
    /// Interpolated correction
    Value(f64),
    /// Some stencil cell carries no data
    NoData,
}

impl GridValue {
    /// Interpolated value, or [`NO_DATA_VALUE`]
    pub fn value(&self) -> f64 {
        match self {
            GridValue::Value(v) => *v,
            GridValue::NoData => NO_DATA_VALUE,
        }
    }

    /// 0 for a value, 1 for no-data
    pub fn status_code(&self) -> i32 {
        match self {
            GridValue::Value(_) => 0,
            GridValue::NoData => 1,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, GridValue::NoData)
    }
}

/// Which clamped axes a lookup sits on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Edges {
    north: bool,
    south: bool,
    west: bool,
    east: bool,
}

/// Reader for one binary correction grid
///
/// Header metadata is parsed eagerly; the file handle and buffer are
/// acquired on the first lookup and dropped by [`release`](Self::release).
#[derive(Debug)]
pub struct GridFileReader {
    path: PathBuf,
    header: GridHeader,
    coverage: GridCoverage,
    element_count: usize,
    record_count: usize,
    record_size: usize,
    delta_lng: f64,
    delta_lat: f64,
    data_factor: f64,
    file_size: u64,
    element_size: usize,
    swap: bool,
    flags: u32,
    buffer_size: usize,
    file: Option<File>,
    buffer: Vec<u8>,
    window: Option<Range<u64>>,
}

impl GridFileReader {
    /// Open and validate a grid file
    ///
    /// `buffer_size` is the requested window size in bytes (see
    /// [`plan_buffer_size`](Self::plan_buffer_size)); a non-zero
    /// `density_override` replaces the density derived from the spacing.
    pub fn new(
        path: impl AsRef<Path>,
        buffer_size: usize,
        density_override: f64,
        flags: u32,
    ) -> GridFormatResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(GridFormatError::FileNotFound(path.to_path_buf()));
        }
        let is_byn = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("byn"))
            .unwrap_or(false);
        if !is_byn {
            return Err(GridFormatError::UnsupportedExtension(path.to_path_buf()));
        }

        let io_error = |source: std::io::Error| GridFormatError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(io_error)?;
        let file_size = file.metadata().map_err(io_error)?.len();
        if file_size < HEADER_SIZE {
            return Err(GridFormatError::TruncatedHeader {
                path: path.to_path_buf(),
                len: file_size,
            });
        }

        let mut raw = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut raw).map_err(io_error)?;
        let header = GridHeader::parse(&raw);
        header.validate(path)?;

        let invalid = |message: String| GridFormatError::InvalidHeader {
            path: path.to_path_buf(),
            message,
        };
        // i32 bounds over a positive i16 spacing cannot overflow i64
        let element_count = (header.east as i64 - header.west as i64) / header.ew_spacing as i64 + 1;
        let record_count = (header.north as i64 - header.south as i64) / header.ns_spacing as i64 + 1;
        if element_count < STENCIL_RECORDS as i64 || record_count < STENCIL_RECORDS as i64 {
            return Err(invalid(format!(
                "grid of {} x {} is smaller than 3 x 3",
                element_count, record_count
            )));
        }

        let too_large = || {
            invalid(format!(
                "grid of {} x {} exceeds the addressable file size",
                element_count, record_count
            ))
        };
        let record_bytes = (element_count as u64)
            .checked_mul(header.element_size as u64)
            .ok_or_else(too_large)?;
        let expected = record_bytes
            .checked_mul(record_count as u64)
            .and_then(|data| data.checked_add(HEADER_SIZE))
            .ok_or_else(too_large)?;
        if expected != file_size {
            return Err(GridFormatError::SizeMismatch {
                path: path.to_path_buf(),
                expected,
                actual: file_size,
            });
        }

        // Bounded by the file size from here on; only a 32-bit target can fail
        let to_usize = |n: u64| {
            usize::try_from(n).map_err(|_| invalid(format!("dimension {} does not fit in memory", n)))
        };
        let element_count = to_usize(element_count as u64)?;
        let record_count = to_usize(record_count as u64)?;
        let element_size = header.element_size as usize;
        let record_size = to_usize(record_bytes)?;

        let delta_lng = header.to_degrees(header.ew_spacing as i64);
        let delta_lat = header.to_degrees(header.ns_spacing as i64);
        let density = if density_override != 0.0 {
            density_override
        } else {
            delta_lng.min(delta_lat)
        };
        let coverage = GridCoverage::new(
            (header.to_degrees(header.west as i64), header.to_degrees(header.south as i64)),
            (header.to_degrees(header.east as i64), header.to_degrees(header.north as i64)),
            density,
        );

        let swap = header.data_is_little_endian() != cfg!(target_endian = "little");
        let buffer_size = Self::plan_buffer_size(buffer_size, file_size, record_size, record_count);

        Ok(Self {
            path: path.to_path_buf(),
            header,
            coverage,
            element_count,
            record_count,
            record_size,
            delta_lng,
            delta_lat,
            data_factor: 1.0 / header.factor,
            file_size,
            element_size,
            swap,
            flags,
            buffer_size,
            file: None,
            buffer: Vec::new(),
            window: None,
        })
    }

    /// Effective buffer size for a requested size
    ///
    /// The whole file when the request covers it, otherwise whole records
    /// and never fewer than three. A window that would reach the size of the
    /// data region buffers the whole file instead.
    ///
    /// # Examples
    /// ```
    /// use datum_shift::GridFileReader;
    /// // 10 records of 100 bytes
    /// assert_eq!(GridFileReader::plan_buffer_size(5000, 1080, 100, 10), 1080);
    /// assert_eq!(GridFileReader::plan_buffer_size(450, 1080, 100, 10), 400);
    /// assert_eq!(GridFileReader::plan_buffer_size(0, 1080, 100, 10), 300);
    /// assert_eq!(GridFileReader::plan_buffer_size(1050, 1080, 100, 10), 1080);
    /// ```
    pub fn plan_buffer_size(
        requested: usize,
        file_size: u64,
        record_size: usize,
        record_count: usize,
    ) -> usize {
        if requested as u64 >= file_size {
            return file_size as usize;
        }
        let minimum = STENCIL_RECORDS * record_size;
        let size = if requested > minimum {
            requested - requested % record_size
        } else {
            minimum
        };
        if size >= record_count * record_size {
            file_size as usize
        } else {
            size
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &GridHeader {
        &self.header
    }

    pub fn coverage(&self) -> &GridCoverage {
        &self.coverage
    }

    pub fn density(&self) -> f64 {
        self.coverage.density
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    pub fn delta_lng(&self) -> f64 {
        self.delta_lng
    }

    pub fn delta_lat(&self) -> f64 {
        self.delta_lat
    }

    /// Reciprocal of the header storage factor
    pub fn data_factor(&self) -> f64 {
        self.data_factor
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// True when file data must be byte swapped on this host
    pub fn swaps_bytes(&self) -> bool {
        self.swap
    }

    pub fn flags(&self) -> u32 {
        self.flags
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Absolute file range currently held in memory
    pub fn buffer_window(&self) -> Option<Range<u64>> {
        self.window.clone()
    }

    /// True when neither a buffer nor a file handle is held
    pub fn is_released(&self) -> bool {
        self.window.is_none() && self.file.is_none() && self.buffer.is_empty()
    }

    /// Drop the buffer and file handle, keeping all header metadata
    pub fn release(&mut self) {
        self.file = None;
        self.buffer = Vec::new();
        self.window = None;
    }

    /// Density when the grid has real data at `p`, 0.0 otherwise
    ///
    /// Bounding boxes are not tight, so points inside the box are checked
    /// with a real lookup. A failing lookup still reports the density; the
    /// error resurfaces when the caller computes with this grid.
    pub fn coverage_test(&mut self, p: &GeoPoint) -> f64 {
        if !self.coverage.strictly_contains(p) {
            return 0.0;
        }
        match self.lookup(p) {
            Ok(GridValue::Value(_)) => self.coverage.density,
            Ok(GridValue::NoData) => 0.0,
            Err(e) => {
                debug!("coverage test on {} failed: {}", self.path.display(), e);
                self.coverage.density
            }
        }
    }

    /// The grid cell containing `p`, if `p` is inside the bounding box
    pub fn grid_cell(&self, p: &GeoPoint) -> Option<GridCell> {
        if !self.coverage.contains(p) {
            return None;
        }
        let (west, south) = self.coverage.south_west;
        let max_col = (self.element_count - 2) as f64;
        let max_row = (self.record_count - 2) as f64;
        let col = ((p.lng - west) / self.delta_lng).floor().clamp(0.0, max_col);
        let row = ((p.lat - south) / self.delta_lat).floor().clamp(0.0, max_row);

        let sw = (west + col * self.delta_lng, south + row * self.delta_lat);
        Some(GridCell {
            south_west: sw,
            north_east: (sw.0 + self.delta_lng, sw.1 + self.delta_lat),
        })
    }

    /// Interpolated correction at `p`
    ///
    /// Points outside the closed bounding box are rejected without touching
    /// the file. I/O and internal failures release the reader before the
    /// error is returned.
    pub fn lookup(&mut self, p: &GeoPoint) -> GridResult<GridValue> {
        if !self.coverage.contains(p) {
            return Err(GridError::OutsideCoverage { lng: p.lng, lat: p.lat });
        }
        match self.interpolate(p) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.release();
                Err(e)
            }
        }
    }

    fn interpolate(&mut self, p: &GeoPoint) -> GridResult<GridValue> {
        let west = self.coverage.south_west.0;
        let north = self.coverage.north_east.1;
        let last_ele = self.element_count as i64 - 1;
        let last_rec = self.record_count as i64 - 1;

        // Nearest node; records run north to south
        let ele = ((p.lng - west) / self.delta_lng + 0.5).floor() as i64;
        let rec = ((north - p.lat) / self.delta_lat + 0.5).floor() as i64;

        let edges = Edges {
            north: rec < 1,
            south: rec > last_rec - 1,
            west: ele < 1,
            east: ele > last_ele - 1,
        };
        let rec_c = rec.clamp(1, last_rec - 1);
        let ele_c = ele.clamp(1, last_ele - 1);

        let record_size = self.record_size as u64;
        let begin = HEADER_SIZE + (rec_c - 1) as u64 * record_size;
        let end = begin + STENCIL_RECORDS as u64 * record_size;
        self.ensure_window(begin, end)?;
        let window_start = self.window.as_ref().map(|w| w.start).unwrap_or(0);

        let mut stencil = [0.0; 9];
        for r in 0..3i64 {
            let data_row = if edges.north {
                0
            } else if edges.south {
                last_rec
            } else {
                rec_c - 1 + r
            };
            for c in 0..3i64 {
                let data_col = if edges.west {
                    0
                } else if edges.east {
                    last_ele
                } else {
                    ele_c - 1 + c
                };
                let absolute = HEADER_SIZE
                    + data_row as u64 * record_size
                    + data_col as u64 * self.element_size as u64;
                let offset = (absolute - window_start) as usize;
                let raw = read_element(&self.buffer, offset, self.element_size, self.swap)
                    .ok_or_else(|| {
                        GridError::Internal(format!(
                            "element at {} outside buffer of {} bytes",
                            absolute,
                            self.buffer.len()
                        ))
                    })?;
                let value = if self.element_size == 2 && raw == NO_DATA_RAW {
                    NO_DATA_VALUE
                } else {
                    raw as f64 * self.data_factor
                };
                // Stencil rows are stored south first
                stencil[((2 - r) * 3 + c) as usize] = value;
            }
        }

        if stencil.iter().any(|v| *v >= NO_DATA_VALUE) {
            return Ok(GridValue::NoData);
        }

        let center_lng = west + self.delta_lng * ele_c as f64;
        let center_lat = north - self.delta_lat * rec_c as f64;
        let delta_x = if edges.west || edges.east {
            1.0
        } else {
            (p.lng - center_lng) / self.delta_lng + 1.0
        };
        let delta_y = if edges.north || edges.south {
            1.0
        } else {
            (p.lat - center_lat) / self.delta_lat + 1.0
        };

        Ok(GridValue::Value(biquadratic((delta_x, delta_y), &stencil)))
    }

    fn ensure_window(&mut self, begin: u64, end: u64) -> GridResult<()> {
        if let Some(window) = &self.window {
            if window.start <= begin && end <= window.end {
                return Ok(());
            }
        }
        self.refill(begin)
    }

    fn refill(&mut self, begin: u64) -> GridResult<()> {
        let range = self.plan_window(begin)?;
        let len = (range.end - range.start) as usize;
        self.window = None;
        self.buffer.resize(len, 0);

        if self.file.is_none() {
            let file = File::open(&self.path).map_err(|source| GridError::Io {
                path: self.path.clone(),
                source,
            })?;
            self.file = Some(file);
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| GridError::Internal("grid file handle missing".to_string()))?;
        read_exact_at(file, range.start, &mut self.buffer).map_err(|source| GridError::Io {
            path: self.path.clone(),
            source,
        })?;

        if self.is_whole_file() {
            self.file = None;
        }
        debug!(
            "buffered {} bytes [{}, {}) of {}",
            len,
            range.start,
            range.end,
            self.path.display()
        );
        self.window = Some(range);
        Ok(())
    }

    fn is_whole_file(&self) -> bool {
        self.buffer_size as u64 == self.file_size
    }

    /// Window of exactly `buffer_size` bytes around the stencil at `begin`
    fn plan_window(&self, begin: u64) -> GridResult<Range<u64>> {
        if self.is_whole_file() {
            return Ok(0..self.file_size);
        }

        let record_size = self.record_size as u64;
        let buffer_size = self.buffer_size as u64;
        let mut start = begin;
        let mut end = begin + STENCIL_RECORDS as u64 * record_size;

        let spare = buffer_size.saturating_sub(end - start) / record_size;
        let available_before = (start - HEADER_SIZE) / record_size;
        let available_after = self.file_size.saturating_sub(end) / record_size;

        let before = (spare / 2).min(available_before);
        let after = (spare - before).min(available_after);
        let more_before = (spare - before - after).min(available_before - before);
        start -= (before + more_before) * record_size;
        end += after * record_size;

        if end - start != buffer_size {
            return Err(GridError::Internal(format!(
                "window [{}, {}) does not fill buffer of {} bytes",
                start, end, buffer_size
            )));
        }
        Ok(start..end)
    }
}
