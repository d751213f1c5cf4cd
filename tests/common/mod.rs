//! Shared fixtures: synthetic `.byn` grids and description files
#![allow(dead_code)]

use datum_shift::transforms::{DatumDefinition, DefinitionSource};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Stored 2 byte no-data marker
pub const NO_DATA_RAW: i64 = 32767;

/// Synthetic grid; nodes are addressed (row, col) with row 0 the north edge
#[derive(Debug, Clone)]
pub struct TestGrid {
    /// South-west corner in whole arc-seconds
    pub west: i32,
    pub south: i32,
    /// Node spacing in arc-seconds
    pub spacing: i16,
    pub cols: usize,
    pub rows: usize,
    pub element_size: i16,
    pub factor: f64,
    pub little_endian: bool,
    pub values: Vec<i64>,
}

impl TestGrid {
    /// Grid of `cols` x `rows` nodes; corner and spacing in degrees
    pub fn new(west: f64, south: f64, cols: usize, rows: usize, spacing: f64) -> Self {
        Self {
            west: (west * 3600.0).round() as i32,
            south: (south * 3600.0).round() as i32,
            spacing: (spacing * 3600.0).round() as i16,
            cols,
            rows,
            element_size: 2,
            factor: 1.0,
            little_endian: true,
            values: vec![0; cols * rows],
        }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_element_size(mut self, size: i16) -> Self {
        self.element_size = size;
        self
    }

    pub fn spacing_degrees(&self) -> f64 {
        self.spacing as f64 / 3600.0
    }

    pub fn west_degrees(&self) -> f64 {
        self.west as f64 / 3600.0
    }

    pub fn south_degrees(&self) -> f64 {
        self.south as f64 / 3600.0
    }

    pub fn east_degrees(&self) -> f64 {
        self.west_degrees() + (self.cols - 1) as f64 * self.spacing_degrees()
    }

    pub fn north_degrees(&self) -> f64 {
        self.south_degrees() + (self.rows - 1) as f64 * self.spacing_degrees()
    }

    /// Longitude of a node column
    pub fn lng(&self, col: usize) -> f64 {
        self.west_degrees() + col as f64 * self.spacing_degrees()
    }

    /// Latitude of a node row
    pub fn lat(&self, row: usize) -> f64 {
        self.north_degrees() - row as f64 * self.spacing_degrees()
    }

    /// Set stored values from (row, col)
    pub fn fill_raw(mut self, f: impl Fn(usize, usize) -> i64) -> Self {
        for row in 0..self.rows {
            for col in 0..self.cols {
                self.values[row * self.cols + col] = f(row, col);
            }
        }
        self
    }

    /// Set real values from (lng, lat); stored as value * factor rounded
    pub fn fill(mut self, f: impl Fn(f64, f64) -> f64) -> Self {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let real = f(self.lng(col), self.lat(row));
                self.values[row * self.cols + col] = (real * self.factor).round() as i64;
            }
        }
        self
    }

    pub fn set_raw(&mut self, row: usize, col: usize, raw: i64) {
        self.values[row * self.cols + col] = raw;
    }

    pub fn bytes(&self) -> Vec<u8> {
        let east = self.west + (self.cols as i32 - 1) * self.spacing as i32;
        let north = self.south + (self.rows as i32 - 1) * self.spacing as i32;

        let mut out = vec![0u8; 80];
        out[0..4].copy_from_slice(&self.south.to_le_bytes());
        out[4..8].copy_from_slice(&north.to_le_bytes());
        out[8..12].copy_from_slice(&self.west.to_le_bytes());
        out[12..16].copy_from_slice(&east.to_le_bytes());
        out[16..18].copy_from_slice(&self.spacing.to_le_bytes());
        out[18..20].copy_from_slice(&self.spacing.to_le_bytes());
        out[24..32].copy_from_slice(&self.factor.to_le_bytes());
        out[32..34].copy_from_slice(&self.element_size.to_le_bytes());
        out[48..50].copy_from_slice(&(self.little_endian as i16).to_le_bytes());

        for v in &self.values {
            match (self.element_size, self.little_endian) {
                (2, true) => out.extend_from_slice(&(*v as i16).to_le_bytes()),
                (2, false) => out.extend_from_slice(&(*v as i16).to_be_bytes()),
                (_, true) => out.extend_from_slice(&(*v as i32).to_le_bytes()),
                (_, false) => out.extend_from_slice(&(*v as i32).to_be_bytes()),
            }
        }
        out
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).expect("create grid file");
        file.write_all(&self.bytes()).expect("write grid file");
        path
    }
}

pub fn write_text(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write text file");
    path
}

/// Definition source that knows nothing
pub struct NoDefinitions;

impl DefinitionSource for NoDefinitions {
    fn datum(&self, _name: &str) -> Option<DatumDefinition> {
        None
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
