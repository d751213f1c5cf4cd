//! Geographic coverage of a correction dataset

use crate::core::GeoPoint;

/// Bounding region and nominal resolution of a dataset
///
/// `density` is a precision score: smaller means finer and is preferred when
/// datasets overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCoverage {
    /// Southwest corner as (longitude, latitude) in degrees
    pub south_west: (f64, f64),
    /// Northeast corner as (longitude, latitude) in degrees
    pub north_east: (f64, f64),
    pub density: f64,
}

impl GridCoverage {
    pub fn new(south_west: (f64, f64), north_east: (f64, f64), density: f64) -> Self {
        Self {
            south_west,
            north_east,
            density,
        }
    }

    /// True when the point lies inside or on the boundary
    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.lng >= self.south_west.0
            && p.lng <= self.north_east.0
            && p.lat >= self.south_west.1
            && p.lat <= self.north_east.1
    }

    /// True when the point lies strictly inside
    pub fn strictly_contains(&self, p: &GeoPoint) -> bool {
        p.lng > self.south_west.0
            && p.lng < self.north_east.0
            && p.lat > self.south_west.1
            && p.lat < self.north_east.1
    }

    /// Density for points strictly inside, 0.0 otherwise
    ///
    /// # Examples
    /// ```
    /// use datum_shift::{GeoPoint, GridCoverage};
    /// let cov = GridCoverage::new((0.0, 0.0), (1.0, 1.0), 0.5);
    /// assert_eq!(cov.test(&GeoPoint::from_lng_lat(0.5, 0.5)), 0.5);
    /// assert_eq!(cov.test(&GeoPoint::from_lng_lat(1.0, 0.5)), 0.0);
    /// ```
    pub fn test(&self, p: &GeoPoint) -> f64 {
        if self.strictly_contains(p) {
            self.density
        } else {
            0.0
        }
    }

    /// True when some point of the closed cell lies strictly inside this coverage
    pub fn reaches_into(&self, cell: &GridCell) -> bool {
        self.south_west.0 < cell.north_east.0
            && self.north_east.0 > cell.south_west.0
            && self.south_west.1 < cell.north_east.1
            && self.north_east.1 > cell.south_west.1
    }
}

/// One closed grid cell, used as a cache key region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub south_west: (f64, f64),
    pub north_east: (f64, f64),
}

impl GridCell {
    pub fn contains(&self, p: &GeoPoint) -> bool {
        p.lng >= self.south_west.0
            && p.lng <= self.north_east.0
            && p.lat >= self.south_west.1
            && p.lat <= self.north_east.1
    }
}
