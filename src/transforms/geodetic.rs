//! Classical datum shifts
//!
//! Whole-domain parametric transforms used as fallbacks when no grid or
//! regression covers a point:
//!
//! - Standard (non-abridged) Molodensky: translation plus ellipsoid change
//! - Six parameter: translation plus rotation, through geocentric XYZ
//! - Seven parameter: translation, rotation and scale, through geocentric XYZ
//!
//! Rotations use the coordinate frame convention and are given in
//! arc-seconds; scale is in parts per million.

use crate::core::{GeoPoint, TransformError};
use serde::{Deserialize, Serialize};

const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Reference ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// Semi-major axis in metres
    pub semi_major_axis: f64,
    /// Inverse flattening; 0 for a sphere
    pub inverse_flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: 6_378_137.0,
        inverse_flattening: 298.257_223_563,
    };

    pub fn new(semi_major_axis: f64, inverse_flattening: f64) -> Self {
        Self {
            semi_major_axis,
            inverse_flattening,
        }
    }

    pub fn flattening(&self) -> f64 {
        if self.inverse_flattening == 0.0 {
            0.0
        } else {
            1.0 / self.inverse_flattening
        }
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.flattening())
    }

    /// First eccentricity squared
    pub fn eccentricity_squared(&self) -> f64 {
        let f = self.flattening();
        f * (2.0 - f)
    }

    /// Second eccentricity squared
    pub fn second_eccentricity_squared(&self) -> f64 {
        let es = self.eccentricity_squared();
        es / (1.0 - es)
    }

    /// Radius of curvature in the prime vertical
    pub fn prime_vertical_radius(&self, lat_rad: f64) -> f64 {
        let s = lat_rad.sin();
        self.semi_major_axis / (1.0 - self.eccentricity_squared() * s * s).sqrt()
    }

    /// Radius of curvature in the meridian
    pub fn meridian_radius(&self, lat_rad: f64) -> f64 {
        let es = self.eccentricity_squared();
        let s = lat_rad.sin();
        self.semi_major_axis * (1.0 - es) / (1.0 - es * s * s).powf(1.5)
    }

    /// Geodetic (degrees, metres) to geocentric XYZ
    pub fn to_geocentric(&self, p: &GeoPoint) -> [f64; 3] {
        let lat = p.lat.to_radians();
        let lng = p.lng.to_radians();
        let n = self.prime_vertical_radius(lat);
        let es = self.eccentricity_squared();
        [
            (n + p.hgt) * lat.cos() * lng.cos(),
            (n + p.hgt) * lat.cos() * lng.sin(),
            (n * (1.0 - es) + p.hgt) * lat.sin(),
        ]
    }

    /// Geocentric XYZ to geodetic (degrees, metres), Bowring's method
    pub fn to_geodetic(&self, xyz: [f64; 3]) -> GeoPoint {
        let [x, y, z] = xyz;
        let a = self.semi_major_axis;
        let b = self.semi_minor_axis();
        let es = self.eccentricity_squared();
        let eps = self.second_eccentricity_squared();

        let p = x.hypot(y);
        let theta = (z * a).atan2(p * b);
        let (st, ct) = theta.sin_cos();
        let lat = (z + eps * b * st * st * st).atan2(p - es * a * ct * ct * ct);
        let lng = y.atan2(x);

        let n = self.prime_vertical_radius(lat);
        let hgt = if lat.cos().abs() > 1.0e-10 {
            p / lat.cos() - n
        } else {
            z / lat.sin() - n * (1.0 - es)
        };
        GeoPoint::new(lng.to_degrees(), lat.to_degrees(), hgt)
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Ellipsoid::WGS84
    }
}

/// Named datum with its shift parameters relative to WGS-84
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatumDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ellipsoid: Ellipsoid,
    /// Translation in metres
    #[serde(default)]
    pub translation: [f64; 3],
    /// Rotation in arc-seconds
    #[serde(default)]
    pub rotation: [f64; 3],
    /// Scale in parts per million
    #[serde(default)]
    pub scale_ppm: f64,
}

impl DatumDefinition {
    pub fn has_translation(&self) -> bool {
        self.translation.iter().any(|v| *v != 0.0)
    }

    pub fn has_rotation(&self) -> bool {
        self.rotation.iter().any(|v| *v != 0.0)
    }

    pub fn has_scale(&self) -> bool {
        self.scale_ppm != 0.0
    }
}

/// Parameters of a shift between two ellipsoids
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatumShift {
    pub source: Ellipsoid,
    pub target: Ellipsoid,
    pub translation: [f64; 3],
    pub rotation: [f64; 3],
    pub scale_ppm: f64,
}

impl DatumShift {
    pub fn from_definition(definition: &DatumDefinition, target: Ellipsoid) -> Self {
        Self {
            source: definition.ellipsoid,
            target,
            translation: definition.translation,
            rotation: definition.rotation,
            scale_ppm: definition.scale_ppm,
        }
    }

    /// Standard Molodensky shift; rotation and scale are ignored
    pub fn molodensky(&self, p: &GeoPoint) -> Result<GeoPoint, TransformError> {
        let [dx, dy, dz] = self.translation;
        let src = &self.source;
        let a = src.semi_major_axis;
        let b = src.semi_minor_axis();
        let f = src.flattening();
        let es = src.eccentricity_squared();
        let da = self.target.semi_major_axis - a;
        let df = self.target.flattening() - f;

        let lat = p.lat.to_radians();
        let lng = p.lng.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lng, cos_lng) = lng.sin_cos();
        let rn = src.prime_vertical_radius(lat);
        let rm = src.meridian_radius(lat);

        let dlat = (-dx * sin_lat * cos_lng - dy * sin_lat * sin_lng
            + dz * cos_lat
            + da * (rn * es * sin_lat * cos_lat) / a
            + df * (rm * a / b + rn * b / a) * sin_lat * cos_lat)
            / (rm + p.hgt);
        let dlng = (-dx * sin_lng + dy * cos_lng) / ((rn + p.hgt) * cos_lat);
        let dhgt = dx * cos_lat * cos_lng + dy * cos_lat * sin_lng + dz * sin_lat - da * a / rn
            + df * b / a * rn * sin_lat * sin_lat;

        finite(GeoPoint::new(
            p.lng + dlng.to_degrees(),
            p.lat + dlat.to_degrees(),
            p.hgt + dhgt,
        ))
    }

    /// Helmert shift through geocentric coordinates
    ///
    /// `X' = T + (1 + s) R X` with the coordinate frame rotation matrix.
    pub fn helmert(&self, p: &GeoPoint, with_scale: bool) -> Result<GeoPoint, TransformError> {
        let [x, y, z] = self.source.to_geocentric(p);
        let [rx, ry, rz] = self.rotation.map(|r| r * ARCSEC_TO_RAD);
        let [tx, ty, tz] = self.translation;
        let m = if with_scale {
            1.0 + self.scale_ppm * 1.0e-6
        } else {
            1.0
        };

        let shifted = [
            tx + m * (x + rz * y - ry * z),
            ty + m * (-rz * x + y + rx * z),
            tz + m * (ry * x - rx * y + z),
        ];
        finite(self.target.to_geodetic(shifted))
    }
}

fn finite(p: GeoPoint) -> Result<GeoPoint, TransformError> {
    if p.is_finite() {
        Ok(p)
    } else {
        Err(TransformError::NonFinite)
    }
}

/// Parametric fallback, chosen from which parameters a datum defines
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FallbackMethod {
    #[default]
    None,
    Molodensky(DatumShift),
    SixParameter(DatumShift),
    SevenParameter(DatumShift),
}

impl FallbackMethod {
    /// Choose the richest method the definition supports
    ///
    /// No translation selects `None`; translation alone selects
    /// Molodensky; rotation adds the six parameter form and a scale the
    /// seven parameter form.
    pub fn select(definition: &DatumDefinition, target: Ellipsoid) -> Self {
        if !definition.has_translation() {
            return FallbackMethod::None;
        }
        let shift = DatumShift::from_definition(definition, target);
        if definition.has_scale() {
            FallbackMethod::SevenParameter(shift)
        } else if definition.has_rotation() {
            FallbackMethod::SixParameter(shift)
        } else {
            FallbackMethod::Molodensky(shift)
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FallbackMethod::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FallbackMethod::None => "none",
            FallbackMethod::Molodensky(_) => "Molodensky",
            FallbackMethod::SixParameter(_) => "six parameter",
            FallbackMethod::SevenParameter(_) => "seven parameter",
        }
    }

    /// Forward shift of `p`
    pub fn apply(&self, p: &GeoPoint) -> Result<GeoPoint, TransformError> {
        match self {
            FallbackMethod::None => Err(TransformError::NoFallback),
            FallbackMethod::Molodensky(shift) => shift.molodensky(p),
            FallbackMethod::SixParameter(shift) => shift.helmert(p, false),
            FallbackMethod::SevenParameter(shift) => shift.helmert(p, true),
        }
    }
}
