//! Multiple regression datum shifts
//!
//! A shift defined by three bivariate polynomials in normalized
//! coordinates:
//!
//! ```text
//! uu = (lat + uu_offset) * normalization_scale
//! vv = (lng + vv_offset) * normalization_scale
//! d  = sum over i, j < 10 of c[i][j] * uu^i * vv^j
//! ```
//!
//! The longitude and latitude sums are arc-seconds, the height sum is
//! metres. Outside `validation_radius` the polynomials are meaningless and
//! the parametric fallback of the source datum takes over.

use crate::core::{
    solve_inverse, GeoPoint, InverseSettings, ShiftResult, ShiftStatus, TransformError, SEC_TO_DEG,
};
use crate::transforms::geodetic::{DatumDefinition, Ellipsoid, FallbackMethod};
use log::{error, warn};
use serde::{Deserialize, Serialize};

/// Degree limit (exclusive) of each polynomial variable
pub const MAX_POWER: usize = 10;

const TERM_COUNT: usize = MAX_POWER * MAX_POWER;

/// Presence bits of the 10 x 10 coefficient grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoefficientMask(u128);

impl CoefficientMask {
    fn bit(i: usize, j: usize) -> u128 {
        1u128 << (i * MAX_POWER + j)
    }

    /// Mask of the non-zero entries of a coefficient table
    pub fn from_coefficients(coefficients: &[f64; TERM_COUNT]) -> Self {
        let mut mask = Self::default();
        for (idx, c) in coefficients.iter().enumerate() {
            if *c != 0.0 {
                mask.set(idx / MAX_POWER, idx % MAX_POWER);
            }
        }
        mask
    }

    pub fn set(&mut self, i: usize, j: usize) {
        self.0 |= Self::bit(i, j);
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.0 & Self::bit(i, j) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Highest `uu` and `vv` powers present, (0, 0) when empty
    ///
    /// # Examples
    /// ```
    /// use datum_shift::transforms::CoefficientMask;
    /// let mut mask = CoefficientMask::default();
    /// mask.set(3, 1);
    /// mask.set(0, 7);
    /// assert_eq!(mask.max_powers(), (3, 7));
    /// ```
    pub fn max_powers(&self) -> (usize, usize) {
        let mut max = (0, 0);
        for i in 0..MAX_POWER {
            for j in 0..MAX_POWER {
                if self.contains(i, j) {
                    max.0 = max.0.max(i);
                    max.1 = max.1.max(j);
                }
            }
        }
        max
    }

    fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// One polynomial term: coefficients of `uu^u * vv^v`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionTerm {
    pub u: usize,
    pub v: usize,
    #[serde(default)]
    pub lng: f64,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub hgt: f64,
}

/// Definition of a regression transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionParameters {
    /// Added to latitude before scaling
    pub uu_offset: f64,
    /// Added to longitude before scaling
    pub vv_offset: f64,
    pub normalization_scale: f64,
    /// Domain bound on |uu| and |vv|
    pub validation_radius: f64,
    #[serde(default)]
    pub terms: Vec<RegressionTerm>,
    /// Reference point and its expected shift
    #[serde(default)]
    pub test_lat: f64,
    #[serde(default)]
    pub test_lng: f64,
    /// Arc-seconds
    #[serde(default)]
    pub delta_lat: f64,
    /// Arc-seconds
    #[serde(default)]
    pub delta_lng: f64,
    /// Metres
    #[serde(default)]
    pub delta_hgt: f64,
    #[serde(default)]
    pub inverse: InverseSettings,
    /// Source datum; its parameters select the out-of-domain fallback
    #[serde(default)]
    pub source_datum: Option<DatumDefinition>,
}

impl RegressionParameters {
    pub fn new(uu_offset: f64, vv_offset: f64, normalization_scale: f64, validation_radius: f64) -> Self {
        Self {
            uu_offset,
            vv_offset,
            normalization_scale,
            validation_radius,
            terms: Vec::new(),
            test_lat: 0.0,
            test_lng: 0.0,
            delta_lat: 0.0,
            delta_lng: 0.0,
            delta_hgt: 0.0,
            inverse: InverseSettings::default(),
            source_datum: None,
        }
    }

    pub fn with_term(mut self, u: usize, v: usize, lng: f64, lat: f64, hgt: f64) -> Self {
        self.terms.push(RegressionTerm { u, v, lng, lat, hgt });
        self
    }

    pub fn with_source_datum(mut self, datum: DatumDefinition) -> Self {
        self.source_datum = Some(datum);
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

/// Evaluator for a [`RegressionParameters`] definition
#[derive(Debug, Clone)]
pub struct RegressionTransform {
    uu_offset: f64,
    vv_offset: f64,
    normalization_scale: f64,
    validation_radius: f64,
    lng_coefficients: [f64; TERM_COUNT],
    lat_coefficients: [f64; TERM_COUNT],
    hgt_coefficients: [f64; TERM_COUNT],
    lng_mask: CoefficientMask,
    lat_mask: CoefficientMask,
    hgt_mask: CoefficientMask,
    max_power_u: usize,
    max_power_v: usize,
    test_point: GeoPoint,
    expected_delta: GeoPoint,
    inverse: InverseSettings,
    fallback: FallbackMethod,
}

impl RegressionTransform {
    pub fn new(params: &RegressionParameters) -> Result<Self, TransformError> {
        let finite = [
            params.uu_offset,
            params.vv_offset,
            params.normalization_scale,
            params.validation_radius,
        ];
        if finite.iter().any(|v| !v.is_finite()) || params.validation_radius <= 0.0 {
            return Err(TransformError::InvalidParameters(
                "offsets, scale and a positive validation radius must be finite".to_string(),
            ));
        }

        let mut lng = [0.0; TERM_COUNT];
        let mut lat = [0.0; TERM_COUNT];
        let mut hgt = [0.0; TERM_COUNT];
        for term in &params.terms {
            if term.u >= MAX_POWER || term.v >= MAX_POWER {
                return Err(TransformError::InvalidParameters(format!(
                    "term uu^{} vv^{} exceeds degree {}",
                    term.u,
                    term.v,
                    MAX_POWER - 1
                )));
            }
            let idx = term.u * MAX_POWER + term.v;
            lng[idx] += term.lng;
            lat[idx] += term.lat;
            hgt[idx] += term.hgt;
        }

        let lng_mask = CoefficientMask::from_coefficients(&lng);
        let lat_mask = CoefficientMask::from_coefficients(&lat);
        let hgt_mask = CoefficientMask::from_coefficients(&hgt);
        let (max_power_u, max_power_v) = lng_mask.union(lat_mask).union(hgt_mask).max_powers();
        let fallback = params
            .source_datum
            .as_ref()
            .map(|datum| FallbackMethod::select(datum, Ellipsoid::WGS84))
            .unwrap_or_default();

        Ok(Self {
            uu_offset: params.uu_offset,
            vv_offset: params.vv_offset,
            normalization_scale: params.normalization_scale,
            validation_radius: params.validation_radius,
            lng_coefficients: lng,
            lat_coefficients: lat,
            hgt_coefficients: hgt,
            lng_mask,
            lat_mask,
            hgt_mask,
            max_power_u,
            max_power_v,
            test_point: GeoPoint::new(params.test_lng, params.test_lat, 0.0),
            expected_delta: GeoPoint::new(params.delta_lng, params.delta_lat, params.delta_hgt),
            inverse: params.inverse,
            fallback,
        })
    }

    pub fn max_powers(&self) -> (usize, usize) {
        (self.max_power_u, self.max_power_v)
    }

    pub fn fallback(&self) -> &FallbackMethod {
        &self.fallback
    }

    pub fn inverse_settings(&self) -> &InverseSettings {
        &self.inverse
    }

    /// Normalized (uu, vv) of a point
    pub fn normalize(&self, p: &GeoPoint) -> (f64, f64) {
        (
            (p.lat + self.uu_offset) * self.normalization_scale,
            (p.lng + self.vv_offset) * self.normalization_scale,
        )
    }

    /// Polynomial shift, or `OutOfDomain` outside the validation radius
    pub fn evaluate(&self, p: &GeoPoint) -> Result<GeoPoint, TransformError> {
        let (uu, vv) = self.normalize(p);
        let radius = self.validation_radius;
        if !(uu.abs() <= radius && vv.abs() <= radius) {
            return Err(TransformError::OutOfDomain { uu: uu.abs(), vv: vv.abs(), radius });
        }

        let mut lng_sum = 0.0;
        let mut lat_sum = 0.0;
        let mut hgt_sum = 0.0;
        let mut uu_pwr = 1.0;
        for i in 0..=self.max_power_u {
            if i > 0 {
                uu_pwr *= uu;
            }
            let mut vv_pwr = 1.0;
            for j in 0..=self.max_power_v {
                if j > 0 {
                    vv_pwr *= vv;
                }
                let idx = i * MAX_POWER + j;
                let term = uu_pwr * vv_pwr;
                if self.lng_mask.contains(i, j) {
                    lng_sum += self.lng_coefficients[idx] * term;
                }
                if self.lat_mask.contains(i, j) {
                    lat_sum += self.lat_coefficients[idx] * term;
                }
                if self.hgt_mask.contains(i, j) {
                    hgt_sum += self.hgt_coefficients[idx] * term;
                }
            }
        }

        Ok(GeoPoint::new(
            p.lng + lng_sum * SEC_TO_DEG,
            p.lat + lat_sum * SEC_TO_DEG,
            p.hgt + hgt_sum,
        ))
    }

    /// Forward shift; the fallback handles out-of-domain points
    ///
    /// A fallback shift is reported as `Degraded` (1); only the inverse
    /// reports `FallbackUsed` (2).
    pub fn forward(&self, p: &GeoPoint) -> ShiftResult {
        match self.evaluate(p) {
            Ok(shifted) => ShiftResult::success(shifted),
            Err(e) => {
                warn!("regression at ({}, {}): {}", p.lng, p.lat, e);
                match self.fallback.apply(p) {
                    Ok(shifted) => ShiftResult::new(shifted, ShiftStatus::Degraded),
                    Err(e) => {
                        error!("regression fallback at ({}, {}): {}", p.lng, p.lat, e);
                        ShiftResult::fatal(*p)
                    }
                }
            }
        }
    }

    /// Forward shift of longitude and latitude; the height is kept
    pub fn forward_2d(&self, p: &GeoPoint) -> ShiftResult {
        let result = self.forward(&p.with_height(0.0));
        if result.status.is_fatal() {
            return ShiftResult::fatal(*p);
        }
        ShiftResult::new(result.point.with_height(p.hgt), result.status)
    }

    /// Source point whose forward shift is `p`
    ///
    /// Iterates through the fallback too, reporting `FallbackUsed` when
    /// any step needed it.
    pub fn inverse(&self, p: &GeoPoint) -> ShiftResult {
        solve_inverse(*p, &self.inverse, |guess| {
            let step = self.forward(&guess);
            match step.status {
                ShiftStatus::Degraded => ShiftResult::fallback(step.point),
                _ => step,
            }
        })
    }

    /// True when the shift at the reference point matches its expected deltas
    ///
    /// Latitude and longitude are compared in arc-seconds, height in metres.
    pub fn verify_test_point(&self, tolerance: f64) -> bool {
        let Ok(shifted) = self.evaluate(&self.test_point) else {
            return false;
        };
        let d_lng = (shifted.lng - self.test_point.lng) / SEC_TO_DEG;
        let d_lat = (shifted.lat - self.test_point.lat) / SEC_TO_DEG;
        (d_lng - self.expected_delta.lng).abs() <= tolerance
            && (d_lat - self.expected_delta.lat).abs() <= tolerance
            && (shifted.hgt - self.expected_delta.hgt).abs() <= tolerance
    }
}
