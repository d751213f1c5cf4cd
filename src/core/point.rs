//! Geographic points and shift outcomes
//!
//! Every compute entry point in the crate returns a [`ShiftResult`]: the best
//! available output coordinates plus a [`ShiftStatus`]. Failure never yields
//! garbage coordinates; the input point is handed back unchanged.

/// Arc-seconds to degrees
pub const SEC_TO_DEG: f64 = 1.0 / 3600.0;

/// A geographic point: longitude and latitude in degrees, height in metres
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
    pub hgt: f64,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64, hgt: f64) -> Self {
        Self { lng, lat, hgt }
    }

    /// A point with zero height
    ///
    /// # Examples
    /// ```
    /// use datum_shift::GeoPoint;
    /// let p = GeoPoint::from_lng_lat(-75.5, 45.25);
    /// assert_eq!(p.hgt, 0.0);
    /// ```
    pub fn from_lng_lat(lng: f64, lat: f64) -> Self {
        Self { lng, lat, hgt: 0.0 }
    }

    /// Same horizontal position with a different height
    pub fn with_height(&self, hgt: f64) -> Self {
        Self { hgt, ..*self }
    }

    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite() && self.hgt.is_finite()
    }
}

impl From<[f64; 3]> for GeoPoint {
    fn from(ll: [f64; 3]) -> Self {
        Self::new(ll[0], ll[1], ll[2])
    }
}

impl From<GeoPoint> for [f64; 3] {
    fn from(p: GeoPoint) -> Self {
        [p.lng, p.lat, p.hgt]
    }
}

/// Outcome of a forward or inverse shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftStatus {
    /// Computed from a real dataset
    Success,
    /// No coverage, a regression fallback shift, or inverse iteration
    /// settled within the loose tolerance
    Degraded,
    /// No dataset covered the point; the fallback transform was applied
    FallbackUsed,
    /// I/O, internal, or unrecoverable domain failure
    Fatal,
}

impl ShiftStatus {
    /// Integer status code
    ///
    /// # Examples
    /// ```
    /// use datum_shift::ShiftStatus;
    /// assert_eq!(ShiftStatus::Success.code(), 0);
    /// assert_eq!(ShiftStatus::Degraded.code(), 1);
    /// assert_eq!(ShiftStatus::FallbackUsed.code(), 2);
    /// assert_eq!(ShiftStatus::Fatal.code(), -1);
    /// ```
    pub fn code(&self) -> i32 {
        match self {
            ShiftStatus::Success => 0,
            ShiftStatus::Degraded => 1,
            ShiftStatus::FallbackUsed => 2,
            ShiftStatus::Fatal => -1,
        }
    }

    /// Parse an integer status code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ShiftStatus::Success),
            1 => Some(ShiftStatus::Degraded),
            2 => Some(ShiftStatus::FallbackUsed),
            -1 => Some(ShiftStatus::Fatal),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ShiftStatus::Success)
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ShiftStatus::Fatal)
    }
}

impl std::fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShiftStatus::Success => "success",
            ShiftStatus::Degraded => "degraded",
            ShiftStatus::FallbackUsed => "fallback",
            ShiftStatus::Fatal => "fatal",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Output coordinates with their status
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShiftResult {
    pub point: GeoPoint,
    pub status: ShiftStatus,
}

impl ShiftResult {
    pub fn new(point: GeoPoint, status: ShiftStatus) -> Self {
        Self { point, status }
    }

    pub fn success(point: GeoPoint) -> Self {
        Self::new(point, ShiftStatus::Success)
    }

    /// Input handed back unchanged with a degraded status
    pub fn degraded(input: GeoPoint) -> Self {
        Self::new(input, ShiftStatus::Degraded)
    }

    pub fn fallback(point: GeoPoint) -> Self {
        Self::new(point, ShiftStatus::FallbackUsed)
    }

    /// Input handed back unchanged with a fatal status
    pub fn fatal(input: GeoPoint) -> Self {
        Self::new(input, ShiftStatus::Fatal)
    }

    pub fn code(&self) -> i32 {
        self.status.code()
    }
}
