//! Element decoding and biquadratic interpolation
//!
//! Stencil layout used throughout (indices into a `[f64; 9]`):
//!
//! ```text
//!          North
//!   W    6  7  8    E
//!   e    3  4  5    a
//!   s    0  1  2    s
//!   t               t
//!          South
//! ```

/// Decode one signed integer element from a byte buffer
///
/// The bytes are taken in host order and reversed when `swap` is set.
/// Returns `None` when the element does not fit in the buffer or `size`
/// is not 2 or 4.
///
/// # Examples
/// ```
/// use datum_shift::core::interpolate::read_element;
/// let bytes = 300i16.to_ne_bytes();
/// assert_eq!(read_element(&bytes, 0, 2, false), Some(300));
/// let swapped = 300i16.swap_bytes().to_ne_bytes();
/// assert_eq!(read_element(&swapped, 0, 2, true), Some(300));
/// ```
#[inline]
pub fn read_element(bytes: &[u8], offset: usize, size: usize, swap: bool) -> Option<i64> {
    let raw = bytes.get(offset..offset.checked_add(size)?)?;
    match size {
        2 => {
            let value = i16::from_ne_bytes([raw[0], raw[1]]);
            let value = if swap { value.swap_bytes() } else { value };
            Some(value as i64)
        }
        4 => {
            let value = i32::from_ne_bytes([raw[0], raw[1], raw[2], raw[3]]);
            let value = if swap { value.swap_bytes() } else { value };
            Some(value as i64)
        }
        _ => None,
    }
}

/// Quadratic blend of three equally spaced samples
///
/// `delta` is the fractional offset from `f0` in sample units, normally in
/// `[0, 2]`.
///
/// # Examples
/// ```
/// use datum_shift::core::interpolate::quadratic_blend;
/// assert_eq!(quadratic_blend(1.0, 2.0, 4.0, 8.0), 4.0);
/// assert_eq!(quadratic_blend(0.0, 2.0, 4.0, 8.0), 2.0);
/// assert_eq!(quadratic_blend(2.0, 2.0, 4.0, 8.0), 8.0);
/// ```
#[inline]
pub fn quadratic_blend(delta: f64, f0: f64, f1: f64, f2: f64) -> f64 {
    let df0 = f1 - f0;
    let df1 = f2 - f1;
    let d2f0 = df1 - df0;
    f0 + delta * df0 + 0.5 * delta * (delta - 1.0) * d2f0
}

/// Separable biquadratic interpolation over a 3x3 stencil
///
/// Each row is blended west to east with `delta.0`, then the three row
/// results are blended south to north with `delta.1`.
pub fn biquadratic(delta: (f64, f64), stencil: &[f64; 9]) -> f64 {
    let south = quadratic_blend(delta.0, stencil[0], stencil[1], stencil[2]);
    let middle = quadratic_blend(delta.0, stencil[3], stencil[4], stencil[5]);
    let north = quadratic_blend(delta.0, stencil[6], stencil[7], stencil[8]);
    quadratic_blend(delta.1, south, middle, north)
}
