//! Strongly-typed numeric primitives for spiralgen (zero-cost newtypes).
//!
//! - Persisted values round-trip through document text as [`Scalar`]
//! - Opacity is clamped at construction
//! - Colours compare exactly, because the fingerprint relies on it

use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Error type for invalid numeric values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericError {
    /// Value is NaN
    NaN,
    /// Value is infinite
    Infinite,
    /// Value is negative when positive required
    Negative,
}

impl fmt::Display for NumericError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericError::NaN => write!(f, "value is NaN"),
            NumericError::Infinite => write!(f, "value is infinite"),
            NumericError::Negative => write!(f, "value is negative"),
        }
    }
}

impl std::error::Error for NumericError {}

/// 2D position in document units
pub type Point = glam::DVec2;

// ============================================================================
// Scalar
// ============================================================================

/// A persisted scalar: whatever number the document text spells out.
///
/// NaN is a legal value here. Unparseable text yields NaN and callers decide
/// what that means.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct Scalar(pub f64);

impl Scalar {
    pub const ZERO: Scalar = Scalar(0.0);
    pub const NAN: Scalar = Scalar(f64::NAN);

    /// Get the raw value
    #[inline]
    pub fn raw(self) -> f64 {
        self.0
    }

    /// Check if finite
    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Round half away from zero. Counts are positive, where this agrees
    /// with round-half-up.
    #[inline]
    pub fn round(self) -> Scalar {
        Scalar(self.0.round())
    }

    /// Number of shapes this value asks for. Non-finite and non-positive
    /// values ask for none; fractions are truncated.
    pub fn as_count(self) -> usize {
        if self.0.is_finite() && self.0 > 0.0 {
            self.0 as usize
        } else {
            0
        }
    }

    /// Validate for use as a real quantity (rejects NaN/infinite)
    pub fn try_finite(self) -> Result<f64, NumericError> {
        if self.0.is_nan() {
            Err(NumericError::NaN)
        } else if self.0.is_infinite() {
            Err(NumericError::Infinite)
        } else {
            Ok(self.0)
        }
    }

    /// Parse the longest numeric prefix of `text`.
    ///
    /// Leading whitespace is skipped; an optional sign, digits, fraction and
    /// exponent are accepted, as is `Infinity`. Trailing garbage is ignored.
    /// Text with no numeric prefix parses to NaN.
    pub fn parse_lenient(text: &str) -> Scalar {
        let s = text.trim_start();
        let bytes = s.as_bytes();
        let mut end = 0;

        if matches!(bytes.first(), Some(b'+' | b'-')) {
            end += 1;
        }
        if s[end..].starts_with("Infinity") {
            return if s.starts_with('-') {
                Scalar(f64::NEG_INFINITY)
            } else {
                Scalar(f64::INFINITY)
            };
        }

        let int_start = end;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let mut digits = end - int_start;

        if end < bytes.len() && bytes[end] == b'.' {
            let frac_start = end + 1;
            let mut frac_end = frac_start;
            while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
                frac_end += 1;
            }
            digits += frac_end - frac_start;
            if digits > 0 {
                end = frac_end;
            }
        }
        if digits == 0 {
            return Scalar::NAN;
        }

        // Exponent only counts when at least one digit follows it
        if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
            let mut exp_end = end + 1;
            if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
                exp_end += 1;
            }
            let exp_digits_start = exp_end;
            while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
                exp_end += 1;
            }
            if exp_end > exp_digits_start {
                end = exp_end;
            }
        }

        s[..end].parse::<f64>().map(Scalar).unwrap_or(Scalar::NAN)
    }

    /// Canonical text form, the inverse of [`Scalar::parse_lenient`].
    pub fn to_canonical(self) -> String {
        let v = self.0;
        if v.is_nan() {
            "NaN".to_string()
        } else if v.is_infinite() {
            if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
        } else if v == 0.0 {
            // covers -0.0
            "0".to_string()
        } else {
            format!("{}", v)
        }
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar(v)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Scalar(f64::from(v))
    }
}

impl Add for Scalar {
    type Output = Scalar;
    fn add(self, rhs: Scalar) -> Scalar { Scalar(self.0 + rhs.0) }
}
impl Sub for Scalar {
    type Output = Scalar;
    fn sub(self, rhs: Scalar) -> Scalar { Scalar(self.0 - rhs.0) }
}
impl Mul<f64> for Scalar {
    type Output = Scalar;
    fn mul(self, rhs: f64) -> Scalar { Scalar(self.0 * rhs) }
}
impl Div for Scalar {
    type Output = Scalar;
    fn div(self, rhs: Scalar) -> Scalar { Scalar(self.0 / rhs.0) }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical())
    }
}

// ============================================================================
// Opacity
// ============================================================================

/// Layer opacity in `[0, 1]`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Opacity(f64);

impl Opacity {
    pub const OPAQUE: Opacity = Opacity(1.0);
    pub const TRANSPARENT: Opacity = Opacity(0.0);

    /// Clamp into range; NaN becomes fully transparent.
    pub fn new(v: f64) -> Opacity {
        if v.is_nan() {
            Opacity::TRANSPARENT
        } else {
            Opacity(v.clamp(0.0, 1.0))
        }
    }

    #[inline]
    pub fn raw(self) -> f64 {
        self.0
    }

    /// Multiply by a decay factor
    #[inline]
    pub fn scaled(self, factor: f64) -> Opacity {
        Opacity::new(self.0 * factor)
    }
}

impl Default for Opacity {
    fn default() -> Self {
        Opacity::OPAQUE
    }
}

impl From<f64> for Opacity {
    fn from(v: f64) -> Self {
        Opacity::new(v)
    }
}

impl From<Opacity> for f64 {
    fn from(o: Opacity) -> f64 {
        o.0
    }
}

// ============================================================================
// Colour
// ============================================================================

/// RGB colour with channels in `[0, 1]`, the host's paint representation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const fn new(r: f64, g: f64, b: f64) -> Rgb {
        Rgb { r, g, b }
    }

    /// Exact channel equality. No tolerance: a fingerprint either matches or
    /// it does not.
    pub fn same_as(&self, other: &Rgb) -> bool {
        self.r == other.r && self.g == other.g && self.b == other.b
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({},{},{})", self.r, self.g, self.b)
    }
}

// ============================================================================
// Dimensions
// ============================================================================

/// Requested width and height of an image placement. May hold NaN until
/// checked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Dimensions { width, height }
    }
}
