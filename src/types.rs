use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{GpxError, Result};

/// An `xsd:decimal`.
///
/// Holds the digits and scale it was read with, so the text written back is
/// the text that was read, at any precision up to 38 digits.
/// Arithmetic goes through the nearest `f64`, which is computed once.
#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    digits: i128,
    scale: u32,
    value: f64,
}

impl Decimal {
    /// Nearest binary float.
    pub fn value(self) -> f64 {
        self.value
    }

    /// Number of digits after the decimal point.
    pub fn scale(self) -> u32 {
        self.scale
    }

    /// Digits and scale without trailing fractional zeros.
    fn normalized(self) -> (i128, u32) {
        let (mut digits, mut scale) = (self.digits, self.scale);
        while scale > 0 && digits % 10 == 0 {
            digits /= 10;
            scale -= 1;
        }
        (digits, scale)
    }
}

fn invalid_decimal(text: &str, expected: &'static str) -> GpxError {
    GpxError::OutOfRange {
        kind: "decimal",
        expected,
        value: text.to_string(),
    }
}

impl FromStr for Decimal {
    type Err = GpxError;

    /// Optional sign, digits, optional fraction. Exponents, `NaN` and
    /// infinities are not part of the lexical space.
    fn from_str(s: &str) -> Result<Self> {
        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };
        let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all = || int_part.bytes().chain(frac_part.bytes());
        if all().next().is_none() || !all().all(|b| b.is_ascii_digit()) {
            return Err(invalid_decimal(s, "a decimal number"));
        }

        let mut digits: i128 = 0;
        for b in all() {
            digits = digits
                .checked_mul(10)
                .and_then(|d| d.checked_add(i128::from(b - b'0')))
                .ok_or_else(|| invalid_decimal(s, "at most 38 digits"))?;
        }
        let scale =
            u32::try_from(frac_part.len()).map_err(|_| invalid_decimal(s, "a decimal number"))?;
        let value = s
            .parse::<f64>()
            .map_err(|_| invalid_decimal(s, "a decimal number"))?;

        Ok(Self {
            digits: if negative { -digits } else { digits },
            scale,
            value,
        })
    }
}

impl TryFrom<f64> for Decimal {
    type Error = GpxError;

    /// Takes the shortest text that reads back as `value`.
    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(invalid_decimal(&value.to_string(), "a finite number"));
        }
        value.to_string().parse()
    }
}

impl From<i64> for Decimal {
    fn from(n: i64) -> Self {
        Self {
            digits: i128::from(n),
            scale: 0,
            value: n as f64,
        }
    }
}

impl From<Decimal> for f64 {
    fn from(d: Decimal) -> f64 {
        d.value
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let ((a, sa), (b, sb)) = (self.normalized(), other.normalized());
        let aligned = if sa >= sb {
            10i128.checked_pow(sa - sb).and_then(|p| b.checked_mul(p)).map(|b| (a, b))
        } else {
            10i128.checked_pow(sb - sa).and_then(|p| a.checked_mul(p)).map(|a| (a, b))
        };
        match aligned {
            Some((a, b)) => a.cmp(&b),
            None => self.value.total_cmp(&other.value),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.digits < 0 {
            f.write_str("-")?;
        }
        let magnitude = self.digits.unsigned_abs().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&magnitude);
        }
        let padded = format!("{magnitude:0>width$}", width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{int_part}.{frac_part}")
    }
}

macro_rules! bounded_decimal {
    ($(#[$meta:meta])* $name:ident, $kind:literal, $range:expr, $expected:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        pub struct $name(Decimal);

        impl $name {
            pub fn new(value: f64) -> Result<Self> {
                Self::from_decimal(Decimal::try_from(value)?)
            }

            pub fn from_decimal(value: Decimal) -> Result<Self> {
                if ($range).contains(&value) {
                    Ok(Self(value))
                } else {
                    Err(GpxError::OutOfRange {
                        kind: $kind,
                        expected: $expected,
                        value: value.to_string(),
                    })
                }
            }

            pub fn value(self) -> f64 {
                self.0.value()
            }

            pub fn decimal(self) -> Decimal {
                self.0
            }
        }

        impl TryFrom<f64> for $name {
            type Error = GpxError;

            fn try_from(value: f64) -> Result<Self> {
                Self::new(value)
            }
        }

        impl From<$name> for f64 {
            fn from(v: $name) -> f64 {
                v.0.value()
            }
        }

        impl FromStr for $name {
            type Err = GpxError;

            fn from_str(s: &str) -> Result<Self> {
                let value = s.trim().parse::<Decimal>().map_err(|_| GpxError::OutOfRange {
                    kind: $kind,
                    expected: "a decimal number",
                    value: s.to_string(),
                })?;
                Self::from_decimal(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

bounded_decimal!(
    /// Latitude in decimal degrees, WGS84.
    Latitude,
    "latitude",
    Decimal::from(-90_i64)..=Decimal::from(90_i64),
    "within [-90, 90]"
);

bounded_decimal!(
    /// Longitude in decimal degrees, WGS84.
    Longitude,
    "longitude",
    Decimal::from(-180_i64)..=Decimal::from(180_i64),
    "within [-180, 180]"
);

bounded_decimal!(
    /// An angle in degrees, used for magnetic variation.
    Degrees,
    "degrees",
    Decimal::from(0_i64)..Decimal::from(360_i64),
    "within [0, 360)"
);

/// Differential GPS station id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DgpsStation(u16);

impl DgpsStation {
    pub const MAX: u16 = 1023;

    pub fn new(id: u16) -> Result<Self> {
        if id <= Self::MAX {
            Ok(Self(id))
        } else {
            Err(GpxError::OutOfRange {
                kind: "DGPS station id",
                expected: "within [0, 1023]",
                value: id.to_string(),
            })
        }
    }

    pub fn value(self) -> u16 {
        self.0
    }
}

impl TryFrom<i64> for DgpsStation {
    type Error = GpxError;

    fn try_from(id: i64) -> Result<Self> {
        let id = u16::try_from(id).map_err(|_| GpxError::OutOfRange {
            kind: "DGPS station id",
            expected: "within [0, 1023]",
            value: id.to_string(),
        })?;
        Self::new(id)
    }
}

impl FromStr for DgpsStation {
    type Err = GpxError;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim().parse::<i64>().map_err(|_| GpxError::OutOfRange {
            kind: "DGPS station id",
            expected: "an integer",
            value: s.to_string(),
        })?;
        Self::try_from(id)
    }
}

impl fmt::Display for DgpsStation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type of GPS fix. `None` means the receiver had no fix, which is different
/// from the fix being unknown (an absent field).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fix {
    None,
    TwoD,
    ThreeD,
    Dgps,
    Pps,
}

impl Fix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::TwoD => "2d",
            Self::ThreeD => "3d",
            Self::Dgps => "dgps",
            Self::Pps => "pps",
        }
    }
}

impl FromStr for Fix {
    type Err = GpxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "none" => Ok(Self::None),
            "2d" => Ok(Self::TwoD),
            "3d" => Ok(Self::ThreeD),
            "dgps" => Ok(Self::Dgps),
            "pps" => Ok(Self::Pps),
            other => Err(GpxError::OutOfRange {
                kind: "fix",
                expected: "one of none, 2d, 3d, dgps, pps",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Fix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latitude_range() {
        assert!(Latitude::new(90.0).is_ok());
        assert!(Latitude::new(-90.0).is_ok());
        assert!(Latitude::new(90.0001).is_err());
        assert!(Latitude::new(f64::NAN).is_err());
        assert_eq!("35.6762".parse::<Latitude>().unwrap().value(), 35.6762);
        assert!("north".parse::<Latitude>().is_err());
    }

    #[test]
    fn test_longitude_range() {
        assert!(Longitude::new(180.0).is_ok());
        assert!(Longitude::new(-180.5).is_err());
    }

    #[test]
    fn test_degrees_half_open() {
        assert!(Degrees::new(0.0).is_ok());
        assert!(Degrees::new(359.9).is_ok());
        assert!(Degrees::new(360.0).is_err());
    }

    #[test]
    fn test_dgps_station() {
        assert_eq!("1023".parse::<DgpsStation>().unwrap().value(), 1023);
        assert!("1024".parse::<DgpsStation>().is_err());
        assert!("-1".parse::<DgpsStation>().is_err());
    }

    #[test]
    fn test_fix_tokens() {
        for token in ["none", "2d", "3d", "dgps", "pps"] {
            assert_eq!(token.parse::<Fix>().unwrap().to_string(), token);
        }
        assert!("4d".parse::<Fix>().is_err());
    }

    #[test]
    fn test_decimal_keeps_source_digits() {
        for text in ["35.123456789012345678", "10.50", "-0.05", "7", "0.000000000000000000001"] {
            assert_eq!(text.parse::<Decimal>().unwrap().to_string(), text);
        }
        let lat: Latitude = "35.123456789012345678".parse().unwrap();
        assert_eq!(lat.to_string(), "35.123456789012345678");
        assert_eq!(".5".parse::<Decimal>().unwrap().to_string(), "0.5");
        assert_eq!("10.50".parse::<Decimal>().unwrap().scale(), 2);
    }

    #[test]
    fn test_decimal_lexical_space() {
        for text in ["", "-", ".", "1e3", "NaN", "inf", "1.2.3", " 1", "0x10"] {
            assert!(text.parse::<Decimal>().is_err(), "{text}");
        }
        assert!("1234567890123456789012345678901234567890".parse::<Decimal>().is_err());
        assert!(Decimal::try_from(f64::NAN).is_err());
        assert!(Decimal::try_from(f64::INFINITY).is_err());
    }

    #[test]
    fn test_decimal_compares_by_value() {
        let d = |s: &str| s.parse::<Decimal>().unwrap();
        assert_eq!(d("1.5"), d("1.50"));
        assert_ne!(d("35.123456789012345678"), d("35.123456789012344"));
        assert!(d("35.123456789012345678") > d("35.123456789012345677"));
        assert!(d("-2") < d("-1.99"));
        assert_eq!(Decimal::try_from(40.0).unwrap(), Decimal::from(40_i64));
        assert_eq!(d("2.25").value(), 2.25);
    }

    #[test]
    fn test_range_check_is_exact() {
        assert!("90.000000000000000000001".parse::<Latitude>().is_err());
        assert!("-180".parse::<Longitude>().is_ok());
        assert!("359.99999999999999999999".parse::<Degrees>().is_ok());
    }

    #[test]
    fn test_display_is_shortest_decimal() {
        assert_eq!(Latitude::new(35.0).unwrap().to_string(), "35");
        assert_eq!(Longitude::new(139.6503).unwrap().to_string(), "139.6503");
    }
}
