//! Exact decimal values for `DECIMAL`/`NUMERIC` columns.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A decimal number `(-1)^negative × coefficient × 10^exponent`.
///
/// Equality is numeric: `1.12` equals `1.120`.
#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    /// Sign; ignored when the coefficient is zero.
    pub negative: bool,
    /// Unscaled magnitude.
    pub coefficient: u128,
    /// Power of ten applied to the coefficient.
    pub exponent: i32,
}

/// Longest run of padding zeros `Display` writes before switching to
/// exponent notation.
const MAX_PLAIN_PADDING: i64 = 64;

/// Error returned when text is not a decimal literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid decimal literal")]
pub struct ParseDecimalError;

impl Decimal {
    /// Zero.
    pub const ZERO: Self = Self::new(false, 0, 0);

    /// Creates a decimal from its parts.
    #[must_use]
    pub const fn new(negative: bool, coefficient: u128, exponent: i32) -> Self {
        Self {
            negative,
            coefficient,
            exponent,
        }
    }

    /// Converts a finite float through its shortest round-trip text, so
    /// `1.123_f64` becomes exactly `1123e-3`.
    #[must_use]
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        format!("{value}").parse().ok()
    }

    /// The nearest `f64`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(self) -> f64 {
        let magnitude = self.coefficient as f64;
        let scaled = match self.exponent {
            // Powers of ten up to 1e22 are exact, so one division rounds once.
            -22..=-1 => magnitude / 10f64.powi(-self.exponent),
            exponent => magnitude * 10f64.powi(exponent),
        };
        if self.negative {
            -scaled
        } else {
            scaled
        }
    }

    /// Truncates toward zero to at most `scale` fractional digits.
    #[must_use]
    pub fn truncate(self, scale: u32) -> Self {
        let Ok(scale) = i32::try_from(scale) else {
            return self;
        };
        if self.exponent >= -scale {
            return self;
        }
        // Widened: `-scale - exponent` leaves i32 for exponents near i32::MIN.
        let dropped = u32::try_from(-i64::from(scale) - i64::from(self.exponent))
            .unwrap_or(u32::MAX);
        let coefficient = 10u128
            .checked_pow(dropped)
            .map_or(0, |divisor| self.coefficient / divisor);
        Self::new(self.negative && coefficient != 0, coefficient, -scale)
    }

    /// Strips trailing zeros from the coefficient; zero becomes `0e0`.
    #[must_use]
    pub const fn normalize(self) -> Self {
        if self.coefficient == 0 {
            return Self::ZERO;
        }
        let mut coefficient = self.coefficient;
        let mut exponent = self.exponent;
        while coefficient % 10 == 0 {
            // At i32::MAX the remaining zeros stay in the coefficient.
            let Some(next) = exponent.checked_add(1) else {
                break;
            };
            coefficient /= 10;
            exponent = next;
        }
        Self::new(self.negative, coefficient, exponent)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.normalize(), other.normalize());
        a.negative == b.negative && a.coefficient == b.coefficient && a.exponent == b.exponent
    }
}

impl Eq for Decimal {}

impl Hash for Decimal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let n = self.normalize();
        (n.negative, n.coefficient, n.exponent).hash(state);
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(value < 0, u128::from(value.unsigned_abs()), 0)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Accepts `[+-]digits[.digits][(e|E)[+-]digits]`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = text.trim();
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (mantissa, exp_part) = match unsigned.find(['e', 'E']) {
            Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
            None => (unsigned, None),
        };
        let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(ParseDecimalError);
        }

        let mut coefficient: u128 = 0;
        for byte in whole.bytes().chain(fraction.bytes()) {
            if !byte.is_ascii_digit() {
                return Err(ParseDecimalError);
            }
            coefficient = coefficient
                .checked_mul(10)
                .and_then(|c| c.checked_add(u128::from(byte - b'0')))
                .ok_or(ParseDecimalError)?;
        }

        let explicit: i32 = match exp_part {
            Some(exp) => exp.parse().map_err(|_| ParseDecimalError)?,
            None => 0,
        };
        let fraction_len = i32::try_from(fraction.len()).map_err(|_| ParseDecimalError)?;
        let exponent = explicit
            .checked_sub(fraction_len)
            .ok_or(ParseDecimalError)?;

        Ok(Self::new(negative && coefficient != 0, coefficient, exponent))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.coefficient.to_string();
        let sign = if self.negative && self.coefficient != 0 {
            "-"
        } else {
            ""
        };
        // Plain notation would pad with more zeros than this; use `e` form.
        let padding = i64::from(self.exponent).abs() - i64::try_from(digits.len()).unwrap_or(0);
        if padding > MAX_PLAIN_PADDING {
            return write!(f, "{sign}{digits}e{}", self.exponent);
        }
        if self.exponent >= 0 {
            let zeros = "0".repeat(self.exponent.unsigned_abs() as usize);
            return write!(f, "{sign}{digits}{zeros}");
        }
        let scale = self.exponent.unsigned_abs() as usize;
        if digits.len() > scale {
            let (whole, fraction) = digits.split_at(digits.len() - scale);
            write!(f, "{sign}{whole}.{fraction}")
        } else {
            let zeros = "0".repeat(scale - digits.len());
            write!(f, "{sign}0.{zeros}{digits}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals() {
        assert_eq!("1.123".parse(), Ok(Decimal::new(false, 1123, -3)));
        assert_eq!("-0.5".parse(), Ok(Decimal::new(true, 5, -1)));
        assert_eq!("42".parse(), Ok(Decimal::new(false, 42, 0)));
        assert_eq!("1.5e3".parse(), Ok(Decimal::new(false, 15, 2)));
        assert_eq!(".25".parse(), Ok(Decimal::new(false, 25, -2)));
        assert_eq!("abc".parse::<Decimal>(), Err(ParseDecimalError));
        assert_eq!("".parse::<Decimal>(), Err(ParseDecimalError));
        assert_eq!("1.2.3".parse::<Decimal>(), Err(ParseDecimalError));
    }

    #[test]
    fn equality_ignores_trailing_zeros() {
        assert_eq!(Decimal::new(false, 112, -2), Decimal::new(false, 1120, -3));
        assert_eq!(Decimal::new(true, 0, 5), Decimal::ZERO);
        assert_ne!(Decimal::new(true, 1, 0), Decimal::new(false, 1, 0));
    }

    #[test]
    fn truncates_toward_zero() {
        let value = Decimal::new(false, 1123, -3);
        assert_eq!(value.truncate(2), Decimal::new(false, 112, -2));
        assert_eq!(value.truncate(5), value);
        assert_eq!(Decimal::new(true, 1999, -3).truncate(0), Decimal::new(true, 1, 0));
        assert_eq!(Decimal::new(true, 9, -3).truncate(1), Decimal::ZERO);
    }

    #[test]
    fn float_conversions() {
        assert_eq!(Decimal::from_f64(1.123), Some(Decimal::new(false, 1123, -3)));
        assert_eq!(Decimal::from_f64(f64::NAN), None);
        assert!((Decimal::new(false, 1123, -3).to_f64() - 1.123).abs() < f64::EPSILON);
        assert!((Decimal::new(true, 25, 1).to_f64() + 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn displays_plain_notation() {
        assert_eq!(Decimal::new(false, 1123, -3).to_string(), "1.123");
        assert_eq!(Decimal::new(true, 5, -3).to_string(), "-0.005");
        assert_eq!(Decimal::new(false, 15, 2).to_string(), "1500");
        assert_eq!(Decimal::from(-7).to_string(), "-7");
    }

    #[test]
    fn extreme_exponents_do_not_overflow() {
        let tiny = Decimal::new(false, 1, i32::MIN);
        assert_eq!(tiny.truncate(0), Decimal::ZERO);
        let parsed: Decimal = "1e-2147483648".parse().expect("parse");
        assert_eq!(parsed.truncate(0), Decimal::ZERO);
        assert_eq!(parsed.truncate(u32::MAX), parsed);

        let huge = Decimal::new(false, 10, i32::MAX);
        assert_eq!(huge, huge);
        assert_eq!(huge.normalize(), huge);
        let parsed: Decimal = "10e2147483647".parse().expect("parse");
        assert_eq!(parsed, huge);
    }

    #[test]
    fn extreme_exponents_display_in_exponent_form() {
        assert_eq!(Decimal::new(false, 1, i32::MAX).to_string(), "1e2147483647");
        assert_eq!(Decimal::new(true, 25, i32::MIN).to_string(), "-25e-2147483648");
        let round_trip: Decimal = "1e-2147483648".parse().expect("parse");
        assert_eq!(round_trip.to_string().parse::<Decimal>(), Ok(round_trip));
        assert_eq!(Decimal::new(false, 1, 64).to_string(), format!("1{}", "0".repeat(64)));
    }
}
