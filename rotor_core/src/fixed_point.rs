//! Fixed-point decimal arithmetic.
//!
//! A [`Fixed`] is `units * 10^-scale` stored in an `i64`. Every operation that
//! narrows the scale rounds HALF_UP (ties away from zero), so rotation, speed,
//! lap time and cycle time all round the same way. Intermediates use `i128`
//! and results saturate at the `i64` range instead of wrapping.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub use rotor_config::MAX_SCALE;

const NANOS_SCALE: u32 = 9;

#[inline]
fn pow10(exp: u32) -> i128 {
    10i128.pow(exp)
}

#[inline]
fn saturate_i64(v: i128) -> i64 {
    v.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Integer division rounding half away from zero. `d` must be nonzero.
#[inline]
pub fn div_round_half_up(n: i128, d: i128) -> i128 {
    let q = n / d;
    let r = n % d;
    if r.unsigned_abs().saturating_mul(2) >= d.unsigned_abs() {
        if (n < 0) == (d < 0) { q + 1 } else { q - 1 }
    } else {
        q
    }
}

/// Decimal value with an explicit number of fractional digits.
///
/// Equality and ordering compare numeric value, so `15.000 == 15`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fixed {
    units: i64,
    scale: u32,
}

impl Fixed {
    pub const ZERO: Fixed = Fixed { units: 0, scale: 0 };

    /// `units * 10^-scale`; scales above [`MAX_SCALE`] are clamped.
    #[inline]
    pub const fn new(units: i64, scale: u32) -> Self {
        let scale = if scale > MAX_SCALE { MAX_SCALE } else { scale };
        Self { units, scale }
    }

    #[inline]
    pub const fn from_int(value: i64) -> Self {
        Self::new(value, 0)
    }

    /// Zero rendered with `scale` fractional digits.
    #[inline]
    pub const fn zero(scale: u32) -> Self {
        Self::new(0, scale)
    }

    /// One unit in the last place at `scale`, e.g. `ulp(2) == 0.01`.
    #[inline]
    pub const fn ulp(scale: u32) -> Self {
        Self::new(1, scale)
    }

    #[inline]
    pub const fn units(self) -> i64 {
        self.units
    }

    #[inline]
    pub const fn scale(self) -> u32 {
        self.scale
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.units == 0
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self {
            units: self.units.saturating_abs(),
            scale: self.scale,
        }
    }

    /// Seconds of `d`, HALF_UP at `scale`.
    pub fn from_duration(d: Duration, scale: u32) -> Self {
        let nanos = i128::try_from(d.as_nanos()).unwrap_or(i128::MAX);
        Self::new(saturate_i64(nanos), NANOS_SCALE).rescale(scale)
    }

    /// Same value at another scale, HALF_UP when digits are dropped.
    pub fn rescale(self, scale: u32) -> Self {
        let scale = scale.min(MAX_SCALE);
        let units = i128::from(self.units);
        let units = if scale >= self.scale {
            units.saturating_mul(pow10(scale - self.scale))
        } else {
            div_round_half_up(units, pow10(self.scale - scale))
        };
        Self {
            units: saturate_i64(units),
            scale,
        }
    }

    /// `self / rhs` at `scale`, HALF_UP. `None` when `rhs` is zero.
    pub fn checked_div(self, rhs: Fixed, scale: u32) -> Option<Self> {
        if rhs.units == 0 {
            return None;
        }
        let scale = scale.min(MAX_SCALE);
        // result.units = a * 10^(scale + sb - sa) / b
        let exp = i64::from(scale) + i64::from(rhs.scale) - i64::from(self.scale);
        let (n, d) = if exp >= 0 {
            (
                i128::from(self.units).saturating_mul(pow10(exp as u32)),
                i128::from(rhs.units),
            )
        } else {
            (
                i128::from(self.units),
                i128::from(rhs.units) * pow10((-exp) as u32),
            )
        };
        Some(Self {
            units: saturate_i64(div_round_half_up(n, d)),
            scale,
        })
    }

    /// `self * rhs` at `scale`, HALF_UP.
    pub fn mul(self, rhs: Fixed, scale: u32) -> Self {
        let scale = scale.min(MAX_SCALE);
        let product = i128::from(self.units) * i128::from(rhs.units);
        let from = self.scale + rhs.scale;
        let units = if scale >= from {
            product.saturating_mul(pow10(scale - from))
        } else {
            div_round_half_up(product, pow10(from - scale))
        };
        Self {
            units: saturate_i64(units),
            scale,
        }
    }

    /// Exact multiplication by an integer, keeping the scale.
    #[inline]
    pub const fn mul_int(self, k: i64) -> Self {
        Self {
            units: self.units.saturating_mul(k),
            scale: self.scale,
        }
    }
}

impl PartialEq for Fixed {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fixed {}

impl PartialOrd for Fixed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fixed {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        let a = i128::from(self.units) * pow10(scale - self.scale);
        let b = i128::from(other.units) * pow10(scale - other.scale);
        a.cmp(&b)
    }
}

impl Neg for Fixed {
    type Output = Fixed;

    fn neg(self) -> Self::Output {
        Self {
            units: self.units.saturating_neg(),
            scale: self.scale,
        }
    }
}

impl From<i64> for Fixed {
    fn from(value: i64) -> Self {
        Self::from_int(value)
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.units < 0 { "-" } else { "" };
        let mag = self.units.unsigned_abs();
        if self.scale == 0 {
            return write!(f, "{sign}{mag}");
        }
        let div = 10u64.pow(self.scale);
        write!(
            f,
            "{sign}{}.{:0width$}",
            mag / div,
            mag % div,
            width = self.scale as usize
        )
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseFixedError {
    #[error("empty decimal")]
    Empty,
    #[error("invalid character in decimal: {0:?}")]
    InvalidDigit(char),
    #[error("more than {MAX_SCALE} fractional digits")]
    TooManyDecimals,
    #[error("decimal out of range")]
    Overflow,
}

impl FromStr for Fixed {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((i, f)) => (i, f),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(ParseFixedError::Empty);
        }
        if frac_part.len() > MAX_SCALE as usize {
            return Err(ParseFixedError::TooManyDecimals);
        }

        let mut units: i64 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let digit = c.to_digit(10).ok_or(ParseFixedError::InvalidDigit(c))?;
            units = units
                .checked_mul(10)
                .and_then(|u| u.checked_add(i64::from(digit)))
                .ok_or(ParseFixedError::Overflow)?;
        }
        if negative {
            units = -units;
        }
        Ok(Self::new(units, frac_part.len() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(s: &str) -> Fixed {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn half_up_rounds_ties_away_from_zero() {
        assert_eq!(div_round_half_up(5, 2), 3);
        assert_eq!(div_round_half_up(-5, 2), -3);
        assert_eq!(div_round_half_up(4, 3), 1);
        assert_eq!(div_round_half_up(-4, 3), -1);
        assert_eq!(div_round_half_up(7, -2), -4);
        assert_eq!(div_round_half_up(0, 7), 0);
    }

    #[test]
    fn rescale_narrows_with_half_up() {
        assert_eq!(fx("0.0125").rescale(3).to_string(), "0.013");
        assert_eq!(fx("-0.0125").rescale(3).to_string(), "-0.013");
        assert_eq!(fx("0.0124").rescale(3).to_string(), "0.012");
        assert_eq!(fx("2.5").rescale(0).to_string(), "3");
        assert_eq!(fx("7").rescale(3).to_string(), "7.000");
    }

    #[test]
    fn division_matches_speed_formula() {
        let per_pulse = Fixed::from_int(60)
            .checked_div(Fixed::from_int(400), 6)
            .unwrap();
        assert_eq!(per_pulse.to_string(), "0.150000");

        let per_second = Fixed::from_int(100).checked_div(fx("1.000"), 6).unwrap();
        assert_eq!(per_second.to_string(), "100.000000");
        assert_eq!(per_second.mul(per_pulse, 3).to_string(), "15.000");
    }

    #[test]
    fn division_by_zero_is_none() {
        assert!(Fixed::from_int(3).checked_div(Fixed::zero(3), 6).is_none());
    }

    #[test]
    fn division_rounds_repeating_fractions() {
        let third = Fixed::from_int(1).checked_div(Fixed::from_int(3), 3).unwrap();
        assert_eq!(third.to_string(), "0.333");
        let two_thirds = Fixed::from_int(-2).checked_div(Fixed::from_int(3), 3).unwrap();
        assert_eq!(two_thirds.to_string(), "-0.667");
    }

    #[test]
    fn durations_convert_to_rounded_seconds() {
        let d = Duration::from_micros(1_234_500);
        assert_eq!(Fixed::from_duration(d, 3).to_string(), "1.235");
        assert_eq!(Fixed::from_duration(Duration::ZERO, 3).to_string(), "0.000");
        assert_eq!(
            Fixed::from_duration(Duration::from_micros(400), 3).to_string(),
            "0.000"
        );
    }

    #[test]
    fn equality_ignores_scale() {
        assert_eq!(fx("15.000"), Fixed::from_int(15));
        assert!(fx("-0.5") < Fixed::ZERO);
        assert!(fx("0.01") > fx("0.009"));
        assert_eq!(-fx("31.00000"), fx("-31"));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("".parse::<Fixed>(), Err(ParseFixedError::Empty));
        assert_eq!("1a".parse::<Fixed>(), Err(ParseFixedError::InvalidDigit('a')));
        assert_eq!(
            "99999999999999999999".parse::<Fixed>(),
            Err(ParseFixedError::Overflow)
        );
        assert_eq!(fx("+3.50").to_string(), "3.50");
        assert_eq!(fx(".5"), fx("0.5"));
    }

    #[test]
    fn display_pads_fraction() {
        assert_eq!(Fixed::new(-5, 3).to_string(), "-0.005");
        assert_eq!(Fixed::new(1_000_000, 5).to_string(), "10.00000");
    }

    #[test]
    fn arithmetic_saturates_instead_of_wrapping() {
        let big = Fixed::from_int(i64::MAX);
        assert_eq!(big.mul_int(2).units(), i64::MAX);
        assert_eq!(big.rescale(3).units(), i64::MAX);
    }
}
