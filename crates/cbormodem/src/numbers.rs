//! Arbitrary-precision number support: the decimal-fraction pair carried
//! by tag 4, and conversions between big-integer magnitudes and the wire
//! byte strings of tags 2/3.

use core::fmt;

use num_bigint::{BigInt, Sign};

use crate::error::{CborError, Result};

/// A decimal fraction: `unscaled * 10^(-scale)`.
///
/// This is exactly the pair tag 4 puts on the wire as
/// `[scale, unscaled]`, so no external decimal-arithmetic crate is
/// involved; consumers that need arithmetic convert via
/// [`Decimal::to_f64`] or take the parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decimal {
    unscaled: BigInt,
    scale: i64,
}

impl Decimal {
    #[must_use]
    pub fn new(unscaled: BigInt, scale: i64) -> Self {
        Self { unscaled, scale }
    }

    #[must_use]
    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    #[must_use]
    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Nearest double, by way of the decimal text rendering so the result
    /// is correctly rounded rather than accumulated through binary
    /// intermediate products.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        // "125e-2"-style rendering; f64::from_str rounds correctly.
        let rendered = format!("{}e{}", self.unscaled, -self.scale);
        rendered.parse::<f64>().unwrap_or(f64::NAN)
    }

    /// The integer part, truncated toward zero.
    #[must_use]
    pub fn to_bigint_truncated(&self) -> BigInt {
        if self.scale == 0 {
            return self.unscaled.clone();
        }
        if self.scale > 0 {
            match u32::try_from(self.scale) {
                Ok(s) => &self.unscaled / BigInt::from(10u8).pow(s),
                // 10^scale dwarfs any representable unscaled value
                Err(_) => BigInt::from(0u8),
            }
        } else {
            let s = u32::try_from(-self.scale).unwrap_or(u32::MAX);
            &self.unscaled * BigInt::from(10u8).pow(s)
        }
    }

    /// Exact decimal expansion of a finite double, going through the
    /// shortest-round-trip text rendering to avoid binary-rounding
    /// artifacts (`0.1` becomes `1e-1`, not `1000000000000000055511e-22`).
    pub fn try_from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(CborError::NumberOverflow(format!(
                "{value} has no decimal expansion"
            )));
        }
        let rendered = format!("{value:e}");
        // Format is "<sign?><digits>[.<digits>]e<exp>".
        let (mantissa, exp) = rendered
            .split_once('e')
            .expect("LowerExp always contains an exponent");
        let exp: i64 = exp.parse().expect("LowerExp exponent is an integer");
        let (int_part, frac_part) = match mantissa.split_once('.') {
            Some((i, f)) => (i, f),
            None => (mantissa, ""),
        };
        let mut digits = String::with_capacity(int_part.len() + frac_part.len());
        digits.push_str(int_part);
        digits.push_str(frac_part);
        let unscaled: BigInt = digits
            .parse()
            .expect("mantissa digits parse as an integer");
        let scale = frac_part.len() as i64 - exp;
        Ok(Self { unscaled, scale })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}e{}", self.unscaled, -self.scale)
    }
}

/// Reconstructs the integer a bignum tag encodes: tag 2 carries the
/// magnitude `n` itself, tag 3 carries `-1 - n`.
#[must_use]
pub(crate) fn bigint_from_magnitude(negative: bool, magnitude: &[u8]) -> BigInt {
    let n = BigInt::from_bytes_be(Sign::Plus, magnitude);
    if negative {
        -n - 1
    } else {
        n
    }
}

/// The `(tag, magnitude)` pair encoding `value` as a bignum.
#[must_use]
pub(crate) fn magnitude_from_bigint(value: &BigInt) -> (bool, Vec<u8>) {
    if value.sign() == Sign::Minus {
        let n: BigInt = -value - 1;
        (true, n.to_bytes_be().1)
    } else {
        (false, value.to_bytes_be().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_to_f64() {
        let d = Decimal::new(BigInt::from(27315), 2);
        assert_eq!(d.to_f64(), 273.15);
        let d = Decimal::new(BigInt::from(-125), 2);
        assert_eq!(d.to_f64(), -1.25);
        let d = Decimal::new(BigInt::from(5), -3);
        assert_eq!(d.to_f64(), 5000.0);
    }

    #[test]
    fn decimal_from_f64_is_shortest() {
        let d = Decimal::try_from_f64(0.1).unwrap();
        assert_eq!(d, Decimal::new(BigInt::from(1), 1));

        let d = Decimal::try_from_f64(273.15).unwrap();
        assert_eq!(d, Decimal::new(BigInt::from(27315), 2));

        let d = Decimal::try_from_f64(-2.0).unwrap();
        assert_eq!(d, Decimal::new(BigInt::from(-2), 0));
    }

    #[test]
    fn decimal_from_f64_rejects_non_finite() {
        assert!(Decimal::try_from_f64(f64::NAN).is_err());
        assert!(Decimal::try_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn decimal_round_trips_through_f64() {
        for v in [0.0, 1.25, -273.15, 1e300, 4.9e-324] {
            let d = Decimal::try_from_f64(v).unwrap();
            assert_eq!(d.to_f64(), v);
        }
    }

    #[test]
    fn magnitude_round_trip() {
        for v in [0i64, 1, -1, 255, -256, i64::MAX, i64::MIN] {
            let big = BigInt::from(v);
            let (neg, mag) = magnitude_from_bigint(&big);
            assert_eq!(bigint_from_magnitude(neg, &mag), big);
        }
    }

    #[test]
    fn magnitude_rfc_examples() {
        // 18446744073709551616 is 0x01 followed by eight zero bytes.
        let big: BigInt = "18446744073709551616".parse().unwrap();
        let (neg, mag) = magnitude_from_bigint(&big);
        assert!(!neg);
        assert_eq!(mag, [1, 0, 0, 0, 0, 0, 0, 0, 0]);

        // -18446744073709551617 encodes the same magnitude under tag 3.
        let big: BigInt = "-18446744073709551617".parse().unwrap();
        let (neg, mag) = magnitude_from_bigint(&big);
        assert!(neg);
        assert_eq!(mag, [1, 0, 0, 0, 0, 0, 0, 0, 0]);
    }
}
