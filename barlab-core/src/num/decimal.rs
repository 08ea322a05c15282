//! Arbitrary-precision numbers backed by `rust_decimal`.

use super::{is_nan_literal, Num, NumError, NumFactory};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::str::FromStr;

/// Decimal number with 28 significant digits and an explicit NaN.
///
/// `None` is NaN. Every checked operation that fails (overflow, division by
/// zero, domain errors) produces NaN.
#[derive(Clone, Copy)]
pub struct DecimalNum(Option<Decimal>);

impl DecimalNum {
    fn map(self, op: impl FnOnce(Decimal) -> Option<Decimal>) -> Self {
        Self(self.0.and_then(op))
    }

    fn zip(self, rhs: Self, op: impl FnOnce(Decimal, Decimal) -> Option<Decimal>) -> Self {
        match (self.0, rhs.0) {
            (Some(a), Some(b)) => Self(op(a, b)),
            _ => Self::NAN,
        }
    }

    /// The underlying decimal, `None` for NaN.
    pub fn as_decimal(self) -> Option<Decimal> {
        self.0
    }
}

impl Num for DecimalNum {
    type Factory = DecimalNumFactory;

    const NAN: Self = DecimalNum(None);

    fn is_nan(self) -> bool {
        self.0.is_none()
    }

    fn is_zero(self) -> bool {
        self.0.is_some_and(|d| d.is_zero())
    }

    fn is_positive(self) -> bool {
        self.0.is_some_and(|d| d > Decimal::ZERO)
    }

    fn is_negative(self) -> bool {
        self.0.is_some_and(|d| d < Decimal::ZERO)
    }

    fn sqrt(self) -> Self {
        self.map(|d| d.sqrt())
    }

    fn pow(self, n: i64) -> Self {
        self.map(|d| d.checked_powi(n))
    }

    fn pow_num(self, exponent: Self) -> Self {
        self.zip(exponent, |d, e| d.checked_powd(e))
    }

    fn abs(self) -> Self {
        self.map(|d| Some(d.abs()))
    }

    fn exp(self) -> Self {
        self.map(|d| d.checked_exp())
    }

    fn ln(self) -> Self {
        self.map(|d| if d > Decimal::ZERO { d.checked_ln() } else { None })
    }

    fn floor(self) -> Self {
        self.map(|d| Some(d.floor()))
    }

    fn ceil(self) -> Self {
        self.map(|d| Some(d.ceil()))
    }

    fn to_f64(self) -> f64 {
        self.0.and_then(|d| d.to_f64()).unwrap_or(f64::NAN)
    }
}

impl PartialEq for DecimalNum {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.0, other.0), (Some(a), Some(b)) if a == b)
    }
}

impl PartialOrd for DecimalNum {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }
}

impl Add for DecimalNum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a.checked_add(b))
    }
}

impl Sub for DecimalNum {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a.checked_sub(b))
    }
}

impl Mul for DecimalNum {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.zip(rhs, |a, b| a.checked_mul(b))
    }
}

impl Div for DecimalNum {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        // checked_div is None for a zero divisor
        self.zip(rhs, |a, b| a.checked_div(b))
    }
}

impl Neg for DecimalNum {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|d| Some(-d))
    }
}

impl fmt::Debug for DecimalNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecimalNum({self})")
    }
}

impl fmt::Display for DecimalNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => fmt::Display::fmt(&d.normalize(), f),
            None => f.write_str("NaN"),
        }
    }
}

impl Serialize for DecimalNum {
    /// Serialized as a string so no digits are lost.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Factory for [`DecimalNum`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecimalNumFactory;

impl NumFactory for DecimalNumFactory {
    type Num = DecimalNum;

    fn name(&self) -> &'static str {
        "decimal"
    }

    fn num_of_f64(&self, value: f64) -> DecimalNum {
        DecimalNum(Decimal::from_f64(value))
    }

    fn num_of_i64(&self, value: i64) -> DecimalNum {
        DecimalNum(Some(Decimal::from(value)))
    }

    fn num_of_str(&self, text: &str) -> Result<DecimalNum, NumError> {
        let trimmed = text.trim();
        if is_nan_literal(trimmed) {
            return Ok(DecimalNum::NAN);
        }
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(|d| DecimalNum(Some(d)))
            .map_err(|_| NumError::InvalidNumber(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_decimal_digits_exact() {
        let f = DecimalNumFactory;
        let sum = f.num_of_str("0.1").unwrap() + f.num_of_str("0.2").unwrap();
        assert_eq!(sum, f.num_of_str("0.3").unwrap());
    }

    #[test]
    fn overflow_is_nan() {
        let f = DecimalNumFactory;
        let max = DecimalNum(Some(Decimal::MAX));
        assert!((max + f.one()).is_nan());
        assert!((max * f.two()).is_nan());
    }

    #[test]
    fn scientific_notation_parses() {
        let f = DecimalNumFactory;
        assert_eq!(f.num_of_str("1.5e2").unwrap(), f.num_of_i64(150));
    }

    #[test]
    fn display_is_normalized() {
        let f = DecimalNumFactory;
        assert_eq!(f.num_of_str("2.500").unwrap().to_string(), "2.5");
        assert_eq!(f.nan().to_string(), "NaN");
        assert_eq!(
            serde_json::to_string(&f.num_of_str("1.25").unwrap()).unwrap(),
            "\"1.25\""
        );
        assert_eq!(serde_json::to_string(&f.nan()).unwrap(), "\"NaN\"");
    }

    #[test]
    fn float_conversion_rejects_non_finite() {
        let f = DecimalNumFactory;
        assert!(f.num_of_f64(f64::INFINITY).is_nan());
        assert_eq!(f.num_of_f64(2.5), f.num_of_str("2.5").unwrap());
    }
}
