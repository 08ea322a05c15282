//! `f64`-backed numbers.

use super::{is_nan_literal, Num, NumError, NumFactory};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Fast fixed-precision number backed by `f64`.
///
/// Non-finite intermediate results (infinities from overflow or division by
/// zero) collapse to NaN so formulas see a single "undefined" value.
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub struct DoubleNum(f64);

impl DoubleNum {
    fn finite(value: f64) -> Self {
        if value.is_finite() {
            Self(value)
        } else {
            Self(f64::NAN)
        }
    }
}

impl Num for DoubleNum {
    type Factory = DoubleNumFactory;

    const NAN: Self = DoubleNum(f64::NAN);

    fn is_nan(self) -> bool {
        self.0.is_nan()
    }

    fn is_zero(self) -> bool {
        self.0 == 0.0
    }

    fn is_positive(self) -> bool {
        self.0 > 0.0
    }

    fn is_negative(self) -> bool {
        self.0 < 0.0
    }

    fn sqrt(self) -> Self {
        Self::finite(self.0.sqrt())
    }

    fn pow(self, n: i64) -> Self {
        match i32::try_from(n) {
            Ok(n) => Self::finite(self.0.powi(n)),
            Err(_) => Self::finite(self.0.powf(n as f64)),
        }
    }

    fn pow_num(self, exponent: Self) -> Self {
        Self::finite(self.0.powf(exponent.0))
    }

    fn abs(self) -> Self {
        Self(self.0.abs())
    }

    fn exp(self) -> Self {
        Self::finite(self.0.exp())
    }

    fn ln(self) -> Self {
        if self.0 <= 0.0 {
            return Self::NAN;
        }
        Self::finite(self.0.ln())
    }

    fn floor(self) -> Self {
        Self(self.0.floor())
    }

    fn ceil(self) -> Self {
        Self(self.0.ceil())
    }

    fn to_f64(self) -> f64 {
        self.0
    }
}

impl Add for DoubleNum {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::finite(self.0 + rhs.0)
    }
}

impl Sub for DoubleNum {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::finite(self.0 - rhs.0)
    }
}

impl Mul for DoubleNum {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::finite(self.0 * rhs.0)
    }
}

impl Div for DoubleNum {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        if rhs.0 == 0.0 {
            return Self::NAN;
        }
        Self::finite(self.0 / rhs.0)
    }
}

impl Neg for DoubleNum {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl fmt::Debug for DoubleNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DoubleNum({})", self.0)
    }
}

impl fmt::Display for DoubleNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            f.write_str("NaN")
        } else {
            fmt::Display::fmt(&self.0, f)
        }
    }
}

impl Serialize for DoubleNum {
    /// Finite values as JSON numbers; NaN as the string `"NaN"`, the same
    /// text [`DecimalNum`](super::DecimalNum) writes.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_nan() {
            serializer.serialize_str("NaN")
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

/// Factory for [`DoubleNum`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoubleNumFactory;

impl NumFactory for DoubleNumFactory {
    type Num = DoubleNum;

    fn name(&self) -> &'static str {
        "double"
    }

    fn num_of_f64(&self, value: f64) -> DoubleNum {
        DoubleNum::finite(value)
    }

    fn num_of_i64(&self, value: i64) -> DoubleNum {
        DoubleNum(value as f64)
    }

    fn num_of_str(&self, text: &str) -> Result<DoubleNum, NumError> {
        let trimmed = text.trim();
        if is_nan_literal(trimmed) {
            return Ok(DoubleNum::NAN);
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(DoubleNum(value)),
            _ => Err(NumError::InvalidNumber(trimmed.to_string())),
        }
    }
}
