//! Pluggable numeric backends.
//!
//! Every price, volume and indicator output in the engine is a [`Num`]. Two
//! backends implement the contract:
//! - [`DoubleNum`]: `f64`-backed, fast, fixed precision.
//! - [`DecimalNum`]: `rust_decimal`-backed, 28 significant digits.
//!
//! Values are created only through the backend's [`NumFactory`]. A
//! `BarSeries<N>` binds one factory type for its whole lifetime, so mixing
//! backends is rejected by the compiler rather than checked per operation.
//!
//! # NaN
//! Both backends carry a distinguished NaN. Arithmetic with NaN yields NaN,
//! every comparison with NaN (other than [`Num::is_nan`]) is `false`, and
//! `NaN == NaN` is `false`. Division by zero, the square root of a negative
//! value, the logarithm of a non-positive value and overflow all produce NaN
//! instead of an error or an infinity.

pub mod decimal;
pub mod double;

pub use decimal::{DecimalNum, DecimalNumFactory};
pub use double::{DoubleNum, DoubleNumFactory};

use serde::Serialize;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Errors raised while constructing a number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NumError {
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
}

/// A numeric value produced by a [`NumFactory`].
///
/// Implementations are small `Copy` values with no identity beyond their
/// value. All operations are total.
pub trait Num:
    Copy
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + PartialOrd
    + Serialize
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Factory producing values of this backend.
    type Factory: NumFactory<Num = Self>;

    /// The backend's NaN.
    const NAN: Self;

    fn is_nan(self) -> bool;
    fn is_zero(self) -> bool;
    fn is_positive(self) -> bool;
    fn is_negative(self) -> bool;

    fn sqrt(self) -> Self;
    /// Integer power.
    fn pow(self, n: i64) -> Self;
    /// Power with a `Num` exponent.
    fn pow_num(self, exponent: Self) -> Self;
    fn abs(self) -> Self;
    fn exp(self) -> Self;
    /// Natural logarithm.
    fn ln(self) -> Self;
    fn floor(self) -> Self;
    fn ceil(self) -> Self;

    /// Lossy conversion; NaN maps to `f64::NAN`.
    fn to_f64(self) -> f64;

    fn is_positive_or_zero(self) -> bool {
        self.is_positive() || self.is_zero()
    }

    fn is_negative_or_zero(self) -> bool {
        self.is_negative() || self.is_zero()
    }

    fn is_equal(self, other: Self) -> bool {
        self == other
    }

    fn is_greater_than(self, other: Self) -> bool {
        self > other
    }

    fn is_greater_than_or_equal(self, other: Self) -> bool {
        self >= other
    }

    fn is_less_than(self, other: Self) -> bool {
        self < other
    }

    fn is_less_than_or_equal(self, other: Self) -> bool {
        self <= other
    }

    /// Smaller of two values; NaN if either is NaN.
    fn min(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            Self::NAN
        } else if self <= other {
            self
        } else {
            other
        }
    }

    /// Larger of two values; NaN if either is NaN.
    fn max(self, other: Self) -> Self {
        if self.is_nan() || other.is_nan() {
            Self::NAN
        } else if self >= other {
            self
        } else {
            other
        }
    }
}

/// Produces [`Num`] values of one backend.
///
/// Factories are stateless and cheap to clone; one is bound per bar series
/// and shared by reference with every indicator reading that series.
pub trait NumFactory: Clone + Default + fmt::Debug + Send + Sync + 'static {
    type Num: Num;

    /// Short backend name, used in logs.
    fn name(&self) -> &'static str;

    /// Converts a float. NaN and infinities become the backend's NaN.
    fn num_of_f64(&self, value: f64) -> Self::Num;

    fn num_of_i64(&self, value: i64) -> Self::Num;

    /// Parses text. The literal `NaN` (any case) yields NaN.
    fn num_of_str(&self, text: &str) -> Result<Self::Num, NumError>;

    fn nan(&self) -> Self::Num {
        <Self::Num as Num>::NAN
    }

    fn minus_one(&self) -> Self::Num {
        self.num_of_i64(-1)
    }

    fn zero(&self) -> Self::Num {
        self.num_of_i64(0)
    }

    fn one(&self) -> Self::Num {
        self.num_of_i64(1)
    }

    fn two(&self) -> Self::Num {
        self.num_of_i64(2)
    }

    fn three(&self) -> Self::Num {
        self.num_of_i64(3)
    }

    fn hundred(&self) -> Self::Num {
        self.num_of_i64(100)
    }

    fn thousand(&self) -> Self::Num {
        self.num_of_i64(1000)
    }
}

/// Returns true when `text` spells NaN.
pub(crate) fn is_nan_literal(text: &str) -> bool {
    text.eq_ignore_ascii_case("nan")
}
