//! Indicator contract and evaluation strategies.
//!
//! An [`Indicator`] answers `value(index)` for any global bar index of the
//! series it reads. Three evaluation strategies exist:
//!
//! - **Direct**: types implementing [`Indicator`] themselves and recomputing
//!   on every call ([`Price`], [`Constant`], [`Macd`]). Only for O(1)
//!   formulas.
//! - **Cached**: a [`Formula`] wrapped in a [`CachedIndicator`], which
//!   memoizes one value per index and fills missing indices forward in
//!   order ([`Sma`]).
//! - **Recursive-cached**: a [`Formula`] that reads its own previous value
//!   through [`Prior::previous`] ([`Ema`], [`Mma`]). The forward fill runs in
//!   a loop owned by the cache, so the call stack stays flat however far
//!   ahead the request is.
//!
//! Boundary policy shared by every formula here: the first index is an
//! explicit seed, look-back windows are clamped to the retained part of the
//! series, and NaN read from a bar propagates as NaN.
//!
//! Indicators form a DAG. Share one upstream between several consumers by
//! wrapping it in an `Arc`.

pub mod cache;
pub mod cached;
pub mod ema;
pub mod helpers;
pub mod macd;
pub mod mma;
pub mod sma;

pub use cached::{CachedIndicator, Formula, Prior};
pub use ema::Ema;
pub use helpers::{Constant, Price, PriceField};
pub use macd::Macd;
pub use mma::Mma;
pub use sma::Sma;

use std::sync::Arc;

use crate::num::Num;
use crate::series::{BarSeries, SeriesError};

/// Errors surfaced by indicator construction and evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    /// A formula read a bar outside the retained window.
    #[error(transparent)]
    Series(#[from] SeriesError),
    /// Parameters rejected at construction time.
    #[error("invalid indicator configuration: {0}")]
    InvalidConfiguration(String),
}

/// A function from bar index to a derived value.
pub trait Indicator: Send + Sync {
    type Num: Num;
    type Output: Clone + Send + Sync;

    /// Value at a global bar index.
    fn value(&self, index: usize) -> Result<Self::Output, IndicatorError>;

    /// The series this indicator reads.
    fn series(&self) -> &Arc<BarSeries<Self::Num>>;

    /// Converts a float with the series' factory.
    fn num_of(&self, value: f64) -> Self::Num {
        self.series().num_of(value)
    }

    /// Number of leading indices whose values are still warming up.
    fn unstable_bars(&self) -> usize {
        0
    }
}

impl<I: Indicator + ?Sized> Indicator for Arc<I> {
    type Num = I::Num;
    type Output = I::Output;

    fn value(&self, index: usize) -> Result<Self::Output, IndicatorError> {
        (**self).value(index)
    }

    fn series(&self) -> &Arc<BarSeries<Self::Num>> {
        (**self).series()
    }

    fn unstable_bars(&self) -> usize {
        (**self).unstable_bars()
    }
}

/// Rejects a zero look-back period.
pub(crate) fn require_period(name: &str, period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidConfiguration(format!(
            "{name} period must be >= 1"
        )));
    }
    Ok(())
}

/// First index of a `period`-wide window ending at `index`, clamped to the
/// retained part of the series.
pub(crate) fn window_start(index: usize, period: usize, begin: usize) -> usize {
    (index + 1).saturating_sub(period).max(begin)
}
