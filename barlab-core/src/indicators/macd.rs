//! Moving Average Convergence Divergence (MACD).
//!
//! `MACD[t] = EMA_short[t] - EMA_long[t]`. Both averages read the same
//! source and keep their own caches; the difference itself is direct.

use std::sync::Arc;

use super::cached::{CachedIndicator, Formula};
use super::{require_period, Ema, Indicator, IndicatorError};
use crate::num::Num;
use crate::series::BarSeries;

pub struct Macd<I: Indicator>
where
    Ema<I>: Formula,
{
    short: CachedIndicator<Ema<I>>,
    long: CachedIndicator<Ema<I>>,
}

impl<N: Num, I: Indicator<Num = N, Output = N> + Clone> Macd<I> {
    /// Fails unless `0 < short_period < long_period`.
    pub fn new(
        source: I,
        short_period: usize,
        long_period: usize,
    ) -> Result<Self, IndicatorError> {
        require_period("macd short", short_period)?;
        require_period("macd long", long_period)?;
        if short_period >= long_period {
            return Err(IndicatorError::InvalidConfiguration(format!(
                "macd short period {short_period} must be below long period {long_period}"
            )));
        }
        Ok(Self {
            short: Ema::new(source.clone(), short_period)?,
            long: Ema::new(source, long_period)?,
        })
    }

    pub fn short_ema(&self) -> &CachedIndicator<Ema<I>> {
        &self.short
    }

    pub fn long_ema(&self) -> &CachedIndicator<Ema<I>> {
        &self.long
    }
}

impl<N: Num, I: Indicator<Num = N, Output = N>> Indicator for Macd<I> {
    type Num = N;
    type Output = N;

    fn value(&self, index: usize) -> Result<N, IndicatorError> {
        Ok(self.short.value(index)? - self.long.value(index)?)
    }

    fn series(&self) -> &Arc<BarSeries<N>> {
        self.long.series()
    }

    fn unstable_bars(&self) -> usize {
        self.long.unstable_bars()
    }
}
