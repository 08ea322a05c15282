//! Exponential Moving Average (EMA).
//!
//! Recursive: `EMA[t] = EMA[t-1] + (source[t] - EMA[t-1]) * k`, `k = 2 / (n + 1)`.
//! Seed: the source value at the first computed index.
//! Unstable bars: `period`.

use std::sync::Arc;

use super::cached::{CachedIndicator, Formula, Prior};
use super::{require_period, Indicator, IndicatorError};
use crate::num::{Num, NumFactory};
use crate::series::BarSeries;

#[derive(Debug)]
pub struct Ema<I: Indicator> {
    source: I,
    period: usize,
    multiplier: I::Num,
}

impl<N: Num, I: Indicator<Num = N, Output = N>> Ema<I> {
    pub fn new(source: I, period: usize) -> Result<CachedIndicator<Self>, IndicatorError> {
        require_period("ema", period)?;
        let factory = source.series().num_factory();
        let multiplier = factory.two() / factory.num_of_i64(period as i64 + 1);
        Ok(CachedIndicator::new(Self {
            source,
            period,
            multiplier,
        }))
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<N: Num, I: Indicator<Num = N, Output = N>> Formula for Ema<I> {
    type Num = N;
    type Output = N;

    fn series(&self) -> &Arc<BarSeries<N>> {
        self.source.series()
    }

    fn calculate(&self, index: usize, prior: &Prior<'_, N>) -> Result<N, IndicatorError> {
        smooth(&self.source, self.multiplier, index, prior)
    }

    fn unstable_bars(&self) -> usize {
        self.period
    }
}

/// One step of exponential smoothing shared by [`Ema`] and
/// [`Mma`](super::Mma).
pub(crate) fn smooth<N: Num, I: Indicator<Num = N, Output = N>>(
    source: &I,
    multiplier: N,
    index: usize,
    prior: &Prior<'_, N>,
) -> Result<N, IndicatorError> {
    let current = source.value(index)?;
    Ok(match prior.previous(index) {
        Some(&previous) => previous + (current - previous) * multiplier,
        None => current,
    })
}
