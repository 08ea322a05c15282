//! Simple Moving Average (SMA).
//!
//! Mean of the source over the last `period` indices. Near the start of the
//! series, and after eviction, the window shrinks to the retained indices and
//! the mean divides by the actual count.

use std::sync::Arc;

use super::cached::{CachedIndicator, Formula, Prior};
use super::{require_period, window_start, Indicator, IndicatorError};
use crate::num::{Num, NumFactory};
use crate::series::BarSeries;

#[derive(Debug)]
pub struct Sma<I> {
    source: I,
    period: usize,
}

impl<N: Num, I: Indicator<Num = N, Output = N>> Sma<I> {
    pub fn new(source: I, period: usize) -> Result<CachedIndicator<Self>, IndicatorError> {
        require_period("sma", period)?;
        Ok(CachedIndicator::new(Self { source, period }))
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl<N: Num, I: Indicator<Num = N, Output = N>> Formula for Sma<I> {
    type Num = N;
    type Output = N;

    fn series(&self) -> &Arc<BarSeries<N>> {
        self.source.series()
    }

    fn calculate(&self, index: usize, _prior: &Prior<'_, N>) -> Result<N, IndicatorError> {
        let factory = self.series().num_factory();
        let start = window_start(index, self.period, self.series().begin_index());
        let mut sum = factory.zero();
        for i in start..=index {
            sum = sum + self.source.value(i)?;
        }
        Ok(sum / factory.num_of_i64((index - start + 1) as i64))
    }

    fn unstable_bars(&self) -> usize {
        self.period - 1
    }
}
