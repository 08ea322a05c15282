//! Modified Moving Average (MMA), also known as Wilder's smoothing.
//!
//! Same recursion as [`Ema`](super::Ema) with `k = 1 / n`.

use std::sync::Arc;

use super::cached::{CachedIndicator, Formula, Prior};
use super::ema::smooth;
use super::{require_period, Indicator, IndicatorError};
use crate::num::{Num, NumFactory};
use crate::series::BarSeries;

#[derive(Debug)]
pub struct Mma<I: Indicator> {
    source: I,
    period: usize,
    multiplier: I::Num,
}

impl<N: Num, I: Indicator<Num = N, Output = N>> Mma<I> {
    pub fn new(source: I, period: usize) -> Result<CachedIndicator<Self>, IndicatorError> {
        require_period("mma", period)?;
        let factory = source.series().num_factory();
        let multiplier = factory.one() / factory.num_of_i64(period as i64);
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

impl<N: Num, I: Indicator<Num = N, Output = N>> Formula for Mma<I> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{Ema, Price};
    use crate::num::DoubleNumFactory;
    use crate::test_support::series_of;

    #[test]
    fn smooths_with_one_over_period() {
        let series = series_of(DoubleNumFactory, &[8.0, 16.0, 16.0], None);
        let mma = Mma::new(Price::close(&series), 4).unwrap();
        assert_eq!(mma.value(0).unwrap(), series.num_of(8.0));
        assert_eq!(mma.value(1).unwrap(), series.num_of(10.0));
        assert_eq!(mma.value(2).unwrap(), series.num_of(11.5));
    }

    #[test]
    fn matches_ema_of_equivalent_period() {
        // k = 1/n equals 2/(m+1) for m = 2n - 1
        let closes: Vec<f64> = (0..40).map(|i| (i * 7 % 13) as f64).collect();
        let series = series_of(DoubleNumFactory, &closes, None);
        let mma = Mma::new(Price::close(&series), 5).unwrap();
        let ema = Ema::new(Price::close(&series), 9).unwrap();
        for i in 0..40 {
            let diff = (mma.value(i).unwrap() - ema.value(i).unwrap()).abs();
            assert!(diff.to_f64() < 1e-9, "index {i}");
        }
    }

    #[test]
    fn rejects_zero_period() {
        let series = series_of(DoubleNumFactory, &[1.0], None);
        assert!(Mma::new(Price::close(&series), 0).is_err());
    }
}
