//! Direct indicators: bar fields and constants.
//!
//! These read straight from the series on every call and keep no state.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{Indicator, IndicatorError};
use crate::domain::Bar;
use crate::num::{Num, NumFactory};
use crate::series::BarSeries;

/// Which value of a bar a [`Price`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
    /// `(high + low + close) / 3`
    Typical,
}

impl PriceField {
    fn read<N: Num>(self, bar: &Bar<N>, factory: &N::Factory) -> N {
        match self {
            PriceField::Open => bar.open(),
            PriceField::High => bar.high(),
            PriceField::Low => bar.low(),
            PriceField::Close => bar.close(),
            PriceField::Volume => bar.volume(),
            PriceField::Typical => (bar.high() + bar.low() + bar.close()) / factory.three(),
        }
    }
}

/// One field of the bar at each index.
#[derive(Debug, Clone)]
pub struct Price<N: Num> {
    series: Arc<BarSeries<N>>,
    field: PriceField,
}

impl<N: Num> Price<N> {
    pub fn new(series: &Arc<BarSeries<N>>, field: PriceField) -> Self {
        Self {
            series: Arc::clone(series),
            field,
        }
    }

    pub fn close(series: &Arc<BarSeries<N>>) -> Self {
        Self::new(series, PriceField::Close)
    }

    pub fn open(series: &Arc<BarSeries<N>>) -> Self {
        Self::new(series, PriceField::Open)
    }

    pub fn high(series: &Arc<BarSeries<N>>) -> Self {
        Self::new(series, PriceField::High)
    }

    pub fn low(series: &Arc<BarSeries<N>>) -> Self {
        Self::new(series, PriceField::Low)
    }

    pub fn volume(series: &Arc<BarSeries<N>>) -> Self {
        Self::new(series, PriceField::Volume)
    }

    pub fn typical(series: &Arc<BarSeries<N>>) -> Self {
        Self::new(series, PriceField::Typical)
    }

    pub fn field(&self) -> PriceField {
        self.field
    }
}

impl<N: Num> Indicator for Price<N> {
    type Num = N;
    type Output = N;

    fn value(&self, index: usize) -> Result<N, IndicatorError> {
        let bar = self.series.get_bar(index)?;
        Ok(self.field.read(&bar, self.series.num_factory()))
    }

    fn series(&self) -> &Arc<BarSeries<N>> {
        &self.series
    }
}

/// The same value at every index, including evicted and future ones.
#[derive(Debug, Clone)]
pub struct Constant<N: Num> {
    series: Arc<BarSeries<N>>,
    value: N,
}

impl<N: Num> Constant<N> {
    pub fn new(series: &Arc<BarSeries<N>>, value: N) -> Self {
        Self {
            series: Arc::clone(series),
            value,
        }
    }
}

impl<N: Num> Indicator for Constant<N> {
    type Num = N;
    type Output = N;

    fn value(&self, _index: usize) -> Result<N, IndicatorError> {
        Ok(self.value)
    }

    fn series(&self) -> &Arc<BarSeries<N>> {
        &self.series
    }
}
