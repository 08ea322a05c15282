//! Fluent construction of bar series.

use super::{BarSeries, SeriesError, SeriesMode};
use crate::domain::Bar;
use crate::num::Num;

/// Builder for [`BarSeries`].
///
/// The numeric backend is fixed by the type parameter; its factory is bound
/// to the built series.
///
/// ```
/// use barlab_core::num::DecimalNum;
/// use barlab_core::series::{BarSeriesBuilder, SeriesMode};
///
/// let series = BarSeriesBuilder::<DecimalNum>::new()
///     .with_name("btc-usd")
///     .with_mode(SeriesMode::Live)
///     .build()
///     .unwrap();
/// assert_eq!(series.maximum_bar_count(), Some(1));
/// ```
#[derive(Debug, Clone)]
pub struct BarSeriesBuilder<N: Num> {
    name: String,
    maximum_bar_count: Option<usize>,
    bars: Vec<Bar<N>>,
}

impl<N: Num> Default for BarSeriesBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Num> BarSeriesBuilder<N> {
    pub fn new() -> Self {
        Self {
            name: "unnamed".to_string(),
            maximum_bar_count: None,
            bars: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Retention bound. Zero is rejected by [`build`](Self::build).
    pub fn with_maximum_bar_count(mut self, maximum_bar_count: usize) -> Self {
        self.maximum_bar_count = Some(maximum_bar_count);
        self
    }

    /// Applies the retention bound implied by `mode`.
    pub fn with_mode(mut self, mode: SeriesMode) -> Self {
        self.maximum_bar_count = mode.maximum_bar_count();
        self
    }

    /// Initial bars, appended in order (and evicted past the bound).
    pub fn with_bars(mut self, bars: impl IntoIterator<Item = Bar<N>>) -> Self {
        self.bars.extend(bars);
        self
    }

    pub fn build(self) -> Result<BarSeries<N>, SeriesError> {
        if self.maximum_bar_count == Some(0) {
            return Err(SeriesError::InvalidConfiguration(
                "maximum bar count must be strictly positive".into(),
            ));
        }
        let series = BarSeries::new(self.name, self.maximum_bar_count);
        for bar in self.bars {
            series.add_bar(bar)?;
        }
        Ok(series)
    }
}
