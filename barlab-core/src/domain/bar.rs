//! Bar — the fundamental market data unit.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::num::{Num, NumError, NumFactory};

/// Errors raised while building a bar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BarError {
    #[error("bar has no time period")]
    MissingTimePeriod,
    #[error("bar has no end time")]
    MissingEndTime,
    #[error("bar time period must be positive, got {0}")]
    NonPositiveTimePeriod(Duration),
    #[error(transparent)]
    Number(#[from] NumError),
}

/// OHLCV bar for one time period.
///
/// Immutable once built. The OHLC ordering (`high >= max(open, close)`,
/// `low <= min(open, close)`) is logical only; see [`Bar::is_sane`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar<N: Num> {
    #[serde(with = "duration_seconds")]
    time_period: Duration,
    end_time: DateTime<Utc>,
    open: N,
    high: N,
    low: N,
    close: N,
    volume: N,
    trades: u64,
}

impl<N: Num> Bar<N> {
    /// Starts a builder producing values through `factory`.
    pub fn builder<F: NumFactory<Num = N>>(factory: F) -> BarBuilder<F> {
        BarBuilder::new(factory)
    }

    pub fn time_period(&self) -> Duration {
        self.time_period
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// `end_time - time_period`.
    pub fn begin_time(&self) -> DateTime<Utc> {
        self.end_time - self.time_period
    }

    pub fn open(&self) -> N {
        self.open
    }

    pub fn high(&self) -> N {
        self.high
    }

    pub fn low(&self) -> N {
        self.low
    }

    pub fn close(&self) -> N {
        self.close
    }

    pub fn volume(&self) -> N {
        self.volume
    }

    pub fn trades(&self) -> u64 {
        self.trades
    }

    /// True when the close is above the open.
    pub fn is_bullish(&self) -> bool {
        self.open.is_less_than(self.close)
    }

    /// True when the close is below the open.
    pub fn is_bearish(&self) -> bool {
        self.open.is_greater_than(self.close)
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// OHLC sanity check: high bounds open/close from above, low from below.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high.is_greater_than_or_equal(self.open.max(self.close))
            && self.low.is_less_than_or_equal(self.open.min(self.close))
            && self.high.is_greater_than_or_equal(self.low)
    }
}

/// Fluent builder for [`Bar`].
///
/// Prices left unset are NaN; the time period and end time are required.
#[derive(Debug, Clone)]
pub struct BarBuilder<F: NumFactory> {
    factory: F,
    time_period: Option<Duration>,
    end_time: Option<DateTime<Utc>>,
    open: F::Num,
    high: F::Num,
    low: F::Num,
    close: F::Num,
    volume: F::Num,
    trades: u64,
}

impl<F: NumFactory> BarBuilder<F> {
    pub fn new(factory: F) -> Self {
        let nan = factory.nan();
        let zero = factory.zero();
        Self {
            factory,
            time_period: None,
            end_time: None,
            open: nan,
            high: nan,
            low: nan,
            close: nan,
            volume: zero,
            trades: 0,
        }
    }

    pub fn time_period(mut self, period: Duration) -> Self {
        self.time_period = Some(period);
        self
    }

    pub fn end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn open(mut self, value: f64) -> Self {
        self.open = self.factory.num_of_f64(value);
        self
    }

    pub fn high(mut self, value: f64) -> Self {
        self.high = self.factory.num_of_f64(value);
        self
    }

    pub fn low(mut self, value: f64) -> Self {
        self.low = self.factory.num_of_f64(value);
        self
    }

    pub fn close(mut self, value: f64) -> Self {
        self.close = self.factory.num_of_f64(value);
        self
    }

    pub fn volume(mut self, value: f64) -> Self {
        self.volume = self.factory.num_of_f64(value);
        self
    }

    pub fn open_str(mut self, text: &str) -> Result<Self, BarError> {
        self.open = self.factory.num_of_str(text)?;
        Ok(self)
    }

    pub fn high_str(mut self, text: &str) -> Result<Self, BarError> {
        self.high = self.factory.num_of_str(text)?;
        Ok(self)
    }

    pub fn low_str(mut self, text: &str) -> Result<Self, BarError> {
        self.low = self.factory.num_of_str(text)?;
        Ok(self)
    }

    pub fn close_str(mut self, text: &str) -> Result<Self, BarError> {
        self.close = self.factory.num_of_str(text)?;
        Ok(self)
    }

    pub fn volume_str(mut self, text: &str) -> Result<Self, BarError> {
        self.volume = self.factory.num_of_str(text)?;
        Ok(self)
    }

    /// Sets open, high, low and close to the same price.
    pub fn flat(self, price: f64) -> Self {
        self.open(price).high(price).low(price).close(price)
    }

    pub fn trades(mut self, trades: u64) -> Self {
        self.trades = trades;
        self
    }

    pub fn build(self) -> Result<Bar<F::Num>, BarError> {
        let time_period = self.time_period.ok_or(BarError::MissingTimePeriod)?;
        if time_period <= Duration::zero() {
            return Err(BarError::NonPositiveTimePeriod(time_period));
        }
        let end_time = self.end_time.ok_or(BarError::MissingEndTime)?;
        Ok(Bar {
            time_period,
            end_time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            trades: self.trades,
        })
    }
}

mod duration_seconds {
    use chrono::Duration;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(period: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(period.num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::{DecimalNumFactory, DoubleNumFactory};
    use chrono::TimeZone;

    fn end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 16, 0, 0).unwrap()
    }

    fn sample_bar() -> Bar<crate::num::DoubleNum> {
        BarBuilder::new(DoubleNumFactory)
            .time_period(Duration::days(1))
            .end_time(end())
            .open(100.0)
            .high(105.0)
            .low(98.0)
            .close(103.0)
            .volume(50_000.0)
            .trades(12)
            .build()
            .unwrap()
    }

    #[test]
    fn bar_is_sane() {
        let bar = sample_bar();
        assert!(bar.is_sane());
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
        assert_eq!(bar.trades(), 12);
    }

    #[test]
    fn begin_time_is_end_minus_period() {
        let bar = sample_bar();
        assert_eq!(bar.begin_time(), end() - Duration::days(1));
    }

    #[test]
    fn unset_prices_are_nan() {
        let bar = BarBuilder::new(DoubleNumFactory)
            .time_period(Duration::minutes(1))
            .end_time(end())
            .close(10.0)
            .build()
            .unwrap();
        assert!(bar.open().is_nan());
        assert!(bar.is_void());
        assert!(!bar.is_sane());
        assert!(bar.volume().is_zero());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let bar = BarBuilder::new(DoubleNumFactory)
            .time_period(Duration::days(1))
            .end_time(end())
            .open(100.0)
            .high(97.0)
            .low(98.0)
            .close(99.0)
            .build()
            .unwrap();
        assert!(!bar.is_sane());
    }

    #[test]
    fn builder_requires_time_fields() {
        let missing_period = BarBuilder::new(DoubleNumFactory).end_time(end()).build();
        assert_eq!(missing_period.unwrap_err(), BarError::MissingTimePeriod);

        let missing_end = BarBuilder::new(DoubleNumFactory)
            .time_period(Duration::days(1))
            .build();
        assert_eq!(missing_end.unwrap_err(), BarError::MissingEndTime);

        let negative = BarBuilder::new(DoubleNumFactory)
            .time_period(Duration::days(-1))
            .end_time(end())
            .build();
        assert!(matches!(negative, Err(BarError::NonPositiveTimePeriod(_))));
    }

    #[test]
    fn text_prices_propagate_invalid_number() {
        let result = BarBuilder::new(DecimalNumFactory).close_str("1O3.5");
        assert!(matches!(
            result,
            Err(BarError::Number(NumError::InvalidNumber(_)))
        ));
    }

    #[test]
    fn decimal_bar_serializes_prices_as_strings() {
        let bar = BarBuilder::new(DecimalNumFactory)
            .time_period(Duration::hours(1))
            .end_time(end())
            .close_str("101.25")
            .unwrap()
            .build()
            .unwrap();
        let json = serde_json::to_value(bar).unwrap();
        assert_eq!(json["close"], "101.25");
        assert_eq!(json["time_period"], 3600);
    }
}
