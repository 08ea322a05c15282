//! Shared fixtures for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use crate::domain::{Bar, BarBuilder};
use crate::num::NumFactory;
use crate::series::{BarSeries, BarSeriesBuilder};

/// End time of the `i`-th daily bar.
pub fn day_end(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 16, 0, 0).unwrap() + Duration::days(i as i64)
}

/// Daily bar whose open, high, low and close all equal `close`.
pub fn daily_bar<F: NumFactory>(factory: F, i: usize, close: f64) -> Bar<F::Num> {
    BarBuilder::new(factory)
        .time_period(Duration::days(1))
        .end_time(day_end(i))
        .flat(close)
        .volume(1000.0)
        .build()
        .unwrap()
}

/// Shared series of flat daily bars with the given closes.
pub fn series_of<F: NumFactory>(
    factory: F,
    closes: &[f64],
    maximum_bar_count: Option<usize>,
) -> Arc<BarSeries<F::Num>> {
    let mut builder = BarSeriesBuilder::new().with_name("test");
    if let Some(max) = maximum_bar_count {
        builder = builder.with_maximum_bar_count(max);
    }
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| daily_bar(factory.clone(), i, close));
    Arc::new(builder.with_bars(bars).build().unwrap())
}
