//! Bounded, index-addressed bar series.
//!
//! A [`BarSeries`] assigns every appended bar a global index starting at 0.
//! Indices are never reused or renumbered. When a maximum bar count is set,
//! appending beyond it evicts bars from the head: `removed_bars_count` grows
//! and `begin_index` (always equal to it) advances, while `end_index` keeps
//! increasing. Only [`BarSeries::get_bar`] is strict about the retained
//! window; indicator caches keep serving already-computed values.
//!
//! The newest bar may be amended in place with [`BarSeries::replace_last_bar`]
//! (a forming bar in a live feed). Each replacement bumps
//! `replaced_bars_count`; cached indicators compare it on every read and
//! recompute their newest values when it moved.
//!
//! The mutable window sits behind an `RwLock` so a series can be shared as
//! `Arc<BarSeries<N>>` by every indicator reading it. `add_bar` completes
//! eviction before releasing the lock.

pub mod builder;
pub mod mode;

pub use builder::BarSeriesBuilder;
pub use mode::SeriesMode;

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

use crate::domain::Bar;
use crate::num::{Num, NumFactory};

/// Errors raised by series operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("bar index {index} outside retained window (begin {begin}, end {end:?})")]
    IndexOutOfRange {
        index: usize,
        begin: usize,
        end: Option<usize>,
    },
    #[error("bar ending at {end_time} does not follow series end {series_end}")]
    NonMonotonicBar {
        end_time: DateTime<Utc>,
        series_end: DateTime<Utc>,
    },
    #[error("invalid series configuration: {0}")]
    InvalidConfiguration(String),
}

/// Consistent snapshot of the bookkeeping an indicator cache reconciles
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub begin_index: usize,
    pub end_index: Option<usize>,
    pub replaced_bars_count: u64,
}

#[derive(Debug)]
struct Window<N: Num> {
    bars: VecDeque<Bar<N>>,
    removed_bars_count: usize,
    replaced_bars_count: u64,
    maximum_bar_count: Option<usize>,
}

impl<N: Num> Window<N> {
    fn end_index(&self) -> Option<usize> {
        (self.removed_bars_count + self.bars.len()).checked_sub(1)
    }

    /// Drops head bars beyond the bound; returns how many were removed.
    fn evict_exceeding(&mut self) -> usize {
        let Some(max) = self.maximum_bar_count else {
            return 0;
        };
        let excess = self.bars.len().saturating_sub(max);
        if excess > 0 {
            self.bars.drain(..excess);
            self.removed_bars_count += excess;
        }
        excess
    }
}

/// Append-only sequence of bars with a sliding retention window.
#[derive(Debug)]
pub struct BarSeries<N: Num> {
    name: String,
    factory: N::Factory,
    window: RwLock<Window<N>>,
}

impl<N: Num> BarSeries<N> {
    pub(crate) fn new(name: String, maximum_bar_count: Option<usize>) -> Self {
        Self {
            name,
            factory: N::Factory::default(),
            window: RwLock::new(Window {
                bars: VecDeque::new(),
                removed_bars_count: 0,
                replaced_bars_count: 0,
                maximum_bar_count,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Window<N>> {
        self.window.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Window<N>> {
        self.window.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The factory bound to this series for its lifetime.
    pub fn num_factory(&self) -> &N::Factory {
        &self.factory
    }

    /// Shorthand for `num_factory().num_of_f64(value)`.
    pub fn num_of(&self, value: f64) -> N {
        self.factory.num_of_f64(value)
    }

    /// First retained global index. Always equal to `removed_bars_count`.
    pub fn begin_index(&self) -> usize {
        self.read().removed_bars_count
    }

    /// Last global index, `None` while no bar has been added.
    pub fn end_index(&self) -> Option<usize> {
        self.read().end_index()
    }

    pub fn removed_bars_count(&self) -> usize {
        self.read().removed_bars_count
    }

    /// How many times the newest bar has been replaced.
    pub fn replaced_bars_count(&self) -> u64 {
        self.read().replaced_bars_count
    }

    /// Begin, end and replacement count read under one lock.
    pub fn window_state(&self) -> WindowState {
        let window = self.read();
        WindowState {
            begin_index: window.removed_bars_count,
            end_index: window.end_index(),
            replaced_bars_count: window.replaced_bars_count,
        }
    }

    /// Number of retained bars.
    pub fn bar_count(&self) -> usize {
        self.read().bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().bars.is_empty()
    }

    /// Retention bound; `None` means unbounded.
    pub fn maximum_bar_count(&self) -> Option<usize> {
        self.read().maximum_bar_count
    }

    /// Sets the retention bound and evicts down to it immediately.
    pub fn set_maximum_bar_count(&self, maximum_bar_count: usize) -> Result<(), SeriesError> {
        if maximum_bar_count == 0 {
            return Err(SeriesError::InvalidConfiguration(
                "maximum bar count must be strictly positive".into(),
            ));
        }
        let mut window = self.write();
        window.maximum_bar_count = Some(maximum_bar_count);
        let evicted = window.evict_exceeding();
        if evicted > 0 {
            debug!(
                series = %self.name,
                evicted,
                begin = window.removed_bars_count,
                maximum_bar_count,
                "bound lowered, bars evicted"
            );
        }
        Ok(())
    }

    /// Appends a bar, evicting from the head when the bound is exceeded.
    ///
    /// The bar must end strictly after the current last bar.
    pub fn add_bar(&self, bar: Bar<N>) -> Result<(), SeriesError> {
        let mut window = self.write();
        if let Some(last) = window.bars.back() {
            if bar.end_time() <= last.end_time() {
                return Err(SeriesError::NonMonotonicBar {
                    end_time: bar.end_time(),
                    series_end: last.end_time(),
                });
            }
        }
        window.bars.push_back(bar);
        let evicted = window.evict_exceeding();
        if evicted > 0 {
            trace!(
                series = %self.name,
                evicted,
                begin = window.removed_bars_count,
                "bars evicted"
            );
        }
        Ok(())
    }

    /// Replaces the newest bar in place, keeping its index.
    ///
    /// Fails with [`SeriesError::IndexOutOfRange`] on an empty series, and
    /// with [`SeriesError::NonMonotonicBar`] unless `bar` ends after the
    /// retained bar before it.
    pub fn replace_last_bar(&self, bar: Bar<N>) -> Result<(), SeriesError> {
        let mut window = self.write();
        let retained = window.bars.len();
        if retained == 0 {
            return Err(SeriesError::IndexOutOfRange {
                index: window.removed_bars_count,
                begin: window.removed_bars_count,
                end: None,
            });
        }
        if let Some(before) = retained.checked_sub(2).and_then(|i| window.bars.get(i)) {
            if bar.end_time() <= before.end_time() {
                return Err(SeriesError::NonMonotonicBar {
                    end_time: bar.end_time(),
                    series_end: before.end_time(),
                });
            }
        }
        if let Some(last) = window.bars.back_mut() {
            *last = bar;
        }
        window.replaced_bars_count += 1;
        debug!(
            series = %self.name,
            index = ?window.end_index(),
            replaced = window.replaced_bars_count,
            "last bar replaced"
        );
        Ok(())
    }

    /// Bar at a global index.
    ///
    /// Fails with [`SeriesError::IndexOutOfRange`] outside
    /// `[begin_index, end_index]`.
    pub fn get_bar(&self, index: usize) -> Result<Bar<N>, SeriesError> {
        let window = self.read();
        index
            .checked_sub(window.removed_bars_count)
            .and_then(|inner| window.bars.get(inner))
            .copied()
            .ok_or(SeriesError::IndexOutOfRange {
                index,
                begin: window.removed_bars_count,
                end: window.end_index(),
            })
    }

    pub fn first_bar(&self) -> Option<Bar<N>> {
        self.read().bars.front().copied()
    }

    pub fn last_bar(&self) -> Option<Bar<N>> {
        self.read().bars.back().copied()
    }

    /// Copy of the retained bars, oldest first.
    pub fn retained_bars(&self) -> Vec<Bar<N>> {
        self.read().bars.iter().copied().collect()
    }

    /// New independent series holding the retained bars in `[start, end)`.
    ///
    /// `end` is clamped to the end of the series. The copy starts its own
    /// index space at 0 and keeps this series' name and bound.
    pub fn sub_series(&self, start: usize, end: usize) -> Result<BarSeries<N>, SeriesError> {
        if start >= end {
            return Err(SeriesError::InvalidConfiguration(format!(
                "sub-series end {end} must be greater than start {start}"
            )));
        }
        let window = self.read();
        let last = window.end_index();
        if start < window.removed_bars_count || last.map_or(true, |last| start > last) {
            return Err(SeriesError::IndexOutOfRange {
                index: start,
                begin: window.removed_bars_count,
                end: last,
            });
        }
        let from = start - window.removed_bars_count;
        let to = (end - window.removed_bars_count).min(window.bars.len());
        let sub = BarSeries::new(self.name.clone(), window.maximum_bar_count);
        {
            let mut sub_window = sub.write();
            sub_window.bars.extend(window.bars.range(from..to).copied());
            sub_window.evict_exceeding();
        }
        Ok(sub)
    }
}
