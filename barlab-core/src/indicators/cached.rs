//! Memoizing evaluation with iterative forward fill.
//!
//! [`CachedIndicator`] wraps a pure [`Formula`] and keeps one computed value
//! per index in a [`CacheWindow`] that trails the series' retained window.
//!
//! `value(index)`:
//! 1. Reconcile with the series. If the newest bar was replaced since the
//!    last read, values from the newest index seen then onward are dropped.
//!    Values below `begin_index` are trimmed in lock-step with the series;
//!    the last one trimmed is kept only as a carry for [`Prior::previous`],
//!    so a recursive formula continues across an eviction (this is what
//!    keeps live mode, with a one-bar window, exact).
//! 2. A cached value for `index` is returned as is.
//! 3. An `index` below `begin_index` gets the value at `begin_index`, the
//!    oldest retained entry. This is a lossy approximation, not the true
//!    value at `index`; it is traced and never recomputed.
//! 4. Otherwise every missing index from `max(highest + 1, begin_index)` up
//!    to `max(index, begin_index)` is computed in order, in a loop, and
//!    appended. The formula sees the filled prefix through [`Prior`] and
//!    never re-enters the cache, so stack depth does not depend on the gap.
//!
//! Each formula runs at most once per index and bar revision. Formula errors
//! propagate; values filled before the error stay cached.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

use super::cache::CacheWindow;
use super::{Indicator, IndicatorError};
use crate::num::Num;
use crate::series::{BarSeries, WindowState};

/// A pure "value at index" computation.
///
/// Recursive formulas read their own value at `index - 1` through
/// [`Prior::previous`]; it is `None` only at the first index the cache
/// fills (index 0, or the first retained index after an eviction that passed
/// everything cached), where the formula must return its seed.
pub trait Formula: Send + Sync {
    type Num: Num;
    type Output: Clone + Send + Sync;

    fn series(&self) -> &Arc<BarSeries<Self::Num>>;

    fn calculate(
        &self,
        index: usize,
        prior: &Prior<'_, Self::Output>,
    ) -> Result<Self::Output, IndicatorError>;

    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Read-only view of the values already computed for the same indicator.
pub struct Prior<'a, T> {
    window: &'a CacheWindow<T>,
}

impl<'a, T> Prior<'a, T> {
    fn new(window: &'a CacheWindow<T>) -> Self {
        Self { window }
    }

    /// Exact cached value at `index`, if retained.
    pub fn get(&self, index: usize) -> Option<&'a T> {
        self.window.get(index)
    }

    /// Cached value at `index - 1`, including the one carried past eviction.
    pub fn previous(&self, index: usize) -> Option<&'a T> {
        self.window.previous(index)
    }
}

struct CacheState<T> {
    window: CacheWindow<T>,
    replaced_bars_count: u64,
    end_index: Option<usize>,
}

impl<T> CacheState<T> {
    /// Brings the memo in line with `state`; see step 1 of the module docs.
    fn reconcile(&mut self, state: WindowState) {
        if state.replaced_bars_count != self.replaced_bars_count {
            if let Some(end) = self.end_index {
                let dropped = self.window.truncate_from(end);
                trace!(dropped, from = end, "last bar replaced, newest values dropped");
            }
            self.replaced_bars_count = state.replaced_bars_count;
        }
        self.end_index = state.end_index;

        let dropped = self.window.trim_below(state.begin_index);
        if dropped > 0 {
            trace!(dropped, begin = state.begin_index, "cache trimmed to series window");
        }
    }
}

/// Memoizing wrapper around a [`Formula`].
pub struct CachedIndicator<F: Formula> {
    formula: F,
    cache: Mutex<CacheState<F::Output>>,
}

impl<F: Formula> CachedIndicator<F> {
    pub fn new(formula: F) -> Self {
        Self {
            formula,
            cache: Mutex::new(CacheState {
                window: CacheWindow::default(),
                replaced_bars_count: 0,
                end_index: None,
            }),
        }
    }

    pub fn formula(&self) -> &F {
        &self.formula
    }

    /// Number of values currently memoized.
    pub fn cached_len(&self) -> usize {
        self.lock().window.len()
    }

    /// Newest memoized index.
    pub fn highest_cached_index(&self) -> Option<usize> {
        self.lock().window.highest_index()
    }

    /// Drops every memoized value; the next read recomputes from the
    /// retained window.
    pub fn clear_cache(&self) {
        self.lock().window.clear();
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<F::Output>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn compute(
        &self,
        index: usize,
        window: &mut CacheWindow<F::Output>,
    ) -> Result<F::Output, IndicatorError> {
        let value = self.formula.calculate(index, &Prior::new(window))?;
        window.push(index, value.clone());
        Ok(value)
    }
}

impl<F: Formula> Indicator for CachedIndicator<F> {
    type Num = F::Num;
    type Output = F::Output;

    fn value(&self, index: usize) -> Result<F::Output, IndicatorError> {
        let state = self.formula.series().window_state();
        let begin = state.begin_index;
        let mut cache = self.lock();
        cache.reconcile(state);
        let window = &mut cache.window;

        if let Some(value) = window.get(index) {
            return Ok(value.clone());
        }
        if index < begin {
            if let Some(oldest) = window.oldest() {
                trace!(index, oldest = begin, "evicted index answered with oldest cached value");
                return Ok(oldest.clone());
            }
        }

        let start = window.next_index().max(begin);
        let target = index.max(begin);
        debug_assert!(start <= target);
        if target > start {
            trace!(from = start, to = target, "filling cache forward");
        }
        let mut value = self.compute(start, window)?;
        for i in start + 1..=target {
            value = self.compute(i, window)?;
        }
        if index < begin {
            trace!(index, oldest = begin, "evicted index answered with oldest cached value");
        }
        Ok(value)
    }

    fn series(&self) -> &Arc<BarSeries<F::Num>> {
        self.formula.series()
    }

    fn unstable_bars(&self) -> usize {
        self.formula.unstable_bars()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::Price;
    use crate::num::{DoubleNum, DoubleNumFactory, NumFactory};
    use crate::test_support::{daily_bar, series_of};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Running sum of closes; counts every evaluation.
    struct RunningSum {
        close: Price<DoubleNum>,
        calls: AtomicUsize,
    }

    impl RunningSum {
        fn new(series: &Arc<BarSeries<DoubleNum>>) -> CachedIndicator<Self> {
            CachedIndicator::new(Self {
                close: Price::close(series),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Formula for RunningSum {
        type Num = DoubleNum;
        type Output = DoubleNum;

        fn series(&self) -> &Arc<BarSeries<DoubleNum>> {
            self.close.series()
        }

        fn calculate(
            &self,
            index: usize,
            prior: &Prior<'_, DoubleNum>,
        ) -> Result<DoubleNum, IndicatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let close = self.close.value(index)?;
            Ok(match prior.previous(index) {
                Some(&sum) => sum + close,
                None => close,
            })
        }
    }

    fn calls(indicator: &CachedIndicator<RunningSum>) -> usize {
        indicator.formula().calls.load(Ordering::SeqCst)
    }

    #[test]
    fn repeated_reads_compute_once() {
        let series = series_of(DoubleNumFactory, &[1.0; 300], None);
        let sum = RunningSum::new(&series);

        let first = sum.value(250).unwrap();
        let computed = calls(&sum);
        assert_eq!(computed, 251);

        assert_eq!(sum.value(250).unwrap(), first);
        sum.value(100).unwrap();
        sum.value(0).unwrap();
        assert_eq!(calls(&sum), computed);
    }

    #[test]
    fn jump_ahead_fills_every_index() {
        let series = series_of(DoubleNumFactory, &[1.0; 300], None);
        let sum = RunningSum::new(&series);
        assert_eq!(sum.value(200).unwrap(), series.num_of(201.0));
        assert_eq!(sum.cached_len(), 201);
        assert_eq!(sum.value(0).unwrap(), series.num_of(1.0));
        assert_eq!(sum.value(100).unwrap(), series.num_of(101.0));
        assert_eq!(sum.value(150).unwrap(), series.num_of(151.0));
    }

    #[test]
    fn cache_follows_series_eviction() {
        let series = series_of(DoubleNumFactory, &[1.0; 10], Some(4));
        let sum = RunningSum::new(&series);
        sum.value(9).unwrap();
        // fill starts at begin_index 6
        assert_eq!(sum.highest_cached_index(), Some(9));
        assert_eq!(sum.cached_len(), 4);

        for i in 10..30 {
            series.add_bar(daily_bar(DoubleNumFactory, i, 1.0)).unwrap();
            sum.value(i).unwrap();
            assert_eq!(sum.cached_len(), 4);
            assert_eq!(sum.highest_cached_index(), Some(i));
        }
    }

    #[test]
    fn carry_value_keeps_recursion_exact_across_eviction() {
        let series = series_of(DoubleNumFactory, &[1.0], Some(1));
        let sum = RunningSum::new(&series);
        assert_eq!(sum.value(0).unwrap(), series.num_of(1.0));
        for i in 1..50 {
            series.add_bar(daily_bar(DoubleNumFactory, i, 1.0)).unwrap();
            assert_eq!(sum.value(i).unwrap(), series.num_of(i as f64 + 1.0));
        }
    }

    #[test]
    fn evicted_index_returns_oldest_cached_value() {
        let series = series_of(DoubleNumFactory, &[1.0, 2.0, 3.0, 4.0, 5.0], Some(3));
        let sum = RunningSum::new(&series);
        // seeded at begin_index 2
        assert_eq!(sum.value(4).unwrap(), series.num_of(12.0));
        let computed = calls(&sum);
        assert_eq!(sum.value(0).unwrap(), series.num_of(3.0));
        assert_eq!(sum.value(1).unwrap(), series.num_of(3.0));
        assert_eq!(calls(&sum), computed);
    }

    #[test]
    fn evicted_index_on_cold_cache_fills_to_begin() {
        let series = series_of(DoubleNumFactory, &[1.0, 2.0, 3.0, 4.0, 5.0], Some(3));
        let sum = RunningSum::new(&series);
        assert_eq!(sum.value(0).unwrap(), series.num_of(3.0));
        assert_eq!(calls(&sum), 1);
        assert_eq!(sum.highest_cached_index(), Some(2));
    }

    #[test]
    fn evicted_reads_after_trim_match_value_at_begin() {
        let series = series_of(DoubleNumFactory, &[1.0, 2.0, 3.0], Some(3));
        let sum = RunningSum::new(&series);
        sum.value(2).unwrap();
        series.add_bar(daily_bar(DoubleNumFactory, 3, 4.0)).unwrap();
        series.add_bar(daily_bar(DoubleNumFactory, 4, 5.0)).unwrap();
        assert_eq!(sum.value(4).unwrap(), series.num_of(15.0));

        // 0 and 1 were cached once, but their bars are gone
        let at_begin = sum.value(2).unwrap();
        assert_eq!(at_begin, series.num_of(6.0));
        assert_eq!(sum.value(0).unwrap(), at_begin);
        assert_eq!(sum.value(1).unwrap(), at_begin);
        assert_eq!(sum.cached_len(), 3);
    }

    #[test]
    fn replaced_last_bar_is_recomputed() {
        let series = series_of(DoubleNumFactory, &[1.0, 2.0, 3.0], None);
        let sum = RunningSum::new(&series);
        assert_eq!(sum.value(2).unwrap(), series.num_of(6.0));
        let computed = calls(&sum);

        series.replace_last_bar(daily_bar(DoubleNumFactory, 2, 10.0)).unwrap();
        assert_eq!(sum.value(2).unwrap(), series.num_of(13.0));
        assert_eq!(calls(&sum), computed + 1);
        assert_eq!(sum.value(1).unwrap(), series.num_of(3.0));
        assert_eq!(calls(&sum), computed + 1);
    }

    #[test]
    fn replacement_seen_after_later_appends() {
        let series = series_of(DoubleNumFactory, &[1.0, 2.0], None);
        let sum = RunningSum::new(&series);
        sum.value(1).unwrap();

        series.replace_last_bar(daily_bar(DoubleNumFactory, 1, 5.0)).unwrap();
        series.add_bar(daily_bar(DoubleNumFactory, 2, 1.0)).unwrap();
        assert_eq!(sum.value(2).unwrap(), series.num_of(7.0));
        assert_eq!(sum.value(1).unwrap(), series.num_of(6.0));
    }

    #[test]
    fn replacement_in_one_bar_window_continues_from_carry() {
        let series = series_of(DoubleNumFactory, &[1.0], Some(1));
        let sum = RunningSum::new(&series);
        sum.value(0).unwrap();
        series.add_bar(daily_bar(DoubleNumFactory, 1, 2.0)).unwrap();
        assert_eq!(sum.value(1).unwrap(), series.num_of(3.0));

        series.replace_last_bar(daily_bar(DoubleNumFactory, 1, 4.0)).unwrap();
        assert_eq!(sum.value(1).unwrap(), series.num_of(5.0));
        series.add_bar(daily_bar(DoubleNumFactory, 2, 1.0)).unwrap();
        assert_eq!(sum.value(2).unwrap(), series.num_of(6.0));
    }

    #[test]
    fn formula_error_propagates_and_keeps_prefix() {
        let series = series_of(DoubleNumFactory, &[1.0; 5], None);
        let sum = RunningSum::new(&series);
        let err = sum.value(7).unwrap_err();
        assert!(matches!(err, IndicatorError::Series(_)));
        assert_eq!(sum.highest_cached_index(), Some(4));
        assert_eq!(sum.value(4).unwrap(), series.num_of(5.0));
    }

    #[test]
    fn clear_cache_recomputes() {
        let series = series_of(DoubleNumFactory, &[2.0; 3], None);
        let sum = RunningSum::new(&series);
        sum.value(2).unwrap();
        sum.clear_cache();
        assert_eq!(sum.cached_len(), 0);
        assert_eq!(sum.value(2).unwrap(), DoubleNumFactory.num_of_f64(6.0));
        assert_eq!(calls(&sum), 6);
    }
}
