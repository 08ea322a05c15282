//! Live mode: evaluate a strategy bar by bar over a one-bar series.
//!
//! A [`LiveSession`] owns a series that retains exactly one bar. Each
//! appended bar evicts the previous one; indicators keep answering through
//! their caches, which carry the one value before the window that recursive
//! formulas need. Rules that compare against the previous bar remember what
//! they saw there.
//!
//! Strategies must read their indicators at every index as bars arrive.
//! An index skipped in live mode can never be computed later because its bar
//! is already gone.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::domain::Bar;
use crate::indicators::{Indicator, IndicatorError};
use crate::num::Num;
use crate::series::{BarSeries, SeriesError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LiveError {
    #[error(transparent)]
    Series(#[from] SeriesError),
    #[error(transparent)]
    Indicator(#[from] IndicatorError),
    #[error("live session needs a series retaining exactly one bar (got {maximum_bar_count:?})")]
    NotLiveSeries { maximum_bar_count: Option<usize> },
}

/// Entry and exit rules evaluated at a bar index.
pub trait Strategy<N: Num>: Send + Sync {
    fn name(&self) -> &str;

    fn should_enter(&self, index: usize) -> Result<bool, IndicatorError>;

    fn should_exit(&self, index: usize) -> Result<bool, IndicatorError>;

    /// Leading indices at which rule outcomes are ignored.
    fn unstable_bars(&self) -> usize {
        0
    }
}

/// Enters when `fast` crosses above `slow`, exits when it crosses below.
///
/// Compares the spread `fast - slow` at `index` with the one at `index - 1`.
/// While `index - 1` is retained both operands are read there; once it has
/// been evicted the spread recorded when `index - 1` was evaluated is used,
/// and without one no crossing is reported.
pub struct CrossoverStrategy<A: Indicator, B> {
    fast: A,
    slow: B,
    recent: Mutex<VecDeque<(usize, A::Num)>>,
}

impl<N, A, B> CrossoverStrategy<A, B>
where
    N: Num,
    A: Indicator<Num = N, Output = N>,
    B: Indicator<Num = N, Output = N>,
{
    pub fn new(fast: A, slow: B) -> Self {
        Self {
            fast,
            slow,
            recent: Mutex::new(VecDeque::with_capacity(2)),
        }
    }

    fn spread(&self, index: usize) -> Result<N, IndicatorError> {
        Ok(self.fast.value(index)? - self.slow.value(index)?)
    }

    /// Spread at `index` and at `index - 1`.
    fn spreads(&self, index: usize) -> Result<(N, Option<N>), IndicatorError> {
        let current = self.spread(index)?;
        let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = match index.checked_sub(1) {
            None => None,
            Some(prev) if prev >= self.fast.series().begin_index() => Some(self.spread(prev)?),
            Some(prev) => recent
                .iter()
                .find(|(seen, _)| *seen == prev)
                .map(|&(_, spread)| spread),
        };

        if recent.back().is_some_and(|(seen, _)| *seen == index) {
            recent.pop_back();
        }
        recent.push_back((index, current));
        if recent.len() > 2 {
            recent.pop_front();
        }
        Ok((current, previous))
    }
}

impl<N, A, B> Strategy<N> for CrossoverStrategy<A, B>
where
    N: Num,
    A: Indicator<Num = N, Output = N>,
    B: Indicator<Num = N, Output = N>,
{
    fn name(&self) -> &str {
        "crossover"
    }

    fn should_enter(&self, index: usize) -> Result<bool, IndicatorError> {
        Ok(match self.spreads(index)? {
            (current, Some(previous)) => current.is_positive() && previous.is_negative_or_zero(),
            (_, None) => false,
        })
    }

    fn should_exit(&self, index: usize) -> Result<bool, IndicatorError> {
        Ok(match self.spreads(index)? {
            (current, Some(previous)) => current.is_negative() && previous.is_positive_or_zero(),
            (_, None) => false,
        })
    }

    fn unstable_bars(&self) -> usize {
        self.fast.unstable_bars().max(self.slow.unstable_bars())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Enter,
    Exit,
    Hold,
}

/// Outcome of one [`LiveSession::on_bar`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub index: usize,
    pub end_time: DateTime<Utc>,
    pub decision: Decision,
}

pub struct LiveSession<N: Num, S> {
    series: Arc<BarSeries<N>>,
    strategy: S,
    in_position: bool,
}

impl<N: Num, S: Strategy<N>> LiveSession<N, S> {
    /// Fails with [`LiveError::NotLiveSeries`] unless the series retains
    /// exactly one bar.
    pub fn new(series: Arc<BarSeries<N>>, strategy: S) -> Result<Self, LiveError> {
        match series.maximum_bar_count() {
            Some(1) => Ok(Self {
                series,
                strategy,
                in_position: false,
            }),
            maximum_bar_count => Err(LiveError::NotLiveSeries { maximum_bar_count }),
        }
    }

    pub fn series(&self) -> &Arc<BarSeries<N>> {
        &self.series
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn in_position(&self) -> bool {
        self.in_position
    }

    /// Appends `bar` and evaluates the strategy at its index.
    pub fn on_bar(&mut self, bar: Bar<N>) -> Result<Evaluation, LiveError> {
        let end_time = bar.end_time();
        self.series.add_bar(bar)?;
        let index = self.series.end_index().ok_or(SeriesError::IndexOutOfRange {
            index: 0,
            begin: self.series.begin_index(),
            end: None,
        })?;

        let fired = if self.in_position {
            self.strategy.should_exit(index)?
        } else {
            self.strategy.should_enter(index)?
        };
        let decision = match (fired && index >= self.strategy.unstable_bars(), self.in_position) {
            (false, _) => Decision::Hold,
            (true, false) => Decision::Enter,
            (true, true) => Decision::Exit,
        };
        if decision != Decision::Hold {
            self.in_position = !self.in_position;
            debug!(
                strategy = self.strategy.name(),
                index,
                %end_time,
                ?decision,
                "live decision"
            );
        }
        Ok(Evaluation {
            index,
            end_time,
            decision,
        })
    }
}
