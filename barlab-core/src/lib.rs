//! BarLab Core — numeric backends, bounded bar series, cached indicator evaluation.
//!
//! This crate contains the evaluation engine:
//! - Pluggable numeric backends behind `Num` / `NumFactory` (f64 and decimal)
//! - Immutable bars and a bounded, index-addressed bar series with eviction
//! - Indicator contract with direct, cached and recursive-cached evaluation
//! - Live sessions evaluating a strategy over a one-bar series
//! - TOML engine configuration

pub mod config;
pub mod domain;
pub mod indicators;
pub mod live;
pub mod num;
pub mod series;

#[cfg(test)]
mod test_support;
