//! Series modes: backtest vs live.

use serde::{Deserialize, Serialize};

/// How much history a series retains.
///
/// - `Backtest`: large or unbounded history; indicators may be queried at
///   arbitrary retained indices, repeatedly.
/// - `Live`: exactly one bar is retained. Each new bar evicts the previous
///   one, so indicators can rely only on their own caches and on bars
///   arriving forward in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeriesMode {
    Backtest {
        #[serde(default)]
        maximum_bar_count: Option<usize>,
    },
    Live,
}

impl SeriesMode {
    /// Retention bound implied by the mode.
    pub fn maximum_bar_count(&self) -> Option<usize> {
        match self {
            SeriesMode::Backtest { maximum_bar_count } => *maximum_bar_count,
            SeriesMode::Live => Some(1),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SeriesMode::Live)
    }
}

impl Default for SeriesMode {
    fn default() -> Self {
        SeriesMode::Backtest {
            maximum_bar_count: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_mode_retains_one_bar() {
        assert_eq!(SeriesMode::Live.maximum_bar_count(), Some(1));
        assert!(SeriesMode::Live.is_live());
        assert_eq!(SeriesMode::default().maximum_bar_count(), None);
    }

    #[test]
    fn deserializes_from_toml() {
        let live: SeriesMode = toml::from_str(r#"type = "live""#).unwrap();
        assert_eq!(live, SeriesMode::Live);

        let bounded: SeriesMode =
            toml::from_str("type = \"backtest\"\nmaximum_bar_count = 100").unwrap();
        assert_eq!(bounded.maximum_bar_count(), Some(100));

        let unbounded: SeriesMode = toml::from_str(r#"type = "backtest""#).unwrap();
        assert_eq!(unbounded, SeriesMode::default());
    }
}
