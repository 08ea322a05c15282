//! Serializable engine configuration.
//!
//! ```toml
//! series_name = "spy-daily"
//! num = "decimal"
//!
//! [mode]
//! type = "backtest"
//! maximum_bar_count = 500
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::num::{Num, NumFactory};
use crate::series::{BarSeriesBuilder, SeriesMode};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Numeric backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumBackend {
    #[default]
    Double,
    Decimal,
}

impl NumBackend {
    /// Matches [`NumFactory::name`] of the backend's factory.
    pub fn name(&self) -> &'static str {
        match self {
            NumBackend::Double => "double",
            NumBackend::Decimal => "decimal",
        }
    }
}

/// Everything needed to set up a series and its indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub series_name: String,
    pub num: NumBackend,
    pub mode: SeriesMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            series_name: "unnamed".to_string(),
            num: NumBackend::default(),
            mode: SeriesMode::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.series_name.trim().is_empty() {
            return Err(ConfigError::Invalid("series_name must not be empty".into()));
        }
        if self.mode.maximum_bar_count() == Some(0) {
            return Err(ConfigError::Invalid(
                "maximum_bar_count must be strictly positive".into(),
            ));
        }
        Ok(())
    }

    /// Series builder carrying this config's name and mode.
    ///
    /// `N` must be the configured backend.
    pub fn series_builder<N: Num>(&self) -> Result<BarSeriesBuilder<N>, ConfigError> {
        self.validate()?;
        let requested = N::Factory::default().name();
        if requested != self.num.name() {
            return Err(ConfigError::Invalid(format!(
                "config selects the {} backend, series requested with {requested}",
                self.num.name()
            )));
        }
        Ok(BarSeriesBuilder::new()
            .with_name(self.series_name.clone())
            .with_mode(self.mode))
    }

    /// Content hash of the config.
    ///
    /// Two configs with the same fingerprint build identical series.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::{DecimalNum, DoubleNum};
    use std::io::Write;

    #[test]
    fn parses_full_document() {
        let config = EngineConfig::from_toml_str(
            r#"
            series_name = "spy"
            num = "decimal"

            [mode]
            type = "backtest"
            maximum_bar_count = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.series_name, "spy");
        assert_eq!(config.num, NumBackend::Decimal);
        assert_eq!(
            config.mode,
            SeriesMode::Backtest {
                maximum_bar_count: Some(500)
            }
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn zero_bound_is_invalid() {
        let result = EngineConfig::from_toml_str(
            "[mode]\ntype = \"backtest\"\nmaximum_bar_count = 0\n",
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_backend_fails_to_parse() {
        let result = EngineConfig::from_toml_str(r#"num = "bigint""#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn builder_follows_mode() {
        let config = EngineConfig {
            series_name: "btc".into(),
            num: NumBackend::Double,
            mode: SeriesMode::Live,
        };
        let series = config.series_builder::<DoubleNum>().unwrap().build().unwrap();
        assert_eq!(series.name(), "btc");
        assert_eq!(series.maximum_bar_count(), Some(1));
    }

    #[test]
    fn builder_rejects_other_backend() {
        let config = EngineConfig::default();
        assert!(matches!(
            config.series_builder::<DecimalNum>(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn fingerprint_is_deterministic_and_sensitive() {
        let a = EngineConfig::default();
        let mut b = a.clone();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        b.num = NumBackend::Decimal;
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "series_name = \"from-disk\"\n[mode]\ntype = \"live\"").unwrap();
        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.series_name, "from-disk");
        assert!(config.mode.is_live());
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = EngineConfig::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
