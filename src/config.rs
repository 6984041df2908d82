use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use crate::alerts::DataSource;
use crate::cvd::CvdConfig;
use crate::errors::Result;
use crate::logging::LoggingConfig;
use crate::technical_analysis::{MacdConfig, RsiConfig};
use crate::volume_profile::FrvpConfig;

/// Level watched on one of the derived series
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlertRule {
    pub source: DataSource,
    pub level: f64,
}

/// Engine configuration from config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: LoggingConfig,
    pub rsi: RsiConfig,
    pub macd: MacdConfig,
    pub cvd: CvdConfig,
    pub frvp: FrvpConfig,
    pub alerts: Vec<AlertRule>,
}

impl EngineConfig {
    /// Load configuration from a TOML file; the result is already sanitized
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: EngineConfig = toml::from_str(content)?;
        config.sanitize();
        Ok(config)
    }

    /// Clamp every section into range, logging each adjustment
    pub fn sanitize(&mut self) {
        self.rsi.sanitize();
        self.macd.sanitize();
        self.cvd.sanitize();
        self.frvp.sanitize();

        self.alerts.retain(|rule| {
            if rule.level.is_finite() {
                true
            } else {
                warn!("Dropping {} alert with non-finite level", rule.source);
                false
            }
        });
    }
}
