//! Analysis configuration
//!
//! Thresholds for every analyzer in one place. Durations are milliseconds,
//! distances are pixels.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Inter-event gap (ms) above which a row counts as a pause
    pub pause_threshold_ms: f64,
    /// Accumulated press-to-release motion (px) at which a click is a slip
    pub click_slip_threshold: f64,
    /// Treat duplicate timestamps within a session as fatal
    pub strict_timestamps: bool,
    /// Number of samples along the straight chord for perpendicular deviation
    pub perpendicular_resolution: usize,
    /// Guard added to the optimal area in the AUC ratio denominator
    pub auc_epsilon: f64,
    /// Maximum perpendicular deviation (px) for a straight pattern
    pub straight_pattern_threshold: f64,
    /// Velocity (px/ms) below which a row counts as slow
    pub hesitation_velocity_threshold: f64,
    /// Minimum slow rows for a hesitation pattern
    pub hesitation_min_slow_points: usize,
    /// Key codes counted as corrections
    pub backspace_key_codes: Vec<i64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pause_threshold_ms: 100.0,
            click_slip_threshold: 5.0,
            strict_timestamps: false,
            perpendicular_resolution: 100,
            auc_epsilon: 1e-6,
            straight_pattern_threshold: 100.0,
            hesitation_velocity_threshold: 0.1,
            hesitation_min_slow_points: 2,
            backspace_key_codes: vec![8, 46],
        }
    }
}

impl AnalysisConfig {
    /// Validate config values are within acceptable ranges.
    /// Returns Ok(()) if valid, or Err describing the first invalid field.
    ///
    /// Checks are written as `!(x > 0.0)` so that NaN is rejected too.
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.pause_threshold_ms > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "pause_threshold_ms must be > 0, got {}",
                self.pause_threshold_ms
            )));
        }
        if !(self.click_slip_threshold > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "click_slip_threshold must be > 0, got {}",
                self.click_slip_threshold
            )));
        }
        if self.perpendicular_resolution < 2 {
            return Err(ComputeError::InvalidConfig(format!(
                "perpendicular_resolution must be >= 2, got {}",
                self.perpendicular_resolution
            )));
        }
        if !(self.auc_epsilon > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "auc_epsilon must be > 0, got {}",
                self.auc_epsilon
            )));
        }
        if !(self.straight_pattern_threshold > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "straight_pattern_threshold must be > 0, got {}",
                self.straight_pattern_threshold
            )));
        }
        if !(self.hesitation_velocity_threshold > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "hesitation_velocity_threshold must be > 0, got {}",
                self.hesitation_velocity_threshold
            )));
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ComputeError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ComputeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self, ComputeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), ComputeError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String, ComputeError> {
        toml::to_string_pretty(self).map_err(|e| ComputeError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pause_threshold_ms, 100.0);
        assert_eq!(config.click_slip_threshold, 5.0);
        assert_eq!(config.perpendicular_resolution, 100);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AnalysisConfig {
            pause_threshold_ms: 250.0,
            strict_timestamps: true,
            ..AnalysisConfig::default()
        };
        let toml = config.to_toml().unwrap();
        let parsed = AnalysisConfig::from_toml_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = AnalysisConfig::from_toml_str("click_slip_threshold = 8.5\n").unwrap();
        assert_eq!(parsed.click_slip_threshold, 8.5);
        assert_eq!(parsed.pause_threshold_ms, 100.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = AnalysisConfig {
            pause_threshold_ms: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ComputeError::InvalidConfig(_))
        ));

        let config = AnalysisConfig {
            perpendicular_resolution: 1,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());

        assert!(AnalysisConfig::from_toml_str("auc_epsilon = -1.0").is_err());
    }

    #[test]
    fn test_zero_or_nan_epsilon_rejected() {
        let config = AnalysisConfig {
            auc_epsilon: 0.0,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ComputeError::InvalidConfig(_))
        ));

        let config = AnalysisConfig {
            auc_epsilon: f64::NAN,
            ..AnalysisConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(AnalysisConfig::from_toml_str("auc_epsilon = 0.0").is_err());
    }
}
