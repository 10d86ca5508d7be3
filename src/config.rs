use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::acwr::AcwrConfig;
use crate::alerts::AlertConfig;
use crate::clustering::ClusteringConfig;
use crate::distribution::DistributionConfig;
use crate::error::ConfigError;
use crate::ewma::EwmaConfig;
use crate::logging::LogConfig;
use crate::performance::PerformanceConfig;
use crate::profile::ProfileConfig;
use crate::recovery::RecoveryConfig;
use crate::workload::WorkloadConfig;

/// Main analytics configuration
///
/// Every section is optional in the TOML file; missing sections keep their
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Configuration metadata
    pub metadata: ConfigMetadata,

    /// Seed for the entropy source (None draws one from the OS)
    pub seed: Option<u64>,

    pub profile: ProfileConfig,
    pub clustering: ClusteringConfig,
    pub distribution: DistributionConfig,
    pub workload: WorkloadConfig,
    pub acwr: AcwrConfig,
    pub ewma: EwmaConfig,
    pub recovery: RecoveryConfig,
    pub alerts: AlertConfig,
    pub performance: PerformanceConfig,
    pub logging: LogConfig,
}

/// Configuration metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Default for ConfigMetadata {
    fn default() -> Self {
        ConfigMetadata {
            version: "1.0".to_string(),
            updated_at: Utc::now(),
        }
    }
}

fn out_of_range(field: &str, value: impl ToString, expected: &str) -> ConfigError {
    ConfigError::OutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

fn ordered(lower_name: &str, lower: f64, upper_name: &str, upper: f64) -> Result<(), ConfigError> {
    if lower < upper {
        Ok(())
    } else {
        Err(ConfigError::ThresholdOrder {
            lower: lower_name.to_string(),
            upper: upper_name.to_string(),
        })
    }
}

impl AnalyticsConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AnalyticsConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml_content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("squadrs")
            .join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!(
                    path = %config_path.display(),
                    error = %err,
                    "Using default configuration"
                );
                Self::default()
            }
        }
    }

    /// Check that every tunable is inside its accepted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.ewma.alpha > 0.0 && self.ewma.alpha <= 1.0) {
            return Err(out_of_range("ewma.alpha", self.ewma.alpha, "in (0, 1]"));
        }
        if self.ewma.window_days == 0 {
            return Err(out_of_range("ewma.window_days", 0, "at least 1"));
        }
        if self.acwr.acute_days == 0 || self.acwr.chronic_days == 0 {
            return Err(out_of_range("acwr window", 0, "at least 1 day"));
        }
        if self.acwr.acute_days > self.acwr.chronic_days {
            return Err(ConfigError::ThresholdOrder {
                lower: "acwr.acute_days".to_string(),
                upper: "acwr.chronic_days".to_string(),
            });
        }
        if self.workload.retention_days < self.acwr.chronic_days + self.acwr.trend_lookback_days {
            return Err(out_of_range(
                "workload.retention_days",
                self.workload.retention_days,
                "long enough to cover the chronic window plus trend lookback",
            ));
        }
        if self.clustering.max_iterations == 0 {
            return Err(out_of_range("clustering.max_iterations", 0, "at least 1"));
        }
        if self.clustering.convergence_threshold <= 0.0 {
            return Err(out_of_range(
                "clustering.convergence_threshold",
                self.clustering.convergence_threshold,
                "positive",
            ));
        }
        if self.distribution.max_group_size == 0 {
            return Err(out_of_range("distribution.max_group_size", 0, "at least 1"));
        }
        ordered(
            "distribution.medium_intensity_threshold",
            self.distribution.medium_intensity_threshold,
            "distribution.high_intensity_threshold",
            self.distribution.high_intensity_threshold,
        )?;
        ordered(
            "alerts.poor_recovery_fatigue",
            self.alerts.poor_recovery_fatigue,
            "alerts.critical_recovery_fatigue",
            self.alerts.critical_recovery_fatigue,
        )?;
        if self.recovery.min_recovery_hours < 0.0 {
            return Err(out_of_range(
                "recovery.min_recovery_hours",
                self.recovery.min_recovery_hours,
                "non-negative",
            ));
        }
        if !(self.recovery.variability_factor.is_finite() && self.recovery.variability_factor > 0.0) {
            return Err(out_of_range(
                "recovery.variability_factor",
                self.recovery.variability_factor,
                "positive",
            ));
        }
        for (athlete_id, factor) in &self.recovery.athlete_variability {
            if !(factor.is_finite() && *factor > 0.0) {
                return Err(out_of_range(
                    &format!("recovery.athlete_variability.{}", athlete_id),
                    factor,
                    "positive",
                ));
            }
        }
        if self.performance.min_observations < 2 {
            return Err(out_of_range(
                "performance.min_observations",
                self.performance.min_observations,
                "at least 2",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalyticsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AnalyticsConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AnalyticsConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.metadata.version, deserialized.metadata.version);
        assert_eq!(config.ewma.alpha, deserialized.ewma.alpha);
        assert_eq!(
            config.distribution.max_group_size,
            deserialized.distribution.max_group_size
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AnalyticsConfig = toml::from_str("seed = 7\n[ewma]\nalpha = 0.3\n").unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.ewma.alpha, 0.3);
        assert_eq!(config.ewma.baseline, 50.0);
        assert_eq!(config.clustering.max_iterations, 100);
    }

    #[test]
    fn test_per_athlete_variability_from_toml() {
        let config: AnalyticsConfig =
            toml::from_str("[recovery.athlete_variability]
p07 = 1.3
").unwrap();
        assert_eq!(config.recovery.athlete_variability.get("p07"), Some(&1.3));
        assert_eq!(config.recovery.variability_factor, 1.0);
        assert!(config.validate().is_ok());

        let mut config = config;
        config
            .recovery
            .athlete_variability
            .insert("p08".to_string(), -1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { field, .. }) if field == "recovery.athlete_variability.p08"
        ));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AnalyticsConfig::default();
        config.ewma.alpha = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { .. })
        ));

        let mut config = AnalyticsConfig::default();
        config.alerts.poor_recovery_fatigue = 90.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOrder { .. })
        ));

        let mut config = AnalyticsConfig::default();
        config.distribution.max_group_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = AnalyticsConfig::default();
        original.seed = Some(42);
        original.distribution.max_group_size = 8;

        original.save_to_file(&config_path).unwrap();
        let loaded = AnalyticsConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded.seed, Some(42));
        assert_eq!(loaded.distribution.max_group_size, 8);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[ewma]\nalpha = 0.0\n").unwrap();

        assert!(AnalyticsConfig::load_from_file(&config_path).is_err());
    }
}
