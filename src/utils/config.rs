use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core::constants::PULSE_TIME_WINDOW_NS;
use crate::validation::error::ShowerError;

/// Pulse aggregation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Half-width of the acceptance window around the core time (ns)
    pub time_window_ns: f64,
}

/// Thresholds of the two-stage event quality cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityCutConfig {
    /// Reconstructed core must lie closer than this to the array centre (m)
    pub max_core_distance_m: f64,
    /// Minimum cosine of the reconstructed zenith
    pub min_cos_zenith: f64,
    /// Minimum fitted signal at 125 m (VEM)
    pub min_s125_vem: f64,
    /// Largest single pulse must reach this charge (VEM)
    pub min_max_charge_vem: f64,
    /// Largest single pulse must lie within this distance of the core (m)
    pub max_charge_distance_m: f64,
    /// Pulse acceptance half-window for the second stage (ns)
    pub time_window_ns: f64,
}

/// Selection applied by the downstream signal analyses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Only tanks at least this far from the shower axis are used (m)
    pub distance_m: f64,
    /// Feature rows use only tanks strictly beyond this axis distance (m)
    pub feature_distance_m: f64,
    /// Exclusive lower bound of the per-tank charge window (VEM)
    pub charge_lower_vem: f64,
    /// Exclusive upper bound of the per-tank charge window (VEM)
    pub charge_upper_vem: f64,
    /// Exclusive lower bound of the primary energy window (eV)
    pub energy_lower_ev: f64,
    /// Exclusive upper bound of the primary energy window (eV)
    pub energy_upper_ev: f64,
}

/// Complete configuration of one processing run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowerConfig {
    pub aggregation: AggregationConfig,
    pub quality: QualityCutConfig,
    pub analysis: AnalysisConfig,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            time_window_ns: PULSE_TIME_WINDOW_NS,
        }
    }
}

impl Default for QualityCutConfig {
    fn default() -> Self {
        Self {
            max_core_distance_m: 400.0,
            min_cos_zenith: 0.8,
            min_s125_vem: 1.0,
            min_max_charge_vem: 6.0,
            max_charge_distance_m: 300.0,
            time_window_ns: PULSE_TIME_WINDOW_NS,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            distance_m: 300.0,
            feature_distance_m: 400.0,
            charge_lower_vem: 0.6,
            charge_upper_vem: 2.0,
            energy_lower_ev: 10f64.powf(15.5),
            energy_upper_ev: 1e16,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid {parameter} = {value}: {reason}")]
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Configuration file I/O error
    #[error("{message}")]
    IoError { message: String },
    /// JSON serialization/deserialization error
    #[error("{message}")]
    SerializationError { message: String },
}

impl From<ConfigError> for ShowerError {
    fn from(error: ConfigError) -> Self {
        ShowerError::Config { reason: error.to_string() }
    }
}

fn invalid(parameter: &str, value: f64, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        parameter: parameter.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn require_positive(parameter: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(parameter, value, "must be a positive finite number"))
    }
}

fn require_ordered(lower_name: &str, lower: f64, upper_name: &str, upper: f64) -> Result<(), ConfigError> {
    if lower < upper {
        Ok(())
    } else {
        Err(invalid(lower_name, lower, &format!("must be below {} = {}", upper_name, upper)))
    }
}

impl ShowerConfig {
    /// Check every parameter, returning the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("aggregation.time_window_ns", self.aggregation.time_window_ns)?;

        let q = &self.quality;
        require_positive("quality.max_core_distance_m", q.max_core_distance_m)?;
        require_positive("quality.max_charge_distance_m", q.max_charge_distance_m)?;
        require_positive("quality.time_window_ns", q.time_window_ns)?;
        if !(-1.0..=1.0).contains(&q.min_cos_zenith) {
            return Err(invalid("quality.min_cos_zenith", q.min_cos_zenith, "must lie in [-1, 1]"));
        }
        if q.min_s125_vem < 0.0 {
            return Err(invalid("quality.min_s125_vem", q.min_s125_vem, "must not be negative"));
        }
        if q.min_max_charge_vem < 0.0 {
            return Err(invalid("quality.min_max_charge_vem", q.min_max_charge_vem, "must not be negative"));
        }

        let a = &self.analysis;
        if a.distance_m.is_nan() || a.distance_m < 0.0 {
            return Err(invalid("analysis.distance_m", a.distance_m, "must not be negative"));
        }
        if a.feature_distance_m.is_nan() || a.feature_distance_m < 0.0 {
            return Err(invalid("analysis.feature_distance_m", a.feature_distance_m, "must not be negative"));
        }
        require_ordered(
            "analysis.charge_lower_vem", a.charge_lower_vem,
            "analysis.charge_upper_vem", a.charge_upper_vem,
        )?;
        require_ordered(
            "analysis.energy_lower_ev", a.energy_lower_ev,
            "analysis.energy_upper_ev", a.energy_upper_ev,
        )?;
        Ok(())
    }
}

/// Loads, validates and stores the run configuration
pub struct ConfigurationManager {
    config: ShowerConfig,
    config_file_path: Option<String>,
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationManager {
    /// Create a new configuration manager with the fixed default constants
    pub fn new() -> Self {
        Self {
            config: ShowerConfig::default(),
            config_file_path: None,
        }
    }

    /// Create configuration manager and load from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut manager = Self::new();
        manager.load_from_file(path)?;
        Ok(manager)
    }

    pub fn config(&self) -> &ShowerConfig {
        &self.config
    }

    pub fn config_file_path(&self) -> Option<&str> {
        self.config_file_path.as_deref()
    }

    /// Replace the configuration after validation
    pub fn update_config(&mut self, config: ShowerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Load configuration from JSON file; missing fields keep their defaults
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::IoError {
                message: format!("Failed to read config file '{}': {}", path_str, e),
            })?;

        let config: ShowerConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })?;

        self.update_config(config)?;
        self.config_file_path = Some(path_str);
        Ok(())
    }

    /// Save configuration to JSON file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            })?;

        fs::write(&path, content)
            .map_err(|e| ConfigError::IoError {
                message: format!("Failed to write config file '{}': {}", path_str, e),
            })?;

        self.config_file_path = Some(path_str);
        Ok(())
    }
}
