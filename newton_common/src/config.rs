//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load TOML configuration files
//! across the Newton workspace, and the station configuration itself.
//!
//! # Usage
//!
//! ```rust,no_run
//! use newton_common::config::{ConfigError, StationConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = StationConfig::load_validated(Path::new("station.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::camera::CameraConfig;
use crate::fieldbus::AxisConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Common configuration fields shared across Newton applications.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "newton-station-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// Station configuration loaded from `station.toml`.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "newton-station"
///
/// [camera]
/// serial = "40012345"
///
/// [[axes]]
/// name = "gantry_x"
/// slave = 1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StationConfig {
    /// Common fields.
    pub shared: SharedConfig,

    /// Camera, if the station has one.
    #[serde(default)]
    pub camera: Option<CameraConfig>,

    /// Motor axes.
    #[serde(default)]
    pub axes: Vec<AxisConfig>,
}

impl StationConfig {
    /// Load and validate a station configuration.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the station configuration.
    ///
    /// # Validation Rules
    /// 1. Shared, camera and every axis section valid on their own
    /// 2. Axis names unique
    /// 3. No two axes on the same driver share a slave address
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if let Some(camera) = &self.camera {
            camera.validate()?;
        }

        let mut names = HashSet::new();
        let mut slaves = HashSet::new();
        for axis in &self.axes {
            axis.validate()?;
            if !names.insert(axis.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate axis name: {}",
                    axis.name
                )));
            }
            if !slaves.insert((axis.driver.as_str(), axis.slave)) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate slave address {} on driver {}",
                    axis.slave, axis.driver
                )));
            }
        }

        Ok(())
    }
}
