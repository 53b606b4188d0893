//! Axis configuration (`[[axes]]` entries of `station.toml`).

use crate::config::ConfigError;
use crate::consts::{DEFAULT_POSITION_TOLERANCE, DEFAULT_STATE_CHECK_TIMEOUT_US};
use crate::fieldbus::types::OperationMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_driver() -> String {
    "simulation".to_string()
}

fn default_position_tolerance() -> i32 {
    DEFAULT_POSITION_TOLERANCE
}

fn default_state_check_timeout_us() -> u64 {
    DEFAULT_STATE_CHECK_TIMEOUT_US
}

fn default_mode() -> OperationMode {
    OperationMode::ProfilePosition
}

/// Per-axis configuration.
///
/// # TOML Example
///
/// ```toml
/// [[axes]]
/// name = "gantry_x"
/// slave = 1
/// position_tolerance = 25
/// profile_velocity = 2000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    /// Axis name (unique within the station)
    pub name: String,

    /// Fieldbus driver name (registry key)
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Bus position of the drive
    pub slave: u16,

    /// Arrival window half-width in encoder counts
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: i32,

    /// Per-check timeout of the safe-operational poll
    #[serde(default = "default_state_check_timeout_us")]
    pub state_check_timeout_us: u64,

    /// Mode selected when the axis is brought up
    #[serde(default = "default_mode")]
    pub mode: OperationMode,

    /// Profile velocity written at bring-up (drive default if omitted)
    #[serde(default)]
    pub profile_velocity: Option<u32>,

    /// Position commanded at bring-up
    #[serde(default)]
    pub home_position: i32,
}

impl AxisConfig {
    /// Config for a slave with every optional field at its default.
    pub fn new(name: impl Into<String>, slave: u16) -> Self {
        Self {
            name: name.into(),
            driver: default_driver(),
            slave,
            position_tolerance: DEFAULT_POSITION_TOLERANCE,
            state_check_timeout_us: DEFAULT_STATE_CHECK_TIMEOUT_US,
            mode: default_mode(),
            profile_velocity: None,
            home_position: 0,
        }
    }

    /// Validate the axis configuration.
    ///
    /// # Validation Rules
    /// 1. `name` not empty
    /// 2. `position_tolerance` > 0
    /// 3. `state_check_timeout_us` > 0
    /// 4. `mode` is a position or velocity profile mode
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "axis name cannot be empty".to_string(),
            ));
        }
        if self.position_tolerance <= 0 {
            return Err(ConfigError::ValidationError(format!(
                "axis {}: position_tolerance must be positive, got {}",
                self.name, self.position_tolerance
            )));
        }
        if self.state_check_timeout_us == 0 {
            return Err(ConfigError::ValidationError(format!(
                "axis {}: state_check_timeout_us must be greater than 0",
                self.name
            )));
        }
        if !matches!(
            self.mode,
            OperationMode::ProfilePosition | OperationMode::ProfileVelocity
        ) {
            return Err(ConfigError::ValidationError(format!(
                "axis {}: unsupported bring-up mode {:?}",
                self.name, self.mode
            )));
        }
        Ok(())
    }

    /// Per-check timeout of the safe-operational poll.
    pub fn state_check_timeout(&self) -> Duration {
        Duration::from_micros(self.state_check_timeout_us)
    }
}
