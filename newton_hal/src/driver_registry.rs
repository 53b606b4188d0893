//! Driver registry for camera and fieldbus backends.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving driver
//! factories. This uses constructor-injection rather than global state.

use newton_common::camera::{CameraConfig, CameraDriver, CameraError, CameraResult};
use newton_common::fieldbus::{FieldbusError, FieldbusTransport};
use std::collections::HashMap;

/// Creates a camera backend for a `[camera]` section.
pub type CameraDriverFactory = fn(&CameraConfig) -> CameraResult<Box<dyn CameraDriver>>;

/// Creates a fieldbus transport serving the given slave addresses.
pub type FieldbusFactory = fn(&[u16]) -> Result<Box<dyn FieldbusTransport>, FieldbusError>;

/// Registry of available drivers.
///
/// Constructed at startup, populated via `register_*()`, and passed to
/// `Station` by reference. No global state; testable in isolation.
pub struct DriverRegistry {
    cameras: HashMap<&'static str, CameraDriverFactory>,
    fieldbuses: HashMap<&'static str, FieldbusFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            cameras: HashMap::new(),
            fieldbuses: HashMap::new(),
        }
    }

    /// Registry holding every built-in driver.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all_drivers(&mut registry);
        registry
    }

    /// Register a camera driver factory.
    ///
    /// # Panics
    /// Panics if a camera driver with the same name is already registered.
    pub fn register_camera(&mut self, name: &'static str, factory: CameraDriverFactory) {
        if self.cameras.contains_key(name) {
            panic!("Camera driver '{name}' is already registered");
        }
        self.cameras.insert(name, factory);
    }

    /// Register a fieldbus driver factory.
    ///
    /// # Panics
    /// Panics if a fieldbus driver with the same name is already registered.
    pub fn register_fieldbus(&mut self, name: &'static str, factory: FieldbusFactory) {
        if self.fieldbuses.contains_key(name) {
            panic!("Fieldbus driver '{name}' is already registered");
        }
        self.fieldbuses.insert(name, factory);
    }

    /// Create the camera backend named `name`.
    ///
    /// # Errors
    /// Returns `CameraError::DriverNotFound` if no camera driver with the given name is registered.
    pub fn create_camera_driver(
        &self,
        name: &str,
        config: &CameraConfig,
    ) -> CameraResult<Box<dyn CameraDriver>> {
        let factory = self
            .cameras
            .get(name)
            .ok_or_else(|| CameraError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// Create a transport of the fieldbus driver named `name`.
    ///
    /// # Errors
    /// Returns `FieldbusError::DriverNotFound` if no fieldbus driver with the given name is registered.
    pub fn create_fieldbus(
        &self,
        name: &str,
        slaves: &[u16],
    ) -> Result<Box<dyn FieldbusTransport>, FieldbusError> {
        let factory = self
            .fieldbuses
            .get(name)
            .ok_or_else(|| FieldbusError::DriverNotFound(name.to_string()))?;
        factory(slaves)
    }

    /// List all registered camera driver names.
    pub fn list_camera_drivers(&self) -> Vec<&'static str> {
        self.cameras.keys().copied().collect()
    }

    /// List all registered fieldbus driver names.
    pub fn list_fieldbus_drivers(&self) -> Vec<&'static str> {
        self.fieldbuses.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newton_common::camera::{CameraHandle, DeviceInfo};
    use std::sync::Arc;

    struct TestCameraDriver;

    impl CameraDriver for TestCameraDriver {
        fn name(&self) -> &'static str {
            "test"
        }

        fn enumerate(&self) -> CameraResult<Vec<DeviceInfo>> {
            Ok(Vec::new())
        }

        fn open(&self, serial: &str) -> CameraResult<Arc<dyn CameraHandle>> {
            Err(CameraError::DeviceNotFound(serial.to_string()))
        }
    }

    fn create_test_camera(_config: &CameraConfig) -> CameraResult<Box<dyn CameraDriver>> {
        Ok(Box::new(TestCameraDriver))
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = DriverRegistry::new();
        reg.register_camera("test_driver", create_test_camera);

        let driver = reg
            .create_camera_driver("test_driver", &CameraConfig::with_serial("1"))
            .expect("should create");
        assert_eq!(driver.name(), "test");
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create_camera_driver("nonexistent", &CameraConfig::with_serial("1"));
        assert!(matches!(result, Err(CameraError::DriverNotFound(_))));
        let result = reg.create_fieldbus("nonexistent", &[1]);
        assert!(matches!(result, Err(FieldbusError::DriverNotFound(_))));
    }

    #[test]
    fn builtin_registry_has_simulation() {
        let reg = DriverRegistry::with_builtin_drivers();
        assert_eq!(reg.list_camera_drivers(), vec!["simulation"]);
        assert_eq!(reg.list_fieldbus_drivers(), vec!["simulation"]);
        assert!(reg.create_fieldbus("simulation", &[1, 2]).is_ok());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register_camera("dup", create_test_camera);
        reg.register_camera("dup", create_test_camera);
    }
}
