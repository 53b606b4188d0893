//! Station: the camera and motor axes of one machine.
//!
//! The `Station` builds its devices from a `StationConfig` through the
//! driver registry, brings them up, supervises them until the running flag
//! is cleared, and tears them down again.

use crate::camera::{CaptureStats, FrameAcquisitionController};
use crate::driver_registry::DriverRegistry;
use crate::drive::DriveController;
use newton_common::camera::CameraError;
use newton_common::config::{ConfigError, StationConfig};
use newton_common::fieldbus::{
    AxisConfig, DriveError, FieldbusError, FieldbusTransport, OperationMode,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Interval between supervision reports.
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Sleep between running-flag checks of the supervision loop.
const SUPERVISION_TICK: Duration = Duration::from_millis(50);

/// Transport shared by every axis on one fieldbus.
pub type SharedBus = Arc<Mutex<Box<dyn FieldbusTransport>>>;

/// Errors raised while building or operating a station.
#[derive(Debug, Error)]
pub enum StationError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Camera failure
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// Fieldbus could not be created
    #[error("Fieldbus error: {0}")]
    Fieldbus(#[from] FieldbusError),

    /// Axis command failed
    #[error("Axis '{axis}': {source}")]
    Drive {
        /// Axis name
        axis: String,
        /// Underlying failure
        #[source]
        source: DriveError,
    },

    /// No axis with the given name
    #[error("Unknown axis: {0}")]
    UnknownAxis(String),
}

/// One motor axis of the station.
pub struct Axis {
    config: AxisConfig,
    drive: DriveController<SharedBus>,
}

impl Axis {
    /// Axis name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Configuration the axis was built from.
    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    /// Drive controller of the axis.
    pub fn drive(&mut self) -> &mut DriveController<SharedBus> {
        &mut self.drive
    }

    fn bring_up(&mut self) -> Result<(), DriveError> {
        match self.config.mode {
            OperationMode::ProfileVelocity => {
                self.drive.reset_fault();
                self.drive.set_mode(OperationMode::ProfileVelocity)?;
                self.drive.start_and_enable()?;
                self.drive.set_target_velocity(0)?;
                self.drive.start_velocity_mode()?;
            }
            _ => {
                self.drive.enable_position_mode()?;
                if let Some(velocity) = self.config.profile_velocity {
                    self.drive.set_profile_velocity(velocity)?;
                }
                if self.config.home_position != 0 {
                    self.drive.move_to(self.config.home_position)?;
                }
            }
        }
        Ok(())
    }
}

/// A camera plus any number of motor axes, built from configuration.
pub struct Station {
    config: StationConfig,
    camera: Option<FrameAcquisitionController>,
    axes: Vec<Axis>,
    buses: BTreeMap<String, SharedBus>,
    running: Arc<AtomicBool>,
}

impl Station {
    /// Build every configured device.
    ///
    /// Axes on the same fieldbus driver share one transport.
    ///
    /// # Errors
    /// Returns the first configuration, driver lookup or device open error.
    pub fn new(config: StationConfig, registry: &DriverRegistry) -> Result<Self, StationError> {
        config.validate()?;

        let camera = match &config.camera {
            Some(camera_config) => {
                let driver = registry.create_camera_driver(&camera_config.driver, camera_config)?;
                Some(FrameAcquisitionController::open(driver.as_ref(), camera_config)?)
            }
            None => None,
        };

        let mut slaves_by_driver: BTreeMap<&str, Vec<u16>> = BTreeMap::new();
        for axis in &config.axes {
            slaves_by_driver
                .entry(axis.driver.as_str())
                .or_default()
                .push(axis.slave);
        }

        let mut buses = BTreeMap::new();
        for (driver, slaves) in slaves_by_driver {
            let transport = registry.create_fieldbus(driver, &slaves)?;
            info!("Fieldbus '{}' created for slaves {:?}", driver, slaves);
            buses.insert(driver.to_string(), Arc::new(Mutex::new(transport)));
        }

        let mut axes = Vec::with_capacity(config.axes.len());
        for axis_config in &config.axes {
            let Some(bus) = buses.get(&axis_config.driver) else {
                return Err(FieldbusError::DriverNotFound(axis_config.driver.clone()).into());
            };
            axes.push(Axis {
                drive: DriveController::from_config(Arc::clone(bus), axis_config),
                config: axis_config.clone(),
            });
        }

        info!(
            "Station '{}' created: camera={}, {} axes",
            config.shared.service_name,
            camera.is_some(),
            axes.len()
        );

        Ok(Self {
            config,
            camera,
            axes,
            buses,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Flag that keeps `run()` going; clear it to request shutdown.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Configuration the station was built from.
    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Camera controller, if configured.
    pub fn camera(&self) -> Option<&FrameAcquisitionController> {
        self.camera.as_ref()
    }

    /// All axes in configuration order.
    pub fn axes(&mut self) -> &mut [Axis] {
        &mut self.axes
    }

    /// Axis by name.
    pub fn axis(&mut self, name: &str) -> Result<&mut Axis, StationError> {
        self.axes
            .iter_mut()
            .find(|a| a.config.name == name)
            .ok_or_else(|| StationError::UnknownAxis(name.to_string()))
    }

    /// Shared transport of the named fieldbus driver.
    pub fn bus(&self, driver: &str) -> Option<SharedBus> {
        self.buses.get(driver).cloned()
    }

    /// Enable every axis in its configured mode and start the camera.
    ///
    /// # Errors
    /// Stops at the first axis that fails to come up.
    pub fn bring_up(&mut self) -> Result<(), StationError> {
        for axis in &mut self.axes {
            info!("Bringing up axis '{}' (slave {})", axis.name(), axis.drive.slave());
            axis.bring_up().map_err(|source| StationError::Drive {
                axis: axis.config.name.clone(),
                source,
            })?;
        }
        if let Some(camera) = &self.camera {
            camera.start_capture()?;
        }
        Ok(())
    }

    /// Supervise the station until the running flag is cleared.
    ///
    /// If `snapshot` is set, the first frame after start is saved there.
    pub fn run(&mut self, snapshot: Option<PathBuf>) {
        let mut snapshot = snapshot;
        let mut last_report = Instant::now();
        let mut last_stats = CaptureStats::default();

        info!("Station running");
        while self.running.load(Ordering::SeqCst) {
            if let Some(camera) = &self.camera {
                if camera.frame_sequence() > 0 {
                    if let Some(path) = snapshot.take() {
                        camera.request_snapshot(path);
                    }
                }
            }

            if last_report.elapsed() >= STATUS_INTERVAL {
                last_stats = self.report(last_stats);
                last_report = Instant::now();
            }

            thread::sleep(SUPERVISION_TICK);
        }
        info!("Station run loop exited");
    }

    fn report(&mut self, previous: CaptureStats) -> CaptureStats {
        let stats = self
            .camera
            .as_ref()
            .map(FrameAcquisitionController::capture_stats)
            .unwrap_or_default();
        if self.camera.is_some() {
            info!(
                "Camera: {} frames (+{}), {} timeouts, {} failures, {} snapshots",
                stats.frames_published,
                stats.frames_published - previous.frames_published,
                stats.timeouts,
                stats.failures,
                stats.snapshots_written
            );
            if stats.failures > previous.failures {
                warn!(
                    "Camera: {} new failures since last report",
                    stats.failures - previous.failures
                );
            }
        }

        for axis in &mut self.axes {
            match axis.drive.current_position() {
                Ok(position) => debug!(
                    "Axis '{}': position {} (target {})",
                    axis.config.name,
                    position,
                    axis.drive.commanded_target()
                ),
                Err(e) => warn!("Axis '{}': position read failed: {}", axis.config.name, e),
            }
        }
        stats
    }

    /// Halt and shut down every axis, then stop the camera.
    ///
    /// Failures are logged; every device is visited.
    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        for axis in &mut self.axes {
            if let Err(e) = axis.drive.halt_and_shutdown() {
                error!("Axis '{}' shutdown failed: {}", axis.config.name, e);
            }
        }
        if let Some(camera) = &self.camera {
            camera.stop_capture();
        }
        info!("Station '{}' shut down", self.config.shared.service_name);
    }
}
