//! Station integration tests.
//!
//! Builds a full station on the simulation drivers from configuration,
//! brings it up, supervises it briefly and shuts it down.

use newton_common::camera::CameraConfig;
use newton_common::config::{LogLevel, SharedConfig, StationConfig};
use newton_common::fieldbus::{AxisConfig, OperationMode};
use newton_hal::{DriverRegistry, Station, StationError};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

fn station_config() -> StationConfig {
    let mut camera = CameraConfig::with_serial("SIM-CAM");
    camera.output_width = 64;
    camera.output_height = 48;
    camera.retrieve_timeout_ms = 500;

    let mut x = AxisConfig::new("x", 1);
    x.home_position = 250;
    x.profile_velocity = Some(1000);
    let mut spindle = AxisConfig::new("spindle", 2);
    spindle.mode = OperationMode::ProfileVelocity;

    StationConfig {
        shared: SharedConfig {
            log_level: LogLevel::Debug,
            service_name: "test-station".to_string(),
        },
        camera: Some(camera),
        axes: vec![x, spindle],
    }
}

#[test]
fn test_station_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("first.png");
    let registry = DriverRegistry::with_builtin_drivers();
    let mut station = Station::new(station_config(), &registry).unwrap();

    station.bring_up().unwrap();
    assert!(station.camera().unwrap().is_capturing());

    {
        let x = station.axis("x").unwrap();
        assert_eq!(x.drive().commanded_target(), 250);
        assert_eq!(x.drive().current_position().unwrap(), 250);
        assert!(x.drive().is_operation_complete().unwrap());
    }
    assert!(station.axis("spindle").unwrap().drive().is_safe());

    let running = station.running_flag();
    let watched = snapshot.clone();
    let stopper = thread::spawn(move || {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !watched.exists() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        running.store(false, Ordering::SeqCst);
    });

    station.run(Some(snapshot.clone()));
    stopper.join().unwrap();
    assert!(snapshot.exists());

    station.shutdown();
    assert!(!station.camera().unwrap().is_capturing());
    let word = station.axis("x").unwrap().drive().command_word().unwrap();
    assert_eq!(word.bits() & 0x0009, 0);
}

#[test]
fn test_axes_share_one_bus_per_driver() {
    let registry = DriverRegistry::with_builtin_drivers();
    let mut config = station_config();
    config.camera = None;
    let mut station = Station::new(config, &registry).unwrap();

    let bus = station.bus("simulation").unwrap();
    assert_eq!(std::sync::Arc::strong_count(&bus), 4);
    assert!(station.bus("ethercat").is_none());
    assert_eq!(station.axes().len(), 2);
}

#[test]
fn test_unknown_axis() {
    let registry = DriverRegistry::with_builtin_drivers();
    let mut config = station_config();
    config.camera = None;
    let mut station = Station::new(config, &registry).unwrap();
    assert!(matches!(
        station.axis("z"),
        Err(StationError::UnknownAxis(name)) if name == "z"
    ));
}

#[test]
fn test_unknown_drivers_rejected() {
    let registry = DriverRegistry::with_builtin_drivers();

    let mut config = station_config();
    config.camera.as_mut().unwrap().driver = "vendor_sdk".to_string();
    assert!(matches!(
        Station::new(config, &registry),
        Err(StationError::Camera(_))
    ));

    let mut config = station_config();
    config.camera = None;
    config.axes[0].driver = "ethercat".to_string();
    assert!(matches!(
        Station::new(config, &registry),
        Err(StationError::Fieldbus(_))
    ));
}

#[test]
fn test_invalid_config_rejected() {
    let registry = DriverRegistry::with_builtin_drivers();
    let mut config = station_config();
    config.axes[1].name = "x".to_string();
    assert!(matches!(
        Station::new(config, &registry),
        Err(StationError::Config(_))
    ));
}
