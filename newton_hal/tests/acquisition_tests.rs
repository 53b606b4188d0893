//! Frame acquisition integration tests.
//!
//! Runs the acquisition controller against the simulated camera: output
//! size negotiation before and during capture, capture task lifecycle,
//! snapshot requests and parameter pass-through.

use newton_common::camera::{
    CameraConfig, CameraDriver, CameraError, CameraHandle, FrameSize, ResizeFilter,
    StreamSettings,
};
use newton_hal::camera::FrameAcquisitionController;
use newton_hal::drivers::simulation::{SimulatedCamera, SimulatedCameraDriver};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const NATIVE_W: u32 = 64;
const NATIVE_H: u32 = 48;
const WAIT: Duration = Duration::from_secs(5);

fn sim_camera() -> Arc<SimulatedCamera> {
    Arc::new(SimulatedCamera::new(
        "SIM-0001",
        FrameSize::new(NATIVE_W, NATIVE_H).unwrap(),
        Duration::from_millis(2),
    ))
}

fn controller(camera: &Arc<SimulatedCamera>, width: u32, height: u32) -> FrameAcquisitionController {
    let handle: Arc<dyn CameraHandle> = camera.clone();
    FrameAcquisitionController::new(
        handle,
        FrameSize::new(width, height).unwrap(),
        Duration::from_millis(100),
    )
}

/// Poll `cond` until it holds or `timeout` elapses.
fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn test_copy_has_size_configured_before_capture() {
    let camera = sim_camera();
    let ctrl = controller(&camera, 8, 8);
    ctrl.configure_output_size(32, 24).unwrap();
    ctrl.start_capture().unwrap();

    assert!(wait_until(WAIT, || ctrl.frame_sequence() > 0));

    let mut dest = vec![0u8; 32 * 24 * 3];
    let (size, sequence) = ctrl.copy_current_frame(&mut dest).unwrap();
    assert_eq!(size, FrameSize::new(32, 24).unwrap());
    assert!(sequence > 0);
    assert!(dest.iter().any(|&b| b != 0));
    ctrl.stop_capture();
}

#[test]
fn test_copy_has_size_configured_during_capture() {
    let camera = sim_camera();
    let ctrl = controller(&camera, 32, 24);
    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > 0));

    ctrl.configure_output_size(16, 8).unwrap();
    assert_eq!(ctrl.output_size().byte_len(), 16 * 8 * 3);
    let after_resize = ctrl.frame_sequence();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > after_resize + 1));

    let frame = ctrl.current_frame();
    assert_eq!(frame.size, FrameSize::new(16, 8).unwrap());
    assert_eq!(frame.pixels.len(), 16 * 8 * 3);
    assert!(frame.pixels.iter().any(|&b| b != 0));

    // A buffer sized for the old dimensions is rejected.
    let mut stale = vec![0u8; 32 * 24 * 3];
    assert!(matches!(
        ctrl.copy_current_frame(&mut stale),
        Err(CameraError::BufferSizeMismatch { .. })
    ));
    ctrl.stop_capture();
}

#[test]
fn test_copy_before_first_frame_is_zeroed() {
    let camera = sim_camera();
    let ctrl = controller(&camera, 4, 2);
    let mut dest = vec![0xAA; 4 * 2 * 3];
    let (_, sequence) = ctrl.copy_current_frame(&mut dest).unwrap();
    assert_eq!(sequence, 0);
    assert!(dest.iter().all(|&b| b == 0));
}

#[test]
fn test_zero_output_size_rejected() {
    let camera = sim_camera();
    let ctrl = controller(&camera, 4, 4);
    assert!(matches!(
        ctrl.configure_output_size(0, 10),
        Err(CameraError::InvalidSize {
            width: 0,
            height: 10
        })
    ));
    assert_eq!(ctrl.output_size(), FrameSize::new(4, 4).unwrap());
}

#[test]
fn test_second_start_fails_and_spawns_nothing() {
    let camera = sim_camera();
    let ctrl = controller(&camera, 8, 8);
    ctrl.start_capture().unwrap();
    assert!(matches!(ctrl.start_capture(), Err(CameraError::AlreadyRunning)));
    assert_eq!(camera.stream_transitions(), (1, 0));
    assert!(ctrl.is_capturing());
    ctrl.stop_capture();
}

#[test]
fn test_start_during_stop_waits_for_old_thread() {
    let camera = sim_camera();
    let ctrl = controller(&camera, 8, 8);
    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > 0));

    // Every retrieval now blocks for the full 100 ms timeout.
    camera.set_stalled(true);
    thread::sleep(Duration::from_millis(10));

    thread::scope(|s| {
        let stopper = s.spawn(|| ctrl.stop_capture());
        thread::sleep(Duration::from_millis(20));
        ctrl.start_capture().unwrap();
        stopper.join().unwrap();
    });

    assert_eq!(camera.stream_transitions(), (2, 1));
    assert!(camera.is_streaming());
    assert!(ctrl.is_capturing());

    camera.set_stalled(false);
    let before = ctrl.frame_sequence();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > before));
    ctrl.stop_capture();
    assert_eq!(camera.stream_transitions(), (2, 2));
}

#[test]
fn test_stop_is_idempotent_and_restart_works() {
    let camera = sim_camera();
    let ctrl = controller(&camera, 8, 8);

    // Idle stop does nothing.
    ctrl.stop_capture();
    assert_eq!(camera.stream_transitions(), (0, 0));

    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > 0));
    ctrl.stop_capture();
    assert!(!ctrl.is_capturing());
    assert!(!camera.is_streaming());
    assert_eq!(camera.stream_transitions(), (1, 1));

    ctrl.stop_capture();
    assert_eq!(camera.stream_transitions(), (1, 1));

    let before = ctrl.frame_sequence();
    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > before));
    ctrl.stop_capture();
    assert_eq!(camera.stream_transitions(), (2, 2));
}

#[test]
fn test_drop_stops_capture() {
    let camera = sim_camera();
    {
        let ctrl = controller(&camera, 8, 8);
        ctrl.start_capture().unwrap();
        assert!(wait_until(WAIT, || camera.frames_delivered() > 0));
    }
    assert!(!camera.is_streaming());
    assert_eq!(camera.stream_transitions(), (1, 1));
}

#[test]
fn test_snapshot_written_once_at_native_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snap.png");
    let camera = sim_camera();
    let ctrl = controller(&camera, 16, 12);

    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > 0));
    ctrl.request_snapshot(&path);
    assert!(wait_until(WAIT, || ctrl.capture_stats().snapshots_written == 1));
    assert!(!ctrl.snapshot_pending());

    // Later frames do not write again.
    let seq = ctrl.frame_sequence();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > seq + 3));
    ctrl.stop_capture();

    let snapshots = camera.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].path, path);
    assert_eq!(snapshots[0].size, FrameSize::new(NATIVE_W, NATIVE_H).unwrap());

    let decoded = image::open(&path).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (NATIVE_W, NATIVE_H));
}

#[test]
fn test_newer_request_replaces_pending_one() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.png");
    let second = dir.path().join("second.bmp");
    let camera = sim_camera();
    let ctrl = controller(&camera, 8, 8);

    ctrl.request_snapshot(&first);
    ctrl.request_snapshot(&second);
    assert!(ctrl.snapshot_pending());

    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || !ctrl.snapshot_pending()));
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > 2));
    ctrl.stop_capture();

    let snapshots = camera.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].path, second);
    assert!(!first.exists());
    assert!(second.exists());
}

#[test]
fn test_failed_snapshot_write_consumes_request_and_capture_continues() {
    let dir = tempfile::tempdir().unwrap();
    let camera = sim_camera();
    camera.set_write_failure(true);
    let ctrl = controller(&camera, 8, 8);

    ctrl.request_snapshot(dir.path().join("lost.png"));
    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || !ctrl.snapshot_pending()));

    let seq = ctrl.frame_sequence();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > seq + 2));
    assert!(ctrl.is_capturing());
    assert_eq!(ctrl.capture_stats().snapshots_written, 0);
    ctrl.stop_capture();
    assert!(camera.snapshots().is_empty());
}

#[test]
fn test_timeouts_are_not_failures() {
    let camera = sim_camera();
    camera.set_stalled(true);
    let handle: Arc<dyn CameraHandle> = camera.clone();
    let ctrl = FrameAcquisitionController::new(
        handle,
        FrameSize::new(8, 8).unwrap(),
        Duration::from_millis(10),
    );

    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || ctrl.capture_stats().timeouts >= 3));
    assert!(ctrl.is_capturing());
    assert_eq!(ctrl.frame_sequence(), 0);
    assert_eq!(ctrl.capture_stats().failures, 0);

    // Shutdown latency is bounded by one retrieval timeout.
    let started = Instant::now();
    ctrl.stop_capture();
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn test_retrieval_failures_are_counted_and_retried() {
    let camera = sim_camera();
    camera.fail_next_frames(3);
    let ctrl = controller(&camera, 8, 8);
    ctrl.start_capture().unwrap();
    assert!(wait_until(WAIT, || ctrl.frame_sequence() > 0));
    let stats = ctrl.capture_stats();
    assert_eq!(stats.failures, 3);
    assert!(stats.frames_published >= 1);
    ctrl.stop_capture();
}

#[test]
fn test_controllers_do_not_share_buffers() {
    let cam_a = sim_camera();
    let cam_b = sim_camera();
    let a = controller(&cam_a, 8, 8);
    let b = controller(&cam_b, 4, 4);

    a.start_capture().unwrap();
    assert!(wait_until(WAIT, || a.frame_sequence() > 0));
    a.stop_capture();

    assert_eq!(b.frame_sequence(), 0);
    assert_eq!(b.output_size(), FrameSize::new(4, 4).unwrap());
    assert!(b.current_frame().pixels.iter().all(|&p| p == 0));
}

#[test]
fn test_exposure_and_gain_pass_through_while_capturing() {
    let camera = sim_camera();
    let ctrl = controller(&camera, 8, 8);
    ctrl.start_capture().unwrap();

    let exposure = ctrl.exposure_bounds().unwrap();
    assert!(exposure.min < exposure.max);
    assert!(matches!(
        ctrl.set_exposure(exposure.max * 2.0),
        Err(CameraError::Parameter(_))
    ));
    ctrl.set_exposure(2500.0).unwrap();
    ctrl.set_auto_gain(true).unwrap();
    ctrl.set_brightness(0.3).unwrap();
    assert!(ctrl.gain_bounds().unwrap().contains(12.0));
    assert_eq!(camera.parameters(), (2500.0, true, 0.3));

    ctrl.stop_capture();
}

#[test]
fn test_open_applies_stream_settings_and_initial_parameters() {
    let driver = SimulatedCameraDriver::new(
        FrameSize::new(NATIVE_W, NATIVE_H).unwrap(),
        Duration::from_millis(2),
    )
    .with_device("A100")
    .with_device("B200");

    let mut config = CameraConfig::with_serial("B200");
    config.output_width = 20;
    config.output_height = 10;
    config.exposure_us = Some(1500.0);
    config.auto_gain = Some(true);
    config.resize_filter = ResizeFilter::Nearest;

    let ctrl = FrameAcquisitionController::open(&driver, &config).unwrap();
    assert_eq!(ctrl.serial(), "B200");
    assert_eq!(ctrl.output_size(), FrameSize::new(20, 10).unwrap());

    let device = driver.opened("B200").unwrap();
    assert_eq!(device.stream_settings(), Some(StreamSettings::default()));
    assert_eq!(device.parameters().0, 1500.0);
    assert!(device.parameters().1);
    assert!(driver.opened("A100").is_none());
}

#[test]
fn test_open_missing_serial_is_fatal() {
    let driver = SimulatedCameraDriver::new(FrameSize::new(8, 8).unwrap(), Duration::ZERO)
        .with_device("A100");
    let result = FrameAcquisitionController::open(&driver, &CameraConfig::with_serial("Z999"));
    assert!(matches!(result, Err(CameraError::DeviceNotFound(serial)) if serial == "Z999"));
    assert_eq!(driver.enumerate().unwrap().len(), 1);
}
