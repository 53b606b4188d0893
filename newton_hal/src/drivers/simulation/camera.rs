//! Simulated camera.
//!
//! Produces a gradient test pattern at a fixed native size and frame
//! interval. The blue channel carries the frame counter so consecutive frames
//! differ. Snapshots are encoded with the `image` crate, format chosen by the
//! file extension.

use image::{Rgb, RgbImage};
use newton_common::camera::{
    CameraDriver, CameraError, CameraHandle, CameraResult, DeviceInfo, Frame, FrameSize,
    ParameterRange, StreamSettings,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Default native resolution of simulated devices.
pub const SIM_NATIVE_WIDTH: u32 = 1280;
/// Default native resolution of simulated devices.
pub const SIM_NATIVE_HEIGHT: u32 = 960;
/// Default time between simulated frames.
pub const SIM_FRAME_INTERVAL: Duration = Duration::from_millis(20);

const EXPOSURE_RANGE: ParameterRange = ParameterRange {
    min: 20.0,
    max: 1_000_000.0,
};
const GAIN_RANGE: ParameterRange = ParameterRange { min: 0.0, max: 24.0 };

/// Record of a snapshot written by a simulated camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRecord {
    /// Destination path
    pub path: PathBuf,
    /// Size of the written frame
    pub size: FrameSize,
}

#[derive(Debug, Default)]
struct DeviceState {
    configured: Option<StreamSettings>,
    streaming: bool,
    stalled: bool,
    fail_frames: u32,
    fail_writes: bool,
    frames_delivered: u64,
    stream_starts: u32,
    stream_stops: u32,
    exposure_us: f64,
    auto_gain: bool,
    brightness: f64,
    snapshots: Vec<SnapshotRecord>,
}

/// A simulated camera device.
pub struct SimulatedCamera {
    serial: String,
    native: FrameSize,
    frame_interval: Duration,
    state: Mutex<DeviceState>,
}

impl SimulatedCamera {
    /// Device with the given serial, native size and frame interval.
    pub fn new(serial: impl Into<String>, native: FrameSize, frame_interval: Duration) -> Self {
        Self {
            serial: serial.into(),
            native,
            frame_interval,
            state: Mutex::new(DeviceState {
                exposure_us: 10_000.0,
                brightness: 0.5,
                ..DeviceState::default()
            }),
        }
    }

    /// Native frame size.
    pub fn native_size(&self) -> FrameSize {
        self.native
    }

    /// When stalled, every retrieval waits its full timeout and times out.
    pub fn set_stalled(&self, stalled: bool) {
        self.state.lock().stalled = stalled;
    }

    /// Make the next `count` retrievals fail with a communication error.
    pub fn fail_next_frames(&self, count: u32) {
        self.state.lock().fail_frames = count;
    }

    /// Make snapshot writes fail.
    pub fn set_write_failure(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Whether the device is streaming.
    pub fn is_streaming(&self) -> bool {
        self.state.lock().streaming
    }

    /// Frames handed out so far.
    pub fn frames_delivered(&self) -> u64 {
        self.state.lock().frames_delivered
    }

    /// Number of `start_streaming` / `stop_streaming` calls.
    pub fn stream_transitions(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.stream_starts, state.stream_stops)
    }

    /// Settings applied by the last `configure`.
    pub fn stream_settings(&self) -> Option<StreamSettings> {
        self.state.lock().configured
    }

    /// Snapshots written so far.
    pub fn snapshots(&self) -> Vec<SnapshotRecord> {
        self.state.lock().snapshots.clone()
    }

    /// Current exposure, auto gain and brightness settings.
    pub fn parameters(&self) -> (f64, bool, f64) {
        let state = self.state.lock();
        (state.exposure_us, state.auto_gain, state.brightness)
    }

    fn render(&self, counter: u64) -> Vec<u8> {
        let FrameSize { width, height } = self.native;
        let blue = (counter % 256) as u8;
        let x_span = (width - 1).max(1);
        let y_span = (height - 1).max(1);
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 255 / x_span) as u8, (y * 255 / y_span) as u8, blue])
        })
        .into_raw()
    }
}

impl CameraHandle for SimulatedCamera {
    fn serial(&self) -> &str {
        &self.serial
    }

    fn configure(&self, settings: &StreamSettings) -> CameraResult<()> {
        debug!("Sim camera {}: configure {:?}", self.serial, settings);
        self.state.lock().configured = Some(*settings);
        Ok(())
    }

    fn start_streaming(&self) -> CameraResult<()> {
        let mut state = self.state.lock();
        if state.streaming {
            return Err(CameraError::Communication("already streaming".to_string()));
        }
        state.streaming = true;
        state.stream_starts += 1;
        Ok(())
    }

    fn stop_streaming(&self) -> CameraResult<()> {
        let mut state = self.state.lock();
        state.streaming = false;
        state.stream_stops += 1;
        Ok(())
    }

    fn retrieve_frame(&self, timeout: Duration) -> CameraResult<Frame> {
        let stalled = {
            let mut state = self.state.lock();
            if !state.streaming {
                return Err(CameraError::Communication("not streaming".to_string()));
            }
            if state.fail_frames > 0 {
                state.fail_frames -= 1;
                return Err(CameraError::Communication("frame transfer failed".to_string()));
            }
            state.stalled
        };

        if stalled || self.frame_interval > timeout {
            thread::sleep(timeout);
            return Err(CameraError::Timeout);
        }
        thread::sleep(self.frame_interval);

        let counter = {
            let mut state = self.state.lock();
            state.frames_delivered += 1;
            state.frames_delivered
        };
        Frame::new(self.native, self.render(counter))
    }

    fn write_image(&self, path: &Path, frame: &Frame) -> CameraResult<()> {
        if self.state.lock().fail_writes {
            return Err(CameraError::ImageWrite {
                path: path.to_path_buf(),
                reason: "simulated write failure".to_string(),
            });
        }

        let image = RgbImage::from_raw(frame.size.width, frame.size.height, frame.pixels.clone())
            .ok_or(CameraError::BufferSizeMismatch {
                expected: frame.size.byte_len(),
                actual: frame.pixels.len(),
            })?;
        image.save(path).map_err(|e| CameraError::ImageWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        self.state.lock().snapshots.push(SnapshotRecord {
            path: path.to_path_buf(),
            size: frame.size,
        });
        Ok(())
    }

    fn exposure_range(&self) -> CameraResult<ParameterRange> {
        Ok(EXPOSURE_RANGE)
    }

    fn set_exposure(&self, exposure_us: f64) -> CameraResult<()> {
        if !EXPOSURE_RANGE.contains(exposure_us) {
            return Err(CameraError::Parameter(format!(
                "exposure {exposure_us}us out of range"
            )));
        }
        self.state.lock().exposure_us = exposure_us;
        Ok(())
    }

    fn gain_range(&self) -> CameraResult<ParameterRange> {
        Ok(GAIN_RANGE)
    }

    fn set_auto_gain(&self, enabled: bool) -> CameraResult<()> {
        self.state.lock().auto_gain = enabled;
        Ok(())
    }

    fn set_brightness(&self, target: f64) -> CameraResult<()> {
        if !(0.0..=1.0).contains(&target) {
            return Err(CameraError::Parameter(format!(
                "brightness {target} outside [0, 1]"
            )));
        }
        self.state.lock().brightness = target;
        Ok(())
    }
}

/// Simulated camera backend with a fixed set of devices.
pub struct SimulatedCameraDriver {
    devices: Vec<DeviceInfo>,
    native: FrameSize,
    frame_interval: Duration,
    opened: Mutex<HashMap<String, Arc<SimulatedCamera>>>,
}

impl SimulatedCameraDriver {
    /// Backend without devices, producing frames of `native` size.
    pub fn new(native: FrameSize, frame_interval: Duration) -> Self {
        Self {
            devices: Vec::new(),
            native,
            frame_interval,
            opened: Mutex::new(HashMap::new()),
        }
    }

    /// Add a device that `enumerate` reports.
    pub fn with_device(mut self, serial: impl Into<String>) -> Self {
        self.devices.push(DeviceInfo {
            serial: serial.into(),
            model: "Newton SimCam".to_string(),
        });
        self
    }

    /// Handle of an opened device, for inspection.
    pub fn opened(&self, serial: &str) -> Option<Arc<SimulatedCamera>> {
        self.opened.lock().get(serial).cloned()
    }
}

impl CameraDriver for SimulatedCameraDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn enumerate(&self) -> CameraResult<Vec<DeviceInfo>> {
        Ok(self.devices.clone())
    }

    fn open(&self, serial: &str) -> CameraResult<Arc<dyn CameraHandle>> {
        if !self.devices.iter().any(|d| d.serial == serial) {
            return Err(CameraError::DeviceNotFound(serial.to_string()));
        }
        let camera = Arc::clone(
            self.opened
                .lock()
                .entry(serial.to_string())
                .or_insert_with(|| {
                    Arc::new(SimulatedCamera::new(serial, self.native, self.frame_interval))
                }),
        );
        info!("Sim camera {} opened ({})", serial, self.native);
        Ok(camera)
    }
}
