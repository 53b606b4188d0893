//! Frame acquisition controller and capture thread.
//!
//! The controller owns a `SharedFrameBuffer` and at most one background
//! capture thread. The thread retrieves native frames from the camera,
//! services the pending snapshot request, rescales to the output size and
//! publishes into the buffer. Readers copy out of the buffer at any time.
//!
//! Two locks are involved. The buffer lock is never held across a device
//! call, a disk write or a rescale. The worker slot (stop flag + join handle)
//! is held while streaming starts and while a stopping thread is joined, so
//! a start racing a stop waits for the old thread to exit.

use crate::camera::frame_buffer::{
    CaptureRequest, FrameSnapshot, PublishOutcome, SharedFrameBuffer,
};
use crate::camera::rescale::FrameRescaler;
use newton_common::camera::{
    CameraConfig, CameraDriver, CameraError, CameraHandle, CameraResult, Frame, FrameSize,
    ParameterRange, ResizeFilter, StreamSettings,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Rescale attempts per frame while the output size keeps changing.
const PUBLISH_ATTEMPTS: usize = 3;

/// Counters maintained by the capture thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames rescaled and published into the buffer
    pub frames_published: u64,
    /// Retrieval attempts that ended without a frame
    pub timeouts: u64,
    /// Retrieval or publish failures
    pub failures: u64,
    /// Snapshot images written
    pub snapshots_written: u64,
}

#[derive(Debug, Default)]
struct CaptureCounters {
    frames_published: AtomicU64,
    timeouts: AtomicU64,
    failures: AtomicU64,
    snapshots_written: AtomicU64,
}

impl CaptureCounters {
    fn load(&self) -> CaptureStats {
        CaptureStats {
            frames_published: self.frames_published.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            snapshots_written: self.snapshots_written.load(Ordering::Relaxed),
        }
    }
}

/// Running capture thread.
struct CaptureWorker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Keeps a thread-safely readable frame buffer at the requested output size,
/// fed by a background capture thread.
pub struct FrameAcquisitionController {
    camera: Arc<dyn CameraHandle>,
    buffer: Arc<SharedFrameBuffer>,
    rescaler: FrameRescaler,
    retrieve_timeout: Duration,
    counters: Arc<CaptureCounters>,
    worker: Mutex<Option<CaptureWorker>>,
}

impl FrameAcquisitionController {
    /// Discover, open and configure the camera named in `config`.
    ///
    /// # Errors
    /// - `CameraError::DeviceNotFound` if no enumerated device has the serial
    /// - any error from opening or configuring the device
    pub fn open(driver: &dyn CameraDriver, config: &CameraConfig) -> CameraResult<Self> {
        let devices = driver.enumerate()?;
        for device in &devices {
            info!("Camera found: {} ({})", device.serial, device.model);
        }
        if !devices.iter().any(|d| d.serial == config.serial) {
            error!("Camera {} not present on driver '{}'", config.serial, driver.name());
            return Err(CameraError::DeviceNotFound(config.serial.clone()));
        }

        let camera = driver.open(&config.serial)?;
        camera.configure(&StreamSettings::default())?;

        if let Some(exposure) = config.exposure_us {
            camera.set_exposure(exposure)?;
        }
        if let Some(auto_gain) = config.auto_gain {
            camera.set_auto_gain(auto_gain)?;
        }

        let output = config.output_size()?;
        info!(
            "Camera {} opened, output {} ({:?}), retrieve timeout {:?}",
            config.serial,
            output,
            config.resize_filter,
            config.retrieve_timeout()
        );

        Ok(Self::new(camera, output, config.retrieve_timeout())
            .with_resize_filter(config.resize_filter))
    }

    /// Bind an already opened camera.
    pub fn new(camera: Arc<dyn CameraHandle>, output: FrameSize, retrieve_timeout: Duration) -> Self {
        Self {
            camera,
            buffer: Arc::new(SharedFrameBuffer::new(output)),
            rescaler: FrameRescaler::default(),
            retrieve_timeout,
            counters: Arc::new(CaptureCounters::default()),
            worker: Mutex::new(None),
        }
    }

    /// Use `filter` when rescaling.
    pub fn with_resize_filter(mut self, filter: ResizeFilter) -> Self {
        self.rescaler = FrameRescaler::new(filter);
        self
    }

    /// Serial number of the bound camera.
    pub fn serial(&self) -> &str {
        self.camera.serial()
    }

    /// Change the output size.
    ///
    /// Safe while capturing; the capture thread uses the new size from its
    /// next publish on.
    ///
    /// # Errors
    /// `CameraError::InvalidSize` if either dimension is zero.
    pub fn configure_output_size(&self, width: u32, height: u32) -> CameraResult<()> {
        let size = FrameSize::new(width, height)?;
        self.buffer.resize(size);
        info!("Output size set to {}", size);
        Ok(())
    }

    /// Current output size; destination buffers must be `byte_len()` long.
    pub fn output_size(&self) -> FrameSize {
        self.buffer.size()
    }

    /// Start the capture thread.
    ///
    /// Streaming is started on the calling thread so device errors surface
    /// here.
    ///
    /// # Errors
    /// - `CameraError::AlreadyRunning` if a capture thread is active
    /// - any error from starting the stream
    pub fn start_capture(&self) -> CameraResult<()> {
        let mut slot = self.worker.lock();
        if let Some(worker) = slot.as_ref() {
            if !worker.handle.is_finished() {
                return Err(CameraError::AlreadyRunning);
            }
        }
        // Reap a thread that exited on its own.
        if let Some(finished) = slot.take() {
            join_worker(finished);
        }

        self.camera.start_streaming()?;

        let stop = Arc::new(AtomicBool::new(false));
        let task = CaptureTask {
            camera: Arc::clone(&self.camera),
            buffer: Arc::clone(&self.buffer),
            rescaler: self.rescaler,
            retrieve_timeout: self.retrieve_timeout,
            counters: Arc::clone(&self.counters),
            stop: Arc::clone(&stop),
        };

        let spawned = thread::Builder::new()
            .name(format!("capture-{}", self.camera.serial()))
            .spawn(move || task.run());

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                if let Err(stop_err) = self.camera.stop_streaming() {
                    warn!("Failed to stop streaming after spawn failure: {}", stop_err);
                }
                return Err(CameraError::Communication(format!(
                    "failed to spawn capture thread: {e}"
                )));
            }
        };

        *slot = Some(CaptureWorker { stop, handle });
        info!("Capture started on camera {}", self.camera.serial());
        Ok(())
    }

    /// Stop the capture thread and wait for it to exit.
    ///
    /// No-op when not capturing. Blocks for up to one retrieve timeout.
    /// Must not be called from the capture thread.
    pub fn stop_capture(&self) {
        let mut slot = self.worker.lock();
        let Some(worker) = slot.take() else {
            return;
        };
        info!("Stopping capture on camera {}", self.camera.serial());
        worker.stop.store(true, Ordering::Release);
        // Slot stays locked until the thread has stopped streaming.
        join_worker(worker);
    }

    /// Whether a capture thread is running.
    pub fn is_capturing(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.handle.is_finished())
    }

    /// Copy the latest frame into `dest`.
    ///
    /// Returns the output size and the sequence number of the copied frame
    /// (0 until the first frame is published).
    ///
    /// # Errors
    /// `CameraError::BufferSizeMismatch` if `dest` is not exactly
    /// `output_size().byte_len()` bytes.
    pub fn copy_current_frame(&self, dest: &mut [u8]) -> CameraResult<(FrameSize, u64)> {
        self.buffer.copy_into(dest)
    }

    /// Owned copy of the latest frame.
    pub fn current_frame(&self) -> FrameSnapshot {
        self.buffer.snapshot()
    }

    /// Number of frames published so far.
    pub fn frame_sequence(&self) -> u64 {
        self.buffer.sequence()
    }

    /// Save the next retrieved frame, at native resolution, to `path`.
    ///
    /// Replaces any request that has not been serviced yet.
    pub fn request_snapshot(&self, path: impl Into<PathBuf>) {
        let request = CaptureRequest { path: path.into() };
        debug!("Snapshot requested: {:?}", request.path);
        if let Some(replaced) = self.buffer.set_request(request) {
            debug!("Pending snapshot {:?} replaced", replaced.path);
        }
    }

    /// Whether a snapshot request is waiting for the next frame.
    pub fn snapshot_pending(&self) -> bool {
        self.buffer.has_pending_request()
    }

    /// Counters of the capture thread (cumulative across restarts).
    pub fn capture_stats(&self) -> CaptureStats {
        self.counters.load()
    }

    /// Accepted exposure range in microseconds.
    pub fn exposure_bounds(&self) -> CameraResult<ParameterRange> {
        self.camera.exposure_range()
    }

    /// Set the exposure time in microseconds.
    ///
    /// # Errors
    /// `CameraError::Parameter` if the value is outside `exposure_bounds()`.
    pub fn set_exposure(&self, exposure_us: f64) -> CameraResult<()> {
        let range = self.camera.exposure_range()?;
        if !range.contains(exposure_us) {
            return Err(CameraError::Parameter(format!(
                "exposure {exposure_us}us outside [{}, {}]",
                range.min, range.max
            )));
        }
        self.camera.set_exposure(exposure_us)
    }

    /// Accepted gain range.
    pub fn gain_bounds(&self) -> CameraResult<ParameterRange> {
        self.camera.gain_range()
    }

    /// Enable or disable automatic gain.
    pub fn set_auto_gain(&self, enabled: bool) -> CameraResult<()> {
        self.camera.set_auto_gain(enabled)
    }

    /// Set the target brightness of the automatic functions.
    pub fn set_brightness(&self, target: f64) -> CameraResult<()> {
        self.camera.set_brightness(target)
    }
}

impl Drop for FrameAcquisitionController {
    fn drop(&mut self) {
        self.stop_capture();
    }
}

fn join_worker(worker: CaptureWorker) {
    if let Err(e) = worker.handle.join() {
        warn!("Capture thread panicked: {:?}", e);
    }
}

/// State moved into the capture thread.
struct CaptureTask {
    camera: Arc<dyn CameraHandle>,
    buffer: Arc<SharedFrameBuffer>,
    rescaler: FrameRescaler,
    retrieve_timeout: Duration,
    counters: Arc<CaptureCounters>,
    stop: Arc<AtomicBool>,
}

impl CaptureTask {
    fn run(self) {
        debug!("Capture thread started");
        let mut consecutive_failures: u64 = 0;

        while !self.stop.load(Ordering::Acquire) {
            match self.camera.retrieve_frame(self.retrieve_timeout) {
                Ok(frame) => {
                    consecutive_failures = 0;
                    if let Err(e) = self.handle_frame(&frame) {
                        self.counters.failures.fetch_add(1, Ordering::Relaxed);
                        warn!("Dropped frame: {}", e);
                    }
                }
                Err(CameraError::Timeout) => {
                    self.counters.timeouts.fetch_add(1, Ordering::Relaxed);
                    trace!("No frame within {:?}", self.retrieve_timeout);
                }
                Err(e) => {
                    consecutive_failures += 1;
                    self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    if consecutive_failures <= 10 || consecutive_failures % 1000 == 0 {
                        warn!("Frame retrieval failed (#{}): {}", consecutive_failures, e);
                    }
                }
            }
        }

        if let Err(e) = self.camera.stop_streaming() {
            warn!("Failed to stop streaming: {}", e);
        }
        info!(
            "Capture thread exiting after {} frames",
            self.counters.frames_published.load(Ordering::Relaxed)
        );
    }

    fn handle_frame(&self, frame: &Frame) -> CameraResult<()> {
        frame.validate()?;

        if let Some(request) = self.buffer.take_request() {
            match self.camera.write_image(&request.path, frame) {
                Ok(()) => {
                    self.counters.snapshots_written.fetch_add(1, Ordering::Relaxed);
                    info!("Snapshot {} saved to {:?}", frame.size, request.path);
                }
                Err(e) => error!("Snapshot to {:?} failed: {}", request.path, e),
            }
        }

        let mut target = self.buffer.size();
        for _ in 0..PUBLISH_ATTEMPTS {
            let scaled = self.rescaler.rescale(frame, target)?;
            match self.buffer.publish(target, &scaled)? {
                PublishOutcome::Published(_) => {
                    self.counters.frames_published.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                PublishOutcome::SizeChanged(current) => {
                    debug!("Output size changed to {} during rescale, redoing", current);
                    target = current;
                }
            }
        }
        debug!("Frame dropped, output size kept changing");
        Ok(())
    }
}
