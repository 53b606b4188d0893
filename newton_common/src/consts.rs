//! System-wide constants for the Newton workspace.
//!
//! Single source of truth for timing constants, frame layout and default
//! paths. Imported by all crates; do not duplicate these values.

use std::time::Duration;

/// Canonical station service name (used for logging).
pub const STATION_SERVICE_NAME: &str = "station";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/newton/station.toml";

// ─── Camera ─────────────────────────────────────────────────────────

/// Interleaved colour channels per pixel (RGB8 packed).
pub const FRAME_CHANNELS: usize = 3;

/// Default frame retrieval timeout in milliseconds.
pub const DEFAULT_RETRIEVE_TIMEOUT_MS: u64 = 8000;

/// Default output width in pixels.
pub const DEFAULT_OUTPUT_WIDTH: u32 = 640;

/// Default output height in pixels.
pub const DEFAULT_OUTPUT_HEIGHT: u32 = 480;

// ─── Drive ──────────────────────────────────────────────────────────

/// Pause between the shutdown and switch-on commands of the enable sequence.
pub const ENABLE_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Pause between halt and shutdown in the halt-and-shutdown sequence.
pub const HALT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Pause before the fault reset issued after a failed target read.
pub const FAULT_RECOVERY_DELAY: Duration = Duration::from_secs(1);

/// Number of per-check timeouts a safety confirmation may consume.
pub const SAFETY_CHECK_RETRIES: u32 = 3;

/// Default per-check state poll timeout in microseconds.
pub const DEFAULT_STATE_CHECK_TIMEOUT_US: u64 = 2000;

/// Default position arrival tolerance (encoder counts).
pub const DEFAULT_POSITION_TOLERANCE: i32 = 25;

/// Bit of the digital-input word holding general purpose input 0.
pub const DIGITAL_INPUT_BIT_OFFSET: u32 = 16;
