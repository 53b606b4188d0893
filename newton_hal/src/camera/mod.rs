//! Camera frame acquisition.

mod acquisition;
mod frame_buffer;
mod rescale;

pub use acquisition::{CaptureStats, FrameAcquisitionController};
pub use frame_buffer::{CaptureRequest, FrameSnapshot, PublishOutcome, SharedFrameBuffer};
pub use rescale::FrameRescaler;
