use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("cannot open video source {source_name}: {reason}")]
    DeviceUnavailable { source_name: String, reason: String },
    #[error("failed to grab frame: {0}")]
    FrameAcquisition(String),
    #[error("video source ended")]
    EndOfStream,
}

/// A live source of frames, usually a camera.
///
/// `read` blocks until the next frame is available. Any error ends the
/// monitoring session; implementations do not retry.
pub trait FrameSource: Send {
    fn read(&mut self) -> Result<Frame, CaptureError>;

    /// Releases the device. Safe to call more than once.
    fn release(&mut self);
}
