use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for object detection.
///
/// Treated as a function frame -> detections; `&mut self` because
/// inference sessions need exclusive access while running.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
