
/// Axis-aligned box in frame pixel coordinates, `(x1, y1)` top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    /// Clamps the box into a `width` x `height` frame.
    pub fn clamped(&self, width: u32, height: u32) -> BoundingBox {
        let max_x = width.saturating_sub(1) as f32;
        let max_y = height.saturating_sub(1) as f32;
        BoundingBox {
            x1: self.x1.clamp(0.0, max_x),
            y1: self.y1.clamp(0.0, max_y),
            x2: self.x2.clamp(0.0, max_x),
            y2: self.y2.clamp(0.0, max_y),
        }
    }
}

/// One labeled object instance found in a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Every label in detection order, duplicates kept.
    pub fn labels(detections: &[Detection]) -> Vec<String> {
        detections.iter().map(|d| d.label.clone()).collect()
    }
}
