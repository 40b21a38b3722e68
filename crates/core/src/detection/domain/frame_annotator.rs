use crate::shared::annotation::{AnnotatedFrame, LabelTag};
use crate::shared::detection::{BoundingBox, Detection};
use crate::shared::frame::Frame;

/// Advance and height of one Hershey simplex glyph at font scale 1.0.
const GLYPH_WIDTH: f32 = 20.0;
const GLYPH_HEIGHT: f32 = 22.0;
/// Gap between the tag edge and the text baseline.
const TAG_PADDING: u32 = 3;

/// Ultralytics default box colours, indexed by `class_id % len`.
const PALETTE: &[[u8; 3]] = &[
    [0xFF, 0x38, 0x38],
    [0xFF, 0x9D, 0x97],
    [0xFF, 0x70, 0x1F],
    [0xFF, 0xB2, 0x1D],
    [0xCF, 0xD2, 0x31],
    [0x48, 0xF9, 0x0A],
    [0x92, 0xCC, 0x17],
    [0x3D, 0xDB, 0x86],
    [0x1A, 0x93, 0x34],
    [0x00, 0xD4, 0xBB],
    [0x2C, 0x99, 0xA8],
    [0x00, 0xC2, 0xFF],
    [0x34, 0x45, 0x93],
    [0x64, 0x73, 0xFF],
    [0x00, 0x18, 0xEC],
    [0x84, 0x38, 0xFF],
    [0x52, 0x00, 0x85],
    [0xCB, 0x38, 0xFF],
    [0xFF, 0x95, 0xC8],
    [0xFF, 0x37, 0xC7],
];

/// Draws detection boxes and `"{label} {confidence}"` tags onto a copy of a
/// frame for display.
///
/// Line width scales with frame size so boxes stay visible on large
/// captures; `line_width` overrides the automatic choice. Font size follows
/// the line width. Tags sit above their box, or just inside its top edge
/// when the box touches the top of the frame.
#[derive(Clone, Debug, Default)]
pub struct FrameAnnotator {
    line_width: Option<u32>,
}

impl FrameAnnotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_width(line_width: u32) -> Self {
        Self {
            line_width: Some(line_width.max(1)),
        }
    }

    pub fn color_for(class_id: usize) -> [u8; 3] {
        PALETTE[class_id % PALETTE.len()]
    }

    /// Returns a new frame with every detection outlined and tagged;
    /// `frame` is untouched.
    pub fn annotate(&self, frame: &Frame, detections: &[Detection]) -> AnnotatedFrame {
        let mut annotated = AnnotatedFrame {
            frame: frame.clone(),
            tags: Vec::with_capacity(detections.len()),
        };
        if frame.width() == 0 || frame.height() == 0 {
            return annotated;
        }
        let lw = self.line_width_for(frame);
        for det in detections {
            let bbox = det.bbox.clamped(frame.width(), frame.height());
            let color = Self::color_for(det.class_id);
            draw_box(&mut annotated.frame, &bbox, lw, color);
            let tag = draw_tag(&mut annotated.frame, &bbox, &tag_text(det), lw, color);
            annotated.tags.push(tag);
        }
        annotated
    }

    fn line_width_for(&self, frame: &Frame) -> u32 {
        self.line_width.unwrap_or_else(|| {
            let mean_side = (frame.width() + frame.height()) as f32 / 2.0;
            ((mean_side * 0.003).round() as u32).max(2)
        })
    }
}

fn tag_text(det: &Detection) -> String {
    format!("{} {:.2}", det.label, det.confidence)
}

/// Fills the tag background for `text` and returns where the text goes.
fn draw_tag(
    frame: &mut Frame,
    bbox: &BoundingBox,
    text: &str,
    line_width: u32,
    color: [u8; 3],
) -> LabelTag {
    let font_scale = line_width as f32 / 3.0;
    let thickness = line_width.saturating_sub(1).max(1);
    let text_w = (text.chars().count() as f32 * GLYPH_WIDTH * font_scale).ceil() as u32;
    let text_h = (GLYPH_HEIGHT * font_scale).ceil() as u32;

    let x1 = bbox.x1 as u32;
    let y1 = bbox.y1 as u32;
    let x2 = x1.saturating_add(text_w).min(frame.width().saturating_sub(1));
    let outside = y1 >= text_h + TAG_PADDING;
    let (top, bottom, baseline) = if outside {
        (y1 - text_h - TAG_PADDING, y1, y1.saturating_sub(2))
    } else {
        let bottom = (y1 + text_h + TAG_PADDING).min(frame.height().saturating_sub(1));
        (y1, bottom, (y1 + text_h + 2).min(bottom))
    };

    for y in top..=bottom {
        for x in x1..=x2 {
            frame.put_pixel(x, y, color);
        }
    }

    LabelTag {
        text: text.to_string(),
        origin: (x1, baseline),
        font_scale,
        thickness,
    }
}

fn draw_box(frame: &mut Frame, bbox: &BoundingBox, line_width: u32, color: [u8; 3]) {
    let x1 = bbox.x1 as u32;
    let y1 = bbox.y1 as u32;
    let x2 = bbox.x2 as u32;
    let y2 = bbox.y2 as u32;
    if x2 < x1 || y2 < y1 {
        return;
    }

    for t in 0..line_width {
        // top and bottom edges
        for x in x1..=x2 {
            frame.put_pixel(x, y1.saturating_add(t).min(y2), color);
            frame.put_pixel(x, y2.saturating_sub(t).max(y1), color);
        }
        // left and right edges
        for y in y1..=y2 {
            frame.put_pixel(x1.saturating_add(t).min(x2), y, color);
            frame.put_pixel(x2.saturating_sub(t).max(x1), y, color);
        }
    }
}
