/// General-purpose YOLOv8 object detector on ONNX Runtime via `ort`.
///
/// Letterboxes the frame to the model's square input, runs inference, picks
/// the best class per candidate, then applies per-class NMS and maps boxes
/// back to frame pixels.
use std::path::Path;

use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::detection::{BoundingBox, Detection};
use crate::shared::frame::Frame;

use super::class_names::ClassNames;
use super::execution_provider::accelerators;

/// Input resolution when the model declares a dynamic shape.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f32 = 0.25;

const NMS_IOU_THRESH: f32 = 0.45;

/// Letterbox padding value (YOLO convention).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: ort::session::Session,
    classes: ClassNames,
    confidence: f32,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Loads a YOLOv8 ONNX export.
    ///
    /// Class names come from the `names` metadata Ultralytics embeds in the
    /// export; models without it are assumed to use the COCO classes.
    pub fn new(model_path: &Path, confidence: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(accelerators())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 4 && shape[2] > 0 => {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        let classes = session
            .metadata()
            .ok()
            .and_then(|meta| meta.custom("names").ok().flatten())
            .and_then(|raw| ClassNames::from_metadata(&raw))
            .unwrap_or_else(|| {
                log::debug!("Model carries no class names, assuming COCO");
                ClassNames::coco()
            });

        log::info!(
            "Loaded {} ({} classes, {}x{} input)",
            model_path.display(),
            classes.count(),
            input_size,
            input_size
        );

        Ok(Self {
            session,
            classes,
            confidence,
            input_size,
        })
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let (tensor, letterbox) = letterbox(frame, self.input_size);

        let input = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor
            .as_slice()
            .ok_or("YOLO output tensor is not contiguous")?;

        let candidates = decode_predictions(data, &shape, self.confidence)?;
        let kept = nms(candidates, NMS_IOU_THRESH);

        Ok(kept
            .into_iter()
            .map(|c| Detection {
                label: self.classes.label(c.class_id),
                class_id: c.class_id,
                confidence: c.confidence,
                bbox: letterbox
                    .to_frame(&c.bbox)
                    .clamped(frame.width(), frame.height()),
            })
            .collect())
    }
}

// --- Preprocessing ---

/// Placement of the source frame inside the model input.
struct Letterbox {
    scale: f32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    /// Maps a box from model input space back to source frame pixels.
    fn to_frame(&self, b: &BoundingBox) -> BoundingBox {
        let px = self.pad_x as f32;
        let py = self.pad_y as f32;
        BoundingBox::new(
            (b.x1 - px) / self.scale,
            (b.y1 - py) / self.scale,
            (b.x2 - px) / self.scale,
            (b.y2 - py) / self.scale,
        )
    }
}

/// Nearest-neighbour resize into a `size` x `size` NCHW tensor, keeping
/// aspect ratio and centring the image on gray padding.
fn letterbox(frame: &Frame, size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f32;
    let fh = frame.height() as f32;
    let scale = (size as f32 / fw).min(size as f32 / fh);
    let new_w = ((fw * scale).round() as u32).min(size);
    let new_h = ((fh * scale).round() as u32).min(size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let side = size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, side, side), PAD_VALUE);
    let src = frame.as_ndarray();
    let max_x = frame.width() as usize - 1;
    let max_y = frame.height() as usize - 1;

    for y in 0..new_h as usize {
        let sy = ((y as f32 / scale) as usize).min(max_y);
        let ty = pad_y as usize + y;
        for x in 0..new_w as usize {
            let sx = ((x as f32 / scale) as usize).min(max_x);
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[sy, sx, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

// --- Postprocessing ---

#[derive(Clone, Debug, PartialEq)]
struct Candidate {
    bbox: BoundingBox,
    class_id: usize,
    confidence: f32,
}

/// Reads YOLOv8 head output, `[1, 4 + classes, anchors]` or its transpose,
/// where each anchor is `cx, cy, w, h` followed by one score per class.
fn decode_predictions(
    data: &[f32],
    shape: &[usize],
    confidence: f32,
) -> Result<Vec<Candidate>, Box<dyn std::error::Error>> {
    let &[_, d1, d2] = shape else {
        return Err(format!("unexpected YOLO output shape {shape:?}").into());
    };
    // Anchors always outnumber features in practice.
    let transposed = d1 < d2;
    let (anchors, features) = if transposed { (d2, d1) } else { (d1, d2) };
    if features < 5 {
        return Err(format!("YOLO output has {features} features per anchor, need at least 5").into());
    }
    if data.len() < anchors * features {
        return Err("YOLO output is shorter than its shape".into());
    }

    let at = |anchor: usize, feature: usize| {
        if transposed {
            data[feature * anchors + anchor]
        } else {
            data[anchor * features + feature]
        }
    };

    let mut candidates = Vec::new();
    for a in 0..anchors {
        let (class_id, score) = (4..features)
            .map(|f| (f - 4, at(a, f)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if score < confidence {
            continue;
        }
        let (cx, cy, w, h) = (at(a, 0), at(a, 1), at(a, 2), at(a, 3));
        candidates.push(Candidate {
            bbox: BoundingBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0),
            class_id,
            confidence: score,
        });
    }
    Ok(candidates)
}

/// Greedy per-class NMS; boxes of different classes never suppress each
/// other. Output is ordered by descending confidence.
fn nms(mut candidates: Vec<Candidate>, iou_thresh: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for c in candidates {
        let overlaps = keep
            .iter()
            .any(|k| k.class_id == c.class_id && k.bbox.iou(&c.bbox) > iou_thresh);
        if !overlaps {
            keep.push(c);
        }
    }
    keep
}
