/// File name the default detection model is cached under.
pub const DEFAULT_MODEL_NAME: &str = "yolov8n.onnx";

pub const DEFAULT_TARGET_LABELS: &[&str] = &["knife", "gun", "pistol", "rifle", "weapon"];

pub const DEFAULT_ALARM_SOUND: &str = "enemy.mp3";

pub const DEFAULT_CAMERA_INDEX: usize = 0;

pub const WINDOW_TITLE: &str = "Weapon Detection Alarm";

/// How often a blocked alarm task checks whether playback has drained (10 Hz).
pub const PLAYBACK_POLL_MS: u64 = 100;

/// The 80 COCO class names in model output order.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];
