// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection (YOLOv8)

pub mod model;
pub mod preprocessing;

use std::collections::HashSet;

use image::DynamicImage;

use crate::error::ModelInferenceError;
use crate::vision::device::Device;

pub use model::{Detection, YoloDetector, DEFAULT_IOU_THRESHOLD, MAX_DETECTIONS, UNKNOWN_LABEL};
pub use preprocessing::{letterbox, LetterboxInfo, YOLO_INPUT_SIZE};

/// Produces the set of object labels present in an image
pub trait ObjectDetector: Send + Sync {
    /// Labels of objects detected with confidence strictly above the threshold
    fn detect_objects(
        &self,
        image: &DynamicImage,
        device: Device,
        confidence_threshold: f32,
    ) -> Result<HashSet<String>, ModelInferenceError>;
}

/// The 80 COCO classes in YOLOv8 training order
pub const COCO_CLASSES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
