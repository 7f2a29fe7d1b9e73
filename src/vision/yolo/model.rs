// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 object detection model
//!
//! Runs an Ultralytics YOLOv8 ONNX export and decodes its raw head output
//! (`[1, 4 + classes, anchors]`, or the transposed layout) into labelled boxes.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{ArrayD, Axis, Ix3};
use tracing::{debug, info, warn};

use super::preprocessing::{preprocess_for_detection, LetterboxInfo};
use super::{ObjectDetector, COCO_CLASSES};
use crate::error::ModelInferenceError;
use crate::vision::device::Device;
use crate::vision::session::DeviceSessions;

/// IoU above which a lower-scoring box of the same class is suppressed
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

/// Default upper bound on boxes kept after suppression
pub const MAX_DETECTIONS: usize = 300;

/// Label reported for a class index beyond the label table
pub const UNKNOWN_LABEL: &str = "unknown";

/// One detected object in original image coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
}

/// A decoded box before suppression, in model input coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

/// YOLOv8 detector with one session per configured device
#[derive(Debug)]
pub struct YoloDetector {
    sessions: DeviceSessions,
    labels: Vec<String>,
    iou_threshold: f32,
    max_detections: usize,
}

/// Read one class label per line, skipping blank lines
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read label file {}", path.display()))?;
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        anyhow::bail!("Label file {} is empty", path.display());
    }
    Ok(labels)
}

impl YoloDetector {
    /// Load the detector for every device in `devices`
    ///
    /// # Arguments
    /// - `model_path`: YOLOv8 ONNX export
    /// - `labels_path`: optional class label file; the COCO-80 table is used when absent
    /// - `devices`: devices to create sessions for
    /// - `intra_threads`: ONNX Runtime intra-op threads per session
    pub fn load(
        model_path: &Path,
        labels_path: Option<&Path>,
        devices: &[Device],
        intra_threads: usize,
    ) -> Result<Self> {
        info!("Loading YOLO detector from {}", model_path.display());

        let labels = match labels_path {
            Some(path) => load_labels(path)?,
            None => COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
        };
        let sessions = DeviceSessions::load(model_path, devices, intra_threads)?;

        info!(
            "✅ YOLO detector loaded ({} classes, devices: {:?})",
            labels.len(),
            sessions.devices()
        );

        Ok(Self {
            sessions,
            labels,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: MAX_DETECTIONS,
        })
    }

    pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_detections(mut self, max_detections: usize) -> Self {
        self.max_detections = max_detections.max(1);
        self
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn devices(&self) -> Vec<Device> {
        self.sessions.devices()
    }

    /// Detect objects scoring strictly above `confidence_threshold`
    pub fn detect(
        &self,
        image: &DynamicImage,
        device: Device,
        confidence_threshold: f32,
    ) -> Result<Vec<Detection>, ModelInferenceError> {
        let (input, letterbox) = preprocess_for_detection(image);
        let output = self.sessions.run(device, input)?;

        let candidates = decode_output(&output, confidence_threshold, self.labels.len())?;
        let kept = non_max_suppression(candidates, self.iou_threshold, self.max_detections);
        debug!("YOLO: {} detections on {}", kept.len(), device);

        Ok(kept
            .into_iter()
            .map(|c| self.to_detection(c, &letterbox))
            .collect())
    }

    fn to_detection(&self, candidate: Candidate, letterbox: &LetterboxInfo) -> Detection {
        let [x1, y1, x2, y2] = candidate.bbox;
        let (x1, y1) = letterbox.map_to_original(x1, y1);
        let (x2, y2) = letterbox.map_to_original(x2, y2);

        Detection {
            class_id: candidate.class_id,
            label: class_label(&self.labels, candidate.class_id).to_string(),
            confidence: candidate.confidence,
            bbox: [x1, y1, x2, y2],
        }
    }
}

/// Label for a class index, or [`UNKNOWN_LABEL`] when the table is too short
pub fn class_label(labels: &[String], class_id: usize) -> &str {
    match labels.get(class_id) {
        Some(label) => label.as_str(),
        None => {
            warn!(
                "⚠️ Class index {} is outside the label table ({} entries), reporting '{}'",
                class_id,
                labels.len(),
                UNKNOWN_LABEL
            );
            UNKNOWN_LABEL
        }
    }
}

impl ObjectDetector for YoloDetector {
    fn detect_objects(
        &self,
        image: &DynamicImage,
        device: Device,
        confidence_threshold: f32,
    ) -> Result<HashSet<String>, ModelInferenceError> {
        Ok(self
            .detect(image, device, confidence_threshold)?
            .into_iter()
            .map(|d| d.label)
            .collect())
    }
}

/// Decode the raw head output into per-anchor best-class candidates
///
/// Accepts `[1, 4 + C, N]` and `[1, N, 4 + C]`. When neither axis matches
/// `4 + num_labels`, the shorter axis is taken as the feature axis.
pub fn decode_output(
    output: &ArrayD<f32>,
    confidence_threshold: f32,
    num_labels: usize,
) -> Result<Vec<Candidate>, ModelInferenceError> {
    let output = output
        .view()
        .into_dimensionality::<Ix3>()
        .map_err(|_| ModelInferenceError::InvalidOutput {
            expected: "[1, 4 + classes, anchors]".to_string(),
            got: format!("{:?}", output.shape()),
        })?;
    let batch = output.index_axis(Axis(0), 0);
    let (d1, d2) = batch.dim();

    let features_first = if d1 == 4 + num_labels {
        true
    } else if d2 == 4 + num_labels {
        false
    } else {
        d1 <= d2
    };
    // Rows are anchors, columns are features
    let rows = if features_first {
        batch.reversed_axes()
    } else {
        batch
    };

    if rows.ncols() < 5 {
        return Err(ModelInferenceError::InvalidOutput {
            expected: "at least one class score per anchor".to_string(),
            got: format!("{:?}", output.shape()),
        });
    }

    let mut candidates = Vec::new();
    for row in rows.rows() {
        let mut best = (0usize, f32::MIN);
        for (class_id, &score) in row.iter().skip(4).enumerate() {
            if score > best.1 {
                best = (class_id, score);
            }
        }

        if best.1 > confidence_threshold {
            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            candidates.push(Candidate {
                class_id: best.0,
                confidence: best.1,
                bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
            });
        }
    }

    Ok(candidates)
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// Greedy class-aware suppression, highest confidence first
pub fn non_max_suppression(
    mut candidates: Vec<Candidate>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}
