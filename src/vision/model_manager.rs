// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision model manager for loading the presence, detection and scene models
//!
//! Everything is loaded once, eagerly, before the pipeline reports ready.
//! The presence resources and both ONNX models load concurrently on blocking
//! threads. Any failure fails startup; when several fail, the first in
//! presence, detector, classifier order is reported.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::error::ConfigurationError;
use crate::vision::device::Device;
use crate::vision::presence::CascadePresenceDetector;
use crate::vision::scene::ResNetClassifier;
use crate::vision::yolo::YoloDetector;

/// Information about a loaded vision model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisionModelInfo {
    /// Model name
    pub name: String,
    /// Model type (presence, detection, classification)
    pub model_type: String,
    /// Resource the model was loaded from
    pub path: PathBuf,
    /// Devices with a ready session (empty for CPU-only image-processing models)
    pub devices: Vec<Device>,
}

/// Loaded vision models shared by all requests
pub struct VisionModelManager {
    presence: Arc<CascadePresenceDetector>,
    detector: Arc<YoloDetector>,
    classifier: Arc<ResNetClassifier>,
    models: Vec<VisionModelInfo>,
}

impl std::fmt::Debug for VisionModelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionModelManager")
            .field("models", &self.models)
            .finish_non_exhaustive()
    }
}

fn model_load_error(path: &Path, message: impl ToString) -> ConfigurationError {
    ConfigurationError::ModelLoad {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

impl VisionModelManager {
    /// Load every model for every configured device
    pub async fn new(config: &PipelineConfig) -> Result<Self, ConfigurationError> {
        let devices = config.devices.clone();
        info!("Loading vision models for devices {:?}", devices);

        let presence_config = config.presence.clone();
        let presence_task = async move {
            let face = presence_config.face_cascade.clone();
            tokio::task::spawn_blocking(move || {
                CascadePresenceDetector::load(
                    &presence_config.face_cascade,
                    &presence_config.body_detector,
                )
                .map(|p| {
                    p.with_face_params(presence_config.face_params())
                        .with_body_params(presence_config.body_params())
                })
            })
            .await
            .map_err(|e| model_load_error(&face, e))
            .and_then(|loaded| loaded)
        };

        let detector_config = config.detector.clone();
        let detector_devices = devices.clone();
        let intra_threads = config.intra_threads;
        let detector_task = async move {
            let model = detector_config.model.clone();
            tokio::task::spawn_blocking(move || {
                YoloDetector::load(
                    &detector_config.model,
                    detector_config.labels.as_deref(),
                    &detector_devices,
                    intra_threads,
                )
                .map(|d| {
                    d.with_iou_threshold(detector_config.iou_threshold)
                        .with_max_detections(detector_config.max_detections)
                })
            })
            .await
            .map_err(|e| model_load_error(&model, e))
            .and_then(|loaded| loaded.map_err(|e| model_load_error(&model, format!("{:#}", e))))
        };

        let classifier_config = config.classifier.clone();
        let classifier_devices = devices;
        let classifier_task = async move {
            let model = classifier_config.model.clone();
            tokio::task::spawn_blocking(move || {
                ResNetClassifier::load(
                    &classifier_config.model,
                    &classifier_config.labels,
                    &classifier_devices,
                    intra_threads,
                )
            })
            .await
            .map_err(|e| model_load_error(&model, e))
            .and_then(|loaded| loaded.map_err(|e| model_load_error(&model, format!("{:#}", e))))
        };

        let (presence, detector, classifier) =
            futures::future::join3(presence_task, detector_task, classifier_task).await;
        let (presence, detector, classifier) = (presence?, detector?, classifier?);

        let models = vec![
            VisionModelInfo {
                name: "haar-frontalface".to_string(),
                model_type: "presence".to_string(),
                path: config.presence.face_cascade.clone(),
                devices: Vec::new(),
            },
            VisionModelInfo {
                name: "hog-people".to_string(),
                model_type: "presence".to_string(),
                path: config.presence.body_detector.clone(),
                devices: Vec::new(),
            },
            VisionModelInfo {
                name: "yolov8".to_string(),
                model_type: "detection".to_string(),
                path: config.detector.model.clone(),
                devices: detector.devices(),
            },
            VisionModelInfo {
                name: "resnet50".to_string(),
                model_type: "classification".to_string(),
                path: config.classifier.model.clone(),
                devices: classifier.devices(),
            },
        ];

        info!("✅ Vision models ready ({} models)", models.len());

        Ok(Self {
            presence: Arc::new(presence),
            detector: Arc::new(detector),
            classifier: Arc::new(classifier),
            models,
        })
    }

    pub fn presence_detector(&self) -> Arc<CascadePresenceDetector> {
        self.presence.clone()
    }

    pub fn object_detector(&self) -> Arc<YoloDetector> {
        self.detector.clone()
    }

    pub fn scene_classifier(&self) -> Arc<ResNetClassifier> {
        self.classifier.clone()
    }

    /// List all loaded vision models
    pub fn list_models(&self) -> Vec<VisionModelInfo> {
        self.models.clone()
    }
}
