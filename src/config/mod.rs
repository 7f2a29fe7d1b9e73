// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pipeline configuration
//!
//! Loaded from a TOML file, then overridden from `CATEGORIZER_*` environment
//! variables. Every key has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigurationError;
use crate::vision::device::Device;
use crate::vision::presence::{BodyScanParams, FaceScanParams};

/// Object detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model: PathBuf,
    /// Class label file; the bundled COCO-80 names are used when unset
    pub labels: Option<PathBuf>,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("./models/yolov8n.onnx"),
            labels: None,
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
        }
    }
}

/// Scene classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model: PathBuf,
    pub labels: PathBuf,
    pub top_k: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("./models/resnet50.onnx"),
            labels: PathBuf::from("./models/imagenet_classes.txt"),
            top_k: 5,
        }
    }
}

/// Face and body presence detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub face_cascade: PathBuf,
    pub body_detector: PathBuf,
    pub scale_factor: f64,
    pub min_neighbors: usize,
    pub min_face_size: u32,
    pub win_stride: u32,
    pub padding: u32,
    pub pyramid_scale: f64,
    pub group_threshold: usize,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            face_cascade: PathBuf::from("./models/haarcascade_frontalface_default.xml"),
            body_detector: PathBuf::from("./models/hog_people_detector.xml"),
            scale_factor: 1.1,
            min_neighbors: 5,
            min_face_size: 40,
            win_stride: 4,
            padding: 8,
            pyramid_scale: 1.05,
            group_threshold: 2,
        }
    }
}

impl PresenceConfig {
    pub fn face_params(&self) -> FaceScanParams {
        FaceScanParams {
            scale_factor: self.scale_factor,
            min_neighbors: self.min_neighbors,
            min_size: self.min_face_size,
        }
    }

    pub fn body_params(&self) -> BodyScanParams {
        BodyScanParams {
            win_stride: self.win_stride,
            padding: self.padding,
            scale: self.pyramid_scale,
            group_threshold: self.group_threshold,
            ..BodyScanParams::default()
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub category_map: PathBuf,
    pub lexicon: PathBuf,
    /// Devices to load sessions for at startup
    pub devices: Vec<Device>,
    /// ONNX Runtime intra-op threads per session
    pub intra_threads: usize,
    pub detector: DetectorConfig,
    pub classifier: ClassifierConfig,
    pub presence: PresenceConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            category_map: PathBuf::from("categories.json"),
            lexicon: PathBuf::from("./models/wordnet/dict"),
            devices: vec![Device::Cpu],
            intra_threads: 4,
            detector: DetectorConfig::default(),
            classifier: ClassifierConfig::default(),
            presence: PresenceConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::from_io(path, e))?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigurationError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        config.validate(path)?;
        debug!("Loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Override paths and devices from `CATEGORIZER_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("CATEGORIZER_CATEGORY_MAP") {
            self.category_map = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CATEGORIZER_LEXICON") {
            self.lexicon = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CATEGORIZER_DETECTOR_MODEL") {
            self.detector.model = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CATEGORIZER_CLASSIFIER_MODEL") {
            self.classifier.model = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("CATEGORIZER_DEVICES") {
            match parse_device_list(&val) {
                Ok(devices) if !devices.is_empty() => self.devices = devices,
                Ok(_) => warn!("⚠️ CATEGORIZER_DEVICES is empty, keeping {:?}", self.devices),
                Err(e) => warn!("⚠️ Ignoring CATEGORIZER_DEVICES: {}", e),
            }
        }
    }

    /// Check values that deserialize but cannot run
    pub fn validate(&self, origin: &Path) -> Result<(), ConfigurationError> {
        let invalid = |reason: &str| {
            Err(ConfigurationError::Invalid {
                path: origin.to_path_buf(),
                reason: reason.to_string(),
            })
        };

        if self.devices.is_empty() {
            return invalid("at least one device must be configured");
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return invalid("detector.confidence_threshold must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.detector.iou_threshold) {
            return invalid("detector.iou_threshold must be within [0, 1]");
        }
        if self.classifier.top_k == 0 {
            return invalid("classifier.top_k must be at least 1");
        }
        if self.presence.scale_factor <= 1.0 || self.presence.pyramid_scale <= 1.0 {
            return invalid("presence scale factors must be greater than 1");
        }
        if self.presence.win_stride == 0 || 8 % self.presence.win_stride != 0 {
            return invalid("presence.win_stride must divide the 8 pixel block stride");
        }
        Ok(())
    }
}

/// Parse a comma-separated device list such as `cpu,cuda:0`
pub fn parse_device_list(value: &str) -> Result<Vec<Device>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Device>().map_err(|e| e.to_string()))
        .collect()
}
