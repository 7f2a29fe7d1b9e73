// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for image categorization
//!
//! This module provides:
//! - Person presence detection (Haar face cascade, then HOG body detector)
//! - Object detection via YOLOv8
//! - Scene classification via ResNet-50
//!
//! The two ONNX models run on any configured device; presence detection is
//! plain image processing on the CPU.

pub mod device;
pub mod image_utils;
pub mod model_manager;
pub mod presence;
pub mod scene;
pub mod session;
pub mod yolo;

pub use device::{Device, ParseDeviceError};
pub use image_utils::{decode_image_bytes, detect_format, load_image_file, ImageError, ImageInfo};
pub use model_manager::{VisionModelInfo, VisionModelManager};
pub use presence::{CascadePresenceDetector, PresenceDetector};
pub use scene::{ResNetClassifier, SceneClassifier};
pub use yolo::{ObjectDetector, YoloDetector};
