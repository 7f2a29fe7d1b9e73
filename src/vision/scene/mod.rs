// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Whole-image scene classification (ResNet-50, ImageNet labels)

pub mod model;
pub mod preprocessing;

use image::DynamicImage;

use crate::error::ModelInferenceError;
use crate::vision::device::Device;

pub use model::{Prediction, ResNetClassifier};

/// Ranks whole-image labels
pub trait SceneClassifier: Send + Sync {
    /// The `top_k` most probable labels, most probable first
    fn classify_scene(
        &self,
        image: &DynamicImage,
        device: Device,
        top_k: usize,
    ) -> Result<Vec<String>, ModelInferenceError>;
}
