// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ResNet-50 ImageNet scene classifier

use std::path::Path;

use anyhow::Result;
use image::DynamicImage;
use ndarray::ArrayD;
use tracing::{debug, info};

use super::preprocessing::preprocess_for_classification;
use super::SceneClassifier;
use crate::error::ModelInferenceError;
use crate::vision::device::Device;
use crate::vision::session::DeviceSessions;
use crate::vision::yolo::model::load_labels;

/// A label with its softmax probability
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probability: f32,
}

/// ResNet-50 classifier with one session per configured device
#[derive(Debug)]
pub struct ResNetClassifier {
    sessions: DeviceSessions,
    labels: Vec<String>,
}

impl ResNetClassifier {
    /// Load the classifier and its ImageNet label table (one label per line)
    pub fn load(
        model_path: &Path,
        labels_path: &Path,
        devices: &[Device],
        intra_threads: usize,
    ) -> Result<Self> {
        info!("Loading ResNet classifier from {}", model_path.display());

        let labels = load_labels(labels_path)?;
        let sessions = DeviceSessions::load(model_path, devices, intra_threads)?;

        info!(
            "✅ ResNet classifier loaded ({} labels, devices: {:?})",
            labels.len(),
            sessions.devices()
        );

        Ok(Self { sessions, labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn devices(&self) -> Vec<Device> {
        self.sessions.devices()
    }

    /// The `top_k` most probable labels, highest first
    pub fn classify(
        &self,
        image: &DynamicImage,
        device: Device,
        top_k: usize,
    ) -> Result<Vec<Prediction>, ModelInferenceError> {
        let input = preprocess_for_classification(image);
        let output = self.sessions.run(device, input)?;
        let probabilities = softmax(&flatten_logits(&output)?);

        let predictions = top_k_indices(&probabilities, top_k)
            .into_iter()
            .map(|index| {
                let label = self
                    .labels
                    .get(index)
                    .ok_or(ModelInferenceError::LabelOutOfRange {
                        index,
                        len: self.labels.len(),
                    })?;
                Ok(Prediction {
                    label: label.clone(),
                    probability: probabilities[index],
                })
            })
            .collect::<Result<Vec<_>, ModelInferenceError>>()?;

        debug!("ResNet top-{}: {:?}", top_k, predictions);
        Ok(predictions)
    }
}

impl SceneClassifier for ResNetClassifier {
    fn classify_scene(
        &self,
        image: &DynamicImage,
        device: Device,
        top_k: usize,
    ) -> Result<Vec<String>, ModelInferenceError> {
        Ok(self
            .classify(image, device, top_k)?
            .into_iter()
            .map(|p| p.label)
            .collect())
    }
}

/// Logits of the single batch item as a flat vector
fn flatten_logits(output: &ArrayD<f32>) -> Result<Vec<f32>, ModelInferenceError> {
    let shape = output.shape();
    let batch_ok = match shape.len() {
        1 => true,
        2 => shape[0] == 1,
        _ => false,
    };
    if !batch_ok || output.is_empty() {
        return Err(ModelInferenceError::InvalidOutput {
            expected: "[1, classes]".to_string(),
            got: format!("{:?}", shape),
        });
    }
    Ok(output.iter().copied().collect())
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Indices of the `k` largest values, descending; ties keep the lower index first
pub fn top_k_indices(values: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    indices.sort_by(|&a, &b| values[b].total_cmp(&values[a]).then(a.cmp(&b)));
    indices.truncate(k);
    indices
}
