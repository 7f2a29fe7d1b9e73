// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! The ready-to-serve categorization pipeline
//!
//! A `Pipeline` only exists once every resource has loaded. It is `Send +
//! Sync`; share it behind an `Arc` and call [`Pipeline::analyze`] from any
//! number of blocking workers.

use std::sync::Arc;

use tracing::{debug, info};

use super::policy::{CategorizationPolicy, PolicySettings};
use super::result::{AnalysisRequest, AnalysisResult};
use crate::config::PipelineConfig;
use crate::error::{CategorizeError, ConfigurationError};
use crate::lexicon::CategoryIndex;
use crate::vision::device::Device;
use crate::vision::model_manager::{VisionModelInfo, VisionModelManager};
use crate::vision::presence::PresenceDetector;
use crate::vision::scene::SceneClassifier;
use crate::vision::yolo::ObjectDetector;

#[derive(Debug)]
pub struct Pipeline {
    policy: CategorizationPolicy,
    devices: Vec<Device>,
    models: Vec<VisionModelInfo>,
}

impl Pipeline {
    /// Load the lexicon, category map and every model, then report ready
    pub async fn start(config: &PipelineConfig) -> Result<Self, ConfigurationError> {
        info!("Starting categorization pipeline");

        let lexicon = config.lexicon.clone();
        let category_map = config.category_map.clone();
        let index = tokio::task::spawn_blocking(move || CategoryIndex::load(&lexicon, &category_map))
            .await
            .map_err(|e| ConfigurationError::Invalid {
                path: config.lexicon.clone(),
                reason: format!("lexicon loader panicked: {}", e),
            })??;

        let manager = VisionModelManager::new(config).await?;

        let presence: Arc<dyn PresenceDetector> = manager.presence_detector();
        let detector: Arc<dyn ObjectDetector> = manager.object_detector();
        let classifier: Arc<dyn SceneClassifier> = manager.scene_classifier();

        let mut pipeline = Self::from_parts(
            presence,
            detector,
            classifier,
            Arc::new(index),
            PolicySettings {
                confidence_threshold: config.detector.confidence_threshold,
                top_k: config.classifier.top_k,
            },
        );
        pipeline.devices = config.devices.clone();
        pipeline.models = manager.list_models();

        info!(
            "✅ Pipeline ready ({} categories, devices {:?})",
            pipeline.index().category_map().len(),
            pipeline.devices
        );
        Ok(pipeline)
    }

    /// Assemble a pipeline from already-loaded parts
    pub fn from_parts(
        presence: Arc<dyn PresenceDetector>,
        detector: Arc<dyn ObjectDetector>,
        classifier: Arc<dyn SceneClassifier>,
        index: Arc<CategoryIndex>,
        settings: PolicySettings,
    ) -> Self {
        Self {
            policy: CategorizationPolicy::new(presence, detector, classifier, index, settings),
            devices: Vec::new(),
            models: Vec::new(),
        }
    }

    /// Decode the image and run the policy; blocks until done
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, CategorizeError> {
        debug!(
            "Analyzing {} on {}",
            request.source.describe(),
            request.device
        );
        let image = request.source.decode()?;
        Ok(self.policy.run(&image, request.device)?)
    }

    pub fn index(&self) -> &CategoryIndex {
        self.policy.index()
    }

    pub fn settings(&self) -> PolicySettings {
        self.policy.settings()
    }

    /// Devices sessions were prepared for (empty for pipelines built from parts)
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn list_models(&self) -> &[VisionModelInfo] {
        &self.models
    }
}
