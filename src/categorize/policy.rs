// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Categorization policy
//!
//! ```text
//! PresenceCheck ──yes──▶ ObjectDetection ──labels──▶ Done
//!       │                      │ nothing found
//!       no                     ▼
//!       └────────────────▶ SceneFallback ──────────▶ Done
//! ```
//!
//! Object detection keeps every detected label. The scene fallback keeps
//! only its top-ranked label as detailed (when detection found nothing) but
//! folds all top-k labels into general categories.

use std::collections::BTreeSet;
use std::sync::Arc;

use image::DynamicImage;
use tracing::debug;

use super::result::AnalysisResult;
use crate::error::ModelInferenceError;
use crate::lexicon::CategoryIndex;
use crate::vision::device::Device;
use crate::vision::presence::PresenceDetector;
use crate::vision::scene::SceneClassifier;
use crate::vision::yolo::ObjectDetector;

/// Thresholds passed to the model adapters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicySettings {
    pub confidence_threshold: f32,
    pub top_k: usize,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    PresenceCheck,
    ObjectDetection,
    SceneFallback,
    Done,
}

/// Decision procedure over the three model adapters and the category index
#[derive(Clone)]
pub struct CategorizationPolicy {
    presence: Arc<dyn PresenceDetector>,
    detector: Arc<dyn ObjectDetector>,
    classifier: Arc<dyn SceneClassifier>,
    index: Arc<CategoryIndex>,
    settings: PolicySettings,
}

impl std::fmt::Debug for CategorizationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategorizationPolicy")
            .field("categories", &self.index.category_map().names())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl CategorizationPolicy {
    pub fn new(
        presence: Arc<dyn PresenceDetector>,
        detector: Arc<dyn ObjectDetector>,
        classifier: Arc<dyn SceneClassifier>,
        index: Arc<CategoryIndex>,
        settings: PolicySettings,
    ) -> Self {
        Self {
            presence,
            detector,
            classifier,
            index,
            settings,
        }
    }

    pub fn settings(&self) -> PolicySettings {
        self.settings
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    /// Run the decision procedure on a decoded image
    pub fn run(
        &self,
        image: &DynamicImage,
        device: Device,
    ) -> Result<AnalysisResult, ModelInferenceError> {
        let mut detailed: BTreeSet<String> = BTreeSet::new();
        let mut general: BTreeSet<String> = BTreeSet::new();
        let mut stage = Stage::PresenceCheck;

        while stage != Stage::Done {
            stage = match stage {
                Stage::PresenceCheck => {
                    let present = self.presence.detect_presence(image);
                    debug!("PresenceCheck: person suspected = {}", present);
                    if present {
                        Stage::ObjectDetection
                    } else {
                        Stage::SceneFallback
                    }
                }
                Stage::ObjectDetection => {
                    let labels = self.detector.detect_objects(
                        image,
                        device,
                        self.settings.confidence_threshold,
                    )?;
                    debug!("ObjectDetection: raw labels {:?}", labels);

                    if labels.is_empty() {
                        debug!("ObjectDetection: nothing found, falling back to scene");
                        Stage::SceneFallback
                    } else {
                        for label in labels {
                            general.extend(self.index.classify(&label).map(str::to_string));
                            detailed.insert(label);
                        }
                        Stage::Done
                    }
                }
                Stage::SceneFallback => {
                    let ranked =
                        self.classifier
                            .classify_scene(image, device, self.settings.top_k)?;
                    debug!("SceneFallback: top-{} {:?}", self.settings.top_k, ranked);

                    if let Some(best) = ranked.first() {
                        if detailed.is_empty() {
                            detailed.insert(best.clone());
                        }
                    }
                    for label in &ranked {
                        general.extend(self.index.classify(label).map(str::to_string));
                    }
                    Stage::Done
                }
                Stage::Done => Stage::Done,
            };
        }

        let result = AnalysisResult::new(detailed, general);
        debug!(
            "Done: detailed {:?}, general {:?}",
            result.detailed_labels, result.general_categories
        );
        Ok(result)
    }
}
