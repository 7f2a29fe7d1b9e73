// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod categorize;
pub mod cli;
pub mod config;
pub mod error;
pub mod lexicon;
pub mod vision;

// Re-export main types
pub use categorize::{
    AnalysisRequest, AnalysisResult, CategorizationPolicy, ImageSource, Pipeline, PolicySettings,
};
pub use config::PipelineConfig;
pub use error::{
    CategorizeError, ConfigurationError, ImageLoadError, LexicalLookupError, ModelInferenceError,
};
pub use lexicon::{CategoryIndex, CategoryMap, LexicalGraph};
pub use vision::{Device, ObjectDetector, PresenceDetector, SceneClassifier};
