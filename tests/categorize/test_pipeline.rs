// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pipeline tests
//!
//! End-to-end analyze() over real image files with mocked models, plus
//! startup failures from bad configuration resources.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use image_categorizer::{
    AnalysisRequest, CategorizeError, ConfigurationError, Device, ImageLoadError, Pipeline,
    PipelineConfig, PolicySettings,
};
use tempfile::TempDir;

use super::mocks::{
    fixture_index, labels, ranked, MockClassifier, MockDetector, MockPresence, CATEGORIES,
    LEXICON,
};

fn write_png(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    let image = RgbImage::from_pixel(48, 48, Rgb([30, 120, 200]));
    image.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

fn detecting_pipeline(found: &'static [&'static str]) -> Pipeline {
    let mut presence = MockPresence::new();
    presence.expect_detect_presence().return_const(true);

    let mut detector = MockDetector::new();
    detector
        .expect_detect_objects()
        .returning(move |_, _, _| Ok(labels(found)));

    let mut classifier = MockClassifier::new();
    classifier
        .expect_classify_scene()
        .returning(|_, _, _| Ok(ranked(&["valley"])));

    Pipeline::from_parts(
        Arc::new(presence),
        Arc::new(detector),
        Arc::new(classifier),
        fixture_index(),
        PolicySettings::default(),
    )
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    // =============================================================================
    // Analyze
    // =============================================================================

    /// Test 1: A PNG on disk is decoded and categorized
    #[test]
    fn test_analyze_png_file() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "street.png");

        let pipeline = detecting_pipeline(&["car", "person", "bicycle"]);
        let result = pipeline
            .analyze(&AnalysisRequest::from_path(&path, Device::Cpu))
            .unwrap();

        assert_eq!(result.detailed_labels, vec!["bicycle", "car", "person"]);
        assert_eq!(result.general_categories, vec!["person", "vehicle"]);
    }

    /// Test 2: In-memory bytes are accepted as well as paths
    #[test]
    fn test_analyze_bytes() {
        let dir = TempDir::new().unwrap();
        let bytes = fs::read(write_png(&dir, "dog.png")).unwrap();

        let pipeline = detecting_pipeline(&["dog"]);
        let result = pipeline
            .analyze(&AnalysisRequest::from_bytes(bytes, Device::Cpu))
            .unwrap();

        assert_eq!(result.detailed_labels, vec!["dog"]);
        assert_eq!(result.general_categories, vec!["animal"]);
    }

    /// Test 3: The result serializes with both lists present
    #[test]
    fn test_result_json_shape() {
        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "empty.png");

        let pipeline = detecting_pipeline(&[]);
        let result = pipeline
            .analyze(&AnalysisRequest::from_path(&path, Device::Cpu))
            .unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["detailed_labels"], serde_json::json!(["valley"]));
        assert_eq!(json["general_categories"], serde_json::json!(["nature"]));
    }

    // =============================================================================
    // Image Errors
    // =============================================================================

    /// Test 4: An empty path fails before any model runs
    #[test]
    fn test_empty_path_fails_before_models() {
        let mut presence = MockPresence::new();
        presence.expect_detect_presence().never();

        let pipeline = Pipeline::from_parts(
            Arc::new(presence),
            Arc::new(MockDetector::new()),
            Arc::new(MockClassifier::new()),
            fixture_index(),
            PolicySettings::default(),
        );

        let err = pipeline
            .analyze(&AnalysisRequest::from_path("", Device::Cpu))
            .unwrap_err();
        assert!(matches!(
            err,
            CategorizeError::ImageLoad(ImageLoadError::EmptyPath)
        ));
    }

    /// Test 5: A missing file is a read error
    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let pipeline = detecting_pipeline(&["dog"]);

        let err = pipeline
            .analyze(&AnalysisRequest::from_path(
                dir.path().join("nope.jpg"),
                Device::Cpu,
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            CategorizeError::ImageLoad(ImageLoadError::Read { .. })
        ));
    }

    /// Test 6: A file that is not an image is a decode error
    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.jpg");
        fs::write(&path, b"these are not pixels").unwrap();

        let pipeline = detecting_pipeline(&["dog"]);
        let err = pipeline
            .analyze(&AnalysisRequest::from_path(&path, Device::Cpu))
            .unwrap_err();
        assert!(matches!(
            err,
            CategorizeError::ImageLoad(ImageLoadError::Decode { .. })
        ));
    }

    // =============================================================================
    // Concurrency
    // =============================================================================

    /// Test 7: One pipeline serves many threads
    #[test]
    fn test_concurrent_analyze() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pipeline>();

        let dir = TempDir::new().unwrap();
        let path = write_png(&dir, "shared.png");
        let pipeline = Arc::new(detecting_pipeline(&["cat", "person"]));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pipeline = pipeline.clone();
                let path = path.clone();
                std::thread::spawn(move || {
                    pipeline
                        .analyze(&AnalysisRequest::from_path(path, Device::Cpu))
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            let result = handle.join().unwrap();
            assert_eq!(result.general_categories, vec!["animal", "person"]);
        }
    }

    // =============================================================================
    // Startup
    // =============================================================================

    /// Test 8: A malformed category map keeps the pipeline from starting
    #[tokio::test]
    async fn test_start_with_bad_category_map() {
        let dir = TempDir::new().unwrap();
        let lexicon = dir.path().join("lexicon.tsv");
        let categories = dir.path().join("categories.json");
        fs::write(&lexicon, LEXICON).unwrap();
        fs::write(&categories, "[not json").unwrap();

        let config = PipelineConfig {
            lexicon,
            category_map: categories.clone(),
            ..PipelineConfig::default()
        };

        let err = Pipeline::start(&config).await.unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
        assert_eq!(err.path(), categories.as_path());
    }

    /// Test 9: A missing lexicon keeps the pipeline from starting
    #[tokio::test]
    async fn test_start_with_missing_lexicon() {
        let dir = TempDir::new().unwrap();
        let categories = dir.path().join("categories.json");
        fs::write(&categories, CATEGORIES).unwrap();

        let config = PipelineConfig {
            lexicon: dir.path().join("missing.tsv"),
            category_map: categories,
            ..PipelineConfig::default()
        };

        let err = Pipeline::start(&config).await.unwrap_err();
        assert!(matches!(err, ConfigurationError::NotFound { .. }));
    }

    /// Test 10: Valid lexical resources but missing models still fail startup
    #[tokio::test]
    async fn test_start_with_missing_models() {
        let dir = TempDir::new().unwrap();
        let lexicon = dir.path().join("lexicon.tsv");
        let categories = dir.path().join("categories.json");
        fs::write(&lexicon, LEXICON).unwrap();
        fs::write(&categories, CATEGORIES).unwrap();

        let mut config = PipelineConfig {
            lexicon,
            category_map: categories,
            ..PipelineConfig::default()
        };
        config.presence.face_cascade = dir.path().join("no_face.json");

        let err = Pipeline::start(&config).await.unwrap_err();
        assert!(matches!(err, ConfigurationError::NotFound { .. }));
    }
}
