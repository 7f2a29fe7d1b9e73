// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Categorization policy tests
//!
//! Drives the decision procedure with mocked adapters:
//! - no person suspected: detector is never invoked, scene fallback runs
//! - objects found: all labels kept, scene classifier never invoked
//! - nothing detected: scene fallback runs exactly once
//! - adapter errors abort the request
//! - a label whose hypernym chain breaks is kept without a category

use std::sync::Arc;

use image_categorizer::{
    CategorizationPolicy, Device, ModelInferenceError, PolicySettings,
};
use mockall::predicate::eq;

use super::mocks::{
    fixture_index, labels, ranked, test_image, MockClassifier, MockDetector, MockPresence,
};

fn policy(
    presence: MockPresence,
    detector: MockDetector,
    classifier: MockClassifier,
) -> CategorizationPolicy {
    CategorizationPolicy::new(
        Arc::new(presence),
        Arc::new(detector),
        Arc::new(classifier),
        fixture_index(),
        PolicySettings::default(),
    )
}

fn presence(present: bool) -> MockPresence {
    let mut mock = MockPresence::new();
    mock.expect_detect_presence().times(1).return_const(present);
    mock
}

#[cfg(test)]
mod policy_tests {
    use super::*;

    // =============================================================================
    // Scene Path
    // =============================================================================

    /// Test 1: No person suspected skips object detection entirely
    #[test]
    fn test_no_presence_skips_detector() {
        let mut detector = MockDetector::new();
        detector.expect_detect_objects().never();

        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify_scene()
            .times(1)
            .returning(|_, _, _| Ok(ranked(&["seashore", "valley", "car"])));

        let result = policy(presence(false), detector, classifier)
            .run(&test_image(), Device::Cpu)
            .unwrap();

        assert_eq!(result.detailed_labels, vec!["seashore"]);
        assert_eq!(result.general_categories, vec!["nature", "vehicle"]);
    }

    /// Test 2: Scene labels without a category still yield a detailed label
    #[test]
    fn test_scene_label_without_category() {
        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify_scene()
            .returning(|_, _, _| Ok(ranked(&["jigsaw puzzle", "crossword"])));

        let result = policy(presence(false), MockDetector::new(), classifier)
            .run(&test_image(), Device::Cpu)
            .unwrap();

        assert_eq!(result.detailed_labels, vec!["jigsaw puzzle"]);
        assert!(result.general_categories.is_empty());
    }

    /// Test 3: An empty ranking gives an empty result
    #[test]
    fn test_empty_ranking() {
        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify_scene()
            .returning(|_, _, _| Ok(Vec::new()));

        let result = policy(presence(false), MockDetector::new(), classifier)
            .run(&test_image(), Device::Cpu)
            .unwrap();

        assert!(result.is_empty());
    }

    // =============================================================================
    // Detection Path
    // =============================================================================

    /// Test 4: Detected labels are all kept and classified
    #[test]
    fn test_detection_labels() {
        let mut detector = MockDetector::new();
        detector
            .expect_detect_objects()
            .times(1)
            .returning(|_, _, _| Ok(labels(&["person", "dog"])));

        let mut classifier = MockClassifier::new();
        classifier.expect_classify_scene().never();

        let result = policy(presence(true), detector, classifier)
            .run(&test_image(), Device::Cpu)
            .unwrap();

        assert_eq!(result.detailed_labels, vec!["dog", "person"]);
        assert_eq!(result.general_categories, vec!["animal", "person"]);
    }

    /// Test 5: Labels sharing a category produce it once
    #[test]
    fn test_shared_category_once() {
        let mut detector = MockDetector::new();
        detector
            .expect_detect_objects()
            .returning(|_, _, _| Ok(labels(&["dog", "cat", "person"])));

        let result = policy(presence(true), detector, MockClassifier::new())
            .run(&test_image(), Device::Cpu)
            .unwrap();

        assert_eq!(result.detailed_labels, vec!["cat", "dog", "person"]);
        assert_eq!(result.general_categories, vec!["animal", "person"]);
    }

    /// Test 6: Nothing detected falls back to the scene classifier once
    #[test]
    fn test_empty_detection_falls_back() {
        let mut detector = MockDetector::new();
        detector
            .expect_detect_objects()
            .times(1)
            .returning(|_, _, _| Ok(labels(&[])));

        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify_scene()
            .times(1)
            .returning(|_, _, _| Ok(ranked(&["valley"])));

        let result = policy(presence(true), detector, classifier)
            .run(&test_image(), Device::Cpu)
            .unwrap();

        assert_eq!(result.detailed_labels, vec!["valley"]);
        assert_eq!(result.general_categories, vec!["nature"]);
    }

    // =============================================================================
    // Arguments and Errors
    // =============================================================================

    /// Test 7: Device and thresholds are passed through to the adapters
    #[test]
    fn test_device_and_settings_passed_through() {
        let device = Device::Cuda(1);

        let mut detector = MockDetector::new();
        detector
            .expect_detect_objects()
            .withf(move |_, d, threshold| *d == device && (*threshold - 0.4).abs() < 1e-6)
            .times(1)
            .returning(|_, _, _| Ok(labels(&[])));

        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify_scene()
            .with(mockall::predicate::always(), eq(device), eq(3usize))
            .times(1)
            .returning(|_, _, _| Ok(ranked(&["car"])));

        let policy = CategorizationPolicy::new(
            Arc::new(presence(true)),
            Arc::new(detector),
            Arc::new(classifier),
            fixture_index(),
            PolicySettings {
                confidence_threshold: 0.4,
                top_k: 3,
            },
        );

        let result = policy.run(&test_image(), device).unwrap();
        assert_eq!(result.general_categories, vec!["vehicle"]);
    }

    /// Test 8: A detector failure aborts the request without a partial result
    #[test]
    fn test_detector_error_propagates() {
        let mut detector = MockDetector::new();
        detector
            .expect_detect_objects()
            .returning(|_, _, _| Err(ModelInferenceError::Session("out of memory".to_string())));

        let mut classifier = MockClassifier::new();
        classifier.expect_classify_scene().never();

        let err = policy(presence(true), detector, classifier)
            .run(&test_image(), Device::Cpu)
            .unwrap_err();
        assert!(matches!(err, ModelInferenceError::Session(_)));
    }

    /// Test 9: A classifier failure aborts the request
    #[test]
    fn test_classifier_error_propagates() {
        let mut classifier = MockClassifier::new();
        classifier
            .expect_classify_scene()
            .returning(|_, device, _| Err(ModelInferenceError::DeviceNotLoaded(device)));

        let err = policy(presence(false), MockDetector::new(), classifier)
            .run(&test_image(), Device::Cuda(0))
            .unwrap_err();
        assert!(matches!(err, ModelInferenceError::DeviceNotLoaded(Device::Cuda(0))));
    }

    /// Test 10: Repeated runs on the same image give the same result
    #[test]
    fn test_run_is_idempotent() {
        let mut presence = MockPresence::new();
        presence.expect_detect_presence().times(2).return_const(true);

        let mut detector = MockDetector::new();
        detector
            .expect_detect_objects()
            .times(2)
            .returning(|_, _, _| Ok(labels(&["bicycle", "person"])));

        let policy = policy(presence, detector, MockClassifier::new());
        let image = test_image();

        let first = policy.run(&image, Device::Cpu).unwrap();
        let second = policy.run(&image, Device::Cpu).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.general_categories, vec!["person", "vehicle"]);
    }

    // =============================================================================
    // Lexical Failures
    // =============================================================================

    /// Test 11: A dangling hypernym only drops that label's category
    #[test]
    fn test_broken_hypernym_chain_among_valid_labels() {
        let mut detector = MockDetector::new();
        detector
            .expect_detect_objects()
            .times(1)
            .returning(|_, _, _| Ok(labels(&["dog", "broken", "person"])));

        let mut classifier = MockClassifier::new();
        classifier.expect_classify_scene().never();

        let result = policy(presence(true), detector, classifier)
            .run(&test_image(), Device::Cpu)
            .unwrap();

        assert_eq!(result.detailed_labels, vec!["broken", "dog", "person"]);
        assert_eq!(result.general_categories, vec!["animal", "person"]);
    }
}
