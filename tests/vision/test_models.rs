// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pretrained model adapter tests
//!
//! Load failures run everywhere. Inference against the real YOLOv8 and
//! ResNet-50 exports needs the model files and is ignored by default:
//!
//! ```text
//! CATEGORIZER_TEST_MODELS=/workspace/models cargo test --test vision_tests -- --ignored
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use image_categorizer::vision::scene::ResNetClassifier;
use image_categorizer::vision::yolo::{YoloDetector, COCO_CLASSES};
use image_categorizer::{Device, ObjectDetector, SceneClassifier};
use tempfile::TempDir;

fn model_dir() -> PathBuf {
    std::env::var("CATEGORIZER_TEST_MODELS")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/workspace/models"))
}

fn sample_image() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(320, 240, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

#[cfg(test)]
mod model_tests {
    use super::*;

    // =============================================================================
    // Load Failures
    // =============================================================================

    /// Test 1: Missing YOLO model file fails with the path in the message
    #[test]
    fn test_yolo_missing_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("yolov8n.onnx");

        let err = YoloDetector::load(&path, None, &[Device::Cpu], 1).unwrap_err();
        assert!(format!("{:#}", err).contains("yolov8n.onnx"));
    }

    /// Test 2: An empty YOLO label file is rejected before the model is read
    #[test]
    fn test_yolo_empty_labels() {
        let dir = TempDir::new().unwrap();
        let labels = dir.path().join("labels.txt");
        fs::write(&labels, "\n\n").unwrap();

        let err = YoloDetector::load(Path::new("unused.onnx"), Some(&labels), &[Device::Cpu], 1)
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    /// Test 3: Missing ResNet label file fails
    #[test]
    fn test_resnet_missing_labels() {
        let dir = TempDir::new().unwrap();
        let err = ResNetClassifier::load(
            &dir.path().join("resnet50.onnx"),
            &dir.path().join("imagenet_classes.txt"),
            &[Device::Cpu],
            1,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("imagenet_classes.txt"));
    }

    /// Test 4: No devices is a load error
    #[test]
    fn test_resnet_no_devices() {
        let dir = TempDir::new().unwrap();
        let labels = dir.path().join("imagenet_classes.txt");
        fs::write(&labels, "tench\ngoldfish\n").unwrap();

        assert!(ResNetClassifier::load(&dir.path().join("resnet50.onnx"), &labels, &[], 1).is_err());
    }

    // =============================================================================
    // Real Models (ignored by default)
    // =============================================================================

    /// Test 5: YOLO returns only COCO labels for a synthetic image
    #[test]
    #[ignore]
    fn test_yolo_real_model() {
        let path = model_dir().join("yolov8n.onnx");
        let detector = YoloDetector::load(&path, None, &[Device::Cpu], 2).unwrap();

        let labels = detector
            .detect_objects(&sample_image(), Device::Cpu, 0.25)
            .unwrap();
        assert!(labels.iter().all(|l| COCO_CLASSES.contains(&l.as_str())));
    }

    /// Test 6: ResNet returns exactly top-k known labels
    #[test]
    #[ignore]
    fn test_resnet_real_model() {
        let dir = model_dir();
        let classifier = ResNetClassifier::load(
            &dir.join("resnet50.onnx"),
            &dir.join("imagenet_classes.txt"),
            &[Device::Cpu],
            2,
        )
        .unwrap();

        let ranked = classifier
            .classify_scene(&sample_image(), Device::Cpu, 5)
            .unwrap();
        assert_eq!(ranked.len(), 5);
        assert!(ranked.iter().all(|l| classifier.labels().contains(l)));
    }

    /// Test 7: Asking for a device with no session is an inference error
    #[test]
    #[ignore]
    fn test_unloaded_device() {
        let path = model_dir().join("yolov8n.onnx");
        let detector = YoloDetector::load(&path, None, &[Device::Cpu], 1).unwrap();

        let err = detector
            .detect_objects(&sample_image(), Device::Cuda(3), 0.25)
            .unwrap_err();
        assert!(err.to_string().contains("cuda:3"));
    }
}
