// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Haar cascade face detector
//!
//! Evaluates a boosted cascade of Haar-feature stumps over a grayscale image.
//! Cascades are read straight from OpenCV's `opencv_traincascade` XML (the
//! format of the shipped `haarcascade_frontalface_default.xml`), or from a
//! JSON document with the same stages, stump thresholds, leaf values and
//! weighted feature rectangles.

use std::path::Path;

use image::imageops::FilterType;
use image::GrayImage;
use serde::Deserialize;
use tracing::{debug, info};

use super::grouping::{group_rectangles, Rect, GROUP_EPS};
use super::integral::IntegralImage;
use super::opencv_xml;
use crate::error::ConfigurationError;

/// Windows whose normalised standard deviation is below this are skipped
const MIN_WINDOW_INV_STDDEV: f64 = 0.1;

/// Multi-scale scan parameters
#[derive(Debug, Clone, Copy)]
pub struct FaceScanParams {
    /// Image shrink factor between pyramid levels (> 1.0)
    pub scale_factor: f64,
    /// Raw hits a face cluster needs beyond itself to be kept
    pub min_neighbors: usize,
    /// Smallest face window in original image pixels
    pub min_size: u32,
}

impl Default for FaceScanParams {
    fn default() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: 40,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct HaarRect(u32, u32, u32, u32, f64);

#[derive(Debug, Clone, Deserialize)]
struct HaarFeature {
    rects: Vec<HaarRect>,
    #[serde(default)]
    tilted: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct Stump {
    feature: usize,
    threshold: f64,
    left: f64,
    right: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct Stage {
    threshold: f64,
    classifiers: Vec<Stump>,
}

#[derive(Debug, Clone, Deserialize)]
struct CascadeDefinition {
    width: u32,
    height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

/// `<internalNodes>` of a stump: left child, right child, feature index, threshold
fn stump_from_xml(node: roxmltree::Node) -> Result<Stump, String> {
    let internal = opencv_xml::numbers::<f64>(opencv_xml::require(node, "internalNodes")?)?;
    if internal.len() != 4 {
        return Err(format!(
            "weak classifier has {} internal node values; only single-split stumps are supported",
            internal.len()
        ));
    }
    let feature = internal[2];
    if feature < 0.0 || feature.fract() != 0.0 {
        return Err(format!("bad feature index {}", feature));
    }

    let [left, right]: [f64; 2] = opencv_xml::fixed(opencv_xml::require(node, "leafValues")?)?;
    Ok(Stump {
        feature: feature as usize,
        threshold: internal[3],
        left,
        right,
    })
}

fn feature_from_xml(node: roxmltree::Node) -> Result<HaarFeature, String> {
    let rects = opencv_xml::elements(opencv_xml::require(node, "rects")?)
        .map(|rect| -> Result<HaarRect, String> {
            let [x, y, w, h, weight]: [f64; 5] = opencv_xml::fixed(rect)?;
            if [x, y, w, h].iter().any(|v| *v < 0.0 || v.fract() != 0.0) {
                return Err(format!(
                    "rectangle '{}' is not on the pixel grid",
                    opencv_xml::text(rect).trim()
                ));
            }
            Ok(HaarRect(x as u32, y as u32, w as u32, h as u32, weight))
        })
        .collect::<Result<Vec<_>, String>>()?;

    let tilted = match opencv_xml::child(node, "tilted") {
        Some(flag) => opencv_xml::scalar::<u8>(flag)? != 0,
        None => false,
    };

    Ok(HaarFeature { rects, tilted })
}

fn cascade_from_xml(doc: &roxmltree::Document) -> Result<CascadeDefinition, String> {
    let cascade = opencv_xml::storage_object(doc)?;
    if cascade.attribute("type_id") == Some("opencv-haar-classifier") {
        return Err("old-style opencv-haar-classifier cascades are not supported".to_string());
    }
    if cascade.tag_name().name() != "cascade" {
        return Err(format!(
            "expected <cascade>, found <{}>",
            cascade.tag_name().name()
        ));
    }

    for (field, expected) in [("stageType", "BOOST"), ("featureType", "HAAR")] {
        if let Some(node) = opencv_xml::child(cascade, field) {
            let value = opencv_xml::text(node);
            if value.trim() != expected {
                return Err(format!("<{}> is '{}', expected {}", field, value.trim(), expected));
            }
        }
    }

    let width = opencv_xml::scalar(opencv_xml::require(cascade, "width")?)?;
    let height = opencv_xml::scalar(opencv_xml::require(cascade, "height")?)?;

    let stages = opencv_xml::elements(opencv_xml::require(cascade, "stages")?)
        .map(|stage| -> Result<Stage, String> {
            let threshold = opencv_xml::scalar(opencv_xml::require(stage, "stageThreshold")?)?;
            let classifiers = opencv_xml::elements(opencv_xml::require(stage, "weakClassifiers")?)
                .map(stump_from_xml)
                .collect::<Result<Vec<_>, String>>()?;
            Ok(Stage {
                threshold,
                classifiers,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    let features = opencv_xml::elements(opencv_xml::require(cascade, "features")?)
        .map(feature_from_xml)
        .collect::<Result<Vec<_>, String>>()?;

    Ok(CascadeDefinition {
        width,
        height,
        stages,
        features,
    })
}

/// A validated Haar cascade ready for scanning
#[derive(Debug, Clone)]
pub struct HaarCascade {
    width: u32,
    height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    /// Load a cascade from an OpenCV `.xml` file or its JSON form
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::from_io(path, e))?;
        let cascade = if opencv_xml::is_xml(path) {
            Self::from_xml_str(&content, path)?
        } else {
            Self::from_json_str(&content, path)?
        };

        info!(
            "✅ Haar cascade loaded from {} ({} stages, {} features, {}x{} window)",
            path.display(),
            cascade.stages.len(),
            cascade.features.len(),
            cascade.width,
            cascade.height
        );

        Ok(cascade)
    }

    /// Parse a JSON cascade; `origin` names the resource in errors
    pub fn from_json_str(content: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        let definition: CascadeDefinition =
            serde_json::from_str(content).map_err(|e| ConfigurationError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
        Self::from_definition(definition, origin)
    }

    /// Parse an `opencv_traincascade` XML cascade of Haar stumps
    ///
    /// Old-style `opencv-haar-classifier` files and cascades with deeper
    /// trees than one split are rejected.
    pub fn from_xml_str(content: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        let parse_error = |message: String| ConfigurationError::Parse {
            path: origin.to_path_buf(),
            message,
        };

        let doc = roxmltree::Document::parse(content).map_err(|e| parse_error(e.to_string()))?;
        let definition = cascade_from_xml(&doc).map_err(parse_error)?;
        Self::from_definition(definition, origin)
    }

    fn from_definition(
        definition: CascadeDefinition,
        origin: &Path,
    ) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::Invalid {
            path: origin.to_path_buf(),
            reason,
        };

        if definition.width < 3 || definition.height < 3 {
            return Err(invalid(format!(
                "window {}x{} is too small",
                definition.width, definition.height
            )));
        }
        if definition.stages.is_empty() {
            return Err(invalid("cascade has no stages".to_string()));
        }

        for (i, feature) in definition.features.iter().enumerate() {
            if feature.tilted {
                return Err(invalid(format!("feature {} is tilted (unsupported)", i)));
            }
            for HaarRect(x, y, w, h, _) in &feature.rects {
                if *w == 0 || *h == 0 || x + w > definition.width || y + h > definition.height {
                    return Err(invalid(format!(
                        "feature {} rectangle ({}, {}, {}, {}) leaves the window",
                        i, x, y, w, h
                    )));
                }
            }
        }

        for (s, stage) in definition.stages.iter().enumerate() {
            if let Some(stump) = stage
                .classifiers
                .iter()
                .find(|stump| stump.feature >= definition.features.len())
            {
                return Err(invalid(format!(
                    "stage {} references missing feature {}",
                    s, stump.feature
                )));
            }
        }

        Ok(Self {
            width: definition.width,
            height: definition.height,
            stages: definition.stages,
            features: definition.features,
        })
    }

    /// Detection window size the cascade was trained on
    pub fn window(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Run the cascade on the window whose top-left corner is `(x, y)`
    fn evaluate(&self, integral: &IntegralImage, x: u32, y: u32) -> bool {
        // Variance normalisation over the window shrunk by one pixel
        let (nw, nh) = (self.width - 2, self.height - 2);
        let area = (nw * nh) as f64;
        let sum = integral.rect_sum(x + 1, y + 1, nw, nh) as f64;
        let sq_sum = integral.rect_sq_sum(x + 1, y + 1, nw, nh);

        let nf = area * sq_sum - sum * sum;
        if nf <= 0.0 {
            return false;
        }
        let variance_norm = 1.0 / nf.sqrt();
        if area * variance_norm >= MIN_WINDOW_INV_STDDEV {
            return false;
        }

        for stage in &self.stages {
            let mut stage_sum = 0.0;
            for stump in &stage.classifiers {
                let feature = &self.features[stump.feature];
                let value: f64 = feature
                    .rects
                    .iter()
                    .map(|HaarRect(rx, ry, rw, rh, weight)| {
                        weight * integral.rect_sum(x + rx, y + ry, *rw, *rh) as f64
                    })
                    .sum();

                stage_sum += if value * variance_norm < stump.threshold {
                    stump.left
                } else {
                    stump.right
                };
            }
            if stage_sum < stage.threshold {
                return false;
            }
        }

        true
    }

    /// Scan the image at every pyramid level and return raw (ungrouped) hits
    pub fn raw_detections(&self, gray: &GrayImage, params: &FaceScanParams) -> Vec<Rect> {
        let (img_w, img_h) = gray.dimensions();
        let mut candidates = Vec::new();
        let scale_factor = params.scale_factor.max(1.0001);

        let mut factor = 1.0f64;
        loop {
            let scaled_w = (img_w as f64 / factor).round() as u32;
            let scaled_h = (img_h as f64 / factor).round() as u32;
            if scaled_w < self.width || scaled_h < self.height {
                break;
            }

            let win_w = (self.width as f64 * factor).round() as u32;
            let win_h = (self.height as f64 * factor).round() as u32;
            if win_w < params.min_size || win_h < params.min_size {
                factor *= scale_factor;
                continue;
            }

            let integral = if scaled_w == img_w && scaled_h == img_h {
                IntegralImage::new(gray)
            } else {
                IntegralImage::new(&image::imageops::resize(
                    gray,
                    scaled_w,
                    scaled_h,
                    FilterType::Triangle,
                ))
            };

            let step = if factor > 2.0 { 1 } else { 2 };
            for y in (0..=scaled_h - self.height).step_by(step) {
                for x in (0..=scaled_w - self.width).step_by(step) {
                    if self.evaluate(&integral, x, y) {
                        candidates.push(Rect::new(
                            (x as f64 * factor).round() as i32,
                            (y as f64 * factor).round() as i32,
                            win_w as i32,
                            win_h as i32,
                        ));
                    }
                }
            }

            factor *= scale_factor;
        }

        candidates
    }

    /// Multi-scale detection with neighbour grouping
    pub fn detect_multi_scale(&self, gray: &GrayImage, params: &FaceScanParams) -> Vec<Rect> {
        let candidates = self.raw_detections(gray, params);
        let faces = group_rectangles(&candidates, params.min_neighbors, GROUP_EPS);
        debug!(
            "Haar scan: {} raw hits, {} after grouping",
            candidates.len(),
            faces.len()
        );
        faces
    }
}
