// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cheap person-presence check run before object detection
//!
//! A frontal-face Haar cascade is tried first on the grayscale image; only
//! when it finds nothing does the slower HOG body detector run.

pub mod grouping;
pub mod haar;
pub mod hog;
pub mod integral;
mod opencv_xml;

use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::error::ConfigurationError;

pub use grouping::{group_rectangles, Rect, GROUP_EPS};
pub use haar::{FaceScanParams, HaarCascade};
pub use hog::{BodyScanParams, HogPeopleDetector};
pub use integral::IntegralImage;

/// What one presence scan found
///
/// `bodies` is `None` when a face hit made the body scan unnecessary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceScan {
    pub faces: Vec<Rect>,
    pub bodies: Option<Vec<Rect>>,
}

impl PresenceScan {
    pub fn person_present(&self) -> bool {
        !self.faces.is_empty() || self.bodies.as_ref().is_some_and(|b| !b.is_empty())
    }
}

/// Decides whether an image likely contains a person
pub trait PresenceDetector: Send + Sync {
    /// True when at least one face or body was found
    fn detect_presence(&self, image: &DynamicImage) -> bool;
}

/// Face cascade followed by the body detector
#[derive(Debug)]
pub struct CascadePresenceDetector {
    face: HaarCascade,
    body: HogPeopleDetector,
    face_params: FaceScanParams,
    body_params: BodyScanParams,
}

impl CascadePresenceDetector {
    pub fn new(
        face: HaarCascade,
        body: HogPeopleDetector,
        face_params: FaceScanParams,
        body_params: BodyScanParams,
    ) -> Self {
        Self {
            face,
            body,
            face_params,
            body_params,
        }
    }

    /// Load both detectors from their resource files with default scan parameters
    pub fn load(face_path: &Path, body_path: &Path) -> Result<Self, ConfigurationError> {
        Ok(Self::new(
            HaarCascade::load(face_path)?,
            HogPeopleDetector::load(body_path)?,
            FaceScanParams::default(),
            BodyScanParams::default(),
        ))
    }

    pub fn with_face_params(mut self, params: FaceScanParams) -> Self {
        self.face_params = params;
        self
    }

    pub fn with_body_params(mut self, params: BodyScanParams) -> Self {
        self.body_params = params;
        self
    }
}

impl CascadePresenceDetector {
    /// Run the face cascade, then the body detector only if no face was found
    pub fn scan(&self, image: &DynamicImage) -> PresenceScan {
        let faces = self
            .face
            .detect_multi_scale(&image.to_luma8(), &self.face_params);
        if !faces.is_empty() {
            debug!("Presence: {} face(s) found, body scan skipped", faces.len());
            return PresenceScan {
                faces,
                bodies: None,
            };
        }

        let bodies = self
            .body
            .detect_multi_scale(&image.to_rgb8(), &self.body_params);
        debug!("Presence: {} body candidate(s) found", bodies.len());
        PresenceScan {
            faces,
            bodies: Some(bodies),
        }
    }
}

impl PresenceDetector for CascadePresenceDetector {
    fn detect_presence(&self, image: &DynamicImage) -> bool {
        self.scan(image).person_present()
    }
}
