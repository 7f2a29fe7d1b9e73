// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request and result types for one categorization

use std::collections::BTreeSet;
use std::path::PathBuf;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::ImageLoadError;
use crate::vision::device::Device;
use crate::vision::image_utils::{decode_image_bytes, load_image_file};

/// Where the image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageSource {
    /// Decode the image; failures abort the request
    pub fn decode(&self) -> Result<DynamicImage, ImageLoadError> {
        match self {
            Self::Path(path) => load_image_file(path).map(|(image, _)| image),
            Self::Bytes(data) => decode_image_bytes(data)
                .map(|(image, _)| image)
                .map_err(|source| ImageLoadError::Decode {
                    origin: format!("<{} bytes>", data.len()),
                    source,
                }),
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(data) => format!("<{} bytes>", data.len()),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(data)
    }
}

/// One image plus the device its models should run on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub source: ImageSource,
    pub device: Device,
}

impl AnalysisRequest {
    pub fn new(source: impl Into<ImageSource>, device: Device) -> Self {
        Self {
            source: source.into(),
            device,
        }
    }

    pub fn from_path(path: impl Into<PathBuf>, device: Device) -> Self {
        Self::new(path.into(), device)
    }

    pub fn from_bytes(data: Vec<u8>, device: Device) -> Self {
        Self::new(data, device)
    }
}

/// Final labels for one image, each list sorted ascending without duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub detailed_labels: Vec<String>,
    pub general_categories: Vec<String>,
}

impl AnalysisResult {
    /// Build a result from any label collections, sorting and deduplicating both
    pub fn new<D, G>(detailed_labels: D, general_categories: G) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        G: IntoIterator,
        G::Item: Into<String>,
    {
        let detailed: BTreeSet<String> = detailed_labels.into_iter().map(Into::into).collect();
        let general: BTreeSet<String> = general_categories.into_iter().map(Into::into).collect();
        Self {
            detailed_labels: detailed.into_iter().collect(),
            general_categories: general.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detailed_labels.is_empty() && self.general_categories.is_empty()
    }
}
