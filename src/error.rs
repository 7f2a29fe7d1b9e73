// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the categorization pipeline
//!
//! - `ConfigurationError` - startup only, keeps the pipeline from becoming ready
//! - `ImageLoadError` - fatal for one request
//! - `LexicalLookupError` - recovered inside the category index, never escapes it
//! - `ModelInferenceError` - fatal for one request, no partial result

use std::path::PathBuf;

use thiserror::Error;

use crate::vision::device::Device;
use crate::vision::image_utils::ImageError;

/// Startup configuration failures (category map, lexicon, model files)
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration resource not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration in {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("failed to load model from {}: {message}", path.display())]
    ModelLoad { path: PathBuf, message: String },
}

impl ConfigurationError {
    /// Map an I/O failure on `path` to `NotFound` or `Io`
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// The resource this error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::NotFound { path }
            | Self::Io { path, .. }
            | Self::Parse { path, .. }
            | Self::Invalid { path, .. }
            | Self::ModelLoad { path, .. } => path,
        }
    }
}

/// Unreadable or undecodable image
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("image path is empty")]
    EmptyPath,

    #[error("failed to read image {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: ImageError,
    },
}

/// Failure inside the lexical graph while classifying one word
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexicalLookupError {
    #[error("word is empty")]
    EmptyWord,

    #[error("concept '{0}' is referenced as a hypernym but is not in the lexical graph")]
    UnknownConcept(String),
}

/// Failure while running a pretrained model
#[derive(Debug, Error)]
pub enum ModelInferenceError {
    #[error("inference session error: {0}")]
    Session(String),

    #[error("unexpected model output: expected {expected}, got {got}")]
    InvalidOutput { expected: String, got: String },

    #[error("no session was loaded for device '{0}'")]
    DeviceNotLoaded(Device),

    #[error("class index {index} is outside the category table ({len} entries)")]
    LabelOutOfRange { index: usize, len: usize },

    #[error("inference session lock poisoned")]
    LockPoisoned,
}

impl From<ort::Error> for ModelInferenceError {
    fn from(e: ort::Error) -> Self {
        Self::Session(e.to_string())
    }
}

/// Error returned to callers of the pipeline
#[derive(Debug, Error)]
pub enum CategorizeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),

    #[error(transparent)]
    ModelInference(#[from] ModelInferenceError),
}
