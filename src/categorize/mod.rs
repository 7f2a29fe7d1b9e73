// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image categorization: presence check, object detection or scene
//! classification, and category folding

pub mod pipeline;
pub mod policy;
pub mod result;

pub use pipeline::Pipeline;
pub use policy::{CategorizationPolicy, PolicySettings};
pub use result::{AnalysisRequest, AnalysisResult, ImageSource};
