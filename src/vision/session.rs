// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime sessions, one per configured device
//!
//! Sessions are created once during startup. Requests pick the session that
//! matches their device selector; a device that was not prepared at startup
//! fails the request instead of triggering a lazy load.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayD};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info, warn};

use crate::error::ModelInferenceError;
use crate::vision::device::Device;

/// Build a session for `model_path` on `device`
///
/// CUDA sessions fall back to the CPU provider when CUDA cannot be
/// initialized, matching how the embedding models are brought up.
pub fn build_session(model_path: &Path, device: Device, intra_threads: usize) -> Result<Session> {
    if !model_path.exists() {
        anyhow::bail!("ONNX model file not found: {}", model_path.display());
    }

    if let Device::Cuda(ordinal) = device {
        info!(
            "Attempting CUDA execution provider (device {}) for {}",
            ordinal,
            model_path.display()
        );
        let cuda_result = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(ordinal as i32)
                .build()])
            .context("Failed to set CUDA execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path);

        match cuda_result {
            Ok(session) => return Ok(session),
            Err(e) => {
                warn!("⚠️  CUDA execution provider failed: {}", e);
                warn!("   Falling back to CPU execution provider");
            }
        }
    }

    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(intra_threads)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load ONNX model from {}",
            model_path.display()
        ))
}

/// One loaded model, with a session per device
pub struct DeviceSessions {
    sessions: BTreeMap<Device, Mutex<Session>>,
    input_name: String,
}

impl std::fmt::Debug for DeviceSessions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSessions")
            .field("devices", &self.devices())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl DeviceSessions {
    /// Load `model_path` once for every device in `devices`
    pub fn load(model_path: &Path, devices: &[Device], intra_threads: usize) -> Result<Self> {
        if devices.is_empty() {
            anyhow::bail!("No devices configured for {}", model_path.display());
        }

        let mut sessions = BTreeMap::new();
        let mut input_name = None;

        for &device in devices {
            if sessions.contains_key(&device) {
                continue;
            }
            let session = build_session(model_path, device, intra_threads)?;

            if input_name.is_none() {
                input_name = Some(
                    session
                        .inputs
                        .first()
                        .map(|input| input.name.clone())
                        .unwrap_or_else(|| "images".to_string()),
                );
            }

            debug!("Session ready for {} on {}", model_path.display(), device);
            sessions.insert(device, Mutex::new(session));
        }

        Ok(Self {
            sessions,
            input_name: input_name.unwrap_or_else(|| "images".to_string()),
        })
    }

    /// Devices with a loaded session
    pub fn devices(&self) -> Vec<Device> {
        self.sessions.keys().copied().collect()
    }

    /// Run one forward pass and return the first output tensor
    pub fn run(&self, device: Device, input: Array4<f32>) -> Result<ArrayD<f32>, ModelInferenceError> {
        let session = self
            .sessions
            .get(&device)
            .ok_or(ModelInferenceError::DeviceNotLoaded(device))?;

        let mut session = session
            .lock()
            .map_err(|_| ModelInferenceError::LockPoisoned)?;

        let input_value = Value::from_array(input)?;

        let outputs = session.run(ort::inputs![&self.input_name => input_value])?;

        let output_tensor = outputs[0].try_extract_array::<f32>()?;

        Ok(output_tensor.to_owned())
    }
}
