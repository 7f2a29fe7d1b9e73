// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde_json::json;
use tracing::{info, warn};

use crate::categorize::{AnalysisRequest, Pipeline};
use crate::config::PipelineConfig;
use crate::lexicon::CategoryIndex;
use crate::vision::device::Device;

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Image files to categorize
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Pipeline configuration file (TOML)
    #[arg(long, env = "CATEGORIZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device to run the models on (cpu, cuda, cuda:N)
    #[arg(long, default_value = "cpu")]
    pub device: Device,
}

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Words or labels to fold into general categories
    #[arg(required = true)]
    pub words: Vec<String>,

    /// Pipeline configuration file (TOML)
    #[arg(long, env = "CATEGORIZER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for the models command
#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Pipeline configuration file (TOML)
    #[arg(long, env = "CATEGORIZER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Config file (or defaults) with environment overrides applied
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

/// Categorize images and print one JSON object per image
pub async fn analyze(args: AnalyzeArgs) -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = load_config(args.config.as_deref())?;
    if !config.devices.contains(&args.device) {
        info!("Adding {} to the configured devices", args.device);
        config.devices.push(args.device);
    }

    let pipeline = Arc::new(
        Pipeline::start(&config)
            .await
            .context("Pipeline failed to start")?,
    );

    let tasks = args.images.iter().cloned().map(|path| {
        let pipeline = pipeline.clone();
        let device = args.device;
        tokio::task::spawn_blocking(move || {
            let request = AnalysisRequest::from_path(path.clone(), device);
            (path, pipeline.analyze(&request))
        })
    });

    let mut failures = 0;
    for joined in futures::future::join_all(tasks).await {
        let (path, outcome) = joined.map_err(|e| anyhow!("Analysis worker failed: {}", e))?;
        let line = match outcome {
            Ok(result) => json!({
                "image": path.display().to_string(),
                "detailed_labels": result.detailed_labels,
                "general_categories": result.general_categories,
            }),
            Err(e) => {
                failures += 1;
                warn!("⚠️ Failed to analyze {}: {}", path.display(), e);
                json!({
                    "image": path.display().to_string(),
                    "error": e.to_string(),
                })
            }
        };
        println!("{}", line);
    }

    if failures > 0 {
        return Err(anyhow!(
            "{} of {} images failed",
            failures,
            args.images.len()
        ));
    }
    Ok(())
}

/// Print the general category of each word
pub async fn classify(args: ClassifyArgs) -> Result<()> {
    dotenv::dotenv().ok();

    let config = load_config(args.config.as_deref())?;
    let index = CategoryIndex::load(&config.lexicon, &config.category_map)?;

    for word in &args.words {
        let line = json!({
            "word": word,
            "category": index.classify(word),
        });
        println!("{}", line);
    }
    Ok(())
}

/// Start the pipeline and list what was loaded
pub async fn models(args: ModelsArgs) -> Result<()> {
    dotenv::dotenv().ok();

    let config = load_config(args.config.as_deref())?;
    let pipeline = Pipeline::start(&config)
        .await
        .context("Pipeline failed to start")?;

    for model in pipeline.list_models() {
        println!("{}", serde_json::to_string(model)?);
    }
    println!(
        "{}",
        json!({ "categories": pipeline.index().category_map().names() })
    );
    Ok(())
}
