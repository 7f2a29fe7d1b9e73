// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Image categorizer CLI
#[derive(Parser, Debug)]
#[command(name = "categorize-cli")]
#[command(version = "0.1.0")]
#[command(about = "Categorize photos into detailed labels and general categories", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Categorize one or more image files
    Analyze(commands::AnalyzeArgs),

    /// Fold words into general categories using only the lexicon
    Classify(commands::ClassifyArgs),

    /// Load the pipeline and list the loaded models
    Models(commands::ModelsArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Analyze(args) => commands::analyze(args).await,
        Commands::Classify(args) => commands::classify(args).await,
        Commands::Models(args) => commands::models(args).await,
    }
}
