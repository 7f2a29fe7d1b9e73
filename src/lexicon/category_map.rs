// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Category name to seed concept configuration
//!
//! `categories.json` is an object whose keys are category names and whose
//! values are lists of concept ids, e.g. `{"animal": ["animal.n.01"]}`.
//! Key order is kept: the first matching category wins during lookup.
//!
//! A seed may also name a sense through any of its lemmas
//! (`beast.n.01` for `animal.n.01`); it is stored under the canonical id.

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use super::graph::LexicalGraph;
use crate::error::ConfigurationError;

/// A named category and the concepts that trigger it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub seeds: Vec<String>,
}

/// Ordered, validated category configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    categories: Vec<Category>,
}

impl CategoryMap {
    /// Load and validate the map against `graph`
    pub fn load(path: &Path, graph: &LexicalGraph) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::from_io(path, e))?;
        let map = Self::from_json_str(&content, path, graph)?;

        info!(
            "✅ Loaded {} categories from {}",
            map.len(),
            path.display()
        );

        Ok(map)
    }

    /// Parse the map; `origin` names the resource in errors
    ///
    /// A category with an unresolvable seed or a value that is not a list of
    /// strings is skipped with a warning. Everything else is kept.
    pub fn from_json_str(
        content: &str,
        origin: &Path,
        graph: &LexicalGraph,
    ) -> Result<Self, ConfigurationError> {
        let value: Value = serde_json::from_str(content).map_err(|e| ConfigurationError::Parse {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })?;

        let Value::Object(entries) = value else {
            return Err(ConfigurationError::Invalid {
                path: origin.to_path_buf(),
                reason: "expected an object of category name to concept id list".to_string(),
            });
        };

        let mut categories = Vec::with_capacity(entries.len());
        for (name, seeds) in entries {
            match Self::validate_seeds(&seeds, graph) {
                Ok(seeds) => categories.push(Category { name, seeds }),
                Err(reason) => {
                    warn!("⚠️ Skipping category '{}': {}", name, reason);
                }
            }
        }

        Ok(Self { categories })
    }

    fn validate_seeds(seeds: &Value, graph: &LexicalGraph) -> Result<Vec<String>, String> {
        let Value::Array(items) = seeds else {
            return Err("seed list is not an array".to_string());
        };

        items
            .iter()
            .map(|item| match item {
                Value::String(id) => graph
                    .resolve(id)
                    .map(str::to_string)
                    .ok_or_else(|| format!("unknown concept '{}'", id)),
                other => Err(format!("seed {} is not a string", other)),
            })
            .collect()
    }

    /// Build a map directly, without graph validation
    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Categories in configuration order
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}
