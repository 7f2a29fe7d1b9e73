// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Word to general category lookup

use std::path::Path;

use tracing::{debug, warn};

use super::category_map::CategoryMap;
use super::graph::LexicalGraph;
use crate::error::{ConfigurationError, LexicalLookupError};

/// Lexical graph plus category map, immutable after construction
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    graph: LexicalGraph,
    map: CategoryMap,
}

impl CategoryIndex {
    pub fn new(graph: LexicalGraph, map: CategoryMap) -> Self {
        Self { graph, map }
    }

    /// Load the lexicon, then the category map validated against it
    pub fn load(lexicon: &Path, category_map: &Path) -> Result<Self, ConfigurationError> {
        let graph = LexicalGraph::load(lexicon)?;
        let map = CategoryMap::load(category_map, &graph)?;
        Ok(Self::new(graph, map))
    }

    pub fn graph(&self) -> &LexicalGraph {
        &self.graph
    }

    pub fn category_map(&self) -> &CategoryMap {
        &self.map
    }

    /// First configured category whose seeds include an ancestor of the word's
    /// primary sense
    ///
    /// Lookup errors are logged and treated as no match.
    pub fn classify(&self, word: &str) -> Option<&str> {
        match self.try_classify(word) {
            Ok(category) => category,
            Err(LexicalLookupError::EmptyWord) => {
                debug!("Skipping empty label");
                None
            }
            Err(e) => {
                warn!("⚠️ Lexical lookup failed for '{}': {}", word, e);
                None
            }
        }
    }

    /// Like [`classify`](Self::classify) but surfaces lookup errors
    pub fn try_classify(&self, word: &str) -> Result<Option<&str>, LexicalLookupError> {
        let Some(concept) = self.graph.primary_sense(word)? else {
            return Ok(None);
        };
        let closure = self.graph.ancestors(concept)?;

        Ok(self
            .map
            .categories()
            .iter()
            .find(|category| category.seeds.iter().any(|seed| closure.contains(seed.as_str())))
            .map(|category| category.name.as_str()))
    }
}
