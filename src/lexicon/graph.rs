// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! WordNet-derived noun hypernym graph
//!
//! Loaded from a tab-separated resource, one concept per line:
//!
//! ```text
//! # id          lemmas                     hypernyms
//! dog.n.01      dog,domestic_dog           canine.n.02,domestic_animal.n.01
//! ```
//!
//! A lemma's senses keep file order; the first concept naming a lemma is its
//! primary sense. Hypernym ids are not required to name a concept; reaching a
//! missing one during a closure is a lookup error.
//!
//! A directory is read as a WordNet dictionary instead (see [`super::wordnet`]).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::info;

use crate::error::{ConfigurationError, LexicalLookupError};

/// One word sense and its direct hypernyms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    pub id: String,
    pub lemmas: Vec<String>,
    pub hypernyms: Vec<String>,
}

/// Read-only concept graph with a lemma index
#[derive(Debug, Clone, Default)]
pub struct LexicalGraph {
    concepts: Vec<Concept>,
    by_id: HashMap<String, usize>,
    senses: HashMap<String, Vec<usize>>,
    /// Irregular plural to base forms (`mice` -> `mouse`)
    exceptions: HashMap<String, Vec<String>>,
}

/// Noun detachment rules: (suffix, replacement)
const NOUN_SUFFIXES: [(&str, &str); 9] = [
    ("s", ""),
    ("ses", "s"),
    ("ves", "f"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

/// Lowercase, trim and join words with underscores
pub fn normalize_word(word: &str) -> String {
    word.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

impl LexicalGraph {
    /// Load the graph from a TSV file or a WordNet dictionary directory
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        if path.is_dir() {
            return super::wordnet::load_dict(path);
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::from_io(path, e))?;
        let graph = Self::parse(&content, path)?;

        info!(
            "✅ Lexical graph loaded from {} ({} concepts, {} lemmas)",
            path.display(),
            graph.len(),
            graph.senses.len()
        );

        Ok(graph)
    }

    /// Parse TSV content; `origin` names the resource in errors
    pub fn parse(content: &str, origin: &Path) -> Result<Self, ConfigurationError> {
        let mut graph = Self::default();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }

            let parse_error = |message: String| ConfigurationError::Parse {
                path: origin.to_path_buf(),
                message: format!("line {}: {}", lineno + 1, message),
            };

            let columns: Vec<&str> = line.split('\t').collect();
            if columns.len() < 2 {
                return Err(parse_error(
                    "expected <id> TAB <lemmas> [TAB <hypernyms>]".to_string(),
                ));
            }

            let id = columns[0].trim();
            if id.is_empty() {
                return Err(parse_error("empty concept id".to_string()));
            }
            if graph.by_id.contains_key(id) {
                return Err(parse_error(format!("duplicate concept id '{}'", id)));
            }

            let split_list = |column: Option<&&str>| -> Vec<String> {
                column
                    .map(|c| {
                        c.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default()
            };

            let lemmas: Vec<String> = split_list(columns.get(1))
                .into_iter()
                .map(|l| l.to_lowercase())
                .collect();
            let hypernyms = split_list(columns.get(2));

            graph.insert(Concept {
                id: id.to_string(),
                lemmas,
                hypernyms,
            });
        }

        Ok(graph)
    }

    /// Build a graph whose sense order comes from a separate lemma index
    ///
    /// `senses` lists each lemma's concept ids, primary first. Ids that name
    /// no concept fail with a parse error.
    pub(crate) fn from_indexed(
        concepts: Vec<Concept>,
        senses: Vec<(String, Vec<String>)>,
        exceptions: HashMap<String, Vec<String>>,
        origin: &Path,
    ) -> Result<Self, ConfigurationError> {
        let mut graph = Self {
            exceptions,
            ..Self::default()
        };
        for concept in concepts {
            graph.by_id.insert(concept.id.clone(), graph.concepts.len());
            graph.concepts.push(concept);
        }

        for (lemma, ids) in senses {
            let indices = ids
                .iter()
                .map(|id| {
                    graph.by_id.get(id).copied().ok_or_else(|| ConfigurationError::Parse {
                        path: origin.to_path_buf(),
                        message: format!("lemma '{}' lists unknown concept '{}'", lemma, id),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            graph.senses.insert(lemma, indices);
        }

        Ok(graph)
    }

    fn insert(&mut self, concept: Concept) {
        let index = self.concepts.len();
        for lemma in &concept.lemmas {
            let senses = self.senses.entry(lemma.clone()).or_default();
            if !senses.contains(&index) {
                senses.push(index);
            }
        }
        self.by_id.insert(concept.id.clone(), index);
        self.concepts.push(concept);
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// True when `id` names a concept in the graph
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.by_id.get(id).map(|&i| &self.concepts[i])
    }

    /// Canonical id for a concept name
    ///
    /// Exact ids resolve to themselves. Otherwise `lemma.n.NN` names the
    /// NN-th sense of `lemma`, so `domestic_dog.n.01` resolves to `dog.n.01`.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        if let Some(&index) = self.by_id.get(name) {
            return Some(self.concepts[index].id.as_str());
        }

        let lowered = name.trim().to_lowercase();
        let mut parts = lowered.rsplitn(3, '.');
        let sense = parts.next()?.parse::<usize>().ok()?;
        let pos = parts.next()?;
        let lemma = parts.next()?;
        if pos != "n" || sense == 0 {
            return None;
        }

        self.senses
            .get(lemma)
            .and_then(|indices| indices.get(sense - 1))
            .map(|&i| self.concepts[i].id.as_str())
    }

    /// All senses of a normalized lemma, primary first
    pub fn senses(&self, lemma: &str) -> Vec<&str> {
        self.senses
            .get(lemma)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| self.concepts[i].id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Base-form candidates for a plural noun, in rule order
    pub fn morphy_candidates(word: &str) -> Vec<String> {
        let mut candidates = Vec::new();
        for (suffix, replacement) in NOUN_SUFFIXES {
            if let Some(stem) = word.strip_suffix(suffix) {
                if stem.is_empty() {
                    continue;
                }
                let candidate = format!("{}{}", stem, replacement);
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
        candidates
    }

    /// Primary concept of a word, falling back to noun base forms
    ///
    /// An irregular form listed in the exception table only tries its listed
    /// bases; other words try the detachment rules. Returns `Ok(None)` when
    /// neither the word nor any base form is known.
    pub fn primary_sense(&self, word: &str) -> Result<Option<&str>, LexicalLookupError> {
        let normalized = normalize_word(word);
        if normalized.is_empty() {
            return Err(LexicalLookupError::EmptyWord);
        }

        if let Some(&first) = self.senses.get(&normalized).and_then(|s| s.first()) {
            return Ok(Some(self.concepts[first].id.as_str()));
        }

        let bases = match self.exceptions.get(&normalized) {
            Some(bases) => bases.clone(),
            None => Self::morphy_candidates(&normalized),
        };

        Ok(bases
            .iter()
            .find_map(|candidate| self.senses.get(candidate).and_then(|s| s.first()))
            .map(|&i| self.concepts[i].id.as_str()))
    }

    /// The concept plus every concept reachable along hypernym edges
    pub fn ancestors(&self, id: &str) -> Result<HashSet<&str>, LexicalLookupError> {
        let start = *self
            .by_id
            .get(id)
            .ok_or_else(|| LexicalLookupError::UnknownConcept(id.to_string()))?;

        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack = vec![start];

        while let Some(index) = stack.pop() {
            let concept = &self.concepts[index];
            if !visited.insert(concept.id.as_str()) {
                continue;
            }

            for parent in &concept.hypernyms {
                let parent_index = *self
                    .by_id
                    .get(parent)
                    .ok_or_else(|| LexicalLookupError::UnknownConcept(parent.clone()))?;
                if !visited.contains(self.concepts[parent_index].id.as_str()) {
                    stack.push(parent_index);
                }
            }
        }

        Ok(visited)
    }
}
