// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Lexical category index
//!
//! Folds fine-grained model labels into configured general categories by
//! walking a WordNet-style hypernym graph.

pub mod category_map;
pub mod graph;
pub mod index;
pub mod wordnet;

pub use category_map::{Category, CategoryMap};
pub use graph::{normalize_word, Concept, LexicalGraph};
pub use index::CategoryIndex;
