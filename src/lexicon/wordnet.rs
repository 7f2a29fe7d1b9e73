// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! WordNet noun dictionary reader
//!
//! Builds a [`LexicalGraph`] straight from a WordNet 3.0 `dict/` directory:
//!
//! - `index.noun` - lemma to synset offsets, most frequent sense first
//! - `data.noun` - one synset per line with its words and pointers
//! - `noun.exc` - irregular plurals (optional)
//!
//! Synsets are named `lemma.n.NN` after their first word, where NN is the
//! synset's position in that word's index entry. Only plain `@` hypernym
//! pointers become graph edges; instance hypernyms (`@i`) do not.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::graph::{Concept, LexicalGraph};
use crate::error::ConfigurationError;

pub const INDEX_FILE: &str = "index.noun";
pub const DATA_FILE: &str = "data.noun";
pub const EXCEPTION_FILE: &str = "noun.exc";

const HYPERNYM_POINTER: &str = "@";

/// Whitespace token cursor with field names in its errors
struct Fields<'a> {
    tokens: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            tokens: line.split_whitespace(),
        }
    }

    fn next(&mut self, what: &str) -> Result<&'a str, String> {
        self.tokens.next().ok_or_else(|| format!("missing {}", what))
    }

    fn count(&mut self, what: &str, radix: u32) -> Result<usize, String> {
        let token = self.next(what)?;
        usize::from_str_radix(token, radix).map_err(|_| format!("bad {} '{}'", what, token))
    }
}

/// Synset as written in `data.noun`, pointers still as offsets
#[derive(Debug)]
struct RawSynset {
    offset: String,
    words: Vec<String>,
    hypernyms: Vec<String>,
}

fn parse_data_line(line: &str) -> Result<RawSynset, String> {
    let fields = line.split('|').next().unwrap_or(line);
    let mut fields = Fields::new(fields);

    let offset = fields.next("synset offset")?.to_string();
    fields.next("lexicographer file number")?;
    let ss_type = fields.next("synset type")?;
    if ss_type != "n" {
        return Err(format!("synset {} has type '{}', expected 'n'", offset, ss_type));
    }

    let word_count = fields.count("word count", 16)?;
    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        let word = fields.next("word")?.to_lowercase();
        fields.next("lex id")?;
        if !words.contains(&word) {
            words.push(word);
        }
    }
    if words.is_empty() {
        return Err(format!("synset {} has no words", offset));
    }

    let pointer_count = fields.count("pointer count", 10)?;
    let mut hypernyms = Vec::new();
    for _ in 0..pointer_count {
        let symbol = fields.next("pointer symbol")?;
        let target = fields.next("pointer offset")?;
        let pos = fields.next("pointer part of speech")?;
        fields.next("pointer source/target")?;
        if symbol == HYPERNYM_POINTER && pos == "n" {
            hypernyms.push(target.to_string());
        }
    }

    Ok(RawSynset {
        offset,
        words,
        hypernyms,
    })
}

fn parse_index_line(line: &str) -> Result<(String, Vec<String>), String> {
    let mut fields = Fields::new(line);

    let lemma = fields.next("lemma")?.to_lowercase();
    fields.next("part of speech")?;
    let synset_count = fields.count("synset count", 10)?;
    let pointer_count = fields.count("pointer count", 10)?;
    for _ in 0..pointer_count {
        fields.next("pointer symbol")?;
    }
    fields.next("sense count")?;
    fields.next("tagged sense count")?;

    let offsets = (0..synset_count)
        .map(|_| fields.next("synset offset").map(str::to_string))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((lemma, offsets))
}

/// `inflected base [base...]` lines; malformed lines are skipped
fn parse_exceptions(content: &str) -> HashMap<String, Vec<String>> {
    let mut exceptions: HashMap<String, Vec<String>> = HashMap::new();
    for line in content.lines() {
        let mut tokens = line.split_whitespace();
        let Some(inflected) = tokens.next() else {
            continue;
        };
        let bases: Vec<String> = tokens.map(str::to_lowercase).collect();
        if bases.is_empty() {
            continue;
        }
        exceptions
            .entry(inflected.to_lowercase())
            .or_default()
            .extend(bases);
    }
    exceptions
}

/// Dictionary lines, skipping the indented license header
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with(' '))
}

fn parse_error(path: &Path, message: String) -> ConfigurationError {
    ConfigurationError::Parse {
        path: path.to_path_buf(),
        message,
    }
}

/// Build the graph from dictionary file contents
///
/// `dir` only names the files in errors.
pub fn parse_dict(
    index: &str,
    data: &str,
    exceptions: Option<&str>,
    dir: &Path,
) -> Result<LexicalGraph, ConfigurationError> {
    let index_path = dir.join(INDEX_FILE);
    let data_path = dir.join(DATA_FILE);

    let mut entries: Vec<(String, Vec<String>)> = Vec::new();
    for (lineno, line) in records(index) {
        let entry = parse_index_line(line)
            .map_err(|e| parse_error(&index_path, format!("line {}: {}", lineno, e)))?;
        entries.push(entry);
    }
    let positions: HashMap<&str, &[String]> = entries
        .iter()
        .map(|(lemma, offsets)| (lemma.as_str(), offsets.as_slice()))
        .collect();

    let mut synsets = Vec::new();
    for (lineno, line) in records(data) {
        let synset = parse_data_line(line)
            .map_err(|e| parse_error(&data_path, format!("line {}: {}", lineno, e)))?;
        synsets.push(synset);
    }

    let mut names: HashMap<&str, String> = HashMap::with_capacity(synsets.len());
    for synset in &synsets {
        let lemma = &synset.words[0];
        let sense = positions
            .get(lemma.as_str())
            .and_then(|offsets| offsets.iter().position(|o| *o == synset.offset))
            .ok_or_else(|| {
                parse_error(
                    &index_path,
                    format!(
                        "synset {} is not listed under '{}'",
                        synset.offset, lemma
                    ),
                )
            })?;
        names.insert(synset.offset.as_str(), format!("{}.n.{:02}", lemma, sense + 1));
    }

    let name_of = |offset: &str, path: &PathBuf| -> Result<String, ConfigurationError> {
        names
            .get(offset)
            .cloned()
            .ok_or_else(|| parse_error(path, format!("unknown synset offset {}", offset)))
    };

    let concepts = synsets
        .iter()
        .map(|synset| -> Result<Concept, ConfigurationError> {
            Ok(Concept {
                id: name_of(&synset.offset, &data_path)?,
                lemmas: synset.words.clone(),
                hypernyms: synset
                    .hypernyms
                    .iter()
                    .map(|offset| name_of(offset, &data_path))
                    .collect::<Result<Vec<_>, _>>()?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let senses = entries
        .iter()
        .map(|(lemma, offsets)| -> Result<(String, Vec<String>), ConfigurationError> {
            let ids = offsets
                .iter()
                .map(|offset| name_of(offset, &index_path))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((lemma.clone(), ids))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let exceptions = exceptions.map(parse_exceptions).unwrap_or_default();

    LexicalGraph::from_indexed(concepts, senses, exceptions, dir)
}

fn read(path: &Path) -> Result<String, ConfigurationError> {
    fs::read_to_string(path).map_err(|e| ConfigurationError::from_io(path, e))
}

/// Load the noun graph from a WordNet `dict/` directory
pub fn load_dict(dir: &Path) -> Result<LexicalGraph, ConfigurationError> {
    let index = read(&dir.join(INDEX_FILE))?;
    let data = read(&dir.join(DATA_FILE))?;

    let exception_path = dir.join(EXCEPTION_FILE);
    let exceptions = match fs::read_to_string(&exception_path) {
        Ok(content) => Some(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No {} in {}, irregular plurals disabled", EXCEPTION_FILE, dir.display());
            None
        }
        Err(e) => return Err(ConfigurationError::from_io(exception_path, e)),
    };

    let graph = parse_dict(&index, &data, exceptions.as_deref(), dir)?;
    info!(
        "✅ WordNet dictionary loaded from {} ({} noun synsets)",
        dir.display(),
        graph.len()
    );
    Ok(graph)
}
