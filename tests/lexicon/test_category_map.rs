// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Category map loading tests
//!
//! Verifies that categories.json is loaded against the lexical graph:
//! - unresolvable seeds skip their category, other categories survive
//! - syntax errors and missing files are configuration errors naming the path
//! - configuration order is preserved
//! - seeds may name a sense through any of its lemmas
//! - the lexicon may be a WordNet dictionary directory

use std::fs;
use std::path::PathBuf;

use image_categorizer::{CategoryIndex, CategoryMap, ConfigurationError, LexicalGraph};
use tempfile::TempDir;

const LEXICON: &str = "\
# WordNet-style fixture
entity.n.01\tentity\t
physical_entity.n.01\tphysical_entity\tentity.n.01
object.n.01\tobject\tphysical_entity.n.01
organism.n.01\torganism,being\tobject.n.01
animal.n.01\tanimal,beast\torganism.n.01
person.n.01\tperson,individual\torganism.n.01
conveyance.n.03\tconveyance\tobject.n.01
vehicle.n.01\tvehicle\tconveyance.n.03
food.n.01\tfood,nutrient\tphysical_entity.n.01
dog.n.01\tdog,domestic_dog\tanimal.n.01
";

fn write_fixture(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn graph() -> LexicalGraph {
    LexicalGraph::parse(LEXICON, std::path::Path::new("lexicon.tsv")).unwrap()
}

#[cfg(test)]
mod category_map_tests {
    use super::*;

    // =============================================================================
    // Skipping Rules
    // =============================================================================

    /// Test 1: One bad entry among three yields exactly the two good ones
    #[test]
    fn test_one_bad_entry_among_three() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "categories.json",
            r#"{
                "animal": ["animal.n.01"],
                "mythical": ["dragon.n.01"],
                "vehicle": ["vehicle.n.01"]
            }"#,
        );

        let map = CategoryMap::load(&path, &graph()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.names(), vec!["animal", "vehicle"]);
    }

    /// Test 2: A category with one good and one bad seed is skipped as a whole
    #[test]
    fn test_partially_bad_category_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "categories.json",
            r#"{"food": ["food.n.01", "not_a_synset"], "person": ["person.n.01"]}"#,
        );

        let map = CategoryMap::load(&path, &graph()).unwrap();
        assert_eq!(map.names(), vec!["person"]);
    }

    /// Test 3: All entries bad still loads (empty map)
    #[test]
    fn test_all_entries_bad() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "categories.json", r#"{"a": ["x.n.01"], "b": 7}"#);

        let map = CategoryMap::load(&path, &graph()).unwrap();
        assert!(map.is_empty());
    }

    // =============================================================================
    // Fatal Errors
    // =============================================================================

    /// Test 4: Non-JSON content is a parse error identifying the path
    #[test]
    fn test_malformed_json_names_path() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(&dir, "categories.json", "animal = dog.n.01");

        let err = CategoryMap::load(&path, &graph()).unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
        assert!(err.to_string().contains("categories.json"));
    }

    /// Test 5: Missing file is NotFound
    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");

        let err = CategoryMap::load(&path, &graph()).unwrap_err();
        assert!(matches!(err, ConfigurationError::NotFound { .. }));
    }

    /// Test 6: Malformed lexicon fails the whole index load
    #[test]
    fn test_malformed_lexicon_fails_index_load() {
        let dir = TempDir::new().unwrap();
        let lexicon = write_fixture(&dir, "lexicon.tsv", "dog.n.01 dog animal.n.01\n");
        let categories = write_fixture(&dir, "categories.json", r#"{"animal": ["animal.n.01"]}"#);

        let err = CategoryIndex::load(&lexicon, &categories).unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse { .. }));
        assert_eq!(err.path(), lexicon.as_path());
    }

    // =============================================================================
    // Ordering
    // =============================================================================

    /// Test 7: File order is kept, not alphabetical
    #[test]
    fn test_file_order_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "categories.json",
            r#"{"vehicle": ["vehicle.n.01"], "person": ["person.n.01"], "animal": ["animal.n.01"]}"#,
        );

        let map = CategoryMap::load(&path, &graph()).unwrap();
        assert_eq!(map.names(), vec!["vehicle", "person", "animal"]);
        assert_eq!(map.categories()[2].seeds, vec!["animal.n.01"]);
    }

    /// Test 8: Index loads both files from disk
    #[test]
    fn test_index_load_from_files() {
        let dir = TempDir::new().unwrap();
        let lexicon = write_fixture(&dir, "lexicon.tsv", LEXICON);
        let categories = write_fixture(&dir, "categories.json", r#"{"animal": ["animal.n.01"]}"#);

        let index = CategoryIndex::load(&lexicon, &categories).unwrap();
        assert_eq!(index.graph().len(), 10);
        assert_eq!(index.classify("dog"), Some("animal"));
    }

    // =============================================================================
    // Seed Names
    // =============================================================================

    /// Test 9: Lemma-named seeds are stored under the canonical sense id
    #[test]
    fn test_lemma_named_seeds() {
        let dir = TempDir::new().unwrap();
        let path = write_fixture(
            &dir,
            "categories.json",
            r#"{"animal": ["beast.n.01"], "pet": ["domestic_dog.n.01"], "ghost": ["beast.n.02"]}"#,
        );

        let map = CategoryMap::load(&path, &graph()).unwrap();
        assert_eq!(map.names(), vec!["animal", "pet"]);
        assert_eq!(map.categories()[0].seeds, vec!["animal.n.01"]);
        assert_eq!(map.categories()[1].seeds, vec!["dog.n.01"]);
    }

    // =============================================================================
    // WordNet Dictionary
    // =============================================================================

    /// Test 10: Index loads from a WordNet dict directory
    #[test]
    fn test_index_load_from_wordnet_dict() {
        let dir = TempDir::new().unwrap();
        let dict = dir.path().join("dict");
        fs::create_dir(&dict).unwrap();
        fs::write(
            dict.join("index.noun"),
            "  1 This software and database is being provided to you, the LICENSEE, by\n\
             animal n 1 2 @ ~ 1 0 00015388\n\
             beast n 1 2 @ ~ 1 0 00015388\n\
             dog n 1 2 @ ~ 1 0 02084071\n\
             domestic_dog n 1 2 @ ~ 1 0 02084071\n\
             entity n 1 1 ~ 1 0 00001740\n\
             wolf n 1 1 @ 1 0 02114100\n",
        )
        .unwrap();
        fs::write(
            dict.join("data.noun"),
            "  1 This software and database is being provided to you, the LICENSEE, by\n\
             00001740 03 n 01 entity 0 001 ~ 00015388 n 0000 | that which exists\n\
             00015388 03 n 02 animal 0 beast 0 002 @ 00001740 n 0000 ~ 02084071 n 0000 | a living organism\n\
             02084071 05 n 02 dog 0 domestic_dog 0 001 @ 00015388 n 0000 | a member of the genus Canis\n\
             02114100 05 n 01 wolf 0 001 @ 00015388 n 0000 | any of various predatory carnivores\n",
        )
        .unwrap();
        let categories = write_fixture(&dir, "categories.json", r#"{"animal": ["beast.n.01"]}"#);

        let index = CategoryIndex::load(&dict, &categories).unwrap();
        assert_eq!(index.graph().len(), 4);
        assert_eq!(index.classify("dogs"), Some("animal"));
        assert_eq!(index.classify("wolves"), Some("animal"));
        assert_eq!(index.classify("entity"), None);
    }
}
