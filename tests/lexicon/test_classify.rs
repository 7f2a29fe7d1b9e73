// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Word classification tests
//!
//! Labels as produced by the detector and classifier (multi-word, plural,
//! polysemous) folded into general categories.

use std::path::Path;

use image_categorizer::{CategoryIndex, CategoryMap, LexicalGraph};

const LEXICON: &str = "\
entity.n.01\tentity\t
organism.n.01\torganism\tentity.n.01
animal.n.01\tanimal\torganism.n.01
carnivore.n.01\tcarnivore\tanimal.n.01
canine.n.02\tcanine\tcarnivore.n.01
domestic_animal.n.01\tdomestic_animal\tanimal.n.01
dog.n.01\tdog,domestic_dog\tcanine.n.02,domestic_animal.n.01
person.n.01\tperson,individual\torganism.n.01
frump.n.01\tdog,frump\tperson.n.01
artifact.n.01\tartifact\tentity.n.01
instrumentality.n.03\tinstrumentality\tartifact.n.01
conveyance.n.03\tconveyance\tinstrumentality.n.03
vehicle.n.01\tvehicle\tconveyance.n.03
wheeled_vehicle.n.01\twheeled_vehicle\tvehicle.n.01
bicycle.n.01\tbicycle,bike\twheeled_vehicle.n.01
traffic_light.n.01\ttraffic_light,traffic_signal\tartifact.n.01
equipment.n.01\tequipment\tinstrumentality.n.03
sports_equipment.n.01\tsports_equipment\tequipment.n.01
ski.n.01\tski\tsports_equipment.n.01
geological_formation.n.01\tgeological_formation\tentity.n.01
shore.n.01\tshore\tgeological_formation.n.01
seashore.n.01\tseashore,coast,seaside\tshore.n.01
orphan.n.01\torphan\tlimbo.n.01
";

const CATEGORIES: &str = r#"{
    "person": ["person.n.01"],
    "animal": ["animal.n.01"],
    "vehicle": ["vehicle.n.01"],
    "sports": ["sports_equipment.n.01"],
    "nature": ["geological_formation.n.01"],
    "object": ["artifact.n.01"]
}"#;

fn index() -> CategoryIndex {
    let graph = LexicalGraph::parse(LEXICON, Path::new("lexicon.tsv")).unwrap();
    let map = CategoryMap::from_json_str(CATEGORIES, Path::new("categories.json"), &graph).unwrap();
    CategoryIndex::new(graph, map)
}

#[cfg(test)]
mod classify_tests {
    use super::*;

    /// Test 1: Deep hypernym chains resolve
    #[test]
    fn test_deep_chain() {
        let idx = index();
        assert_eq!(idx.classify("bicycle"), Some("vehicle"));
        assert_eq!(idx.classify("bike"), Some("vehicle"));
        assert_eq!(idx.classify("seashore"), Some("nature"));
    }

    /// Test 2: Multi-word detector labels use underscores in the graph
    #[test]
    fn test_multi_word_label() {
        assert_eq!(index().classify("traffic light"), Some("object"));
    }

    /// Test 3: Plural labels resolve through noun base forms
    #[test]
    fn test_plural_label() {
        assert_eq!(index().classify("skis"), Some("sports"));
    }

    /// Test 4: Only the primary sense is used, never the secondary one
    #[test]
    fn test_primary_sense_only() {
        // dog.n.01 is listed first; frump.n.01 (a person) is ignored
        assert_eq!(index().classify("dog"), Some("animal"));
        // "frump" only has the person sense
        assert_eq!(index().classify("frump"), Some("person"));
    }

    /// Test 5: A concept reachable along two hypernym paths matches once
    #[test]
    fn test_shared_ancestor_closure() {
        let idx = index();
        let concept = idx.graph().primary_sense("dog").unwrap().unwrap();
        let closure = idx.graph().ancestors(concept).unwrap();
        assert!(closure.contains("canine.n.02"));
        assert!(closure.contains("domestic_animal.n.01"));
        assert!(closure.contains("entity.n.01"));
        // dog, canine, carnivore, domestic_animal, animal, organism, entity
        assert_eq!(closure.len(), 7);
    }

    /// Test 6: Map order decides between overlapping categories
    #[test]
    fn test_map_order_decides() {
        // "sports" is listed before "object", and ski is under both
        assert_eq!(index().classify("ski"), Some("sports"));
    }

    /// Test 7: Unknown words and graph errors yield no category
    #[test]
    fn test_unknown_and_broken_words() {
        let idx = index();
        assert_eq!(idx.classify("flux capacitor"), None);
        assert_eq!(idx.classify("orphan"), None);
        assert!(idx.try_classify("orphan").is_err());
    }

    /// Test 8: Classification is stable across calls
    #[test]
    fn test_classify_is_deterministic() {
        let idx = index();
        let first: Vec<Option<&str>> = ["dog", "bike", "coast"].iter().map(|w| idx.classify(w)).collect();
        let second: Vec<Option<&str>> = ["dog", "bike", "coast"].iter().map(|w| idx.classify(w)).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![Some("animal"), Some("vehicle"), Some("nature")]);
    }
}
