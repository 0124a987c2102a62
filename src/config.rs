//! Per-language configuration
//!
//! Everything here is an immutable value handed to a component's
//! constructor; nothing is looked up from global state at run time.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Languages with dedicated lexicon and post-processing rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Arabic,
    German,
    English,
    French,
    Indonesian,
    Russian,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported language code: {0}")]
pub struct UnknownLanguage(pub String);

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Arabic,
        Language::German,
        Language::English,
        Language::French,
        Language::Indonesian,
        Language::Russian,
    ];

    /// ISO 639-1 code
    pub fn code(self) -> &'static str {
        match self {
            Language::Arabic => "ar",
            Language::German => "de",
            Language::English => "en",
            Language::French => "fr",
            Language::Indonesian => "id",
            Language::Russian => "ru",
        }
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.code() == s)
            .ok_or_else(|| UnknownLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// UD relation groups used to build ignore lists
pub const CORE_ARGUMENTS: &[&str] = &["nsubj", "obj", "iobj", "csubj", "ccomp", "xcomp"];
pub const NON_CORE_DEPENDENTS: &[&str] = &[
    "obl", "vocative", "expl", "dislocated", "advcl", "advmod", "discourse", "aux", "cop", "mark",
];
pub const NOMINAL_DEPENDENTS: &[&str] = &[
    "nmod", "appos", "nummod", "acl", "amod", "det", "clf", "case",
];
pub const OTHERS_IGNORED: &[&str] = &[
    "cc", "punct", "root", "dep", "reparandum", "conj", "list", "parataxis",
];
pub const OTHERS_CONSIDERED: &[&str] = &["compound", "fixed", "flat", "orphan", "goeswith"];

/// How a token's dependents are summarized into a pattern signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Insert the token itself as a `MOTHER` pseudo-dependent at its position
    pub include_self: bool,
    /// Sort the relation labels instead of keeping surface order
    pub ignore_dependent_order: bool,
    /// upos -> child relations left out of the signature
    pub ignored_child_relations: FxHashMap<String, Vec<String>>,
}

impl Default for PatternConfig {
    /// The least restrictive granularity
    fn default() -> Self {
        Self {
            include_self: false,
            ignore_dependent_order: true,
            ignored_child_relations: FxHashMap::default(),
        }
    }
}

fn relation_list(groups: &[&[&str]]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|group| group.iter().map(|r| r.to_string()))
        .collect()
}

impl PatternConfig {
    /// The fixed table of per-language settings
    pub fn for_language(language: Language) -> Self {
        let mut config = Self::default();
        match language {
            Language::Arabic | Language::Indonesian => {}
            Language::German | Language::English => {
                let ignored =
                    relation_list(&[NON_CORE_DEPENDENTS, NOMINAL_DEPENDENTS, OTHERS_IGNORED]);
                config
                    .ignored_child_relations
                    .insert("ADJ".to_string(), ignored.clone());
                config
                    .ignored_child_relations
                    .insert("VERB".to_string(), ignored);
            }
            Language::French => {
                config.include_self = true;
                config.ignore_dependent_order = false;
            }
            Language::Russian => {
                config.ignored_child_relations.insert(
                    "VERB".to_string(),
                    relation_list(&[OTHERS_IGNORED, NOMINAL_DEPENDENTS, NON_CORE_DEPENDENTS]),
                );
            }
        }
        config
    }

    /// Load an override from JSON; missing fields take the defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// True if `relation` should be dropped from the signature of a `upos` token
    pub fn ignores(&self, upos: &str, relation: &str) -> bool {
        self.ignored_child_relations
            .get(upos)
            .is_some_and(|list| list.iter().any(|r| r == relation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        for lang in Language::ALL {
            assert_eq!(lang.code().parse::<Language>().unwrap(), lang);
        }
        assert_eq!(
            "xx".parse::<Language>().unwrap_err(),
            UnknownLanguage("xx".to_string())
        );
    }

    #[test]
    fn test_defaults_least_restrictive() {
        let config = PatternConfig::default();
        assert!(!config.include_self);
        assert!(config.ignore_dependent_order);
        assert!(config.ignored_child_relations.is_empty());
        assert_eq!(PatternConfig::for_language(Language::Arabic), config);
    }

    #[test]
    fn test_language_table() {
        let fr = PatternConfig::for_language(Language::French);
        assert!(fr.include_self);
        assert!(!fr.ignore_dependent_order);

        let en = PatternConfig::for_language(Language::English);
        assert!(en.ignores("VERB", "advmod"));
        assert!(en.ignores("ADJ", "punct"));
        assert!(!en.ignores("VERB", "obj"));
        assert!(!en.ignores("NOUN", "advmod"));

        let ru = PatternConfig::for_language(Language::Russian);
        assert!(ru.ignores("VERB", "conj"));
        assert!(!ru.ignores("ADJ", "conj"));
    }

    #[test]
    fn test_from_json() {
        let config = PatternConfig::from_json(
            r#"{"include_self": true, "ignored_child_relations": {"NOUN": ["det"]}}"#,
        )
        .unwrap();
        assert!(config.include_self);
        assert!(config.ignore_dependent_order);
        assert!(config.ignores("NOUN", "det"));
    }
}
