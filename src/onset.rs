//! Vowel/consonant onset classification
//!
//! English and French need to know whether a word starts with a vowel sound
//! to choose between `a`/`an` and to elide `le`/`la`/`de`. The word lists are
//! derived from a pronunciation dictionary (one JSON record per line) by
//! looking at the first IPA symbol of each attested pronunciation. Words that
//! are not listed fall back to their first letter.

use crate::config::Language;
use crate::lexicon::LexiconError;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::io::BufRead;

const ENGLISH_IPA_VOWELS: &[char] = &[
    'a', 'e', 'i', 'o', 'u', 'y', 'ä', 'æ', 'õ', 'ĩ', 'ũ', 'ɐ', 'ɑ', 'ɒ', 'ɔ', 'ɘ', 'ə', 'ɚ', 'ɛ',
    'ɜ', 'ɝ', 'ɤ', 'ɨ', 'ɵ', 'ʉ', 'ʊ', 'ʌ', 'ø', 'ɞ',
];

const ENGLISH_IPA_CONSONANTS: &[char] = &[
    'b', 'c', 'd', 'f', 'h', 'j', 'k', 'l', 'm', 'n', 'p', 'r', 's', 't', 'v', 'w', 'x', 'z', 'ŋ',
    'ʒ', 'ç', 'ð', 'ɕ', 'ɖ', 'ɡ', 'ɫ', 'ɬ', 'ɯ', 'ɲ', 'ɸ', 'ɻ', 'ɾ', 'ʁ', 'ʃ', 'ʈ', 'ʍ', 'ʔ', 'ʙ',
    'ˀ', 'θ', 'χ', 'ẽ', 'q', 'ɓ', 'ɦ', 'ʋ',
];

// semivowels w and ɥ elide in French (l'oiseau, l'huile), j does not (le yaourt)
const FRENCH_IPA_VOWELS: &[char] = &[
    'a', 'e', 'i', 'o', 'u', 'y', 'ø', 'œ', 'ɑ', 'ɔ', 'ə', 'ɛ', 'w', 'ɥ',
];

const FRENCH_IPA_CONSONANTS: &[char] = &[
    'b', 'd', 'f', 'ɡ', 'g', 'k', 'l', 'm', 'n', 'ɲ', 'ŋ', 'p', 'ʁ', 'r', 's', 'ʃ', 't', 'v', 'z',
    'ʒ', 'j', 'h', 'ʔ', 'x',
];

const ENGLISH_NOT_VOWEL_INITIAL: &[&str] = &[
    "had", "hang", "hangnail", "has", "hasta", "have", "haver", "he", "her", "herbal", "herbary",
    "hers", "herself", "him", "his", "language", "languages", "unionised", "unionized", "would",
    "xennial", "yeast", "yem", "yere", "smail", "thank you",
];

const ENGLISH_NOT_CONSONANT_INITIAL: &[&str] = &["xor", "olive"];

pub const ENGLISH_CONSONANT_LETTERS: &str = "bcdfghjklmnpqrstvwxyz";

const FRENCH_VOWEL_LETTERS: &str = "aeiouyàâäéèêëîïôöùûüÿæœ";

const STRESS_MARKS: &[char] = &['ˈ', 'ˌ'];

#[derive(Debug, Deserialize)]
struct PronunciationRecord {
    word: String,
    #[serde(default)]
    pos: Option<String>,
    #[serde(default)]
    sounds: Vec<Sound>,
}

#[derive(Debug, Deserialize)]
struct Sound {
    #[serde(default)]
    ipa: Option<String>,
}

/// First phonetic symbol of an IPA transcription, ignoring brackets and stress
pub fn first_ipa_symbol(ipa: &str) -> Option<char> {
    let ipa = ipa
        .strip_prefix('/')
        .or_else(|| ipa.strip_prefix('['))
        .unwrap_or(ipa);
    ipa.trim_start_matches(STRESS_MARKS).chars().next()
}

fn first_char_lower(word: &str) -> Option<char> {
    word.chars().next().and_then(|c| c.to_lowercase().next())
}

/// Word lists for one language
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OnsetClassifier {
    language: Option<Language>,
    vowel_words: FxHashSet<String>,
    consonant_words: FxHashSet<String>,
    mute_h: FxHashSet<String>,
    aspirated_h: FxHashSet<String>,
    /// word -> (part of speech, transcription)
    ipa: FxHashMap<String, Vec<(Option<String>, String)>>,
}

impl OnsetClassifier {
    /// Classifier with no word lists; every decision uses the first letter
    pub fn letters_only(language: Language) -> Self {
        Self {
            language: Some(language),
            ..Self::default()
        }
    }

    /// Build the word lists from a pronunciation dictionary
    pub fn from_jsonl<R: BufRead>(language: Language, reader: R) -> Result<Self, LexiconError> {
        let (vowel_symbols, consonant_symbols) = match language {
            Language::French => (FRENCH_IPA_VOWELS, FRENCH_IPA_CONSONANTS),
            _ => (ENGLISH_IPA_VOWELS, ENGLISH_IPA_CONSONANTS),
        };

        let mut classifier = Self::letters_only(language);
        // word -> (attested vowel onset, attested consonant onset)
        let mut onsets: FxHashMap<String, (bool, bool)> = FxHashMap::default();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: PronunciationRecord =
                serde_json::from_str(&line).map_err(|source| LexiconError::Json {
                    line_num: line_num + 1,
                    source,
                })?;

            if language == Language::French {
                let lowered = line.to_lowercase();
                let word = record.word.to_lowercase();
                if lowered.contains("aspirated h") || lowered.contains("h aspiré") {
                    classifier.aspirated_h.insert(word);
                } else if lowered.contains("mute h") || lowered.contains("h muet") {
                    classifier.mute_h.insert(word);
                }
            }

            for ipa in record.sounds.iter().filter_map(|s| s.ipa.as_deref()) {
                if language == Language::French {
                    classifier
                        .ipa
                        .entry(record.word.to_lowercase())
                        .or_default()
                        .push((record.pos.clone(), ipa.to_string()));
                }
                let Some(symbol) = first_ipa_symbol(ipa) else {
                    continue;
                };
                let flags = onsets.entry(record.word.clone()).or_default();
                if vowel_symbols.contains(&symbol) {
                    flags.0 = true;
                } else if consonant_symbols.contains(&symbol) {
                    flags.1 = true;
                }
            }
        }

        for (word, (mut vowel, mut consonant)) in onsets {
            if vowel && consonant {
                match word.chars().next() {
                    _ if word.chars().count() == 1 => consonant = false,
                    Some('A' | 'I' | 'a') => consonant = false,
                    Some('E' | 'c' | 'd') => vowel = false,
                    _ => {}
                }
            }
            if language == Language::English {
                if ENGLISH_NOT_VOWEL_INITIAL.contains(&word.as_str()) {
                    vowel = false;
                }
                if ENGLISH_NOT_CONSONANT_INITIAL.contains(&word.as_str()) {
                    consonant = false;
                }
            }
            let word = word.to_lowercase();
            if vowel {
                classifier.vowel_words.insert(word.clone());
            }
            if consonant {
                classifier.consonant_words.insert(word);
            }
        }

        log::info!(
            "onset lists: {} vowel-initial, {} consonant-initial words",
            classifier.vowel_words.len(),
            classifier.consonant_words.len()
        );
        Ok(classifier)
    }

    /// Listed as having a vowel-initial pronunciation
    pub fn starts_with_vowel(&self, word: &str) -> bool {
        self.vowel_words.contains(&word.to_lowercase())
    }

    /// Listed as having a consonant-initial pronunciation
    pub fn starts_with_consonant(&self, word: &str) -> bool {
        self.consonant_words.contains(&word.to_lowercase())
    }

    /// Listed as vowel-initial, or the first letter is not a consonant letter
    pub fn likely_starts_with_vowel(&self, word: &str) -> bool {
        self.starts_with_vowel(word)
            || first_char_lower(word).is_some_and(|c| !ENGLISH_CONSONANT_LETTERS.contains(c))
    }

    /// Listed as consonant-initial, or the first letter is a consonant letter
    pub fn likely_starts_with_consonant(&self, word: &str) -> bool {
        self.starts_with_consonant(word)
            || first_char_lower(word).is_some_and(|c| ENGLISH_CONSONANT_LETTERS.contains(c))
    }

    pub fn is_aspirated_h(&self, word: &str) -> bool {
        self.aspirated_h.contains(&word.to_lowercase())
    }

    /// An h-initial word is mute unless listed as aspirated
    pub fn is_mute_h(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        word.starts_with('h') && (self.mute_h.contains(&word) || !self.aspirated_h.contains(&word))
    }

    /// Transcriptions of `word`, restricted to `pos` when given
    pub fn lookup_ipa(&self, word: &str, pos: Option<&str>) -> Vec<&str> {
        self.ipa
            .get(&word.to_lowercase())
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(p, _)| pos.is_none_or(|pos| p.as_deref() == Some(pos)))
                    .map(|(_, ipa)| ipa.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the word should be treated as starting with a vowel sound
    ///
    /// A listed vowel onset wins over a listed consonant onset, since only
    /// words whose conflict could not be resolved end up in both lists.
    pub fn starts_with_vowel_sound(&self, word: &str) -> bool {
        match self.language {
            Some(Language::French) => self.elides(word),
            _ => {
                if self.starts_with_vowel(word) {
                    true
                } else if self.starts_with_consonant(word) {
                    false
                } else {
                    self.likely_starts_with_vowel(word)
                }
            }
        }
    }

    /// French: whether `le`/`la`/`de` elide before `word`
    pub fn elides(&self, word: &str) -> bool {
        let Some(first) = first_char_lower(word) else {
            return false;
        };
        if first == 'h' {
            return self.is_mute_h(word);
        }
        if self.starts_with_vowel(word) {
            return true;
        }
        if self.starts_with_consonant(word) {
            return false;
        }
        FRENCH_VOWEL_LETTERS.contains(first)
    }
}
