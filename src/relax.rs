//! Per-language feature relaxation
//!
//! Given the lexicon entries for one lemma and the feature set required by
//! the token being replaced, pick the surface forms that fit. When nothing
//! fits, each language drops features in its own fixed order and tries
//! again. A dropped feature stays dropped for the rest of the call.

use crate::config::Language;
use crate::features::{Features, subset_match};
use crate::lexicon::LexEntry;
use crate::tree::Token;
use std::fmt::Debug;

/// Filter candidates for one lookup, relaxing the target features as needed
pub trait MorphologicalRelaxation: Debug + Send + Sync {
    fn select<'e>(&self, token: &Token, candidates: &[&'e LexEntry], target: Features)
    -> Vec<&'e str>;
}

/// The relaxation rules for a language
pub fn for_language(language: Language) -> Box<dyn MorphologicalRelaxation> {
    match language {
        Language::Arabic => Box::new(ArabicRelaxation),
        Language::German => Box::new(GermanRelaxation),
        Language::English => Box::new(EnglishRelaxation),
        Language::Russian => Box::new(RussianRelaxation),
        Language::French | Language::Indonesian => Box::new(PlainMatching),
    }
}

fn matching_forms<'e>(candidates: &[&'e LexEntry], target: &Features) -> Vec<&'e str> {
    candidates
        .iter()
        .filter(|entry| subset_match(target, &entry.feats))
        .map(|entry| entry.form.as_str())
        .collect()
}

/// Remove `key` from `target` if it currently has `value`
fn drop_if(target: &mut Features, key: &str, value: &str) {
    if target.get(key).is_some_and(|v| v == value) {
        target.remove(key);
    }
}

/// Exact subset matching with no fallback
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainMatching;

impl MorphologicalRelaxation for PlainMatching {
    fn select<'e>(
        &self,
        _token: &Token,
        candidates: &[&'e LexEntry],
        target: Features,
    ) -> Vec<&'e str> {
        matching_forms(candidates, &target)
    }
}

/// Finite verbs match without `VerbForm`, past tense verbs without person and number
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishRelaxation;

impl MorphologicalRelaxation for EnglishRelaxation {
    fn select<'e>(
        &self,
        token: &Token,
        candidates: &[&'e LexEntry],
        mut target: Features,
    ) -> Vec<&'e str> {
        if token.upos == "VERB" {
            drop_if(&mut target, "VerbForm", "Fin");
            if target.get("Tense").is_some_and(|t| t == "Past") {
                target.remove("Person");
                target.remove("Number");
            }
        }
        matching_forms(candidates, &target)
    }
}

/// Adjective endings that mark strong/weak inflection
pub const GERMAN_ADJ_SUFFIXES: [&str; 5] = ["er", "em", "en", "e", "es"];

/// "e" for forms ending in e, otherwise the last two characters
pub fn german_adj_suffix(form: &str) -> &str {
    if form.ends_with('e') {
        return "e";
    }
    let start = form
        .char_indices()
        .rev()
        .nth(1)
        .map_or(0, |(idx, _)| idx);
    &form[start..]
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GermanRelaxation;

impl GermanRelaxation {
    /// Subset match where a candidate without `Degree` counts as `Degree=Pos`
    fn matches_with_default_degree(target: &Features, candidate: &Features) -> bool {
        target.iter().all(|(key, value)| match candidate.get(key) {
            Some(v) => v == value,
            None => key == "Degree" && value == "Pos",
        })
    }
}

impl MorphologicalRelaxation for GermanRelaxation {
    fn select<'e>(
        &self,
        token: &Token,
        candidates: &[&'e LexEntry],
        mut target: Features,
    ) -> Vec<&'e str> {
        match token.upos.as_str() {
            "NOUN" | "PROPN" => {
                target.remove("Person");
            }
            "VERB" => drop_if(&mut target, "VerbForm", "Fin"),
            _ => {}
        }

        let mut forms = matching_forms(candidates, &target);
        if token.upos != "ADJ" {
            return forms;
        }

        if forms.is_empty() {
            forms = candidates
                .iter()
                .filter(|entry| Self::matches_with_default_degree(&target, &entry.feats))
                .map(|entry| entry.form.as_str())
                .collect();
        }

        let old_suffix = german_adj_suffix(&token.form);
        if GERMAN_ADJ_SUFFIXES.contains(&old_suffix) {
            let same_suffix: Vec<&str> = forms
                .iter()
                .copied()
                .filter(|form| german_adj_suffix(form) == old_suffix)
                .collect();
            if !same_suffix.is_empty() {
                forms = same_suffix;
            }
        }
        forms
    }
}

/// `Definite` is never required; verbs fall back to ignoring aspect, finiteness and mood
#[derive(Debug, Clone, Copy, Default)]
pub struct ArabicRelaxation;

impl MorphologicalRelaxation for ArabicRelaxation {
    fn select<'e>(
        &self,
        token: &Token,
        candidates: &[&'e LexEntry],
        mut target: Features,
    ) -> Vec<&'e str> {
        target.remove("Definite");
        let forms = matching_forms(candidates, &target);
        if !forms.is_empty() || token.upos != "VERB" {
            return forms;
        }

        target.remove("Aspect");
        drop_if(&mut target, "VerbForm", "Fin");
        drop_if(&mut target, "Mood", "Ind");
        matching_forms(candidates, &target)
    }
}

const RUSSIAN_REFLEXIVE_SUFFIXES: [&str; 2] = ["ся", "сь"];

/// (feature, default value, whether an unset target also qualifies)
const RUSSIAN_VERB_STEPS: [(&str, &str, bool); 4] = [
    ("VerbForm", "Fin", true),
    ("Aspect", "Imp", false),
    ("Mood", "Ind", true),
    ("Voice", "Act", true),
];

fn is_reflexive(form: &str) -> bool {
    RUSSIAN_REFLEXIVE_SUFFIXES
        .iter()
        .any(|suffix| form.ends_with(suffix))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RussianRelaxation;

impl MorphologicalRelaxation for RussianRelaxation {
    fn select<'e>(
        &self,
        token: &Token,
        candidates: &[&'e LexEntry],
        mut target: Features,
    ) -> Vec<&'e str> {
        let mut forms = matching_forms(candidates, &target);

        if forms.is_empty() && token.upos == "PROPN" {
            target.remove("Animacy");
            forms = matching_forms(candidates, &target);
        }
        if forms.is_empty()
            && matches!(token.upos.as_str(), "ADJ" | "ADV")
            && target.get("Degree").is_some_and(|d| d == "Pos")
        {
            target.remove("Degree");
            forms = matching_forms(candidates, &target);
        }
        if !forms.is_empty() || token.upos != "VERB" {
            return forms;
        }

        // reflexive verbs are only replaced by reflexive forms and vice versa
        let reflexive = is_reflexive(&token.form);
        let mut pool: Vec<&'e LexEntry> = candidates
            .iter()
            .copied()
            .filter(|entry| is_reflexive(&entry.form) == reflexive)
            .collect();

        for (key, default, unset_qualifies) in RUSSIAN_VERB_STEPS {
            if !forms.is_empty() {
                break;
            }
            let applies = match target.get(key) {
                Some(value) => value == default,
                None => unset_qualifies,
            };
            if !applies {
                continue;
            }
            target.remove(key);
            pool.retain(|entry| entry.feats.get(key).is_none_or(|v| v == default));
            forms = matching_forms(&pool, &target);
        }
        forms
    }
}
