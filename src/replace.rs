//! Replacement engine
//!
//! For each sentence: mark eligible tokens, try them in random order until
//! the requested fraction is replaced, resolve each syntactic candidate to a
//! surface form through the lexicon, then let the language post-processor
//! fix up neighbouring words and rebuild the `text` comment.

use crate::config::Language;
use crate::index::CandidateSource;
use crate::lexicon::Lexicon;
use crate::postprocess::{self, SentencePostProcessor, uppercase_first};
use crate::tree::{Sentence, Token, TreeError};
use rand::Rng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A tree integrity fault, with the position of the sentence it occurred in
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("sentence {index}: {source}")]
pub struct ReplaceError {
    pub index: usize,
    #[source]
    pub source: TreeError,
}

/// Per-token replacement state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskState {
    Ineligible,
    Eligible,
    /// Replaced in the current pass
    Replaced,
}

impl MaskState {
    /// Numeric code: 0 ineligible, -1 eligible, 1 replaced
    pub fn as_i8(self) -> i8 {
        match self {
            MaskState::Ineligible => 0,
            MaskState::Eligible => -1,
            MaskState::Replaced => 1,
        }
    }
}

/// Eligibility per token
///
/// Without an allow-list everything but punctuation is eligible; with one,
/// membership alone decides.
pub fn create_mask(sentence: &Sentence, upos_filter: Option<&[String]>) -> Vec<MaskState> {
    sentence
        .tokens
        .iter()
        .map(|tok| {
            let eligible = match upos_filter {
                Some(allowed) => allowed.iter().any(|upos| *upos == tok.upos),
                None => tok.upos != "PUNCT",
            };
            if eligible {
                MaskState::Eligible
            } else {
                MaskState::Ineligible
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementOptions {
    /// Share of the eligible tokens to replace
    pub fraction: f64,
    /// Allowed upos tags; `None` means everything but PUNCT
    pub upos_filter: Option<Vec<String>>,
}

impl Default for ReplacementOptions {
    fn default() -> Self {
        Self {
            fraction: 1.0,
            upos_filter: None,
        }
    }
}

/// A token for which no candidate lemma had a fitting form
#[derive(Debug, Clone, PartialEq)]
pub struct LookupFailure {
    pub token: Token,
    /// Number of syntactic candidates that were tried
    pub candidates: usize,
}

/// Diagnostics collected while replacing; never affect replacement decisions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacementStats {
    /// upos -> number of candidates found for each trial token
    pub candidates_per_upos: BTreeMap<String, Vec<usize>>,
    /// upos -> tokens whose candidates all failed the lexicon lookup
    pub lookup_failures: BTreeMap<String, Vec<LookupFailure>>,
}

impl ReplacementStats {
    /// Append another set of statistics
    pub fn merge(&mut self, other: ReplacementStats) {
        for (upos, counts) in other.candidates_per_upos {
            self.candidates_per_upos
                .entry(upos)
                .or_default()
                .extend(counts);
        }
        for (upos, failures) in other.lookup_failures {
            self.lookup_failures
                .entry(upos)
                .or_default()
                .extend(failures);
        }
    }
}

/// Result of one replacement pass over a sentence
#[derive(Debug, Clone, PartialEq)]
pub struct SentenceOutcome {
    pub sentence: Sentence,
    pub mask: Vec<MaskState>,
    pub replaced: usize,
    pub stats: ReplacementStats,
}

/// Result of a pass over many sentences, in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub sentences: Vec<Sentence>,
    pub masks: Vec<Vec<MaskState>>,
    pub stats: ReplacementStats,
}

impl BatchOutcome {
    pub fn push(&mut self, outcome: SentenceOutcome) {
        self.sentences.push(outcome.sentence);
        self.masks.push(outcome.mask);
        self.stats.merge(outcome.stats);
    }

    pub fn extend(&mut self, other: BatchOutcome) {
        self.sentences.extend(other.sentences);
        self.masks.extend(other.masks);
        self.stats.merge(other.stats);
    }
}

/// Most frequent value, earliest on ties
fn most_frequent<'f>(forms: &[&'f str]) -> Option<&'f str> {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for &form in forms {
        *counts.entry(form).or_default() += 1;
    }
    let mut best: Option<(&'f str, usize)> = None;
    for &form in forms {
        let count = counts[form];
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((form, count));
        }
    }
    best.map(|(form, _)| form)
}

/// Replaces words using a candidate source, a lexicon and a post-processor
///
/// All components are borrowed and read-only, so one replacer can be shared
/// between threads.
pub struct Replacer<'a, S> {
    source: &'a S,
    lexicon: Option<&'a Lexicon>,
    options: ReplacementOptions,
    postprocessor: Box<dyn SentencePostProcessor>,
}

impl<'a, S: CandidateSource> Replacer<'a, S> {
    /// Without a lexicon, the first shuffled candidate's form is used as is
    pub fn new(
        language: Language,
        source: &'a S,
        lexicon: Option<&'a Lexicon>,
        options: ReplacementOptions,
    ) -> Self {
        let onsets = lexicon.and_then(|lex| lex.onsets().cloned());
        Self {
            source,
            lexicon,
            options,
            postprocessor: postprocess::for_language(language, onsets),
        }
    }

    pub fn with_postprocessor(mut self, postprocessor: Box<dyn SentencePostProcessor>) -> Self {
        self.postprocessor = postprocessor;
        self
    }

    pub fn options(&self) -> &ReplacementOptions {
        &self.options
    }

    /// Replacement (form, lemma) for the token at `pos`, or `None` to skip it
    fn find_replacement<R: Rng + ?Sized>(
        &self,
        sentence: &Sentence,
        pos: usize,
        stats: &mut ReplacementStats,
        rng: &mut R,
    ) -> Result<Option<(String, String)>, TreeError> {
        let tree = sentence.tree()?;
        let token = &sentence.tokens[pos];

        let mut candidates = self.source.candidates(token, &tree, rng)?;
        candidates.retain(|c| c.lemma != token.lemma);
        stats
            .candidates_per_upos
            .entry(token.upos.clone())
            .or_default()
            .push(candidates.len());
        if candidates.is_empty() {
            return Ok(None);
        }

        candidates.shuffle(rng);
        let Some(lexicon) = self.lexicon else {
            let first = candidates[0];
            return Ok(Some((first.form.to_string(), first.lemma.to_string())));
        };

        let found = candidates.iter().find_map(|candidate| {
            let forms = lexicon.lookup(candidate.lemma, token);
            most_frequent(&forms).map(|form| (form.to_string(), candidate.lemma.to_string()))
        });
        if found.is_none() {
            log::debug!(
                "no form for {:?} ({}) among {} candidates",
                token.form,
                token.upos,
                candidates.len()
            );
            stats
                .lookup_failures
                .entry(token.upos.clone())
                .or_default()
                .push(LookupFailure {
                    token: token.clone(),
                    candidates: candidates.len(),
                });
        }
        Ok(found)
    }

    /// One replacement pass over a copy of `sentence`
    ///
    /// Only `form`, `lemma` and `misc` change; ids and heads are untouched.
    pub fn replace_sentence<R: Rng + ?Sized>(
        &self,
        sentence: &Sentence,
        rng: &mut R,
    ) -> Result<SentenceOutcome, TreeError> {
        let mut sentence = sentence.clone();
        let mut mask = create_mask(&sentence, self.options.upos_filter.as_deref());
        let mut stats = ReplacementStats::default();

        let mut order: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == MaskState::Eligible)
            .map(|(pos, _)| pos)
            .collect();
        order.shuffle(rng);
        let goal = (order.len() as f64 * self.options.fraction) as usize;

        let mut replaced = 0;
        for pos in order {
            if replaced >= goal {
                break;
            }
            let Some((form, lemma)) = self.find_replacement(&sentence, pos, &mut stats, rng)? else {
                continue;
            };
            let token = &mut sentence.tokens[pos];
            token.form = form;
            token.lemma = lemma;
            mask[pos] = MaskState::Replaced;
            replaced += 1;
        }

        if let Some(first) = sentence.tokens.first_mut() {
            if first.form.chars().next().is_some_and(char::is_lowercase) {
                first.form = uppercase_first(&first.form);
            }
        }
        self.postprocessor.postprocess(&mut sentence, &mask);
        sentence.rebuild_text();
        sentence.tree()?;

        Ok(SentenceOutcome {
            sentence,
            mask,
            replaced,
            stats,
        })
    }

    /// Replace tokens in every sentence, in order
    ///
    /// Stops at the first sentence that is not a well-formed tree.
    pub fn replace_tokens_in_sentences<'s, I, R>(
        &self,
        sentences: I,
        rng: &mut R,
    ) -> Result<BatchOutcome, ReplaceError>
    where
        I: IntoIterator<Item = &'s Sentence>,
        R: Rng + ?Sized,
    {
        let mut batch = BatchOutcome::default();
        for (index, sentence) in sentences.into_iter().enumerate() {
            if index % 1000 == 0 && index > 0 {
                log::debug!("replaced tokens in {} sentences", index);
            }
            let outcome = self
                .replace_sentence(sentence, rng)
                .map_err(|source| ReplaceError { index, source })?;
            batch.push(outcome);
        }
        Ok(batch)
    }
}

/// Render `replaced` with every changed form wrapped in `marker`
pub fn markup_changes(original: &Sentence, replaced: &Sentence, marker: &str) -> String {
    original
        .tokens
        .iter()
        .zip(&replaced.tokens)
        .map(|(before, after)| {
            if before.form == after.form {
                before.form.clone()
            } else {
                format!("{}{}{}", marker, after.form, marker)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
