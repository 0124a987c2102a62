//! Syntactic pattern index
//!
//! Maps every pattern key seen in a treebank to the (form, lemma) pairs that
//! occurred under it. Strings are interned while building and the interner
//! is frozen afterwards, so a lookup that mentions a string never seen in the
//! treebank is a miss without touching the bucket table.

use crate::config::PatternConfig;
use crate::pattern::{ContextExtractor, PatternKey};
use crate::tree::{DepTree, Sentence, Token, TreeError};
use lasso::{Rodeo, RodeoReader, Spur};
use rand::Rng;
use rand::seq::SliceRandom;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

/// A replacement candidate: a surface form and its lemma
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Candidate<'a> {
    pub form: &'a str,
    pub lemma: &'a str,
}

/// Anything that can propose syntactically compatible replacements for a token
pub trait CandidateSource {
    fn candidates<'a, R: Rng + ?Sized>(
        &'a self,
        token: &Token,
        tree: &DepTree<'_>,
        rng: &mut R,
    ) -> Result<Vec<Candidate<'a>>, TreeError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InternedKey {
    upos: Spur,
    deprel: Spur,
    signature: Box<[Spur]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InternedPattern {
    form: Spur,
    lemma: Spur,
    key: InternedKey,
}

fn upos_set(upos_filter: Option<Vec<String>>) -> Option<FxHashSet<String>> {
    upos_filter.map(|list| list.into_iter().collect())
}

/// Accumulates patterns sentence by sentence
pub struct PatternIndexBuilder {
    extractor: ContextExtractor,
    upos_filter: Option<FxHashSet<String>>,
    strings: Rodeo,
    seen: FxHashSet<InternedPattern>,
    /// Distinct patterns in first-seen order
    patterns: Vec<InternedPattern>,
    total: usize,
    sentences: usize,
}

impl PatternIndexBuilder {
    pub fn new(config: PatternConfig, upos_filter: Option<Vec<String>>) -> Self {
        Self {
            extractor: ContextExtractor::new(config),
            upos_filter: upos_set(upos_filter),
            strings: Rodeo::new(),
            seen: FxHashSet::default(),
            patterns: Vec::new(),
            total: 0,
            sentences: 0,
        }
    }

    /// Add every token of one sentence that passes the upos filter
    pub fn add_sentence(&mut self, sentence: &Sentence) -> Result<(), TreeError> {
        let tree = sentence.tree()?;

        for node in tree.iter() {
            let token = node.token();
            if let Some(filter) = &self.upos_filter {
                if !filter.contains(&token.upos) {
                    continue;
                }
            }

            let signature = self
                .extractor
                .node_relations(node)
                .into_iter()
                .map(|rel| self.strings.get_or_intern(rel))
                .collect();
            let pattern = InternedPattern {
                form: self.strings.get_or_intern(&token.form),
                lemma: self.strings.get_or_intern(&token.lemma),
                key: InternedKey {
                    upos: self.strings.get_or_intern(&token.upos),
                    deprel: self.strings.get_or_intern(&token.deprel),
                    signature,
                },
            };

            self.total += 1;
            if self.seen.insert(pattern.clone()) {
                self.patterns.push(pattern);
            }
        }

        self.sentences += 1;
        if self.sentences % 10_000 == 0 {
            log::debug!("processed {} trees", self.sentences);
        }
        Ok(())
    }

    /// Freeze the interner and group the distinct patterns by key
    pub fn finish(self) -> PatternIndex {
        log::info!(
            "patterns before dropping duplicates: {}, after: {}",
            self.total,
            self.patterns.len()
        );

        let num_patterns = self.patterns.len();
        let mut buckets: FxHashMap<InternedKey, Vec<(Spur, Spur)>> = FxHashMap::default();
        for pattern in self.patterns {
            buckets
                .entry(pattern.key)
                .or_default()
                .push((pattern.form, pattern.lemma));
        }

        PatternIndex {
            extractor: self.extractor,
            upos_filter: self.upos_filter,
            strings: self.strings.into_reader(),
            buckets,
            num_patterns,
        }
    }
}

/// Per-upos summary of an index
#[derive(Debug, Clone, PartialEq)]
pub struct UposStats {
    /// Distinct pattern keys
    pub keys: usize,
    /// Keys whose bucket holds exactly one candidate
    pub single_candidate_keys: usize,
    /// Candidates summed over all keys
    pub candidates: usize,
    pub mean_candidates: f64,
}

/// Read-only pattern key -> candidates index
pub struct PatternIndex {
    extractor: ContextExtractor,
    upos_filter: Option<FxHashSet<String>>,
    strings: RodeoReader,
    buckets: FxHashMap<InternedKey, Vec<(Spur, Spur)>>,
    num_patterns: usize,
}

impl PatternIndex {
    /// Build an index over a whole treebank
    pub fn build<'a, I>(
        sentences: I,
        config: PatternConfig,
        upos_filter: Option<Vec<String>>,
    ) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = &'a Sentence>,
    {
        let mut builder = PatternIndexBuilder::new(config, upos_filter);
        for sentence in sentences {
            builder.add_sentence(sentence)?;
        }
        Ok(builder.finish())
    }

    pub fn config(&self) -> &PatternConfig {
        self.extractor.config()
    }

    /// Number of distinct (form, lemma, key) patterns
    pub fn len(&self) -> usize {
        self.num_patterns
    }

    pub fn is_empty(&self) -> bool {
        self.num_patterns == 0
    }

    /// Number of distinct pattern keys
    pub fn num_keys(&self) -> usize {
        self.buckets.len()
    }

    /// True if tokens of this upos were indexed
    pub fn accepts(&self, upos: &str) -> bool {
        self.upos_filter
            .as_ref()
            .is_none_or(|filter| filter.contains(upos))
    }

    /// Candidates observed under an explicit key
    pub fn find_matches(&self, upos: &str, deprel: &str, signature: &[&str]) -> Vec<Candidate<'_>> {
        self.interned_key(upos, deprel, signature)
            .and_then(|key| self.buckets.get(&key))
            .map(|bucket| self.resolve_bucket(bucket))
            .unwrap_or_default()
    }

    /// Candidates sharing the token's pattern key in `tree`
    ///
    /// An unseen key gives an empty list; a token missing from the tree is an
    /// error.
    pub fn find_matches_for_token(
        &self,
        token: &Token,
        tree: &DepTree<'_>,
    ) -> Result<Vec<Candidate<'_>>, TreeError> {
        let signature = self.extractor.relations_to_children(tree, token.id)?;
        Ok(self.find_matches(&token.upos, &token.deprel, &signature))
    }

    /// All buckets with their keys resolved, in no particular order
    pub fn buckets(&self) -> impl Iterator<Item = (PatternKey, Vec<Candidate<'_>>)> + '_ {
        self.buckets.iter().map(|(key, bucket)| {
            let key = PatternKey {
                upos: self.strings.resolve(&key.upos).to_string(),
                deprel: self.strings.resolve(&key.deprel).to_string(),
                signature: key
                    .signature
                    .iter()
                    .map(|s| self.strings.resolve(s).to_string())
                    .collect(),
            };
            (key, self.resolve_bucket(bucket))
        })
    }

    /// Per-upos statistics
    pub fn stats(&self) -> BTreeMap<String, UposStats> {
        let mut by_upos: BTreeMap<String, UposStats> = BTreeMap::new();
        for (key, bucket) in &self.buckets {
            let stats = by_upos
                .entry(self.strings.resolve(&key.upos).to_string())
                .or_insert(UposStats {
                    keys: 0,
                    single_candidate_keys: 0,
                    candidates: 0,
                    mean_candidates: 0.0,
                });
            stats.keys += 1;
            stats.candidates += bucket.len();
            if bucket.len() == 1 {
                stats.single_candidate_keys += 1;
            }
        }
        for stats in by_upos.values_mut() {
            stats.mean_candidates = stats.candidates as f64 / stats.keys as f64;
        }
        by_upos
    }

    fn interned_key(&self, upos: &str, deprel: &str, signature: &[&str]) -> Option<InternedKey> {
        Some(InternedKey {
            upos: self.strings.get(upos)?,
            deprel: self.strings.get(deprel)?,
            signature: signature
                .iter()
                .map(|rel| self.strings.get(rel))
                .collect::<Option<_>>()?,
        })
    }

    fn resolve_bucket(&self, bucket: &[(Spur, Spur)]) -> Vec<Candidate<'_>> {
        bucket
            .iter()
            .map(|(form, lemma)| Candidate {
                form: self.strings.resolve(form),
                lemma: self.strings.resolve(lemma),
            })
            .collect()
    }
}

impl CandidateSource for PatternIndex {
    fn candidates<'a, R: Rng + ?Sized>(
        &'a self,
        token: &Token,
        tree: &DepTree<'_>,
        _rng: &mut R,
    ) -> Result<Vec<Candidate<'a>>, TreeError> {
        self.find_matches_for_token(token, tree)
    }
}

/// Baseline that ignores syntax: a random sample of everything seen with the upos
pub struct PosOnlyIndex {
    by_upos: FxHashMap<String, Vec<(String, String)>>,
    sample_size: usize,
    num_patterns: usize,
}

impl PosOnlyIndex {
    pub const DEFAULT_SAMPLE_SIZE: usize = 10;

    pub fn build<'a, I>(sentences: I, upos_filter: Option<Vec<String>>, sample_size: usize) -> Self
    where
        I: IntoIterator<Item = &'a Sentence>,
    {
        let filter = upos_set(upos_filter);
        let mut seen: FxHashSet<(&str, &str, &str)> = FxHashSet::default();
        let mut by_upos: FxHashMap<String, Vec<(String, String)>> = FxHashMap::default();

        for sentence in sentences {
            for token in &sentence.tokens {
                if filter.as_ref().is_some_and(|f| !f.contains(&token.upos)) {
                    continue;
                }
                if seen.insert((token.upos.as_str(), token.form.as_str(), token.lemma.as_str())) {
                    by_upos
                        .entry(token.upos.clone())
                        .or_default()
                        .push((token.form.clone(), token.lemma.clone()));
                }
            }
        }

        let num_patterns = seen.len();
        log::info!("aggregated {} form/lemma pairs by upos", num_patterns);
        Self {
            by_upos,
            sample_size,
            num_patterns,
        }
    }

    pub fn len(&self) -> usize {
        self.num_patterns
    }

    pub fn is_empty(&self) -> bool {
        self.num_patterns == 0
    }

    /// Up to `sample_size` random pairs seen with the token's upos
    pub fn find_matches_for_token<R: Rng + ?Sized>(
        &self,
        token: &Token,
        rng: &mut R,
    ) -> Vec<Candidate<'_>> {
        self.by_upos
            .get(&token.upos)
            .map(|pairs| {
                pairs
                    .choose_multiple(rng, self.sample_size)
                    .map(|(form, lemma)| Candidate { form, lemma })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl CandidateSource for PosOnlyIndex {
    fn candidates<'a, R: Rng + ?Sized>(
        &'a self,
        token: &Token,
        _tree: &DepTree<'_>,
        rng: &mut R,
    ) -> Result<Vec<Candidate<'a>>, TreeError> {
        Ok(self.find_matches_for_token(token, rng))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Language;
    use crate::tree::Token;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    fn nsubj_sentence(det: &str, noun: &str, lemma: &str, verb: &str) -> Sentence {
        Sentence::new(vec![
            Token::new(1, det, det, "DET", "det").with_head(2),
            Token::new(2, noun, lemma, "NOUN", "nsubj").with_head(3),
            Token::new(3, verb, verb, "VERB", "root"),
        ])
    }

    pub(crate) fn small_treebank() -> Vec<Sentence> {
        vec![
            nsubj_sentence("the", "dog", "dog", "runs"),
            nsubj_sentence("the", "cats", "cat", "sleep"),
            nsubj_sentence("a", "dog", "dog", "barks"),
            nsubj_sentence("the", "dog", "dog", "runs"),
            Sentence::new(vec![
                Token::new(1, "birds", "bird", "NOUN", "nsubj").with_head(2),
                Token::new(2, "sing", "sing", "VERB", "root"),
            ]),
        ]
    }

    fn as_sets(index: &PatternIndex) -> BTreeMap<PatternKey, BTreeSet<(String, String)>> {
        index
            .buckets()
            .map(|(key, bucket)| {
                let set = bucket
                    .into_iter()
                    .map(|c| (c.form.to_string(), c.lemma.to_string()))
                    .collect();
                (key, set)
            })
            .collect()
    }

    #[test]
    fn test_index_building() {
        let treebank = small_treebank();
        let index = PatternIndex::build(&treebank, PatternConfig::default(), None).unwrap();

        // duplicates removed across the whole index
        let nouns = index.find_matches("NOUN", "nsubj", &["det"]);
        assert_eq!(
            nouns,
            vec![
                Candidate { form: "dog", lemma: "dog" },
                Candidate { form: "cats", lemma: "cat" },
            ]
        );
        assert_eq!(
            index.find_matches("NOUN", "nsubj", &[]),
            vec![Candidate { form: "birds", lemma: "bird" }]
        );
        // "the" and "a" share one DET bucket
        assert_eq!(index.find_matches("DET", "det", &[]).len(), 2);
    }

    #[test]
    fn test_unseen_keys_are_empty() {
        let treebank = small_treebank();
        let index = PatternIndex::build(&treebank, PatternConfig::default(), None).unwrap();
        assert!(index.find_matches("ADJ", "amod", &[]).is_empty());
        assert!(index.find_matches("NOUN", "nsubj", &["amod"]).is_empty());
        assert!(index.find_matches("NOUN", "obj", &["det"]).is_empty());
    }

    #[test]
    fn test_find_matches_for_token() {
        let treebank = small_treebank();
        let index = PatternIndex::build(&treebank, PatternConfig::default(), None).unwrap();

        let query = nsubj_sentence("the", "horse", "horse", "eats");
        let tree = query.tree().unwrap();
        let matches = index.find_matches_for_token(&query.tokens[1], &tree).unwrap();
        assert_eq!(matches.len(), 2);

        let mut bogus = query.tokens[1].clone();
        bogus.id = 9;
        assert_eq!(
            index.find_matches_for_token(&bogus, &tree).unwrap_err(),
            TreeError::NotFound(9)
        );
    }

    #[test]
    fn test_upos_filter() {
        let treebank = small_treebank();
        let index = PatternIndex::build(
            &treebank,
            PatternConfig::default(),
            Some(vec!["NOUN".to_string()]),
        )
        .unwrap();
        assert!(index.find_matches("VERB", "root", &["nsubj"]).is_empty());
        assert!(index.accepts("NOUN"));
        assert!(!index.accepts("VERB"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_french_config_distinguishes_order() {
        let pre = Sentence::new(vec![
            Token::new(1, "petit", "petit", "ADJ", "amod").with_head(2),
            Token::new(2, "chat", "chat", "NOUN", "root"),
        ]);
        let post = Sentence::new(vec![
            Token::new(1, "chien", "chien", "NOUN", "root"),
            Token::new(2, "noir", "noir", "ADJ", "amod").with_head(1),
        ]);
        let config = PatternConfig::for_language(Language::French);
        let index = PatternIndex::build([&pre, &post], config, None).unwrap();

        assert_eq!(
            index.find_matches("NOUN", "root", &["amod", "MOTHER"]),
            vec![Candidate { form: "chat", lemma: "chat" }]
        );
        assert_eq!(
            index.find_matches("NOUN", "root", &["MOTHER", "amod"]),
            vec![Candidate { form: "chien", lemma: "chien" }]
        );
    }

    #[test]
    fn test_stats() {
        let treebank = small_treebank();
        let index = PatternIndex::build(&treebank, PatternConfig::default(), None).unwrap();
        let stats = index.stats();

        let noun = &stats["NOUN"];
        assert_eq!(noun.keys, 2);
        assert_eq!(noun.single_candidate_keys, 1);
        assert_eq!(noun.candidates, 3);
        assert!((noun.mean_candidates - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_integrity_fault_stops_build() {
        let broken = Sentence::new(vec![
            Token::new(1, "a", "a", "X", "dep").with_head(5),
            Token::new(2, "b", "b", "X", "root"),
        ]);
        assert!(PatternIndex::build([&broken], PatternConfig::default(), None).is_err());
    }

    #[test]
    fn test_pos_only_sample() {
        let treebank = small_treebank();
        let index = PosOnlyIndex::build(&treebank, None, 2);
        let mut rng = StdRng::seed_from_u64(7);

        let token = Token::new(1, "x", "x", "NOUN", "obj");
        let sample = index.find_matches_for_token(&token, &mut rng);
        assert_eq!(sample.len(), 2);
        assert!(sample.iter().all(|c| ["dog", "cats", "birds"].contains(&c.form)));

        let unknown = Token::new(1, "x", "x", "INTJ", "discourse");
        assert!(index.find_matches_for_token(&unknown, &mut rng).is_empty());
    }

    proptest! {
        #[test]
        fn test_build_is_order_independent(seed in any::<u64>()) {
            let treebank = small_treebank();
            let mut shuffled = treebank.clone();
            shuffled.shuffle(&mut StdRng::seed_from_u64(seed));

            let config = PatternConfig::for_language(Language::French);
            let a = PatternIndex::build(&treebank, config.clone(), None).unwrap();
            let b = PatternIndex::build(&shuffled, config, None).unwrap();
            prop_assert_eq!(as_sets(&a), as_sets(&b));
            prop_assert_eq!(a.len(), b.len());
        }

        #[test]
        fn test_unknown_keys_never_match(upos in "[A-Z]{1,6}", deprel in "[a-z]{1,6}") {
            let treebank = small_treebank();
            let index = PatternIndex::build(&treebank, PatternConfig::default(), None).unwrap();
            let known = index.buckets().any(|(key, _)| key.upos == upos && key.deprel == deprel);
            prop_assume!(!known);
            prop_assert!(index.find_matches(&upos, &deprel, &[]).is_empty());
        }
    }
}
