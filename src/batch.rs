//! Parallel replacement over a sentence list
//!
//! The list is cut into contiguous slices, one per worker. Each slice is
//! processed in order with its own seeded generator, and the results are
//! concatenated in slice order, so a run is reproducible for a fixed seed and
//! worker count.

use crate::index::CandidateSource;
use crate::replace::{BatchOutcome, ReplaceError, Replacer};
use crate::tree::Sentence;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;

/// Slice length for splitting `len` sentences between `workers`
fn slice_len(len: usize, workers: usize) -> usize {
    len.div_ceil(workers.max(1)).max(1)
}

/// Replace tokens in `sentences` on up to `workers` rayon tasks
///
/// Slice `i` uses a generator seeded with `base_seed + i`. The first failing
/// sentence (by position in `sentences`) is returned as the error.
pub fn replace_parallel<S>(
    replacer: &Replacer<'_, S>,
    sentences: &[Sentence],
    workers: usize,
    base_seed: u64,
) -> Result<BatchOutcome, ReplaceError>
where
    S: CandidateSource + Sync,
{
    let chunk = slice_len(sentences.len(), workers);
    log::info!(
        "replacing tokens in {} sentences, {} per slice",
        sentences.len(),
        chunk
    );

    let slices: Vec<Result<BatchOutcome, ReplaceError>> = sentences
        .par_chunks(chunk)
        .enumerate()
        .map(|(slice_index, slice)| {
            let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(slice_index as u64));
            replacer
                .replace_tokens_in_sentences(slice, &mut rng)
                .map_err(|err| ReplaceError {
                    index: slice_index * chunk + err.index,
                    source: err.source,
                })
        })
        .collect();

    let mut merged = BatchOutcome::default();
    for slice in slices {
        merged.extend(slice?);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Language, PatternConfig};
    use crate::index::PatternIndex;
    use crate::replace::ReplacementOptions;
    use crate::tree::Token;

    fn sentence(det: &str, noun: &str, verb: &str) -> Sentence {
        Sentence::new(vec![
            Token::new(1, det, det, "DET", "det").with_head(2),
            Token::new(2, noun, noun, "NOUN", "nsubj").with_head(3),
            Token::new(3, verb, verb, "VERB", "root"),
        ])
    }

    fn corpus() -> Vec<Sentence> {
        let nouns = ["dog", "cat", "bird", "horse", "cow", "fox", "owl"];
        let verbs = ["runs", "sleeps", "sings", "eats"];
        nouns
            .iter()
            .enumerate()
            .map(|(i, noun)| sentence("the", noun, verbs[i % verbs.len()]))
            .collect()
    }

    #[test]
    fn test_slice_len() {
        assert_eq!(slice_len(10, 4), 3);
        assert_eq!(slice_len(8, 4), 2);
        assert_eq!(slice_len(3, 8), 1);
        assert_eq!(slice_len(0, 4), 1);
        assert_eq!(slice_len(5, 0), 5);
    }

    #[test]
    fn test_parallel_matches_sequential_per_slice() {
        let treebank = corpus();
        let index =
            PatternIndex::build(&treebank, PatternConfig::for_language(Language::English), None)
                .unwrap();
        let replacer = Replacer::new(
            Language::English,
            &index,
            None,
            ReplacementOptions::default(),
        );

        let parallel = replace_parallel(&replacer, &treebank, 3, 42).unwrap();
        assert_eq!(parallel.sentences.len(), treebank.len());

        // slices of 3: seeds 42, 43, 44
        let mut sequential = BatchOutcome::default();
        for (i, slice) in treebank.chunks(3).enumerate() {
            let mut rng = StdRng::seed_from_u64(42 + i as u64);
            sequential.extend(replacer.replace_tokens_in_sentences(slice, &mut rng).unwrap());
        }
        assert_eq!(parallel, sequential);

        // same seed, same output
        assert_eq!(replace_parallel(&replacer, &treebank, 3, 42).unwrap(), parallel);
    }

    #[test]
    fn test_error_index_is_global() {
        let mut treebank = corpus();
        treebank[5].tokens[2].head = Some(1);
        let index = PatternIndex::build(&corpus(), PatternConfig::default(), None).unwrap();
        let replacer = Replacer::new(
            Language::English,
            &index,
            None,
            ReplacementOptions::default(),
        );

        let err = replace_parallel(&replacer, &treebank, 2, 0).unwrap_err();
        assert_eq!(err.index, 5);
    }
}
