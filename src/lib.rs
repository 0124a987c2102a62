//! ud-substitute: syntax- and morphology-preserving word substitution
//!
//! Generates substitute sentences from a Universal Dependencies treebank by
//! replacing content words with words that fit the same local syntactic slot
//! (from a pattern index built over the treebank) inflected for the same
//! morphological features (from a UDLex-derived lexicon).
//!
//! ```no_run
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use ud_substitute::{
//!     Language, Lexicon, PatternConfig, PatternIndex, ReplacementOptions, Replacer, Treebank,
//! };
//!
//! let train: Vec<_> = Treebank::from_file("fr_gsd-ud-train.conllu").into_iter().collect();
//! let index = PatternIndex::build(&train, PatternConfig::for_language(Language::French), None)?;
//! let lexicon = Lexicon::load("cache/fr.lexicon.gz".as_ref())?;
//!
//! let replacer = Replacer::new(Language::French, &index, Some(&lexicon), ReplacementOptions::default());
//! let mut rng = StdRng::seed_from_u64(7);
//! let outcome = replacer.replace_sentence(&train[0], &mut rng)?;
//! println!("{}", outcome.sentence.surface());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch; // Parallel replacement over sentence slices
pub mod config; // Languages and per-language pattern tables
pub mod conllu; // CoNLL-U reading and writing
pub mod features; // Feature-string codec
pub mod index; // Pattern index and POS-only baseline
pub mod lexicon; // Morphological lexicon and its cache
pub mod onset; // Vowel/consonant onsets from pronunciation data
pub mod pattern; // Local tree context extraction
pub mod postprocess; // Article agreement after replacement
pub mod prep; // Treebank repairs before indexing
pub mod relax; // Per-language feature relaxation
pub mod replace; // Replacement engine
pub mod tree; // Sentences, tokens and the dependency view
pub mod treebank; // Sentence collections from strings, files and globs
pub mod udlex; // Raw UDLex ingestion

pub use batch::replace_parallel;
pub use config::{Language, PatternConfig, UnknownLanguage};
pub use conllu::{CoNLLUReader, ParseError, write_conllu};
pub use features::{Features, decode, encode, subset_match};
pub use index::{Candidate, CandidateSource, PatternIndex, PatternIndexBuilder, PosOnlyIndex, UposStats};
pub use lexicon::{LexEntry, Lexicon, LexiconCache, LexiconError};
pub use onset::OnsetClassifier;
pub use pattern::{ContextExtractor, PatternKey};
pub use postprocess::SentencePostProcessor;
pub use relax::MorphologicalRelaxation;
pub use replace::{
    BatchOutcome, MaskState, ReplaceError, ReplacementOptions, ReplacementStats, Replacer,
    SentenceOutcome, create_mask, markup_changes,
};
pub use tree::{DepTree, Node, Sentence, Token, TokenId, TreeError};
pub use treebank::Treebank;
pub use udlex::{LexiconBuilder, SourceKind};
