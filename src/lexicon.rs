//! Morphological lexicon
//!
//! A read-only `upos -> lemma -> [(form, features)]` index with a
//! feature-constrained `lookup`. Construction from raw UDLex sources lives in
//! [`crate::udlex`]; a built lexicon can be persisted with [`Lexicon::save`]
//! and restored with [`Lexicon::load`].

use crate::config::Language;
use crate::features::Features;
use crate::onset::OnsetClassifier;
use crate::relax::{self, MorphologicalRelaxation};
use crate::tree::Token;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line_num}: malformed pronunciation record: {source}")]
    Json {
        line_num: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("lexicon cache error: {0}")]
    Cache(#[from] bincode::Error),

    #[error("cached lexicon is for {found}, expected {expected}")]
    LanguageMismatch { expected: Language, found: Language },
}

/// One inflected form of a lemma
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexEntry {
    pub form: String,
    pub feats: Features,
}

type Entries = FxHashMap<String, FxHashMap<String, Vec<LexEntry>>>;

#[derive(Serialize)]
struct LexiconDataRef<'a> {
    language: Language,
    num_entries: usize,
    entries: &'a Entries,
    onsets: Option<&'a OnsetClassifier>,
}

#[derive(Deserialize)]
struct LexiconData {
    language: Language,
    num_entries: usize,
    entries: Entries,
    onsets: Option<OnsetClassifier>,
}

pub struct Lexicon {
    language: Language,
    entries: Entries,
    num_entries: usize,
    onsets: Option<Arc<OnsetClassifier>>,
    relaxation: Box<dyn MorphologicalRelaxation>,
}

impl std::fmt::Debug for Lexicon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexicon")
            .field("language", &self.language)
            .field("num_entries", &self.num_entries)
            .field("relaxation", &self.relaxation)
            .finish()
    }
}

impl Lexicon {
    /// An empty lexicon with the language's relaxation rules
    pub fn new(language: Language) -> Self {
        Self {
            language,
            entries: Entries::default(),
            num_entries: 0,
            onsets: None,
            relaxation: relax::for_language(language),
        }
    }

    /// Add one row. Rows are kept in insertion order per lemma.
    pub fn insert(&mut self, upos: &str, lemma: &str, form: &str, feats: Features) {
        self.entries
            .entry(upos.to_string())
            .or_default()
            .entry(lemma.to_string())
            .or_default()
            .push(LexEntry {
                form: form.to_string(),
                feats,
            });
        self.num_entries += 1;
    }

    pub fn with_onsets(mut self, onsets: OnsetClassifier) -> Self {
        self.onsets = Some(Arc::new(onsets));
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Onset classifier, if pronunciation data was attached
    pub fn onsets(&self) -> Option<&Arc<OnsetClassifier>> {
        self.onsets.as_ref()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.num_entries
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    /// All entries for a lemma
    pub fn entries(&self, upos: &str, lemma: &str) -> &[LexEntry] {
        self.entries
            .get(upos)
            .and_then(|by_lemma| by_lemma.get(lemma))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Surface forms of `lemma` that fit the slot occupied by `token`
    ///
    /// Never fails; a miss is an empty list. The result may contain
    /// duplicates, one per matching row.
    pub fn lookup(&self, lemma: &str, token: &Token) -> Vec<&str> {
        let entries = self.entries(&token.upos, lemma);
        if entries.is_empty() {
            return Vec::new();
        }

        let target = token.feats.clone().unwrap_or_default();
        // bound forms like "Haus-" only replace each other
        let bound = token.form.ends_with('-');
        let candidates: Vec<&LexEntry> = entries
            .iter()
            .filter(|entry| entry.form.ends_with('-') == bound)
            .collect();

        self.relaxation.select(token, &candidates, target)
    }

    /// Write a gzip-compressed snapshot
    pub fn save(&self, path: &Path) -> Result<(), LexiconError> {
        let data = LexiconDataRef {
            language: self.language,
            num_entries: self.num_entries,
            entries: &self.entries,
            onsets: self.onsets.as_deref(),
        };
        let mut encoder = GzEncoder::new(BufWriter::new(File::create(path)?), Compression::default());
        bincode::serialize_into(&mut encoder, &data)?;
        encoder.finish()?.flush()?;
        log::info!("saved {} lexicon entries to {}", self.num_entries, path.display());
        Ok(())
    }

    /// Read a snapshot written by [`Lexicon::save`]
    pub fn load(path: &Path) -> Result<Self, LexiconError> {
        let decoder = GzDecoder::new(BufReader::new(File::open(path)?));
        let data: LexiconData = bincode::deserialize_from(decoder)?;
        log::info!("loaded {} lexicon entries from {}", data.num_entries, path.display());
        Ok(Self {
            language: data.language,
            entries: data.entries,
            num_entries: data.num_entries,
            onsets: data.onsets.map(Arc::new),
            relaxation: relax::for_language(data.language),
        })
    }
}

/// A directory of lexicon snapshots, one per language
#[derive(Debug, Clone)]
pub struct LexiconCache {
    dir: PathBuf,
}

impl LexiconCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, language: Language) -> PathBuf {
        self.dir.join(format!("{}.lexicon.gz", language.code()))
    }

    /// Load the cached lexicon, or build it and write the cache
    pub fn load_or_build<F>(&self, language: Language, build: F) -> Result<Lexicon, LexiconError>
    where
        F: FnOnce() -> Result<Lexicon, LexiconError>,
    {
        let path = self.path(language);
        if path.exists() {
            let lexicon = Lexicon::load(&path)?;
            if lexicon.language() != language {
                return Err(LexiconError::LanguageMismatch {
                    expected: language,
                    found: lexicon.language(),
                });
            }
            return Ok(lexicon);
        }

        log::info!("no cached lexicon at {}, building", path.display());
        let lexicon = build()?;
        fs::create_dir_all(&self.dir)?;
        lexicon.save(&path)?;
        Ok(lexicon)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::features::decode;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    pub(crate) fn french_lexicon() -> Lexicon {
        let mut lex = Lexicon::new(Language::French);
        lex.insert("NOUN", "chien", "chien", decode("Gender=Masc|Number=Sing"));
        lex.insert("NOUN", "chien", "chiens", decode("Gender=Masc|Number=Plur"));
        lex.insert("NOUN", "âne", "âne", decode("Gender=Masc|Number=Sing"));
        lex.insert("NOUN", "cheval", "cheval", decode("Gender=Masc|Number=Sing"));
        lex.insert("NOUN", "arbre", "arbre", decode("Gender=Masc|Number=Sing"));
        lex.insert("NOUN", "souris", "souris", decode("Gender=Fem|Number=Sing"));
        lex.insert("NOUN", "souris", "souris", decode("Gender=Fem|Number=Plur"));
        lex
    }

    #[test]
    fn test_lookup() {
        let lex = french_lexicon();
        let tok = Token::new(2, "chat", "chat", "NOUN", "nsubj")
            .with_feats(decode("Gender=Masc|Number=Sing"));
        assert_eq!(lex.lookup("chien", &tok), vec!["chien"]);
        assert!(lex.lookup("lapin", &tok).is_empty());

        let verb = Token::new(3, "mange", "manger", "VERB", "root");
        assert!(lex.lookup("chien", &verb).is_empty());
    }

    #[test]
    fn test_lookup_without_features() {
        let lex = french_lexicon();
        let tok = Token::new(1, "souris", "souris", "NOUN", "obj");
        assert_eq!(lex.lookup("souris", &tok), vec!["souris", "souris"]);
    }

    #[test]
    fn test_lookup_bound_forms() {
        let mut lex = Lexicon::new(Language::German);
        lex.insert("NOUN", "Haus", "Haus-", Features::new());
        lex.insert("NOUN", "Haus", "Haus", Features::new());

        let bound = Token::new(1, "Garten-", "Garten", "NOUN", "conj");
        assert_eq!(lex.lookup("Haus", &bound), vec!["Haus-"]);
        let free = Token::new(1, "Garten", "Garten", "NOUN", "conj");
        assert_eq!(lex.lookup("Haus", &free), vec!["Haus"]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fr.lexicon.gz");
        let lex = french_lexicon().with_onsets(OnsetClassifier::letters_only(Language::French));
        lex.save(&path).unwrap();

        let loaded = Lexicon::load(&path).unwrap();
        assert_eq!(loaded.language(), Language::French);
        assert_eq!(loaded.len(), lex.len());
        assert_eq!(loaded.entries("NOUN", "chien"), lex.entries("NOUN", "chien"));
        assert!(loaded.onsets().is_some_and(|o| o.elides("âne")));
    }

    #[test]
    fn test_cache_builds_once() {
        let dir = tempdir().unwrap();
        // created on first write
        let cache = LexiconCache::new(dir.path().join("cache"));
        let builds = AtomicUsize::new(0);
        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(french_lexicon())
        };

        let first = cache.load_or_build(Language::French, build).unwrap();
        let second = cache.load_or_build(Language::French, build).unwrap();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(first.len(), second.len());

        // a snapshot stored under the wrong name is rejected
        fs::copy(cache.path(Language::French), cache.path(Language::German)).unwrap();
        let err = cache.load_or_build(Language::German, build).unwrap_err();
        assert!(matches!(
            err,
            LexiconError::LanguageMismatch {
                expected: Language::German,
                found: Language::French
            }
        ));
    }

    proptest! {
        #[test]
        fn test_lookup_never_panics(
            lemma in "\\PC{0,8}",
            form in "\\PC{0,8}",
            upos in prop::sample::select(vec!["NOUN", "VERB", "ADJ", "X"]),
            feats in prop::option::of("[A-Za-z=|_]{0,20}"),
        ) {
            let lex = french_lexicon();
            let mut tok = Token::new(1, &form, &form, upos, "dep");
            tok.feats = feats.as_deref().map(decode);
            let _ = lex.lookup(&lemma, &tok);
        }
    }
}
