//! Sentence collections
//!
//! A [`Treebank`] names where sentences come from (a string, a file, several
//! files or a glob pattern) and streams them on demand. Files that cannot be
//! opened and sentences that fail to parse are logged and skipped.

use crate::conllu::{CoNLLUReader, ParseError};
use crate::tree::Sentence;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
enum SentenceSource {
    String(String),
    File(PathBuf),
    Files(Vec<PathBuf>),
}

/// Collection of sentences from a string, file, or glob pattern
///
/// ```no_run
/// use ud_substitute::Treebank;
///
/// let train: Vec<_> = Treebank::from_glob("fr_gsd-ud-train*.conllu")
///     .unwrap()
///     .into_iter()
///     .collect();
/// println!("{} sentences", train.len());
/// ```
#[derive(Debug, Clone)]
pub struct Treebank {
    source: SentenceSource,
}

impl Treebank {
    /// Create from in-memory CoNLL-U text
    pub fn from_string(text: &str) -> Self {
        Self {
            source: SentenceSource::String(text.to_string()),
        }
    }

    /// Create from a single file, plain or gzipped
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        Self {
            source: SentenceSource::File(path.as_ref().to_path_buf()),
        }
    }

    /// Create from a glob pattern
    ///
    /// Files are read in sorted order. Matches that cannot be read while
    /// expanding the pattern are logged and left out.
    pub fn from_glob(pattern: &str) -> Result<Self, glob::PatternError> {
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    log::warn!("skipping {:?}: {}", e.path(), e.error());
                    None
                }
            })
            .collect();
        paths.sort();
        Ok(Self::from_paths(paths))
    }

    /// Create from explicit file paths, read in the given order
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            source: SentenceSource::Files(paths),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Sentence>> {
        self.clone().into_iter()
    }
}

impl IntoIterator for Treebank {
    type Item = Sentence;
    type IntoIter = Box<dyn Iterator<Item = Sentence>>;

    fn into_iter(self) -> Self::IntoIter {
        match self.source {
            SentenceSource::String(text) => {
                Box::new(CoNLLUReader::from_string(&text).filter_map(|r| keep_parsed(r, None)))
            }
            SentenceSource::File(path) => open_file_sentences(path),
            SentenceSource::Files(paths) => Box::new(paths.into_iter().flat_map(open_file_sentences)),
        }
    }
}

fn keep_parsed(result: Result<Sentence, ParseError>, path: Option<&Path>) -> Option<Sentence> {
    match result {
        Ok(sentence) => Some(sentence),
        Err(e) => {
            match path {
                Some(path) => log::warn!("{}: {}", path.display(), e),
                None => log::warn!("{}", e),
            }
            None
        }
    }
}

fn open_file_sentences(path: PathBuf) -> Box<dyn Iterator<Item = Sentence>> {
    match CoNLLUReader::from_file(&path) {
        Ok(reader) => Box::new(reader.filter_map(move |r| keep_parsed(r, Some(&path)))),
        Err(e) => {
            log::warn!("failed to open {}: {}", path.display(), e);
            Box::new(std::iter::empty())
        }
    }
}
