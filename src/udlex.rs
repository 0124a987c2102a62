//! Raw UDLex ingestion
//!
//! UDLex `.conllul` files are tab-separated rows
//! `marker-i, marker-j, form, lemma, upos, cpos, ufeat, extra`. Only rows with
//! marker-i `0` are dictionary entries. Some distributed files carry broken
//! lines; the known ones are repaired by [`SourceKind`] before parsing.

use crate::config::Language;
use crate::features::decode;
use crate::lexicon::{Lexicon, LexiconError};
use bstr::ByteSlice;
use rustc_hash::FxHashSet;
use std::io::BufRead;
use std::ops::RangeInclusive;

/// Which distribution a file comes from, for source-specific repairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Apertium,
    /// French Lefff; physical line 23 is malformed
    Lefff,
    /// German DeLex; physical lines 34-38 are malformed
    DeLex,
    EnLex,
    Other,
}

impl SourceKind {
    /// Physical (1-based) line numbers dropped before parsing
    fn skipped_lines(self) -> Option<RangeInclusive<usize>> {
        match self {
            SourceKind::Lefff => Some(23..=23),
            SourceKind::DeLex => Some(34..=38),
            _ => None,
        }
    }
}

// feature strings in the German sources with a missing separator
const GERMAN_FEATURE_REPAIRS: [(&str, &str); 2] = [
    ("Number=SingGender=Masc", "Number=Sing|Gender=Masc"),
    ("Number=PlurGender=Masc", "Number=Plur|Gender=Masc"),
];

/// One dictionary row; equality on all kept columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LexRow {
    pub form: String,
    pub lemma: String,
    pub upos: String,
    pub cpos: String,
    pub ufeat: String,
}

/// Parse the marker column; only all-digit values count
fn parse_marker(field: &[u8]) -> Option<u32> {
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return None;
    }
    atoi::atoi::<u32>(field)
}

/// Parse one raw line, `None` for lines that are not entries
pub fn parse_row(line: &[u8], line_num: usize) -> Option<LexRow> {
    let line = line.trim_end_with(|c| c == '\r' || c == '\n');
    if line.is_empty() {
        return None;
    }
    let Ok(line) = line.to_str() else {
        log::warn!("line {}: invalid UTF-8, skipped", line_num);
        return None;
    };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        log::warn!("line {}: {} columns, skipped", line_num, fields.len());
        return None;
    }
    if parse_marker(fields[0].as_bytes()) != Some(0) {
        return None;
    }

    Some(LexRow {
        form: fields[2].to_string(),
        lemma: fields[3].to_string(),
        upos: fields[4].to_string(),
        cpos: fields[5].to_string(),
        ufeat: fields[6].to_string(),
    })
}

/// Builds a [`Lexicon`] from one or more raw sources
///
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use ud_substitute::{Language, LexiconBuilder, SourceKind};
///
/// let lexicon = LexiconBuilder::new(Language::German)
///     .upos_filter(["NOUN", "ADJ", "VERB"])
///     .source(SourceKind::Apertium, BufReader::new(File::open("de-apertium.conllul")?))?
///     .source(SourceKind::DeLex, BufReader::new(File::open("de-delex.conllul")?))?
///     .build();
/// # Ok::<(), ud_substitute::LexiconError>(())
/// ```
#[derive(Debug)]
pub struct LexiconBuilder {
    language: Language,
    upos_filter: Option<FxHashSet<String>>,
    seen: FxHashSet<LexRow>,
    rows: Vec<LexRow>,
}

impl LexiconBuilder {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            upos_filter: None,
            seen: FxHashSet::default(),
            rows: Vec::new(),
        }
    }

    /// Keep only rows with one of these upos tags
    pub fn upos_filter<I, S>(mut self, upos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.upos_filter = Some(upos.into_iter().map(Into::into).collect());
        self
    }

    /// Read every row of one source. Rows already seen in any earlier source are dropped.
    pub fn source<R: BufRead>(mut self, kind: SourceKind, mut reader: R) -> Result<Self, LexiconError> {
        let skipped = kind.skipped_lines();
        let mut buf = Vec::new();
        let mut line_num = 0;
        let (mut read, mut kept) = (0usize, 0usize);

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_num += 1;
            if skipped.as_ref().is_some_and(|lines| lines.contains(&line_num)) {
                continue;
            }
            let Some(row) = parse_row(&buf, line_num) else {
                continue;
            };
            read += 1;
            if self.add_row(row) {
                kept += 1;
            }
        }

        log::info!(
            "{:?} ({}): {} entries read, {} new",
            kind,
            self.language,
            read,
            kept
        );
        Ok(self)
    }

    /// Add a row unless filtered out or already present
    pub fn add_row(&mut self, mut row: LexRow) -> bool {
        if let Some(filter) = &self.upos_filter {
            if !filter.contains(&row.upos) {
                return false;
            }
        }
        if self.language == Language::German {
            for (broken, fixed) in GERMAN_FEATURE_REPAIRS {
                if row.ufeat.contains(broken) {
                    row.ufeat = row.ufeat.replace(broken, fixed);
                }
            }
        }
        if self.seen.contains(&row) {
            return false;
        }
        self.seen.insert(row.clone());
        self.rows.push(row);
        true
    }

    /// Decode features and group rows by upos and lemma
    pub fn build(self) -> Lexicon {
        let mut lexicon = Lexicon::new(self.language);
        for row in self.rows {
            lexicon.insert(&row.upos, &row.lemma, &row.form, decode(&row.ufeat));
        }
        log::info!("{} lexicon: {} entries", self.language, lexicon.len());
        lexicon
    }
}
