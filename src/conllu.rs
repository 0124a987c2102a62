//! CoNLL-U reading and writing
//!
//! Parses CoNLL-U text into [`Sentence`]s and serializes them back. Multiword
//! token ranges and empty nodes are skipped on input.
//!
//! CoNLL-U format: https://universaldependencies.org/format.html

use crate::features::{EMPTY_FIELD, Features, encode};
use crate::tree::{Misc, Sentence, Token, TokenId};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Write};
use std::path::Path;
use thiserror::Error;

/// Error during CoNLL-U parsing
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Parse error at line {line_num}: {message}")]
    Syntax { line_num: usize, message: String },

    #[error("IO error at line {line_num}: {source}")]
    Io {
        line_num: usize,
        #[source]
        source: io::Error,
    },
}

impl ParseError {
    fn syntax(line_num: usize, message: String) -> Self {
        ParseError::Syntax { line_num, message }
    }
}

/// Kinds of values found in the ID column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineId {
    Single(TokenId),
    Range(TokenId, TokenId),
    Decimal(TokenId, TokenId),
}

/// Open a file for line reading, decompressing `.gz` transparently
pub fn open_reader(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// CoNLL-U reader that iterates over sentences
pub struct CoNLLUReader<R: BufRead> {
    lines: Lines<R>,
    line_num: usize,
}

impl<R: BufRead> CoNLLUReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl CoNLLUReader<Box<dyn BufRead + Send>> {
    /// Create a reader from a file path (plain or gzipped)
    pub fn from_file(path: &Path) -> io::Result<Self> {
        Ok(Self::new(open_reader(path)?))
    }
}

impl CoNLLUReader<io::Cursor<String>> {
    /// Create a reader from a string
    pub fn from_string(text: &str) -> Self {
        Self::new(io::Cursor::new(text.to_string()))
    }
}

impl<R: BufRead> Iterator for CoNLLUReader<R> {
    type Item = Result<Sentence, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut token_lines = Vec::new();
        let mut metadata = Vec::new();

        loop {
            self.line_num += 1;
            match self.lines.next() {
                None => {
                    // trailing comments with no words are not a sentence
                    if token_lines.is_empty() {
                        return None;
                    }
                    // Last sentence without trailing blank line
                    break;
                }
                Some(Err(e)) => {
                    return Some(Err(ParseError::Io {
                        line_num: self.line_num,
                        source: e,
                    }));
                }
                Some(Ok(line)) => {
                    let line = line.trim_end_matches(['\r', '\n']);

                    if line.trim().is_empty() {
                        if !token_lines.is_empty() {
                            break;
                        }
                        continue;
                    }

                    if let Some(comment) = line.strip_prefix('#') {
                        metadata.push(parse_comment(comment));
                        continue;
                    }

                    token_lines.push((self.line_num, line.to_string()));
                }
            }
        }

        Some(parse_sentence(token_lines, metadata))
    }
}

/// Parse a comment line (without the leading `#`)
fn parse_comment(comment: &str) -> (String, Option<String>) {
    let comment = comment.trim();
    match comment.split_once('=') {
        Some((key, value)) => (key.trim().to_string(), Some(value.trim().to_string())),
        None => (comment.to_string(), None),
    }
}

fn parse_sentence(
    lines: Vec<(usize, String)>,
    metadata: Vec<(String, Option<String>)>,
) -> Result<Sentence, ParseError> {
    let mut tokens = Vec::with_capacity(lines.len());
    for (line_num, line) in lines {
        if let Some(token) = parse_line(&line, line_num)? {
            tokens.push(token);
        }
    }
    Ok(Sentence { tokens, metadata })
}

/// Parse a single CoNLL-U line into a Token
/// Returns None for multiword tokens and empty nodes
fn parse_line(line: &str, line_num: usize) -> Result<Option<Token>, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();

    if fields.len() != 10 {
        return Err(ParseError::syntax(
            line_num,
            format!("Expected 10 fields, found {}", fields.len()),
        ));
    }

    let id = match parse_id(fields[0], line_num)? {
        LineId::Single(id) => id,
        LineId::Range(..) | LineId::Decimal(..) => return Ok(None),
    };

    let token = Token {
        id,
        form: fields[1].to_string(),
        lemma: fields[2].to_string(),
        upos: fields[3].to_string(),
        xpos: optional(fields[4]),
        feats: parse_pairs(fields[5]),
        head: parse_head(fields[6], line_num)?,
        deprel: fields[7].to_string(),
        deps: optional(fields[8]),
        misc: parse_misc(fields[9]),
    };

    Ok(Some(token))
}

fn optional(field: &str) -> Option<String> {
    if field == EMPTY_FIELD {
        None
    } else {
        Some(field.to_string())
    }
}

/// Parse ID field (can be integer, range, or decimal)
fn parse_id(s: &str, line_num: usize) -> Result<LineId, ParseError> {
    let number = |part: &str| {
        atoi::atoi::<usize>(part.as_bytes())
            .filter(|_| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| ParseError::syntax(line_num, format!("Invalid ID: {}", s)))
    };

    if let Some((start, end)) = s.split_once('-') {
        Ok(LineId::Range(number(start)?, number(end)?))
    } else if let Some((main, sub)) = s.split_once('.') {
        Ok(LineId::Decimal(number(main)?, number(sub)?))
    } else {
        Ok(LineId::Single(number(s)?))
    }
}

/// Parse HEAD field; `0` marks the root
fn parse_head(s: &str, line_num: usize) -> Result<Option<TokenId>, ParseError> {
    if s == "0" || s == EMPTY_FIELD {
        return Ok(None);
    }
    match atoi::atoi::<usize>(s.as_bytes()) {
        Some(head) if s.bytes().all(|b| b.is_ascii_digit()) => Ok(Some(head)),
        _ => Err(ParseError::syntax(line_num, format!("Invalid HEAD: {}", s))),
    }
}

/// Parse a FEATS field (key=value|key=value); `_` is absent
///
/// Unlike the lexicon's strict decoder, pairs without `=` are dropped
/// individually.
fn parse_pairs(s: &str) -> Option<Features> {
    if s == EMPTY_FIELD {
        return None;
    }

    let mut feats = Features::new();
    for pair in s.split('|') {
        if let Some((key, value)) = pair.split_once('=') {
            feats.insert(key.to_string(), value.to_string());
        }
    }
    Some(feats)
}

/// Parse a MISC field, keeping every item in file order
fn parse_misc(s: &str) -> Option<Misc> {
    if s == EMPTY_FIELD {
        return None;
    }
    Some(s.split('|').map(str::to_string).collect())
}

fn misc_field(misc: &Option<Misc>) -> String {
    match misc {
        Some(items) if !items.is_empty() => items.join("|"),
        _ => EMPTY_FIELD.to_string(),
    }
}

fn pairs_field(pairs: &Option<Features>) -> String {
    match pairs {
        Some(feats) => encode(feats),
        None => EMPTY_FIELD.to_string(),
    }
}

/// Serialize one sentence, terminated by a blank line
pub fn write_sentence<W: Write>(writer: &mut W, sentence: &Sentence) -> io::Result<()> {
    for (key, value) in &sentence.metadata {
        match value {
            Some(value) => writeln!(writer, "# {} = {}", key, value)?,
            None => writeln!(writer, "# {}", key)?,
        }
    }

    for tok in &sentence.tokens {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            tok.id,
            tok.form,
            tok.lemma,
            tok.upos,
            tok.xpos.as_deref().unwrap_or(EMPTY_FIELD),
            pairs_field(&tok.feats),
            tok.head.unwrap_or(0),
            tok.deprel,
            tok.deps.as_deref().unwrap_or(EMPTY_FIELD),
            misc_field(&tok.misc),
        )?;
    }

    writeln!(writer)
}

/// Serialize a sentence to a string
pub fn to_string(sentence: &Sentence) -> String {
    let mut buf = Vec::new();
    // writing into a Vec cannot fail
    let _ = write_sentence(&mut buf, sentence);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Write sentences to a CoNLL-U file
pub fn write_conllu<'a, I>(path: &Path, sentences: I) -> io::Result<()>
where
    I: IntoIterator<Item = &'a Sentence>,
{
    let mut writer = io::BufWriter::new(File::create(path)?);
    for sentence in sentences {
        write_sentence(&mut writer, sentence)?;
    }
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "# sent_id = ex-1
# text = The dog runs.
1\tThe\tthe\tDET\tDT\tDefinite=Def|PronType=Art\t2\tdet\t_\t_
2\tdog\tdog\tNOUN\tNN\tNumber=Sing\t3\tnsubj\t_\t_
3\truns\trun\tVERB\tVBZ\t_\t0\troot\t_\tSpaceAfter=No
4\t.\t.\tPUNCT\t.\t_\t3\tpunct\t_\t_

";

    #[test]
    fn test_parse_simple_sentence() {
        let mut reader = CoNLLUReader::from_string(SIMPLE);
        let sentence = reader.next().unwrap().unwrap();
        assert!(reader.next().is_none());

        assert_eq!(sentence.len(), 4);
        assert_eq!(sentence.text(), Some("The dog runs."));
        assert_eq!(sentence.metadata("sent_id"), Some("ex-1"));

        let runs = &sentence.tokens[2];
        assert_eq!(runs.form, "runs");
        assert_eq!(runs.head, None);
        assert_eq!(runs.feats, None);
        assert!(!runs.space_after());

        let dog = &sentence.tokens[1];
        assert_eq!(dog.head, Some(3));
        assert_eq!(
            dog.feats.as_ref().unwrap().get("Number").map(String::as_str),
            Some("Sing")
        );
    }

    #[test]
    fn test_serialize_matches_input() {
        let sentence = CoNLLUReader::from_string(SIMPLE).next().unwrap().unwrap();
        assert_eq!(to_string(&sentence), SIMPLE);
    }

    #[test]
    fn test_skips_multiword_and_empty_nodes() {
        let text = "1-2\tdu\t_\t_\t_\t_\t_\t_\t_\t_
1\tde\tde\tADP\t_\t_\t3\tcase\t_\t_
2\tle\tle\tDET\t_\t_\t3\tdet\t_\t_
3\tchat\tchat\tNOUN\t_\t_\t0\troot\t_\t_
3.1\tx\tx\tX\t_\t_\t_\t_\t_\t_
";
        let sentence = CoNLLUReader::from_string(text).next().unwrap().unwrap();
        assert_eq!(sentence.len(), 3);
        assert!(sentence.tree().is_ok());
    }

    #[test]
    fn test_multiple_sentences() {
        let text = format!("{}\n\n{}", SIMPLE, SIMPLE);
        let sentences: Vec<_> = CoNLLUReader::from_string(&text)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_parse_errors() {
        let bad_fields = "1\tThe\tthe\n";
        let err = CoNLLUReader::from_string(bad_fields).next().unwrap().unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line_num: 1, .. }));

        let bad_head = "1\tThe\tthe\tDET\t_\t_\tx\tdet\t_\t_\n";
        assert!(CoNLLUReader::from_string(bad_head).next().unwrap().is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("1", 0).unwrap(), LineId::Single(1));
        assert_eq!(parse_id("5-7", 0).unwrap(), LineId::Range(5, 7));
        assert_eq!(parse_id("10.5", 0).unwrap(), LineId::Decimal(10, 5));
        assert!(parse_id("a", 0).is_err());
        assert!(parse_id("", 0).is_err());
    }

    #[test]
    fn test_trailing_comments_are_not_a_sentence() {
        let text = "# sent_id = 1\n1\tHi\thi\tINTJ\t_\t_\t0\troot\t_\t_\n\n# newdoc id = x\n";
        let sentences: Vec<_> = CoNLLUReader::from_string(text)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(sentences.len(), 1);
        assert!(sentences[0].tree().is_ok());

        assert!(CoNLLUReader::from_string("# newdoc id = x\n\n").next().is_none());
    }

    #[test]
    fn test_misc_order_preserved() {
        let text = "1\tHi\thi\tINTJ\t_\t_\t0\troot\t_\tTranslit=hi|SpaceAfter=No|Gloss=hello|Typo\n\n";
        let sentence = CoNLLUReader::from_string(text).next().unwrap().unwrap();
        assert!(!sentence.tokens[0].space_after());
        assert_eq!(to_string(&sentence), text);
    }

    #[test]
    fn test_absent_versus_empty_pairs() {
        assert_eq!(parse_pairs("_"), None);
        let feats = parse_pairs("Typo=Yes|Abbr").unwrap();
        assert_eq!(feats.len(), 1);
    }
}
